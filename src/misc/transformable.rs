/// Geometry whose control points can be mapped by `M`, e.g. a matrix or a rotation.
pub trait Transformable<M>: Clone {
    fn transform(&mut self, map: M);

    fn transformed(&self, map: M) -> Self {
        let mut mapped = self.clone();
        mapped.transform(map);
        mapped
    }
}
