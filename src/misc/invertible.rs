/// Reversal of a parametrization.
/// # Example
/// ```
/// use nurbs_mesh::prelude::*;
/// let kv = KnotVector::<f64>::try_new(2, vec![0., 0., 0., 0.25, 1., 1., 1.]).unwrap();
/// let flipped = kv.inverse();
/// assert_eq!(flipped.knots()[3], 0.75);
/// assert_eq!(flipped.inverse().knots(), kv.knots());
/// ```
pub trait Invertible: Clone {
    /// Reverse in place
    fn invert(&mut self);

    fn inverse(&self) -> Self {
        let mut reversed = self.clone();
        reversed.invert();
        reversed
    }
}
