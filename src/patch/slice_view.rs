/// Addressing of a tensor-product buffer along one direction.
///
/// The points are split into `extent` slices orthogonal to the direction,
/// each holding `len` points. `index(k, l)` is the flat point index of the
/// `l`-th point in slice `k`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceView {
    /// Distance between neighbouring points along the direction
    pub stride: usize,
    /// Number of points along the direction
    pub extent: usize,
    /// Number of points in each slice
    pub len: usize,
}

impl SliceView {
    /// # Example
    /// ```
    /// use nurbs_mesh::prelude::SliceView;
    /// // second direction of a 3 x 4 x 2 grid
    /// let view = SliceView::new(&[3, 4, 2], 1);
    /// assert_eq!(view, SliceView { stride: 3, extent: 4, len: 6 });
    /// // point (i, j, k) = (4 % 3, 2, 4 / 3)
    /// assert_eq!(view.index(2, 4), 1 + 3 * (2 + 4 * 1));
    /// ```
    pub fn new(shape: &[usize], dir: usize) -> Self {
        let stride = shape[..dir].iter().product();
        let extent = shape[dir];
        let len = shape.iter().product::<usize>() / extent.max(1);
        Self {
            stride,
            extent,
            len,
        }
    }

    pub fn index(&self, k: usize, l: usize) -> usize {
        ((l / self.stride) * self.extent + k) * self.stride + l % self.stride
    }
}
