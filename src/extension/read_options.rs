/// Options for reading a NURBS mesh
#[derive(Clone, Debug, Copy, Default)]
pub struct ReadOptions {
    /// Require the first edges of every boundary patch to run along their knot vectors
    pub check_bdr_patches: bool,
}

impl ReadOptions {
    /// Set whether boundary patch orientations are checked while reading
    pub fn with_check_bdr_patches(mut self, check_bdr_patches: bool) -> Self {
        self.check_bdr_patches = check_bdr_patches;
        self
    }
}
