mod bspline;
pub mod construct;
pub mod nurbs_patch;
pub mod rotation;
pub mod slice_view;

pub use nurbs_patch::*;
pub use rotation::*;
pub use slice_view::*;

#[cfg(test)]
mod tests;
