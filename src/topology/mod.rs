pub mod cell;
pub mod geometry;
pub mod patch_topology;

pub use cell::*;
pub use geometry::*;
pub use patch_topology::*;

#[cfg(test)]
mod tests;
