pub mod group_topology;
pub mod par_nurbs_extension;

pub use group_topology::*;
pub use par_nurbs_extension::*;

#[cfg(test)]
mod tests;
