mod dof_table;
pub mod entity_offsets;
pub mod finite_element;
mod io;
mod knot_vectors;
mod numbering;
pub mod nurbs_extension;
pub mod patch_map;
mod patches;
mod periodic;
pub mod read_options;

pub use entity_offsets::*;
pub use finite_element::*;
pub use nurbs_extension::*;
pub use patch_map::*;
pub use read_options::*;
