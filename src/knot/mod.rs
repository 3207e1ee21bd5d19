pub mod find_maxima_option;
pub mod knot_multiplicity;
pub mod knot_vector;
pub use find_maxima_option::*;
pub use knot_multiplicity::*;
pub use knot_vector::*;

#[cfg(test)]
mod tests;
