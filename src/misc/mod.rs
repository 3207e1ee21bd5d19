pub mod binomial;
pub mod disjoint_set;
pub mod floating_point;
pub mod invertible;
pub mod table;
pub mod tokenizer;
pub mod transformable;

pub use binomial::*;
pub use disjoint_set::*;
pub use floating_point::*;
pub use invertible::*;
pub use table::*;
pub use tokenizer::*;
pub use transformable::*;
