#![allow(clippy::needless_range_loop)]

mod extension;
mod knot;
mod misc;
mod parallel;
mod patch;
mod topology;

pub mod prelude {
    pub use crate::extension::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
    pub use crate::parallel::*;
    pub use crate::patch::*;
    pub use crate::topology::*;
}
