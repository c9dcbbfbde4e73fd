//! Post-processing effects

mod tonemapping;

pub use tonemapping::*;
