//! Resource management: assets, attachments, meshes, materials and scratch memory

pub mod assets;
pub mod attachment;
pub mod environment;
pub mod material;
pub mod mesh;
pub mod scratch;

pub use assets::*;
pub use attachment::*;
pub use environment::*;
pub use material::*;
pub use mesh::*;
pub use scratch::*;
