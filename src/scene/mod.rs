//! Scene components read by the renderer
//!
//! The scene itself is a bevy [`World`](bevy_ecs::world::World); the renderer
//! only queries it.

mod camera;
mod light;
mod renderable;
mod transform;

pub use camera::*;
pub use light::*;
pub use renderable::*;
pub use transform::*;
