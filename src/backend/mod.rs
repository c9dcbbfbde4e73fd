//! Backend abstraction layer
//!
//! [`GraphicsBackend`] is the seam between the renderer and presentation,
//! device resources and submission. [`HeadlessBackend`] implements it without
//! a device.

pub mod command;
pub mod headless;
pub mod traits;
pub mod types;

pub use command::*;
pub use headless::*;
pub use traits::*;
pub use types::*;
