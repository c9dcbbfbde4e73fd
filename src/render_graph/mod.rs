//! Render Graph System
//!
//! Passes declare the attachments they read and write and carry the commands
//! they recorded. Building the graph orders passes by those declarations and
//! plans the layout transitions between them.

pub mod graph;
pub mod pass;
pub mod resource;

pub use graph::*;
pub use pass::*;
pub use resource::*;
