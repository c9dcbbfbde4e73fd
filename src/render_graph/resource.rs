//! Attachment accesses declared by graph passes

use crate::resources::{Attachment, AttachmentId};
use std::sync::Arc;

/// How a pass uses an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentUsage {
    /// Written as a color render target
    ColorWrite,
    /// Written as the depth/stencil target
    DepthWrite,
    /// Bound as a read-only depth/stencil target (depth test without writes)
    DepthRead,
    /// Sampled or fetched from a shader
    Sampled,
}

impl AttachmentUsage {
    pub fn is_write(&self) -> bool {
        matches!(self, AttachmentUsage::ColorWrite | AttachmentUsage::DepthWrite)
    }

    /// Layout the image must be in while the pass runs
    pub fn layout(&self) -> ImageLayout {
        match self {
            AttachmentUsage::ColorWrite => ImageLayout::ColorAttachment,
            AttachmentUsage::DepthWrite => ImageLayout::DepthStencilAttachment,
            AttachmentUsage::DepthRead => ImageLayout::DepthStencilReadOnly,
            AttachmentUsage::Sampled => ImageLayout::ShaderReadOnly,
        }
    }
}

/// Image layouts tracked across passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// What happens to a written attachment's previous contents
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOp {
    Clear(ClearValue),
    Load,
    DontCare,
}

/// Attachment access declaration for a pass
#[derive(Debug, Clone)]
pub struct AttachmentAccess {
    pub attachment: Arc<Attachment>,
    pub usage: AttachmentUsage,
    pub load_op: LoadOp,
}

impl AttachmentAccess {
    pub fn id(&self) -> AttachmentId {
        self.attachment.id()
    }

    pub fn is_write(&self) -> bool {
        self.usage.is_write()
    }
}

/// Layout transition inserted before a pass runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barrier {
    pub attachment: AttachmentId,
    pub name: String,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
}
