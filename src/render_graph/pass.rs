//! Pass declarations for the frame graph

use crate::backend::command::CommandBuffer;
use crate::render_graph::resource::*;
use crate::resources::{Attachment, AttachmentId};
use std::sync::Arc;

/// Unique identifier for a pass within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(pub(crate) u32);

/// One node of the frame graph: the attachments a pass reads and writes, plus
/// the commands it recorded.
#[derive(Debug, Clone)]
pub struct GraphPass {
    name: String,
    inputs: Vec<AttachmentAccess>,
    outputs: Vec<AttachmentAccess>,
    commands: CommandBuffer,
}

impl GraphPass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            commands: CommandBuffer::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare that this pass samples an attachment
    pub fn sample(&mut self, attachment: &Arc<Attachment>) -> &mut Self {
        self.read(attachment, AttachmentUsage::Sampled)
    }

    /// Declare that this pass depth-tests against an attachment without writing it
    pub fn depth_test(&mut self, attachment: &Arc<Attachment>) -> &mut Self {
        self.read(attachment, AttachmentUsage::DepthRead)
    }

    pub fn read(&mut self, attachment: &Arc<Attachment>, usage: AttachmentUsage) -> &mut Self {
        debug_assert!(!usage.is_write());
        self.inputs.push(AttachmentAccess {
            attachment: attachment.clone(),
            usage,
            load_op: LoadOp::Load,
        });
        self
    }

    /// Declare a render target output; depth formats become depth targets
    pub fn write(&mut self, attachment: &Arc<Attachment>, load_op: LoadOp) -> &mut Self {
        let usage = if attachment.is_depth() {
            AttachmentUsage::DepthWrite
        } else {
            AttachmentUsage::ColorWrite
        };
        self.outputs.push(AttachmentAccess {
            attachment: attachment.clone(),
            usage,
            load_op,
        });
        self
    }

    pub fn inputs(&self) -> &[AttachmentAccess] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[AttachmentAccess] {
        &self.outputs
    }

    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    pub fn reads_attachment(&self, id: AttachmentId) -> bool {
        self.inputs.iter().any(|a| a.id() == id)
    }

    pub fn writes_attachment(&self, id: AttachmentId) -> bool {
        self.outputs.iter().any(|a| a.id() == id)
    }

    /// Every access in declaration order: inputs first, then outputs
    pub fn accesses(&self) -> impl Iterator<Item = &AttachmentAccess> {
        self.inputs.iter().chain(self.outputs.iter())
    }
}
