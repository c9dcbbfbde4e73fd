//! Frame graph definition and compilation

use crate::error::{RenderError, RenderResult};
use crate::render_graph::pass::*;
use crate::render_graph::resource::*;
use crate::resources::AttachmentId;
use std::collections::{BTreeSet, HashMap};

/// Passes contributed for a single frame
#[derive(Debug, Default)]
pub struct RenderGraph {
    passes: Vec<GraphPass>,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pass to the graph
    pub fn add_pass(&mut self, pass: GraphPass) -> PassId {
        let id = PassId(self.passes.len() as u32);
        self.passes.push(pass);
        id
    }

    pub fn passes(&self) -> &[GraphPass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Dependencies of every pass, as indices of the passes it must follow.
    ///
    /// A read depends on the writers of that attachment declared before it, or
    /// on all writers if none precede it. A write depends on earlier writers
    /// and on earlier readers that themselves follow an earlier writer.
    fn dependencies(&self) -> Vec<BTreeSet<usize>> {
        let writes_before = |id: AttachmentId, index: usize| {
            self.passes[..index].iter().any(|p| p.writes_attachment(id))
        };

        let mut dependencies = vec![BTreeSet::new(); self.passes.len()];

        for (j, pass) in self.passes.iter().enumerate() {
            for input in pass.inputs() {
                let id = input.id();
                let earlier = writes_before(id, j);
                for (i, other) in self.passes.iter().enumerate() {
                    if i != j && other.writes_attachment(id) && (i < j) == earlier {
                        dependencies[j].insert(i);
                    }
                }
            }

            for output in pass.outputs() {
                let id = output.id();
                for (i, other) in self.passes[..j].iter().enumerate() {
                    let write_after_write = other.writes_attachment(id);
                    let write_after_read = other.reads_attachment(id) && writes_before(id, i);
                    if write_after_write || write_after_read {
                        dependencies[j].insert(i);
                    }
                }
            }
        }

        dependencies
    }

    /// Order the passes, plan layout transitions and attachment lifetimes
    pub fn build(self) -> RenderResult<CompiledGraph> {
        let dependencies = self.dependencies();

        // Kahn's algorithm; among ready passes the earliest declared runs first
        let mut dependents = vec![Vec::new(); self.passes.len()];
        for (dependent, deps) in dependencies.iter().enumerate() {
            for &dependency in deps {
                dependents[dependency].push(dependent);
            }
        }
        let mut in_degree: Vec<usize> = dependencies.iter().map(|d| d.len()).collect();
        let mut ready: BTreeSet<usize> = (0..self.passes.len())
            .filter(|i| in_degree[*i] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.passes.len());

        while let Some(index) = ready.pop_first() {
            order.push(index);
            for &dependent in &dependents[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.passes.len() {
            let passes = (0..self.passes.len())
                .filter(|i| !order.contains(i))
                .map(|i| self.passes[i].name().to_string())
                .collect();
            return Err(RenderError::GraphCycle { passes });
        }

        let mut slots: Vec<Option<GraphPass>> = self.passes.into_iter().map(Some).collect();
        let mut layouts: HashMap<AttachmentId, ImageLayout> = HashMap::new();
        let mut lifetimes: HashMap<AttachmentId, ResourceLifetime> = HashMap::new();
        let mut passes = Vec::with_capacity(order.len());

        for (step, index) in order.into_iter().enumerate() {
            let Some(pass) = slots[index].take() else {
                continue;
            };

            let mut barriers = Vec::new();
            for access in pass.accesses() {
                let new_layout = access.usage.layout();
                let old_layout = layouts
                    .insert(access.id(), new_layout)
                    .unwrap_or(ImageLayout::Undefined);
                if old_layout != new_layout {
                    log::trace!(
                        "{}: {} {:?} -> {:?}",
                        pass.name(),
                        access.attachment.name(),
                        old_layout,
                        new_layout
                    );
                    barriers.push(Barrier {
                        attachment: access.id(),
                        name: access.attachment.name().to_string(),
                        old_layout,
                        new_layout,
                    });
                }

                lifetimes
                    .entry(access.id())
                    .or_insert(ResourceLifetime {
                        first_use: step,
                        last_use: step,
                    })
                    .last_use = step;
            }

            passes.push(CompiledPass {
                id: PassId(index as u32),
                pass,
                barriers,
            });
        }

        Ok(CompiledGraph {
            passes,
            lifetimes,
            final_layouts: layouts,
        })
    }
}

/// Attachment lifetime in terms of pass execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first_use: usize,
    pub last_use: usize,
}

/// A pass in execution order with the transitions it needs first
#[derive(Debug, Clone)]
pub struct CompiledPass {
    pub id: PassId,
    pub pass: GraphPass,
    pub barriers: Vec<Barrier>,
}

/// Compiled frame graph ready for submission
#[derive(Debug, Clone)]
pub struct CompiledGraph {
    passes: Vec<CompiledPass>,
    lifetimes: HashMap<AttachmentId, ResourceLifetime>,
    final_layouts: HashMap<AttachmentId, ImageLayout>,
}

impl CompiledGraph {
    pub fn passes(&self) -> &[CompiledPass] {
        &self.passes
    }

    /// Pass names in execution order
    pub fn pass_order(&self) -> Vec<&str> {
        self.passes.iter().map(|p| p.pass.name()).collect()
    }

    pub fn pass(&self, name: &str) -> Option<&CompiledPass> {
        self.passes.iter().find(|p| p.pass.name() == name)
    }

    pub fn lifetime(&self, attachment: AttachmentId) -> Option<ResourceLifetime> {
        self.lifetimes.get(&attachment).copied()
    }

    /// Check if an attachment is alive at a given execution step
    pub fn is_attachment_alive(&self, attachment: AttachmentId, step: usize) -> bool {
        self.lifetimes
            .get(&attachment)
            .is_some_and(|l| step >= l.first_use && step <= l.last_use)
    }

    /// Layout an attachment is left in after the last pass
    pub fn final_layout(&self, attachment: AttachmentId) -> Option<ImageLayout> {
        self.final_layouts.get(&attachment).copied()
    }

    /// Total draw calls recorded across all passes
    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|p| p.pass.commands().draw_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::{TextureHandle, TextureViewHandle};
    use crate::backend::types::{Extent2d, TextureFormat};
    use crate::resources::{Attachment, AttachmentRegistry};
    use std::sync::Arc;

    fn attachment(
        registry: &mut AttachmentRegistry,
        name: &str,
        format: TextureFormat,
    ) -> Arc<Attachment> {
        let n = registry.len() as u64;
        registry
            .get_or_create(name, Extent2d::new(64, 64), format, || {
                Ok((TextureHandle(n), TextureViewHandle(n)))
            })
            .unwrap()
    }

    const CLEAR: LoadOp = LoadOp::Clear(ClearValue::Color([0.0, 0.0, 0.0, 1.0]));

    #[test]
    fn test_reader_runs_after_writer() {
        let mut registry = AttachmentRegistry::new();
        let color = attachment(&mut registry, "color", TextureFormat::Rgba16Float);
        let output = attachment(&mut registry, "output", TextureFormat::Rgba8Unorm);

        let mut graph = RenderGraph::new();
        let mut tonemap = GraphPass::new("tonemap");
        tonemap.sample(&color).write(&output, LoadOp::DontCare);
        graph.add_pass(tonemap);
        let mut scene = GraphPass::new("scene");
        scene.write(&color, CLEAR);
        graph.add_pass(scene);

        let compiled = graph.build().unwrap();
        assert_eq!(compiled.pass_order(), vec!["scene", "tonemap"]);
    }

    #[test]
    fn test_writers_keep_declaration_order() {
        let mut registry = AttachmentRegistry::new();
        let color = attachment(&mut registry, "color", TextureFormat::Rgba16Float);
        let depth = attachment(&mut registry, "depth", TextureFormat::Depth32Float);

        let mut graph = RenderGraph::new();
        let mut geometry = GraphPass::new("geometry");
        geometry.write(&depth, LoadOp::Clear(ClearValue::DepthStencil { depth: 1.0, stencil: 0 }));
        graph.add_pass(geometry);
        let mut lighting = GraphPass::new("lighting");
        lighting.sample(&depth).write(&color, CLEAR);
        graph.add_pass(lighting);
        let mut skybox = GraphPass::new("skybox");
        skybox.depth_test(&depth).write(&color, LoadOp::Load);
        graph.add_pass(skybox);

        let compiled = graph.build().unwrap();
        assert_eq!(compiled.pass_order(), vec!["geometry", "lighting", "skybox"]);

        let barriers = &compiled.pass("skybox").unwrap().barriers;
        assert_eq!(barriers.len(), 1);
        assert_eq!(barriers[0].name, "depth");
        assert_eq!(barriers[0].old_layout, ImageLayout::ShaderReadOnly);
        assert_eq!(barriers[0].new_layout, ImageLayout::DepthStencilReadOnly);
    }

    #[test]
    fn test_barriers_track_layouts() {
        let mut registry = AttachmentRegistry::new();
        let color = attachment(&mut registry, "color", TextureFormat::Rgba16Float);
        let output = attachment(&mut registry, "output", TextureFormat::Rgba8Unorm);

        let mut graph = RenderGraph::new();
        let mut scene = GraphPass::new("scene");
        scene.write(&color, CLEAR);
        graph.add_pass(scene);
        let mut tonemap = GraphPass::new("tonemap");
        tonemap.sample(&color).write(&output, LoadOp::DontCare);
        graph.add_pass(tonemap);

        let compiled = graph.build().unwrap();
        let first = &compiled.passes()[0].barriers;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].old_layout, ImageLayout::Undefined);
        assert_eq!(first[0].new_layout, ImageLayout::ColorAttachment);

        let second = &compiled.passes()[1].barriers;
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].new_layout, ImageLayout::ShaderReadOnly);
        assert_eq!(
            compiled.final_layout(output.id()),
            Some(ImageLayout::ColorAttachment)
        );
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut registry = AttachmentRegistry::new();
        let a = attachment(&mut registry, "a", TextureFormat::Rgba8Unorm);
        let b = attachment(&mut registry, "b", TextureFormat::Rgba8Unorm);

        let mut graph = RenderGraph::new();
        let mut first = GraphPass::new("first");
        first.sample(&b).write(&a, CLEAR);
        graph.add_pass(first);
        let mut second = GraphPass::new("second");
        second.sample(&a).write(&b, CLEAR);
        graph.add_pass(second);

        // "first" reads b with no earlier writer, so it waits on "second",
        // which reads a written earlier by "first"
        let result = graph.build();
        assert!(matches!(result, Err(RenderError::GraphCycle { passes }) if passes.len() == 2));
    }

    #[test]
    fn test_lifetimes() {
        let mut registry = AttachmentRegistry::new();
        let color = attachment(&mut registry, "color", TextureFormat::Rgba16Float);
        let output = attachment(&mut registry, "output", TextureFormat::Rgba8Unorm);

        let mut graph = RenderGraph::new();
        let mut scene = GraphPass::new("scene");
        scene.write(&color, CLEAR);
        graph.add_pass(scene);
        let mut tonemap = GraphPass::new("tonemap");
        tonemap.sample(&color).write(&output, LoadOp::DontCare);
        graph.add_pass(tonemap);

        let compiled = graph.build().unwrap();
        assert_eq!(
            compiled.lifetime(color.id()),
            Some(ResourceLifetime { first_use: 0, last_use: 1 })
        );
        assert!(!compiled.is_attachment_alive(output.id(), 0));
        assert!(compiled.is_attachment_alive(output.id(), 1));
    }

    #[test]
    fn test_chain_declared_backwards() {
        let mut registry = AttachmentRegistry::new();
        let a = attachment(&mut registry, "a", TextureFormat::Rgba16Float);
        let b = attachment(&mut registry, "b", TextureFormat::Rgba16Float);
        let c = attachment(&mut registry, "c", TextureFormat::Rgba8Unorm);
        let d = attachment(&mut registry, "d", TextureFormat::Rgba8Unorm);

        let mut graph = RenderGraph::new();
        let mut third = GraphPass::new("third");
        third.sample(&b).write(&c, CLEAR);
        graph.add_pass(third);
        let mut independent = GraphPass::new("independent");
        independent.write(&d, CLEAR);
        graph.add_pass(independent);
        let mut second = GraphPass::new("second");
        second.sample(&a).write(&b, CLEAR);
        graph.add_pass(second);
        let mut first = GraphPass::new("first");
        first.write(&a, CLEAR);
        graph.add_pass(first);

        let compiled = graph.build().unwrap();
        assert_eq!(
            compiled.pass_order(),
            vec!["independent", "first", "second", "third"]
        );
    }

    #[test]
    fn test_empty_graph() {
        let compiled = RenderGraph::new().build().unwrap();
        assert!(compiled.passes().is_empty());
        assert_eq!(compiled.draw_count(), 0);
    }
}
