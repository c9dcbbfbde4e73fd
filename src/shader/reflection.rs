//! Resource binding reflection over naga modules

use crate::backend::types::{ShaderStage, ShaderStageFlags};
use std::collections::BTreeMap;

/// What kind of resource a binding slot expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    UniformBuffer,
    StorageBuffer { read_only: bool },
    Texture,
    Sampler,
    Other,
}

/// A named binding slot resolved from shader reflection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: BindingKind,
    pub stages: ShaderStageFlags,
}

/// Named bindings and push constant usage of one or more shader stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderReflection {
    bindings: BTreeMap<String, BindingInfo>,
    push_constant_size: u32,
    push_constant_stages: ShaderStageFlags,
}

impl ShaderReflection {
    pub fn from_module(module: &naga::Module, stage: ShaderStage) -> Self {
        let mut reflection = Self::default();

        for (_, var) in module.global_variables.iter() {
            if var.space == naga::AddressSpace::PushConstant {
                let size = module.types[var.ty].inner.size(module.to_ctx());
                reflection.push_constant_size = reflection.push_constant_size.max(size);
                reflection.push_constant_stages |= stage.flags();
                continue;
            }

            let (Some(name), Some(binding)) = (&var.name, &var.binding) else {
                continue;
            };

            let kind = match var.space {
                naga::AddressSpace::Uniform => BindingKind::UniformBuffer,
                naga::AddressSpace::Storage { access } => BindingKind::StorageBuffer {
                    read_only: !access.contains(naga::StorageAccess::STORE),
                },
                naga::AddressSpace::Handle => match module.types[var.ty].inner {
                    naga::TypeInner::Image { .. } => BindingKind::Texture,
                    naga::TypeInner::Sampler { .. } => BindingKind::Sampler,
                    _ => BindingKind::Other,
                },
                _ => BindingKind::Other,
            };

            reflection.bindings.insert(
                name.clone(),
                BindingInfo {
                    name: name.clone(),
                    group: binding.group,
                    binding: binding.binding,
                    kind,
                    stages: stage.flags(),
                },
            );
        }

        reflection
    }

    /// Fold another stage's reflection into this one. Bindings declared by
    /// both stages become visible to both.
    pub fn merge(&mut self, other: &ShaderReflection) {
        for (name, info) in &other.bindings {
            self.bindings
                .entry(name.clone())
                .and_modify(|existing| existing.stages |= info.stages)
                .or_insert_with(|| info.clone());
        }
        self.push_constant_size = self.push_constant_size.max(other.push_constant_size);
        self.push_constant_stages |= other.push_constant_stages;
    }

    pub fn binding(&self, name: &str) -> Option<&BindingInfo> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> impl Iterator<Item = &BindingInfo> {
        self.bindings.values()
    }

    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    pub fn push_constant_stages(&self) -> ShaderStageFlags {
        self.push_constant_stages
    }
}
