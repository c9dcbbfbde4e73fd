//! Shader loading, validation and reflection
//!
//! Shaders are looked up by pipeline name using the path convention
//! `{dir}/{name}.{vert|frag}.{spv|wgsl}`. Precompiled SPIR-V is the default
//! format; WGSL sources are accepted directly, and [`compile_wgsl_to_spirv`]
//! produces the binaries.

pub mod pipeline;
pub mod reflection;

pub use pipeline::*;
pub use reflection::*;

use crate::backend::types::ShaderStage;
use crate::error::{RenderError, RenderResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// On-disk shader representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShaderFormat {
    /// Precompiled SPIR-V binaries (`.spv`)
    #[default]
    Spirv,
    /// WGSL source text (`.wgsl`)
    Wgsl,
}

impl ShaderFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ShaderFormat::Spirv => "spv",
            ShaderFormat::Wgsl => "wgsl",
        }
    }
}

/// A parsed and validated shader stage
#[derive(Debug)]
pub struct ShaderModule {
    pub path: PathBuf,
    pub stage: ShaderStage,
    pub entry_point: String,
    pub module: naga::Module,
    pub info: naga::valid::ModuleInfo,
    pub reflection: ShaderReflection,
}

/// Loads shader stages from a directory and caches them by name and stage
pub struct ShaderLibrary {
    dir: PathBuf,
    format: ShaderFormat,
    modules: HashMap<(String, ShaderStage), Arc<ShaderModule>>,
}

impl ShaderLibrary {
    pub fn new(dir: impl Into<PathBuf>, format: ShaderFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
            modules: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn format(&self) -> ShaderFormat {
        self.format
    }

    /// Path a stage of `name` is expected at
    pub fn path_for(&self, name: &str, stage: ShaderStage) -> PathBuf {
        self.dir.join(format!(
            "{name}.{}.{}",
            stage.file_infix(),
            self.format.extension()
        ))
    }

    pub fn load(&mut self, name: &str, stage: ShaderStage) -> RenderResult<Arc<ShaderModule>> {
        if let Some(module) = self.modules.get(&(name.to_string(), stage)) {
            return Ok(module.clone());
        }

        let path = self.path_for(name, stage);
        let module = match self.format {
            ShaderFormat::Spirv => {
                let bytes = std::fs::read(&path).map_err(|source| RenderError::ShaderLoad {
                    path: path.clone(),
                    source,
                })?;
                naga::front::spv::parse_u8_slice(&bytes, &naga::front::spv::Options::default())
                    .map_err(|e| RenderError::ShaderParse {
                        path: path.clone(),
                        message: e.to_string(),
                    })?
            }
            ShaderFormat::Wgsl => {
                let source =
                    std::fs::read_to_string(&path).map_err(|source| RenderError::ShaderLoad {
                        path: path.clone(),
                        source,
                    })?;
                naga::front::wgsl::parse_str(&source).map_err(|e| RenderError::ShaderParse {
                    path: path.clone(),
                    message: e.emit_to_string(&source),
                })?
            }
        };

        let module = Arc::new(finish_module(path, stage, module)?);
        log::debug!(
            "Loaded shader {} ({} bindings)",
            module.path.display(),
            module.reflection.bindings().count()
        );
        self.modules.insert((name.to_string(), stage), module.clone());
        Ok(module)
    }
}

fn validate(module: &naga::Module) -> Result<naga::valid::ModuleInfo, String> {
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(module)
    .map_err(|e| e.to_string())
}

fn finish_module(
    path: PathBuf,
    stage: ShaderStage,
    module: naga::Module,
) -> RenderResult<ShaderModule> {
    let info = validate(&module).map_err(|message| RenderError::ShaderValidation {
        path: path.clone(),
        message,
    })?;

    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga_stage)
        .map(|ep| ep.name.clone())
        .ok_or_else(|| RenderError::MissingEntryPoint {
            path: path.clone(),
            stage: stage.file_infix(),
        })?;

    let reflection = ShaderReflection::from_module(&module, stage);

    Ok(ShaderModule {
        path,
        stage,
        entry_point,
        module,
        info,
        reflection,
    })
}

/// Compile WGSL source into a SPIR-V binary that keeps debug names, so the
/// SPIR-V front end can still resolve bindings by name.
pub fn compile_wgsl_to_spirv(source: &str) -> RenderResult<Vec<u32>> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| RenderError::ShaderCompile(e.emit_to_string(source)))?;
    let info = validate(&module).map_err(RenderError::ShaderCompile)?;

    let mut options = naga::back::spv::Options::default();
    options.flags |= naga::back::spv::WriterFlags::DEBUG;

    naga::back::spv::write_vec(&module, &info, &options, None)
        .map_err(|e| RenderError::ShaderCompile(e.to_string()))
}
