//! Renderer error type

use std::path::PathBuf;
use thiserror::Error;

use crate::backend::traits::BackendError;

/// Errors surfaced by renderer construction and frame orchestration.
///
/// Asset readiness never produces one of these: a mesh or environment map
/// that is still streaming in only shrinks what a frame draws.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Failed to read shader {}: {source}", path.display())]
    ShaderLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse shader {}: {message}", path.display())]
    ShaderParse { path: PathBuf, message: String },
    #[error("Shader {} failed validation: {message}", path.display())]
    ShaderValidation { path: PathBuf, message: String },
    #[error("Shader {} has no {stage} entry point", path.display())]
    MissingEntryPoint { path: PathBuf, stage: &'static str },
    #[error("Failed to compile shader: {0}")]
    ShaderCompile(String),
    #[error("Pipeline '{pipeline}' exposes no binding named '{name}'")]
    MissingBinding { pipeline: String, name: String },
    #[error("Pass '{pass}' requires attachment '{name}' which no earlier pass provided")]
    MissingAttachment { pass: String, name: String },
    #[error("Scratch memory exhausted: requested {requested} bytes, {remaining} remaining")]
    ScratchExhausted { requested: u64, remaining: u64 },
    #[error("Scratch write of {len} bytes at offset {offset} exceeds its {size} byte allocation")]
    ScratchWriteOutOfRange { offset: u64, len: u64, size: u64 },
    #[error("Invalid scratch configuration: {0}")]
    InvalidScratchConfig(String),
    #[error("Frame slot {slot} out of range ({slots} slots)")]
    InvalidFrameSlot { slot: usize, slots: usize },
    #[error("Render graph contains a dependency cycle between passes: {passes:?}")]
    GraphCycle { passes: Vec<String> },
    #[error("Render database cannot move from {from:?} to {to:?}")]
    InvalidDatabaseTransition {
        from: crate::database::DatabaseState,
        to: crate::database::DatabaseState,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;
