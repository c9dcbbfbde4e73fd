//! Common utilities for frame integration tests.
//!
//! Builds renderers over the headless backend with the WGSL shaders shipped in
//! `data/shaders`, plus small scenes to render.

#![allow(dead_code)]

use deferred_renderer::backend::command::Command;
use deferred_renderer::backend::headless::SubmittedFrame;
use deferred_renderer::pipeline::{PipelineKind, DEPTH};
use deferred_renderer::render_graph::GraphPass;
use deferred_renderer::resources::{Assets, EnvMap, Handle, Material, Mesh, MeshData};
use deferred_renderer::scene::{Camera, MeshRenderer, StaticMesh, Transform};
use deferred_renderer::{
    Entity, HeadlessBackend, Renderer, RendererConfig, ShaderFormat, World,
};
use glam::Vec3;

pub const SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/shaders");

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config(pipeline: PipelineKind) -> RendererConfig {
    RendererConfig::default()
        .with_render_extent(320, 180)
        .with_shaders(SHADER_DIR, ShaderFormat::Wgsl)
        .with_scratch(64 * 1024, 256)
        .with_pipeline(pipeline)
}

pub fn create_renderer(pipeline: PipelineKind) -> Renderer<HeadlessBackend> {
    init_logging();
    let config = test_config(pipeline);
    let backend = config.headless_backend();
    Renderer::new(backend, config).expect("renderer should build from the bundled shaders")
}

/// Name of the pass that issues mesh draws in each chain
pub fn mesh_pass_name(pipeline: PipelineKind) -> &'static str {
    match pipeline {
        PipelineKind::Deferred => "geometry",
        PipelineKind::Basic => "basic",
    }
}

/// Assets shared by the test scenes
pub struct TestAssets {
    pub assets: Assets,
    pub env_map: Handle<EnvMap>,
    pub cube: Handle<Mesh>,
    pub material: Handle<Material>,
}

impl TestAssets {
    /// Environment map, cube mesh and one material, all ready
    pub fn ready(renderer: &mut Renderer<HeadlessBackend>) -> Self {
        let assets = Assets::new();
        let backend = renderer.backend_mut();

        let env_map = EnvMap::create(backend, "sky", 16).expect("env map");
        let cube = MeshData::cube().upload(backend).expect("cube upload");

        Self {
            env_map: assets.insert("env/sky", env_map),
            cube: assets.insert("meshes/cube", cube),
            material: assets.insert("materials/red", Material::plastic(Vec3::new(1.0, 0.0, 0.0))),
            assets,
        }
    }

    /// A mesh handle that stays pending until fulfilled
    pub fn pending_mesh(&self, path: &str) -> Handle<Mesh> {
        self.assets.request::<Mesh>(path)
    }
}

pub fn spawn_camera(world: &mut World, position: Vec3, env_map: Handle<EnvMap>) -> Entity {
    world
        .spawn((
            Transform::from_position(position),
            Camera::perspective_degrees(60.0).with_env_map(env_map),
        ))
        .id()
}

pub fn spawn_mesh(
    world: &mut World,
    position: Vec3,
    mesh: Handle<Mesh>,
    material: Handle<Material>,
) -> Entity {
    world
        .spawn((
            Transform::from_position(position),
            MeshRenderer::new(material),
            StaticMesh::new(mesh),
        ))
        .id()
}

pub fn pass<'a>(frame: &'a SubmittedFrame, name: &str) -> &'a GraphPass {
    frame
        .pass(name)
        .unwrap_or_else(|| panic!("pass '{name}' missing from submitted frame"))
}

/// Whether viewport and scissor are the first two commands of `pass`
pub fn starts_with_dynamic_state(pass: &GraphPass) -> bool {
    matches!(
        pass.commands().commands(),
        [Command::SetViewport(_), Command::SetScissor(_), ..]
    )
}

/// First pushed word of every draw, i.e. the transform index
pub fn pushed_transform_indices(pass: &GraphPass) -> Vec<u32> {
    pass.commands()
        .pushed_words()
        .into_iter()
        .map(|words| words[0])
        .collect()
}

pub fn depth_attachment_name() -> &'static str {
    DEPTH
}
