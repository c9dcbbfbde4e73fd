//! Headless frame loop.
//!
//! Renders a small scene on the headless backend while a background task
//! "streams in" one of the meshes. The first frames skip it; once the task
//! delivers the mesh data the main thread uploads it and it starts drawing.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example headless_frames -- deferred
//! cargo run --example headless_frames -- basic
//! ```

use std::time::Duration;

use deferred_renderer::resources::{Assets, EnvMap, Material, Mesh, MeshData};
use deferred_renderer::scene::{Camera, MeshRenderer, PointLight, StaticMesh, Transform};
use deferred_renderer::{PipelineKind, Renderer, RendererConfig, ShaderFormat, TaskManager, World};
use glam::Vec3;

const FRAMES_TO_RENDER: u64 = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let pipeline = match std::env::args().nth(1).as_deref() {
        Some("basic") => PipelineKind::Basic,
        _ => PipelineKind::Deferred,
    };

    let config = RendererConfig::default()
        .with_render_extent(640, 360)
        .with_shaders(
            concat!(env!("CARGO_MANIFEST_DIR"), "/data/shaders"),
            ShaderFormat::Wgsl,
        )
        .with_pipeline(pipeline);
    let backend = config.headless_backend();
    let mut renderer = Renderer::new(backend, config)?;

    let assets = Assets::new();
    let env_map = assets.insert("env/studio", EnvMap::create(renderer.backend_mut(), "studio", 32)?);
    let cube = assets.insert("meshes/cube", MeshData::cube().upload(renderer.backend_mut())?);
    let floor = assets.request::<Mesh>("meshes/floor");
    let gold = assets.insert("materials/gold", Material::gold());
    let plastic = assets.insert("materials/plastic", Material::plastic(Vec3::new(0.2, 0.4, 0.9)));

    let mut world = World::new();
    world.spawn((
        Transform::from_position(Vec3::new(0.0, 2.0, 6.0)),
        Camera::perspective_degrees(60.0)
            .looking_at(Vec3::new(0.0, -2.0, -6.0), Vec3::Y)
            .with_env_map(env_map),
    ));
    world.spawn((
        Transform::from_position(Vec3::new(0.0, 0.5, 0.0)),
        MeshRenderer::new(gold),
        StaticMesh::new(cube),
    ));
    world.spawn((
        Transform::new(),
        MeshRenderer::new(plastic),
        StaticMesh::new(floor),
    ));
    world.spawn((
        Transform::from_position(Vec3::new(2.0, 3.0, 2.0)),
        PointLight::new(Vec3::new(1.0, 0.9, 0.8), 20.0, 10.0),
    ));

    let tasks = TaskManager::with_default_workers()?;
    let (sender, receiver) = crossbeam_channel::bounded::<MeshData>(1);
    tasks.launch(
        move |(width, depth): (f32, f32)| {
            std::thread::sleep(Duration::from_millis(30));
            let _ = sender.send(MeshData::plane(width, depth, 4));
        },
        (10.0, 10.0),
    );

    for _ in 0..FRAMES_TO_RENDER {
        if let Ok(data) = receiver.try_recv() {
            let mesh = data.upload(renderer.backend_mut())?;
            assets.fulfill(floor, mesh);
            log::info!("Floor mesh streamed in");
        }

        let frame = renderer.render(&mut world, &assets)?;
        let draws = renderer
            .backend()
            .last_submission()
            .map_or(0, |submitted| submitted.draw_count());
        log::info!(
            "Frame {} (slot {}): {:?}, {} draw calls",
            frame.index,
            frame.slot,
            renderer.database().state(),
            draws
        );
        std::thread::sleep(Duration::from_millis(16));
    }

    log::info!("Rendered {FRAMES_TO_RENDER} frames with passes {:?}", renderer.pass_names());
    Ok(())
}
