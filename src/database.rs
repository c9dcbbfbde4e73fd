//! Per-frame snapshot of everything the passes draw
//!
//! The database is rebuilt from the scene at the start of every frame and is
//! read-only while passes record. Draws are only collected once the active
//! camera's environment map is ready; until then a frame is empty.

use crate::error::{RenderError, RenderResult};
use crate::resources::{Assets, EnvMap, Handle, Material, Mesh};
use crate::scene::{Camera, GpuPointLight, MeshRenderer, PointLight, StaticMesh, Transform};
use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

/// Population progress within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    Reset,
    CameraAssigned,
    PopulatedForDraw,
    EmptyFrame,
}

impl DatabaseState {
    fn can_advance_to(self, next: DatabaseState) -> bool {
        use DatabaseState::*;
        matches!(
            (self, next),
            (Reset, CameraAssigned)
                | (Reset, EmptyFrame)
                | (CameraAssigned, PopulatedForDraw)
                | (CameraAssigned, EmptyFrame)
        )
    }
}

/// Matrices derived from the active camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraData {
    pub projection: Mat4,
    pub view: Mat4,
    pub projection_view: Mat4,
    pub position: Vec3,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            projection_view: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// Clip planes and aspect ratio used to build the camera projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionSettings {
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

/// One mesh to draw with one material at one transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    pub mesh: Handle<Mesh>,
    pub material: Handle<Material>,
    pub transform: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightData {
    pub position: Vec3,
    pub radius: f32,
    pub color: Vec3,
    pub intensity: f32,
}

impl PointLightData {
    pub fn gpu_data(&self) -> GpuPointLight {
        GpuPointLight {
            position_radius: self.position.extend(self.radius),
            color_intensity: self.color.extend(self.intensity),
        }
    }
}

#[derive(Debug)]
pub struct RenderDatabase {
    state: DatabaseState,
    camera: CameraData,
    environment_map: Handle<EnvMap>,
    draws: Vec<Draw>,
    transforms: Vec<Mat4>,
    point_lights: Vec<PointLightData>,
    materials: Vec<Handle<Material>>,
}

impl Default for RenderDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDatabase {
    pub fn new() -> Self {
        Self {
            state: DatabaseState::Reset,
            camera: CameraData::default(),
            environment_map: Handle::NONE,
            draws: Vec::new(),
            transforms: Vec::new(),
            point_lights: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Clear everything collected for the previous frame
    pub fn reset(&mut self) {
        self.state = DatabaseState::Reset;
        self.camera = CameraData::default();
        self.environment_map = Handle::NONE;
        self.draws.clear();
        self.transforms.clear();
        self.point_lights.clear();
        self.materials.clear();
    }

    /// Append a draw; its transform lands at the same index in `transforms`
    pub fn add_draw(&mut self, draw: Draw) -> usize {
        self.transforms.push(draw.transform);
        self.draws.push(draw);
        self.draws.len() - 1
    }

    pub fn add_point_light(&mut self, light: PointLightData) {
        self.point_lights.push(light);
    }

    /// Add a material to the frame's material set. Adding twice is a no-op.
    pub fn add_material(&mut self, material: Handle<Material>) {
        if !self.materials.contains(&material) {
            self.materials.push(material);
        }
    }

    pub fn assign_camera(
        &mut self,
        position: Vec3,
        camera: &Camera,
        settings: &ProjectionSettings,
    ) {
        let projection = camera.projection(settings.aspect, settings.near, settings.far);
        let view = camera.view(position);
        self.camera = CameraData {
            projection,
            view,
            projection_view: projection * view,
            position,
        };
        self.environment_map = camera.env_map;
    }

    /// Snapshot the scene. The database must have been reset first.
    ///
    /// The first entity with a Transform and Camera becomes the active camera.
    /// Materials, draws and lights are only collected when the camera's
    /// environment map is ready. Draws follow entity order, so a renderable's
    /// draw index does not depend on which other components it carries.
    pub fn populate(
        &mut self,
        world: &mut World,
        assets: &Assets,
        settings: &ProjectionSettings,
    ) -> RenderResult<DatabaseState> {
        let mut cameras = world.query::<(&Transform, &Camera)>();
        let active = cameras
            .iter(world)
            .next()
            .map(|(transform, camera)| (transform.position, camera.clone()));

        if let Some((position, camera)) = active {
            self.assign_camera(position, &camera, settings);
            self.advance(DatabaseState::CameraAssigned)?;
        }

        if self.environment_map.is_none() || !assets.is_ready(self.environment_map) {
            self.advance(DatabaseState::EmptyFrame)?;
            return Ok(self.state);
        }

        for material in assets.enumerate_loaded::<Material>() {
            self.add_material(material);
        }

        let mut renderables =
            world.query::<(Entity, &Transform, &MeshRenderer, &StaticMesh)>();
        let mut found: Vec<_> = renderables.iter(world).collect();
        found.sort_unstable_by_key(|(entity, ..)| *entity);
        for (_, transform, renderer, mesh) in found {
            self.add_draw(Draw {
                mesh: mesh.mesh,
                material: renderer.material,
                transform: transform.matrix(),
            });
        }

        let mut lights = world.query::<(&Transform, &PointLight)>();
        for (transform, light) in lights.iter(world) {
            self.add_point_light(PointLightData {
                position: transform.position,
                radius: light.radius,
                color: light.color,
                intensity: light.intensity,
            });
        }

        self.advance(DatabaseState::PopulatedForDraw)?;
        Ok(self.state)
    }

    fn advance(&mut self, next: DatabaseState) -> RenderResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(RenderError::InvalidDatabaseTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    pub fn state(&self) -> DatabaseState {
        self.state
    }

    pub fn camera(&self) -> &CameraData {
        &self.camera
    }

    pub fn environment_map(&self) -> Handle<EnvMap> {
        self.environment_map
    }

    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn draw_count(&self) -> usize {
        self.draws.len()
    }

    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    pub fn point_lights(&self) -> &[PointLightData] {
        &self.point_lights
    }

    pub fn materials(&self) -> &[Handle<Material>] {
        &self.materials
    }

    /// Position of `material` in the frame's material set
    pub fn material_index(&self, material: Handle<Material>) -> Option<usize> {
        self.materials.iter().position(|m| *m == material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::{TextureHandle, TextureViewHandle};

    const SETTINGS: ProjectionSettings = ProjectionSettings {
        aspect: 16.0 / 9.0,
        near: 0.1,
        far: 100.0,
    };

    fn env_map() -> EnvMap {
        EnvMap {
            name: "sky".to_string(),
            texture: TextureHandle(1),
            view: TextureViewHandle(1),
            face_size: 16,
        }
    }

    fn scene(assets: &Assets, env_ready: bool) -> World {
        let env = if env_ready {
            assets.insert("sky", env_map())
        } else {
            assets.request::<EnvMap>("sky")
        };
        let material = assets.insert("red", Material::plastic(Vec3::X));
        let mesh = assets.request::<Mesh>("cube");

        let mut world = World::new();
        world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, 5.0)),
            Camera::perspective_degrees(60.0).with_env_map(env),
        ));
        for x in 0..3 {
            world.spawn((
                Transform::from_position(Vec3::new(x as f32, 0.0, 0.0)),
                MeshRenderer::new(material),
                StaticMesh::new(mesh),
            ));
        }
        world.spawn((
            Transform::from_position(Vec3::Y),
            PointLight::new(Vec3::ONE, 2.0, 5.0),
        ));
        world
    }

    #[test]
    fn test_populate_with_ready_environment() {
        let assets = Assets::new();
        let mut world = scene(&assets, true);
        let mut database = RenderDatabase::new();

        let state = database.populate(&mut world, &assets, &SETTINGS).unwrap();

        assert_eq!(state, DatabaseState::PopulatedForDraw);
        assert_eq!(database.draws().len(), 3);
        assert_eq!(database.transforms().len(), database.draws().len());
        for (draw, transform) in database.draws().iter().zip(database.transforms()) {
            assert_eq!(draw.transform, *transform);
        }
        assert_eq!(database.transforms()[2].w_axis.x, 2.0);
        assert_eq!(database.point_lights().len(), 1);
        assert_eq!(database.point_lights()[0].position, Vec3::Y);
        assert_eq!(database.materials().len(), 1);
    }

    #[test]
    fn test_draw_order_ignores_extra_components() {
        let assets = Assets::new();
        let mut world = scene(&assets, true);

        let mut meshes = world.query_filtered::<Entity, With<StaticMesh>>();
        let middle = meshes.iter(&world).nth(1).unwrap();
        world.entity_mut(middle).insert(PointLight::default());

        let mut database = RenderDatabase::new();
        database.populate(&mut world, &assets, &SETTINGS).unwrap();

        let xs: Vec<f32> = database.transforms().iter().map(|m| m.w_axis.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(database.point_lights().len(), 2);
    }

    #[test]
    fn test_unready_environment_gives_empty_frame() {
        let assets = Assets::new();
        let mut world = scene(&assets, false);
        let mut database = RenderDatabase::new();

        let state = database.populate(&mut world, &assets, &SETTINGS).unwrap();

        assert_eq!(state, DatabaseState::EmptyFrame);
        assert!(database.draws().is_empty());
        assert!(database.point_lights().is_empty());
        assert!(database.materials().is_empty());
        // The camera is still assigned
        assert_eq!(database.camera().position, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_no_camera_gives_defaults() {
        let assets = Assets::new();
        let mut world = World::new();
        world.spawn((Transform::new(), MeshRenderer::default(), StaticMesh::default()));
        let mut database = RenderDatabase::new();

        let state = database.populate(&mut world, &assets, &SETTINGS).unwrap();

        assert_eq!(state, DatabaseState::EmptyFrame);
        assert_eq!(*database.camera(), CameraData::default());
        assert!(database.environment_map().is_none());
        assert!(database.draws().is_empty());
    }

    #[test]
    fn test_camera_matrices() {
        let assets = Assets::new();
        let mut world = scene(&assets, true);
        let mut database = RenderDatabase::new();
        database.populate(&mut world, &assets, &SETTINGS).unwrap();

        let camera = database.camera();
        let mut expected = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        expected.y_axis.y *= -1.0;
        assert_eq!(camera.projection, expected);
        assert_eq!(
            camera.view,
            Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 4.0), Vec3::Y)
        );
        assert_eq!(camera.projection_view, camera.projection * camera.view);
    }

    #[test]
    fn test_populate_requires_reset() {
        let assets = Assets::new();
        let mut world = scene(&assets, true);
        let mut database = RenderDatabase::new();
        database.populate(&mut world, &assets, &SETTINGS).unwrap();

        let result = database.populate(&mut world, &assets, &SETTINGS);
        assert!(matches!(
            result,
            Err(RenderError::InvalidDatabaseTransition {
                from: DatabaseState::PopulatedForDraw,
                ..
            })
        ));

        database.reset();
        assert_eq!(database.state(), DatabaseState::Reset);
        assert!(database.draws().is_empty());
        assert!(database.populate(&mut world, &assets, &SETTINGS).is_ok());
        assert_eq!(database.draws().len(), 3);
    }

    #[test]
    fn test_materials_are_a_set() {
        let assets = Assets::new();
        let material = assets.insert("m", Material::default());
        let mut database = RenderDatabase::new();

        database.add_material(material);
        database.add_material(material);

        assert_eq!(database.materials().len(), 1);
        assert_eq!(database.material_index(material), Some(0));
        assert_eq!(database.material_index(Handle::NONE), None);
    }
}
