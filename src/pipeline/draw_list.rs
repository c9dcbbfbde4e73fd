//! Mesh draw recording shared by the basic and geometry passes

use crate::backend::command::CommandBuffer;
use crate::backend::types::ShaderStageFlags;
use crate::database::{Draw, RenderDatabase};
use crate::resources::Assets;
use bytemuck::Pod;

/// Record one indexed draw per database draw whose mesh is ready.
///
/// Draws keep their database index: `push` receives it so shaders can fetch
/// the matching transform, and a skipped draw leaves a gap instead of
/// shifting later indices. Returns the number of draws recorded.
pub fn record_mesh_draws<T, F>(
    cmd: &mut CommandBuffer,
    database: &RenderDatabase,
    assets: &Assets,
    stages: ShaderStageFlags,
    push: F,
) -> usize
where
    T: Pod,
    F: Fn(usize, &Draw) -> T,
{
    let mut recorded = 0;

    for (index, draw) in database.draws().iter().enumerate() {
        let Some(mesh) = assets.get(draw.mesh) else {
            log::trace!("Skipping draw {index}: mesh not ready");
            continue;
        };

        cmd.bind_vertex_buffer(0, mesh.vertex_buffer, 0);
        cmd.bind_index_buffer(mesh.index_buffer, 0, mesh.index_format());
        cmd.push_constants(stages, 0, &push(index, draw));
        cmd.draw_indexed(0..mesh.index_count, 0, 0..1);
        recorded += 1;
    }

    recorded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::command::Command;
    use crate::backend::traits::BufferHandle;
    use crate::resources::{Handle, Mesh};
    use glam::Mat4;

    fn mesh(id: u64) -> Mesh {
        Mesh {
            name: format!("mesh_{id}"),
            vertex_buffer: BufferHandle(id * 10),
            index_buffer: BufferHandle(id * 10 + 1),
            index_count: 36,
        }
    }

    fn draw(mesh: Handle<Mesh>) -> Draw {
        Draw {
            mesh,
            material: Handle::NONE,
            transform: Mat4::IDENTITY,
        }
    }

    #[test]
    fn test_unready_meshes_are_skipped_in_place() {
        let assets = Assets::new();
        let ready = assets.insert("ready", mesh(1));
        let pending = assets.request::<Mesh>("pending");

        let mut database = RenderDatabase::new();
        database.add_draw(draw(ready));
        database.add_draw(draw(pending));
        database.add_draw(draw(ready));

        let mut cmd = CommandBuffer::new();
        let recorded = record_mesh_draws(
            &mut cmd,
            &database,
            &assets,
            ShaderStageFlags::VERTEX,
            |index, _| index as u32,
        );

        assert_eq!(recorded, 2);
        assert_eq!(cmd.draw_count(), 2);
        assert_eq!(cmd.pushed_words(), vec![vec![0], vec![2]]);
        assert!(cmd.commands().contains(&Command::DrawIndexed {
            indices: 0..36,
            base_vertex: 0,
            instances: 0..1,
        }));
    }

    #[test]
    fn test_draw_sequence() {
        let assets = Assets::new();
        let ready = assets.insert("ready", mesh(2));
        let mut database = RenderDatabase::new();
        database.add_draw(draw(ready));

        let mut cmd = CommandBuffer::new();
        record_mesh_draws(&mut cmd, &database, &assets, ShaderStageFlags::VERTEX, |i, _| {
            i as u32
        });

        let commands = cmd.commands();
        assert_eq!(commands.len(), 4);
        assert!(matches!(commands[0], Command::BindVertexBuffer { slot: 0, buffer, .. } if buffer == BufferHandle(20)));
        assert!(matches!(commands[1], Command::BindIndexBuffer { buffer, .. } if buffer == BufferHandle(21)));
        assert!(matches!(commands[2], Command::PushConstants { .. }));
        assert!(commands[3].is_draw());
    }
}
