//! ECS components for scene objects.
//!
//! Every scene object is a `hecs` entity. Renderable entities carry a
//! [`Transform`](crate::Transform) plus a [`Renderable`]; they are drawn only
//! while tagged [`InGraph`], which is how scenes enable and disable themselves
//! without despawning anything.
//!
//! ```ignore
//! let cube = world.spawn((
//!     Transform::new().position(Vec3::new(0.0, 0.0, -5.0)),
//!     Renderable::new(box_mesh, writer_material),
//!     DrawOrder(0),
//! ));
//! world.insert_one(cube, InGraph)?;
//! ```

use glam::{EulerRot, Mat4, Quat, Vec2};
use hecs::{Entity, World};

use crate::mesh::Transform;

/// Type-safe handle to a geometry in the context's geometry registry.
///
/// This newtype wrapper prevents accidentally passing material or texture
/// indices where geometry indices are expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Type-safe handle to a CPU texture in the context's texture registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) usize);

/// Type-safe handle to a material in the context's material registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialId(pub(crate) usize);

/// Geometry plus material: enough to draw an entity.
#[derive(Clone, Copy, Debug)]
pub struct Renderable {
    pub mesh: MeshId,
    pub material: MaterialId,
}

impl Renderable {
    pub fn new(mesh: MeshId, material: MaterialId) -> Self {
        Self { mesh, material }
    }
}

/// Marker for entities currently part of the render graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InGraph;

/// Transform parent. World matrices compose up the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Spawn sequence number, the tie-breaker inside a render bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DrawOrder(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpinState {
    #[default]
    Spinning,
    /// Held in place, e.g. while its portal is entered.
    Settled,
}

/// Idle rotation about the x and y axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spin {
    /// Radians added per 60 Hz frame.
    pub speed: f32,
    pub angles: Vec2,
    pub state: SpinState,
}

impl Spin {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            angles: Vec2::ZERO,
            state: SpinState::Spinning,
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.angles.x, self.angles.y, 0.0)
    }
}

// Guards against accidental parent cycles.
const MAX_DEPTH: usize = 32;

/// World matrix of `entity`, composing [`Parent`] transforms.
pub fn world_matrix(world: &World, entity: Entity) -> Option<Mat4> {
    let mut matrix = world.get::<&Transform>(entity).ok()?.matrix();
    let mut cursor = world.get::<&Parent>(entity).ok().map(|p| p.0);
    let mut depth = 0;
    while let Some(parent) = cursor {
        if depth >= MAX_DEPTH {
            tracing::warn!(?entity, "parent chain too deep, truncating");
            break;
        }
        let Ok(transform) = world.get::<&Transform>(parent) else {
            break;
        };
        matrix = transform.matrix() * matrix;
        cursor = world.get::<&Parent>(parent).ok().map(|p| p.0);
        depth += 1;
    }
    Some(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn world_matrix_follows_parents() {
        let mut world = World::new();
        let group = world.spawn((Transform::from_position(Vec3::new(2.0, 0.0, -4.0)),));
        let child = world.spawn((
            Transform::from_position(Vec3::new(1.0, 1.0, 0.0)),
            Parent(group),
        ));

        let m = world_matrix(&world, child).unwrap();
        let origin = m.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(3.0, 1.0, -4.0)).length() < 1e-5);
    }

    #[test]
    fn world_matrix_requires_transform() {
        let mut world = World::new();
        let bare = world.spawn((DrawOrder(0),));
        assert!(world_matrix(&world, bare).is_none());
    }
}
