//! Scene definition.

use std::collections::HashMap;

use hecs::{Entity, World};

use crate::ecs::{InGraph, MaterialId, MeshId};
use crate::picking::Collider;

/// An ordered group of spawned objects plus the named resources they share.
///
/// A scene never owns its entities' lifetimes; it only decides whether they
/// are part of the render graph. Toggling is idempotent: enabling an enabled
/// scene (or disabling a disabled one) changes nothing.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Name used in logs.
    pub name: String,

    /// Spawned objects in insertion (paint) order.
    pub objects: Vec<Entity>,

    /// Shared materials, by name.
    pub materials: HashMap<String, MaterialId>,

    /// Shared geometries, by name.
    pub geometries: HashMap<String, MeshId>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, entity: Entity) -> Entity {
        self.objects.push(entity);
        entity
    }

    /// Put every object into the render graph.
    pub fn enable(&self, world: &mut World) {
        let mut added = 0;
        for &entity in &self.objects {
            if world.satisfies::<&InGraph>(entity).unwrap_or(true) {
                continue;
            }
            if world.insert_one(entity, InGraph).is_ok() {
                added += 1;
            }
        }
        tracing::debug!(scene = %self.name, added, "scene enabled");
    }

    /// Take every object out of the render graph.
    pub fn disable(&self, world: &mut World) {
        let mut removed = 0;
        for &entity in &self.objects {
            if world.remove_one::<InGraph>(entity).is_ok() {
                removed += 1;
            }
        }
        tracing::debug!(scene = %self.name, removed, "scene disabled");
    }

    /// True when every object is in the render graph.
    pub fn is_enabled(&self, world: &World) -> bool {
        self.objects
            .iter()
            .all(|&e| world.satisfies::<&InGraph>(e).unwrap_or(false))
    }

    /// Objects that pointer rays can hit, in insertion order.
    pub fn interactables(&self, world: &World) -> Vec<Entity> {
        self.objects
            .iter()
            .copied()
            .filter(|&e| world.satisfies::<&Collider>(e).unwrap_or(false))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Transform;

    fn scene_with(world: &mut World) -> (Scene, Entity, Entity) {
        let mut scene = Scene::new("test");
        let plain = scene.add(world.spawn((Transform::default(),)));
        let clickable = scene.add(world.spawn((Transform::default(), Collider::default())));
        (scene, plain, clickable)
    }

    #[test]
    fn enable_and_disable_are_idempotent() {
        let mut world = World::new();
        let (scene, plain, _) = scene_with(&mut world);

        scene.enable(&mut world);
        scene.enable(&mut world);
        assert!(scene.is_enabled(&world));
        assert_eq!(world.query::<&InGraph>().iter().count(), 2);

        scene.disable(&mut world);
        scene.disable(&mut world);
        assert!(!scene.is_enabled(&world));
        assert!(!world.satisfies::<&InGraph>(plain).unwrap());
    }

    #[test]
    fn interactables_are_collider_objects_in_order() {
        let mut world = World::new();
        let (mut scene, _, clickable) = scene_with(&mut world);
        let second = scene.add(world.spawn((Transform::default(), Collider::sphere(1.0))));
        assert_eq!(scene.interactables(&world), vec![clickable, second]);
    }

    #[test]
    fn despawned_objects_are_skipped() {
        let mut world = World::new();
        let (scene, plain, _) = scene_with(&mut world);
        world.despawn(plain).unwrap();
        scene.enable(&mut world);
        assert_eq!(world.query::<&InGraph>().iter().count(), 1);
    }
}
