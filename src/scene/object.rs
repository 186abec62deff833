//! Scene object description.

use glam::Vec3;
use hecs::Entity;

use crate::ecs::{MaterialId, MeshId, Spin};
use crate::interacter::Handlers;
use crate::mesh::Transform;

/// A positioned mesh with optional pointer handlers, ready to be spawned.
///
/// Handlers are plain actions (see [`Handlers`]); the context registers them
/// with the interacter against the spawned entity. An object with handlers
/// gets a box collider fitted to its geometry.
///
/// # Example
///
/// ```ignore
/// let window = ctx.spawn(
///     SceneObject::new(plane, mint)
///         .at(Vec3::new(0.0, 0.0, -2.5))
///         .on_click(Action::EnterProject(0))
///         .on_hover(Action::HoverGrow)
///         .on_dehover(Action::HoverShrink),
/// );
/// ```
#[derive(Clone, Debug)]
pub struct SceneObject<A> {
    pub mesh: MeshId,
    pub material: MaterialId,
    pub transform: Transform,
    pub handlers: Handlers<A>,
    pub spin: Option<Spin>,
    pub parent: Option<Entity>,
}

impl<A> SceneObject<A> {
    pub fn new(mesh: MeshId, material: MaterialId) -> Self {
        Self {
            mesh,
            material,
            transform: Transform::default(),
            handlers: Handlers::default(),
            spin: None,
            parent: None,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn on_click(mut self, action: A) -> Self {
        self.handlers.on_click = Some(action);
        self
    }

    pub fn on_hover(mut self, action: A) -> Self {
        self.handlers.on_hover = Some(action);
        self
    }

    pub fn on_dehover(mut self, action: A) -> Self {
        self.handlers.on_dehover = Some(action);
        self
    }

    /// Idle rotation, advanced every tick while the object is in the graph.
    pub fn spin(mut self, speed: f32) -> Self {
        self.spin = Some(Spin::new(speed));
        self
    }

    /// Position relative to `parent`'s transform.
    pub fn parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_interactive(&self) -> bool {
        !self.handlers.is_empty()
    }
}
