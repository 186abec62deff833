//! Process-wide state for the portal scenes.
//!
//! The [`Context`] owns everything the scenes share: the camera, the hecs
//! world, resource registries, portals, the [`Interacter`] and the tween
//! engine. It is GPU-free; the renderer consumes [`Context::draw_list`]
//! once per frame.
//!
//! Tween completions are data ([`Completion`]), applied by [`Context::tick`]
//! in a fixed order: interactable swap, then portal state, then the caller's
//! action is handed back for dispatch.

use fontdue::Font;
use glam::{Mat4, Vec2, Vec3};
use hecs::{Entity, EntityBuilder, World};
use winit::window::CursorIcon;

use crate::animations::{self, Tuning};
use crate::camera::Camera;
use crate::ecs::{DrawOrder, InGraph, MaterialId, MeshId, Parent, Renderable, TextureId};
use crate::input::CanvasRect;
use crate::interacter::{Interacter, Interaction};
use crate::material::{DepthMode, Material, Materials};
use crate::mesh::{Geometries, Geometry, Transform};
use crate::picking::{Collider, Ray};
use crate::portal::{PortalId, PortalState, Portals};
use crate::scene::SceneObject;
use crate::stencil::{StencilAllocator, StencilError, StencilFace};
use crate::text::{self, EstimatedMetrics, TextStyle};
use crate::texture::{TextureData, Textures};
use crate::tween::{Animatable, Channel, Easing, Target, TweenKey, TweenValue, Tweener};

/// Smallest edge of a text quad, so empty strings still get a valid mesh.
const MIN_TEXT_EXTENT: f32 = 1e-3;

/// What happens when a tween finishes.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion<A> {
    pub interactables: Option<Vec<Entity>>,
    pub portal: Option<(PortalId, PortalState)>,
    pub then: Option<A>,
}

impl<A> Default for Completion<A> {
    fn default() -> Self {
        Self {
            interactables: None,
            portal: None,
            then: None,
        }
    }
}

impl<A> Completion<A> {
    pub fn action(action: A) -> Self {
        Self {
            then: Some(action),
            ..Default::default()
        }
    }
}

/// A text object spawned by [`Context::create_text`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextObject {
    pub entity: Entity,
    pub material: MaterialId,
    /// Quad size in world units.
    pub size: Vec2,
    pub lines: usize,
}

/// One mesh to draw this frame, with its stencil state resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub entity: Entity,
    pub mesh: MeshId,
    pub material: MaterialId,
    pub model: Mat4,
    pub stencil: StencilFace,
    /// Gate bucket, then spawn order.
    pub order: (u8, u64),
}

pub struct Context<A> {
    pub camera: Camera,
    pub world: World,
    pub materials: Materials,
    pub geometries: Geometries,
    pub textures: Textures,
    pub portals: Portals,
    pub interacter: Interacter<A>,
    pub tweens: Tweener<Completion<A>>,
    pub tuning: Tuning,
    stencil: StencilAllocator,
    font: Option<Font>,
    cursor: CursorIcon,
    viewport: CanvasRect,
    time: f32,
    next_draw_order: u64,
}

impl<A: Clone> Context<A> {
    pub fn new(viewport: CanvasRect, tuning: Tuning) -> Result<Self, StencilError> {
        let stencil = StencilAllocator::new(tuning.stencil_layer_bits)?;
        Ok(Self {
            camera: Camera::new().with_aspect(viewport.aspect()),
            world: World::new(),
            materials: Materials::default(),
            geometries: Geometries::default(),
            textures: Textures::default(),
            portals: Portals::new(),
            interacter: Interacter::new(),
            tweens: Tweener::new(),
            tuning,
            stencil,
            font: None,
            cursor: CursorIcon::Default,
            viewport,
            time: 0.0,
            next_draw_order: 0,
        })
    }

    /// Rasterize text with `font` instead of drawing placeholder slabs.
    pub fn with_font(mut self, font: Option<Font>) -> Self {
        self.font = font;
        self
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn viewport(&self) -> CanvasRect {
        self.viewport
    }

    /// Track a new canvas size. Cheap, and a no-op for repeated or
    /// degenerate sizes.
    pub fn resize(&mut self, viewport: CanvasRect) {
        if viewport.width <= 0.0 || viewport.height <= 0.0 || viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.camera.aspect = viewport.aspect();
    }

    /// Seconds since startup, as fed to screen-space shading.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: CursorIcon) {
        self.cursor = cursor;
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> MeshId {
        self.geometries.add(geometry)
    }

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.add(material)
    }

    pub fn add_texture(&mut self, data: TextureData) -> TextureId {
        self.textures.add(data)
    }

    /// Load an image, registering a placeholder if it cannot be decoded.
    pub fn load_texture(&mut self, path: &str) -> TextureId {
        self.textures.add(TextureData::load_or_placeholder(path))
    }

    /// Allocate a stencil layer for a new portal.
    pub fn create_portal(&mut self, parent: Option<PortalId>) -> Result<PortalId, StencilError> {
        let layer = self.stencil.allocate()?;
        let id = self.portals.insert(layer, parent);
        tracing::info!(
            portal = id.0,
            reference = layer.reference(),
            parent = ?parent.map(|p| p.0),
            "portal allocated"
        );
        Ok(id)
    }

    pub fn stencil_capacity(&self) -> u32 {
        self.stencil.capacity()
    }

    /// Spawn an object into the world (not yet into the render graph).
    pub fn spawn(&mut self, object: SceneObject<A>) -> Entity {
        let interactive = object.is_interactive();
        let collider = interactive
            .then(|| self.geometries.get(object.mesh))
            .flatten()
            .map(|geometry| {
                let (min, max) = geometry.bounds();
                Collider::from_bounds(min, max)
            });

        let mut builder = EntityBuilder::new();
        builder
            .add(object.transform)
            .add(Renderable::new(object.mesh, object.material))
            .add(DrawOrder(self.next_draw_order));
        self.next_draw_order += 1;
        if let Some(collider) = collider {
            builder.add(collider);
        }
        if let Some(spin) = object.spin {
            builder.add(spin);
        }
        if let Some(parent) = object.parent {
            builder.add(Parent(parent));
        }

        let entity = self.world.spawn(builder.build());
        if interactive {
            self.interacter.register(entity, object.handlers);
        }
        entity
    }

    /// Spawn a bare transform that other objects can parent to.
    pub fn spawn_group(&mut self, transform: Transform) -> Entity {
        self.world.spawn((transform,))
    }

    /// Lay out `text` and spawn it as one textured quad.
    ///
    /// `material` replaces the default transparent basic material; its
    /// texture is always set to the rasterized text.
    pub fn create_text(&mut self, text: &str, style: &TextStyle, material: Option<Material>) -> TextObject {
        let label = format!("text {:?}", truncate(text, 24));
        let (layout, texture) = match &self.font {
            Some(font) => {
                let layout = text::layout(text, style, font);
                let texture = text::rasterize(&layout, font, &label);
                (layout, texture)
            }
            None => {
                let layout = text::layout(text, style, &EstimatedMetrics);
                let texture = if layout.is_empty() {
                    TextureData::blank(label)
                } else {
                    TextureData::placeholder(label)
                };
                (layout, texture)
            }
        };

        let size = layout.size().max(Vec2::splat(MIN_TEXT_EXTENT));
        let mesh = self.add_geometry(Geometry::plane(size.x, size.y));
        let texture = self.add_texture(texture);
        let material = material
            .unwrap_or_else(|| {
                Material::basic(style.color)
                    .depth(DepthMode::TestOnly)
                    .double_sided()
                    .transparent()
            })
            .texture(texture);
        let material = self.add_material(material);

        let offset = layout.center_offset(style.anchor_x, style.anchor_y);
        let entity = self.spawn(SceneObject::new(mesh, material).at(style.position + offset.extend(0.0)));
        TextObject {
            entity,
            material,
            size,
            lines: layout.lines.len(),
        }
    }

    /// Current value of an animatable property.
    pub fn read(&self, key: TweenKey) -> Option<TweenValue> {
        read_value(&self.camera, &self.world, key)
    }

    /// Tween `key` from its current value to `to`, replacing any tween
    /// already running on it.
    pub fn tween(
        &mut self,
        key: TweenKey,
        to: TweenValue,
        duration: f32,
        easing: Easing,
        on_complete: Option<Completion<A>>,
    ) -> bool {
        let Some(from) = self.read(key) else {
            tracing::warn!(?key, "tween target has no such property");
            return false;
        };
        self.tweens.start(key, from, to, duration, easing, on_complete);
        true
    }

    pub fn kill_tweens_of(&mut self, target: Target) -> usize {
        self.tweens.kill_tweens_of(target)
    }

    /// World-space ray through a point in normalized device coordinates.
    pub fn pointer_ray(&self, ndc: Vec2) -> Ray {
        Ray::from_ndc(ndc, self.camera.view_matrix(), self.camera.projection_matrix())
    }

    /// Pointer moved to `client` (window pixels).
    pub fn pointer_move(&mut self, client: Vec2) -> Vec<Interaction<A>> {
        self.look_toward(client);
        let ndc = self.viewport.to_ndc(client);
        let ray = self.pointer_ray(ndc);
        self.interacter.on_pointer_move(ndc, &ray, &self.world)
    }

    pub fn pointer_down(&mut self, client: Vec2) -> Option<Interaction<A>> {
        let ndc = self.viewport.to_ndc(client);
        let ray = self.pointer_ray(ndc);
        self.interacter.on_pointer_down(ndc, &ray, &self.world)
    }

    /// Pop the most recent escape action.
    pub fn cancel(&mut self) -> Option<A> {
        self.interacter.on_cancel()
    }

    /// Ease camera pitch/yaw toward the pointer's offset from canvas centre.
    fn look_toward(&mut self, client: Vec2) {
        let offset = self.viewport.normalized(client) - Vec2::splat(0.5);
        let max = self.tuning.look_max;
        let target = Vec3::new(-offset.y * max, -offset.x * max, 0.0);
        let duration = self.tuning.look_duration;
        self.tween(
            TweenKey::camera(Channel::Look),
            TweenValue::Vector(target),
            duration,
            Easing::Power4Out,
            None,
        );
    }

    /// Advance one frame. Returns the actions of tweens that completed.
    pub fn tick(&mut self, dt: f32) -> Vec<A> {
        self.time += dt;
        let completed = {
            let mut stage = Stage {
                camera: &mut self.camera,
                world: &mut self.world,
            };
            self.tweens.advance(dt, &mut stage)
        };

        let mut actions = Vec::new();
        for done in completed {
            if let Some(set) = done.interactables {
                self.interacter.set_interactables(set);
            }
            if let Some((portal, state)) = done.portal {
                self.portals.set_state(portal, state);
            }
            if let Some(action) = done.then {
                actions.push(action);
            }
        }

        animations::spin_all(&mut self.world, dt);
        actions
    }

    /// Everything in the render graph, in draw order.
    pub fn draw_list(&self) -> Vec<DrawItem> {
        let mut query = self
            .world
            .query::<(&Renderable, &DrawOrder)>()
            .with::<&InGraph>();
        let mut items: Vec<DrawItem> = query
            .iter()
            .filter_map(|(entity, (renderable, order))| {
                let material = self.materials.get(renderable.material)?;
                let model = crate::ecs::world_matrix(&self.world, entity)?;
                Some(DrawItem {
                    entity,
                    mesh: renderable.mesh,
                    material: renderable.material,
                    model,
                    stencil: self.portals.resolve(material.stencil),
                    order: (self.portals.render_order(material.stencil), order.0),
                })
            })
            .collect();
        items.sort_by_key(|item| item.order);
        items
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn read_value(camera: &Camera, world: &World, key: TweenKey) -> Option<TweenValue> {
    match key.target {
        Target::Camera => match key.channel {
            Channel::Position => Some(TweenValue::Vector(camera.position)),
            Channel::PositionX => Some(TweenValue::Scalar(camera.position.x)),
            Channel::PositionY => Some(TweenValue::Scalar(camera.position.y)),
            Channel::Look => Some(TweenValue::Vector(Vec3::new(camera.pitch, camera.yaw, 0.0))),
            Channel::Scale => None,
        },
        Target::Entity(entity) => {
            let transform = world.get::<&Transform>(entity).ok()?;
            match key.channel {
                Channel::Position => Some(TweenValue::Vector(transform.position)),
                Channel::PositionX => Some(TweenValue::Scalar(transform.position.x)),
                Channel::PositionY => Some(TweenValue::Scalar(transform.position.y)),
                Channel::Scale => Some(TweenValue::Vector(transform.scale)),
                Channel::Look => None,
            }
        }
    }
}

/// Mutable view of everything tweens can touch.
struct Stage<'a> {
    camera: &'a mut Camera,
    world: &'a mut World,
}

impl Animatable for Stage<'_> {
    fn read(&self, key: TweenKey) -> Option<TweenValue> {
        read_value(self.camera, self.world, key)
    }

    fn write(&mut self, key: TweenKey, value: TweenValue) {
        match (key.target, key.channel, value) {
            (Target::Camera, Channel::Position, TweenValue::Vector(v)) => self.camera.position = v,
            (Target::Camera, Channel::PositionX, TweenValue::Scalar(x)) => self.camera.position.x = x,
            (Target::Camera, Channel::PositionY, TweenValue::Scalar(y)) => self.camera.position.y = y,
            (Target::Camera, Channel::Look, TweenValue::Vector(v)) => {
                self.camera.pitch = v.x;
                self.camera.yaw = v.y;
            }
            (Target::Entity(entity), channel, value) => {
                let Ok(mut transform) = self.world.get::<&mut Transform>(entity) else {
                    return;
                };
                match (channel, value) {
                    (Channel::Position, TweenValue::Vector(v)) => transform.position = v,
                    (Channel::PositionX, TweenValue::Scalar(x)) => transform.position.x = x,
                    (Channel::PositionY, TweenValue::Scalar(y)) => transform.position.y = y,
                    (Channel::Scale, TweenValue::Vector(v)) => transform.scale = v,
                    _ => tracing::trace!(?key, "mismatched tween value"),
                }
            }
            _ => tracing::trace!(?key, "mismatched tween value"),
        }
    }
}
