//! One project: a window in the projects view and the content behind it.
//!
//! The content (backdrop, image carousel, title, write-up) reads the
//! project's own portal, so from the projects view it only shows through
//! the window. Once entered, the wheel scrolls the content and the arrow
//! keys page the carousel.

use glam::Vec3;
use hecs::Entity;

use super::object::SceneObject;
use super::portfolio::Action;
use super::scene::Scene;
use crate::animations;
use crate::content::ProjectContent;
use crate::context::{Completion, Context, TextObject};
use crate::ecs::MeshId;
use crate::material::{Material, ScreenPattern, Shading};
use crate::mesh::Transform;
use crate::portal::PortalId;
use crate::stencil::StencilError;
use crate::text::{AnchorX, AnchorY, TextStyle};
use crate::tween::{Channel, Easing, TweenKey, TweenValue};

/// How far behind its window a project's content sits.
const CONTENT_DEPTH: f32 = 3.0;
/// Camera stop past the window, in front of the content.
const VIEWING_DISTANCE: f32 = 2.5;
const BACKDROP_DEPTH: f32 = 2.0;

/// Clamped content offset driven by the wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollState {
    pub offset: f32,
    pub max: f32,
    /// Offset per wheel pixel.
    pub speed: f32,
}

impl ScrollState {
    pub fn new(max: f32, speed: f32) -> Self {
        Self {
            offset: 0.0,
            max: max.max(0.0),
            speed,
        }
    }

    /// Apply a wheel delta, returning the new offset (always in `0..=max`).
    pub fn apply(&mut self, delta_y: f32) -> f32 {
        if delta_y.is_finite() {
            self.offset = (self.offset + delta_y * self.speed).clamp(0.0, self.max);
        }
        self.offset
    }

    pub fn reset(&mut self) {
        self.offset = 0.0;
    }
}

/// Horizontally paged image strip.
#[derive(Clone, Debug, PartialEq)]
pub struct Carousel {
    pub group: Entity,
    pub slides: Vec<Entity>,
    pub index: usize,
    pub spacing: f32,
    /// Group x when showing slide 0.
    pub base_x: f32,
    /// Width over height of the first image; every slide uses it.
    pub aspect: f32,
    pending: Option<usize>,
}

impl Carousel {
    /// Whether a page turn is still in flight.
    pub fn is_animating(&self) -> bool {
        self.pending.is_some()
    }

    /// Group x that centres slide `index`.
    pub fn offset_for(&self, index: usize) -> f32 {
        self.base_x - self.spacing * index as f32
    }

    pub fn next(&mut self, ctx: &mut Context<Action>, project: usize) -> bool {
        self.page(ctx, project, 1)
    }

    pub fn prev(&mut self, ctx: &mut Context<Action>, project: usize) -> bool {
        self.page(ctx, project, -1)
    }

    fn page(&mut self, ctx: &mut Context<Action>, project: usize, step: isize) -> bool {
        if self.is_animating() {
            tracing::debug!(project, "carousel busy, page ignored");
            return false;
        }
        let count = self.slides.len();
        if count == 0 {
            return false;
        }
        let target = (self.index as isize + step).rem_euclid(count as isize) as usize;
        let duration = ctx.tuning.carousel_duration;
        let started = ctx.tween(
            TweenKey::entity(self.group, Channel::PositionX),
            TweenValue::Scalar(self.offset_for(target)),
            duration,
            Easing::Power3InOut,
            Some(Completion::action(Action::CarouselSettled(project))),
        );
        if started {
            self.pending = Some(target);
        }
        started
    }

    /// Commit the page turn once its tween has finished.
    pub fn settle(&mut self) {
        if let Some(index) = self.pending.take() {
            self.index = index;
        }
    }
}

pub struct ProjectObject {
    pub index: usize,
    pub portal: PortalId,
    /// Writer plane clicked to enter.
    pub window: Entity,
    /// Everything drawn through the window.
    pub scene: Scene,
    pub carousel: Carousel,
    pub scroll: ScrollState,
    pub title: TextObject,
    pub writeup: TextObject,
    /// Entities moved by scrolling, with their resting y.
    scrollables: Vec<(Entity, f32)>,
    position: Vec3,
}

impl ProjectObject {
    pub fn build(
        ctx: &mut Context<Action>,
        index: usize,
        content: &ProjectContent,
        position: Vec3,
        parent: PortalId,
        plane: MeshId,
        backdrop: MeshId,
    ) -> Result<Self, StencilError> {
        let portal = ctx.create_portal(Some(parent))?;
        let mut scene = Scene::new(format!("project {index}"));

        let window_material = ctx.add_material(
            Material::portal_writer(portal).shading(Shading::Screen(ScreenPattern::Mint)),
        );
        let window = ctx.spawn(
            SceneObject::new(plane, window_material)
                .at(position)
                .on_click(Action::EnterProject(index))
                .on_hover(Action::HoverGrow)
                .on_dehover(Action::HoverShrink),
        );

        let content_z = position.z - CONTENT_DEPTH;
        let backdrop_material = ctx.add_material(
            Material::portal_reader(portal).shading(Shading::Screen(ScreenPattern::Blush)),
        );
        scene.add(ctx.spawn(
            SceneObject::new(backdrop, backdrop_material)
                .at(Vec3::new(position.x, 0.0, content_z - BACKDROP_DEPTH)),
        ));

        let carousel = Self::build_carousel(ctx, &mut scene, content, portal, plane, position.x, content_z);

        let title_style = TextStyle::new(0.5).at(Vec3::new(position.x, 1.5, content_z));
        let title = ctx.create_text(&content.title, &title_style, Some(Material::portal_reader(portal)));
        scene.add(title.entity);

        let writeup_style = TextStyle::new(0.12)
            .max_width(2.8)
            .anchor(AnchorX::Center, AnchorY::Top)
            .at(Vec3::new(position.x, -0.8, content_z));
        let writeup =
            ctx.create_text(&content.writeup, &writeup_style, Some(Material::portal_reader(portal)));
        scene.add(writeup.entity);

        let scrollables = [carousel.group, title.entity, writeup.entity]
            .into_iter()
            .filter_map(|e| {
                let y = ctx.world.get::<&Transform>(e).ok()?.position.y;
                Some((e, y))
            })
            .collect();

        Ok(Self {
            index,
            portal,
            window,
            scene,
            carousel,
            scroll: ScrollState::new(ctx.tuning.scroll_max, ctx.tuning.scroll_speed),
            title,
            writeup,
            scrollables,
            position,
        })
    }

    fn build_carousel(
        ctx: &mut Context<Action>,
        scene: &mut Scene,
        content: &ProjectContent,
        portal: PortalId,
        plane: MeshId,
        base_x: f32,
        z: f32,
    ) -> Carousel {
        let textures: Vec<_> = content.images.iter().map(|path| ctx.load_texture(path)).collect();
        let aspect = textures
            .first()
            .and_then(|&t| ctx.textures.get(t))
            .map(|t| t.aspect())
            .unwrap_or(1.0);
        let spacing = ctx.tuning.carousel_spacing;
        let group = ctx.spawn_group(Transform::from_position(Vec3::new(base_x, 0.0, z)));

        let slides = textures
            .into_iter()
            .enumerate()
            .map(|(i, texture)| {
                let material = ctx.add_material(Material::portal_reader(portal).texture(texture));
                let transform = Transform::from_position(Vec3::new(spacing * i as f32, 0.0, 0.0))
                    .scale(Vec3::new(aspect, 1.0, 1.0));
                scene.add(ctx.spawn(
                    SceneObject::new(plane, material)
                        .transform(transform)
                        .parent(group),
                ))
            })
            .collect();

        Carousel {
            group,
            slides,
            index: 0,
            spacing,
            base_x,
            aspect,
            pending: None,
        }
    }

    /// Camera stop when this project is entered.
    pub fn viewpoint(&self) -> Vec3 {
        Vec3::new(
            self.position.x,
            self.position.y,
            self.position.z - CONTENT_DEPTH + VIEWING_DISTANCE,
        )
    }

    pub fn enter(&self, ctx: &mut Context<Action>) -> bool {
        animations::enter_scene(
            ctx,
            self.portal,
            self.viewpoint(),
            Some(&self.scene),
            Some(Action::ProjectEntered(self.index)),
        )
    }

    /// Fly back to `home`, re-arming `return_scene`, and ease the scroll back.
    pub fn exit(&mut self, ctx: &mut Context<Action>, home: Vec3, return_scene: &Scene) -> bool {
        let exited = animations::exit_scene(
            ctx,
            self.portal,
            home,
            Some(return_scene),
            Some(Action::ProjectExited(self.index)),
        );
        if exited {
            self.reset_scroll(ctx);
        }
        exited
    }

    /// Scroll the content by a wheel delta in pixels.
    pub fn on_wheel(&mut self, ctx: &mut Context<Action>, delta_y: f32) {
        let offset = self.scroll.apply(delta_y);
        for &(entity, base_y) in &self.scrollables {
            ctx.tweens.kill(TweenKey::entity(entity, Channel::PositionY));
            if let Ok(mut transform) = ctx.world.get::<&mut Transform>(entity) {
                transform.position.y = base_y + offset;
            }
        }
    }

    /// Ease every scrolled entity back to its resting height.
    pub fn reset_scroll(&mut self, ctx: &mut Context<Action>) {
        self.scroll.reset();
        let duration = ctx.tuning.scroll_reset_duration;
        for &(entity, base_y) in &self.scrollables {
            ctx.tween(
                TweenKey::entity(entity, Channel::PositionY),
                TweenValue::Scalar(base_y),
                duration,
                Easing::Power3InOut,
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animations::Tuning;
    use crate::input::CanvasRect;
    use crate::mesh::Geometry;

    fn project(images: &[&str]) -> (Context<Action>, ProjectObject) {
        let mut ctx = Context::new(CanvasRect::full(800, 600), Tuning::default()).unwrap();
        let parent = ctx.create_portal(None).unwrap();
        let plane = ctx.add_geometry(Geometry::plane(1.0, 1.0));
        let backdrop = ctx.add_geometry(Geometry::plane(50.0, 50.0));
        let content = ProjectContent {
            title: "Demo".into(),
            writeup: "A short write-up about the demo.".into(),
            images: images.iter().map(|s| s.to_string()).collect(),
        };
        let object =
            ProjectObject::build(&mut ctx, 0, &content, Vec3::new(0.0, 0.0, -3.0), parent, plane, backdrop)
                .unwrap();
        (ctx, object)
    }

    fn y_of(ctx: &Context<Action>, entity: Entity) -> f32 {
        ctx.world.get::<&Transform>(entity).unwrap().position.y
    }

    fn run(ctx: &mut Context<Action>, object: &mut ProjectObject, seconds: f32) {
        let steps = (seconds / 0.05).ceil() as usize;
        for _ in 0..steps {
            for action in ctx.tick(0.05) {
                if action == Action::CarouselSettled(0) {
                    object.carousel.settle();
                }
            }
        }
    }

    #[test]
    fn scroll_offset_stays_clamped() {
        let mut scroll = ScrollState::new(5.0, 0.003);
        for delta in [100.0, -5000.0, 1e9, f32::NAN, -3.0, 700.0] {
            let offset = scroll.apply(delta);
            assert!((0.0..=5.0).contains(&offset), "{delta} -> {offset}");
        }
        scroll.reset();
        assert_eq!(scroll.offset, 0.0);
    }

    #[test]
    fn wheel_moves_scrollables_and_reset_returns_them() {
        let (mut ctx, mut object) = project(&["a.png"]);
        let title_base = y_of(&ctx, object.title.entity);
        let group_base = y_of(&ctx, object.carousel.group);

        object.on_wheel(&mut ctx, 500.0);
        assert!((y_of(&ctx, object.title.entity) - (title_base + 1.5)).abs() < 1e-5);
        object.on_wheel(&mut ctx, 1e6);
        assert_eq!(object.scroll.offset, 5.0);
        assert!((y_of(&ctx, object.carousel.group) - (group_base + 5.0)).abs() < 1e-5);

        object.reset_scroll(&mut ctx);
        assert_eq!(object.scroll.offset, 0.0);
        run(&mut ctx, &mut object, 0.5);
        assert_eq!(y_of(&ctx, object.title.entity), title_base);
        assert_eq!(y_of(&ctx, object.carousel.group), group_base);
    }

    #[test]
    fn carousel_latch_blocks_overlapping_pages() {
        let (mut ctx, mut object) = project(&["a.png", "b.png", "c.png"]);
        let start_x = ctx.world.get::<&Transform>(object.carousel.group).unwrap().position.x;

        assert!(object.carousel.next(&mut ctx, 0));
        assert!(!object.carousel.next(&mut ctx, 0));
        run(&mut ctx, &mut object, 1.0);
        assert_eq!(object.carousel.index, 1);
        assert!(!object.carousel.is_animating());

        assert!(object.carousel.prev(&mut ctx, 0));
        run(&mut ctx, &mut object, 1.0);
        assert_eq!(object.carousel.index, 0);
        let x = ctx.world.get::<&Transform>(object.carousel.group).unwrap().position.x;
        assert_eq!(x, start_x);
    }

    #[test]
    fn carousel_wraps_backwards() {
        let (mut ctx, mut object) = project(&["a.png", "b.png", "c.png"]);
        object.carousel.prev(&mut ctx, 0);
        run(&mut ctx, &mut object, 1.0);
        assert_eq!(object.carousel.index, 2);
        let x = ctx.world.get::<&Transform>(object.carousel.group).unwrap().position.x;
        assert!((x - object.carousel.offset_for(2)).abs() < 1e-5);
    }

    #[test]
    fn missing_images_become_placeholder_slides() {
        let (ctx, object) = project(&["missing/one.png", "missing/two.png"]);
        assert_eq!(object.carousel.slides.len(), 2);
        assert_eq!(object.carousel.aspect, 1.0);
        assert_eq!(object.scene.objects.len(), 5);
        assert!(object.scene.interactables(&ctx.world).is_empty());
        assert!(ctx.interacter.handlers(object.window).is_some());
    }
}
