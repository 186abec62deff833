//! Scene transitions and small object animations.
//!
//! Entering a portal is a four-state machine per portal:
//!
//! ```text
//!   Idle --enter_scene--> Entering --camera settles--> Entered
//!    ^                                                   |
//!    +------camera settles------ Exiting <--exit_scene---+
//! ```
//!
//! While any portal is `Entering` or `Exiting`, new transition requests are
//! refused. Entering swaps the interactable set only once the camera has
//! settled; exiting re-arms the destination set immediately.

use glam::Vec3;
use hecs::{Entity, World};
use serde::Deserialize;
use winit::window::CursorIcon;

use crate::context::{Completion, Context};
use crate::ecs::{InGraph, Spin, SpinState};
use crate::mesh::Transform;
use crate::portal::{PortalId, PortalState};
use crate::scene::Scene;
use crate::stencil::DEFAULT_LAYER_BITS;
use crate::tween::{Channel, Easing, TweenKey, TweenValue};

/// Frames per second the per-frame constants are tuned against.
const REFERENCE_FPS: f32 = 60.0;

/// Timing and motion constants, overridable from the content file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Camera move into or out of a portal, seconds.
    pub transition_duration: f32,
    pub hover_scale: f32,
    pub hover_duration: f32,
    /// Overshoot of the hover ease.
    pub hover_overshoot: f32,
    /// Largest pitch/yaw the pointer can induce, radians.
    pub look_max: f32,
    pub look_duration: f32,
    /// Idle rotation, radians per frame at 60 fps.
    pub spin_speed: f32,
    /// Content offset per wheel pixel.
    pub scroll_speed: f32,
    pub scroll_max: f32,
    pub scroll_reset_duration: f32,
    pub carousel_spacing: f32,
    pub carousel_duration: f32,
    pub stencil_layer_bits: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            transition_duration: 2.0,
            hover_scale: 1.15,
            hover_duration: 0.3,
            hover_overshoot: 2.0,
            look_max: 0.25,
            look_duration: 2.0,
            spin_speed: 0.005,
            scroll_speed: 0.003,
            scroll_max: 5.0,
            scroll_reset_duration: 0.3,
            carousel_spacing: 2.2,
            carousel_duration: 0.6,
            stencil_layer_bits: DEFAULT_LAYER_BITS,
        }
    }
}

fn camera_position() -> TweenKey {
    TweenKey::camera(Channel::Position)
}

/// Fly the camera into `portal`.
///
/// On arrival the interactable set becomes `scene`'s (if given), the portal
/// opens, and `on_complete` is handed back from [`Context::tick`]. Returns
/// false, changing nothing, when the request is refused.
pub fn enter_scene<A: Clone>(
    ctx: &mut Context<A>,
    portal: PortalId,
    target: Vec3,
    scene: Option<&Scene>,
    on_complete: Option<A>,
) -> bool {
    if ctx.portals.get(portal).is_none() {
        tracing::warn!(portal = ?portal, "enter requested for unknown portal");
        return false;
    }
    if ctx.portals.any_transitioning() {
        tracing::debug!(portal = ?portal, "transition in flight, enter ignored");
        return false;
    }
    let state = ctx.portals.state(portal);
    if state != PortalState::Idle {
        tracing::debug!(portal = ?portal, ?state, "portal not idle, enter ignored");
        return false;
    }

    let snapshot = ctx.interacter.interactables().to_vec();
    ctx.portals.save_interactables(portal, snapshot);
    let next = scene.map(|s| s.interactables(&ctx.world));
    ctx.portals.set_state(portal, PortalState::Entering);

    let duration = ctx.tuning.transition_duration;
    ctx.tween(
        camera_position(),
        TweenValue::Vector(target),
        duration,
        Easing::Power4InOut,
        Some(Completion {
            interactables: next,
            portal: Some((portal, PortalState::Entered)),
            then: on_complete,
        }),
    );
    tracing::info!(portal = ?portal, ?target, scene = ?scene.map(|s| &s.name), "entering");
    true
}

/// Fly the camera back out of `portal`.
///
/// The destination interactable set is installed immediately: `return_scene`'s
/// if given, otherwise the set that was active when the portal was entered.
/// The portal closes once the camera settles.
pub fn exit_scene<A: Clone>(
    ctx: &mut Context<A>,
    portal: PortalId,
    target: Vec3,
    return_scene: Option<&Scene>,
    on_complete: Option<A>,
) -> bool {
    if ctx.portals.any_transitioning() {
        tracing::debug!(portal = ?portal, "transition in flight, exit ignored");
        return false;
    }
    let state = ctx.portals.state(portal);
    if state != PortalState::Entered {
        tracing::debug!(portal = ?portal, ?state, "portal not entered, exit ignored");
        return false;
    }

    let saved = ctx.portals.take_interactables(portal);
    let restored = match (return_scene.map(|s| s.interactables(&ctx.world)), saved) {
        (Some(set), Some(saved)) => {
            if set != saved {
                tracing::warn!(portal = ?portal, "return scene differs from pre-entry interactables");
            }
            set
        }
        (Some(set), None) => set,
        (None, Some(saved)) => saved,
        (None, None) => ctx.interacter.interactables().to_vec(),
    };
    ctx.interacter.set_interactables(restored);
    ctx.portals.set_state(portal, PortalState::Exiting);

    let duration = ctx.tuning.transition_duration;
    ctx.tween(
        camera_position(),
        TweenValue::Vector(target),
        duration,
        Easing::Power4InOut,
        Some(Completion {
            interactables: None,
            portal: Some((portal, PortalState::Idle)),
            then: on_complete,
        }),
    );
    tracing::info!(portal = ?portal, ?target, "exiting");
    true
}

/// Grow `entity` with a springy overshoot and show the pointer cursor.
pub fn hover_scale<A: Clone>(ctx: &mut Context<A>, entity: Entity, scale: f32) {
    let (duration, overshoot) = (ctx.tuning.hover_duration, ctx.tuning.hover_overshoot);
    ctx.tween(
        TweenKey::entity(entity, Channel::Scale),
        TweenValue::Vector(Vec3::splat(scale)),
        duration,
        Easing::BackOut(overshoot),
        None,
    );
    ctx.set_cursor(CursorIcon::Pointer);
}

/// Ease `entity` back to unit scale and restore the cursor.
pub fn dehover_scale<A: Clone>(ctx: &mut Context<A>, entity: Entity) {
    let duration = ctx.tuning.hover_duration;
    ctx.tween(
        TweenKey::entity(entity, Channel::Scale),
        TweenValue::Vector(Vec3::ONE),
        duration,
        Easing::Power2Out,
        None,
    );
    ctx.set_cursor(CursorIcon::Default);
}

/// Advance an idle spin by `frames` reference frames.
pub fn rotate(spin: &mut Spin, transform: &mut Transform, frames: f32) {
    if spin.state == SpinState::Settled {
        return;
    }
    spin.angles += glam::Vec2::splat(spin.speed * frames);
    transform.rotation = spin.rotation();
}

/// Spin every spinning object in the render graph.
pub(crate) fn spin_all(world: &mut World, dt: f32) {
    let frames = dt * REFERENCE_FPS;
    for (_, (spin, transform)) in world
        .query_mut::<(&mut Spin, &mut Transform)>()
        .with::<&InGraph>()
    {
        rotate(spin, transform, frames);
    }
}

/// Stop `entity`'s idle spin where it is.
pub fn settle(world: &mut World, entity: Entity) {
    if let Ok(mut spin) = world.get::<&mut Spin>(entity) {
        spin.state = SpinState::Settled;
    }
}

/// Resume `entity`'s idle spin.
pub fn resume(world: &mut World, entity: Entity) {
    if let Ok(mut spin) = world.get::<&mut Spin>(entity) {
        spin.state = SpinState::Spinning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::input::CanvasRect;
    use crate::material::Material;
    use crate::mesh::Geometry;
    use crate::portal::StencilMode;
    use crate::scene::SceneObject;
    use crate::stencil::StencilCompare;

    #[derive(Clone, Debug, PartialEq)]
    enum Act {
        Open,
        Entered,
        Exited,
    }

    struct Fixture {
        ctx: Context<Act>,
        portal: PortalId,
        window: Entity,
        inner: Scene,
        item: Entity,
    }

    fn fixture() -> Fixture {
        let mut ctx = Context::new(CanvasRect::full(800, 600), Tuning::default()).unwrap();
        let portal = ctx.create_portal(None).unwrap();
        let cube = ctx.add_geometry(Geometry::cube());
        let writer = ctx.add_material(Material::portal_writer(portal));
        let plain = ctx.add_material(Material::basic(Color::WHITE));

        let window = ctx.spawn(
            SceneObject::new(cube, writer)
                .on_click(Act::Open)
                .spin(0.005),
        );
        let mut inner = Scene::new("inner");
        let item = inner.add(ctx.spawn(
            SceneObject::new(cube, plain)
                .at(Vec3::new(0.0, 0.0, -3.0))
                .on_click(Act::Open),
        ));
        ctx.interacter.set_interactables(vec![window]);
        Fixture {
            ctx,
            portal,
            window,
            inner,
            item,
        }
    }

    fn settle_tweens(ctx: &mut Context<Act>) -> Vec<Act> {
        let mut actions = Vec::new();
        for _ in 0..30 {
            actions.extend(ctx.tick(0.1));
        }
        actions
    }

    #[test]
    fn enter_then_exit_returns_camera_and_interactables() {
        let mut f = fixture();
        let start = f.ctx.camera.position;

        assert!(enter_scene(&mut f.ctx, f.portal, Vec3::ZERO, Some(&f.inner), Some(Act::Entered)));
        assert_eq!(f.ctx.portals.state(f.portal), PortalState::Entering);
        // Old content stays clickable until the camera settles.
        f.ctx.tick(1.0);
        assert_eq!(f.ctx.interacter.interactables(), &[f.window]);

        assert_eq!(settle_tweens(&mut f.ctx), vec![Act::Entered]);
        assert_eq!(f.ctx.portals.state(f.portal), PortalState::Entered);
        assert_eq!(f.ctx.interacter.interactables(), &[f.item]);
        assert_eq!(f.ctx.camera.position, Vec3::ZERO);

        assert!(exit_scene(&mut f.ctx, f.portal, start, None, Some(Act::Exited)));
        // Exit re-arms the destination at once.
        assert_eq!(f.ctx.interacter.interactables(), &[f.window]);
        assert_eq!(f.ctx.portals.state(f.portal), PortalState::Exiting);

        assert_eq!(settle_tweens(&mut f.ctx), vec![Act::Exited]);
        assert_eq!(f.ctx.camera.position, start);
        assert_eq!(f.ctx.portals.state(f.portal), PortalState::Idle);
    }

    #[test]
    fn reentrant_requests_are_ignored() {
        let mut f = fixture();
        assert!(enter_scene(&mut f.ctx, f.portal, Vec3::ZERO, Some(&f.inner), None));
        f.ctx.tick(0.5);
        assert!(!enter_scene(&mut f.ctx, f.portal, Vec3::X, None, None));
        assert!(!exit_scene(&mut f.ctx, f.portal, Vec3::Z, None, None));

        settle_tweens(&mut f.ctx);
        assert_eq!(f.ctx.camera.position, Vec3::ZERO);
        assert!(!enter_scene(&mut f.ctx, f.portal, Vec3::X, None, None));
    }

    #[test]
    fn exit_from_idle_is_refused() {
        let mut f = fixture();
        assert!(!exit_scene(&mut f.ctx, f.portal, Vec3::Z, None, None));
        assert_eq!(f.ctx.portals.state(f.portal), PortalState::Idle);
        assert_eq!(f.ctx.tweens.active(), 0);
    }

    #[test]
    fn reader_gate_is_equal_until_entered() {
        let mut f = fixture();
        let reader = StencilMode::Reader(f.portal);
        let compare = |ctx: &Context<Act>| ctx.portals.resolve(reader).compare;

        assert_eq!(compare(&f.ctx), StencilCompare::Equal);
        enter_scene(&mut f.ctx, f.portal, Vec3::ZERO, None, None);
        for _ in 0..25 {
            let state = f.ctx.portals.state(f.portal);
            let expected = if state == PortalState::Entered {
                StencilCompare::Always
            } else {
                StencilCompare::Equal
            };
            assert_eq!(compare(&f.ctx), expected, "{state:?}");
            f.ctx.tick(0.1);
        }
        assert_eq!(compare(&f.ctx), StencilCompare::Always);
    }

    #[test]
    fn hover_overwrites_and_sets_cursor() {
        let mut f = fixture();
        hover_scale(&mut f.ctx, f.window, 1.15);
        assert_eq!(f.ctx.cursor(), CursorIcon::Pointer);
        f.ctx.tick(0.1);
        dehover_scale(&mut f.ctx, f.window);
        assert_eq!(f.ctx.cursor(), CursorIcon::Default);
        assert_eq!(f.ctx.tweens.active(), 1);

        settle_tweens(&mut f.ctx);
        let scale = f.ctx.world.get::<&Transform>(f.window).unwrap().scale;
        assert_eq!(scale, Vec3::ONE);
    }

    #[test]
    fn spin_runs_only_in_graph_until_settled() {
        let mut f = fixture();
        f.ctx.tick(1.0);
        let rotation = |ctx: &Context<Act>| ctx.world.get::<&Transform>(f.window).unwrap().rotation;
        assert_eq!(rotation(&f.ctx), glam::Quat::IDENTITY);

        f.ctx.world.insert_one(f.window, InGraph).unwrap();
        f.ctx.tick(1.0);
        let spun = rotation(&f.ctx);
        assert_ne!(spun, glam::Quat::IDENTITY);
        let angles = f.ctx.world.get::<&Spin>(f.window).unwrap().angles;
        assert!((angles.x - 0.3).abs() < 1e-5);

        settle(&mut f.ctx.world, f.window);
        f.ctx.tick(1.0);
        assert_eq!(rotation(&f.ctx), spun);

        resume(&mut f.ctx.world, f.window);
        f.ctx.tick(1.0);
        assert_ne!(rotation(&f.ctx), spun);
    }

    #[test]
    fn tuning_fields_default_individually() {
        let tuning: Tuning = serde_json::from_str(r#"{ "transition_duration": 0.5 }"#).unwrap();
        assert_eq!(tuning.transition_duration, 0.5);
        assert_eq!(tuning.hover_scale, 1.15);
        assert_eq!(tuning.stencil_layer_bits, DEFAULT_LAYER_BITS);
    }
}
