//! The assembled portfolio: splash, projects and the actions wiring them.
//!
//! Every pointer handler, escape entry and tween completion in the portfolio
//! is an [`Action`]. [`Portfolio::dispatch`] is the only place actions turn
//! into behaviour, so the whole navigation graph reads top to bottom:
//!
//! ```text
//! splash cube --click--> EnterProjects --tween--> ProjectsEntered
//!   window i  --click--> EnterProject(i) --tween--> ProjectEntered(i)
//!   Escape    --------> ExitProject(i)  --tween--> ProjectExited(i)
//!   Escape    --------> ExitProjects    --tween--> ProjectsExited
//! ```

use std::fmt;

use fontdue::Font;
use glam::{Vec2, Vec3};
use hecs::Entity;
use thiserror::Error;
use winit::keyboard::KeyCode;

use super::projects::Projects;
use super::splash::Splash;
use crate::animations::{self, Tuning};
use crate::content::{Content, ContentError};
use crate::context::Context;
use crate::input::{CanvasRect, InputEvent};
use crate::portal::PortalState;
use crate::stencil::StencilError;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Stencil(#[from] StencilError),
    #[error(transparent)]
    Content(#[from] ContentError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    EnterProjects,
    ProjectsEntered,
    ExitProjects,
    ProjectsExited,
    EnterProject(usize),
    ProjectEntered(usize),
    ExitProject(usize),
    ProjectExited(usize),
    /// Grow the hovered object.
    HoverGrow,
    /// Shrink the object the pointer left.
    HoverShrink,
    /// A carousel page turn finished in the given project.
    CarouselSettled(usize),
}

/// Snapshot for the debug title bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Status {
    pub camera: Vec3,
    pub splash: PortalState,
    /// The project whose portal is not idle, if any.
    pub project: Option<(usize, PortalState)>,
    pub interactables: usize,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.camera;
        write!(f, "cam ({:.2}, {:.2}, {:.2}) | splash {:?}", c.x, c.y, c.z, self.splash)?;
        if let Some((index, state)) = self.project {
            write!(f, " | project {index} {state:?}")?;
        }
        write!(f, " | {} interactable", self.interactables)
    }
}

pub struct Portfolio {
    pub ctx: Context<Action>,
    pub splash: Splash,
    pub projects: Projects,
    /// Project the camera currently sits inside.
    active: Option<usize>,
}

impl Portfolio {
    /// Build every scene from `content`.
    ///
    /// A `tuning` object in the content overrides the one passed in.
    pub fn build(
        content: &Content,
        tuning: Tuning,
        viewport: CanvasRect,
        font: Option<Font>,
    ) -> Result<Self, BuildError> {
        content.validate()?;
        let tuning = content.tuning.clone().unwrap_or(tuning);
        let mut ctx = Context::new(viewport, tuning)?.with_font(font);
        ctx.camera.position = Splash::HOME;

        let splash = Splash::build(&mut ctx, &content.splash)?;
        let projects = Projects::build(&mut ctx, &content.projects, splash.portal)?;

        splash.scene.enable(&mut ctx.world);
        projects.enable(&mut ctx);
        let start = splash.scene.interactables(&ctx.world);
        ctx.interacter.set_interactables(start);

        tracing::info!(
            projects = projects.items.len(),
            portals = ctx.portals.len(),
            stencil_capacity = ctx.stencil_capacity(),
            font = ctx.has_font(),
            "portfolio built"
        );
        Ok(Self {
            ctx,
            splash,
            projects,
            active: None,
        })
    }

    pub fn active_project(&self) -> Option<usize> {
        self.active
    }

    pub fn resize(&mut self, viewport: CanvasRect) {
        self.ctx.resize(viewport);
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMove { client } => self.pointer_move(client),
            InputEvent::PointerDown { client } => self.pointer_down(client),
            InputEvent::Wheel { delta_y } => self.wheel(delta_y),
            InputEvent::Key(key) => self.key(key),
        }
    }

    pub fn pointer_move(&mut self, client: Vec2) {
        for interaction in self.ctx.pointer_move(client) {
            let (action, entity) = interaction.into_parts();
            self.dispatch(action, Some(entity));
        }
    }

    pub fn pointer_down(&mut self, client: Vec2) {
        if let Some(interaction) = self.ctx.pointer_down(client) {
            let (action, entity) = interaction.into_parts();
            self.dispatch(action, Some(entity));
        }
    }

    /// Scroll the entered project's content.
    pub fn wheel(&mut self, delta_y: f32) {
        if let Some(item) = self.active.and_then(|i| self.projects.items.get_mut(i)) {
            item.on_wheel(&mut self.ctx, delta_y);
        }
    }

    pub fn key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Escape => {
                if let Some(action) = self.ctx.cancel() {
                    self.dispatch(action, None);
                }
            }
            KeyCode::ArrowRight | KeyCode::ArrowLeft => {
                let Some(index) = self.active else { return };
                if let Some(item) = self.projects.items.get_mut(index) {
                    if key == KeyCode::ArrowRight {
                        item.carousel.next(&mut self.ctx, index);
                    } else {
                        item.carousel.prev(&mut self.ctx, index);
                    }
                }
            }
            _ => {}
        }
    }

    /// Advance animations by `dt` seconds and run whatever finished.
    pub fn tick(&mut self, dt: f32) {
        for action in self.ctx.tick(dt) {
            self.dispatch(action, None);
        }
    }

    /// Run one action. `source` is the entity whose handler fired, if any.
    pub fn dispatch(&mut self, action: Action, source: Option<Entity>) {
        tracing::debug!(?action, "dispatch");
        let ctx = &mut self.ctx;
        match action {
            Action::EnterProjects => {
                animations::enter_scene(
                    ctx,
                    self.splash.portal,
                    Splash::INSIDE,
                    Some(&self.projects.scene),
                    Some(Action::ProjectsEntered),
                );
            }
            Action::ProjectsEntered => {
                ctx.interacter.push_escape(Action::ExitProjects);
                animations::settle(&mut ctx.world, self.splash.window);
                self.splash.scene.disable(&mut ctx.world);
            }
            Action::ExitProjects => {
                let exiting = animations::exit_scene(
                    ctx,
                    self.splash.portal,
                    Splash::HOME,
                    Some(&self.splash.scene),
                    Some(Action::ProjectsExited),
                );
                if exiting {
                    self.splash.scene.enable(&mut ctx.world);
                    animations::resume(&mut ctx.world, self.splash.window);
                } else {
                    ctx.interacter.push_escape(Action::ExitProjects);
                }
            }
            Action::EnterProject(index) => {
                if let Some(item) = self.projects.items.get(index) {
                    item.enter(ctx);
                }
            }
            Action::ProjectEntered(index) => {
                ctx.interacter.push_escape(Action::ExitProject(index));
                self.active = Some(index);
            }
            Action::ExitProject(index) => {
                let Projects { scene, items, .. } = &mut self.projects;
                let Some(item) = items.get_mut(index) else { return };
                if item.exit(ctx, Projects::HOME, scene) {
                    self.active = None;
                } else {
                    ctx.interacter.push_escape(Action::ExitProject(index));
                }
            }
            Action::ProjectsExited | Action::ProjectExited(_) => {}
            Action::HoverGrow => {
                if let Some(entity) = source {
                    let scale = ctx.tuning.hover_scale;
                    animations::hover_scale(ctx, entity, scale);
                }
            }
            Action::HoverShrink => {
                if let Some(entity) = source {
                    animations::dehover_scale(ctx, entity);
                }
            }
            Action::CarouselSettled(index) => {
                if let Some(item) = self.projects.items.get_mut(index) {
                    item.carousel.settle();
                }
            }
        }
    }

    pub fn status(&self) -> Status {
        let portals = &self.ctx.portals;
        let project = self
            .projects
            .items
            .iter()
            .map(|item| (item.index, portals.state(item.portal)))
            .find(|(_, state)| *state != PortalState::Idle);
        Status {
            camera: self.ctx.camera.position,
            splash: portals.state(self.splash.portal),
            project,
            interactables: self.ctx.interacter.interactables().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Transform;

    const DT: f32 = 1.0 / 60.0;
    const CENTER: Vec2 = Vec2::new(400.0, 300.0);

    fn portfolio() -> Portfolio {
        Portfolio::build(&Content::default(), Tuning::default(), CanvasRect::full(800, 600), None).unwrap()
    }

    fn settle(p: &mut Portfolio, seconds: f32) {
        for _ in 0..(seconds / DT).ceil() as usize {
            p.tick(DT);
        }
    }

    fn enter_projects(p: &mut Portfolio) {
        p.pointer_down(CENTER);
        settle(p, 2.1);
        assert_eq!(p.status().splash, PortalState::Entered);
    }

    #[test]
    fn starts_on_the_splash() {
        let p = portfolio();
        assert_eq!(p.ctx.camera.position, Splash::HOME);
        assert_eq!(p.ctx.interacter.interactables(), &[p.splash.window]);
        assert_eq!(p.projects.items.len(), 3);
        assert!(p.splash.scene.is_enabled(&p.ctx.world));
        assert!(!p.ctx.draw_list().is_empty());
    }

    #[test]
    fn content_tuning_overrides_argument() {
        let mut content = Content::default();
        content.tuning = Some(Tuning {
            transition_duration: 0.5,
            ..Tuning::default()
        });
        let p = Portfolio::build(&content, Tuning::default(), CanvasRect::full(800, 600), None).unwrap();
        assert_eq!(p.ctx.tuning.transition_duration, 0.5);
    }

    #[test]
    fn invalid_content_is_rejected() {
        let mut content = Content::default();
        content.projects.clear();
        let err = Portfolio::build(&content, Tuning::default(), CanvasRect::full(800, 600), None);
        assert!(matches!(err, Err(BuildError::Content(_))));
    }

    #[test]
    fn scenes_name_their_shared_resources() {
        let p = portfolio();
        assert!(p.splash.scene.geometries.contains_key("box"));
        assert!(p.splash.scene.materials.contains_key("stencil"));
        assert!(p.projects.scene.geometries.contains_key("window"));
        assert!(p.projects.scene.materials.contains_key("background"));
    }

    #[test]
    fn more_portals_than_stencil_layers_fail_to_build() {
        // Two layer bits hold three portals; splash plus three projects needs four.
        let tuning = Tuning {
            stencil_layer_bits: 2,
            ..Tuning::default()
        };
        let content = Content::default();
        assert_eq!(content.projects.len(), 3);
        let err = Portfolio::build(&content, tuning, CanvasRect::full(800, 600), None);
        assert!(matches!(
            err,
            Err(BuildError::Stencil(StencilError::Exhausted { capacity: 3, layer_bits: 2 }))
        ));
    }

    #[test]
    fn clicking_the_cube_enters_projects() {
        let mut p = portfolio();
        p.pointer_down(CENTER);
        assert_eq!(p.status().splash, PortalState::Entering);
        settle(&mut p, 2.1);

        let windows: Vec<Entity> = p.projects.items.iter().map(|i| i.window).collect();
        assert_eq!(p.ctx.camera.position, Splash::INSIDE);
        assert_eq!(p.status().splash, PortalState::Entered);
        assert_eq!(p.ctx.interacter.interactables(), windows.as_slice());
        assert_eq!(p.ctx.interacter.escape_depth(), 1);
        assert!(!p.splash.scene.is_enabled(&p.ctx.world));
    }

    #[test]
    fn clicks_during_a_transition_are_ignored() {
        let mut p = portfolio();
        p.pointer_down(CENTER);
        settle(&mut p, 0.5);
        let camera = p.ctx.camera.position;
        p.pointer_down(CENTER);
        p.dispatch(Action::EnterProject(1), None);
        assert_eq!(p.ctx.camera.position, camera);
        settle(&mut p, 2.0);
        assert_eq!(p.status().project, None);
        assert_eq!(p.ctx.interacter.escape_depth(), 1);
    }

    #[test]
    fn escape_unwinds_project_then_projects() {
        let mut p = portfolio();
        enter_projects(&mut p);

        // The middle window sits straight ahead of the camera.
        p.pointer_down(CENTER);
        settle(&mut p, 2.1);
        assert_eq!(p.active_project(), Some(1));
        assert_eq!(p.status().project, Some((1, PortalState::Entered)));
        assert!(p.ctx.interacter.interactables().is_empty());
        assert_eq!(p.ctx.interacter.escape_depth(), 2);

        p.key(KeyCode::Escape);
        assert_eq!(p.active_project(), None);
        settle(&mut p, 2.1);
        assert_eq!(p.ctx.camera.position, Projects::HOME);
        assert_eq!(p.status().project, None);
        assert_eq!(p.ctx.interacter.interactables().len(), 3);

        p.key(KeyCode::Escape);
        assert!(p.splash.scene.is_enabled(&p.ctx.world));
        settle(&mut p, 2.1);
        assert_eq!(p.ctx.camera.position, Splash::HOME);
        assert_eq!(p.status().splash, PortalState::Idle);
        assert_eq!(p.ctx.interacter.interactables(), &[p.splash.window]);
        assert_eq!(p.ctx.interacter.escape_depth(), 0);

        p.key(KeyCode::Escape);
        assert_eq!(p.status().splash, PortalState::Idle);
    }

    #[test]
    fn escape_during_entry_is_kept_for_later() {
        let mut p = portfolio();
        enter_projects(&mut p);
        p.dispatch(Action::EnterProject(0), None);
        settle(&mut p, 0.5);

        p.key(KeyCode::Escape);
        assert_eq!(p.status().splash, PortalState::Entered);
        assert_eq!(p.ctx.interacter.escape_depth(), 1);

        settle(&mut p, 2.0);
        assert_eq!(p.ctx.interacter.escape_depth(), 2);
    }

    #[test]
    fn wheel_and_arrows_only_reach_the_entered_project() {
        let mut p = portfolio();
        let title = p.projects.items[2].title.entity;
        let base = p.ctx.world.get::<&Transform>(title).unwrap().position.y;

        p.wheel(400.0);
        p.key(KeyCode::ArrowRight);
        assert_eq!(p.ctx.world.get::<&Transform>(title).unwrap().position.y, base);
        assert!(!p.projects.items[2].carousel.is_animating());

        enter_projects(&mut p);
        p.dispatch(Action::EnterProject(2), None);
        settle(&mut p, 2.1);

        p.wheel(1e6);
        let y = p.ctx.world.get::<&Transform>(title).unwrap().position.y;
        assert!((y - (base + 5.0)).abs() < 1e-4);

        p.key(KeyCode::ArrowRight);
        p.key(KeyCode::ArrowRight);
        settle(&mut p, 1.0);
        assert_eq!(p.projects.items[2].carousel.index, 1);

        p.key(KeyCode::Escape);
        settle(&mut p, 2.1);
        assert_eq!(p.projects.items[2].scroll.offset, 0.0);
        assert_eq!(p.ctx.world.get::<&Transform>(title).unwrap().position.y, base);
    }

    #[test]
    fn hover_grows_and_leave_restores_scale() {
        let mut p = portfolio();
        p.pointer_move(CENTER);
        settle(&mut p, 0.5);
        let scale = p.ctx.world.get::<&Transform>(p.splash.window).unwrap().scale;
        assert!((scale.x - 1.15).abs() < 1e-4);

        p.pointer_move(Vec2::new(5.0, 5.0));
        settle(&mut p, 0.5);
        let scale = p.ctx.world.get::<&Transform>(p.splash.window).unwrap().scale;
        assert_eq!(scale, Vec3::ONE);
    }

    #[test]
    fn status_reads_like_a_title() {
        let p = portfolio();
        let text = p.status().to_string();
        assert!(text.starts_with("cam (0.00, 0.00, 5.00) | splash Idle"));
        assert!(text.ends_with("1 interactable"));
    }
}
