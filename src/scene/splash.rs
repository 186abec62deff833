//! Opening view: a spinning cube that is a window into the projects.

use glam::Vec3;
use hecs::Entity;

use super::object::SceneObject;
use super::portfolio::Action;
use super::scene::Scene;
use crate::color::Color;
use crate::content::SplashContent;
use crate::context::{Context, TextObject};
use crate::material::Material;
use crate::mesh::Geometry;
use crate::portal::PortalId;
use crate::stencil::StencilError;
use crate::text::TextStyle;

pub struct Splash {
    pub scene: Scene,
    pub portal: PortalId,
    /// The cube whose silhouette writes the portal mask.
    pub window: Entity,
    pub title: TextObject,
}

impl Splash {
    /// Where the camera starts and returns to.
    pub const HOME: Vec3 = Vec3::new(0.0, 0.0, 5.0);
    /// Camera position once inside the cube.
    pub const INSIDE: Vec3 = Vec3::ZERO;

    pub fn build(ctx: &mut Context<Action>, content: &SplashContent) -> Result<Self, StencilError> {
        let portal = ctx.create_portal(None)?;
        let mut scene = Scene::new("splash");

        let cube = ctx.add_geometry(Geometry::cube());
        scene.geometries.insert("box".into(), cube);
        let writer = ctx.add_material(Material::portal_writer(portal));
        scene.materials.insert("stencil".into(), writer);

        let window = scene.add(
            ctx.spawn(
                SceneObject::new(cube, writer)
                    .on_click(Action::EnterProjects)
                    .on_hover(Action::HoverGrow)
                    .on_dehover(Action::HoverShrink)
                    .spin(ctx.tuning.spin_speed),
            ),
        );

        let style = TextStyle::new(0.6)
            .color(Color::WHITE)
            .at(Vec3::new(0.0, 1.8, 0.0));
        let title = ctx.create_text(&content.title, &style, None);
        scene.add(title.entity);

        Ok(Self {
            scene,
            portal,
            window,
            title,
        })
    }
}
