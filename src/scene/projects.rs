//! The world inside the splash cube: a row of project windows.

use glam::Vec3;
use hecs::Entity;

use super::object::SceneObject;
use super::portfolio::Action;
use super::project_object::ProjectObject;
use super::scene::Scene;
use crate::content::ProjectContent;
use crate::context::{Context, TextObject};
use crate::material::{Material, ScreenPattern, Shading};
use crate::mesh::Geometry;
use crate::portal::PortalId;
use crate::stencil::StencilError;
use crate::text::TextStyle;

const WINDOW_SPACING: f32 = 1.6;
const WINDOW_DEPTH: f32 = -3.0;
const BACKGROUND_DEPTH: f32 = -10.0;
const BACKGROUND_SIZE: f32 = 50.0;

pub struct Projects {
    /// Background, heading and windows. Windows are the interactables.
    pub scene: Scene,
    pub background: Entity,
    pub heading: TextObject,
    pub items: Vec<ProjectObject>,
}

impl Projects {
    /// Camera position while browsing the windows.
    pub const HOME: Vec3 = Vec3::ZERO;

    /// Build the view seen through `splash`, one window per project.
    pub fn build(
        ctx: &mut Context<Action>,
        content: &[ProjectContent],
        splash: PortalId,
    ) -> Result<Self, StencilError> {
        let mut scene = Scene::new("projects");

        let backdrop = ctx.add_geometry(Geometry::plane(BACKGROUND_SIZE, BACKGROUND_SIZE));
        let window = ctx.add_geometry(Geometry::plane(1.0, 1.0));
        scene.geometries.insert("backdrop".into(), backdrop);
        scene.geometries.insert("window".into(), window);

        let ripple = ctx.add_material(
            Material::portal_reader(splash).shading(Shading::Screen(ScreenPattern::Ripple)),
        );
        scene.materials.insert("background".into(), ripple);
        let background = scene.add(ctx.spawn(
            SceneObject::new(backdrop, ripple).at(Vec3::new(0.0, 0.0, BACKGROUND_DEPTH)),
        ));

        let style = TextStyle::new(0.4).at(Vec3::new(0.0, 1.6, -4.0));
        let heading = ctx.create_text("Projects", &style, Some(Material::portal_reader(splash)));
        scene.add(heading.entity);

        let mut items = Vec::with_capacity(content.len());
        for (i, project) in content.iter().enumerate() {
            let position = Vec3::new(window_x(i, content.len()), 0.0, WINDOW_DEPTH);
            let item = ProjectObject::build(ctx, i, project, position, splash, window, backdrop)?;
            scene.add(item.window);
            items.push(item);
        }
        tracing::debug!(projects = items.len(), "projects view built");

        Ok(Self {
            scene,
            background,
            heading,
            items,
        })
    }

    pub fn enable(&self, ctx: &mut Context<Action>) {
        self.scene.enable(&mut ctx.world);
        for item in &self.items {
            item.scene.enable(&mut ctx.world);
        }
    }
}

/// Windows are centred on x = 0.
fn window_x(index: usize, count: usize) -> f32 {
    (index as f32 - (count.saturating_sub(1)) as f32 / 2.0) * WINDOW_SPACING
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_centred() {
        assert_eq!(window_x(0, 1), 0.0);
        assert_eq!(window_x(0, 3), -WINDOW_SPACING);
        assert_eq!(window_x(1, 3), 0.0);
        assert_eq!(window_x(2, 3), WINDOW_SPACING);
        assert_eq!(window_x(0, 2), -WINDOW_SPACING / 2.0);
    }
}
