//! Scenes and the portfolio built from them.
//!
//! A [`Scene`] is an ordered group of spawned objects that can be switched
//! in and out of the render graph as a unit. The content scenes compose
//! scenes, portals and actions into the navigable portfolio:
//!
//! - [`Splash`]: the opening cube, a window into the projects.
//! - [`Projects`]: one window per project, seen through the cube.
//! - [`ProjectObject`]: a project's window and the content behind it.
//! - [`Portfolio`]: owns the [`Context`](crate::Context) and runs [`Action`]s.

mod object;
mod portfolio;
mod project_object;
mod projects;
mod scene;
mod splash;

pub use object::SceneObject;
pub use portfolio::{Action, BuildError, Portfolio, Status};
pub use project_object::{Carousel, ProjectObject, ScrollState};
pub use projects::Projects;
pub use scene::Scene;
pub use splash::Splash;
