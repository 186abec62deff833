//! # Portalfolio
//!
//! **A 3D portfolio you walk into.**
//!
//! Clicking an object flies the camera into it. Each such object is a
//! *portal*: its silhouette writes a stencil mask, and the world behind it is
//! drawn only where that mask is set. Once the camera arrives the mask test
//! is switched off and the world behind the portal becomes the whole view.
//! Escape backs out one level at a time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use portalfolio::{AppConfig, run};
//!
//! fn main() -> Result<(), portalfolio::AppError> {
//!     run(AppConfig::new().title("My work").content("content.json"))
//! }
//! ```
//!
//! ## Headless
//!
//! Everything except [`GpuContext`] and [`PortalPass`] is GPU-free, so a
//! [`Portfolio`] can be built and driven from tests:
//!
//! ```
//! use portalfolio::{CanvasRect, Content, Portfolio, PortalState, Tuning, Vec2};
//!
//! let mut portfolio =
//!     Portfolio::build(&Content::default(), Tuning::default(), CanvasRect::full(800, 600), None)
//!         .unwrap();
//! portfolio.pointer_down(Vec2::new(400.0, 300.0));
//! for _ in 0..150 {
//!     portfolio.tick(1.0 / 60.0);
//! }
//! assert_eq!(portfolio.status().splash, PortalState::Entered);
//! ```

mod animations;
mod app;
mod camera;
mod color;
mod content;
mod context;
mod ecs;
mod gpu;
mod input;
mod interacter;
mod material;
mod mesh;
mod picking;
mod portal;
mod portal_pass;
pub mod scene;
mod stencil;
mod text;
mod texture;
mod tween;

pub use animations::{Tuning, dehover_scale, enter_scene, exit_scene, hover_scale, resume, rotate, settle};
pub use app::{AppConfig, AppError, run};
pub use camera::Camera;
pub use color::Color;
pub use content::{Content, ContentError, ProjectContent, SplashContent};
pub use context::{Completion, Context, DrawItem, TextObject};
pub use ecs::{DrawOrder, InGraph, MaterialId, MeshId, Parent, Renderable, Spin, SpinState, TextureId, world_matrix};
pub use gpu::{GpuContext, GpuError};
pub use input::{CanvasRect, Input, InputEvent};
pub use interacter::{Handlers, Interacter, Interaction};
pub use material::{DepthMode, Material, Materials, ScreenPattern, Shading, Side};
pub use mesh::{Geometries, Geometry, Mesh, Transform, Vertex3d};
pub use picking::{Collider, Ray, RayHit, raycast, raycast_all};
pub use portal::{Portal, PortalId, PortalState, Portals, StencilMode};
pub use portal_pass::{DEPTH_STENCIL_FORMAT, PipelineKey, PortalPass};
pub use scene::{Action, BuildError, Portfolio, Scene, SceneObject, Status};
pub use stencil::{
    COMPOSITION_BIT, DEFAULT_LAYER_BITS, STENCIL_BITS, StencilAllocator, StencilCompare, StencilError,
    StencilFace, StencilLayer, StencilOp,
};
pub use text::{AnchorX, AnchorY, EstimatedMetrics, Measure, TextError, TextLayout, TextStyle, layout, load_font, rasterize};
pub use texture::{Texture, TextureData, Textures};
pub use tween::{Animatable, Channel, Easing, Target, TweenKey, TweenValue, Tweener};

// Re-export glam math types for convenience
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

// Re-export commonly used winit types for convenience
pub use winit::keyboard::KeyCode;
pub use winit::window::CursorIcon;

pub use hecs::{Entity, World};
