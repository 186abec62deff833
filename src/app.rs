//! Window, event loop and frame pacing.
//!
//! [`run`] opens a window, builds the [`Portfolio`] once the platform hands
//! out a surface, then feeds it input and ticks it once per redraw.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{CursorIcon, Window, WindowAttributes, WindowId};

use crate::animations::Tuning;
use crate::content::{Content, ContentError};
use crate::gpu::{GpuContext, GpuError};
use crate::input::{CanvasRect, Input};
use crate::portal_pass::PortalPass;
use crate::scene::{BuildError, Portfolio};
use crate::text;

/// Long stalls (window drags, breakpoints) advance animations by at most this.
const MAX_FRAME_DT: f32 = 0.1;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Gpu(#[from] GpuError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Content JSON. The builtin portfolio is used when unset.
    pub content: Option<PathBuf>,
    /// Font for titles and write-ups. Text draws as placeholder slabs without one.
    pub font: Option<PathBuf>,
    /// Show camera and transition state in the window title.
    pub debug: bool,
    pub tuning: Tuning,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Portalfolio".to_string(),
            width: 1280,
            height: 720,
            content: None,
            font: None,
            debug: false,
            tuning: Tuning::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn content(mut self, path: impl Into<PathBuf>) -> Self {
        self.content = Some(path.into());
        self
    }

    pub fn font(mut self, path: impl Into<PathBuf>) -> Self {
        self.font = Some(path.into());
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Content from the configured file, or the builtin portfolio.
    ///
    /// A file that cannot be read falls back to the builtin portfolio.
    /// Malformed or invalid content is an error.
    pub fn load_content(&self) -> Result<Content, ContentError> {
        match &self.content {
            Some(path) => match Content::load(path) {
                Err(err @ ContentError::Io { .. }) => {
                    tracing::warn!(error = %err, "using builtin portfolio");
                    Ok(Content::default())
                }
                loaded => loaded,
            },
            None => {
                tracing::info!("no content file given, using builtin portfolio");
                Ok(Content::default())
            }
        }
    }

    /// The configured font, if it loads. Failures fall back to placeholder text.
    pub fn load_font(&self) -> Option<fontdue::Font> {
        let path = self.font.as_ref()?;
        match text::load_font(path) {
            Ok(font) => Some(font),
            Err(err) => {
                tracing::warn!(error = %err, "text will render as placeholders");
                None
            }
        }
    }
}

/// Open the window and run until it is closed.
pub fn run(config: AppConfig) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = PortfolioApp::Pending { config };
    event_loop.run_app(&mut app)?;

    match app {
        PortfolioApp::Failed(Some(err)) => Err(err),
        _ => Ok(()),
    }
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    pass: PortalPass,
    portfolio: Portfolio,
    input: Input,
    title: String,
    debug: bool,
    cursor: CursorIcon,
    last_frame: Instant,
}

enum PortfolioApp {
    Pending { config: AppConfig },
    Running(Box<Running>),
    Failed(Option<AppError>),
}

impl Running {
    fn start(event_loop: &ActiveEventLoop, config: AppConfig) -> Result<Self, AppError> {
        let content = config.load_content()?;
        let font = config.load_font();

        let attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let gpu = GpuContext::new(window.clone())?;

        let viewport = CanvasRect::full(gpu.width(), gpu.height());
        let portfolio = Portfolio::build(&content, config.tuning.clone(), viewport, font)?;
        let pass = PortalPass::new(&gpu);
        window.request_redraw();

        Ok(Self {
            window,
            gpu,
            pass,
            portfolio,
            input: Input::new(),
            title: config.title,
            debug: config.debug,
            cursor: CursorIcon::Default,
            last_frame: Instant::now(),
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now
            .duration_since(self.last_frame)
            .as_secs_f32()
            .min(MAX_FRAME_DT);
        self.last_frame = now;

        self.portfolio.tick(dt);

        match self.gpu.surface.get_current_texture() {
            Ok(frame) => {
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.pass.render(&self.gpu, &self.portfolio.ctx, &view);
                frame.present();
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost, reconfiguring");
                self.gpu.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                tracing::error!("surface out of memory");
                event_loop.exit();
                return;
            }
            Err(err) => tracing::warn!(error = %err, "frame skipped"),
        }

        if self.debug {
            let status = self.portfolio.status();
            self.window.set_title(&format!("{} | {status}", self.title));
        }
        self.window.request_redraw();
    }

    fn sync_cursor(&mut self) {
        let cursor = self.portfolio.ctx.cursor();
        if cursor != self.cursor {
            self.window.set_cursor(cursor);
            self.cursor = cursor;
        }
    }
}

impl ApplicationHandler for PortfolioApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if !matches!(self, PortfolioApp::Pending { .. }) {
            return;
        }
        let PortfolioApp::Pending { config } = std::mem::replace(self, PortfolioApp::Failed(None))
        else {
            return;
        };
        *self = match Running::start(event_loop, config) {
            Ok(running) => PortfolioApp::Running(Box::new(running)),
            Err(err) => {
                tracing::error!(error = %err, "startup failed");
                event_loop.exit();
                PortfolioApp::Failed(Some(err))
            }
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let PortfolioApp::Running(app) = self else {
            return;
        };

        if let Some(input) = app.input.handle_event(&event) {
            app.portfolio.handle(input);
        }

        match event {
            WindowEvent::CloseRequested => {
                tracing::info!("window closed");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.gpu.resize(size.width, size.height);
                app.portfolio
                    .resize(CanvasRect::full(size.width, size.height));
            }
            WindowEvent::RedrawRequested => app.redraw(event_loop),
            _ => {}
        }

        app.sync_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_content_file_falls_back_to_builtin() {
        let content = AppConfig::new()
            .content("no/such/content.json")
            .load_content()
            .unwrap();
        assert_eq!(content, Content::default());
    }

    #[test]
    fn malformed_content_file_is_still_an_error() {
        let path = std::env::temp_dir().join(format!("portalfolio-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let result = AppConfig::new().content(&path).load_content();
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(ContentError::Parse { .. })));
    }

    #[test]
    fn no_content_file_uses_builtin() {
        assert!(AppConfig::new().load_content().is_ok());
    }
}
