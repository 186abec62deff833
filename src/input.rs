use glam::Vec2;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Pixels per wheel "line", matching what browsers report for one notch.
const LINE_HEIGHT_PX: f32 = 100.0;

/// Screen rectangle the scene is drawn into, in window pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle covering a whole `width` x `height` surface.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0.0, 0.0, width as f32, height as f32)
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    /// Position relative to the rectangle, 0..1 on each axis (y down).
    pub fn normalized(&self, client: Vec2) -> Vec2 {
        let size = Vec2::new(self.width.max(1.0), self.height.max(1.0));
        (client - Vec2::new(self.x, self.y)) / size
    }

    /// Normalized device coordinates, -1..1 with y up.
    pub fn to_ndc(&self, client: Vec2) -> Vec2 {
        let n = self.normalized(client);
        Vec2::new(n.x * 2.0 - 1.0, -(n.y * 2.0 - 1.0))
    }
}

/// Discrete input the portfolio reacts to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    PointerMove { client: Vec2 },
    PointerDown { client: Vec2 },
    /// Positive scrolls content down, in pixels.
    Wheel { delta_y: f32 },
    Key(KeyCode),
}

/// Turns winit window events into [`InputEvent`]s.
///
/// Tracks the last cursor position because winit reports button presses
/// without one.
#[derive(Debug, Default)]
pub struct Input {
    cursor: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known cursor position in window pixels.
    pub fn cursor(&self) -> Vec2 {
        self.cursor
    }

    /// Process a window event. Returns the input it represents, if any.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                Some(InputEvent::PointerMove {
                    client: self.cursor,
                })
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => Some(InputEvent::PointerDown {
                client: self.cursor,
            }),
            WindowEvent::MouseWheel { delta, .. } => Some(InputEvent::Wheel {
                delta_y: wheel_pixels(*delta),
            }),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(key) => Some(InputEvent::Key(key)),
                    PhysicalKey::Unidentified(_) => None,
                }
            }
            _ => None,
        }
    }
}

/// winit reports wheel-up as positive; content scrolling wants the opposite.
fn wheel_pixels(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT_PX,
        MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
    }
}
