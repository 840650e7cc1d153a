//! Mouse input handed to the layer stack.

/// Which button an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl From<winit::event::MouseButton> for MouseButton {
    fn from(button: winit::event::MouseButton) -> Self {
        match button {
            winit::event::MouseButton::Left => Self::Left,
            winit::event::MouseButton::Right => Self::Right,
            winit::event::MouseButton::Middle => Self::Middle,
            winit::event::MouseButton::Back => Self::Other(3),
            winit::event::MouseButton::Forward => Self::Other(4),
            winit::event::MouseButton::Other(id) => Self::Other(id),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Move,
    Press,
    Release,
}

/// A mouse event in logical window coordinates (origin top-left).
///
/// Logical pixels match the window size given in
/// [`WindowConfig`](crate::config::WindowConfig) on any display scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseEvent {
    pub x: f64,
    pub y: f64,
    pub action: MouseAction,
    /// `None` for plain cursor movement
    pub button: Option<MouseButton>,
}

impl MouseEvent {
    pub fn moved(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            action: MouseAction::Move,
            button: None,
        }
    }

    pub fn pressed(x: f64, y: f64, button: MouseButton) -> Self {
        Self {
            x,
            y,
            action: MouseAction::Press,
            button: Some(button),
        }
    }

    pub fn released(x: f64, y: f64, button: MouseButton) -> Self {
        Self {
            x,
            y,
            action: MouseAction::Release,
            button: Some(button),
        }
    }

    /// Converts an event built from physical pixels into logical pixels.
    pub fn to_logical(self, scale_factor: f64) -> Self {
        Self {
            x: self.x / scale_factor,
            y: self.y / scale_factor,
            ..self
        }
    }
}
