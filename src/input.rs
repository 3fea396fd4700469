/// Per-frame input signals handed to the session by the window layer
use crate::camera::Camera;
use glam::{Vec2, Vec3};

/// Movement key state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementKeys {
    pub forward_pressed: bool,
    pub backward_pressed: bool,
    pub left_pressed: bool,
    pub right_pressed: bool,
    pub up_pressed: bool,
    pub down_pressed: bool,
}

impl MovementKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unnormalized movement direction for the held keys
    pub fn intent(&self, camera: &Camera) -> Vec3 {
        let mut intent = Vec3::ZERO;

        if self.forward_pressed {
            intent += camera.forward();
        }
        if self.backward_pressed {
            intent -= camera.forward();
        }
        if self.right_pressed {
            intent += camera.right();
        }
        if self.left_pressed {
            intent -= camera.right();
        }
        if self.up_pressed {
            intent += Vec3::Y;
        }
        if self.down_pressed {
            intent -= Vec3::Y;
        }

        intent
    }
}

/// Everything the core reads from the outside world for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub movement: MovementKeys,
    /// Relative pointer motion in pixels since the previous frame
    pub mouse_delta: Vec2,
    /// Raw button state; edges are derived by [`ButtonEdges`]
    pub left_down: bool,
    pub right_down: bool,
    /// Block selection steps, positive cycles forward
    pub select_delta: i32,
}

/// Buttons that went down this frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pressed {
    pub left: bool,
    pub right: bool,
}

/// Turns raw button-down state into just-pressed events
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonEdges {
    prev_left: bool,
    prev_right: bool,
}

impl ButtonEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, left_down: bool, right_down: bool) -> Pressed {
        let pressed = Pressed {
            left: left_down && !self.prev_left,
            right: right_down && !self.prev_right,
        };
        self.prev_left = left_down;
        self.prev_right = right_down;
        pressed
    }
}
