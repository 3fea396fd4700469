/// Raycasting camera: a view direction plus the two screen-plane basis vectors
/// Mouse look rotates the basis; the player owns the position
use glam::{Quat, Vec3};

/// Horizontal half-extent of the screen plane at unit distance (~66 degree FOV)
pub const PLANE_X_LENGTH: f32 = 0.66;
/// Vertical half-extent, 0.66 scaled to a 16:10 frame
pub const PLANE_Y_LENGTH: f32 = 0.4125;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Direction through the screen centre, not normalized
    pub dir: Vec3,
    /// Screen-right basis, scaled by the horizontal half-extent
    pub plane_x: Vec3,
    /// Screen-up basis, scaled by the vertical half-extent
    pub plane_y: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            dir: Vec3::Z,
            plane_x: Vec3::X * PLANE_X_LENGTH,
            plane_y: Vec3::Y * PLANE_Y_LENGTH,
        }
    }
}

impl Camera {
    pub fn new(dir: Vec3, plane_x: Vec3, plane_y: Vec3) -> Self {
        Self {
            dir,
            plane_x,
            plane_y,
        }
    }

    /// World-space ray for a screen offset in [-1, 1] on both axes
    #[inline]
    pub fn ray_direction(&self, camera_x: f32, camera_y: f32) -> Vec3 {
        self.dir + self.plane_x * camera_x + self.plane_y * camera_y
    }

    /// Ray through pixel (x, y) of a `width` x `height` frame, y measured upwards
    #[inline]
    pub fn pixel_ray(&self, x: usize, y: usize, width: usize, height: usize) -> Vec3 {
        self.ray_direction(screen_offset(x, width), screen_offset(y, height))
    }

    /// Turn about world Y. Always accepted.
    pub fn rotate_yaw(&mut self, angle: f32) {
        let rotation = Quat::from_rotation_y(angle);
        self.dir = rotation * self.dir;
        self.plane_x = rotation * self.plane_x;
        self.plane_y = rotation * self.plane_y;
    }

    /// Tilt about the screen-right axis.
    /// Dropped when the up basis would point downwards; returns whether it applied.
    pub fn try_pitch(&mut self, angle: f32) -> bool {
        let axis = self.plane_x.normalize_or_zero();
        if axis == Vec3::ZERO {
            return false;
        }
        let rotation = Quat::from_axis_angle(axis, angle);
        let new_plane_y = rotation * self.plane_y;
        if new_plane_y.y <= 0.0 {
            return false;
        }
        self.dir = rotation * self.dir;
        self.plane_y = new_plane_y;
        true
    }

    /// Update camera orientation from mouse delta
    pub fn rotate(&mut self, mouse_delta_x: f32, mouse_delta_y: f32, sensitivity: f32) {
        if mouse_delta_x != 0.0 {
            self.rotate_yaw(mouse_delta_x * sensitivity);
        }
        if mouse_delta_y != 0.0 {
            self.try_pitch(mouse_delta_y * sensitivity);
        }
    }

    /// Walking direction: view direction flattened onto the ground plane
    #[inline]
    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.dir.x, 0.0, self.dir.z)
    }

    /// Strafing direction: unit screen-right flattened onto the ground plane
    #[inline]
    pub fn right(&self) -> Vec3 {
        let right = self.plane_x.normalize_or_zero();
        Vec3::new(right.x, 0.0, right.z)
    }
}

/// Map a pixel index to [-1, 1)
#[inline]
pub fn screen_offset(pixel: usize, extent: usize) -> f32 {
    2.0 * pixel as f32 / extent as f32 - 1.0
}
