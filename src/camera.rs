use glam::Vec2;

/// Viewer pose. `right` spans half the screen width at unit forward distance,
/// so its length is `tan(fov_x / 2)` relative to `forward`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec2,
    pub forward: Vec2,
    pub right: Vec2,
}

impl CameraState {
    pub fn new(position: Vec2, forward: Vec2, right: Vec2) -> Self {
        Self {
            position,
            forward,
            right,
        }
    }

    /// Camera looking along `yaw` (radians, 0 = +X) with a horizontal field of view.
    /// `right` is the clockwise perpendicular, matching screen columns growing
    /// to the right when +Y points down the map.
    pub fn from_yaw(position: Vec2, yaw: f32, fov_x_deg: f32) -> Self {
        let forward = Vec2::from_angle(yaw);
        let half_width = (0.5 * fov_x_deg.to_radians()).tan();
        let right = forward.perp() * half_width;
        Self {
            position,
            forward,
            right,
        }
    }

    /// Rotate both basis vectors together; their lengths are preserved.
    pub fn rotate(&mut self, radians: f32) {
        let rot = Vec2::from_angle(radians);
        self.forward = rot.rotate(self.forward);
        self.right = rot.rotate(self.right);
    }

    /// Horizontal field of view implied by the basis, in degrees.
    pub fn fov_degrees(&self) -> f32 {
        let ratio = self.right.length() / self.forward.length();
        (2.0 * ratio.atan()).to_degrees()
    }
}
