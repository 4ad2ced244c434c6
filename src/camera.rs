use std::f32::consts::{FRAC_PI_2, TAU};

use bitflags::bitflags;
use glam::{Mat4, Vec2, Vec3};

use crate::settings::CameraSettings;

const UP: Vec3 = Vec3::Y;

bitflags! {
    /// Digital movement keys held during a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Directions: u8 {
        const FORWARD = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const UP = 1 << 4;
        const DOWN = 1 << 5;
    }
}

impl Directions {
    fn axis(self, positive: Directions, negative: Directions) -> f32 {
        let p = if self.contains(positive) { 1.0 } else { 0.0 };
        let n = if self.contains(negative) { 1.0 } else { 0.0 };
        p - n
    }
}

/// Per-frame input magnitudes, produced by the (external) input layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraInput {
    pub directions: Directions,
    /// Mouse delta this frame, x drives yaw and y drives pitch.
    pub mouse: Vec2,
}

/// Rotation actually applied by `Camera::update`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraMotion {
    pub translation: Vec3,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Fly camera whose only state is the view (world-to-camera) matrix.
///
/// Movement is expressed in camera space, so every edit inverts the view,
/// applies the transform to the camera's world matrix and inverts back.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    view: Mat4,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            view: Mat4::look_at_rh(position, target, UP),
        }
    }

    pub fn from_settings(settings: &CameraSettings) -> Self {
        Self::new(
            Vec3::from_array(settings.position),
            Vec3::from_array(settings.target),
        )
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    pub fn projection(&self, settings: &CameraSettings, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(settings.fov_y_radians(), aspect, settings.near, settings.far)
    }

    pub fn view_proj(&self, settings: &CameraSettings, aspect: f32) -> Mat4 {
        self.projection(settings, aspect) * self.view
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        let view_inv = self.view.inverse() * Mat4::from_translation(Vec3::new(x, y, z));
        self.view = view_inv.inverse();
    }

    /// Rotates around the camera's own axes: pitch (X), then yaw (Y), then roll (Z).
    pub fn rotate(&mut self, yaw: f32, pitch: f32, roll: f32) {
        let view_inv = self.view.inverse()
            * Mat4::from_rotation_x(pitch)
            * Mat4::from_rotation_y(yaw)
            * Mat4::from_rotation_z(roll);
        self.view = view_inv.inverse();
    }

    pub fn update(
        &mut self,
        delta_time: f32,
        input: &CameraInput,
        settings: &CameraSettings,
    ) -> CameraMotion {
        let m = delta_time * settings.movement_speed;
        let dirs = input.directions;
        let translation = Vec3::new(
            m * dirs.axis(Directions::RIGHT, Directions::LEFT),
            m * dirs.axis(Directions::UP, Directions::DOWN),
            m * dirs.axis(Directions::BACKWARD, Directions::FORWARD),
        );
        self.translate(translation.x, translation.y, translation.z);

        let r = delta_time * settings.rotation_speed;
        let yaw = wrap_angle(input.mouse.x * r);
        let pitch = clamp_pitch(input.mouse.y * r);
        self.rotate(-yaw, -pitch, 0.0);

        CameraMotion {
            translation,
            yaw,
            pitch,
        }
    }

    /// Frames `bbox` by backing off along +Z from its center.
    ///
    /// The distance only uses the box height and depth, so boxes much wider
    /// than tall can end up partly outside a narrow viewport.
    pub fn focus_bounding_box(&mut self, bbox: &BoundingBox, fov_y_radians: f32) {
        let center = bbox.center();
        let half = bbox.half_extents();
        let distance = half.y / (fov_y_radians * 0.5).tan() + half.z;
        let eye = center + Vec3::Z * distance;
        self.view = Mat4::look_at_rh(eye, center, UP);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default())
    }
}

/// Wraps into `[0, 2π)`.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Clamps into `[-π/2, π/2]`.
pub fn clamp_pitch(angle: f32) -> f32 {
    if angle.is_nan() {
        return 0.0;
    }
    angle.clamp(-FRAC_PI_2, FRAC_PI_2)
}
