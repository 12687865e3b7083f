// Camera rig, spherical helpers and the orbit-camera collaborator
use bevy::prelude::*;
use std::f32::consts::PI;
use crate::constants::*;
use crate::raycast::ViewRay;

/// Marker for the render camera driven by the rig
#[derive(Component)]
pub struct RtsCamera;

/// Keyboard nudges sampled once per frame for the orbit collaborator
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrbitInput {
    pub pan: Vec2,  // x = strafe right, y = forward
    pub zoom: f32,  // positive zooms in
}

/// Minimal surface of the external camera-control collaborator.
/// The interaction controller only toggles `enabled` and reads/writes `target`;
/// `update` runs once per tick and may move the eye while enabled.
pub trait CameraControl: Send + Sync {
    fn target(&self) -> Vec3;
    fn set_target(&mut self, target: Vec3);
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
    fn update(&mut self, eye: &mut Vec3, input: &OrbitInput, dt: f32);
}

/// RTS orbit controls: keyboard pan over the ground plane and keyboard zoom
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enabled: bool,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enabled: true,
            pan_speed: CAMERA_SPEED,
            zoom_speed: CAMERA_ZOOM_SPEED,
            min_distance: CAMERA_MIN_DISTANCE,
            max_distance: CAMERA_MAX_DISTANCE,
        }
    }
}

impl CameraControl for OrbitControls {
    fn target(&self) -> Vec3 {
        self.target
    }

    fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn update(&mut self, eye: &mut Vec3, input: &OrbitInput, dt: f32) {
        if !self.enabled {
            return;
        }

        // Pan relative to camera facing, kept on the ground plane
        if input.pan.length_squared() > 0.0 {
            let (forward, right) = flat_basis(*eye, self.target);
            let movement = (right * input.pan.x + forward * input.pan.y).normalize_or_zero()
                * self.pan_speed
                * dt;
            *eye += movement;
            self.target += movement;
        }

        if input.zoom != 0.0 {
            let offset = *eye - self.target;
            let distance = offset.length();
            if distance > STEERING_EPSILON {
                let new_distance = (distance - input.zoom * self.zoom_speed * dt)
                    .clamp(self.min_distance, self.max_distance);
                *eye = self.target + offset / distance * new_distance;
            }
        }
    }
}

/// Camera position plus the collaborator that owns the look-at target
#[derive(Resource)]
pub struct CameraRig {
    pub position: Vec3,
    controls: Box<dyn CameraControl>,
}

impl CameraRig {
    pub fn new(position: Vec3, controls: impl CameraControl + 'static) -> Self {
        Self {
            position,
            controls: Box::new(controls),
        }
    }

    pub fn target(&self) -> Vec3 {
        self.controls.target()
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.controls.set_target(target);
    }

    pub fn controls(&self) -> &dyn CameraControl {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> &mut dyn CameraControl {
        self.controls.as_mut()
    }

    pub fn distance(&self) -> f32 {
        self.position.distance(self.target())
    }

    /// Move camera and target together
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
        let target = self.target() + delta;
        self.set_target(target);
    }

    /// Raise camera and target together, preserving perceived distance
    pub fn raise(&mut self, dy: f32) {
        self.translate(Vec3::new(0.0, dy, 0.0));
    }

    /// Horizontal (forward, right) basis of the current view
    pub fn flat_basis(&self) -> (Vec3, Vec3) {
        flat_basis(self.position, self.target())
    }

    pub fn view_ray(&self, fov_y: f32, aspect: f32) -> ViewRay {
        ViewRay::new(self.position, self.target(), fov_y, aspect)
    }

    /// Run the collaborator's per-frame update against the rig's eye
    pub fn update_controls(&mut self, input: &OrbitInput, dt: f32) {
        let mut eye = self.position;
        self.controls.update(&mut eye, input, dt);
        self.position = eye;
    }
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new(CAMERA_START_POSITION, OrbitControls::new(CAMERA_START_TARGET))
    }
}

/// Forward/right of the view flattened to the horizontal plane.
/// Looking straight down falls back to -Z forward.
pub fn flat_basis(eye: Vec3, target: Vec3) -> (Vec3, Vec3) {
    let mut forward = target - eye;
    forward.y = 0.0;
    let forward = forward.try_normalize().unwrap_or(Vec3::NEG_Z);
    let right = forward.cross(Vec3::Y);
    (forward, right)
}

/// Camera offset from its target in spherical coordinates.
/// `pitch` is the polar angle from +Y, `yaw` is measured from +Z toward +X.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Spherical {
    pub fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius < STEERING_EPSILON {
            return Self { radius: 0.0, yaw: 0.0, pitch: PI * 0.5 };
        }
        Self {
            radius,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / radius).clamp(-1.0, 1.0).acos(),
        }
    }

    pub fn to_offset(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(
            self.radius * sin_pitch * sin_yaw,
            self.radius * cos_pitch,
            self.radius * sin_pitch * cos_yaw,
        )
    }

    /// Clamp pitch into [epsilon, PI - epsilon] so the camera never flips over a pole
    pub fn clamp_pitch(&mut self, epsilon: f32) {
        let epsilon = epsilon.clamp(0.0, PI * 0.5);
        self.pitch = self.pitch.clamp(epsilon, PI - epsilon);
    }
}
