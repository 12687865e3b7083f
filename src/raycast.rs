use bevy::prelude::*;

/// Rays flatter than this (|dir.y|) are treated as parallel to the ground
const RAY_PARALLEL_EPSILON: f32 = 1e-4;

/// Ray-plane intersection against the infinite ground plane y = 0.
/// Returns None if the ray is parallel to the ground or points away from it.
pub fn ray_ground_intersection(origin: Vec3, direction: Vec3) -> Option<Vec3> {
    // Ray equation: P = origin + t * direction
    // Solve: origin.y + t * direction.y = 0
    if direction.y.abs() < RAY_PARALLEL_EPSILON {
        return None;
    }

    let t = -origin.y / direction.y;
    if t < 0.0 {
        // Intersection is behind the ray origin
        return None;
    }

    let hit = origin + direction * t;
    Some(Vec3::new(hit.x, 0.0, hit.z))
}

/// Map a window pixel position (y down) to normalized device coordinates (y up).
pub fn screen_to_ndc(screen: Vec2, viewport: Vec2) -> Option<Vec2> {
    if viewport.x <= 0.0 || viewport.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        2.0 * screen.x / viewport.x - 1.0,
        1.0 - 2.0 * screen.y / viewport.y,
    ))
}

/// Perspective view used to build world rays through NDC points.
/// Mirrors the projection the render camera is spawned with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewRay {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
}

impl ViewRay {
    pub fn new(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32) -> Self {
        Self { eye, target, fov_y, aspect }
    }

    /// World-space ray (origin, normalized direction) through `ndc`.
    pub fn ray(&self, ndc: Vec2) -> Option<(Vec3, Vec3)> {
        let forward = (self.target - self.eye).try_normalize()?;
        // Looking straight down has no horizon to derive "right" from
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);
        let up = right.cross(forward);

        let tan_half = (self.fov_y * 0.5).tan();
        let aspect = if self.aspect.is_finite() && self.aspect > 0.0 { self.aspect } else { 1.0 };
        let direction = forward + right * (ndc.x * tan_half * aspect) + up * (ndc.y * tan_half);

        Some((self.eye, direction.try_normalize()?))
    }

    /// Ground hit under an NDC point, if any.
    pub fn ground_hit(&self, ndc: Vec2) -> Option<Vec3> {
        let (origin, direction) = self.ray(ndc)?;
        ray_ground_intersection(origin, direction)
    }
}
