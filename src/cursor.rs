use bevy::prelude::*;
use crate::camera::CameraRig;
use crate::raycast::ViewRay;

/// Persistent 3D cursor: ground XZ from the pointer plus an independent height channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub xz: Vec2,
    pub height: f32,
    // Offset from the camera captured when a camera gesture starts
    lock_offset: Option<Vec3>,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            xz: Vec2::ZERO,
            height: 0.0,
            lock_offset: None,
        }
    }
}

impl Cursor {
    pub fn world_point(&self) -> Vec3 {
        Vec3::new(self.xz.x, self.height, self.xz.y)
    }

    pub fn is_locked(&self) -> bool {
        self.lock_offset.is_some()
    }

    /// Re-project the cursor from the pointer. A miss keeps the last valid position.
    /// Returns whether the cursor moved.
    pub fn update_from_screen(&mut self, ndc: Vec2, view: &ViewRay) -> bool {
        if self.is_locked() {
            return false;
        }
        let Some(hit) = view.ground_hit(ndc) else { return false };

        let xz = Vec2::new(hit.x, hit.z);
        let moved = xz != self.xz;
        self.xz = xz;
        moved
    }

    /// Raise or lower the cursor, carrying camera and orbit target along.
    pub fn adjust_height(&mut self, delta: f32, rig: &mut CameraRig) {
        if !delta.is_finite() || delta == 0.0 {
            return;
        }
        self.height += delta;
        rig.raise(delta);
    }

    pub fn lock_to_camera(&mut self, camera_position: Vec3) {
        self.lock_offset = Some(self.world_point() - camera_position);
    }

    /// Hold the cursor at camera + snapshot offset while locked
    pub fn follow_camera(&mut self, camera_position: Vec3) {
        if let Some(offset) = self.lock_offset {
            let held = camera_position + offset;
            self.xz = Vec2::new(held.x, held.z);
        }
    }

    pub fn unlock(&mut self) {
        self.lock_offset = None;
    }
}
