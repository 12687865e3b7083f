// Volumetric (sphere) selection driven by the 3D cursor
use bevy::prelude::*;
use crate::types::UnitRegistry;

/// Sphere grown from a frozen center toward the live cursor.
/// Only exists while the Select gesture is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionVolume {
    pub center: Vec3,
    pub radius: f32,
}

impl SelectionVolume {
    pub fn new(center: Vec3) -> Self {
        Self { center, radius: 0.0 }
    }

    /// True 3D distance
    pub fn grow_to(&mut self, cursor_point: Vec3) {
        self.radius = self.center.distance(cursor_point);
    }

    /// Inclusive boundary
    pub fn contains(&self, point: Vec3) -> bool {
        self.center.distance(point) <= self.radius
    }
}

/// Replace the current selection with every unit inside the volume.
/// Returns how many units ended up selected.
pub fn apply_selection(units: &mut UnitRegistry, volume: &SelectionVolume) -> usize {
    let mut selected_count = 0;
    for unit in units.iter_mut() {
        unit.selected = volume.contains(unit.position);
        if unit.selected {
            selected_count += 1;
        }
    }
    selected_count
}
