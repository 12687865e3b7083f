use bevy::prelude::*;
use crate::constants::*;

pub type UnitId = u32;
pub type ObstacleId = u32;

/// Per-unit movement limits handed to the registry at spawn time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitStats {
    pub radius: f32,
    pub max_speed: f32,
    pub max_accel: f32,
    pub max_turn_rate: f32,
    pub hit_points: f32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            radius: UNIT_RADIUS,
            max_speed: UNIT_MAX_SPEED,
            max_accel: UNIT_MAX_ACCEL,
            max_turn_rate: UNIT_MAX_TURN_RATE,
            hit_points: UNIT_HIT_POINTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub id: UnitId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub target: Option<Vec3>, // None means Idle
    pub radius: f32,
    pub max_speed: f32,
    pub max_accel: f32,
    pub max_turn_rate: f32,
    pub facing: f32, // Yaw around +Y, 0 faces +Z
    pub selected: bool,
    pub hit_points: f32,
}

impl Unit {
    pub fn new(id: UnitId, position: Vec3, stats: UnitStats) -> Self {
        Self {
            id,
            position,
            velocity: Vec3::ZERO,
            target: None,
            radius: stats.radius.max(0.0),
            max_speed: stats.max_speed.max(0.0),
            max_accel: stats.max_accel.max(0.0),
            max_turn_rate: stats.max_turn_rate.max(0.0),
            facing: 0.0,
            selected: false,
            hit_points: stats.hit_points,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.target.is_none()
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Owns every unit and hands out ids. Units are never removed by the core.
#[derive(Resource, Default, Debug)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    next_unit_id: UnitId,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, position: Vec3, stats: UnitStats) -> UnitId {
        let unit_id = self.next_unit_id;
        self.next_unit_id += 1;

        self.units.push(Unit::new(unit_id, position, stats));
        unit_id
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|unit| unit.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Unit> {
        self.units.iter_mut()
    }

    /// Slice view for the steering pass; the slice cannot grow or shrink.
    pub fn units_mut(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    pub fn selected(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().filter(|unit| unit.selected)
    }

    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    pub fn set_target(&mut self, id: UnitId, target: Option<Vec3>) -> bool {
        match self.get_mut(id) {
            Some(unit) => {
                unit.target = target;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub position: Vec3,
    pub radius: f32,
}

/// Static obstacle set, filled once by the map collaborator
#[derive(Resource, Default, Debug)]
pub struct Obstacles {
    obstacles: Vec<Obstacle>,
    next_obstacle_id: ObstacleId,
}

impl Obstacles {
    pub fn add(&mut self, position: Vec3, radius: f32) -> ObstacleId {
        let obstacle_id = self.next_obstacle_id;
        self.next_obstacle_id += 1;

        self.obstacles.push(Obstacle {
            id: obstacle_id,
            position,
            radius: radius.max(0.0),
        });
        obstacle_id
    }

    pub fn as_slice(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_allocates_monotonic_ids() {
        let mut registry = UnitRegistry::new();
        let a = registry.spawn(Vec3::ZERO, UnitStats::default());
        let b = registry.spawn(Vec3::X, UnitStats::default());
        let c = registry.spawn(Vec3::Z, UnitStats::default());

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get(b).map(|u| u.position), Some(Vec3::X));
    }

    #[test]
    fn spawned_units_start_idle_and_unselected() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(Vec3::new(1.0, 2.0, 3.0), UnitStats::default());
        let unit = registry.get(id).expect("unit exists");

        assert!(unit.is_idle());
        assert!(!unit.selected);
        assert_eq!(unit.velocity, Vec3::ZERO);
        assert_eq!(registry.selected_count(), 0);
    }

    #[test]
    fn set_target_reports_unknown_ids() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(Vec3::ZERO, UnitStats::default());

        assert!(registry.set_target(id, Some(Vec3::ONE)));
        assert!(!registry.set_target(id + 10, Some(Vec3::ONE)));
        assert!(!registry.get(id).expect("unit exists").is_idle());
    }
}
