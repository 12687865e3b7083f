// Formation target assignment: one commanded point becomes per-unit targets
use bevy::prelude::*;
use crate::commands::{Command, CommandBus, CommandKind, SubscriptionHandle};
use crate::constants::*;
use crate::types::{Obstacle, UnitId, UnitRegistry};

#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct FormationConfig {
    pub spacing_margin: f32,
    pub obstacle_margin: f32,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            spacing_margin: FORMATION_MARGIN,
            obstacle_margin: OBSTACLE_MARGIN,
        }
    }
}

/// Handle of the formation handler on the command bus
#[derive(Resource, Clone, Copy, Debug)]
pub struct FormationSubscription(pub SubscriptionHandle);

/// Golden-angle (sunflower) spiral: radius_k = scale * sqrt(k + 0.5), angle_k = k * golden angle.
/// Offsets are in the XZ plane (Vec2.y is world Z).
pub fn sunflower_offsets(count: usize, scale: f32) -> Vec<Vec2> {
    (0..count)
        .map(|k| {
            let radius = scale * (k as f32 + 0.5).sqrt();
            let angle = k as f32 * GOLDEN_ANGLE;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

fn min_pair_distance(points: &[Vec2]) -> Option<f32> {
    let mut closest: Option<f32> = None;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            let distance = a.distance(*b);
            closest = Some(closest.map_or(distance, |c| c.min(distance)));
        }
    }
    closest
}

/// Spiral scale for which the closest pair among `count` offsets is exactly `min_spacing` apart
pub fn spiral_scale(count: usize, min_spacing: f32) -> f32 {
    let min_spacing = min_spacing.max(0.0);
    match min_pair_distance(&sunflower_offsets(count, 1.0)) {
        Some(unit_distance) if unit_distance > STEERING_EPSILON => min_spacing / unit_distance,
        _ => min_spacing,
    }
}

pub fn formation_offsets(count: usize, min_spacing: f32) -> Vec<Vec2> {
    sunflower_offsets(count, spiral_scale(count, min_spacing))
}

/// Push `candidate` radially (in XZ) out of every obstacle's expanded radius.
/// A candidate sitting exactly on an obstacle center leaves along +X.
pub fn project_outside_obstacles(
    candidate: Vec3,
    unit_radius: f32,
    obstacles: &[Obstacle],
    margin: f32,
) -> Vec3 {
    let mut point = candidate;
    // Overlapping obstacles can push a point into each other; settle over a few passes
    for _ in 0..PROJECTION_PASSES {
        let mut moved = false;
        for obstacle in obstacles {
            let expanded = obstacle.radius + unit_radius + margin;
            let offset = Vec2::new(point.x - obstacle.position.x, point.z - obstacle.position.z);
            let distance = offset.length();
            if distance >= expanded {
                continue;
            }

            let direction = if distance > STEERING_EPSILON { offset / distance } else { Vec2::X };
            point.x = obstacle.position.x + direction.x * expanded;
            point.z = obstacle.position.z + direction.y * expanded;
            moved = true;
        }
        if !moved {
            break;
        }
    }
    point
}

/// Assign spiral formation targets around `target` to every selected unit.
/// Returns how many units were retargeted.
pub fn assign_formation_targets(
    units: &mut UnitRegistry,
    obstacles: &[Obstacle],
    target: Vec3,
    config: &FormationConfig,
) -> usize {
    // Stable order: ascending unit id
    let mut selected: Vec<(UnitId, f32)> = units.selected().map(|u| (u.id, u.radius)).collect();
    if selected.is_empty() {
        return 0;
    }
    selected.sort_by_key(|(id, _)| *id);

    let average_radius = selected.iter().map(|(_, r)| r).sum::<f32>() / selected.len() as f32;
    let min_spacing = 2.0 * average_radius + config.spacing_margin;
    let offsets = formation_offsets(selected.len(), min_spacing);

    for (&(unit_id, radius), offset) in selected.iter().zip(offsets) {
        // Every unit shares the commanded height
        let candidate = Vec3::new(target.x + offset.x, target.y, target.z + offset.y);
        let placed = project_outside_obstacles(candidate, radius, obstacles, config.obstacle_margin);
        units.set_target(unit_id, Some(placed));
    }

    selected.len()
}

/// Subscribe the formation handler for MoveSelectedTo on the bus
pub fn register_formation_handler(bus: &mut CommandBus, config: FormationConfig) -> SubscriptionHandle {
    bus.subscribe(CommandKind::MoveSelectedTo, move |command, ctx| {
        let Command::MoveSelectedTo { target } = *command;
        let moved = assign_formation_targets(ctx.units, ctx.obstacles.as_slice(), target, &config);
        if moved > 0 {
            info!(
                "Move command to ({:.1}, {:.1}, {:.1}) for {} units",
                target.x, target.y, target.z, moved
            );
        } else {
            debug!("Move command ignored: no units selected");
        }
    })
}

/// Startup system: attach the formation handler and remember its handle
pub fn subscribe_formation_system(
    mut commands: Commands,
    mut bus: ResMut<CommandBus>,
    config: Res<FormationConfig>,
) {
    let handle = register_formation_handler(&mut bus, *config);
    commands.insert_resource(FormationSubscription(handle));
}
