// Steering engine: arrival + separation + obstacle avoidance, integrated once per tick
use bevy::prelude::*;
use std::f32::consts::{PI, TAU};
use crate::constants::*;
use crate::types::{Obstacle, Obstacles, Unit, UnitRegistry};

#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct SteeringConfig {
    pub stop_radius: f32,
    pub arrive_radius: f32,
    pub separation_range_factor: f32,
    pub seek_separation_weight: f32,
    pub idle_separation_weight: f32,
    pub lookahead_seconds: f32,
    pub max_avoid_force: f32,
    pub avoidance_weight: f32,
    pub obstacle_margin: f32,
    pub idle_damping: f32,
    pub max_frame_dt: f32,
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            stop_radius: STOP_RADIUS,
            arrive_radius: ARRIVE_RADIUS,
            separation_range_factor: SEPARATION_RANGE_FACTOR,
            seek_separation_weight: SEEK_SEPARATION_WEIGHT,
            idle_separation_weight: IDLE_SEPARATION_WEIGHT,
            lookahead_seconds: LOOKAHEAD_SECONDS,
            max_avoid_force: MAX_AVOID_FORCE,
            avoidance_weight: AVOIDANCE_WEIGHT,
            obstacle_margin: OBSTACLE_MARGIN,
            idle_damping: IDLE_DAMPING,
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SteeringState {
    Idle,
    Seeking,
}

impl SteeringState {
    pub fn of(unit: &Unit) -> Self {
        if unit.target.is_some() { SteeringState::Seeking } else { SteeringState::Idle }
    }
}

/// Desired speed ramps linearly from 0 at the target to max_speed at arrive_radius
pub fn arrival_speed(distance: f32, max_speed: f32, arrive_radius: f32) -> f32 {
    if arrive_radius <= STEERING_EPSILON {
        return max_speed;
    }
    max_speed * (distance / arrive_radius).clamp(0.0, 1.0)
}

pub fn arrival_force(unit: &Unit, target: Vec3, config: &SteeringConfig) -> Vec3 {
    let to_target = target - unit.position;
    let distance = to_target.length();
    if distance <= STEERING_EPSILON {
        return Vec3::ZERO;
    }

    let desired_speed = arrival_speed(distance, unit.max_speed, config.arrive_radius);
    let desired_velocity = to_target / distance * desired_speed;
    (desired_velocity - unit.velocity).clamp_length_max(unit.max_accel)
}

/// Average inverse-square repulsion from neighbours closer than (r_a + r_b) * range factor
pub fn separation_force(index: usize, units: &[Unit], config: &SteeringConfig) -> Vec3 {
    let unit = &units[index];
    let mut push = Vec3::ZERO;
    let mut neighbours = 0;

    for (other_index, other) in units.iter().enumerate() {
        if other_index == index {
            continue;
        }
        let reach = (unit.radius + other.radius) * config.separation_range_factor;
        let diff = unit.position - other.position;
        let distance_sq = diff.length_squared();
        if distance_sq > reach * reach {
            continue;
        }

        let distance = distance_sq.sqrt();
        let direction = if distance > STEERING_EPSILON {
            diff / distance
        } else {
            // Stacked units split apart along X, lower id to +X
            if unit.id < other.id { Vec3::X } else { Vec3::NEG_X }
        };
        let falloff = distance_sq.max(STEERING_EPSILON);
        push += direction * (unit.max_accel / falloff);
        neighbours += 1;
    }

    if neighbours == 0 {
        return Vec3::ZERO;
    }
    (push / neighbours as f32).clamp_length_max(unit.max_accel)
}

/// Planar heading used by avoidance and facing: velocity, else the target direction
fn planar_heading(unit: &Unit) -> Option<Vec2> {
    let planar_velocity = Vec2::new(unit.velocity.x, unit.velocity.z);
    if planar_velocity.length() > MIN_HEADING_SPEED {
        return planar_velocity.try_normalize();
    }
    let target = unit.target?;
    Vec2::new(target.x - unit.position.x, target.z - unit.position.z).try_normalize()
}

/// Lateral push away from the most threatening obstacle on the probe segment.
/// Obstacles are vertical columns, so the test is done in XZ.
pub fn avoidance_force(unit: &Unit, obstacles: &[Obstacle], config: &SteeringConfig) -> Vec3 {
    let Some(heading) = planar_heading(unit) else { return Vec3::ZERO };

    let speed = unit.speed();
    let probe_length = (speed * config.lookahead_seconds + unit.max_speed * PROBE_SPEED_FRACTION)
        .max(MIN_PROBE_LENGTH);
    let origin = Vec2::new(unit.position.x, unit.position.z);

    // (clearance, offset from center to closest approach, distance, expanded radius)
    let mut threat: Option<(f32, Vec2, f32, f32)> = None;
    for obstacle in obstacles {
        let center = Vec2::new(obstacle.position.x, obstacle.position.z);
        let expanded = obstacle.radius + unit.radius + config.obstacle_margin;
        let along = (center - origin).dot(heading).clamp(0.0, probe_length);
        let closest = origin + heading * along;
        let offset = closest - center;
        let distance = offset.length();
        if distance >= expanded {
            continue;
        }

        let clearance = distance - expanded;
        if threat.map_or(true, |(best, ..)| clearance < best) {
            threat = Some((clearance, offset, distance, expanded));
        }
    }

    let Some((_, offset, distance, expanded)) = threat else { return Vec3::ZERO };

    let normal = if distance > STEERING_EPSILON { offset / distance } else { heading.perp() };
    // Prefer steering sideways over braking
    let lateral = (normal - heading * normal.dot(heading))
        .try_normalize()
        .unwrap_or_else(|| heading.perp());

    let penetration = expanded - distance;
    let strength = if expanded > STEERING_EPSILON {
        (penetration / expanded).clamp(0.1, 1.0)
    } else {
        1.0
    };
    let force = lateral * strength * config.max_avoid_force;
    Vec3::new(force.x, 0.0, force.y) * config.avoidance_weight
}

/// Wrap an angle difference into [-PI, PI)
fn wrap_angle(angle: f32) -> f32 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// Rotate `current` toward `desired` along the shortest arc by at most `max_step`
pub fn turn_towards(current: f32, desired: f32, max_step: f32) -> f32 {
    let diff = wrap_angle(desired - current);
    let step = diff.clamp(-max_step.max(0.0), max_step.max(0.0));
    wrap_angle(current + step)
}

fn update_facing(unit: &mut Unit, dt: f32) {
    let Some(heading) = planar_heading(unit) else { return };
    let desired = heading.x.atan2(heading.y);

    let speed_fraction = if unit.max_speed > STEERING_EPSILON {
        (unit.speed() / unit.max_speed).clamp(MIN_TURN_FRACTION, 1.0)
    } else {
        MIN_TURN_FRACTION
    };
    let max_step = unit.max_turn_rate * speed_fraction * dt;
    unit.facing = turn_towards(unit.facing, desired, max_step);
}

/// Advance every unit by one tick. Forces are computed from the pre-tick snapshot
/// and applied afterwards so no unit sees another's partial update.
pub fn step_units(units: &mut [Unit], obstacles: &[Obstacle], config: &SteeringConfig, dt: f32) {
    let dt = dt.min(config.max_frame_dt);
    if dt <= 0.0 || !dt.is_finite() {
        return;
    }

    // None marks a unit that arrived this tick
    let accelerations: Vec<Option<Vec3>> = (0..units.len())
        .map(|index| {
            let unit = &units[index];
            let mut acceleration = Vec3::ZERO;

            if let Some(target) = unit.target {
                if unit.position.distance(target) <= config.stop_radius {
                    return None;
                }
                acceleration += arrival_force(unit, target, config);
            }

            let separation_weight = match SteeringState::of(unit) {
                SteeringState::Seeking => config.seek_separation_weight,
                SteeringState::Idle => config.idle_separation_weight,
            };
            acceleration += separation_force(index, units, config) * separation_weight;
            acceleration += avoidance_force(unit, obstacles, config);
            Some(acceleration)
        })
        .collect();

    for (unit, acceleration) in units.iter_mut().zip(accelerations) {
        let Some(acceleration) = acceleration else {
            // Arrived: stop in place, no positional snap
            unit.target = None;
            unit.velocity = Vec3::ZERO;
            debug!("Unit {} arrived at ({:.1}, {:.1}, {:.1})", unit.id, unit.position.x, unit.position.y, unit.position.z);
            continue;
        };

        unit.velocity = (unit.velocity + acceleration * dt).clamp_length_max(unit.max_speed);
        if unit.is_idle() {
            // Frame-rate independent settle for residual separation jitter
            unit.velocity *= (-config.idle_damping * dt).exp();
        }
        unit.position += unit.velocity * dt;

        update_facing(unit, dt);
    }
}

/// System: Integrate all units once per frame
pub fn steering_system(
    time: Res<Time>,
    config: Res<SteeringConfig>,
    mut units: ResMut<UnitRegistry>,
    obstacles: Res<Obstacles>,
) {
    let dt = time.delta_secs().min(config.max_frame_dt);
    step_units(units.units_mut(), obstacles.as_slice(), &config, dt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Obstacles, UnitStats};

    fn unit_at(id: u32, position: Vec3) -> Unit {
        Unit::new(id, position, UnitStats::default())
    }

    #[test]
    fn arrival_inside_stop_radius_clears_target_and_velocity() {
        let config = SteeringConfig { stop_radius: 0.6, ..Default::default() };
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.target = Some(Vec3::new(0.5, 0.0, 0.0));
        unit.velocity = Vec3::new(2.0, 0.0, 1.0);
        let mut units = vec![unit];

        step_units(&mut units, &[], &config, 1.0 / 60.0);

        assert!(units[0].target.is_none());
        assert_eq!(units[0].velocity, Vec3::ZERO);
        assert_eq!(units[0].position, Vec3::ZERO);
    }

    #[test]
    fn arrival_speed_ramps_linearly() {
        let max_speed = 6.0;
        let arrive_radius = 4.0;
        assert_eq!(arrival_speed(arrive_radius, max_speed, arrive_radius), max_speed);
        assert_eq!(arrival_speed(arrive_radius / 2.0, max_speed, arrive_radius), max_speed / 2.0);
        assert_eq!(arrival_speed(arrive_radius * 3.0, max_speed, arrive_radius), max_speed);
        assert_eq!(arrival_speed(0.0, max_speed, arrive_radius), 0.0);
    }

    #[test]
    fn arrival_force_is_clamped_to_max_accel() {
        let config = SteeringConfig::default();
        let unit = unit_at(0, Vec3::ZERO);
        let force = arrival_force(&unit, Vec3::new(100.0, 0.0, 0.0), &config);
        assert!(force.length() <= unit.max_accel + 1e-4);
        assert!(force.x > 0.0);
    }

    #[test]
    fn seeking_unit_reaches_target_and_stops() {
        let config = SteeringConfig::default();
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.target = Some(Vec3::new(10.0, 0.0, 5.0));
        let mut units = vec![unit];

        for _ in 0..(60 * 20) {
            step_units(&mut units, &[], &config, 1.0 / 60.0);
        }

        assert!(units[0].is_idle());
        assert!(units[0].position.distance(Vec3::new(10.0, 0.0, 5.0)) <= config.stop_radius + 0.05);
        assert!(units[0].speed() < 1e-3);
    }

    #[test]
    fn overlapping_idle_units_drift_apart() {
        let config = SteeringConfig::default();
        let mut units = vec![unit_at(0, Vec3::ZERO), unit_at(1, Vec3::new(0.3, 0.0, 0.0))];

        for _ in 0..30 {
            step_units(&mut units, &[], &config, 1.0 / 60.0);
        }

        assert!(units[0].position.distance(units[1].position) > 0.3);
        assert!(units[0].position.x < 0.0);
        assert!(units[1].position.x > 0.3);
    }

    #[test]
    fn stacked_units_split_deterministically() {
        let config = SteeringConfig::default();
        let units = vec![unit_at(0, Vec3::ZERO), unit_at(1, Vec3::ZERO)];

        assert!(separation_force(0, &units, &config).x > 0.0);
        assert!(separation_force(1, &units, &config).x < 0.0);
    }

    #[test]
    fn distant_units_do_not_separate() {
        let config = SteeringConfig::default();
        let units = vec![unit_at(0, Vec3::ZERO), unit_at(1, Vec3::new(5.0, 0.0, 0.0))];
        assert_eq!(separation_force(0, &units, &config), Vec3::ZERO);
    }

    #[test]
    fn avoidance_deflects_sideways_without_braking() {
        let config = SteeringConfig::default();
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.velocity = Vec3::new(4.0, 0.0, 0.0);

        let mut obstacles = Obstacles::default();
        obstacles.add(Vec3::new(3.0, 0.0, 0.5), 1.0);

        let force = avoidance_force(&unit, obstacles.as_slice(), &config);
        assert!(force.z < 0.0, "should push away from the obstacle side, got {force}");
        assert!(force.x.abs() < 1e-4);
        assert!(force.length() <= config.max_avoid_force + 1e-4);
    }

    #[test]
    fn avoidance_steers_from_the_deepest_intrusion() {
        let config = SteeringConfig::default();
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.velocity = Vec3::new(4.0, 0.0, 0.0);

        // Grazes the probe from -Z
        let mut shallow_only = Obstacles::default();
        shallow_only.add(Vec3::new(3.0, 0.0, -1.4), 1.0);
        let shallow_force = avoidance_force(&unit, shallow_only.as_slice(), &config);
        assert!(shallow_force.z > 0.0, "got {shallow_force}");

        // Sits almost on the path from +Z and wins despite being listed second
        let mut both = Obstacles::default();
        both.add(Vec3::new(3.0, 0.0, -1.4), 1.0);
        both.add(Vec3::new(2.0, 0.0, 0.5), 1.0);
        let force = avoidance_force(&unit, both.as_slice(), &config);
        assert!(force.z < 0.0, "should push away from the deeper obstacle, got {force}");
        assert!(force.length() > shallow_force.length());
    }

    #[test]
    fn separation_is_weighted_by_steering_state() {
        let config = SteeringConfig::default();
        let dt = 1.0 / 60.0;
        let pair = || vec![unit_at(0, Vec3::ZERO), unit_at(1, Vec3::new(0.6, 0.0, 0.0))];
        let push = separation_force(0, &pair(), &config);
        assert!(push.x < 0.0);

        let mut idle = pair();
        step_units(&mut idle, &[], &config, dt);
        let expected_idle = push.x * config.idle_separation_weight * dt * (-config.idle_damping * dt).exp();
        assert!((idle[0].velocity.x - expected_idle).abs() < 1e-5, "idle vx {}", idle[0].velocity.x);

        // Target straight ahead along +Z keeps arrival out of the X component
        let mut seeking = pair();
        seeking[0].target = Some(Vec3::new(0.0, 0.0, 50.0));
        step_units(&mut seeking, &[], &config, dt);
        let expected_seeking = push.x * config.seek_separation_weight * dt;
        assert!((seeking[0].velocity.x - expected_seeking).abs() < 1e-5, "seeking vx {}", seeking[0].velocity.x);
        assert!(seeking[0].velocity.z > 0.0);
    }

    #[test]
    fn idle_velocity_decays_exponentially() {
        let config = SteeringConfig::default();
        let dt = 0.05;
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.velocity = Vec3::new(3.0, 0.0, 0.0);
        let mut units = vec![unit];

        step_units(&mut units, &[], &config, dt);
        let expected = 3.0 * (-config.idle_damping * dt).exp();
        assert!((units[0].velocity.x - expected).abs() < 1e-5);
        assert!((units[0].position.x - expected * dt).abs() < 1e-5);

        step_units(&mut units, &[], &config, dt);
        assert!((units[0].velocity.x - expected * (-config.idle_damping * dt).exp()).abs() < 1e-5);
    }

    #[test]
    fn avoidance_ignores_obstacles_behind() {
        let config = SteeringConfig::default();
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.velocity = Vec3::new(4.0, 0.0, 0.0);

        let mut obstacles = Obstacles::default();
        obstacles.add(Vec3::new(-10.0, 0.0, 0.0), 1.0);

        assert_eq!(avoidance_force(&unit, obstacles.as_slice(), &config), Vec3::ZERO);
    }

    #[test]
    fn idle_stationary_unit_has_no_heading() {
        let config = SteeringConfig::default();
        let mut obstacles = Obstacles::default();
        obstacles.add(Vec3::new(0.5, 0.0, 0.0), 1.0);

        let unit = unit_at(0, Vec3::ZERO);
        assert_eq!(avoidance_force(&unit, obstacles.as_slice(), &config), Vec3::ZERO);
    }

    #[test]
    fn unit_routes_around_obstacle_in_its_path() {
        let config = SteeringConfig::default();
        let mut obstacles = Obstacles::default();
        obstacles.add(Vec3::new(10.0, 0.0, 0.0), 1.5);

        let mut unit = unit_at(0, Vec3::ZERO);
        unit.target = Some(Vec3::new(20.0, 0.0, 0.0));
        let mut units = vec![unit];

        for _ in 0..(60 * 20) {
            step_units(&mut units, obstacles.as_slice(), &config, 1.0 / 60.0);
            let planar = Vec2::new(units[0].position.x - 10.0, units[0].position.z);
            assert!(planar.length() > 1.5, "unit entered the obstacle at {}", units[0].position);
        }
    }

    #[test]
    fn turn_takes_shortest_arc() {
        // From just under +PI to just over -PI is a short positive turn across the seam
        let turned = turn_towards(3.0, -3.0, 0.1);
        assert!((turned - 3.1).abs() < 1e-4);

        let capped = turn_towards(0.0, 1.0, 0.25);
        assert!((capped - 0.25).abs() < 1e-6);

        let reached = turn_towards(0.0, 0.1, 0.25);
        assert!((reached - 0.1).abs() < 1e-6);
    }

    #[test]
    fn facing_follows_velocity() {
        let config = SteeringConfig::default();
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.target = Some(Vec3::new(20.0, 0.0, 0.0));
        let mut units = vec![unit];

        for _ in 0..60 {
            step_units(&mut units, &[], &config, 1.0 / 60.0);
        }
        // +X is yaw PI/2
        assert!((units[0].facing - PI / 2.0).abs() < 0.05);
    }

    #[test]
    fn oversized_frames_are_clamped() {
        let config = SteeringConfig::default();
        let mut unit = unit_at(0, Vec3::ZERO);
        unit.velocity = Vec3::new(unit.max_speed, 0.0, 0.0);
        unit.target = Some(Vec3::new(100.0, 0.0, 0.0));
        let mut units = vec![unit];

        step_units(&mut units, &[], &config, 10.0);
        assert!(units[0].position.x <= units[0].max_speed * config.max_frame_dt + 1e-4);
    }
}
