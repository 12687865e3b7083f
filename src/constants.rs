// Tunables for the control core. Config resources default from these.

/// Largest frame delta fed to the simulation (seconds); longer stalls are clamped
pub const MAX_FRAME_DT: f32 = 0.05;

/// Epsilon used by every normalisation / near-zero division guard
pub const STEERING_EPSILON: f32 = 1e-4;

// RTS Camera settings
pub const CAMERA_START_POSITION: bevy::prelude::Vec3 = bevy::prelude::Vec3::new(0.0, 40.0, 55.0);
pub const CAMERA_START_TARGET: bevy::prelude::Vec3 = bevy::prelude::Vec3::ZERO;
pub const CAMERA_FOV_Y: f32 = std::f32::consts::FRAC_PI_4;
pub const CAMERA_SPEED: f32 = 50.0;              // Keyboard pan speed of the orbit controls (units/s)
pub const CAMERA_ZOOM_SPEED: f32 = 40.0;         // Keyboard zoom speed (units/s)
pub const CAMERA_MIN_DISTANCE: f32 = 5.0;
pub const CAMERA_MAX_DISTANCE: f32 = 300.0;
pub const CAMERA_ROTATION_SPEED: f32 = 0.005;    // Radians per pixel of manual-rotate drag
pub const CAMERA_PITCH_EPSILON: f32 = 0.05;      // Keeps manual-rotate pitch away from the poles
pub const CAMERA_PAN_SPEED: f32 = 0.0015;        // World units per pixel, scaled by camera distance

// Gesture disambiguation
pub const PAN_DRAG_THRESHOLD_PX: f32 = 6.0;      // Pixels (or accumulated delta) before a right-press becomes a pan
pub const EDGE_SCROLL_THRESHOLD: f32 = 0.03;     // NDC distance from a screen edge that triggers edge scrolling
pub const EDGE_SCROLL_SPEED: f32 = 40.0;         // Units per second

// Cursor elevation
pub const HEIGHT_STEP_PER_LINE: f32 = 0.5;       // Cursor/camera rise per wheel line
pub const PIXEL_SCROLL_SCALE: f32 = 0.1;         // Pixel-unit wheel events are scaled down to lines

// Unit defaults (spawn collaborator)
pub const UNIT_RADIUS: f32 = 0.5;
pub const UNIT_MAX_SPEED: f32 = 6.0;
pub const UNIT_MAX_ACCEL: f32 = 14.0;
pub const UNIT_MAX_TURN_RATE: f32 = 6.0;         // Radians per second at full speed
pub const UNIT_HIT_POINTS: f32 = 100.0;

// Steering
pub const STOP_RADIUS: f32 = 0.3;                // Distance at which a unit is considered arrived
pub const ARRIVE_RADIUS: f32 = 4.0;              // Distance at which arrival starts ramping speed down
pub const SEPARATION_RANGE_FACTOR: f32 = 1.2;    // Neighbours within (r_a + r_b) * factor repel
pub const SEEK_SEPARATION_WEIGHT: f32 = 0.9;
pub const IDLE_SEPARATION_WEIGHT: f32 = 0.6;
pub const LOOKAHEAD_SECONDS: f32 = 0.6;
pub const MIN_PROBE_LENGTH: f32 = 2.0;
pub const PROBE_SPEED_FRACTION: f32 = 0.25;      // Extra probe length as a fraction of max speed
pub const MAX_AVOID_FORCE: f32 = 18.0;
pub const AVOIDANCE_WEIGHT: f32 = 1.0;
pub const OBSTACLE_MARGIN: f32 = 0.3;
pub const IDLE_DAMPING: f32 = 6.0;               // Exponential velocity decay rate for idle units (1/s)
pub const MIN_HEADING_SPEED: f32 = 0.05;         // Below this a unit steers by its target direction instead
pub const MIN_TURN_FRACTION: f32 = 0.3;          // Slow units still turn at this fraction of max turn rate

// Formation
pub const FORMATION_MARGIN: f32 = 0.4;           // Added to twice the average radius to get minimum spacing
pub const GOLDEN_ANGLE: f32 = 2.399_963_2;       // pi * (3 - sqrt(5))
pub const PROJECTION_PASSES: usize = 4;

// Presentation
pub const CURSOR_RING_RADIUS: f32 = 0.6;
pub const DROP_LINE_MIN_HEIGHT: f32 = 0.05;      // Units lower than this get no drop line
