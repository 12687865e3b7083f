// Demo scene: lights, ground, camera, obstacles and a block of units
use bevy::prelude::*;
use rand::Rng;
use std::f32::consts::PI;
use crate::camera::{CameraRig, RtsCamera};
use crate::interaction::ControlConfig;
use crate::types::{Obstacles, UnitRegistry, UnitStats};

const GROUND_SIZE: f32 = 200.0;
const DEMO_GRID_SIDE: usize = 6;
const DEMO_UNIT_SPACING: f32 = 2.0;
const DEMO_POSITION_JITTER: f32 = 0.3;
const DEMO_OBSTACLE_COUNT: usize = 6;
const DEMO_OBSTACLE_RING_RADIUS: f32 = 18.0;

#[derive(Component)]
pub struct ObstacleVisual;

#[derive(Component)]
pub struct ControlsHelpUI;

/// Perspective matching the rays the cursor is picked with
pub fn camera_projection(config: &ControlConfig) -> Projection {
    Projection::from(PerspectiveProjection {
        fov: config.fov_y,
        ..default()
    })
}

pub fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    rig: Res<CameraRig>,
    control_config: Res<ControlConfig>,
) {
    // Directional light (sun)
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform {
            translation: Vec3::new(0.0, 50.0, 0.0),
            rotation: Quat::from_rotation_x(-PI / 4.0),
            ..default()
        },
    ));

    // Ambient light
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.4, 0.4, 0.6),
        brightness: 300.0,
        affects_lightmapped_meshes: false,
    });

    // Ground plane at y = 0, the plane the cursor raycasts against
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE, GROUND_SIZE))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.3, 0.35, 0.25),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::default(),
    ));

    // RTS camera; its transform is driven by the CameraRig every frame
    commands.spawn((
        Camera3d::default(),
        camera_projection(&control_config),
        Transform::from_translation(rig.position).looking_at(rig.target(), Vec3::Y),
        RtsCamera,
    ));

    commands.spawn((
        Text::new(
            "Left-drag: Volume select | Right-click: Move | Right-drag: Pan | Alt/Ctrl+Right-drag: Rotate\n\
             Wheel: Cursor height | WASD/Arrows: Pan | Q/E: Zoom | L: Pointer lock | Screen edge: Scroll",
        ),
        TextFont {
            font_size: 18.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
        ControlsHelpUI,
    ));
}

/// Ring of column obstacles around the unit block
pub fn spawn_obstacles(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut obstacles: ResMut<Obstacles>,
) {
    let material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.45, 0.4, 0.35),
        perceptual_roughness: 0.8,
        ..default()
    });

    for i in 0..DEMO_OBSTACLE_COUNT {
        let angle = i as f32 / DEMO_OBSTACLE_COUNT as f32 * 2.0 * PI;
        let radius = 1.5 + (i % 3) as f32;
        let position = Vec3::new(angle.cos(), 0.0, angle.sin()) * DEMO_OBSTACLE_RING_RADIUS;
        obstacles.add(position, radius);

        let height = 4.0;
        commands.spawn((
            Mesh3d(meshes.add(Cylinder::new(radius, height))),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(position + Vec3::Y * height * 0.5),
            ObstacleVisual,
        ));
    }

    info!("Spawned {} obstacles", obstacles.len());
}

/// Square block of units centered on the origin with a little positional jitter
pub fn spawn_demo_units(mut units: ResMut<UnitRegistry>) {
    let mut rng = rand::thread_rng();
    let half_extent = (DEMO_GRID_SIDE as f32 - 1.0) * DEMO_UNIT_SPACING * 0.5;

    for row in 0..DEMO_GRID_SIDE {
        for column in 0..DEMO_GRID_SIDE {
            let jitter = Vec3::new(
                rng.gen_range(-DEMO_POSITION_JITTER..DEMO_POSITION_JITTER),
                0.0,
                rng.gen_range(-DEMO_POSITION_JITTER..DEMO_POSITION_JITTER),
            );
            let position = Vec3::new(
                column as f32 * DEMO_UNIT_SPACING - half_extent,
                0.0,
                row as f32 * DEMO_UNIT_SPACING - half_extent,
            ) + jitter;
            units.spawn(position, UnitStats::default());
        }
    }

    info!("Spawned {} units", units.len());
}
