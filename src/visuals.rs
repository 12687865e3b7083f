// Presentation: camera transform, unit meshes, cursor/selection gizmos and pointer grab
use bevy::prelude::*;
use bevy::math::Isometry3d;
use bevy::window::{CursorGrabMode, PrimaryWindow};
use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;
use crate::camera::{CameraRig, RtsCamera};
use crate::constants::*;
use crate::interaction::InteractionController;
use crate::types::{UnitId, UnitRegistry};

const CURSOR_COLOR: Color = Color::srgb(1.0, 0.85, 0.2);
const DROP_LINE_COLOR: Color = Color::srgba(1.0, 1.0, 1.0, 0.5);
const SELECTION_SPHERE_COLOR: Color = Color::srgb(0.2, 0.9, 0.4);
const TARGET_MARKER_COLOR: Color = Color::srgb(0.3, 0.7, 1.0);

/// Links a rendered mesh to its unit in the registry
#[derive(Component)]
pub struct UnitVisual {
    pub unit_id: UnitId,
}

#[derive(Resource)]
pub struct UnitMaterials {
    pub mesh: Handle<Mesh>,
    pub idle: Handle<StandardMaterial>,
    pub selected: Handle<StandardMaterial>,
}

pub struct RtsVisualsPlugin;

impl Plugin for RtsVisualsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_unit_assets)
            .add_systems(
                Update,
                (
                    sync_camera_transform,
                    spawn_unit_visuals,
                    sync_unit_visuals,
                    draw_cursor_gizmos,
                    draw_unit_markers,
                    sync_pointer_grab,
                )
                    .chain()
                    .after(crate::ControlSet),
            );
    }
}

pub fn setup_unit_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let mesh = meshes.add(Capsule3d::new(UNIT_RADIUS, UNIT_RADIUS * 2.0));
    let idle = materials.add(StandardMaterial {
        base_color: Color::srgb(0.7, 0.7, 0.8),
        metallic: 0.3,
        perceptual_roughness: 0.5,
        ..default()
    });
    let selected = materials.add(StandardMaterial {
        base_color: Color::srgb(0.3, 0.9, 0.5),
        emissive: LinearRgba::new(0.05, 0.4, 0.1, 1.0),
        metallic: 0.3,
        perceptual_roughness: 0.5,
        ..default()
    });

    commands.insert_resource(UnitMaterials { mesh, idle, selected });
}

// Capsule is 4 radii tall with its origin at the middle; units stand on their position
fn mesh_center(position: Vec3, radius: f32) -> Vec3 {
    position + Vec3::Y * radius * 2.0
}

/// System: Drive the render camera from the rig
pub fn sync_camera_transform(rig: Res<CameraRig>, mut camera_query: Query<&mut Transform, With<RtsCamera>>) {
    let Ok(mut transform) = camera_query.single_mut() else { return };
    *transform = Transform::from_translation(rig.position).looking_at(rig.target(), Vec3::Y);
}

/// System: Give every registry unit a mesh the first time it appears
pub fn spawn_unit_visuals(
    mut commands: Commands,
    units: Res<UnitRegistry>,
    unit_materials: Option<Res<UnitMaterials>>,
    existing: Query<&UnitVisual>,
) {
    let Some(unit_materials) = unit_materials else { return };
    if !units.is_changed() {
        return;
    }

    let spawned: HashSet<UnitId> = existing.iter().map(|v| v.unit_id).collect();
    for unit in units.iter().filter(|u| !spawned.contains(&u.id)) {
        commands.spawn((
            Mesh3d(unit_materials.mesh.clone()),
            MeshMaterial3d(unit_materials.idle.clone()),
            Transform::from_translation(mesh_center(unit.position, unit.radius))
                .with_rotation(Quat::from_rotation_y(unit.facing)),
            UnitVisual { unit_id: unit.id },
        ));
    }
}

/// System: Copy unit positions, facing and selection state onto their meshes
pub fn sync_unit_visuals(
    units: Res<UnitRegistry>,
    unit_materials: Option<Res<UnitMaterials>>,
    mut visual_query: Query<(&UnitVisual, &mut Transform, &mut MeshMaterial3d<StandardMaterial>)>,
) {
    let Some(unit_materials) = unit_materials else { return };

    for (visual, mut transform, mut material) in visual_query.iter_mut() {
        let Some(unit) = units.get(visual.unit_id) else { continue };

        transform.translation = mesh_center(unit.position, unit.radius);
        transform.rotation = Quat::from_rotation_y(unit.facing);

        let wanted = if unit.selected { &unit_materials.selected } else { &unit_materials.idle };
        if material.0 != *wanted {
            material.0 = wanted.clone();
        }
    }
}

fn ground_ring(gizmos: &mut Gizmos, center: Vec3, radius: f32, color: Color) {
    // Gizmo circles lie in XY; tip them onto the ground
    gizmos.circle(Isometry3d::new(center, Quat::from_rotation_x(FRAC_PI_2)), radius, color);
}

/// System: Cursor ring, drop line to the ground and the live selection sphere
pub fn draw_cursor_gizmos(controller: Res<InteractionController>, mut gizmos: Gizmos) {
    let cursor = controller.cursor().world_point();
    ground_ring(&mut gizmos, cursor, CURSOR_RING_RADIUS, CURSOR_COLOR);

    if cursor.y.abs() > DROP_LINE_MIN_HEIGHT {
        let ground = Vec3::new(cursor.x, 0.0, cursor.z);
        gizmos.line(cursor, ground, DROP_LINE_COLOR);
        ground_ring(&mut gizmos, ground, CURSOR_RING_RADIUS * 0.5, DROP_LINE_COLOR);
    }

    if let Some(volume) = controller.selection_volume() {
        gizmos.sphere(Isometry3d::from_translation(volume.center), volume.radius, SELECTION_SPHERE_COLOR);
        ground_ring(&mut gizmos, Vec3::new(volume.center.x, 0.0, volume.center.z), volume.radius, SELECTION_SPHERE_COLOR);
    }
}

/// System: Drop lines for airborne units and target markers for units on the move
pub fn draw_unit_markers(units: Res<UnitRegistry>, mut gizmos: Gizmos) {
    for unit in units.iter() {
        if unit.position.y.abs() > DROP_LINE_MIN_HEIGHT {
            gizmos.line(unit.position, Vec3::new(unit.position.x, 0.0, unit.position.z), DROP_LINE_COLOR);
        }
        if let (true, Some(target)) = (unit.selected, unit.target) {
            ground_ring(&mut gizmos, target, unit.radius, TARGET_MARKER_COLOR);
        }
    }
}

/// System: Mirror the controller's pointer lock/capture onto the OS cursor
pub fn sync_pointer_grab(
    controller: Res<InteractionController>,
    mut window_query: Query<&mut Window, With<PrimaryWindow>>,
) {
    let Ok(mut window) = window_query.single_mut() else { return };
    let pointer = controller.pointer();

    let (grab_mode, visible) = if pointer.locked {
        (CursorGrabMode::Locked, false)
    } else if pointer.captured {
        (CursorGrabMode::Confined, true)
    } else {
        (CursorGrabMode::None, true)
    };

    // Only touch the window when something changed
    if window.cursor_options.grab_mode != grab_mode || window.cursor_options.visible != visible {
        window.cursor_options.grab_mode = grab_mode;
        window.cursor_options.visible = visible;
    }
}
