// RTS control core: cursor, camera interaction, volumetric selection, move commands and steering
use bevy::prelude::*;

pub mod camera;
pub mod commands;
pub mod constants;
pub mod cursor;
pub mod formation;
pub mod input;
pub mod interaction;
pub mod movement;
pub mod raycast;
pub mod selection;
pub mod setup;
pub mod types;
pub mod visuals;

use camera::CameraRig;
use commands::{dispatch_commands_system, CommandBus};
use formation::{subscribe_formation_system, FormationConfig};
use input::{collect_input_events, InputQueue};
use interaction::{interaction_tick_system, ControlConfig, InteractionController};
use movement::{steering_system, SteeringConfig};
use types::{Obstacles, UnitRegistry};

/// Input collection, interaction, command dispatch and steering, in that order each frame
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlSet;

/// Headless control core. Config resources inserted before the plugin are kept.
pub struct RtsControlPlugin;

impl Plugin for RtsControlPlugin {
    fn build(&self, app: &mut App) {
        let control_config = app
            .world()
            .get_resource::<ControlConfig>()
            .copied()
            .unwrap_or_default()
            .sanitized();

        app.insert_resource(control_config)
            .init_resource::<SteeringConfig>()
            .init_resource::<FormationConfig>()
            .init_resource::<CameraRig>()
            .init_resource::<UnitRegistry>()
            .init_resource::<Obstacles>()
            .init_resource::<CommandBus>()
            .init_resource::<InputQueue>()
            .insert_resource(InteractionController::new(control_config))
            .add_systems(Startup, subscribe_formation_system)
            .add_systems(
                Update,
                (
                    collect_input_events,
                    interaction_tick_system,
                    dispatch_commands_system,
                    steering_system,
                )
                    .chain()
                    .in_set(ControlSet),
            );

        info!("RTS control plugin initialized");
    }
}
