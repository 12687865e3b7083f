use bevy::prelude::*;
use rts_control::setup::{setup_scene, spawn_demo_units, spawn_obstacles};
use rts_control::visuals::RtsVisualsPlugin;
use rts_control::RtsControlPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "RTS Control".into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(RtsControlPlugin)
        .add_plugins(RtsVisualsPlugin)
        .add_systems(Startup, (setup_scene, spawn_obstacles, spawn_demo_units))
        .run();
}
