// Input event queue: raw Bevy input is buffered here and drained once per tick
use bevy::prelude::*;
use bevy::input::mouse::{MouseButtonInput, MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::input::ButtonState;
use bevy::window::{CursorEntered, CursorLeft, CursorMoved, PrimaryWindow, WindowFocused};
use std::collections::VecDeque;
use crate::camera::OrbitInput;
use crate::constants::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Primary,
    Secondary,
    Auxiliary,
}

impl PointerButton {
    pub fn from_mouse(button: MouseButton) -> Option<Self> {
        match button {
            MouseButton::Left => Some(PointerButton::Primary),
            MouseButton::Right => Some(PointerButton::Secondary),
            MouseButton::Middle => Some(PointerButton::Auxiliary),
            _ => None,
        }
    }
}

/// Modifier keys sampled at button press
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub rotate: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    ButtonDown { button: PointerButton, modifiers: Modifiers },
    ButtonUp { button: PointerButton },
    /// Absolute pointer position in window pixels (y down)
    PointerMoved { position: Vec2 },
    /// Relative motion; the only movement reported while the pointer is locked
    PointerDelta { delta: Vec2 },
    /// Wheel motion in lines
    Wheel { lines: f32 },
    PointerEntered,
    PointerLeft,
    FocusLost,
    ViewportResized { size: Vec2 },
    PointerLockChanged { locked: bool },
}

/// Events buffered between ticks plus the latest keyboard nudge for the orbit camera
#[derive(Resource, Default, Debug)]
pub struct InputQueue {
    events: VecDeque<InputEvent>,
    pub orbit: OrbitInput,
}

impl InputQueue {
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

fn rotate_modifier_held(keyboard: &ButtonInput<KeyCode>) -> bool {
    keyboard.any_pressed([
        KeyCode::AltLeft,
        KeyCode::AltRight,
        KeyCode::ControlLeft,
        KeyCode::ControlRight,
    ])
}

fn sample_orbit_input(keyboard: &ButtonInput<KeyCode>) -> OrbitInput {
    // WASD movement (relative to camera's view direction)
    let mut pan = Vec2::ZERO;
    if keyboard.any_pressed([KeyCode::KeyW, KeyCode::ArrowUp]) {
        pan.y += 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyS, KeyCode::ArrowDown]) {
        pan.y -= 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]) {
        pan.x -= 1.0;
    }
    if keyboard.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]) {
        pan.x += 1.0;
    }

    let mut zoom = 0.0;
    if keyboard.pressed(KeyCode::KeyE) {
        zoom += 1.0;
    }
    if keyboard.pressed(KeyCode::KeyQ) {
        zoom -= 1.0;
    }

    OrbitInput { pan, zoom }
}

fn pointer_button_event(input: &MouseButtonInput, modifiers: Modifiers) -> Option<InputEvent> {
    let button = PointerButton::from_mouse(input.button)?;
    Some(match input.state {
        ButtonState::Pressed => InputEvent::ButtonDown { button, modifiers },
        ButtonState::Released => InputEvent::ButtonUp { button },
    })
}

/// System: Translate this frame's Bevy input into queued InputEvents
pub fn collect_input_events(
    keyboard: Res<ButtonInput<KeyCode>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut cursor_moved: EventReader<CursorMoved>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut mouse_buttons: EventReader<MouseButtonInput>,
    mut mouse_wheel: EventReader<MouseWheel>,
    mut cursor_entered: EventReader<CursorEntered>,
    mut cursor_left: EventReader<CursorLeft>,
    mut window_focused: EventReader<WindowFocused>,
    mut queue: ResMut<InputQueue>,
    mut last_viewport: Local<Vec2>,
    mut pointer_locked: Local<bool>,
) {
    if let Ok(window) = window_query.single() {
        let viewport = Vec2::new(window.width(), window.height());
        if viewport != *last_viewport {
            *last_viewport = viewport;
            queue.push(InputEvent::ViewportResized { size: viewport });
        }
    }

    if keyboard.just_pressed(KeyCode::KeyL) {
        *pointer_locked = !*pointer_locked;
        info!("Pointer lock {}", if *pointer_locked { "on" } else { "off" });
        queue.push(InputEvent::PointerLockChanged { locked: *pointer_locked });
    }

    for _ in cursor_entered.read() {
        queue.push(InputEvent::PointerEntered);
    }

    for moved in cursor_moved.read() {
        queue.push(InputEvent::PointerMoved { position: moved.position });
    }

    for motion in mouse_motion.read() {
        queue.push(InputEvent::PointerDelta { delta: motion.delta });
    }

    let modifiers = Modifiers { rotate: rotate_modifier_held(&keyboard) };
    // Arrival order: a release and a re-press in one frame must stay in that order
    for input in mouse_buttons.read() {
        if let Some(event) = pointer_button_event(input, modifiers) {
            queue.push(event);
        }
    }

    for scroll in mouse_wheel.read() {
        let lines = match scroll.unit {
            MouseScrollUnit::Line => scroll.y,
            MouseScrollUnit::Pixel => scroll.y * PIXEL_SCROLL_SCALE,
        };
        queue.push(InputEvent::Wheel { lines });
    }

    for _ in cursor_left.read() {
        queue.push(InputEvent::PointerLeft);
    }
    for focus in window_focused.read() {
        if !focus.focused {
            queue.push(InputEvent::FocusLost);
        }
    }

    queue.orbit = sample_orbit_input(&keyboard);
}
