//! Camera interaction controller.
//!
//! One `Gesture` value holds the active interaction mode, so rotate, pan,
//! edge-scroll and volumetric selection are mutually exclusive by construction.
//! Input is applied once per tick from the `InputQueue`; the camera-control
//! collaborator is disabled for the duration of every gesture and its prior
//! `enabled` flag is restored on every exit path (release, pointer leave,
//! focus loss, pre-emption).

use bevy::prelude::*;
use std::collections::HashSet;
use crate::camera::{CameraRig, OrbitInput, Spherical};
use crate::commands::Command;
use crate::constants::*;
use crate::cursor::Cursor;
use crate::input::{InputEvent, InputQueue, Modifiers, PointerButton};
use crate::raycast::screen_to_ndc;
use crate::selection::{apply_selection, SelectionVolume};
use crate::types::UnitRegistry;

#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub struct ControlConfig {
    pub rotate_sensitivity: f32,
    pub pitch_epsilon: f32,
    pub pan_drag_threshold: f32,
    pub pan_speed: f32,
    pub edge_scroll_threshold: f32,
    pub edge_scroll_speed: f32,
    pub height_step: f32,
    pub fov_y: f32,
    pub max_frame_dt: f32,
}

impl ControlConfig {
    /// Clamp values that would break the state machine, warning about each one
    pub fn sanitized(mut self) -> Self {
        let max_pitch_epsilon = std::f32::consts::FRAC_PI_2 - 0.01;
        if !(self.pitch_epsilon > 0.0 && self.pitch_epsilon < max_pitch_epsilon) {
            warn!("pitch_epsilon {} out of range, using {}", self.pitch_epsilon, CAMERA_PITCH_EPSILON);
            self.pitch_epsilon = CAMERA_PITCH_EPSILON;
        }
        if !(self.edge_scroll_threshold >= 0.0 && self.edge_scroll_threshold < 1.0) {
            warn!("edge_scroll_threshold {} out of range, disabling edge scroll", self.edge_scroll_threshold);
            self.edge_scroll_threshold = 0.0;
        }
        if !(self.max_frame_dt > 0.0) {
            warn!("max_frame_dt {} must be positive, using {}", self.max_frame_dt, MAX_FRAME_DT);
            self.max_frame_dt = MAX_FRAME_DT;
        }
        self
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            rotate_sensitivity: CAMERA_ROTATION_SPEED,
            pitch_epsilon: CAMERA_PITCH_EPSILON,
            pan_drag_threshold: PAN_DRAG_THRESHOLD_PX,
            pan_speed: CAMERA_PAN_SPEED,
            edge_scroll_threshold: EDGE_SCROLL_THRESHOLD,
            edge_scroll_speed: EDGE_SCROLL_SPEED,
            height_step: HEIGHT_STEP_PER_LINE,
            fov_y: CAMERA_FOV_Y,
            max_frame_dt: MAX_FRAME_DT,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotateGesture {
    pub spherical: Spherical,
    pub restore_enabled: bool,
    pub dragged: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanGesture {
    pub start_screen: Vec2,
    pub travelled: f32,
    pub dragged: bool,
    pub restore_enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeScrollGesture {
    /// x = strafe (+right), y = forward (+top edge)
    pub direction: Vec2,
    pub restore_enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectGesture {
    pub volume: SelectionVolume,
    pub restore_enabled: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    Rotate(RotateGesture),
    Pan(PanGesture),
    EdgeScroll(EdgeScrollGesture),
    Select(SelectGesture),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Idle,
    Rotate,
    Pan,
    EdgeScroll,
    Select,
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Idle => GestureKind::Idle,
            Gesture::Rotate(_) => GestureKind::Rotate,
            Gesture::Pan(_) => GestureKind::Pan,
            Gesture::EdgeScroll(_) => GestureKind::EdgeScroll,
            Gesture::Select(_) => GestureKind::Select,
        }
    }

    /// Camera gestures hold the cursor relative to the camera
    pub fn moves_camera(&self) -> bool {
        matches!(self, Gesture::Rotate(_) | Gesture::Pan(_) | Gesture::EdgeScroll(_))
    }

    fn restore_enabled(&self) -> Option<bool> {
        match self {
            Gesture::Idle => None,
            Gesture::Rotate(g) => Some(g.restore_enabled),
            Gesture::Pan(g) => Some(g.restore_enabled),
            Gesture::EdgeScroll(g) => Some(g.restore_enabled),
            Gesture::Select(g) => Some(g.restore_enabled),
        }
    }
}

/// Pointer bookkeeping shared by all gestures
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    pub screen: Vec2,
    pub viewport: Vec2,
    pub inside: bool,
    pub locked: bool,
    pub captured: bool,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            screen: Vec2::ZERO,
            viewport: Vec2::ZERO,
            inside: false,
            locked: false,
            captured: false,
        }
    }
}

impl PointerState {
    pub fn ndc(&self) -> Option<Vec2> {
        screen_to_ndc(self.screen, self.viewport)
    }

    pub fn aspect(&self) -> f32 {
        if self.viewport.y > 0.0 { self.viewport.x / self.viewport.y } else { 1.0 }
    }
}

/// Which screen edges the pointer is pressing against, if any
pub fn edge_direction(ndc: Vec2, threshold: f32) -> Option<Vec2> {
    if threshold <= 0.0 {
        return None;
    }
    let axis = |value: f32| {
        if value >= 1.0 - threshold {
            1.0
        } else if value <= -1.0 + threshold {
            -1.0
        } else {
            0.0
        }
    };
    let direction = Vec2::new(axis(ndc.x), axis(ndc.y));
    (direction != Vec2::ZERO).then_some(direction)
}

#[derive(Resource, Debug, Default)]
pub struct InteractionController {
    config: ControlConfig,
    gesture: Gesture,
    cursor: Cursor,
    pointer: PointerState,
    held: HashSet<PointerButton>,
    outbox: Vec<Command>,
}

impl InteractionController {
    pub fn new(config: ControlConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn gesture_kind(&self) -> GestureKind {
        self.gesture.kind()
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn selection_volume(&self) -> Option<&SelectionVolume> {
        match &self.gesture {
            Gesture::Select(select) => Some(&select.volume),
            _ => None,
        }
    }

    /// Queue a command for the next dispatch
    pub fn issue(&mut self, command: Command) {
        self.outbox.push(command);
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    /// Apply one tick: buffered events in order, then edge scrolling, the
    /// collaborator's update and cursor refresh.
    pub fn tick(
        &mut self,
        events: impl IntoIterator<Item = InputEvent>,
        orbit: &OrbitInput,
        rig: &mut CameraRig,
        units: &mut UnitRegistry,
        dt: f32,
    ) {
        let dt = dt.clamp(0.0, self.config.max_frame_dt);

        for event in events {
            self.handle_event(event, rig, units);
        }

        self.update_edge_scroll(rig, dt);
        rig.update_controls(orbit, dt);
        self.refresh_cursor(rig);
    }

    fn handle_event(&mut self, event: InputEvent, rig: &mut CameraRig, units: &mut UnitRegistry) {
        match event {
            InputEvent::ViewportResized { size } => {
                self.pointer.viewport = size;
            }
            InputEvent::PointerEntered => {
                self.pointer.inside = true;
            }
            InputEvent::PointerLeft | InputEvent::FocusLost => {
                self.pointer.inside = false;
                self.held.clear();
                self.cancel_gesture(rig);
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer.locked = locked;
            }
            InputEvent::PointerMoved { position } => {
                // Absolute positions are meaningless while locked
                if !self.pointer.locked {
                    self.pointer.screen = position;
                    self.pointer.inside = true;
                    self.on_pointer_moved(rig);
                }
            }
            InputEvent::PointerDelta { delta } => {
                self.on_pointer_delta(delta, rig);
                if self.pointer.locked {
                    // Virtual pointer for lock mode
                    self.pointer.screen = (self.pointer.screen + delta).clamp(Vec2::ZERO, self.pointer.viewport);
                    self.on_pointer_moved(rig);
                }
            }
            InputEvent::Wheel { lines } => {
                self.cursor.adjust_height(lines * self.config.height_step, rig);
                self.grow_selection();
            }
            InputEvent::ButtonDown { button, modifiers } => self.on_button_down(button, modifiers, rig),
            InputEvent::ButtonUp { button } => self.on_button_up(button, rig, units),
        }
    }

    fn on_pointer_moved(&mut self, rig: &CameraRig) {
        if let Gesture::Pan(pan) = &mut self.gesture {
            if !self.pointer.locked
                && !pan.dragged
                && self.pointer.screen.distance(pan.start_screen) > self.config.pan_drag_threshold
            {
                pan.dragged = true;
                debug!("Right-press classified as pan drag");
            }
        }
        self.refresh_cursor(rig);
    }

    fn on_pointer_delta(&mut self, delta: Vec2, rig: &mut CameraRig) {
        let config = self.config;
        match &mut self.gesture {
            Gesture::Rotate(rotate) => {
                rotate.spherical.yaw -= delta.x * config.rotate_sensitivity;
                rotate.spherical.pitch -= delta.y * config.rotate_sensitivity;
                rotate.spherical.clamp_pitch(config.pitch_epsilon);
                rotate.dragged = true;
                rig.position = rig.target() + rotate.spherical.to_offset();
            }
            Gesture::Pan(pan) => {
                pan.travelled += delta.length();
                if self.pointer.locked && !pan.dragged && pan.travelled > config.pan_drag_threshold {
                    pan.dragged = true;
                    debug!("Right-press classified as pan drag (relative)");
                }
                if pan.dragged {
                    // Grab-the-ground feel: the world follows the pointer
                    let (forward, right) = rig.flat_basis();
                    let scale = config.pan_speed * rig.distance();
                    rig.translate((forward * delta.y - right * delta.x) * scale);
                }
            }
            _ => {}
        }
    }

    fn on_button_down(&mut self, button: PointerButton, modifiers: Modifiers, rig: &mut CameraRig) {
        self.held.insert(button);

        match button {
            PointerButton::Secondary => {
                if !matches!(self.gesture, Gesture::Idle | Gesture::EdgeScroll(_)) {
                    return;
                }
                self.end_gesture(rig);
                if modifiers.rotate {
                    self.begin_rotate(rig);
                } else {
                    self.begin_pan(rig);
                }
            }
            PointerButton::Primary => {
                let chorded = self.held.len() > 1;
                match self.gesture {
                    Gesture::Rotate(_) => debug!("Selection blocked by camera rotate"),
                    Gesture::Idle | Gesture::EdgeScroll(_) if !chorded => {
                        self.end_gesture(rig);
                        self.begin_select(rig);
                    }
                    _ => {}
                }
            }
            PointerButton::Auxiliary => {}
        }
    }

    fn on_button_up(&mut self, button: PointerButton, rig: &mut CameraRig, units: &mut UnitRegistry) {
        self.held.remove(&button);

        let ends_gesture = matches!(
            (button, &self.gesture),
            (PointerButton::Secondary, Gesture::Rotate(_) | Gesture::Pan(_))
                | (PointerButton::Primary, Gesture::Select(_))
        );
        if !ends_gesture {
            return;
        }

        match self.end_gesture(rig) {
            Gesture::Pan(pan) if !pan.dragged => {
                // A right-click, not a pan
                let target = self.cursor.world_point();
                self.issue(Command::MoveSelectedTo { target });
            }
            Gesture::Select(select) => {
                let selected = apply_selection(units, &select.volume);
                info!(
                    "Volume selected {} units (radius {:.1})",
                    selected, select.volume.radius
                );
            }
            _ => {}
        }
    }

    fn begin_rotate(&mut self, rig: &mut CameraRig) {
        let restore_enabled = self.suspend_controls(rig);
        let mut spherical = Spherical::from_offset(rig.position - rig.target());
        spherical.clamp_pitch(self.config.pitch_epsilon);

        self.pointer.captured = true;
        self.cursor.lock_to_camera(rig.position);
        self.gesture = Gesture::Rotate(RotateGesture {
            spherical,
            restore_enabled,
            dragged: false,
        });
        debug!("Camera rotate started");
    }

    fn begin_pan(&mut self, rig: &mut CameraRig) {
        let restore_enabled = self.suspend_controls(rig);
        self.cursor.lock_to_camera(rig.position);
        self.gesture = Gesture::Pan(PanGesture {
            start_screen: self.pointer.screen,
            travelled: 0.0,
            dragged: false,
            restore_enabled,
        });
    }

    fn begin_edge_scroll(&mut self, direction: Vec2, rig: &mut CameraRig) {
        let restore_enabled = self.suspend_controls(rig);
        self.cursor.lock_to_camera(rig.position);
        self.gesture = Gesture::EdgeScroll(EdgeScrollGesture {
            direction,
            restore_enabled,
        });
        debug!("Edge scroll started");
    }

    fn begin_select(&mut self, rig: &mut CameraRig) {
        let restore_enabled = self.suspend_controls(rig);
        self.gesture = Gesture::Select(SelectGesture {
            volume: SelectionVolume::new(self.cursor.world_point()),
            restore_enabled,
        });
    }

    /// Disable the collaborator, returning the flag to restore on exit
    fn suspend_controls(&mut self, rig: &mut CameraRig) -> bool {
        let was_enabled = rig.controls().enabled();
        rig.controls_mut().set_enabled(false);
        was_enabled
    }

    /// Leave the current gesture, restoring everything it changed. Returns the finished gesture.
    fn end_gesture(&mut self, rig: &mut CameraRig) -> Gesture {
        let finished = std::mem::take(&mut self.gesture);
        if let Some(restore_enabled) = finished.restore_enabled() {
            rig.controls_mut().set_enabled(restore_enabled);
        }
        self.cursor.unlock();
        self.pointer.captured = false;
        finished
    }

    /// Abort without side effects: no command, no selection change
    fn cancel_gesture(&mut self, rig: &mut CameraRig) {
        let cancelled = self.end_gesture(rig);
        if cancelled != Gesture::Idle {
            debug!("Cancelled {:?} gesture", cancelled.kind());
        }
    }

    fn update_edge_scroll(&mut self, rig: &mut CameraRig, dt: f32) {
        let pressing = if self.pointer.inside && self.held.is_empty() {
            self.pointer
                .ndc()
                .and_then(|ndc| edge_direction(ndc, self.config.edge_scroll_threshold))
        } else {
            None
        };

        match (self.gesture.kind(), pressing) {
            (GestureKind::Idle, Some(direction)) => self.begin_edge_scroll(direction, rig),
            (GestureKind::EdgeScroll, Some(direction)) => {
                if let Gesture::EdgeScroll(edge) = &mut self.gesture {
                    edge.direction = direction;
                }
            }
            (GestureKind::EdgeScroll, None) => {
                self.end_gesture(rig);
            }
            _ => {}
        }

        if let Gesture::EdgeScroll(edge) = &self.gesture {
            let (forward, right) = rig.flat_basis();
            let movement = (right * edge.direction.x + forward * edge.direction.y).normalize_or_zero()
                * self.config.edge_scroll_speed
                * dt;
            rig.translate(movement);
        }
    }

    fn refresh_cursor(&mut self, rig: &CameraRig) {
        if self.cursor.is_locked() {
            self.cursor.follow_camera(rig.position);
        } else if self.pointer.inside {
            if let Some(ndc) = self.pointer.ndc() {
                let view = rig.view_ray(self.config.fov_y, self.pointer.aspect());
                self.cursor.update_from_screen(ndc, &view);
            }
        }
        self.grow_selection();
    }

    fn grow_selection(&mut self) {
        let cursor_point = self.cursor.world_point();
        if let Gesture::Select(select) = &mut self.gesture {
            select.volume.grow_to(cursor_point);
        }
    }
}

/// System: Drain buffered input and advance the interaction state machine
pub fn interaction_tick_system(
    time: Res<Time>,
    mut queue: ResMut<InputQueue>,
    mut controller: ResMut<InteractionController>,
    mut rig: ResMut<CameraRig>,
    mut units: ResMut<UnitRegistry>,
) {
    let orbit = queue.orbit;
    let events: Vec<InputEvent> = queue.drain().collect();
    controller.tick(events, &orbit, &mut rig, &mut units, time.delta_secs());
}
