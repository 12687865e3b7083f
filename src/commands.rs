// Synchronous command bus between the input layer and the unit layer
use bevy::prelude::*;
use std::collections::HashMap;
use crate::interaction::InteractionController;
use crate::types::{Obstacles, UnitRegistry};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    MoveSelectedTo { target: Vec3 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    MoveSelectedTo,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::MoveSelectedTo { .. } => CommandKind::MoveSelectedTo,
        }
    }
}

/// What a subscriber may touch while handling a command
pub struct CommandContext<'a> {
    pub units: &'a mut UnitRegistry,
    pub obstacles: &'a Obstacles,
}

pub type CommandHandler = Box<dyn FnMut(&Command, &mut CommandContext<'_>) + Send + Sync>;

/// Returned by `subscribe`; pass back to `unsubscribe` to detach the handler
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    kind: CommandKind,
    id: u64,
}

impl SubscriptionHandle {
    pub fn kind(&self) -> CommandKind {
        self.kind
    }
}

/// Pub/sub keyed by command kind. Handlers run synchronously inside `emit`;
/// their relative order is unspecified.
#[derive(Resource, Default)]
pub struct CommandBus {
    subscribers: HashMap<CommandKind, HashMap<u64, CommandHandler>>,
    next_subscription_id: u64,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, kind: CommandKind, handler: F) -> SubscriptionHandle
    where
        F: FnMut(&Command, &mut CommandContext<'_>) + Send + Sync + 'static,
    {
        let id = self.next_subscription_id;
        self.next_subscription_id += 1;

        self.subscribers
            .entry(kind)
            .or_default()
            .insert(id, Box::new(handler));
        SubscriptionHandle { kind, id }
    }

    /// Returns false if the handle was already detached
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let Some(handlers) = self.subscribers.get_mut(&handle.kind) else { return false };
        let removed = handlers.remove(&handle.id).is_some();
        if handlers.is_empty() {
            self.subscribers.remove(&handle.kind);
        }
        removed
    }

    pub fn subscriber_count(&self, kind: CommandKind) -> usize {
        self.subscribers.get(&kind).map_or(0, HashMap::len)
    }

    /// Invoke every current subscriber of the command's kind. Returns how many ran.
    pub fn emit(&mut self, command: &Command, ctx: &mut CommandContext<'_>) -> usize {
        let Some(handlers) = self.subscribers.get_mut(&command.kind()) else {
            debug!("No subscribers for {:?}", command.kind());
            return 0;
        };
        for handler in handlers.values_mut() {
            handler(command, &mut *ctx);
        }
        handlers.len()
    }
}

/// System: Deliver commands issued by the interaction controller this tick
pub fn dispatch_commands_system(
    mut controller: ResMut<InteractionController>,
    mut bus: ResMut<CommandBus>,
    mut units: ResMut<UnitRegistry>,
    obstacles: Res<Obstacles>,
) {
    let pending = controller.drain_commands();
    if pending.is_empty() {
        return;
    }

    let mut ctx = CommandContext {
        units: &mut units,
        obstacles: &obstacles,
    };
    for command in &pending {
        bus.emit(command, &mut ctx);
    }
}
