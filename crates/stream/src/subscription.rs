//! Per-connection subscription bookkeeping.
//!
//! Pure state machine: it decides which join/leave commands go on the wire
//! and when, and never touches a socket itself. At most one bookmaker is
//! active at a time.

use casino_feed_core::{BookmakerId, ClientCommand, GameType};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct SubscriptionTracker {
    game: GameType,
    active: Option<BookmakerId>,
    connected: bool,
    pending: VecDeque<ClientCommand>,
}

impl SubscriptionTracker {
    #[must_use]
    pub fn new(game: GameType) -> Self {
        Self {
            game,
            active: None,
            connected: false,
            pending: VecDeque::new(),
        }
    }

    #[must_use]
    pub const fn active(&self) -> Option<BookmakerId> {
        self.active
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Commands waiting for the next connected transition.
    #[must_use]
    pub fn pending(&self) -> Vec<ClientCommand> {
        self.pending.iter().cloned().collect()
    }

    /// Requests a subscription and returns the commands to send right now.
    ///
    /// Subscribing to the active bookmaker is a no-op. Switching while
    /// connected yields `leave(previous)` followed by `join(new)`; while
    /// offline only the join is queued, since the server holds no room for a
    /// dead link.
    pub fn subscribe(&mut self, bookmaker_id: BookmakerId) -> Vec<ClientCommand> {
        if self.active == Some(bookmaker_id) {
            return Vec::new();
        }

        let previous = self.active.replace(bookmaker_id);
        let join = ClientCommand::join(self.game, bookmaker_id);

        if !self.connected {
            self.pending.clear();
            self.pending.push_back(join);
            return Vec::new();
        }

        let mut commands = Vec::with_capacity(2);
        if let Some(previous) = previous {
            commands.push(ClientCommand::leave(previous));
        }
        commands.push(join);
        commands
    }

    /// Drops the subscription. Unknown bookmakers and offline calls emit nothing.
    pub fn unsubscribe(&mut self, bookmaker_id: BookmakerId) -> Vec<ClientCommand> {
        if self.active != Some(bookmaker_id) {
            return Vec::new();
        }
        self.active = None;

        if self.connected {
            vec![ClientCommand::leave(bookmaker_id)]
        } else {
            self.pending.clear();
            Vec::new()
        }
    }

    /// Marks the link as up and drains the pending queue.
    pub fn on_connected(&mut self) -> Vec<ClientCommand> {
        self.connected = true;
        self.pending.drain(..).collect()
    }

    /// Marks the link as down and queues a re-join for the active bookmaker.
    pub fn on_link_lost(&mut self) {
        self.connected = false;
        self.pending.clear();
        if let Some(bookmaker_id) = self.active {
            self.pending
                .push_back(ClientCommand::join(self.game, bookmaker_id));
        }
    }

    pub fn reset(&mut self) {
        self.active = None;
        self.connected = false;
        self.pending.clear();
    }
}
