//! Wire envelope for the real-time channel.
//!
//! Both directions carry a named event with a JSON payload. The serialized
//! form of [`ServerEvent`] (`{"event": ..., "data": ...}`) is also the line
//! format of recorded captures.

use crate::model::{BookmakerId, GameType};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JOIN_BOOKMAKER: &str = "joinBookmaker";
pub const JOIN_SPACEMAN: &str = "join_spaceman";
pub const LEAVE_BOOKMAKER: &str = "leaveBookmaker";
pub const SUBSCRIBE_PREDICTION: &str = "subscribePrediction";
pub const UNSUBSCRIBE_PREDICTION: &str = "unsubscribePrediction";
pub const GET_LATEST_HISTORY: &str = "getLatestHistory";
pub const REQUEST_IMMEDIATE_UPDATE: &str = "requestImmediateUpdate";

/// Event pushed by the server on a game namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    #[serde(rename = "event")]
    pub name: String,
    #[serde(rename = "data", default)]
    pub payload: Value,
}

impl ServerEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Command emitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCommand {
    pub name: String,
    pub payload: Value,
}

impl ClientCommand {
    /// Subscription request for a bookmaker on the given game's namespace.
    #[must_use]
    pub fn join(game: GameType, bookmaker_id: BookmakerId) -> Self {
        match game {
            GameType::Spaceman => Self {
                name: JOIN_SPACEMAN.to_string(),
                payload: json!({ "spacemanId": bookmaker_id.0 }),
            },
            GameType::Aviator | GameType::Roulette => Self {
                name: JOIN_BOOKMAKER.to_string(),
                payload: json!(bookmaker_id.0),
            },
        }
    }

    #[must_use]
    pub fn leave(bookmaker_id: BookmakerId) -> Self {
        Self {
            name: LEAVE_BOOKMAKER.to_string(),
            payload: json!(bookmaker_id.0),
        }
    }

    /// Asks the roulette namespace to push forecasts computed over the last
    /// `window` spins of a table.
    #[must_use]
    pub fn subscribe_prediction(bookmaker_id: BookmakerId, window: u32) -> Self {
        Self::forecast(SUBSCRIBE_PREDICTION, bookmaker_id, window)
    }

    #[must_use]
    pub fn unsubscribe_prediction(bookmaker_id: BookmakerId, window: u32) -> Self {
        Self::forecast(UNSUBSCRIBE_PREDICTION, bookmaker_id, window)
    }

    /// One-off forecast push, outside the subscription's own schedule.
    #[must_use]
    pub fn request_immediate_update(bookmaker_id: BookmakerId, window: u32) -> Self {
        Self::forecast(REQUEST_IMMEDIATE_UPDATE, bookmaker_id, window)
    }

    /// Asks for the recent spins of a table, answered with `latestHistory`.
    #[must_use]
    pub fn get_latest_history(bookmaker_id: BookmakerId) -> Self {
        Self {
            name: GET_LATEST_HISTORY.to_string(),
            payload: json!(bookmaker_id.0),
        }
    }

    fn forecast(name: &str, bookmaker_id: BookmakerId, window: u32) -> Self {
        Self {
            name: name.to_string(),
            payload: json!({ "bookmakerId": bookmaker_id.0, "number": window }),
        }
    }

    #[must_use]
    pub fn is_join(&self) -> bool {
        self.name == JOIN_BOOKMAKER || self.name == JOIN_SPACEMAN
    }

    #[must_use]
    pub fn is_leave(&self) -> bool {
        self.name == LEAVE_BOOKMAKER
    }
}
