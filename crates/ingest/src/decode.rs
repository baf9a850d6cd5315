//! Typed payloads, one per inbound event kind.
//!
//! Every "which field name did this bookmaker use" rule lives here, as the
//! [`Payload::KEYS`] table of each payload. [`decode`] folds those spellings
//! onto the canonical key before deserializing, so a payload that repeats a
//! field under two casings still decodes. Scalar fields go through
//! [`crate::lenient`] so a bad value degrades to zero instead of rejecting
//! the whole event.

use crate::lenient::{
    self, de_f64, de_opt_bookmaker, de_opt_decimal, de_opt_f64, de_opt_text, de_opt_timestamp,
    de_opt_u32, Spellings,
};
use casino_feed_core::{
    Aggregates, BookmakerId, MultiplierHint, RouletteColor, RouletteHint, RoundState, RoundUpdate,
    Scope, ServiceStatus, SettledRound, WheelForecast,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid {event} payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A payload shape together with the spellings its fields arrive under.
pub trait Payload: DeserializeOwned {
    /// Canonical key (the serde name of the field) and its other spellings.
    const KEYS: &'static [Spellings] = &[];
}

/// Decodes `payload` as `T`, tagging failures with the event name.
///
/// # Errors
/// Returns [`DecodeError::Payload`] when the payload does not have the shape of `T`.
pub fn decode<T: Payload>(event: &str, payload: &Value) -> Result<T, DecodeError> {
    let folded = lenient::fold_keys(payload, T::KEYS);
    T::deserialize(folded.as_ref()).map_err(|source| DecodeError::Payload {
        event: event.to_string(),
        source,
    })
}

const BOOKMAKER_ID: Spellings = ("bookmakerId", &["bookmaker_id"]);
const BOOKMAKER_OR_SPACEMAN_ID: Spellings = ("bookmakerId", &["bookmaker_id", "spacemanId"]);
const ROUND_ID: Spellings = ("roundId", &["round_id"]);
const ROUND_OR_GAME_ID: Spellings = ("round_id", &["roundId", "game_id", "gameId"]);

fn phase(value: &Value) -> Option<RoundState> {
    match value {
        Value::Number(n) => n.as_u64().and_then(RoundState::from_code),
        Value::String(s) => RoundState::from_tag(s)
            .or_else(|| s.trim().parse().ok().and_then(RoundState::from_code)),
        _ => None,
    }
}

// =============================================================================
// Aviator raw game frames
// =============================================================================

/// `aviator_raw`: `{bookmakerId, data: {p: {c: command, p: payload}}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFrame {
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    pub data: RawEnvelope,
}

impl Payload for RawFrame {
    const KEYS: &'static [Spellings] = &[BOOKMAKER_ID];
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawEnvelope {
    pub p: Option<RawCommand>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCommand {
    pub c: Option<String>,
    pub p: Value,
}

/// Running tick.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawTick {
    #[serde(deserialize_with = "de_opt_f64")]
    pub x: Option<f64>,
    #[serde(rename = "crashX", deserialize_with = "de_opt_f64")]
    pub crash_x: Option<f64>,
}

impl Payload for RawTick {
    const KEYS: &'static [Spellings] = &[("crashX", &["crash_x"])];
}

impl RawTick {
    #[must_use]
    pub fn into_update(self) -> Option<RoundUpdate> {
        let x = self.x.filter(|x| *x > 0.0)?;
        Some(RoundUpdate {
            phase: Some(RoundState::Running),
            current_multiplier: Some(x),
            max_multiplier: self.crash_x.filter(|c| *c > 0.0),
            ..RoundUpdate::default()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawStateChange {
    pub state: Value,
    #[serde(rename = "roundId", deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
}

impl Payload for RawStateChange {
    const KEYS: &'static [Spellings] = &[ROUND_ID];
}

impl RawStateChange {
    #[must_use]
    pub fn into_update(self) -> RoundUpdate {
        RoundUpdate {
            // Unknown codes fall back to the betting phase.
            phase: Some(phase(&self.state).unwrap_or(RoundState::Betting)),
            round_id: self.round_id,
            ..RoundUpdate::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawBets {
    #[serde(rename = "betsCount", deserialize_with = "de_opt_u32")]
    pub bets_count: Option<u32>,
    pub bets: Option<Vec<Value>>,
    #[serde(rename = "activePlayersCount", deserialize_with = "de_opt_u32")]
    pub active_players_count: Option<u32>,
}

impl Payload for RawBets {
    const KEYS: &'static [Spellings] = &[
        ("betsCount", &["bets_count"]),
        ("activePlayersCount", &["active_players_count"]),
    ];
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawBet {
    #[serde(deserialize_with = "de_opt_decimal")]
    pub bet: Option<Decimal>,
    #[serde(deserialize_with = "de_opt_text")]
    pub player_id: Option<String>,
}

impl Payload for RawBet {
    const KEYS: &'static [Spellings] = &[("player_id", &["playerId"])];
}

impl RawBets {
    /// `None` when the frame carries no bet count. Bets that are not objects are skipped.
    #[must_use]
    pub fn into_update(self) -> Option<RoundUpdate> {
        let bets_count = self.bets_count?;
        let bets: Vec<RawBet> = self
            .bets
            .unwrap_or_default()
            .iter()
            .filter_map(|bet| decode::<RawBet>("bet", bet).ok())
            .collect();
        let total: Decimal = bets.iter().filter_map(|b| b.bet).sum();
        let mut players: Vec<&str> = bets.iter().filter_map(|b| b.player_id.as_deref()).collect();
        players.sort_unstable();
        players.dedup();
        let unique = u32::try_from(players.len()).unwrap_or(u32::MAX);
        let online_players = if unique > 0 {
            Some(unique)
        } else {
            self.active_players_count.filter(|n| *n > 0)
        };

        Some(RoundUpdate {
            bets_count: Some(bets_count),
            total_bet_amount: Some(total),
            online_players,
            ..RoundUpdate::default()
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCashOuts {
    #[serde(rename = "totalCashOut", deserialize_with = "de_opt_decimal")]
    pub total_cash_out: Option<Decimal>,
}

impl Payload for RawCashOuts {
    const KEYS: &'static [Spellings] = &[("totalCashOut", &["total_cashout"])];
}

/// `roundChartInfo`, raw or plain: the final multiplier of a round.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChartInfo {
    #[serde(rename = "maxMultiplier", deserialize_with = "de_opt_f64")]
    pub max_multiplier: Option<f64>,
    #[serde(rename = "roundId", deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
}

impl Payload for ChartInfo {
    const KEYS: &'static [Spellings] =
        &[("maxMultiplier", &["max_multiplier"]), ROUND_ID, BOOKMAKER_ID];
}

impl ChartInfo {
    #[must_use]
    pub fn into_update(self) -> Option<RoundUpdate> {
        let max = self.max_multiplier?;
        Some(RoundUpdate {
            phase: Some(RoundState::Settled),
            max_multiplier: Some(max),
            round_id: self.round_id,
            ..RoundUpdate::default()
        })
    }
}

// =============================================================================
// Round snapshots and ticks
// =============================================================================

/// Full round snapshot (`round` on Aviator and Spaceman).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoundSnapshot {
    #[serde(deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    pub game_state: Value,
    #[serde(deserialize_with = "de_opt_f64")]
    pub current_multiplier: Option<f64>,
    #[serde(deserialize_with = "de_opt_f64")]
    pub max_multiplier: Option<f64>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub online_players: Option<u32>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub bets_count: Option<u32>,
    #[serde(deserialize_with = "de_opt_decimal")]
    pub total_bet_amount: Option<Decimal>,
    #[serde(deserialize_with = "de_opt_decimal")]
    pub total_cashout: Option<Decimal>,
    #[serde(deserialize_with = "de_opt_decimal")]
    pub casino_profit: Option<Decimal>,
}

impl Payload for RoundSnapshot {
    const KEYS: &'static [Spellings] = &[
        ROUND_OR_GAME_ID,
        BOOKMAKER_OR_SPACEMAN_ID,
        ("game_state", &["gameState", "state"]),
        ("current_multiplier", &["currentMultiplier"]),
        ("max_multiplier", &["maxMultiplier"]),
        ("online_players", &["onlinePlayers", "online_player"]),
        ("bets_count", &["betsCount"]),
        ("total_bet_amount", &["totalBetAmount"]),
        ("total_cashout", &["totalCashout", "totalCashOut"]),
        ("casino_profit", &["casinoProfit"]),
    ];
}

impl RoundSnapshot {
    /// `default_phase` applies when the snapshot has no recognisable state tag.
    #[must_use]
    pub fn into_update(self, default_phase: RoundState) -> RoundUpdate {
        RoundUpdate {
            round_id: self.round_id,
            phase: Some(phase(&self.game_state).unwrap_or(default_phase)),
            current_multiplier: self.current_multiplier,
            max_multiplier: self.max_multiplier,
            online_players: self.online_players,
            bets_count: self.bets_count,
            total_bet_amount: self.total_bet_amount,
            total_cashout: self.total_cashout,
            casino_profit: self.casino_profit,
        }
    }
}

/// Live multiplier tick (`multiplier`, `liveMultiplier`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MultiplierTick {
    #[serde(deserialize_with = "de_opt_f64")]
    pub current_multiplier: Option<f64>,
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
}

impl Payload for MultiplierTick {
    const KEYS: &'static [Spellings] = &[
        ("current_multiplier", &["currentMultiplier", "multiplier", "x"]),
        BOOKMAKER_OR_SPACEMAN_ID,
    ];
}

impl MultiplierTick {
    /// Bare numeric payloads are accepted as the multiplier itself.
    #[must_use]
    pub fn from_payload(event: &str, payload: &Value) -> Self {
        match payload {
            Value::Object(_) => decode(event, payload).unwrap_or_default(),
            other => Self {
                current_multiplier: Some(lenient::number(other)),
                bookmaker_id: None,
            },
        }
    }

    #[must_use]
    pub fn into_update(self) -> RoundUpdate {
        RoundUpdate {
            phase: Some(RoundState::Running),
            current_multiplier: Some(self.current_multiplier.unwrap_or(0.0)),
            ..RoundUpdate::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoundStart {
    #[serde(rename = "roundId", deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
}

impl Payload for RoundStart {
    const KEYS: &'static [Spellings] = &[ROUND_ID, BOOKMAKER_ID];
}

// =============================================================================
// History snapshots
// =============================================================================

/// `history` (`{bookmakerId?, rounds: [...]}`) and roulette `latestHistory`
/// (`{bookmakerId, history: [...]}`).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HistorySnapshot {
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    pub rounds: Option<Vec<Value>>,
}

impl Payload for HistorySnapshot {
    const KEYS: &'static [Spellings] = &[BOOKMAKER_ID, ("rounds", &["history"])];
}

/// Multiplier history entry; snake and camel casings both occur, sometimes together.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MultiplierEntry {
    #[serde(deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    #[serde(deserialize_with = "de_opt_text")]
    pub id: Option<String>,
    #[serde(deserialize_with = "de_f64")]
    pub max_multiplier: f64,
    #[serde(deserialize_with = "de_opt_decimal")]
    pub total_bet_amount: Option<Decimal>,
    #[serde(deserialize_with = "de_opt_decimal")]
    pub total_cashout: Option<Decimal>,
    #[serde(deserialize_with = "de_opt_decimal")]
    pub casino_profit: Option<Decimal>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub bets_count: Option<u32>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub online_players: Option<u32>,
    #[serde(deserialize_with = "de_opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Payload for MultiplierEntry {
    const KEYS: &'static [Spellings] = &[
        ROUND_OR_GAME_ID,
        ("max_multiplier", &["maxMultiplier"]),
        ("total_bet_amount", &["totalBetAmount"]),
        ("total_cashout", &["totalCashout", "totalCashOut"]),
        ("casino_profit", &["casinoProfit"]),
        ("bets_count", &["betsCount"]),
        ("online_players", &["onlinePlayers", "online_player"]),
        ("created_at", &["createdAt", "timestamp"]),
    ];
}

impl MultiplierEntry {
    /// `None` when the entry has no usable round identifier, or when its
    /// multiplier is missing, unparsable or below 1.0 (no round crashes
    /// below its starting multiplier).
    #[must_use]
    pub fn into_settled(self, scope: Scope) -> Option<SettledRound> {
        let round_id = self.round_id.or(self.id)?;
        if self.max_multiplier < 1.0 {
            return None;
        }
        let total_bet_amount = self.total_bet_amount.unwrap_or_default();
        let total_cashout = self.total_cashout.unwrap_or_default();
        let aggregates = Aggregates {
            online_players: self.online_players.unwrap_or_default(),
            bets_count: self.bets_count.unwrap_or_default(),
            total_bet_amount,
            total_cashout,
            casino_profit: self.casino_profit.unwrap_or(total_bet_amount - total_cashout),
        };
        Some(SettledRound::multiplier(
            round_id,
            scope,
            self.max_multiplier,
            Some(aggregates),
            self.created_at.unwrap_or_else(Utc::now),
        ))
    }
}

/// Roulette spin, from `newRound` or a `history` entry.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpinEntry {
    #[serde(rename = "roundId", deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub number: Option<u32>,
    #[serde(deserialize_with = "de_opt_text")]
    pub color: Option<String>,
    #[serde(deserialize_with = "de_opt_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Payload for SpinEntry {
    const KEYS: &'static [Spellings] = &[
        ROUND_ID,
        BOOKMAKER_ID,
        ("timestamp", &["createdAt", "created_at"]),
    ];
}

impl SpinEntry {
    /// `None` without a round identifier or with a number off the wheel.
    #[must_use]
    pub fn into_settled(self, scope: Scope) -> Option<SettledRound> {
        let round_id = self.round_id?;
        let number = u8::try_from(self.number.unwrap_or(0)).ok().filter(|n| *n <= 36)?;
        let color = RouletteColor::resolve(number, self.color.as_deref());
        Some(SettledRound::spin(
            round_id,
            scope,
            number,
            color,
            self.timestamp.unwrap_or_else(Utc::now),
        ))
    }
}

/// `spaceman_joined`: `{data: {latestRounds, connectionStatus}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpacemanJoined {
    pub data: Value,
}

impl Payload for SpacemanJoined {}

impl SpacemanJoined {
    /// The inner `data` object; an absent one reads as empty.
    ///
    /// # Errors
    /// Returns [`DecodeError::Payload`] when `data` is not an object.
    pub fn into_data(self) -> Result<SpacemanJoinedData, DecodeError> {
        if self.data.is_null() {
            return Ok(SpacemanJoinedData::default());
        }
        decode("spaceman_joined", &self.data)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SpacemanJoinedData {
    #[serde(rename = "latestRounds")]
    pub latest_rounds: Option<Vec<Value>>,
    #[serde(rename = "connectionStatus")]
    pub connection_status: Option<Value>,
}

impl Payload for SpacemanJoinedData {
    const KEYS: &'static [Spellings] = &[
        ("latestRounds", &["latest_rounds"]),
        ("connectionStatus", &["connection_status"]),
    ];
}

/// `latest_rounds`: `{success, data: [...]}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LatestRounds {
    pub success: Value,
    pub data: Option<Vec<Value>>,
}

impl Payload for LatestRounds {}

impl LatestRounds {
    /// Rounds of a successful response.
    #[must_use]
    pub fn rounds(self) -> Option<Vec<Value>> {
        if self.success == Value::Bool(true) {
            self.data
        } else {
            None
        }
    }
}

// =============================================================================
// Service health
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedStatus {
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConnectionEntry {
    multiplier: Option<FeedStatus>,
    finance: Option<FeedStatus>,
}

impl ConnectionEntry {
    fn connected(&self) -> u8 {
        [&self.multiplier, &self.finance]
            .into_iter()
            .flatten()
            .filter(|f| {
                f.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("CONNECTED"))
            })
            .fold(0, |n, _| n + 1)
    }

    fn is_empty(&self) -> bool {
        self.multiplier.is_none() && self.finance.is_none()
    }
}

/// Reads `{multiplier: {status}, finance: {status}}`, either directly or keyed
/// by spaceman id. The entry for `own` is preferred, else the first one.
#[must_use]
pub fn connection_status(payload: &Value, own: BookmakerId) -> Option<ServiceStatus> {
    let data = payload.get("data").filter(|d| d.is_object()).unwrap_or(payload);
    let object = data.as_object()?;

    let direct = ConnectionEntry::deserialize(data).unwrap_or_default();
    if !direct.is_empty() {
        return Some(ServiceStatus::from_connected(direct.connected()));
    }

    let value = object.get(&own.to_string()).or_else(|| object.values().next())?;
    let entry = ConnectionEntry::deserialize(value).ok()?;
    Some(ServiceStatus::from_connected(entry.connected()))
}

/// `service_status` as pushed by the backend.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServiceStatusPayload {
    #[serde(deserialize_with = "de_opt_u32")]
    pub active_connections: Option<u32>,
    pub service_health: Option<String>,
}

impl Payload for ServiceStatusPayload {
    const KEYS: &'static [Spellings] = &[
        ("active_connections", &["activeConnections"]),
        ("service_health", &["serviceHealth"]),
    ];
}

impl ServiceStatusPayload {
    #[must_use]
    pub fn into_status(self) -> Option<ServiceStatus> {
        let connected = match (self.active_connections, self.service_health.as_deref()) {
            (Some(n), _) => u8::try_from(n.min(2)).unwrap_or(2),
            (None, Some(h)) if h.eq_ignore_ascii_case("healthy") => 2,
            (None, Some(h)) if h.eq_ignore_ascii_case("warning") => 1,
            (None, Some(_)) => 0,
            (None, None) => return None,
        };
        Some(ServiceStatus::from_connected(connected))
    }
}

// =============================================================================
// Predictions and acknowledgements
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MultiplierPrediction {
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    #[serde(deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    #[serde(deserialize_with = "de_f64")]
    pub prediction: f64,
    #[serde(deserialize_with = "de_f64")]
    pub score: f64,
    #[serde(deserialize_with = "de_f64")]
    pub confidence: f64,
    #[serde(deserialize_with = "de_f64")]
    pub casino_mood: f64,
    pub features_used: Value,
    pub apostar: Value,
}

impl Payload for MultiplierPrediction {
    const KEYS: &'static [Spellings] = &[
        BOOKMAKER_OR_SPACEMAN_ID,
        ("round_id", &["roundId"]),
        ("casino_mood", &["casinoMood"]),
        ("features_used", &["featuresUsed"]),
        ("apostar", &["bet"]),
    ];
}

impl MultiplierPrediction {
    /// `score_cap` bounds the score for games that grade on a fixed scale.
    #[must_use]
    pub fn into_hint(self, score_cap: Option<f64>) -> MultiplierHint {
        let score = score_cap.map_or(self.score, |cap| self.score.min(cap));
        MultiplierHint {
            round_id: self.round_id,
            prediction: self.prediction,
            score,
            confidence: self.confidence,
            casino_mood: self.casino_mood,
            features_used: texts(&self.features_used),
            bet: bet_advice(&self.apostar),
        }
    }
}

/// Items of an array rendered as text; anything else is empty.
fn texts(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(lenient::text).collect())
        .unwrap_or_default()
}

/// "SI"/"SÍ" and "NO" (any case), or a boolean.
fn bet_advice(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_uppercase().as_str() {
            "SI" | "SÍ" | "YES" => Some(true),
            "NO" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoulettePrediction {
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    #[serde(deserialize_with = "de_opt_text")]
    pub round_id: Option<String>,
    pub prediction_type: Option<String>,
    pub predicted_values: Value,
    #[serde(deserialize_with = "de_f64")]
    pub probability: f64,
}

impl Payload for RoulettePrediction {
    const KEYS: &'static [Spellings] = &[
        BOOKMAKER_ID,
        ("round_id", &["roundId"]),
        ("prediction_type", &["predictionType"]),
        ("predicted_values", &["predictedValues"]),
    ];
}

impl RoulettePrediction {
    #[must_use]
    pub fn into_hint(self) -> RouletteHint {
        RouletteHint {
            bookmaker_id: self.bookmaker_id,
            round_id: self.round_id,
            prediction_type: self.prediction_type.unwrap_or_default(),
            predicted_values: texts(&self.predicted_values),
            probability: self.probability,
        }
    }
}

/// `predictionData` and `predictionUpdate` on the roulette namespace:
/// `{bookmakerId, number, data: {nextNumbers, percentages}}`, where `number`
/// is the count of recent spins the forecast was computed over.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WheelPrediction {
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub number: Option<u32>,
    pub data: Value,
}

impl Payload for WheelPrediction {
    const KEYS: &'static [Spellings] = &[BOOKMAKER_ID];
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WheelPredictionData {
    #[serde(rename = "nextNumbers")]
    next_numbers: Vec<Value>,
    percentages: Value,
}

impl Payload for WheelPredictionData {
    const KEYS: &'static [Spellings] = &[("nextNumbers", &["next_numbers"])];
}

impl WheelPrediction {
    /// Numbers off the wheel are skipped; percentages arrive as strings or numbers.
    #[must_use]
    pub fn into_forecast(self) -> WheelForecast {
        let data: WheelPredictionData =
            decode("predictionData", &self.data).unwrap_or_default();

        let next_numbers = data
            .next_numbers
            .iter()
            .filter_map(|entry| match entry {
                Value::Object(_) => entry.get("number"),
                other => Some(other),
            })
            .filter(|n| !n.is_null())
            .filter_map(|n| u8::try_from(lenient::count(n)).ok())
            .filter(|n| *n <= 36)
            .collect();

        let mut percentages = BTreeMap::new();
        let mut total_occurrences = 0;
        if let Some(groups) = data.percentages.as_object() {
            for (group, buckets) in groups {
                match buckets {
                    Value::Object(buckets) => {
                        let buckets: BTreeMap<String, f64> = buckets
                            .iter()
                            .map(|(bucket, pct)| (bucket.clone(), lenient::number(pct)))
                            .collect();
                        percentages.insert(group.clone(), buckets);
                    }
                    total if group == "totalOccurrences" || group == "total_occurrences" => {
                        total_occurrences = lenient::count(total);
                    }
                    _ => {}
                }
            }
        }

        WheelForecast {
            bookmaker_id: self.bookmaker_id,
            window: self.number.unwrap_or_default(),
            next_numbers,
            percentages,
            total_occurrences,
        }
    }
}

/// `subscribedPrediction`: `{bookmakerId, number, success}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PredictionSubscription {
    #[serde(rename = "bookmakerId", deserialize_with = "de_opt_bookmaker")]
    pub bookmaker_id: Option<BookmakerId>,
    #[serde(deserialize_with = "de_opt_u32")]
    pub number: Option<u32>,
    pub success: Value,
}

impl Payload for PredictionSubscription {
    const KEYS: &'static [Spellings] = &[BOOKMAKER_ID];
}

impl PredictionSubscription {
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.success == Value::Bool(true)
    }
}

/// Bookmaker named by an acknowledgement: a bare id or `{bookmakerId}`.
#[must_use]
pub fn acked_bookmaker(payload: &Value) -> Option<BookmakerId> {
    lenient::bookmaker(payload).or_else(|| {
        ["bookmakerId", "bookmaker_id", "spacemanId"]
            .iter()
            .find_map(|key| payload.get(key).and_then(lenient::bookmaker))
    })
}

/// Text of an `error` event: a bare string or `{message}`.
#[must_use]
pub fn error_message(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(|| other.to_string(), str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casino_feed_core::{GameType, ServiceHealth};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn scope(game: GameType) -> Scope {
        Scope::new(game, BookmakerId(5))
    }

    #[test]
    fn test_raw_frame_structure() {
        let frame: RawFrame = decode(
            "aviator_raw",
            &json!({"bookmakerId": 5, "data": {"p": {"c": "x", "p": {"x": 1.42}}}}),
        )
        .unwrap();
        assert_eq!(frame.bookmaker_id, Some(BookmakerId(5)));
        let command = frame.data.p.unwrap();
        assert_eq!(command.c.as_deref(), Some("x"));
        let update = decode::<RawTick>("x", &command.p).unwrap().into_update().unwrap();
        assert_eq!(update.current_multiplier, Some(1.42));
        assert_eq!(update.phase, Some(RoundState::Running));
    }

    #[test]
    fn test_state_change_codes() {
        let change: RawStateChange =
            decode("changeState", &json!({"state": 3, "roundId": 77})).unwrap();
        let update = change.into_update();
        assert_eq!(update.phase, Some(RoundState::Settled));
        assert_eq!(update.round_id.as_deref(), Some("77"));

        let change: RawStateChange = decode("changeState", &json!({"state": 42})).unwrap();
        assert_eq!(change.into_update().phase, Some(RoundState::Betting));
    }

    #[test]
    fn test_current_bets_sums_and_counts_unique_players() {
        let bets: RawBets = decode(
            "updateCurrentBets",
            &json!({
                "betsCount": 3,
                "bets": [
                    {"bet": 10, "player_id": "a"},
                    {"bet": "2.5", "player_id": "b"},
                    {"bet": 7.5, "player_id": "a"}
                ],
                "activePlayersCount": 99
            }),
        )
        .unwrap();
        let update = bets.into_update().unwrap();
        assert_eq!(update.bets_count, Some(3));
        assert_eq!(update.total_bet_amount, Some(dec!(20.0)));
        assert_eq!(update.online_players, Some(2));
    }

    #[test]
    fn test_current_bets_falls_back_to_active_players() {
        let bets: RawBets =
            decode("updateCurrentBets", &json!({"betsCount": 0, "activePlayersCount": 14}))
                .unwrap();
        assert_eq!(bets.into_update().unwrap().online_players, Some(14));

        let bets: RawBets = decode("updateCurrentBets", &json!({"bets": []})).unwrap();
        assert!(bets.into_update().is_none());
    }

    #[test]
    fn test_round_snapshot_aliases() {
        let snapshot: RoundSnapshot = decode(
            "round",
            &json!({
                "game_id": "sp-9",
                "online_player": "120",
                "bets_count": 45,
                "total_bet_amount": "300.50",
                "total_cashout": 100,
                "max_multiplier": "0",
                "game_state": "Run"
            }),
        )
        .unwrap();
        let update = snapshot.into_update(RoundState::Betting);
        assert_eq!(update.round_id.as_deref(), Some("sp-9"));
        assert_eq!(update.phase, Some(RoundState::Running));
        assert_eq!(update.online_players, Some(120));
        assert_eq!(update.total_bet_amount, Some(dec!(300.50)));
        assert_eq!(update.max_multiplier, Some(0.0));
        assert_eq!(update.casino_profit, None);
    }

    #[test]
    fn test_multiplier_entry_aliases_and_profit() {
        let entry: MultiplierEntry = decode(
            "history",
            &json!({
                "roundId": "r-1",
                "maxMultiplier": "2.35",
                "totalBetAmount": 1000,
                "totalCashout": "640.5",
                "createdAt": "2024-05-01T10:00:00Z"
            }),
        )
        .unwrap();
        let round = entry.into_settled(scope(GameType::Aviator)).unwrap();
        assert_eq!(round.round_id, "r-1");
        assert_eq!(round.max_multiplier(), Some(2.35));
        assert_eq!(round.aggregates.unwrap().casino_profit, dec!(359.5));
    }

    #[test]
    fn test_multiplier_entry_without_id_is_rejected() {
        let entry: MultiplierEntry = decode("history", &json!({"max_multiplier": 3.1})).unwrap();
        assert!(entry.into_settled(scope(GameType::Spaceman)).is_none());
    }

    #[test]
    fn test_spin_entry() {
        let spin: SpinEntry = decode(
            "newRound",
            &json!({"bookmakerId": 5, "roundId": "s-1", "number": 0, "color": "red"}),
        )
        .unwrap();
        let round = spin.into_settled(scope(GameType::Roulette)).unwrap();
        assert_eq!(round.spin_result(), Some((0, RouletteColor::Green)));

        let off_wheel: SpinEntry =
            decode("newRound", &json!({"roundId": "s-2", "number": 37})).unwrap();
        assert!(off_wheel.into_settled(scope(GameType::Roulette)).is_none());
    }

    #[test]
    fn test_connection_status_shapes() {
        let keyed = json!({"data": {"5": {
            "multiplier": {"status": "CONNECTED"},
            "finance": {"status": "DISCONNECTED"}
        }}});
        let status = connection_status(&keyed, BookmakerId(5)).unwrap();
        assert_eq!(status.connected_feeds, 1);
        assert_eq!(status.health, ServiceHealth::Warning);

        let direct =
            json!({"multiplier": {"status": "CONNECTED"}, "finance": {"status": "CONNECTED"}});
        assert_eq!(
            connection_status(&direct, BookmakerId(1)).unwrap().health,
            ServiceHealth::Healthy
        );

        assert!(connection_status(&json!("offline"), BookmakerId(1)).is_none());
    }

    #[test]
    fn test_service_status_payload() {
        let payload: ServiceStatusPayload =
            decode("service_status", &json!({"active_connections": 0})).unwrap();
        assert_eq!(payload.into_status().unwrap().health, ServiceHealth::Error);
        let payload: ServiceStatusPayload =
            decode("service_status", &json!({"serviceHealth": "healthy"})).unwrap();
        assert_eq!(payload.into_status().unwrap().connected_feeds, 2);
        let payload: ServiceStatusPayload = decode("service_status", &json!({})).unwrap();
        assert!(payload.into_status().is_none());
    }

    #[test]
    fn test_multiplier_prediction() {
        let prediction: MultiplierPrediction = decode(
            "prediction",
            &json!({
                "prediction": 2.1,
                "score": 4.5,
                "confidence": "0.8",
                "casino_mood": 0.3,
                "features_used": ["ema", "streak"],
                "apostar": "SÍ",
                "round_id": 991
            }),
        )
        .unwrap();
        let hint = prediction.into_hint(Some(3.0));
        assert_eq!(hint.score, 3.0);
        assert_eq!(hint.confidence, 0.8);
        assert_eq!(hint.bet, Some(true));
        assert_eq!(hint.round_id.as_deref(), Some("991"));
        assert_eq!(hint.features_used, vec!["ema", "streak"]);
    }

    #[test]
    fn test_bet_advice_values() {
        assert_eq!(bet_advice(&json!("no")), Some(false));
        assert_eq!(bet_advice(&json!("si")), Some(true));
        assert_eq!(bet_advice(&json!(false)), Some(false));
        assert_eq!(bet_advice(&json!("maybe")), None);
    }

    #[test]
    fn test_acks_and_errors() {
        assert_eq!(acked_bookmaker(&json!(4)), Some(BookmakerId(4)));
        assert_eq!(acked_bookmaker(&json!({"bookmakerId": "4"})), Some(BookmakerId(4)));
        assert_eq!(
            error_message(&json!({"message": "Bookmaker not found"})),
            "Bookmaker not found"
        );
        assert_eq!(error_message(&json!("boom")), "boom");
    }

    #[test]
    fn test_wrong_shape_is_a_decode_error() {
        let err = decode::<HistorySnapshot>("history", &json!({"rounds": 5})).unwrap_err();
        assert!(err.to_string().contains("history"));
    }

    #[test]
    fn test_multiplier_entry_with_both_casings() {
        let entry: MultiplierEntry = decode(
            "history",
            &json!({
                "round_id": "a",
                "roundId": "a",
                "max_multiplier": 2.5,
                "maxMultiplier": 2.5,
                "createdAt": "2024-05-01T10:00:00Z",
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        )
        .unwrap();
        let round = entry.into_settled(scope(GameType::Aviator)).unwrap();
        assert_eq!(round.round_id, "a");
        assert_eq!(round.max_multiplier(), Some(2.5));
    }

    #[test]
    fn test_round_snapshot_with_game_and_round_id() {
        let snapshot: RoundSnapshot = decode(
            "round",
            &json!({
                "game_id": "g-1",
                "round_id": "g-1",
                "max_multiplier": 2.75,
                "maxMultiplier": null,
                "game_state": "End",
                "state": "Run"
            }),
        )
        .unwrap();
        let update = snapshot.into_update(RoundState::Running);
        assert_eq!(update.round_id.as_deref(), Some("g-1"));
        assert_eq!(update.max_multiplier, Some(2.75));
        assert_eq!(update.phase, Some(RoundState::Settled));
    }

    #[test]
    fn test_multiplier_entry_without_usable_multiplier_is_rejected() {
        for payload in [
            json!({"round_id": "a"}),
            json!({"round_id": "b", "max_multiplier": "oops"}),
            json!({"round_id": "c", "max_multiplier": 0.5}),
        ] {
            let entry: MultiplierEntry = decode("history", &payload).unwrap();
            assert!(entry.into_settled(scope(GameType::Aviator)).is_none(), "{payload}");
        }

        let floor: MultiplierEntry =
            decode("history", &json!({"round_id": "d", "max_multiplier": 1})).unwrap();
        assert!(floor.into_settled(scope(GameType::Aviator)).is_some());
    }

    #[test]
    fn test_raw_bets_with_mixed_player_casings() {
        let bets: RawBets = decode(
            "updateCurrentBets",
            &json!({
                "betsCount": 2,
                "bets_count": 2,
                "bets": [
                    {"bet": 5, "player_id": "a", "playerId": "a"},
                    {"bet": 5, "playerId": "b"},
                    "garbage"
                ]
            }),
        )
        .unwrap();
        let update = bets.into_update().unwrap();
        assert_eq!(update.total_bet_amount, Some(dec!(10)));
        assert_eq!(update.online_players, Some(2));
    }

    #[test]
    fn test_multiplier_tick_shapes() {
        let tick = MultiplierTick::from_payload(
            "liveMultiplier",
            &json!({"multiplier": 1.52, "currentMultiplier": 1.52, "spacemanId": 4}),
        );
        assert_eq!(tick.current_multiplier, Some(1.52));
        assert_eq!(tick.bookmaker_id, Some(BookmakerId(4)));

        let bare = MultiplierTick::from_payload("multiplier", &json!("2.05"));
        assert_eq!(bare.current_multiplier, Some(2.05));
    }

    #[test]
    fn test_spaceman_joined_data() {
        let joined: SpacemanJoined = decode(
            "spaceman_joined",
            &json!({"data": {"latest_rounds": [], "latestRounds": [{"game_id": "g"}]}}),
        )
        .unwrap();
        let data = joined.into_data().unwrap();
        assert_eq!(data.latest_rounds.map(|r| r.len()), Some(1));
        assert!(data.connection_status.is_none());

        let empty: SpacemanJoined = decode("spaceman_joined", &json!({})).unwrap();
        assert!(empty.into_data().unwrap().latest_rounds.is_none());
    }

    #[test]
    fn test_wheel_prediction_forecast() {
        let prediction: WheelPrediction = decode(
            "predictionData",
            &json!({
                "bookmakerId": 5,
                "number": 50,
                "data": {
                    "nextNumbers": [
                        {"id": 1, "number": 17, "color": "black"},
                        {"id": 2, "number": 0, "color": "green"},
                        {"id": 3, "number": 40}
                    ],
                    "percentages": {
                        "colors": {"red": "48.00", "black": "46.00", "green": "6.00"},
                        "dozens": {"zero": "6.00", "first": "30", "second": 34, "third": "30"},
                        "totalOccurrences": 50
                    }
                },
                "timestamp": "2024-05-01T10:00:00Z"
            }),
        )
        .unwrap();
        let forecast = prediction.into_forecast();
        assert_eq!(forecast.bookmaker_id, Some(BookmakerId(5)));
        assert_eq!(forecast.window, 50);
        assert_eq!(forecast.next_numbers, vec![17, 0]);
        assert_eq!(forecast.total_occurrences, 50);
        assert_eq!(forecast.percentages["colors"]["red"], 48.0);
        assert_eq!(forecast.percentages["dozens"]["second"], 34.0);
    }

    #[test]
    fn test_wheel_prediction_without_data() {
        let prediction: WheelPrediction =
            decode("predictionUpdate", &json!({"bookmakerId": 5, "number": 10})).unwrap();
        let forecast = prediction.into_forecast();
        assert!(forecast.next_numbers.is_empty());
        assert!(forecast.percentages.is_empty());
    }

    #[test]
    fn test_prediction_subscription_ack() {
        let ack: PredictionSubscription = decode(
            "subscribedPrediction",
            &json!({"bookmakerId": 5, "number": 20, "success": true}),
        )
        .unwrap();
        assert!(ack.accepted());
        assert_eq!(ack.number, Some(20));

        let rejected: PredictionSubscription =
            decode("subscribedPrediction", &json!({"success": false})).unwrap();
        assert!(!rejected.accepted());
    }
}
