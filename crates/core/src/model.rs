//! Canonical round model shared by every feed component.
//!
//! Bookmakers publish the same game under different field names and shapes;
//! everything downstream of the normalizer only ever sees these types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Numbers paid out as red on a single-zero wheel.
const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

/// Game tracked by a feed. Each game has its own real-time namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Aviator,
    Spaceman,
    Roulette,
}

impl GameType {
    /// Socket namespace the game is served on.
    #[must_use]
    pub const fn namespace(self) -> &'static str {
        match self {
            Self::Aviator => "/aviator",
            Self::Spaceman => "/spaceman",
            Self::Roulette => "/roulette",
        }
    }

    /// Returns true for crash-style games whose outcome is a multiplier.
    #[must_use]
    pub const fn is_multiplier(self) -> bool {
        matches!(self, Self::Aviator | Self::Spaceman)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aviator => "aviator",
            Self::Spaceman => "spaceman",
            Self::Roulette => "roulette",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aviator" => Ok(Self::Aviator),
            "spaceman" => Ok(Self::Spaceman),
            "roulette" | "ruleta" => Ok(Self::Roulette),
            other => Err(format!("unknown game type: {other}")),
        }
    }
}

/// Identifier of a bookmaker (data source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmakerId(pub u32);

impl fmt::Display for BookmakerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One independent subscription/history context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub game: GameType,
    pub bookmaker_id: BookmakerId,
}

impl Scope {
    #[must_use]
    pub const fn new(game: GameType, bookmaker_id: BookmakerId) -> Self {
        Self { game, bookmaker_id }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game, self.bookmaker_id)
    }
}

/// Lifecycle phase of a multiplier round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundState {
    #[default]
    Betting,
    Running,
    Settled,
}

impl RoundState {
    /// Maps the numeric state codes used by raw game feeds (1 bet, 2 run, 3 end, 4 bet).
    #[must_use]
    pub const fn from_code(code: u64) -> Option<Self> {
        match code {
            1 | 4 => Some(Self::Betting),
            2 => Some(Self::Running),
            3 => Some(Self::Settled),
            _ => None,
        }
    }

    /// Maps textual phase tags (`Bet`, `Run`, `End` and long forms).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "bet" | "betting" => Some(Self::Betting),
            "run" | "running" | "flying" => Some(Self::Running),
            "end" | "ended" | "settled" | "crash" | "crashed" => Some(Self::Settled),
            _ => None,
        }
    }
}

/// Per-round betting aggregates of multiplier games.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Aggregates {
    pub online_players: u32,
    pub bets_count: u32,
    pub total_bet_amount: Decimal,
    pub total_cashout: Decimal,
    pub casino_profit: Decimal,
}

impl Aggregates {
    /// House result of the round: everything staked minus everything cashed out.
    #[must_use]
    pub fn computed_profit(&self) -> Decimal {
        self.total_bet_amount - self.total_cashout
    }
}

/// Partial update to the in-progress round. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoundUpdate {
    pub round_id: Option<String>,
    pub phase: Option<RoundState>,
    pub current_multiplier: Option<f64>,
    pub max_multiplier: Option<f64>,
    pub online_players: Option<u32>,
    pub bets_count: Option<u32>,
    pub total_bet_amount: Option<Decimal>,
    pub total_cashout: Option<Decimal>,
    pub casino_profit: Option<Decimal>,
}

impl RoundUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Round currently being played for one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub round_id: Option<String>,
    pub state: RoundState,
    pub current_multiplier: f64,
    pub max_multiplier: f64,
    pub aggregates: Aggregates,
    pub updated_at: DateTime<Utc>,
}

impl Default for Round {
    fn default() -> Self {
        Self {
            round_id: None,
            state: RoundState::Betting,
            current_multiplier: 0.0,
            max_multiplier: 0.0,
            aggregates: Aggregates::default(),
            updated_at: Utc::now(),
        }
    }
}

impl Round {
    /// Applies a partial update.
    ///
    /// The phase is applied first so explicit fields in the same update win:
    /// - `Betting` zeroes the multipliers, the cashout total and the profit
    /// - `Running` only moves the state
    /// - `Settled` fixes the profit as `total_bet_amount - total_cashout` unless the
    ///   update carries its own profit figure
    pub fn apply(&mut self, update: &RoundUpdate) {
        match update.phase {
            Some(RoundState::Betting) => {
                self.state = RoundState::Betting;
                self.current_multiplier = 0.0;
                self.max_multiplier = 0.0;
                self.aggregates.total_cashout = Decimal::ZERO;
                self.aggregates.casino_profit = Decimal::ZERO;
            }
            Some(state) => self.state = state,
            None => {}
        }

        if let Some(id) = update.round_id.as_ref().filter(|id| !id.is_empty()) {
            self.round_id = Some(id.clone());
        }
        if let Some(x) = update.current_multiplier {
            self.current_multiplier = x;
            self.max_multiplier = self.max_multiplier.max(x);
        }
        if let Some(max) = update.max_multiplier {
            self.max_multiplier = max;
        }
        if let Some(players) = update.online_players {
            self.aggregates.online_players = players;
        }
        if let Some(count) = update.bets_count {
            self.aggregates.bets_count = count;
        }
        if let Some(amount) = update.total_bet_amount {
            self.aggregates.total_bet_amount = amount;
        }
        if let Some(cashout) = update.total_cashout {
            self.aggregates.total_cashout = cashout;
        }

        match update.casino_profit {
            Some(profit) => self.aggregates.casino_profit = profit,
            None if update.phase == Some(RoundState::Settled) => {
                self.aggregates.casino_profit = self.aggregates.computed_profit();
            }
            None => {}
        }

        self.updated_at = Utc::now();
    }

    /// Freezes the round into a history entry.
    ///
    /// Returns `None` when the round has no identifier or never produced a
    /// multiplier; such rounds cannot be deduplicated and are not accumulated.
    #[must_use]
    pub fn settle(&self, scope: Scope) -> Option<SettledRound> {
        let round_id = self.round_id.as_ref().filter(|id| !id.is_empty())?;
        if self.max_multiplier < 1.0 {
            return None;
        }
        Some(SettledRound {
            round_id: round_id.clone(),
            scope,
            outcome: Outcome::Multiplier {
                max_multiplier: self.max_multiplier,
            },
            aggregates: Some(self.aggregates.clone()),
            created_at: Utc::now(),
        })
    }
}

/// Colour of a roulette pocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouletteColor {
    Red,
    Black,
    Green,
}

impl RouletteColor {
    /// Colour of a pocket on a single-zero wheel.
    #[must_use]
    pub fn from_number(number: u8) -> Self {
        if number == 0 {
            Self::Green
        } else if RED_NUMBERS.contains(&number) {
            Self::Red
        } else {
            Self::Black
        }
    }

    /// Parses English and Spanish colour names.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "red" | "rojo" => Some(Self::Red),
            "black" | "negro" => Some(Self::Black),
            "green" | "verde" => Some(Self::Green),
            _ => None,
        }
    }

    /// Colour for a spin. Zero is always green; otherwise the reported name is
    /// trusted and the wheel layout fills in when it is missing or unknown.
    #[must_use]
    pub fn resolve(number: u8, reported: Option<&str>) -> Self {
        if number == 0 {
            return Self::Green;
        }
        reported
            .and_then(Self::parse)
            .unwrap_or_else(|| Self::from_number(number))
    }
}

/// Game-specific result of a settled round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Multiplier { max_multiplier: f64 },
    Roulette { number: u8, color: RouletteColor },
}

/// Immutable history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledRound {
    pub round_id: String,
    pub scope: Scope,
    pub outcome: Outcome,
    pub aggregates: Option<Aggregates>,
    pub created_at: DateTime<Utc>,
}

impl SettledRound {
    #[must_use]
    pub fn multiplier(
        round_id: impl Into<String>,
        scope: Scope,
        max_multiplier: f64,
        aggregates: Option<Aggregates>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            round_id: round_id.into(),
            scope,
            outcome: Outcome::Multiplier { max_multiplier },
            aggregates,
            created_at,
        }
    }

    #[must_use]
    pub fn spin(
        round_id: impl Into<String>,
        scope: Scope,
        number: u8,
        color: RouletteColor,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            round_id: round_id.into(),
            scope,
            outcome: Outcome::Roulette { number, color },
            aggregates: None,
            created_at,
        }
    }

    #[must_use]
    pub const fn max_multiplier(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Multiplier { max_multiplier } => Some(max_multiplier),
            Outcome::Roulette { .. } => None,
        }
    }

    #[must_use]
    pub const fn spin_result(&self) -> Option<(u8, RouletteColor)> {
        match self.outcome {
            Outcome::Roulette { number, color } => Some((number, color)),
            Outcome::Multiplier { .. } => None,
        }
    }
}

/// Prediction pushed by the backend for a multiplier game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplierHint {
    pub round_id: Option<String>,
    pub prediction: f64,
    pub score: f64,
    pub confidence: f64,
    pub casino_mood: f64,
    pub features_used: Vec<String>,
    /// `Some(true)` when the backend recommends betting this round.
    pub bet: Option<bool>,
}

/// Prediction annotation for a roulette table, correlated by bookmaker and round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouletteHint {
    pub bookmaker_id: Option<BookmakerId>,
    pub round_id: Option<String>,
    pub prediction_type: String,
    pub predicted_values: Vec<String>,
    pub probability: f64,
}

/// Outlook for the next spins of a roulette table, computed by the backend
/// over its last `window` spins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelForecast {
    pub bookmaker_id: Option<BookmakerId>,
    pub window: u32,
    pub next_numbers: Vec<u8>,
    /// Percent per group (`colors`, `dozens`, `columns`, `ranges`), then per bucket.
    pub percentages: BTreeMap<String, BTreeMap<String, f64>>,
    pub total_occurrences: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    Multiplier(MultiplierHint),
    Roulette(RouletteHint),
    Wheel(WheelForecast),
}

impl Prediction {
    /// Round the prediction targets. Wheel forecasts span several spins and have none.
    #[must_use]
    pub fn round_id(&self) -> Option<&str> {
        match self {
            Self::Multiplier(hint) => hint.round_id.as_deref(),
            Self::Roulette(hint) => hint.round_id.as_deref(),
            Self::Wheel(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceHealth {
    Healthy,
    Warning,
    Error,
}

/// Health of the upstream bookmaker connections behind a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub connected_feeds: u8,
    pub health: ServiceHealth,
    pub updated_at: DateTime<Utc>,
}

impl ServiceStatus {
    /// Builds the status from the number of upstream feeds (multiplier, finance)
    /// reported connected.
    #[must_use]
    pub fn from_connected(connected_feeds: u8) -> Self {
        let health = match connected_feeds {
            0 => ServiceHealth::Error,
            1 => ServiceHealth::Warning,
            _ => ServiceHealth::Healthy,
        };
        Self {
            connected_feeds,
            health,
            updated_at: Utc::now(),
        }
    }
}
