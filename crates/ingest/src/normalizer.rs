//! Turns inbound server events into canonical round changes for one scope.

use crate::decode::{
    acked_bookmaker, connection_status, decode, error_message, ChartInfo, DecodeError,
    HistorySnapshot, LatestRounds, MultiplierEntry, MultiplierPrediction, MultiplierTick,
    PredictionSubscription, RawBets, RawCashOuts, RawCommand, RawFrame, RawStateChange, RawTick,
    RoulettePrediction, RoundSnapshot, RoundStart, ServiceStatusPayload, SpacemanJoined,
    SpinEntry, WheelPrediction,
};
use casino_feed_core::{
    BookmakerId, GameType, Prediction, Round, RoundState, RoundUpdate, Scope, ServerEvent,
    ServiceStatus, SettledRound,
};
use serde_json::Value;
use tracing::{debug, trace};

/// Spaceman grades predictions on a 0-3 scale.
const SPACEMAN_SCORE_CAP: f64 = 3.0;

/// Server acknowledgement of a client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Joined(Option<BookmakerId>),
    Left(Option<BookmakerId>),
    /// Roulette forecasts will be pushed for this bookmaker over `window` spins.
    PredictionSubscribed {
        bookmaker_id: Option<BookmakerId>,
        window: Option<u32>,
    },
}

/// One canonical change produced from an inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Partial update, already applied to [`Normalizer::round`].
    Update(RoundUpdate),
    /// Finished round ready for accumulation.
    Settled(SettledRound),
    /// Bulk history, most recent first, replacing the accumulated window.
    Snapshot(Vec<SettledRound>),
    Prediction(Prediction),
    Service(ServiceStatus),
    Ack(Ack),
    ServerError(String),
}

/// Per-scope event normalizer. Owns the round currently in progress.
#[derive(Debug, Clone)]
pub struct Normalizer {
    scope: Scope,
    round: Round,
}

impl Normalizer {
    #[must_use]
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            round: Round::default(),
        }
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Round currently being played.
    #[must_use]
    pub const fn round(&self) -> &Round {
        &self.round
    }

    pub fn reset(&mut self) {
        self.round = Round::default();
    }

    /// Normalizes one event.
    ///
    /// Events for other bookmakers, unknown event names and undecodable
    /// payloads yield nothing.
    pub fn normalize(&mut self, event: &ServerEvent) -> Vec<Normalized> {
        let mut out = Vec::new();
        let result = match self.scope.game {
            GameType::Aviator => self.aviator(event, &mut out),
            GameType::Spaceman => self.spaceman(event, &mut out),
            GameType::Roulette => self.roulette(event, &mut out),
        };
        if let Err(e) = result {
            debug!(scope = %self.scope, error = %e, "Dropping malformed payload");
        }
        out
    }

    // =========================================================================
    // Per-game dispatch
    // =========================================================================

    fn aviator(
        &mut self,
        event: &ServerEvent,
        out: &mut Vec<Normalized>,
    ) -> Result<(), DecodeError> {
        let payload = &event.payload;
        match event.name.as_str() {
            "aviator_raw" => {
                let frame: RawFrame = decode(&event.name, payload)?;
                if let (true, Some(command)) = (self.in_scope(frame.bookmaker_id), frame.data.p) {
                    self.raw_command(command, out)?;
                }
            }
            "round" => {
                let snapshot: RoundSnapshot = decode(&event.name, payload)?;
                if self.in_scope(snapshot.bookmaker_id) {
                    self.push_update(snapshot.into_update(RoundState::Betting), out);
                }
            }
            "multiplier" => self.tick(&event.name, payload, out),
            "roundStart" => {
                let start: RoundStart = decode(&event.name, payload)?;
                if self.in_scope(start.bookmaker_id) {
                    self.push_update(
                        RoundUpdate {
                            phase: Some(RoundState::Betting),
                            round_id: start.round_id,
                            ..RoundUpdate::default()
                        },
                        out,
                    );
                }
            }
            "roundChartInfo" => {
                let info: ChartInfo = decode(&event.name, payload)?;
                if self.in_scope(info.bookmaker_id) {
                    if let Some(update) = info.into_update() {
                        self.push_update(update, out);
                    }
                }
            }
            "history" => self.history(event, out)?,
            "prediction" => self.multiplier_prediction(event, None, out)?,
            _ => self.common(event, out),
        }
        Ok(())
    }

    fn spaceman(
        &mut self,
        event: &ServerEvent,
        out: &mut Vec<Normalized>,
    ) -> Result<(), DecodeError> {
        let payload = &event.payload;
        match event.name.as_str() {
            "spaceman_joined" => {
                let joined: SpacemanJoined = decode(&event.name, payload)?;
                let data = joined.into_data()?;
                if let Some(entries) = data.latest_rounds {
                    out.push(Normalized::Snapshot(self.settled_entries(entries)));
                }
                if let Some(status) = data
                    .connection_status
                    .and_then(|s| connection_status(&s, self.scope.bookmaker_id))
                {
                    out.push(Normalized::Service(status));
                }
            }
            "latest_rounds" => {
                let latest: LatestRounds = decode(&event.name, payload)?;
                if let Some(entries) = latest.rounds() {
                    out.push(Normalized::Snapshot(self.settled_entries(entries)));
                }
            }
            "liveMultiplier" => self.tick(&event.name, payload, out),
            "round" => {
                let snapshot: RoundSnapshot = decode(&event.name, payload)?;
                if !self.in_scope(snapshot.bookmaker_id) {
                    return Ok(());
                }
                // A snapshot carrying the final multiplier and the game id closes the round.
                let closes = snapshot.max_multiplier.is_some_and(|m| m > 0.0)
                    && snapshot.round_id.is_some();
                let mut update = snapshot.into_update(RoundState::Running);
                if closes {
                    update.phase = Some(RoundState::Settled);
                }
                self.push_update(update, out);
            }
            "service_status" => {
                let status: ServiceStatusPayload = decode(&event.name, payload)?;
                if let Some(status) = status.into_status() {
                    out.push(Normalized::Service(status));
                }
            }
            "connections_status" => {
                if let Some(status) = connection_status(payload, self.scope.bookmaker_id) {
                    out.push(Normalized::Service(status));
                }
            }
            "prediction" => self.multiplier_prediction(event, Some(SPACEMAN_SCORE_CAP), out)?,
            _ => self.common(event, out),
        }
        Ok(())
    }

    fn roulette(
        &mut self,
        event: &ServerEvent,
        out: &mut Vec<Normalized>,
    ) -> Result<(), DecodeError> {
        match event.name.as_str() {
            "history" | "latestHistory" => self.history(event, out)?,
            "newRound" => {
                let spin: SpinEntry = decode(&event.name, &event.payload)?;
                if !self.in_scope(spin.bookmaker_id) {
                    return Ok(());
                }
                match spin.into_settled(self.scope) {
                    Some(round) => out.push(Normalized::Settled(round)),
                    None => debug!(scope = %self.scope, "Dropping spin without id or valid number"),
                }
            }
            "prediction" => {
                let prediction: RoulettePrediction = decode(&event.name, &event.payload)?;
                if self.in_scope(prediction.bookmaker_id) {
                    out.push(Normalized::Prediction(Prediction::Roulette(prediction.into_hint())));
                }
            }
            "predictionData" | "predictionUpdate" => {
                let prediction: WheelPrediction = decode(&event.name, &event.payload)?;
                if self.in_scope(prediction.bookmaker_id) {
                    let forecast = prediction.into_forecast();
                    out.push(Normalized::Prediction(Prediction::Wheel(forecast)));
                }
            }
            "subscribedPrediction" => {
                let ack: PredictionSubscription = decode(&event.name, &event.payload)?;
                if !ack.accepted() {
                    debug!(scope = %self.scope, "Prediction subscription not accepted");
                } else if self.in_scope(ack.bookmaker_id) {
                    out.push(Normalized::Ack(Ack::PredictionSubscribed {
                        bookmaker_id: ack.bookmaker_id,
                        window: ack.number,
                    }));
                }
            }
            "predictionError" | "historyError" => {
                out.push(Normalized::ServerError(error_message(&event.payload)));
            }
            _ => self.common(event, out),
        }
        Ok(())
    }

    /// Events every namespace shares.
    fn common(&self, event: &ServerEvent, out: &mut Vec<Normalized>) {
        match event.name.as_str() {
            "joinedBookmaker" | "joined_bookmaker" => {
                out.push(Normalized::Ack(Ack::Joined(acked_bookmaker(&event.payload))));
            }
            "leftBookmaker" | "left_bookmaker" => {
                out.push(Normalized::Ack(Ack::Left(acked_bookmaker(&event.payload))));
            }
            "error" => out.push(Normalized::ServerError(error_message(&event.payload))),
            other => trace!(scope = %self.scope, event = other, "Ignoring unrecognised event"),
        }
    }

    // =========================================================================
    // Shared handlers
    // =========================================================================

    fn raw_command(
        &mut self,
        command: RawCommand,
        out: &mut Vec<Normalized>,
    ) -> Result<(), DecodeError> {
        let Some(name) = command.c else {
            return Ok(());
        };
        let payload = &command.p;
        match name.as_str() {
            "x" => {
                if let Some(update) = decode::<RawTick>(&name, payload)?.into_update() {
                    self.push_update(update, out);
                }
            }
            "changeState" => {
                let update = decode::<RawStateChange>(&name, payload)?.into_update();
                self.push_update(update, out);
            }
            "updateCurrentBets" => {
                // Bets only move while the round is taking them.
                if self.round.state == RoundState::Betting {
                    if let Some(update) = decode::<RawBets>(&name, payload)?.into_update() {
                        self.push_update(update, out);
                    }
                }
            }
            "updateCurrentCashOuts" => {
                let cashouts: RawCashOuts = decode(&name, payload)?;
                if let Some(total) = cashouts.total_cash_out {
                    self.push_update(
                        RoundUpdate {
                            total_cashout: Some(total),
                            ..RoundUpdate::default()
                        },
                        out,
                    );
                }
            }
            "roundChartInfo" => {
                if let Some(update) = decode::<ChartInfo>(&name, payload)?.into_update() {
                    self.push_update(update, out);
                }
            }
            other => trace!(scope = %self.scope, command = other, "Ignoring raw command"),
        }
        Ok(())
    }

    fn tick(&mut self, event: &str, payload: &Value, out: &mut Vec<Normalized>) {
        let tick = MultiplierTick::from_payload(event, payload);
        if self.in_scope(tick.bookmaker_id) {
            self.push_update(tick.into_update(), out);
        }
    }

    fn history(&self, event: &ServerEvent, out: &mut Vec<Normalized>) -> Result<(), DecodeError> {
        let snapshot: HistorySnapshot = decode(&event.name, &event.payload)?;
        if !self.in_scope(snapshot.bookmaker_id) {
            return Ok(());
        }
        if let Some(entries) = snapshot.rounds {
            out.push(Normalized::Snapshot(self.settled_entries(entries)));
        }
        Ok(())
    }

    fn multiplier_prediction(
        &self,
        event: &ServerEvent,
        score_cap: Option<f64>,
        out: &mut Vec<Normalized>,
    ) -> Result<(), DecodeError> {
        let prediction: MultiplierPrediction = decode(&event.name, &event.payload)?;
        if self.in_scope(prediction.bookmaker_id) {
            let hint = prediction.into_hint(score_cap);
            out.push(Normalized::Prediction(Prediction::Multiplier(hint)));
        }
        Ok(())
    }

    /// Decodes history entries, dropping those that cannot be identified.
    fn settled_entries(&self, entries: Vec<Value>) -> Vec<SettledRound> {
        let total = entries.len();
        let rounds: Vec<SettledRound> = entries
            .into_iter()
            .filter_map(|entry| {
                if self.scope.game.is_multiplier() {
                    decode::<MultiplierEntry>("history", &entry)
                        .ok()
                        .and_then(|e| e.into_settled(self.scope))
                } else {
                    decode::<SpinEntry>("history", &entry)
                        .ok()
                        .filter(|spin| self.in_scope(spin.bookmaker_id))
                        .and_then(|spin| spin.into_settled(self.scope))
                }
            })
            .collect();
        if rounds.len() < total {
            debug!(
                scope = %self.scope,
                dropped = total - rounds.len(),
                "Dropped unusable history entries"
            );
        }
        rounds
    }

    /// Applies an update to the live round, emitting settlements it implies.
    fn push_update(&mut self, update: RoundUpdate, out: &mut Vec<Normalized>) {
        if update.is_empty() {
            return;
        }

        // A new betting phase closes a round whose settlement never arrived.
        if update.phase == Some(RoundState::Betting) && self.round.state == RoundState::Running {
            if let Some(settled) = self.round.settle(self.scope) {
                debug!(
                    scope = %self.scope,
                    round_id = %settled.round_id,
                    "Betting phase closed unsettled round"
                );
                out.push(Normalized::Settled(settled));
            }
        }

        self.round.apply(&update);
        let settles = update.phase == Some(RoundState::Settled);
        out.push(Normalized::Update(update));

        if settles {
            match self.round.settle(self.scope) {
                Some(settled) => out.push(Normalized::Settled(settled)),
                None => debug!(scope = %self.scope, "Dropping settlement without id or multiplier"),
            }
        }
    }

    /// Events tagged with another bookmaker are multiplexing noise.
    fn in_scope(&self, bookmaker_id: Option<BookmakerId>) -> bool {
        match bookmaker_id {
            Some(id) if id != self.scope.bookmaker_id => {
                trace!(scope = %self.scope, other = %id, "Skipping event for another bookmaker");
                false
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casino_feed_core::{RouletteColor, ServiceHealth};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn normalizer(game: GameType) -> Normalizer {
        Normalizer::new(Scope::new(game, BookmakerId(7)))
    }

    fn raw(command: &str, payload: Value) -> ServerEvent {
        ServerEvent::new(
            "aviator_raw",
            json!({"bookmakerId": 7, "data": {"p": {"c": command, "p": payload}}}),
        )
    }

    fn settled(out: &[Normalized]) -> Vec<&SettledRound> {
        out.iter()
            .filter_map(|n| match n {
                Normalized::Settled(round) => Some(round),
                _ => None,
            })
            .collect()
    }

    // =========================================================================
    // Aviator
    // =========================================================================

    #[test]
    fn test_aviator_raw_round_lifecycle() {
        let mut n = normalizer(GameType::Aviator);

        n.normalize(&raw("changeState", json!({"state": 1, "roundId": "r-1"})));
        n.normalize(&raw(
            "updateCurrentBets",
            json!({"betsCount": 2, "bets": [
                {"bet": 100, "player_id": "a"},
                {"bet": 50, "player_id": "b"}
            ]}),
        ));
        n.normalize(&raw("changeState", json!({"state": 2})));
        n.normalize(&raw("x", json!({"x": 1.5})));
        n.normalize(&raw("x", json!({"x": 2.4})));
        n.normalize(&raw("updateCurrentCashOuts", json!({"totalCashOut": "60.5"})));

        assert_eq!(n.round().state, RoundState::Running);
        assert_eq!(n.round().current_multiplier, 2.4);
        assert_eq!(n.round().aggregates.online_players, 2);

        let out = n.normalize(&raw("changeState", json!({"state": 3})));
        let rounds = settled(&out);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_id, "r-1");
        assert_eq!(rounds[0].max_multiplier(), Some(2.4));
        let aggregates = rounds[0].aggregates.as_ref().unwrap();
        assert_eq!(aggregates.total_bet_amount, dec!(150));
        assert_eq!(aggregates.casino_profit, dec!(89.5));
    }

    #[test]
    fn test_bets_ignored_outside_betting_phase() {
        let mut n = normalizer(GameType::Aviator);
        n.normalize(&raw("changeState", json!({"state": 2, "roundId": "r-1"})));
        let out = n.normalize(&raw("updateCurrentBets", json!({"betsCount": 9})));
        assert!(out.is_empty());
        assert_eq!(n.round().aggregates.bets_count, 0);
    }

    #[test]
    fn test_other_bookmaker_is_discarded() {
        let mut n = normalizer(GameType::Aviator);
        let event = ServerEvent::new(
            "aviator_raw",
            json!({"bookmakerId": 8, "data": {"p": {"c": "x", "p": {"x": 3.0}}}}),
        );
        assert!(n.normalize(&event).is_empty());
        assert_eq!(n.round().current_multiplier, 0.0);

        let history = ServerEvent::new(
            "history",
            json!({"bookmakerId": 8, "rounds": [{"round_id": "z", "max_multiplier": 2}]}),
        );
        assert!(n.normalize(&history).is_empty());
    }

    #[test]
    fn test_payload_without_scope_id_is_accepted() {
        let mut n = normalizer(GameType::Aviator);
        let out =
            n.normalize(&ServerEvent::new("multiplier", json!({"current_multiplier": "1.87"})));
        assert_eq!(out.len(), 1);
        assert_eq!(n.round().current_multiplier, 1.87);
    }

    #[test]
    fn test_betting_phase_closes_unsettled_round() {
        let mut n = normalizer(GameType::Aviator);
        n.normalize(&ServerEvent::new("roundStart", json!({"roundId": "r-1"})));
        n.normalize(&ServerEvent::new("multiplier", json!({"current_multiplier": 4.2})));

        let out = n.normalize(&ServerEvent::new("roundStart", json!({"roundId": "r-2"})));
        let rounds = settled(&out);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_id, "r-1");
        assert_eq!(rounds[0].max_multiplier(), Some(4.2));
        assert_eq!(n.round().round_id.as_deref(), Some("r-2"));
        assert_eq!(n.round().max_multiplier, 0.0);
    }

    #[test]
    fn test_settlement_without_round_id_is_dropped() {
        let mut n = normalizer(GameType::Aviator);
        let out = n.normalize(&ServerEvent::new("roundChartInfo", json!({"maxMultiplier": 3.3})));
        assert!(settled(&out).is_empty());
        assert_eq!(n.round().max_multiplier, 3.3);
    }

    #[test]
    fn test_round_snapshot_defaults_to_betting() {
        let mut n = normalizer(GameType::Aviator);
        n.normalize(&ServerEvent::new(
            "round",
            json!({"round_id": "r-5", "online_players": "31", "total_bet_amount": "12.5"}),
        ));
        assert_eq!(n.round().state, RoundState::Betting);
        assert_eq!(n.round().aggregates.online_players, 31);
        assert_eq!(n.round().aggregates.total_bet_amount, dec!(12.5));
    }

    #[test]
    fn test_aviator_history_snapshot() {
        let mut n = normalizer(GameType::Aviator);
        let out = n.normalize(&ServerEvent::new(
            "history",
            json!({"bookmakerId": 7, "rounds": [
                {"round_id": "b", "max_multiplier": "1.2"},
                {"roundId": "a", "maxMultiplier": 8.0},
                {"max_multiplier": 2.0}
            ]}),
        ));
        let Normalized::Snapshot(rounds) = &out[0] else {
            panic!("expected snapshot, got {out:?}");
        };
        let ids: Vec<&str> = rounds.iter().map(|r| r.round_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_history_entries_with_both_casings() {
        let mut n = normalizer(GameType::Aviator);
        let out = n.normalize(&ServerEvent::new(
            "history",
            json!({"bookmaker_id": 7, "bookmakerId": 7, "rounds": [
                {"round_id": "b", "roundId": "b", "max_multiplier": 2.5, "maxMultiplier": 2.5},
                {"round_id": "a"},
                {"round_id": "z", "max_multiplier": "oops"}
            ]}),
        ));
        let Normalized::Snapshot(rounds) = &out[0] else {
            panic!("expected snapshot, got {out:?}");
        };
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_id, "b");
        assert_eq!(rounds[0].max_multiplier(), Some(2.5));
    }

    #[test]
    fn test_malformed_payload_yields_nothing() {
        let mut n = normalizer(GameType::Aviator);
        assert!(n.normalize(&ServerEvent::new("history", json!({"rounds": "oops"}))).is_empty());
        assert!(n.normalize(&ServerEvent::new("somethingElse", json!({}))).is_empty());
    }

    // =========================================================================
    // Spaceman
    // =========================================================================

    #[test]
    fn test_spaceman_round_with_final_multiplier_settles() {
        let mut n = normalizer(GameType::Spaceman);
        n.normalize(&ServerEvent::new(
            "round",
            json!({
                "game_id": "g-1",
                "max_multiplier": 0,
                "total_bet_amount": 500,
                "game_state": "Run"
            }),
        ));
        n.normalize(&ServerEvent::new("liveMultiplier", json!({"multiplier": 1.9})));
        assert_eq!(n.round().state, RoundState::Running);

        let out = n.normalize(&ServerEvent::new(
            "round",
            json!({"game_id": "g-1", "max_multiplier": "2.75", "total_cashout": "200"}),
        ));
        let rounds = settled(&out);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].max_multiplier(), Some(2.75));
        assert_eq!(rounds[0].aggregates.as_ref().unwrap().casino_profit, dec!(300));
    }

    #[test]
    fn test_spaceman_round_with_game_and_round_id_settles() {
        let mut n = normalizer(GameType::Spaceman);
        let out = n.normalize(&ServerEvent::new(
            "round",
            json!({
                "game_id": "g-1",
                "round_id": "g-1",
                "max_multiplier": 2.75,
                "game_state": "End"
            }),
        ));
        let rounds = settled(&out);
        assert_eq!(rounds.len(), 1);
        assert_eq!(rounds[0].round_id, "g-1");
        assert_eq!(rounds[0].max_multiplier(), Some(2.75));
    }

    #[test]
    fn test_spaceman_joined_snapshot_and_status() {
        let mut n = normalizer(GameType::Spaceman);
        let out = n.normalize(&ServerEvent::new(
            "spaceman_joined",
            json!({"data": {
                "latestRounds": [{"game_id": 11, "max_multiplier": 1.3, "online_player": 80}],
                "connectionStatus": {
                    "multiplier": {"status": "CONNECTED"},
                    "finance": {"status": "CONNECTED"}
                }
            }}),
        ));
        assert_eq!(out.len(), 2);
        let Normalized::Snapshot(rounds) = &out[0] else {
            panic!("expected snapshot");
        };
        assert_eq!(rounds[0].round_id, "11");
        assert_eq!(rounds[0].aggregates.as_ref().unwrap().online_players, 80);
        let Normalized::Service(status) = &out[1] else {
            panic!("expected service status");
        };
        assert_eq!(status.health, ServiceHealth::Healthy);
    }

    #[test]
    fn test_latest_rounds_requires_success() {
        let mut n = normalizer(GameType::Spaceman);
        let rounds = json!([{"game_id": 1, "max_multiplier": 2}]);
        let failed =
            ServerEvent::new("latest_rounds", json!({"success": false, "data": rounds.clone()}));
        assert!(n.normalize(&failed).is_empty());
        let ok = ServerEvent::new("latest_rounds", json!({"success": true, "data": rounds}));
        assert_eq!(n.normalize(&ok).len(), 1);
    }

    #[test]
    fn test_spaceman_prediction_score_is_capped() {
        let mut n = normalizer(GameType::Spaceman);
        let out = n.normalize(&ServerEvent::new(
            "prediction",
            json!({"prediction": 1.8, "score": 7, "apostar": "NO"}),
        ));
        let Normalized::Prediction(Prediction::Multiplier(hint)) = &out[0] else {
            panic!("expected multiplier prediction");
        };
        assert_eq!(hint.score, 3.0);
        assert_eq!(hint.bet, Some(false));
    }

    // =========================================================================
    // Roulette
    // =========================================================================

    #[test]
    fn test_roulette_new_round_is_atomic() {
        let mut n = normalizer(GameType::Roulette);
        let out = n.normalize(&ServerEvent::new(
            "newRound",
            json!({
                "bookmakerId": 7,
                "roundId": "s-1",
                "number": 32,
                "color": "red",
                "rouletteName": "Live"
            }),
        ));
        let rounds = settled(&out);
        assert_eq!(rounds[0].spin_result(), Some((32, RouletteColor::Red)));

        let foreign =
            ServerEvent::new("newRound", json!({"bookmakerId": 1, "roundId": "s-2", "number": 4}));
        assert!(n.normalize(&foreign).is_empty());

        let anonymous = ServerEvent::new("newRound", json!({"bookmakerId": 7, "number": 4}));
        assert!(n.normalize(&anonymous).is_empty());
    }

    #[test]
    fn test_roulette_prediction_correlates_by_bookmaker() {
        let mut n = normalizer(GameType::Roulette);
        let ours = ServerEvent::new(
            "prediction",
            json!({
                "bookmakerId": 7,
                "prediction_type": "color",
                "predicted_values": ["red"],
                "probability": 0.61,
                "round_id": "s-9"
            }),
        );
        let out = n.normalize(&ours);
        let Normalized::Prediction(prediction) = &out[0] else {
            panic!("expected prediction");
        };
        assert_eq!(prediction.round_id(), Some("s-9"));

        let theirs =
            ServerEvent::new("prediction", json!({"bookmakerId": 3, "prediction_type": "dozen"}));
        assert!(n.normalize(&theirs).is_empty());
    }

    #[test]
    fn test_acks_and_server_errors() {
        let mut n = normalizer(GameType::Roulette);
        assert_eq!(
            n.normalize(&ServerEvent::new("joinedBookmaker", json!({"bookmakerId": 7}))),
            vec![Normalized::Ack(Ack::Joined(Some(BookmakerId(7))))]
        );
        assert_eq!(
            n.normalize(&ServerEvent::new("error", json!({"message": "Bookmaker not found"}))),
            vec![Normalized::ServerError("Bookmaker not found".to_string())]
        );
    }

    #[test]
    fn test_roulette_wheel_forecast() {
        let mut n = normalizer(GameType::Roulette);
        for name in ["predictionData", "predictionUpdate"] {
            let out = n.normalize(&ServerEvent::new(
                name,
                json!({
                    "bookmakerId": 7,
                    "number": 30,
                    "data": {
                        "nextNumbers": [{"number": 12, "color": "red"}],
                        "percentages": {"colors": {"red": "50", "black": "45", "green": "5"}}
                    }
                }),
            ));
            let [Normalized::Prediction(Prediction::Wheel(forecast))] = out.as_slice() else {
                panic!("expected wheel forecast, got {out:?}");
            };
            assert_eq!(forecast.window, 30);
            assert_eq!(forecast.next_numbers, vec![12]);
            assert_eq!(forecast.percentages["colors"]["green"], 5.0);
        }

        let theirs = ServerEvent::new("predictionData", json!({"bookmakerId": 3, "number": 30}));
        assert!(n.normalize(&theirs).is_empty());
    }

    #[test]
    fn test_roulette_latest_history_snapshot() {
        let mut n = normalizer(GameType::Roulette);
        let out = n.normalize(&ServerEvent::new(
            "latestHistory",
            json!({"bookmakerId": 7, "history": [
                {"id": 2, "roulette_id": 7, "round_id": "s-2", "number": 0, "color": "green"},
                {"id": 1, "roulette_id": 7, "round_id": "s-1", "number": 19, "color": "red"}
            ]}),
        ));
        let Normalized::Snapshot(rounds) = &out[0] else {
            panic!("expected snapshot, got {out:?}");
        };
        let ids: Vec<&str> = rounds.iter().map(|r| r.round_id.as_str()).collect();
        assert_eq!(ids, vec!["s-2", "s-1"]);
        assert_eq!(rounds[1].spin_result(), Some((19, RouletteColor::Red)));

        let theirs = ServerEvent::new("latestHistory", json!({"bookmakerId": 3, "history": []}));
        assert!(n.normalize(&theirs).is_empty());
    }

    #[test]
    fn test_prediction_subscription_ack() {
        let mut n = normalizer(GameType::Roulette);
        assert_eq!(
            n.normalize(&ServerEvent::new(
                "subscribedPrediction",
                json!({"bookmakerId": 7, "number": 20, "success": true}),
            )),
            vec![Normalized::Ack(Ack::PredictionSubscribed {
                bookmaker_id: Some(BookmakerId(7)),
                window: Some(20),
            })]
        );
        let rejected = ServerEvent::new(
            "subscribedPrediction",
            json!({"bookmakerId": 7, "number": 20, "success": false}),
        );
        assert!(n.normalize(&rejected).is_empty());
    }

    #[test]
    fn test_prediction_and_history_errors() {
        let mut n = normalizer(GameType::Roulette);
        assert_eq!(
            n.normalize(&ServerEvent::new("predictionError", json!({"message": "No data"}))),
            vec![Normalized::ServerError("No data".to_string())]
        );
        assert_eq!(
            n.normalize(&ServerEvent::new("historyError", json!({"message": "History failed"}))),
            vec![Normalized::ServerError("History failed".to_string())]
        );
    }
}
