//! One-line renderings of a feed view for terminal output.

use casino_feed_core::{Outcome, Prediction, RouletteColor, RoundState};
use casino_feed_ingest::FeedView;
use casino_feed_stream::ConnectionState;
use std::fmt::Write;

/// Settled rounds shown in the tail of a summary line.
const RECENT: usize = 5;

pub fn summary_line(view: &FeedView, state: &ConnectionState) -> String {
    let mut line = format!("[{} {state}]", view.scope);

    if view.scope.game.is_multiplier() {
        let round = &view.round;
        let id = round.round_id.as_deref().unwrap_or("-");
        let _ = write!(line, " round {id} {}", phase(round.state));
        if round.state != RoundState::Betting {
            let _ = write!(line, " x{:.2}", round.current_multiplier);
        }
    }

    let recent: Vec<String> =
        view.history.iter().take(RECENT).map(|r| outcome(&r.outcome)).collect();
    if recent.is_empty() {
        line.push_str(" | no history");
    } else {
        let _ = write!(line, " | last {}", recent.join(" "));
    }

    let stats = &view.statistics;
    if let Some(trend) = stats.trend.as_ref().and_then(|t| t.last()) {
        let _ = write!(line, " | trend {trend:+}");
    }
    if let Some(summary) = stats.summary.as_ref().filter(|s| s.rounds > 0) {
        let _ = write!(line, " | avg {:.2}x", summary.average_multiplier);
    }
    if let Some(roulette) = stats.roulette.as_ref().filter(|r| r.total > 0) {
        let colors = &roulette.colors;
        let _ = write!(
            line,
            " | red {}% black {}% green {}%",
            colors.red, colors.black, colors.green
        );
    }
    if let Some(Prediction::Wheel(forecast)) = &view.prediction {
        if !forecast.next_numbers.is_empty() {
            let next: Vec<String> = forecast.next_numbers.iter().map(u8::to_string).collect();
            let _ = write!(line, " | next {}", next.join(" "));
        }
    }
    if let Some(error) = &view.last_error {
        let _ = write!(line, " | error: {error}");
    }
    line
}

const fn phase(state: RoundState) -> &'static str {
    match state {
        RoundState::Betting => "betting",
        RoundState::Running => "running",
        RoundState::Settled => "settled",
    }
}

fn outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Multiplier { max_multiplier } => format!("{max_multiplier:.2}x"),
        Outcome::Roulette { number, color } => {
            let color = match color {
                RouletteColor::Red => "R",
                RouletteColor::Black => "B",
                RouletteColor::Green => "G",
            };
            format!("{number}{color}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casino_feed_core::{AppConfig, BookmakerId, GameType, Scope, ServerEvent};
    use casino_feed_ingest::FeedSession;
    use serde_json::json;

    fn session(game: GameType) -> FeedSession {
        FeedSession::new(Scope::new(game, BookmakerId(3)), &AppConfig::default())
    }

    #[test]
    fn test_empty_multiplier_view() {
        let mut session = session(GameType::Aviator);
        let line = summary_line(&session.view(), &ConnectionState::Connecting);
        assert_eq!(line, "[aviator/3 connecting] round - betting | no history");
    }

    #[test]
    fn test_roulette_view_lists_recent_spins() {
        let mut session = session(GameType::Roulette);
        for (id, number) in [("s-1", 0), ("s-2", 7)] {
            session.apply(&ServerEvent::new(
                "newRound",
                json!({"bookmakerId": 3, "roundId": id, "number": number}),
            ));
        }

        let line = summary_line(&session.view(), &ConnectionState::Connected);
        assert!(line.starts_with("[roulette/3 connected] | last 7R 0G"));
        assert!(line.contains("red 50% black 0% green 50%"));
    }

    #[test]
    fn test_roulette_view_lists_forecast_numbers() {
        let mut session = session(GameType::Roulette);
        session.apply(&ServerEvent::new(
            "predictionData",
            json!({"bookmakerId": 3, "number": 30, "data": {"nextNumbers": [
                {"number": 14}, {"number": 0}
            ]}}),
        ));

        let line = summary_line(&session.view(), &ConnectionState::Connected);
        assert_eq!(line, "[roulette/3 connected] | no history | next 14 0");
    }

    #[test]
    fn test_multiplier_history_shows_average() {
        let mut session = session(GameType::Spaceman);
        session.apply(&ServerEvent::new(
            "latest_rounds",
            json!({"success": true, "data": [
                {"game_id": "g-2", "max_multiplier": 3.0},
                {"game_id": "g-1", "max_multiplier": 1.0}
            ]}),
        ));

        let line = summary_line(&session.view(), &ConnectionState::Connected);
        assert!(line.contains("| last 3.00x 1.00x"));
        assert!(line.contains("| avg 2.00x"));
    }
}
