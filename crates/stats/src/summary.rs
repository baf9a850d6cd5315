use casino_feed_core::SettledRound;
use rust_decimal::Decimal;
use serde::Serialize;

/// Finance totals over a window of multiplier rounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MultiplierSummary {
    pub rounds: usize,
    pub average_multiplier: f64,
    pub highest_multiplier: f64,
    pub total_bet_amount: Decimal,
    pub total_cashout: Decimal,
    pub casino_profit: Decimal,
}

impl MultiplierSummary {
    /// Summarises the newest `window` rounds. Rounds without aggregates only
    /// count toward multipliers.
    #[must_use]
    pub fn compute(newest_first: &[SettledRound], window: usize) -> Self {
        let sample = &newest_first[..newest_first.len().min(window)];
        let mut summary = Self::default();
        let mut multiplier_sum = 0.0;

        for round in sample {
            let Some(multiplier) = round.max_multiplier() else {
                continue;
            };
            summary.rounds += 1;
            multiplier_sum += multiplier;
            summary.highest_multiplier = summary.highest_multiplier.max(multiplier);
            if let Some(aggregates) = &round.aggregates {
                summary.total_bet_amount += aggregates.total_bet_amount;
                summary.total_cashout += aggregates.total_cashout;
                summary.casino_profit += aggregates.casino_profit;
            }
        }

        if summary.rounds > 0 {
            #[allow(clippy::cast_precision_loss)]
            let rounds = summary.rounds as f64;
            summary.average_multiplier = multiplier_sum / rounds;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casino_feed_core::{Aggregates, BookmakerId, GameType, Scope};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn round(id: &str, max: f64, bet: Decimal, cashout: Decimal) -> SettledRound {
        SettledRound::multiplier(
            id,
            Scope::new(GameType::Spaceman, BookmakerId(1)),
            max,
            Some(Aggregates {
                total_bet_amount: bet,
                total_cashout: cashout,
                casino_profit: bet - cashout,
                ..Aggregates::default()
            }),
            Utc::now(),
        )
    }

    #[test]
    fn test_summary_totals() {
        let rounds = vec![
            round("a", 2.0, dec!(100), dec!(150)),
            round("b", 1.0, dec!(80), dec!(0)),
            round("c", 6.0, dec!(20.50), dec!(10)),
        ];
        let summary = MultiplierSummary::compute(&rounds, 100);
        assert_eq!(summary.rounds, 3);
        assert!((summary.average_multiplier - 3.0).abs() < 1e-9);
        assert_eq!(summary.highest_multiplier, 6.0);
        assert_eq!(summary.total_bet_amount, dec!(200.50));
        assert_eq!(summary.total_cashout, dec!(160));
        assert_eq!(summary.casino_profit, dec!(40.50));
    }

    #[test]
    fn test_summary_window_and_empty() {
        let rounds = vec![
            round("a", 2.0, dec!(10), dec!(0)),
            round("b", 4.0, dec!(10), dec!(0)),
        ];
        let summary = MultiplierSummary::compute(&rounds, 1);
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.total_bet_amount, dec!(10));

        assert_eq!(MultiplierSummary::compute(&[], 100), MultiplierSummary::default());
    }
}
