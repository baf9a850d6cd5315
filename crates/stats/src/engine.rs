use crate::distribution::Distribution;
use crate::roulette::RouletteBreakdown;
use crate::summary::MultiplierSummary;
use crate::trend::TrendSeries;
use casino_feed_core::{GameType, SettledRound, StatsConfig};
use serde::Serialize;
use tracing::trace;

/// Read access to an accumulated history.
pub trait RoundSource {
    /// Changes whenever the contents change.
    fn revision(&self) -> u64;

    /// Settled rounds, most recent first.
    fn rounds(&self) -> &[SettledRound];
}

impl RoundSource for (u64, &[SettledRound]) {
    fn revision(&self) -> u64 {
        self.0
    }

    fn rounds(&self) -> &[SettledRound] {
        self.1
    }
}

/// Indicators derived from one history revision.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedStatistics {
    pub revision: u64,
    pub rounds: usize,
    pub trend: Option<TrendSeries>,
    pub distribution: Option<Distribution>,
    pub summary: Option<MultiplierSummary>,
    pub roulette: Option<RouletteBreakdown>,
}

impl DerivedStatistics {
    #[must_use]
    pub fn compute(
        game: GameType,
        config: &StatsConfig,
        revision: u64,
        rounds: &[SettledRound],
    ) -> Self {
        let mut stats = Self {
            revision,
            rounds: rounds.len(),
            ..Self::default()
        };

        if game.is_multiplier() {
            let multipliers: Vec<f64> =
                rounds.iter().filter_map(SettledRound::max_multiplier).collect();
            stats.trend = Some(TrendSeries::compute(&multipliers, config));
            stats.distribution =
                Some(Distribution::compute(&multipliers, config.distribution_window));
            stats.summary = Some(MultiplierSummary::compute(rounds, config.trend_window));
        } else {
            let spins: Vec<_> = rounds.iter().filter_map(SettledRound::spin_result).collect();
            stats.roulette = Some(RouletteBreakdown::compute(&spins));
        }
        stats
    }
}

/// Recomputes statistics only when the history revision moves.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    game: GameType,
    config: StatsConfig,
    cached: Option<DerivedStatistics>,
}

impl StatisticsEngine {
    #[must_use]
    pub fn new(game: GameType, config: StatsConfig) -> Self {
        Self {
            game,
            config,
            cached: None,
        }
    }

    #[must_use]
    pub const fn game(&self) -> GameType {
        self.game
    }

    pub fn refresh(&mut self, source: &impl RoundSource) -> &DerivedStatistics {
        let revision = source.revision();
        if self.cached.as_ref().map(|s| s.revision) != Some(revision) {
            trace!(game = %self.game, revision, "Recomputing statistics");
            self.cached = None;
        }
        self.cached.get_or_insert_with(|| {
            DerivedStatistics::compute(self.game, &self.config, revision, source.rounds())
        })
    }

    #[must_use]
    pub fn latest(&self) -> Option<&DerivedStatistics> {
        self.cached.as_ref()
    }

    /// Drops the cache, e.g. when the history is replaced by a fresh one.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
