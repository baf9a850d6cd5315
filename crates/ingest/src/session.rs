use crate::history::{AppendOutcome, RoundHistory};
use crate::normalizer::{Ack, Normalized, Normalizer};
use casino_feed_core::{
    AppConfig, Prediction, Round, Scope, ServerEvent, ServiceStatus, SettledRound,
};
use casino_feed_stats::{DerivedStatistics, StatisticsEngine};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared flag marking a session as still owned by a live subscription.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a consumer renders for one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedView {
    pub scope: Scope,
    pub round: Round,
    /// Most recent first.
    pub history: Vec<SettledRound>,
    pub statistics: DerivedStatistics,
    pub prediction: Option<Prediction>,
    pub service: Option<ServiceStatus>,
    pub last_error: Option<String>,
}

/// State of one (game, bookmaker) subscription: live round, history, statistics.
#[derive(Debug)]
pub struct FeedSession {
    scope: Scope,
    normalizer: Normalizer,
    history: RoundHistory,
    statistics: StatisticsEngine,
    prediction: Option<Prediction>,
    service: Option<ServiceStatus>,
    last_error: Option<String>,
    liveness: Liveness,
}

impl FeedSession {
    #[must_use]
    pub fn new(scope: Scope, config: &AppConfig) -> Self {
        Self {
            scope,
            normalizer: Normalizer::new(scope),
            history: RoundHistory::with_capacity(config.history.capacity_for(scope.game)),
            statistics: StatisticsEngine::new(scope.game, config.stats.clone()),
            prediction: None,
            service: None,
            last_error: None,
            liveness: Liveness::new(),
        }
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    /// Handle to this session's liveness flag.
    #[must_use]
    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    #[must_use]
    pub const fn history(&self) -> &RoundHistory {
        &self.history
    }

    #[must_use]
    pub fn round(&self) -> &Round {
        self.normalizer.round()
    }

    /// Applies one inbound event. Returns whether anything visible changed.
    ///
    /// A closed session ignores every event.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        if !self.liveness.is_alive() {
            debug!(scope = %self.scope, event = %event.name, "Ignoring event for closed session");
            return false;
        }

        let mut changed = false;
        for change in self.normalizer.normalize(event) {
            changed |= self.absorb(change);
        }
        changed
    }

    fn absorb(&mut self, change: Normalized) -> bool {
        match change {
            Normalized::Update(_) => true,
            Normalized::Settled(round) => {
                let round_id = round.round_id.clone();
                let inserted = self.history.append(round) == AppendOutcome::Inserted;
                if inserted {
                    debug!(scope = %self.scope, round_id = %round_id, "Round settled");
                }
                inserted
            }
            Normalized::Snapshot(rounds) => {
                self.history.replace_all(rounds);
                true
            }
            Normalized::Prediction(prediction) => {
                self.prediction = Some(prediction);
                true
            }
            Normalized::Service(status) => {
                let changed = self.service.as_ref().map(|s| (s.connected_feeds, s.health))
                    != Some((status.connected_feeds, status.health));
                self.service = Some(status);
                changed
            }
            Normalized::Ack(Ack::Joined(id)) => {
                info!(scope = %self.scope, acked = ?id, "Server confirmed join");
                false
            }
            Normalized::Ack(Ack::Left(id)) => {
                info!(scope = %self.scope, acked = ?id, "Server confirmed leave");
                false
            }
            Normalized::Ack(Ack::PredictionSubscribed { bookmaker_id, window }) => {
                info!(
                    scope = %self.scope,
                    acked = ?bookmaker_id,
                    window = ?window,
                    "Server confirmed prediction subscription"
                );
                false
            }
            Normalized::ServerError(message) => {
                warn!(scope = %self.scope, %message, "Server reported an error");
                self.last_error = Some(message);
                true
            }
        }
    }

    /// Builds the current view, recomputing statistics if the history moved.
    pub fn view(&mut self) -> FeedView {
        let statistics = self.statistics.refresh(&self.history).clone();
        FeedView {
            scope: self.scope,
            round: self.normalizer.round().clone(),
            history: self.history.as_slice().to_vec(),
            statistics,
            prediction: self.prediction.clone(),
            service: self.service.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Drops the live round, history, statistics and annotations.
    pub fn reset(&mut self) {
        self.normalizer.reset();
        self.history.clear();
        self.statistics.invalidate();
        self.prediction = None;
        self.service = None;
        self.last_error = None;
    }

    /// Marks the session dead and clears it. Later events are ignored.
    pub fn close(&mut self) {
        self.liveness.kill();
        self.reset();
    }
}
