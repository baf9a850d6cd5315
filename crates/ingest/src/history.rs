use casino_feed_core::{RouletteColor, SettledRound};
use casino_feed_stats::RoundSource;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    Duplicate,
}

/// Bounded, most-recent-first window of settled rounds for one scope.
///
/// Round ids are unique within the window. Order is arrival order, not
/// timestamp order. The dedup set covers exactly the retained rounds: an id
/// evicted off the tail can be inserted again.
#[derive(Debug, Clone)]
pub struct RoundHistory {
    capacity: usize,
    rounds: Vec<SettledRound>,
    ids: HashSet<String>,
    revision: u64,
}

impl RoundHistory {
    /// A zero capacity is treated as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            rounds: Vec::with_capacity(capacity + 1),
            ids: HashSet::with_capacity(capacity + 1),
            revision: 0,
        }
    }

    /// Prepends a round unless its id is already present.
    pub fn append(&mut self, round: SettledRound) -> AppendOutcome {
        if self.ids.contains(&round.round_id) {
            debug!(round_id = %round.round_id, "Skipping duplicate round");
            return AppendOutcome::Duplicate;
        }

        self.ids.insert(round.round_id.clone());
        self.rounds.insert(0, round);
        while self.rounds.len() > self.capacity {
            if let Some(evicted) = self.rounds.pop() {
                self.ids.remove(&evicted.round_id);
            }
        }
        self.revision += 1;
        AppendOutcome::Inserted
    }

    /// Replaces the whole window with a snapshot ordered most recent first.
    ///
    /// Repeated ids keep their first occurrence; the snapshot is cut to capacity.
    pub fn replace_all(&mut self, rounds: impl IntoIterator<Item = SettledRound>) {
        self.rounds.clear();
        self.ids.clear();
        for round in rounds {
            if self.rounds.len() == self.capacity {
                break;
            }
            if self.ids.insert(round.round_id.clone()) {
                self.rounds.push(round);
            }
        }
        self.revision += 1;
        debug!(rounds = self.rounds.len(), "History replaced from snapshot");
    }

    pub fn clear(&mut self) {
        if self.rounds.is_empty() {
            return;
        }
        self.rounds.clear();
        self.ids.clear();
        self.revision += 1;
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    #[must_use]
    pub fn contains(&self, round_id: &str) -> bool {
        self.ids.contains(round_id)
    }

    /// Bumped on every change to the window.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn latest(&self) -> Option<&SettledRound> {
        self.rounds.first()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SettledRound] {
        &self.rounds
    }

    pub fn newest_first(&self) -> impl DoubleEndedIterator<Item = &SettledRound> + '_ {
        self.rounds.iter()
    }

    pub fn oldest_first(&self) -> impl DoubleEndedIterator<Item = &SettledRound> + '_ {
        self.rounds.iter().rev()
    }

    /// Multiplier outcomes in chronological order, as charts plot them.
    #[must_use]
    pub fn multipliers_oldest_first(&self) -> Vec<f64> {
        self.oldest_first().filter_map(SettledRound::max_multiplier).collect()
    }

    /// Roulette spins, most recent first.
    #[must_use]
    pub fn spins(&self) -> Vec<(u8, RouletteColor)> {
        self.newest_first().filter_map(SettledRound::spin_result).collect()
    }
}

impl RoundSource for RoundHistory {
    fn revision(&self) -> u64 {
        self.revision
    }

    fn rounds(&self) -> &[SettledRound] {
        &self.rounds
    }
}
