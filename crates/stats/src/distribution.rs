use serde::Serialize;

/// Multiplier ranges, closed on the upper side except the last two.
///
/// `[..1.50]`, `(1.50, 2.00]`, `(2.00, 3.00]`, `(3.00, 10.00)`, `[10.00, ..)`.
/// Outcomes below 1.00 fall into the first bucket.
const BUCKETS: [(&str, f64, f64); 5] = [
    ("1.00-1.50", f64::NEG_INFINITY, 1.50),
    ("1.51-2.00", 1.50, 2.00),
    ("2.01-3.00", 2.00, 3.00),
    ("3.01-9.99", 3.00, 10.00),
    ("10.00+", 10.00, f64::INFINITY),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub label: &'static str,
    pub count: usize,
    /// Share of the window, 0-100, unrounded.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub total: usize,
    pub buckets: Vec<Bucket>,
}

impl Distribution {
    /// Buckets the newest `window` multipliers of a most-recent-first slice.
    #[must_use]
    pub fn compute(newest_first: &[f64], window: usize) -> Self {
        let sample = &newest_first[..newest_first.len().min(window)];
        let mut counts = [0_usize; BUCKETS.len()];
        for multiplier in sample {
            counts[bucket_index(*multiplier)] += 1;
        }

        let total = sample.len();
        let buckets = BUCKETS
            .iter()
            .zip(counts)
            .map(|((label, _, _), count)| Bucket {
                label: *label,
                count,
                percentage: percentage(count, total),
            })
            .collect();

        Self { total, buckets }
    }

    #[must_use]
    pub fn count(&self, label: &str) -> Option<usize> {
        self.buckets.iter().find(|b| b.label == label).map(|b| b.count)
    }
}

fn bucket_index(multiplier: f64) -> usize {
    if multiplier >= 10.0 {
        return BUCKETS.len() - 1;
    }
    BUCKETS
        .iter()
        .position(|(_, _, upper)| multiplier <= *upper)
        .unwrap_or(BUCKETS.len() - 1)
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}
