use crate::indicators::{self, Band, Levels};
use casino_feed_core::StatsConfig;
use serde::Serialize;

/// Win/loss random walk over multiplier outcomes with its indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSeries {
    /// +1 above the threshold, -1 otherwise; oldest first.
    pub steps: Vec<i32>,
    pub cumulative: Vec<i64>,
    pub ema: Vec<f64>,
    pub bands: Vec<Band>,
    pub levels: Option<Levels>,
    pub above_ema: bool,
}

impl TrendSeries {
    /// Builds the series from multipliers ordered most recent first.
    ///
    /// Only the newest `trend_window` values are used.
    #[must_use]
    pub fn compute(newest_first: &[f64], config: &StatsConfig) -> Self {
        let window = newest_first.len().min(config.trend_window);
        let steps = binary_steps(&newest_first[..window], config.trend_threshold);
        let cumulative = cumulative_sum(&steps);

        #[allow(clippy::cast_precision_loss)]
        let series: Vec<f64> = cumulative.iter().map(|v| *v as f64).collect();
        let ema = indicators::ema(&series, config.ema_period);
        let bands = indicators::bollinger(&series, config.bollinger_period, config.bollinger_k);
        let levels = indicators::support_resistance(&series, config.support_resistance_lookback);
        let above_ema = is_above_ema(&series, &ema);

        Self {
            steps,
            cumulative,
            ema,
            bands,
            levels,
            above_ema,
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<i64> {
        self.cumulative.last().copied()
    }
}

/// Maps newest-first multipliers to oldest-first ±1 steps.
#[must_use]
pub fn binary_steps(newest_first: &[f64], threshold: f64) -> Vec<i32> {
    newest_first
        .iter()
        .rev()
        .map(|m| if *m > threshold { 1 } else { -1 })
        .collect()
}

#[must_use]
pub fn cumulative_sum(steps: &[i32]) -> Vec<i64> {
    steps
        .iter()
        .scan(0_i64, |acc, step| {
            *acc += i64::from(*step);
            Some(*acc)
        })
        .collect()
}

/// Both of the last two series points sit strictly above the matching EMA points.
fn is_above_ema(series: &[f64], ema: &[f64]) -> bool {
    if ema.len() < 2 || series.len() < 2 {
        return false;
    }
    let s = &series[series.len() - 2..];
    let e = &ema[ema.len() - 2..];
    s[0] > e[0] && s[1] > e[1]
}
