//! Plain numeric indicators over an oldest-first series.
//!
//! Every function returns an empty result when the series is shorter than
//! the requested window.

use serde::Serialize;

/// Exponential moving average seeded by the simple average of the first `period` points.
///
/// Output has `max(0, len - period + 1)` points; the first one is the seed.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let k = 2.0 / (period as f64 + 1.0);
    let seed = mean(&values[..period]);

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);
    let mut prev = seed;
    for value in &values[period..] {
        prev = value * k + prev * (1.0 - k);
        out.push(prev);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Band {
    pub mean: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Sliding-window bands: mean ± `k` population standard deviations.
///
/// One band per window position, aligned to the window's last point.
#[must_use]
pub fn bollinger(values: &[f64], period: usize, k: f64) -> Vec<Band> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    values
        .windows(period)
        .map(|window| {
            let mean = mean(window);
            let sigma = population_std_dev(window, mean);
            Band {
                mean,
                upper: mean + k * sigma,
                lower: mean - k * sigma,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Levels {
    pub support: f64,
    pub resistance: f64,
}

/// Minimum and maximum over the last `lookback` points.
#[must_use]
pub fn support_resistance(values: &[f64], lookback: usize) -> Option<Levels> {
    if lookback == 0 || values.is_empty() {
        return None;
    }
    let tail = &values[values.len().saturating_sub(lookback)..];
    let support = tail.iter().copied().fold(f64::INFINITY, f64::min);
    let resistance = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(Levels {
        support,
        resistance,
    })
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[allow(clippy::cast_precision_loss)]
fn population_std_dev(values: &[f64], mean: f64) -> f64 {
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}
