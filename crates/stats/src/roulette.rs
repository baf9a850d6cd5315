//! Categorical breakdowns of roulette spins.
//!
//! Every percentage uses the full window as denominator and is rounded on its
//! own, so a category's shares may not add up to exactly 100.

use casino_feed_core::RouletteColor;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColorShare {
    pub red: u32,
    pub black: u32,
    pub green: u32,
}

/// Dozen or column shares; zero never belongs to a third.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ThirdsShare {
    pub first: u32,
    pub second: u32,
    pub third: u32,
    pub zero: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RangeShare {
    pub low: u32,
    pub high: u32,
    pub zero: u32,
}

/// Spins since each third last hit: 0 means the latest spin, `None` means not in the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LastSeen {
    pub dozens: [Option<usize>; 3],
    pub columns: [Option<usize>; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouletteBreakdown {
    pub total: usize,
    pub colors: ColorShare,
    pub dozens: ThirdsShare,
    pub columns: ThirdsShare,
    pub ranges: RangeShare,
    pub last_seen: LastSeen,
}

impl RouletteBreakdown {
    /// Computes the breakdown over spins ordered most recent first.
    #[must_use]
    pub fn compute(newest_first: &[(u8, RouletteColor)]) -> Self {
        let total = newest_first.len();
        let mut colors = [0_usize; 3];
        let mut dozens = [0_usize; 4];
        let mut columns = [0_usize; 4];
        let mut ranges = [0_usize; 3];
        let mut last_seen = LastSeen::default();

        for (age, (number, color)) in newest_first.iter().enumerate() {
            let color = if *number == 0 {
                RouletteColor::Green
            } else {
                *color
            };
            colors[match color {
                RouletteColor::Red => 0,
                RouletteColor::Black => 1,
                RouletteColor::Green => 2,
            }] += 1;

            match (dozen(*number), column(*number)) {
                (Some(d), Some(c)) => {
                    dozens[d] += 1;
                    columns[c] += 1;
                    last_seen.dozens[d].get_or_insert(age);
                    last_seen.columns[c].get_or_insert(age);
                }
                _ => {
                    dozens[3] += 1;
                    columns[3] += 1;
                }
            }

            ranges[match number {
                0 => 2,
                1..=18 => 0,
                _ => 1,
            }] += 1;
        }

        let pct = |count: usize| rounded_percentage(count, total);
        Self {
            total,
            colors: ColorShare {
                red: pct(colors[0]),
                black: pct(colors[1]),
                green: pct(colors[2]),
            },
            dozens: ThirdsShare {
                first: pct(dozens[0]),
                second: pct(dozens[1]),
                third: pct(dozens[2]),
                zero: pct(dozens[3]),
            },
            columns: ThirdsShare {
                first: pct(columns[0]),
                second: pct(columns[1]),
                third: pct(columns[2]),
                zero: pct(columns[3]),
            },
            ranges: RangeShare {
                low: pct(ranges[0]),
                high: pct(ranges[1]),
                zero: pct(ranges[2]),
            },
            last_seen,
        }
    }
}

/// 1-12, 13-24, 25-36.
fn dozen(number: u8) -> Option<usize> {
    match number {
        1..=12 => Some(0),
        13..=24 => Some(1),
        25..=36 => Some(2),
        _ => None,
    }
}

/// Column of the betting layout: 1, 4, 7... is the first.
fn column(number: u8) -> Option<usize> {
    match number {
        1..=36 => Some(match number % 3 {
            1 => 0,
            2 => 1,
            _ => 2,
        }),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn rounded_percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (count as f64 * 100.0 / total as f64).round() as u32
}
