//! Rolling statistics over accumulated round history.

pub mod distribution;
pub mod engine;
pub mod indicators;
pub mod roulette;
pub mod summary;
pub mod trend;

pub use distribution::{Bucket, Distribution};
pub use engine::{DerivedStatistics, RoundSource, StatisticsEngine};
pub use indicators::{Band, Levels};
pub use roulette::{ColorShare, LastSeen, RangeShare, RouletteBreakdown, ThirdsShare};
pub use summary::MultiplierSummary;
pub use trend::TrendSeries;
