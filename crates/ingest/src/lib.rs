//! Ingest side of a feed: payload decoding, normalization into canonical
//! rounds, the deduplicating history window and the per-scope session that
//! ties them to the statistics engine.

pub mod decode;
pub mod history;
pub mod lenient;
pub mod normalizer;
pub mod session;

pub use decode::DecodeError;
pub use history::{AppendOutcome, RoundHistory};
pub use normalizer::{Ack, Normalized, Normalizer};
pub use session::{FeedSession, FeedView, Liveness};
