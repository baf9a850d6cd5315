//! One subscription context per hook: a stream connection and the session
//! state of the bookmaker it is subscribed to, driven by a single actor.

pub mod commands;
pub mod feed_actor;
pub mod feed_handle;

pub use commands::{FeedCommand, TableRequest};
pub use feed_actor::FeedContext;
pub use feed_handle::FeedContextHandle;
