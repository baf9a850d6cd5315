//! Real-time feed connection management.
//!
//! One [`StreamClient`] connection per game namespace. Per-bookmaker
//! subscriptions are multiplexed over it through a [`StreamHandle`].

pub mod error;
pub mod manager;
pub mod notice;
pub mod socketio;
pub mod subscription;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use error::StreamError;
pub use manager::{ConnectionState, StreamClient, StreamEvent, StreamHandle};
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use subscription::SubscriptionTracker;
pub use transport::{AuthToken, Endpoint, Link, LinkEvent, Transport, WebSocketTransport};
