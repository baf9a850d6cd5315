//! User-facing connection notices with auto-expiry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Persistent notices stay until replaced or cleared.
    pub persistent: bool,
    pub raised_at: DateTime<Utc>,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message, false)
    }

    /// Persistent error, used once automatic recovery has given up.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message, true)
    }

    pub fn new(level: NoticeLevel, message: impl Into<String>, persistent: bool) -> Self {
        Self {
            level,
            message: message.into(),
            persistent,
            raised_at: Utc::now(),
        }
    }
}

/// Publishes the current notice on a watch channel.
///
/// Each raise bumps a generation counter; an expiry timer only clears the
/// notice it was started for.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    tx: Arc<watch::Sender<Option<Notice>>>,
    generation: Arc<AtomicU64>,
    ttl: Duration,
}

impl NoticeBoard {
    #[must_use]
    pub fn new(ttl: Duration) -> (Self, watch::Receiver<Option<Notice>>) {
        let (tx, rx) = watch::channel(None);
        (
            Self {
                tx: Arc::new(tx),
                generation: Arc::new(AtomicU64::new(0)),
                ttl,
            },
            rx,
        )
    }

    /// Replaces the current notice. Must be called from within a tokio runtime.
    pub fn raise(&self, notice: Notice) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let persistent = notice.persistent;
        self.tx.send_replace(Some(notice));

        if persistent {
            return;
        }
        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.generation);
        let ttl = self.ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if current.load(Ordering::SeqCst) == generation {
                tx.send_replace(None);
            }
        });
    }

    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tx.send_if_modified(|notice| notice.take().is_some());
    }

    #[must_use]
    pub fn current(&self) -> Option<Notice> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transient_notice_expires() {
        let (board, rx) = NoticeBoard::new(Duration::from_millis(30));
        board.raise(Notice::warning("Reconnecting... attempt 1"));
        assert_eq!(
            rx.borrow().as_ref().map(|n| n.message.clone()),
            Some("Reconnecting... attempt 1".to_string())
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn test_superseded_notice_is_not_cleared_by_old_timer() {
        let (board, _rx) = NoticeBoard::new(Duration::from_millis(60));
        board.raise(Notice::warning("first"));
        tokio::time::sleep(Duration::from_millis(40)).await;
        board.raise(Notice::warning("second"));
        tokio::time::sleep(Duration::from_millis(40)).await;

        // First timer fired already; the second notice must survive it.
        assert_eq!(board.current().map(|n| n.message), Some("second".to_string()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(board.current().is_none());
    }

    #[tokio::test]
    async fn test_persistent_notice_stays() {
        let (board, _rx) = NoticeBoard::new(Duration::from_millis(10));
        board.raise(Notice::fatal("gave up"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let notice = board.current().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.persistent);

        board.clear();
        assert!(board.current().is_none());
    }
}
