//! In-memory transport driven by a script of connection outcomes.
//!
//! Each call to [`Transport::open`] consumes the next scripted step. Link steps
//! hand back a [`RemoteEnd`] that plays the server side of the channel pair.

use crate::error::StreamError;
use crate::transport::{Endpoint, Link, LinkEvent, Transport};
use async_trait::async_trait;
use casino_feed_core::{ClientCommand, ServerEvent};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

const REMOTE_BUFFER: usize = 64;

enum Step {
    Link(Link),
    Fail(StreamError),
    Stall,
}

/// Server side of a scripted link.
#[derive(Debug)]
pub struct RemoteEnd {
    pub commands: mpsc::Receiver<ClientCommand>,
    pub events: mpsc::Sender<LinkEvent>,
}

impl RemoteEnd {
    /// Pushes a server event to the client.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ChannelClosed`] if the client dropped the link.
    pub async fn emit(&self, name: &str, payload: Value) -> Result<(), StreamError> {
        self.events
            .send(LinkEvent::Event(ServerEvent::new(name, payload)))
            .await
            .map_err(|_| StreamError::ChannelClosed)
    }

    /// Closes the link from the server side.
    pub async fn close(self, reason: &str) {
        let _ = self
            .events
            .send(LinkEvent::Closed {
                reason: reason.to_string(),
            })
            .await;
    }
}

/// Scripted [`Transport`]. An exhausted script fails every further attempt.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    steps: Arc<Mutex<VecDeque<Step>>>,
    attempts: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful open and returns the server side of that link.
    #[must_use]
    pub fn push_link(&self) -> RemoteEnd {
        let (outbound_tx, outbound_rx) = mpsc::channel(REMOTE_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(REMOTE_BUFFER);
        self.steps.lock().push_back(Step::Link(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        }));
        RemoteEnd {
            commands: outbound_rx,
            events: inbound_tx,
        }
    }

    pub fn push_failure(&self, error: StreamError) {
        self.steps.lock().push_back(Step::Fail(error));
    }

    /// Scripts an attempt that never completes.
    pub fn push_stall(&self) {
        self.steps.lock().push_back(Step::Stall);
    }

    /// Number of times `open` was called.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn open(&self, _endpoint: &Endpoint) -> Result<Link, StreamError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Link(link)) => Ok(link),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Stall) => std::future::pending().await,
            None => Err(StreamError::ConnectionFailed("script exhausted".to_string())),
        }
    }
}
