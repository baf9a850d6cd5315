use crate::commands::{FeedCommand, TableRequest};
use anyhow::{Context, Result};
use casino_feed_core::{BookmakerId, GameType};
use casino_feed_ingest::FeedView;
use casino_feed_stream::{ConnectionState, Notice, StreamHandle};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

/// Cloneable handle to a running [`crate::FeedContext`].
///
/// Subscription commands never fail: once the context has stopped they are
/// dropped with a debug log.
#[derive(Clone)]
pub struct FeedContextHandle {
    tx: mpsc::Sender<FeedCommand>,
    views: watch::Receiver<Option<FeedView>>,
    stream: StreamHandle,
}

impl FeedContextHandle {
    #[must_use]
    pub(crate) const fn new(
        tx: mpsc::Sender<FeedCommand>,
        views: watch::Receiver<Option<FeedView>>,
        stream: StreamHandle,
    ) -> Self {
        Self { tx, views, stream }
    }

    #[must_use]
    pub fn game(&self) -> GameType {
        self.stream.game()
    }

    /// Subscribes to `bookmaker_id`, replacing any previous subscription.
    pub async fn subscribe(&self, bookmaker_id: BookmakerId) {
        self.send(FeedCommand::Subscribe(bookmaker_id)).await;
    }

    /// Drops the active subscription and its state.
    pub async fn unsubscribe(&self) {
        self.send(FeedCommand::Unsubscribe).await;
    }

    /// Asks for roulette forecasts over the last `window` spins of the
    /// subscribed table. Ignored on other games or without a subscription.
    pub async fn subscribe_prediction(&self, window: u32) {
        self.table(TableRequest::SubscribePrediction { window }).await;
    }

    pub async fn unsubscribe_prediction(&self, window: u32) {
        self.table(TableRequest::UnsubscribePrediction { window }).await;
    }

    /// Asks for a forecast right away instead of waiting for the next push.
    pub async fn request_prediction_update(&self, window: u32) {
        self.table(TableRequest::PredictionUpdate { window }).await;
    }

    /// Asks the server to resend the recent spins of the subscribed table.
    pub async fn request_history(&self) {
        self.table(TableRequest::LatestHistory).await;
    }

    async fn table(&self, request: TableRequest) {
        self.send(FeedCommand::Table(request)).await;
    }

    /// Tears down the connection and stops the context.
    pub async fn disconnect(&self) {
        self.send(FeedCommand::Disconnect).await;
    }

    /// Asks the context for a fresh view of the active subscription.
    ///
    /// # Errors
    /// Returns an error if the context has stopped.
    pub async fn view(&self) -> Result<Option<FeedView>> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(FeedCommand::GetView(tx))
            .await
            .context("Feed context has stopped")?;
        let view = rx.await.context("Feed context dropped the view request")?;
        Ok(view)
    }

    /// Last published view, without a round trip to the context.
    #[must_use]
    pub fn latest_view(&self) -> Option<FeedView> {
        self.views.borrow().clone()
    }

    /// Receiver that changes on every visible update.
    #[must_use]
    pub fn watch_view(&self) -> watch::Receiver<Option<FeedView>> {
        self.views.clone()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.stream.state()
    }

    #[must_use]
    pub fn watch_connection(&self) -> watch::Receiver<ConnectionState> {
        self.stream.watch_state()
    }

    #[must_use]
    pub fn notices(&self) -> watch::Receiver<Option<Notice>> {
        self.stream.notices()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, command: FeedCommand) {
        if self.tx.send(command).await.is_err() {
            debug!(game = %self.game(), "Feed context already stopped, ignoring command");
        }
    }
}
