use crate::commands::{FeedCommand, TableRequest};
use crate::feed_handle::FeedContextHandle;
use anyhow::{Context, Result};
use casino_feed_core::{AppConfig, BookmakerId, GameType, Scope};
use casino_feed_ingest::{FeedSession, FeedView};
use casino_feed_stream::{AuthToken, StreamClient, StreamEvent, StreamHandle, Transport};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, trace, warn};

const COMMAND_BUFFER: usize = 32;

/// Actor owning one stream connection and the session of the bookmaker it is
/// subscribed to.
///
/// Commands and stream events are handled one at a time; pending commands go
/// first, so a teardown always lands before any event queued behind it.
pub struct FeedContext {
    game: GameType,
    config: AppConfig,
    stream: StreamHandle,
    events: mpsc::Receiver<StreamEvent>,
    rx: mpsc::Receiver<FeedCommand>,
    session: Option<FeedSession>,
    view_tx: watch::Sender<Option<FeedView>>,
    stream_open: bool,
}

impl FeedContext {
    /// Connects the stream for `game` and spawns the context actor.
    ///
    /// Returns as soon as the actor is running; the connection is established
    /// in the background.
    ///
    /// # Errors
    /// Returns an error wrapping [`casino_feed_stream::StreamError::AuthenticationRequired`]
    /// when no usable token is given.
    pub fn spawn(
        game: GameType,
        token: Option<AuthToken>,
        config: &AppConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<FeedContextHandle> {
        let (stream, events) = StreamClient::connect(game, token, &config.stream, transport)
            .with_context(|| format!("Failed to start {game} stream"))?;
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (view_tx, view_rx) = watch::channel(None);

        let actor = Self {
            game,
            config: config.clone(),
            stream: stream.clone(),
            events,
            rx,
            session: None,
            view_tx,
            stream_open: true,
        };
        tokio::spawn(actor.run());

        Ok(FeedContextHandle::new(tx, view_rx, stream))
    }

    pub async fn run(mut self) {
        info!(game = %self.game, "Feed context started");

        loop {
            tokio::select! {
                biased;

                command = self.rx.recv() => match command {
                    Some(FeedCommand::Disconnect) | None => {
                        self.shutdown().await;
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                },
                event = self.events.recv(), if self.stream_open => match event {
                    Some(event) => self.handle_stream_event(event),
                    None => {
                        debug!(game = %self.game, "Stream actor finished");
                        self.stream_open = false;
                    }
                },
            }
        }

        info!(game = %self.game, "Feed context stopped");
    }

    async fn handle_command(&mut self, command: FeedCommand) {
        match command {
            FeedCommand::Subscribe(bookmaker_id) => self.subscribe(bookmaker_id).await,
            FeedCommand::Unsubscribe => self.unsubscribe().await,
            FeedCommand::Table(request) => self.table(request).await,
            FeedCommand::GetView(reply) => {
                let view = self.session.as_mut().map(FeedSession::view);
                if reply.send(view).is_err() {
                    trace!(game = %self.game, "View requester went away");
                }
            }
            // Handled by the run loop.
            FeedCommand::Disconnect => {}
        }
    }

    async fn subscribe(&mut self, bookmaker_id: BookmakerId) {
        if self.session.as_ref().is_some_and(|s| s.scope().bookmaker_id == bookmaker_id) {
            debug!(game = %self.game, bookmaker_id = %bookmaker_id, "Already subscribed");
            return;
        }

        if let Some(mut previous) = self.session.take() {
            info!(scope = %previous.scope(), "Switching bookmaker, dropping previous session");
            previous.close();
        }

        let scope = Scope::new(self.game, bookmaker_id);
        self.session = Some(FeedSession::new(scope, &self.config));
        self.stream.subscribe(bookmaker_id).await;
        self.publish();
    }

    async fn unsubscribe(&mut self) {
        let Some(mut session) = self.session.take() else {
            debug!(game = %self.game, "Unsubscribe without an active subscription");
            return;
        };
        session.close();
        self.stream.unsubscribe(session.scope().bookmaker_id).await;
        self.publish();
    }

    async fn table(&self, request: TableRequest) {
        if self.game != GameType::Roulette {
            warn!(game = %self.game, ?request, "Table requests only exist for roulette");
            return;
        }
        let Some(session) = self.session.as_ref() else {
            debug!(game = %self.game, ?request, "Table request without an active subscription");
            return;
        };
        let command = request.command(session.scope().bookmaker_id);
        self.stream.request(command).await;
    }

    async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        self.stream.disconnect().await;
        self.publish();
    }

    fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Event(event) => {
                let Some(session) = self.session.as_mut() else {
                    trace!(
                        game = %self.game,
                        event = %event.name,
                        "No active subscription, dropping event"
                    );
                    return;
                };
                if session.apply(&event) {
                    self.publish();
                }
            }
            StreamEvent::Connected => info!(game = %self.game, "Stream connected"),
            StreamEvent::Disconnected { reason } => {
                info!(game = %self.game, %reason, "Stream link lost, waiting for resubscription");
            }
            StreamEvent::Failed { reason } => {
                error!(game = %self.game, %reason, "Stream failed permanently");
            }
        }
    }

    fn publish(&mut self) {
        let view = self.session.as_mut().map(FeedSession::view);
        self.view_tx.send_replace(view);
    }
}
