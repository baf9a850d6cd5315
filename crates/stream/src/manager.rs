//! Stream connection manager.
//!
//! One actor per game namespace owns the link, the subscription tracker and
//! the reconnect policy:
//!
//! ```text
//! StreamClient::connect()
//!        │
//!        ├─► Spawns connection actor
//!        │   ├─► open (bounded by connect timeout) ─► drive link ─► lost ─┐
//!        │   └─► backoff (initial delay, doubling, capped) ◄──────────────┘
//!        │
//!        └─► Returns (StreamHandle, mpsc::Receiver<StreamEvent>)
//! ```
//!
//! Failures never surface through the handle: they show up as
//! [`ConnectionState`] transitions and [`Notice`]s.

use crate::error::StreamError;
use crate::notice::{Notice, NoticeBoard, NoticeLevel};
use crate::subscription::SubscriptionTracker;
use crate::transport::{AuthToken, Endpoint, Link, LinkEvent, Transport};
use casino_feed_core::{BookmakerId, ClientCommand, GameType, ServerEvent, StreamConfig};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Terminal until `connect` is called again.
    Failed { reason: String },
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Failed { .. })
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Events emitted by the connection actor.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Event(ServerEvent),
    /// Link lost; a reconnect is already scheduled.
    Disconnected { reason: String },
    Failed { reason: String },
}

#[derive(Debug)]
enum Command {
    Subscribe(BookmakerId),
    Unsubscribe(BookmakerId),
    Request(ClientCommand),
    Disconnect,
}

/// Control handle for a running connection.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    game: GameType,
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    notices: watch::Receiver<Option<Notice>>,
}

impl StreamHandle {
    #[must_use]
    pub const fn game(&self) -> GameType {
        self.game
    }

    /// Subscribes to a bookmaker, replacing any previous subscription.
    pub async fn subscribe(&self, bookmaker_id: BookmakerId) {
        self.send(Command::Subscribe(bookmaker_id)).await;
    }

    pub async fn unsubscribe(&self, bookmaker_id: BookmakerId) {
        self.send(Command::Unsubscribe(bookmaker_id)).await;
    }

    /// Sends a one-off request on the namespace, such as a prediction
    /// subscription. Requests made while offline go out after the next
    /// connect; switching or dropping the subscription discards them.
    pub async fn request(&self, command: ClientCommand) {
        self.send(Command::Request(command)).await;
    }

    /// Tears the connection down. The actor leaves the active room first.
    pub async fn disconnect(&self) {
        self.send(Command::Disconnect).await;
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    #[must_use]
    pub fn notices(&self) -> watch::Receiver<Option<Notice>> {
        self.notices.clone()
    }

    #[must_use]
    pub fn current_notice(&self) -> Option<Notice> {
        self.notices.borrow().clone()
    }

    /// Returns true once the actor has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) {
        if self.commands.send(command).await.is_err() {
            debug!(game = %self.game, "Connection actor already stopped, ignoring command");
        }
    }
}

pub struct StreamClient;

impl StreamClient {
    /// Starts a connection actor for `game` and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AuthenticationRequired`] without attempting a
    /// connection when the token is absent or blank.
    pub fn connect(
        game: GameType,
        token: Option<AuthToken>,
        config: &StreamConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<(StreamHandle, mpsc::Receiver<StreamEvent>), StreamError> {
        let token = match token {
            Some(token) if !token.is_blank() => token,
            _ => {
                warn!(game = %game, "Refusing to connect without an auth token");
                return Err(StreamError::missing_token());
            }
        };

        let (event_tx, event_rx) = mpsc::channel(config.channel_buffer_size.max(1));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (notices, notice_rx) = NoticeBoard::new(config.notice_ttl());

        let actor = ConnectionActor {
            endpoint: Endpoint {
                base_url: config.base_url.clone(),
                game,
                token,
            },
            config: config.clone(),
            transport,
            tracker: SubscriptionTracker::new(game),
            requests: Vec::new(),
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            notices,
        };
        tokio::spawn(actor.run());

        Ok((
            StreamHandle {
                game,
                commands: command_tx,
                state: state_rx,
                notices: notice_rx,
            },
            event_rx,
        ))
    }
}

enum Opened {
    Link(Link),
    Failed(StreamError),
    Shutdown,
}

enum LinkOutcome {
    Lost(String),
    Rejected(String),
    Shutdown,
}

struct ConnectionActor {
    endpoint: Endpoint,
    config: StreamConfig,
    transport: Arc<dyn Transport>,
    tracker: SubscriptionTracker,
    /// Requests waiting for a link.
    requests: Vec<ClientCommand>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<StreamEvent>,
    state: watch::Sender<ConnectionState>,
    notices: NoticeBoard,
}

impl ConnectionActor {
    async fn run(mut self) {
        let mut delay = self.config.initial_reconnect_delay();
        let mut retries: u32 = 0;

        loop {
            if retries == 0 {
                self.publish(ConnectionState::Connecting);
            }
            info!(
                game = %self.endpoint.game,
                url = %self.endpoint.base_url,
                attempt = retries,
                "Connecting to feed"
            );

            let failure = match self.open().await {
                Opened::Shutdown => return self.shutdown(),
                Opened::Link(link) => {
                    retries = 0;
                    delay = self.config.initial_reconnect_delay();
                    match self.drive(link).await {
                        LinkOutcome::Shutdown => return self.shutdown(),
                        LinkOutcome::Rejected(reason) => {
                            return self.fail(StreamError::AuthenticationRequired(reason)).await
                        }
                        LinkOutcome::Lost(reason) => {
                            warn!(
                                game = %self.endpoint.game,
                                reason = %reason,
                                "Feed connection lost"
                            );
                            self.tracker.on_link_lost();
                            let lost = StreamEvent::Disconnected {
                                reason: reason.clone(),
                            };
                            if self.events.send(lost).await.is_err() {
                                return self.shutdown();
                            }
                            StreamError::ConnectionFailed(reason)
                        }
                    }
                }
                Opened::Failed(e) if !e.is_retryable() => return self.fail(e).await,
                Opened::Failed(e) => {
                    warn!(
                        game = %self.endpoint.game,
                        error = %e,
                        attempt = retries,
                        "Feed connection attempt failed"
                    );
                    e
                }
            };

            let max = self.config.max_reconnect_attempts;
            if max > 0 && retries >= max {
                error!(game = %self.endpoint.game, retries, "Max reconnection attempts exceeded");
                return self.fail(StreamError::MaxReconnectsExceeded(retries)).await;
            }

            retries += 1;
            self.publish(ConnectionState::Reconnecting { attempt: retries });
            let level = if failure.is_transient() {
                NoticeLevel::Warning
            } else {
                NoticeLevel::Error
            };
            self.notices.raise(Notice::new(
                level,
                format!("Reconnecting... attempt {retries} ({failure})"),
                false,
            ));

            info!(delay = ?delay, attempt = retries, "Waiting before reconnect");
            if !self.backoff(delay).await {
                return self.shutdown();
            }
            delay = (delay * 2).min(self.config.max_reconnect_delay());
        }
    }

    /// Opens a link while still serving handle commands. Subscriptions made
    /// meanwhile are queued in the tracker.
    async fn open(&mut self) -> Opened {
        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        let timeout = self.config.connect_timeout();
        let attempt =
            tokio::time::timeout(timeout, async move { transport.open(&endpoint).await });
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                result = &mut attempt => {
                    return match result {
                        Ok(Ok(link)) => Opened::Link(link),
                        Ok(Err(e)) => Opened::Failed(e),
                        Err(_) => Opened::Failed(StreamError::Timeout(timeout)),
                    };
                }
                command = self.commands.recv() => {
                    if !self.apply_offline(command) {
                        return Opened::Shutdown;
                    }
                }
            }
        }
    }

    /// Sleeps for `delay`. Returns false if a disconnect arrived meanwhile.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let pause = sleep(delay);
        tokio::pin!(pause);

        loop {
            tokio::select! {
                () = &mut pause => return true,
                command = self.commands.recv() => {
                    if !self.apply_offline(command) {
                        return false;
                    }
                }
            }
        }
    }

    fn apply_offline(&mut self, command: Option<Command>) -> bool {
        match command {
            None | Some(Command::Disconnect) => false,
            Some(Command::Subscribe(bookmaker_id)) => {
                if self.tracker.active() != Some(bookmaker_id) {
                    self.requests.clear();
                }
                let _ = self.tracker.subscribe(bookmaker_id);
                debug!(bookmaker_id = %bookmaker_id, "Subscription queued until connected");
                true
            }
            Some(Command::Unsubscribe(bookmaker_id)) => {
                self.requests.clear();
                let _ = self.tracker.unsubscribe(bookmaker_id);
                true
            }
            Some(Command::Request(command)) => {
                debug!(command = %command.name, "Request queued until connected");
                self.requests.push(command);
                true
            }
        }
    }

    async fn drive(&mut self, link: Link) -> LinkOutcome {
        let Link {
            outbound,
            mut inbound,
        } = link;

        info!(game = %self.endpoint.game, "Feed connected");
        self.publish(ConnectionState::Connected);
        self.notices.clear();
        if self.events.send(StreamEvent::Connected).await.is_err() {
            return LinkOutcome::Shutdown;
        }

        let mut flushed = self.tracker.on_connected();
        flushed.append(&mut self.requests);
        if let Err(reason) = send_all(&outbound, flushed).await {
            return LinkOutcome::Lost(reason);
        }

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let commands = match command {
                        None | Some(Command::Disconnect) => {
                            if let Some(bookmaker_id) = self.tracker.active() {
                                let _ = outbound.send(ClientCommand::leave(bookmaker_id)).await;
                            }
                            return LinkOutcome::Shutdown;
                        }
                        Some(Command::Subscribe(bookmaker_id)) => {
                            self.tracker.subscribe(bookmaker_id)
                        }
                        Some(Command::Unsubscribe(bookmaker_id)) => {
                            self.tracker.unsubscribe(bookmaker_id)
                        }
                        Some(Command::Request(command)) => vec![command],
                    };
                    if let Err(reason) = send_all(&outbound, commands).await {
                        return LinkOutcome::Lost(reason);
                    }
                }

                event = inbound.recv() => {
                    match event {
                        Some(LinkEvent::Event(event)) => {
                            trace!(event = %event.name, "Forwarding server event");
                            if self.events.send(StreamEvent::Event(event)).await.is_err() {
                                debug!("Event consumer gone, stopping connection");
                                return LinkOutcome::Shutdown;
                            }
                        }
                        Some(LinkEvent::Error(message)) => {
                            warn!(game = %self.endpoint.game, error = %message, "Transport error");
                            let notice = Notice::warning(format!("Transport error: {message}"));
                            self.notices.raise(notice);
                        }
                        Some(LinkEvent::Closed { reason }) => return LinkOutcome::Lost(reason),
                        Some(LinkEvent::Unauthorized { reason }) => {
                            return LinkOutcome::Rejected(reason);
                        }
                        None => return LinkOutcome::Lost("link dropped".to_string()),
                    }
                }
            }
        }
    }

    async fn fail(&mut self, error: StreamError) {
        let reason = error.to_string();
        error!(game = %self.endpoint.game, reason = %reason, "Feed connection failed");
        self.tracker.reset();
        self.requests.clear();
        self.publish(ConnectionState::Failed {
            reason: reason.clone(),
        });
        self.notices.raise(Notice::fatal(reason.clone()));
        let _ = self.events.send(StreamEvent::Failed { reason }).await;
    }

    fn shutdown(&mut self) {
        info!(game = %self.endpoint.game, "Feed connection closed");
        self.tracker.reset();
        self.requests.clear();
        self.notices.clear();
        self.publish(ConnectionState::Disconnected);
    }

    fn publish(&self, state: ConnectionState) {
        debug!(game = %self.endpoint.game, state = %state, "Connection state changed");
        self.state.send_replace(state);
    }
}

async fn send_all(
    outbound: &mpsc::Sender<ClientCommand>,
    commands: Vec<ClientCommand>,
) -> Result<(), String> {
    for command in commands {
        info!(command = %command.name, payload = %command.payload, "Sending command");
        outbound
            .send(command)
            .await
            .map_err(|_| "link closed while sending".to_string())?;
    }
    Ok(())
}
