//! Duplex transport abstraction and its Socket.IO-over-WebSocket implementation.
//!
//! A [`Transport`] opens one authenticated [`Link`] to a game namespace. The
//! connection manager only ever talks to links, so tests drive it with the
//! in-memory transport from [`crate::testing`].

use crate::error::StreamError;
use crate::socketio::{Handshake, Packet};
use async_trait::async_trait;
use casino_feed_core::{ClientCommand, GameType, ServerEvent, StreamConfig};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Bearer token passed at namespace connect time. Never printed.
#[derive(Clone)]
pub struct AuthToken(Arc<SecretString>);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(token.into())))
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.expose_secret().trim().is_empty()
    }

    fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Where and as whom to connect.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub game: GameType,
    pub token: AuthToken,
}

impl Endpoint {
    #[must_use]
    pub fn namespace(&self) -> &'static str {
        self.game.namespace()
    }

    /// WebSocket URL of the Engine.IO endpoint behind `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ConnectionFailed`] if the base URL is invalid or
    /// uses a scheme other than http(s)/ws(s).
    pub fn socket_url(&self) -> Result<Url, StreamError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            StreamError::ConnectionFailed(format!("invalid base url {}: {e}", self.base_url))
        })?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(StreamError::ConnectionFailed(format!(
                    "unsupported url scheme {other}"
                )))
            }
        };
        url.set_scheme(scheme).map_err(|()| {
            StreamError::ConnectionFailed(format!("cannot switch {} to {scheme}", self.base_url))
        })?;
        url.set_path("/socket.io/");
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url)
    }
}

/// Message surfaced by an open link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Event(ServerEvent),
    /// Transport problem that did not close the link.
    Error(String),
    Closed { reason: String },
    /// The server revoked the namespace session for authentication reasons.
    Unauthorized { reason: String },
}

/// One open, authenticated namespace session.
///
/// Dropping `outbound` closes the link; the inbound side ends once the
/// remote is gone.
#[derive(Debug)]
pub struct Link {
    pub outbound: mpsc::Sender<ClientCommand>,
    pub inbound: mpsc::Receiver<LinkEvent>,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a link to the endpoint's namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::AuthenticationRequired`] when the server rejects
    /// the token, or a retryable error for any other failure.
    async fn open(&self, endpoint: &Endpoint) -> Result<Link, StreamError>;
}

/// Production transport: Socket.IO v5 over `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    channel_buffer_size: usize,
    fallback_idle: Duration,
}

impl WebSocketTransport {
    #[must_use]
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            channel_buffer_size: config.channel_buffer_size.max(1),
            fallback_idle: config.ping_interval() * 2,
        }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(&StreamConfig::default())
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, endpoint: &Endpoint) -> Result<Link, StreamError> {
        let url = endpoint.socket_url()?;
        let namespace = endpoint.namespace();
        debug!(url = %url, namespace, "Opening websocket");

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| StreamError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = ws_stream.split();

        let handshake: Handshake = match next_packet(&mut read).await? {
            Packet::Open(value) => serde_json::from_value(value)?,
            other => {
                return Err(StreamError::Protocol(format!(
                    "expected engine open packet, got {other:?}"
                )))
            }
        };

        let connect = Packet::Connect {
            namespace: namespace.to_string(),
            data: Some(json!({ "token": endpoint.token.expose() })),
        };
        write.send(Message::Text(connect.encode())).await?;

        loop {
            match next_packet(&mut read).await? {
                Packet::Connect { namespace: ns, .. } if ns == namespace => break,
                Packet::ConnectError { data, .. } => return Err(connect_error(&data)),
                Packet::Ping => write.send(Message::Text(Packet::Pong.encode())).await?,
                other => trace!(packet = ?other, "Ignoring packet before namespace ack"),
            }
        }
        info!(namespace, sid = %handshake.sid, "Namespace connected");

        let (outbound_tx, outbound_rx) = mpsc::channel(self.channel_buffer_size);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.channel_buffer_size);
        let idle = handshake.idle_timeout(self.fallback_idle);

        tokio::spawn(pump(namespace, write, read, outbound_rx, inbound_tx, idle));

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Maps a namespace connect error to an auth rejection or a plain failure.
fn connect_error(data: &Value) -> StreamError {
    let message = data
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| data.to_string(), str::to_string);
    let lowered = message.to_lowercase();
    if ["auth", "token", "unauthorized", "forbidden"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        StreamError::AuthenticationRequired(message)
    } else {
        StreamError::ConnectionFailed(message)
    }
}

async fn next_packet(read: &mut WsSource) -> Result<Packet, StreamError> {
    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => return Packet::decode(&text),
            Some(Ok(Message::Close(frame))) => {
                return Err(StreamError::ConnectionFailed(
                    frame
                        .map(|f| f.reason.to_string())
                        .unwrap_or_else(|| "Connection closed".to_string()),
                ))
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(StreamError::WebSocket(e)),
            None => return Err(StreamError::ConnectionFailed("Stream ended".to_string())),
        }
    }
}

/// Moves frames between the socket and the link channels until either side goes away.
async fn pump(
    namespace: &'static str,
    mut write: WsSink,
    mut read: WsSource,
    mut outbound: mpsc::Receiver<ClientCommand>,
    inbound: mpsc::Sender<LinkEvent>,
    idle: Duration,
) {
    let idle_timer = sleep(idle);
    tokio::pin!(idle_timer);

    let reason = loop {
        tokio::select! {
            command = outbound.recv() => {
                let Some(command) = command else {
                    debug!(namespace, "Link dropped, closing websocket");
                    let disconnect = Packet::Disconnect { namespace: namespace.to_string() };
                    let _ = write.send(Message::Text(disconnect.encode())).await;
                    let _ = write.close().await;
                    return;
                };
                let frame = Packet::event(namespace, command.name, command.payload).encode();
                trace!(namespace, frame = %frame, "Sending frame");
                if let Err(e) = write.send(Message::Text(frame)).await {
                    break e.to_string();
                }
            }

            () = &mut idle_timer => {
                warn!(namespace, ?idle, "No traffic from server, assuming connection lost");
                break "ping timeout".to_string();
            }

            frame = read.next() => {
                idle_timer.as_mut().reset(Instant::now() + idle);
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        trace!(namespace, frame = %text, "Received frame");
                        match Packet::decode(&text) {
                            Ok(Packet::Ping) => {
                                let pong = Message::Text(Packet::Pong.encode());
                                if let Err(e) = write.send(pong).await {
                                    break e.to_string();
                                }
                            }
                            Ok(Packet::Event { namespace: ns, name, payload, .. })
                                if ns == namespace =>
                            {
                                let event = LinkEvent::Event(ServerEvent::new(name, payload));
                                if inbound.send(event).await.is_err() {
                                    let _ = write.close().await;
                                    return;
                                }
                            }
                            Ok(Packet::Disconnect { namespace: ns }) if ns == namespace => {
                                break "server closed namespace".to_string();
                            }
                            Ok(Packet::Close) => break "server closed session".to_string(),
                            Ok(Packet::ConnectError { data, .. }) => {
                                match connect_error(&data) {
                                    StreamError::AuthenticationRequired(reason) => {
                                        let rejected = LinkEvent::Unauthorized { reason };
                                        let _ = inbound.send(rejected).await;
                                        let _ = write.close().await;
                                        return;
                                    }
                                    other => break other.to_string(),
                                }
                            }
                            Ok(other) => trace!(packet = ?other, "Ignoring packet"),
                            Err(e) => {
                                warn!(namespace, error = %e, "Undecodable frame");
                                if inbound.send(LinkEvent::Error(e.to_string())).await.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "Connection closed".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "Stream ended".to_string(),
                }
            }
        }
    };

    let _ = inbound.send(LinkEvent::Closed { reason }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn endpoint(base_url: &str, token: &str) -> Endpoint {
        Endpoint {
            base_url: base_url.to_string(),
            game: GameType::Aviator,
            token: AuthToken::new(token),
        }
    }

    #[test]
    fn test_socket_url_switches_scheme() {
        let url = endpoint("https://feeds.example.test", "t").socket_url().unwrap();
        assert_eq!(
            url.as_str(),
            "wss://feeds.example.test/socket.io/?EIO=4&transport=websocket"
        );

        let url = endpoint("http://127.0.0.1:3006", "t").socket_url().unwrap();
        assert_eq!(url.scheme(), "ws");
        assert!(endpoint("ftp://nope", "t").socket_url().is_err());
    }

    #[test]
    fn test_token_is_redacted() {
        let token = AuthToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AuthToken(***)");
        assert!(!token.is_blank());
        assert!(AuthToken::new("   ").is_blank());
    }

    #[test]
    fn test_connect_error_classification() {
        assert!(matches!(
            connect_error(&json!({ "message": "Authentication error" })),
            StreamError::AuthenticationRequired(_)
        ));
        assert!(matches!(
            connect_error(&json!({ "message": "namespace full" })),
            StreamError::ConnectionFailed(_)
        ));
    }

    /// Socket.IO server that acks the namespace only for the expected token.
    async fn spawn_mock_server(expected_token: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let (mut write, mut read) = ws.split();

            write
                .send(Message::Text(
                    r#"0{"sid":"mock","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#
                        .to_string(),
                ))
                .await
                .unwrap();

            let Some(Ok(Message::Text(connect))) = read.next().await else {
                return;
            };
            let token_ok = connect.contains(expected_token);
            if !token_ok {
                let _ = write
                    .send(Message::Text(
                        r#"44/aviator,{"message":"Authentication error"}"#.to_string(),
                    ))
                    .await;
                return;
            }
            write
                .send(Message::Text(r#"40/aviator,{"sid":"ns-1"}"#.to_string()))
                .await
                .unwrap();

            // Echo the join back as an event so the client can observe it.
            if let Some(Ok(Message::Text(frame))) = read.next().await {
                assert_eq!(frame, r#"42/aviator,["joinBookmaker",3]"#);
                write.send(Message::Text("2".to_string())).await.unwrap();
                write
                    .send(Message::Text(
                        r#"42/aviator,["round",{"round_id":"r-1"}]"#.to_string(),
                    ))
                    .await
                    .unwrap();
            }
            // Expect the pong for our ping, then hang up.
            if let Some(Ok(Message::Text(pong))) = read.next().await {
                assert_eq!(pong, "3");
            }
            let _ = write.send(Message::Text("41/aviator,".to_string())).await;
        });

        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_websocket_transport_round_trip() {
        let base_url = spawn_mock_server("good-token").await;
        let transport = WebSocketTransport::default();

        let mut link = tokio::time::timeout(
            Duration::from_secs(5),
            transport.open(&endpoint(&base_url, "good-token")),
        )
        .await
        .expect("Timeout opening link")
        .expect("Link failed");

        link.outbound
            .send(ClientCommand::join(GameType::Aviator, casino_feed_core::BookmakerId(3)))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), link.inbound.recv())
            .await
            .expect("Timeout waiting for event")
            .expect("Link closed");
        match event {
            LinkEvent::Event(event) => {
                assert_eq!(event.name, "round");
                assert_eq!(event.payload["round_id"], "r-1");
            }
            other => panic!("Expected event, got {:?}", other),
        }

        let closed = tokio::time::timeout(Duration::from_secs(5), link.inbound.recv())
            .await
            .expect("Timeout waiting for close")
            .expect("Link closed without reason");
        assert!(matches!(closed, LinkEvent::Closed { .. }));
    }

    #[tokio::test]
    async fn test_websocket_transport_rejects_bad_token() {
        let base_url = spawn_mock_server("good-token").await;
        let transport = WebSocketTransport::default();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            transport.open(&endpoint(&base_url, "wrong")),
        )
        .await
        .expect("Timeout opening link");

        assert!(matches!(result, Err(StreamError::AuthenticationRequired(_))));
    }
}
