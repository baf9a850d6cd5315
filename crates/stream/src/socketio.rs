//! Minimal Engine.IO v4 / Socket.IO v5 text packet codec.
//!
//! Only the text frames a feed client needs are supported:
//!
//! ```text
//! 0{"sid":..,"pingInterval":..}   engine open
//! 1 / 2 / 3 / 6                   close / ping / pong / noop
//! 40/aviator,{"token":"..."}      namespace connect (and its ack)
//! 41/aviator,                     namespace disconnect
//! 42/aviator,["round",{...}]      event
//! 43/aviator,7[...]               event ack
//! 44/aviator,{"message":"..."}    namespace connect error
//! ```

use crate::error::StreamError;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const ROOT_NAMESPACE: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Open(Value),
    Close,
    Ping,
    Pong,
    Noop,
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        name: String,
        payload: Value,
        ack_id: Option<u64>,
    },
    Ack {
        namespace: String,
        id: u64,
        data: Value,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl Packet {
    #[must_use]
    pub fn event(namespace: &str, name: impl Into<String>, payload: Value) -> Self {
        Self::Event {
            namespace: namespace.to_string(),
            name: name.into(),
            payload,
            ack_id: None,
        }
    }

    /// Encodes the packet as a text frame.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open(handshake) => format!("0{handshake}"),
            Self::Close => "1".to_string(),
            Self::Ping => "2".to_string(),
            Self::Pong => "3".to_string(),
            Self::Noop => "6".to_string(),
            Self::Connect { namespace, data } => {
                let body = data.as_ref().map(Value::to_string).unwrap_or_default();
                format!("40{}{body}", namespace_prefix(namespace))
            }
            Self::Disconnect { namespace } => format!("41{}", namespace_prefix(namespace)),
            Self::Event {
                namespace,
                name,
                payload,
                ack_id,
            } => {
                let mut args = vec![Value::String(name.clone())];
                if !payload.is_null() {
                    args.push(payload.clone());
                }
                let ack = ack_id.map(|id| id.to_string()).unwrap_or_default();
                format!(
                    "42{}{ack}{}",
                    namespace_prefix(namespace),
                    Value::Array(args)
                )
            }
            Self::Ack {
                namespace,
                id,
                data,
            } => format!("43{}{id}{data}", namespace_prefix(namespace)),
            Self::ConnectError { namespace, data } => {
                format!("44{}{data}", namespace_prefix(namespace))
            }
        }
    }

    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::Protocol`] for unknown packet types, binary
    /// attachments or event frames without a name, and [`StreamError::Parse`]
    /// for invalid JSON bodies.
    pub fn decode(frame: &str) -> Result<Self, StreamError> {
        let mut chars = frame.chars();
        let kind = chars
            .next()
            .ok_or_else(|| StreamError::Protocol("empty frame".to_string()))?;
        let rest = chars.as_str();

        match kind {
            '0' => Ok(Self::Open(parse_body(rest)?.unwrap_or(Value::Null))),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping),
            '3' => Ok(Self::Pong),
            '5' | '6' => Ok(Self::Noop),
            '4' => decode_socket_packet(rest),
            other => Err(StreamError::Protocol(format!(
                "unknown engine packet type {other:?}"
            ))),
        }
    }
}

/// Engine.IO handshake sent by the server right after the upgrade.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

impl Handshake {
    /// Silence after which the server is considered gone.
    #[must_use]
    pub fn idle_timeout(&self, fallback: Duration) -> Duration {
        if self.ping_interval == 0 {
            return fallback;
        }
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

fn namespace_prefix(namespace: &str) -> String {
    if namespace.is_empty() || namespace == ROOT_NAMESPACE {
        String::new()
    } else {
        format!("{namespace},")
    }
}

fn parse_body(body: &str) -> Result<Option<Value>, StreamError> {
    if body.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(body)?))
}

fn decode_socket_packet(frame: &str) -> Result<Packet, StreamError> {
    let mut chars = frame.chars();
    let kind = chars
        .next()
        .ok_or_else(|| StreamError::Protocol("socket packet without type".to_string()))?;
    let rest = chars.as_str();

    let (namespace, rest) = match rest.strip_prefix('/') {
        Some(_) => match rest.find(',') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        },
        None => (ROOT_NAMESPACE, rest),
    };
    let namespace = namespace.to_string();

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let ack_id = rest[..digits].parse::<u64>().ok();
    let body = parse_body(&rest[digits..])?;

    match kind {
        '0' => Ok(Packet::Connect {
            namespace,
            data: body,
        }),
        '1' => Ok(Packet::Disconnect { namespace }),
        '2' => {
            let Some(Value::Array(mut args)) = body else {
                return Err(StreamError::Protocol(
                    "event packet without argument array".to_string(),
                ));
            };
            if args.is_empty() {
                return Err(StreamError::Protocol("event packet without name".to_string()));
            }
            let name = match args.remove(0) {
                Value::String(name) => name,
                other => {
                    return Err(StreamError::Protocol(format!(
                        "event name is not a string: {other}"
                    )))
                }
            };
            let payload = match args.len() {
                0 => Value::Null,
                1 => args.remove(0),
                _ => Value::Array(args),
            };
            Ok(Packet::Event {
                namespace,
                name,
                payload,
                ack_id,
            })
        }
        '3' => Ok(Packet::Ack {
            namespace,
            id: ack_id.unwrap_or_default(),
            data: body.unwrap_or(Value::Null),
        }),
        '4' => Ok(Packet::ConnectError {
            namespace,
            data: body.unwrap_or(Value::Null),
        }),
        '5' | '6' => Err(StreamError::Protocol(
            "binary socket packets are not supported".to_string(),
        )),
        other => Err(StreamError::Protocol(format!(
            "unknown socket packet type {other:?}"
        ))),
    }
}
