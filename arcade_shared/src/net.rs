//! Wire protocol.
//!
//! Every message travels as a fixed-shape envelope:
//!
//! ```json
//! { "type": "STATE", "timestamp": 1234567890, "seq": 42, "data": { ... } }
//! ```
//!
//! Frames are length-prefixed JSON over a persistent TCP stream. The `seq`
//! counter is assigned by the sender and is advisory on receive: the
//! transport preserves order, so no reassembly or gap detection happens
//! here.

use anyhow::Context;
use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};

use crate::entity::{EntityId, EntityPatch, RawEntity};
use crate::math::Vec3;

/// Upper bound on a single frame body. Anything larger is treated as a
/// corrupt stream.
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Current wall-clock time in milliseconds, as carried by envelope
/// timestamps.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Closed set of message categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Client → server: enter a lobby.
    Join,
    /// Client → server: sampled movement/rotation/actions.
    Input,
    /// Server → client: full authoritative entity snapshot.
    State,
    /// Server → client: incremental snapshot.
    StateDelta,
    /// Server → client: single entity announced outside a snapshot.
    EntitySpawn,
    /// Server → client: single entity destroyed.
    EntityDestroy,
    Ping,
    Pong,
    Error,
    InputAck,
}

/// Envelope wrapping every wire message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    /// Sender clock, ms since epoch.
    pub timestamp: i64,
    /// Sender-assigned monotonic counter.
    pub seq: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Wraps a payload into an envelope stamped with the current time.
    pub fn wrap<T: Serialize>(msg_type: MessageType, seq: u32, payload: &T) -> anyhow::Result<Self> {
        let data = serde_json::to_value(payload).context("serialize payload")?;
        Ok(Self {
            msg_type,
            timestamp: now_ms(),
            seq,
            data: Some(data),
        })
    }

    /// Decodes `data` into the typed payload for this envelope's type.
    ///
    /// This is the single normalization point for inbound messages; past
    /// it, everything is typed.
    pub fn payload(&self) -> anyhow::Result<Payload> {
        fn decode<'a, T: Deserialize<'a>>(data: &'a Option<Value>) -> anyhow::Result<T> {
            let value = data.as_ref().context("missing data field")?;
            T::deserialize(value).context("decode payload")
        }

        Ok(match self.msg_type {
            MessageType::Join => Payload::Join(decode(&self.data)?),
            MessageType::Input => Payload::Input(decode(&self.data)?),
            MessageType::State => Payload::State(decode(&self.data)?),
            MessageType::StateDelta => Payload::StateDelta(decode(&self.data)?),
            MessageType::EntitySpawn => Payload::EntitySpawn(decode(&self.data)?),
            MessageType::EntityDestroy => Payload::EntityDestroy(decode(&self.data)?),
            MessageType::Ping => Payload::Ping(decode(&self.data)?),
            MessageType::Pong => Payload::Pong(decode(&self.data)?),
            MessageType::Error => Payload::Error(decode(&self.data)?),
            MessageType::InputAck => Payload::InputAck(match &self.data {
                Some(value) => InputAckData::deserialize(value).unwrap_or_default(),
                None => InputAckData::default(),
            }),
        })
    }
}

/// Typed view of an envelope's `data`, keyed by its `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Join(JoinData),
    Input(InputData),
    State(StateData),
    StateDelta(StateDeltaData),
    EntitySpawn(RawEntity),
    EntityDestroy(EntityDestroyData),
    Ping(PingData),
    Pong(PingData),
    Error(ErrorData),
    InputAck(InputAckData),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinData {
    pub lobby: String,
}

/// Periodic input sample. `actions.shoot` stays false in sampled payloads;
/// firing is sent as its own discrete INPUT at trigger time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InputData {
    pub movement: Vec3,
    pub rotation: RotationData,
    pub actions: ActionsData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RotationData {
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ActionsData {
    pub shoot: bool,
}

/// PING carries an identifier the server echoes back verbatim in PONG.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingData {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorData {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateData {
    pub entities: Vec<RawEntity>,
}

/// Incremental snapshot. All lists are optional on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StateDeltaData {
    #[serde(rename = "baseSeq", skip_serializing_if = "Option::is_none")]
    pub base_seq: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<Vec<RawEntity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<Vec<EntityId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<EntityPatch>>,
}

/// Destroy events name the id and, when the server provides it, the kind
/// discriminator (either casing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityDestroyData {
    pub id: EntityId,
    #[serde(
        rename = "type",
        alias = "Type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct InputAckData {
    pub seq: Option<u32>,
}

/// Encodes an envelope to its frame body.
pub fn encode_envelope(env: &Envelope) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec(env).context("serialize envelope")
}

/// Decodes a frame body into an envelope.
pub fn decode_envelope(body: &[u8]) -> anyhow::Result<Envelope> {
    serde_json::from_slice(body).context("deserialize envelope")
}

/// Persistent connection carrying length-prefixed JSON frames.
///
/// `recv_frame` returns the raw body; envelope parsing is left to the
/// message router so a malformed frame drops without closing the stream.
#[derive(Debug)]
pub struct FramedConn {
    stream: TcpStream,
}

impl FramedConn {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("connect {addr}"))?;
        Ok(Self { stream })
    }

    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn send(&mut self, env: &Envelope) -> anyhow::Result<()> {
        let payload = encode_envelope(env)?;
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(&payload);
        self.stream.write_all(&buf).await.context("socket write")?;
        Ok(())
    }

    /// Reads one frame body. An I/O error (including EOF) means the
    /// connection is gone.
    pub async fn recv_frame(&mut self) -> anyhow::Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .context("socket read len")?;
        let len = u32::from_be_bytes(len_buf) as usize;
        anyhow::ensure!(len <= MAX_FRAME_LEN, "frame length {len} exceeds limit");
        let mut body = vec![0u8; len];
        self.stream
            .read_exact(&mut body)
            .await
            .context("socket read body")?;
        Ok(body)
    }

    /// Reads one frame body within the given timeout; `None` on timeout.
    pub async fn recv_frame_timeout(
        &mut self,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        match time::timeout(timeout, self.recv_frame()).await {
            Ok(Ok(body)) => Ok(Some(body)),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}
