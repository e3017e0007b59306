//! Shared harness for socket-level tests.
//!
//! [`StubServer`] plays the authoritative side of the wire: it accepts one
//! client, records what arrives, and sends whatever frames a test scripts,
//! including deliberately broken ones. [`recording_receiver`] builds a
//! state receiver whose proxies are just an op log, so tests can assert on
//! the exact create/update/remove sequence.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use arcade_client::reconcile::{ProxyBinding, Reconciler};
use arcade_client::receiver::StateReceiver;
use arcade_shared::entity::{EntityId, EntityKind, EntitySnapshot};
use arcade_shared::net::{
    decode_envelope, encode_envelope, now_ms, Envelope, MessageType, MAX_FRAME_LEN,
};
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;

/// Listener half of the stub. One accept per test.
pub struct StubServer {
    listener: TcpListener,
}

impl StubServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind stub listener")?;
        Ok(Self { listener })
    }

    /// Address to point the client config at.
    pub fn addr(&self) -> anyhow::Result<String> {
        Ok(self.listener.local_addr()?.to_string())
    }

    pub async fn accept(&self) -> anyhow::Result<StubConn> {
        let (stream, _) = self.listener.accept().await.context("accept client")?;
        Ok(StubConn { stream, seq: 0 })
    }
}

/// Accepted connection. Speaks the same length-prefixed JSON framing as the
/// client, implemented independently so a framing bug cannot hide.
pub struct StubConn {
    stream: TcpStream,
    seq: u32,
}

impl StubConn {
    /// Sends a typed message with the stub's own seq counter.
    pub async fn send<T: Serialize>(
        &mut self,
        msg_type: MessageType,
        payload: &T,
    ) -> anyhow::Result<()> {
        self.seq += 1;
        let env = Envelope::wrap(msg_type, self.seq, payload)?;
        self.send_envelope(&env).await
    }

    pub async fn send_envelope(&mut self, env: &Envelope) -> anyhow::Result<()> {
        let body = encode_envelope(env)?;
        self.send_raw(&body).await
    }

    /// Sends an arbitrary frame body, valid or not.
    pub async fn send_raw(&mut self, body: &[u8]) -> anyhow::Result<()> {
        self.stream
            .write_all(&(body.len() as u32).to_be_bytes())
            .await?;
        self.stream.write_all(body).await?;
        Ok(())
    }

    /// Reads one envelope within the deadline.
    pub async fn recv(&mut self, timeout: Duration) -> anyhow::Result<Envelope> {
        let read = async {
            let mut len_buf = [0u8; 4];
            self.stream.read_exact(&mut len_buf).await?;
            let len = u32::from_be_bytes(len_buf) as usize;
            anyhow::ensure!(len <= MAX_FRAME_LEN, "oversized frame from client");
            let mut body = vec![0u8; len];
            self.stream.read_exact(&mut body).await?;
            decode_envelope(&body)
        };
        time::timeout(timeout, read)
            .await
            .context("timed out waiting for client frame")?
    }

    /// Reads envelopes until one of the wanted type arrives, skipping the
    /// rest (a live session interleaves INPUT and PING freely).
    pub async fn recv_type(
        &mut self,
        wanted: MessageType,
        timeout: Duration,
    ) -> anyhow::Result<Envelope> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .context("timed out waiting for message type")?;
            let env = self.recv(remaining).await?;
            if env.msg_type == wanted {
                return Ok(env);
            }
        }
    }

    /// Echoes a PING back as the matching PONG.
    pub async fn pong(&mut self, ping: &Envelope) -> anyhow::Result<()> {
        let data = ping.data.clone().context("ping without data")?;
        self.seq += 1;
        let env = Envelope {
            msg_type: MessageType::Pong,
            timestamp: now_ms(),
            seq: self.seq,
            data: Some(data),
        };
        self.send_envelope(&env).await
    }
}

/// Observed proxy lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOp {
    Create(EntityKind, EntityId),
    Update(EntityKind, EntityId),
    Remove(EntityKind, EntityId),
}

pub type OpLog = Arc<Mutex<Vec<ProxyOp>>>;

struct RecordingBinding {
    kind: EntityKind,
    ops: OpLog,
}

impl ProxyBinding for RecordingBinding {
    type Handle = EntityId;

    fn create_proxy(&mut self, snapshot: &EntitySnapshot) -> EntityId {
        self.push(ProxyOp::Create(self.kind, snapshot.id));
        snapshot.id
    }

    fn update_proxy(&mut self, _handle: &mut EntityId, snapshot: &EntitySnapshot) {
        self.push(ProxyOp::Update(self.kind, snapshot.id));
    }

    fn remove_proxy(&mut self, handle: EntityId) {
        self.push(ProxyOp::Remove(self.kind, handle));
    }
}

impl RecordingBinding {
    fn push(&self, op: ProxyOp) {
        self.ops.lock().unwrap().push(op);
    }
}

/// Receiver with a recording engine per requested kind.
pub fn recording_receiver(kinds: &[EntityKind]) -> (StateReceiver, OpLog) {
    let ops: OpLog = Arc::new(Mutex::new(Vec::new()));
    let mut receiver = StateReceiver::new();
    for &kind in kinds {
        receiver.register(Box::new(Reconciler::new(
            kind,
            RecordingBinding {
                kind,
                ops: ops.clone(),
            },
        )));
    }
    (receiver, ops)
}

/// Takes everything logged so far.
pub fn drain_ops(log: &OpLog) -> Vec<ProxyOp> {
    log.lock().unwrap().drain(..).collect()
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}
