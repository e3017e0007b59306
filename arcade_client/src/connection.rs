//! Connection lifecycle.
//!
//! Owns the single persistent socket and drives the state machine
//! `Disconnected → Connecting → Connected → Disconnected`. Assigns every
//! outgoing envelope its `seq`, runs the heartbeat, and matches PONG
//! echoes to measure latency.
//!
//! There is no automatic reconnection: after a close the caller must
//! invoke [`ConnectionManager::connect`] again.

use std::time::{Duration, Instant};

use arcade_shared::event::EventBus;
use arcade_shared::net::{now_ms, Envelope, FramedConn, JoinData, MessageType, PingData};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::events::{ConnectionEvent, LatencyEvent, SocketErrorEvent};
use crate::router::MessageRouter;

/// Frames drained per poll call before yielding back to the pump.
const MAX_FRAMES_PER_POLL: usize = 32;

/// Connection state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket. Initial and terminal state.
    Disconnected,
    /// Socket opening; a transport that never completes the open leaves
    /// the machine here indefinitely.
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

struct PendingPing {
    id: String,
    sent_at_ms: i64,
}

/// Owns the socket, the outgoing `seq` counter, and the heartbeat.
pub struct ConnectionManager {
    state: ConnectionState,
    conn: Option<FramedConn>,
    /// Monotonic outgoing counter; reset only on construction.
    seq: u32,
    heartbeat_interval: Duration,
    next_ping_at: Option<Instant>,
    pending_ping: Option<PendingPing>,
    ping_counter: u64,
    epoch: Instant,
}

impl ConnectionManager {
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            conn: None,
            seq: 0,
            heartbeat_interval,
            next_ping_at: None,
            pending_ping: None,
            ping_counter: 0,
            epoch: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Opens the socket and joins `lobby`. On success the machine is
    /// Connected, a JOIN envelope has been sent, and the heartbeat is
    /// armed. On failure the error event is emitted and the machine
    /// returns to Disconnected.
    pub async fn connect(
        &mut self,
        addr: &str,
        lobby: &str,
        bus: &mut EventBus,
    ) -> anyhow::Result<()> {
        if self.state == ConnectionState::Connected {
            debug!("already connected, ignoring connect");
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        bus.push(ConnectionEvent(self.state));

        match FramedConn::connect(addr).await {
            Ok(conn) => {
                info!(server = %addr, lobby = %lobby, "connected");
                self.conn = Some(conn);
                self.state = ConnectionState::Connected;
                bus.push(ConnectionEvent(self.state));

                self.send(
                    MessageType::Join,
                    &JoinData {
                        lobby: lobby.to_string(),
                    },
                    bus,
                )
                .await?;
                self.next_ping_at = Some(Instant::now() + self.heartbeat_interval);
                Ok(())
            }
            Err(e) => {
                warn!(server = %addr, error = %e, "connect failed");
                bus.push(SocketErrorEvent {
                    message: e.to_string(),
                });
                self.state = ConnectionState::Disconnected;
                bus.push(ConnectionEvent(self.state));
                Err(e)
            }
        }
    }

    /// Closes the socket locally. Same bookkeeping as a remote close.
    pub fn disconnect(&mut self, bus: &mut EventBus) {
        if self.conn.is_some() || self.state != ConnectionState::Disconnected {
            info!("disconnecting");
            self.handle_close(bus);
        }
    }

    /// Wraps `payload` in an envelope and transmits it. Dropped with a
    /// warning when not connected; a transport failure is treated as a
    /// socket error followed by close, not a caller error.
    pub async fn send<T: Serialize>(
        &mut self,
        msg_type: MessageType,
        payload: &T,
        bus: &mut EventBus,
    ) -> anyhow::Result<()> {
        if self.state != ConnectionState::Connected {
            warn!(?msg_type, "not connected, dropping message");
            return Ok(());
        }
        let env = Envelope::wrap(msg_type, self.next_seq(), payload)?;
        self.transmit(&env, bus).await;
        Ok(())
    }

    /// Drains inbound frames into the router. An I/O error on the stream
    /// runs the close path; a clean EOF runs it without the error event.
    pub async fn poll(
        &mut self,
        router: &MessageRouter,
        bus: &mut EventBus,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        let mut timeout = timeout;
        for _ in 0..MAX_FRAMES_PER_POLL {
            let Some(conn) = self.conn.as_mut() else {
                return Ok(());
            };
            match conn.recv_frame_timeout(timeout).await {
                Ok(Some(body)) => {
                    router.dispatch(&body, bus);
                    // Later frames should only drain what is already
                    // buffered, not wait for new data.
                    timeout = Duration::from_millis(1);
                }
                Ok(None) => return Ok(()),
                Err(e) => {
                    if is_clean_eof(&e) {
                        info!("server closed the connection");
                    } else {
                        warn!(error = %e, "socket error");
                        bus.push(SocketErrorEvent {
                            message: e.to_string(),
                        });
                    }
                    self.handle_close(bus);
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Sends a PING when the heartbeat deadline has passed. Each tick gets
    /// a fresh monotonic-time-derived identifier recorded as the pending
    /// ping; only the matching PONG produces a latency event.
    pub async fn tick_heartbeat(&mut self, bus: &mut EventBus) -> anyhow::Result<()> {
        if self.state != ConnectionState::Connected {
            return Ok(());
        }
        let Some(deadline) = self.next_ping_at else {
            return Ok(());
        };
        if Instant::now() < deadline {
            return Ok(());
        }

        self.ping_counter += 1;
        let id = format!("{}-{}", self.epoch.elapsed().as_micros(), self.ping_counter);
        let env = Envelope::wrap(MessageType::Ping, self.next_seq(), &PingData { id: id.clone() })?;
        self.pending_ping = Some(PendingPing {
            id,
            sent_at_ms: env.timestamp,
        });
        self.next_ping_at = Some(Instant::now() + self.heartbeat_interval);
        self.transmit(&env, bus).await;
        Ok(())
    }

    /// Matches a PONG echo against the pending ping. Stale or unknown
    /// identifiers are ignored.
    pub fn handle_pong(&mut self, pong: &PingData, bus: &mut EventBus) {
        let Some(pending) = self.pending_ping.as_ref() else {
            debug!(id = %pong.id, "pong with no ping outstanding");
            return;
        };
        if pending.id != pong.id {
            debug!(id = %pong.id, expected = %pending.id, "stale pong ignored");
            return;
        }
        let rtt_ms = now_ms() - pending.sent_at_ms;
        let latency_ms = rtt_ms as f64 / 2.0;
        self.pending_ping = None;
        debug!(rtt_ms, latency_ms, "heartbeat round trip");
        bus.push(LatencyEvent { rtt_ms, latency_ms });
    }

    fn next_seq(&mut self) -> u32 {
        self.seq += 1;
        self.seq
    }

    async fn transmit(&mut self, env: &Envelope, bus: &mut EventBus) {
        let Some(conn) = self.conn.as_mut() else {
            return;
        };
        if let Err(e) = conn.send(env).await {
            warn!(error = %e, "socket write failed");
            bus.push(SocketErrorEvent {
                message: e.to_string(),
            });
            self.handle_close(bus);
        }
    }

    /// Close bookkeeping: drop the socket, stop the heartbeat, clear the
    /// pending ping, emit the state transition. `seq` keeps counting.
    fn handle_close(&mut self, bus: &mut EventBus) {
        self.conn = None;
        self.next_ping_at = None;
        self.pending_ping = None;
        self.state = ConnectionState::Disconnected;
        bus.push(ConnectionEvent(self.state));
    }
}

fn is_clean_eof(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::UnexpectedEof)
        .unwrap_or(false)
}
