//! Session orchestration.
//!
//! Single-threaded, cooperative, event-driven: socket frames, the
//! heartbeat, and the input clock are all serviced by [`GameSession::pump`]
//! on one task, run to completion, no locks. Reconciliation happens
//! synchronously inside the pump and must not block.

use std::time::{Duration, Instant};

use arcade_shared::config::ClientConfig;
use arcade_shared::event::EventBus;
use arcade_shared::net::MessageType;
use tracing::{info, warn};

use crate::connection::{ConnectionManager, ConnectionState};
use crate::events::{
    ConnectionEvent, InputAckEvent, LatencyEvent, MessageEvent, ParseErrorEvent, PongEvent,
    ServerErrorEvent, SocketErrorEvent,
};
use crate::input::{ControlState, InputSampler};
use crate::receiver::StateReceiver;
use crate::router::MessageRouter;
use crate::stats::NetworkStats;

/// How long one pump call waits for a first socket frame.
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Owns every sync-core component for one play session.
pub struct GameSession {
    config: ClientConfig,
    bus: EventBus,
    conn: ConnectionManager,
    router: MessageRouter,
    receiver: StateReceiver,
    sampler: InputSampler,
    pub controls: ControlState,
    stats: NetworkStats,
}

impl GameSession {
    /// `receiver` comes pre-registered with the per-kind engines; the
    /// presentation collaborator decides what a proxy is.
    pub fn new(config: ClientConfig, receiver: StateReceiver) -> Self {
        let conn = ConnectionManager::new(Duration::from_millis(config.heartbeat_interval_ms));
        let sampler = InputSampler::new(config.input_sample_rate_hz);
        Self {
            config,
            bus: EventBus::default(),
            conn,
            router: MessageRouter,
            receiver,
            sampler,
            controls: ControlState::default(),
            stats: NetworkStats::default(),
        }
    }

    /// Connects to the configured server and lobby and starts the input
    /// clock. May be called again after a close; there is no automatic
    /// retry.
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        self.conn
            .connect(&self.config.server_url, &self.config.lobby, &mut self.bus)
            .await?;
        if !self.sampler.is_running() {
            self.sampler.start();
        }
        Ok(())
    }

    /// Closes the socket. The input clock keeps running (its sends are
    /// dropped until the caller stops it or reconnects).
    pub fn disconnect(&mut self) {
        self.conn.disconnect(&mut self.bus);
    }

    pub fn stop_input(&mut self) {
        self.sampler.stop();
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut NetworkStats {
        &mut self.stats
    }

    pub fn receiver(&self) -> &StateReceiver {
        &self.receiver
    }

    /// One cooperative slice: drain the socket, service the clocks, then
    /// run every consumer against what landed on the bus.
    pub async fn pump(&mut self) -> anyhow::Result<()> {
        self.conn
            .poll(&self.router, &mut self.bus, POLL_TIMEOUT)
            .await?;

        // Match queued PONGs before the heartbeat may arm a new ping, so
        // an echo racing the next deadline is not misread as stale.
        for PongEvent(pong) in self.bus.drain::<PongEvent>() {
            self.conn.handle_pong(&pong, &mut self.bus);
        }

        self.conn.tick_heartbeat(&mut self.bus).await?;

        if self.sampler.due(Instant::now()) {
            let payload = self.sampler.sample(&self.controls);
            self.conn
                .send(MessageType::Input, &payload, &mut self.bus)
                .await?;
        }

        self.receiver.pump(&mut self.bus);

        self.stats.messages_received += self.bus.drain::<MessageEvent>().len() as u64;
        self.stats.parse_failures += self.bus.drain::<ParseErrorEvent>().len() as u64;
        for ConnectionEvent(state) in self.bus.drain::<ConnectionEvent>() {
            self.stats.state = state;
            if state == ConnectionState::Disconnected {
                // Stores are torn down with the session's connection.
                self.receiver.clear();
            }
        }
        for LatencyEvent { rtt_ms, latency_ms } in self.bus.drain::<LatencyEvent>() {
            self.stats.rtt_ms = Some(rtt_ms);
            self.stats.latency_ms = Some(latency_ms);
        }
        for ServerErrorEvent(err) in self.bus.drain::<ServerErrorEvent>() {
            warn!(message = %err.message, "server error");
            self.stats.push_notice(err.message);
        }
        for InputAckEvent(ack) in self.bus.drain::<InputAckEvent>() {
            if let Some(seq) = ack.seq {
                self.stats.last_acked_seq = Some(seq);
            }
        }
        for SocketErrorEvent { message } in self.bus.drain::<SocketErrorEvent>() {
            info!(%message, "socket error surfaced");
        }

        Ok(())
    }

    /// Sends the discrete shoot action immediately, outside the sampling
    /// clock.
    pub async fn fire(&mut self) -> anyhow::Result<()> {
        let payload = self.controls.to_input(true);
        self.conn
            .send(MessageType::Input, &payload, &mut self.bus)
            .await
    }
}
