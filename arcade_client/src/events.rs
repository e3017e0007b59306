//! Events published on the bus.
//!
//! One struct per event kind; the router publishes the message-derived
//! ones, the connection manager the lifecycle ones. Consumers drain by
//! type, so nothing here knows who listens.

use arcade_shared::entity::RawEntity;
use arcade_shared::net::{
    Envelope, EntityDestroyData, ErrorData, InputAckData, PingData, StateData, StateDeltaData,
};

use crate::connection::ConnectionState;

/// Every successfully parsed inbound envelope, regardless of type.
pub struct MessageEvent(pub Envelope);

/// Full authoritative snapshot (STATE).
pub struct StateEvent(pub StateData);

/// Incremental snapshot (STATE_DELTA).
pub struct StateDeltaEvent(pub StateDeltaData);

/// Individually announced entity (ENTITY_SPAWN).
pub struct EntitySpawnEvent(pub RawEntity);

/// Individually announced destruction (ENTITY_DESTROY).
pub struct EntityDestroyEvent(pub EntityDestroyData);

/// PONG echo, matched against the pending ping by the connection manager.
pub struct PongEvent(pub PingData);

/// Server-reported error; surfaced as a transient notice, not a fault.
pub struct ServerErrorEvent(pub ErrorData);

pub struct InputAckEvent(pub InputAckData);

/// Connection state transition.
pub struct ConnectionEvent(pub ConnectionState);

/// Socket-level error. Does not itself change state; the close path does.
pub struct SocketErrorEvent {
    pub message: String,
}

/// Inbound frame or payload that failed to parse. Details are already
/// logged by the router; this only feeds the stats counter.
pub struct ParseErrorEvent;

/// Round-trip measurement from a matched PING/PONG pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyEvent {
    pub rtt_ms: i64,
    /// Half the round trip.
    pub latency_ms: f64,
}
