//! `arcade_client`
//!
//! The multiplayer sync core:
//! - Connection lifecycle state machine with heartbeat/latency measurement
//! - Typed message routing from socket frames onto the event bus
//! - Generic per-kind entity reconciliation against authoritative snapshots
//! - Fixed-rate input sampling
//!
//! Rendering, physics, and HUD are collaborators behind the per-kind
//! presenter traits in [`kinds`]; nothing here touches geometry or
//! materials.

pub mod connection;
pub mod events;
pub mod input;
pub mod kinds;
pub mod receiver;
pub mod reconcile;
pub mod router;
pub mod session;
pub mod stats;

pub use session::GameSession;
