//! `arcade_shared`
//!
//! Libraries shared by the sync core and its test harnesses.
//!
//! Design goals:
//! - Closed, typed message protocol over a persistent socket.
//! - One normalization step at the wire boundary; typed data everywhere else.
//! - Clear separation of concerns (net, entity, events, config, math).
//! - No `unsafe`.

pub mod config;
pub mod entity;
pub mod event;
pub mod math;
pub mod net;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::entity::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::net::*;
}
