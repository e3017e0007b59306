//! Input sampling.
//!
//! Control state is written by the platform layer (keyboard/mouse capture
//! is a collaborator, not part of the core); the sampler snapshots it on
//! its own fixed-rate clock, independent of the render/physics tick, and
//! turns it into INPUT payloads.
//!
//! Firing is not sampled: it goes out as a discrete INPUT at the moment of
//! the triggering input (see `GameSession::fire`).

use std::time::{Duration, Instant};

use arcade_shared::math::Vec3;
use arcade_shared::net::{ActionsData, InputData, RotationData};
use bitflags::bitflags;

bitflags! {
    /// Held movement buttons.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveButtons: u8 {
        const FORWARD  = 1 << 0;
        const BACKWARD = 1 << 1;
        const LEFT     = 1 << 2;
        const RIGHT    = 1 << 3;
        const UP       = 1 << 4;
        const DOWN     = 1 << 5;
    }
}

/// Current control flags and orientation angles, in radians.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlState {
    pub buttons: MoveButtons,
    pub pitch: f64,
    pub yaw: f64,
}

impl ControlState {
    /// Movement axes with each held button contributing ±1; any
    /// normalization is the consumer's business. Forward is −z, up is +y,
    /// right is +x.
    pub fn movement_vector(&self) -> Vec3 {
        let mut mv = Vec3::ZERO;
        if self.buttons.contains(MoveButtons::FORWARD) {
            mv.z -= 1.0;
        }
        if self.buttons.contains(MoveButtons::BACKWARD) {
            mv.z += 1.0;
        }
        if self.buttons.contains(MoveButtons::LEFT) {
            mv.x -= 1.0;
        }
        if self.buttons.contains(MoveButtons::RIGHT) {
            mv.x += 1.0;
        }
        if self.buttons.contains(MoveButtons::UP) {
            mv.y += 1.0;
        }
        if self.buttons.contains(MoveButtons::DOWN) {
            mv.y -= 1.0;
        }
        mv
    }

    /// Builds an INPUT payload from the current state.
    pub fn to_input(&self, shoot: bool) -> InputData {
        InputData {
            movement: self.movement_vector(),
            rotation: RotationData {
                pitch: self.pitch,
                yaw: self.yaw,
            },
            actions: ActionsData { shoot },
        }
    }
}

/// Fixed-rate clock for the periodic input send. Keeps ticking while
/// disconnected; the connection manager drops the resulting sends.
pub struct InputSampler {
    interval: Duration,
    next_at: Option<Instant>,
}

impl InputSampler {
    pub fn new(rate_hz: u32) -> Self {
        let rate_hz = rate_hz.max(1);
        Self {
            interval: Duration::from_secs_f64(1.0 / rate_hz as f64),
            next_at: None,
        }
    }

    pub fn start(&mut self) {
        self.next_at = Some(Instant::now() + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_at.is_some()
    }

    /// True once per elapsed interval.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.next_at {
            Some(at) if now >= at => {
                self.next_at = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    /// Snapshots the controls into the periodic payload.
    pub fn sample(&self, controls: &ControlState) -> InputData {
        controls.to_input(false)
    }
}
