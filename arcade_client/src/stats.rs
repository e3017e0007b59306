//! Network statistics.
//!
//! Mirror of connection state and heartbeat measurements for the HUD,
//! plus a bounded queue of transient notices for server-reported errors.

use std::collections::VecDeque;

use crate::connection::ConnectionState;

const MAX_NOTICES: usize = 8;

#[derive(Debug)]
pub struct NetworkStats {
    pub state: ConnectionState,
    pub rtt_ms: Option<i64>,
    pub latency_ms: Option<f64>,
    pub messages_received: u64,
    pub parse_failures: u64,
    pub last_acked_seq: Option<u32>,
    notices: VecDeque<String>,
}

impl Default for NetworkStats {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            rtt_ms: None,
            latency_ms: None,
            messages_received: 0,
            parse_failures: 0,
            last_acked_seq: None,
            notices: VecDeque::new(),
        }
    }
}

impl NetworkStats {
    /// Records a transient notice (server ERROR messages). Oldest notices
    /// fall off once the queue is full.
    pub fn push_notice(&mut self, message: String) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(message);
    }

    /// Hands the queued notices to the UI collaborator.
    pub fn drain_notices(&mut self) -> Vec<String> {
        self.notices.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_are_bounded() {
        let mut stats = NetworkStats::default();
        for i in 0..20 {
            stats.push_notice(format!("err {i}"));
        }
        let notices = stats.drain_notices();
        assert_eq!(notices.len(), MAX_NOTICES);
        assert_eq!(notices[0], "err 12");
        assert!(stats.drain_notices().is_empty());
    }
}
