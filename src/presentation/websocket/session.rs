//! WebSocket Session Management

use std::time::{Duration, Instant};

/// Grace added to the heartbeat interval before a silent session is closed.
pub const HEARTBEAT_GRACE: Duration = Duration::from_secs(10);

/// Per-connection state owned by the connection task
#[derive(Debug)]
pub struct SessionState {
    pub user_id: i64,
    pub session_id: String,
    pub last_heartbeat: Instant,
}

impl SessionState {
    pub fn new(session_id: String, user_id: i64) -> Self {
        Self {
            user_id,
            session_id,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    /// Alive while the last heartbeat is within `interval` plus the grace.
    pub fn is_alive(&self, interval: Duration) -> bool {
        self.last_heartbeat.elapsed() < interval + HEARTBEAT_GRACE
    }
}
