use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::protocol::SessionState;

/// Statistics about a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current (or last) protocol state
    pub state: SessionState,

    /// When the session started, if one was ever started
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since the session started
    pub duration_secs: f64,

    /// Audio chunks sent on the channel
    pub chunks_sent: u64,

    /// Audio chunks dropped under backpressure
    pub chunks_dropped: u64,

    /// Transcript fragments applied to the view
    pub fragments_received: usize,
}
