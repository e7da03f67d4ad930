use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::{ProtocolConfig, PunctuationMode, StreamDescriptor};

/// Which results the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputGranularity {
    /// Interim fragments plus their final revisions (live display).
    InterimAndFinal,
    /// Only finalized fragments reach the view.
    FinalOnly,
}

/// Configuration for a recording session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier, for logging and correlation
    pub session_id: String,

    /// Recognition locale(s); two entries enable bilingual capture.
    /// Wire order follows this order.
    pub speech_locales: Vec<String>,

    /// Named audio streams. The default microphone feeds the first one.
    pub streams: Vec<StreamDescriptor>,

    /// Whether the speaker dictates punctuation explicitly
    pub punctuation_mode: Option<PunctuationMode>,

    /// Interim+final (default) or final-only results
    pub granularity: OutputGranularity,

    /// Bound on waiting for the channel to open
    pub connect_timeout: Duration,

    /// Bound on waiting for the remote to close after END
    pub end_wait: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            speech_locales: vec!["ENGLISH_US".to_string()],
            streams: vec![StreamDescriptor::unspecified("stream1")],
            punctuation_mode: None,
            granularity: OutputGranularity::InterimAndFinal,
            connect_timeout: Duration::from_secs(1),
            end_wait: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    pub(crate) fn protocol_config(&self) -> ProtocolConfig {
        ProtocolConfig {
            speech_locales: self.speech_locales.clone(),
            streams: self.streams.clone(),
            punctuation_mode: self.punctuation_mode,
            connect_timeout: self.connect_timeout,
            end_wait: self.end_wait,
        }
    }

    /// Stream id audio chunks are tagged with.
    pub(crate) fn primary_stream_id(&self) -> String {
        self.streams
            .first()
            .map(|s| s.id.clone())
            .unwrap_or_else(|| "stream1".to_string())
    }
}
