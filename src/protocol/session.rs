use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{info, warn};

use super::channel::{ChannelConnector, ChannelHandle};
use super::messages::{InboundMessage, OutboundMessage, PunctuationMode, StreamDescriptor};
use crate::audio::SAMPLE_RATE;
use crate::error::{ChannelError, StartError};

/// Connection lifecycle. `Closed` and `Failed` are terminal: a new
/// recording requires a brand-new session, never a reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Idle,
    Connecting,
    Configured,
    Streaming,
    Ending,
    Closed,
    Failed,
}

/// Protocol-level configuration: what goes into the CONFIG message plus
/// the two lifecycle bounds.
#[derive(Debug, Clone)]
pub struct ProtocolConfig {
    /// One locale, or two for bilingual recognition. Order is preserved on
    /// the wire.
    pub speech_locales: Vec<String>,
    pub streams: Vec<StreamDescriptor>,
    pub punctuation_mode: Option<PunctuationMode>,
    /// Bound on CONNECTING. The channel must be open and ready within this
    /// window or the session fails.
    pub connect_timeout: Duration,
    /// Bound on ENDING. If the remote has not closed the channel by then,
    /// the session force-closes locally so `stop()` always finishes.
    pub end_wait: Duration,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            speech_locales: vec!["ENGLISH_US".to_string()],
            streams: vec![StreamDescriptor::unspecified("stream1")],
            punctuation_mode: None,
            connect_timeout: Duration::from_secs(1),
            end_wait: Duration::from_secs(5),
        }
    }
}

impl ProtocolConfig {
    fn config_message(&self) -> OutboundMessage {
        OutboundMessage::Config {
            encoding: "PCM_S16LE".to_string(),
            sample_rate: SAMPLE_RATE,
            speech_locales: self.speech_locales.clone(),
            streams: self.streams.clone(),
            punctuation_mode: self.punctuation_mode,
            enable_audio_chunk_ack: true,
        }
    }
}

/// Drives one connection through its lifecycle:
///
/// ```text
/// IDLE -> CONNECTING -> CONFIGURED -> STREAMING -> ENDING -> CLOSED
///            |               |            |           |
///            +---------------+------------+-----------+--> FAILED
/// ```
///
/// Owned and mutated by a single task; nothing here is internally
/// synchronized.
pub struct ProtocolSession {
    config: ProtocolConfig,
    state: SessionState,
    outbound: Option<mpsc::Sender<OutboundMessage>>,
    open: Option<watch::Receiver<bool>>,
    chunks_sent: u64,
    chunks_dropped: u64,
}

impl ProtocolSession {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            outbound: None,
            open: None,
            chunks_sent: 0,
            chunks_dropped: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chunks_sent(&self) -> u64 {
        self.chunks_sent
    }

    pub fn chunks_dropped(&self) -> u64 {
        self.chunks_dropped
    }

    fn is_open(&self) -> bool {
        self.open.as_ref().map(|o| *o.borrow()).unwrap_or(false)
    }

    /// Open the channel and send the configuration message.
    ///
    /// On success the session is STREAMING and the returned receiver
    /// carries the service's inbound messages. On any failure the session
    /// is FAILED and must be discarded.
    pub async fn connect(
        &mut self,
        connector: &dyn ChannelConnector,
        bearer_token: &str,
    ) -> Result<mpsc::Receiver<InboundMessage>, StartError> {
        if self.state != SessionState::Idle {
            return Err(StartError::AlreadyActive);
        }
        self.state = SessionState::Connecting;

        let handle = match timeout(
            self.config.connect_timeout,
            connector.connect(bearer_token),
        )
        .await
        {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                self.state = SessionState::Failed;
                return Err(StartError::Channel(e));
            }
            Err(_) => {
                self.state = SessionState::Failed;
                return Err(StartError::ConnectTimeout);
            }
        };

        let ChannelHandle {
            outbound,
            inbound,
            open,
        } = handle;
        self.state = SessionState::Configured;

        if outbound.send(self.config.config_message()).await.is_err() {
            self.state = SessionState::Failed;
            return Err(StartError::Channel(ChannelError::Closed));
        }

        self.outbound = Some(outbound);
        self.open = Some(open);

        // The service starts transcribing as soon as CONFIG is in; there is
        // no explicit ack to wait for.
        self.state = SessionState::Streaming;
        info!("Session streaming ({} locale(s))", self.config.speech_locales.len());

        Ok(inbound)
    }

    /// Forward one audio chunk. Outside STREAMING, or when the send queue
    /// is full, the chunk is dropped: freshness over completeness.
    pub fn send_chunk(&mut self, chunk: OutboundMessage) {
        if self.state != SessionState::Streaming {
            return;
        }
        if !self.is_open() {
            warn!("Channel closed mid-stream");
            self.mark_failed();
            return;
        }

        let outbound = match &self.outbound {
            Some(outbound) => outbound,
            None => return,
        };
        match outbound.try_send(chunk) {
            Ok(()) => self.chunks_sent += 1,
            Err(TrySendError::Full(_)) => {
                self.chunks_dropped += 1;
                warn!("Outbound queue full, dropping chunk");
            }
            Err(TrySendError::Closed(_)) => self.mark_failed(),
        }
    }

    /// Graceful shutdown: send END once, then wait (bounded) for the remote
    /// to close the channel. Always finishes within `end_wait`.
    pub async fn end(&mut self) {
        match self.state {
            SessionState::Configured | SessionState::Streaming => {}
            _ => return,
        }
        self.state = SessionState::Ending;

        if let Some(outbound) = &self.outbound {
            if outbound.send(OutboundMessage::End).await.is_err() {
                warn!("Channel already gone before END");
            }
        }

        if let Some(open) = &mut self.open {
            match timeout(self.config.end_wait, open.wait_for(|open| !*open)).await {
                Ok(_) => info!("Remote closed the channel"),
                Err(_) => warn!(
                    "Remote did not close within {:?}, forcing local close",
                    self.config.end_wait
                ),
            }
        }

        // Dropping the sender tears the transport down.
        self.outbound = None;
        self.open = None;
        self.state = SessionState::Closed;
        info!(
            "Session closed ({} chunks sent, {} dropped)",
            self.chunks_sent, self.chunks_dropped
        );
    }

    /// Record an unexpected channel failure. Terminal; resources are
    /// released immediately.
    pub fn mark_failed(&mut self) {
        if matches!(self.state, SessionState::Closed | SessionState::Failed) {
            return;
        }
        self.state = SessionState::Failed;
        self.outbound = None;
        self.open = None;
    }
}
