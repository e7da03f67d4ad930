use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use super::config::{OutputGranularity, SessionConfig};
use super::stats::SessionStats;
use crate::audio::CaptureBackend;
use crate::auth::TokenProvider;
use crate::error::{ChannelError, StartError, StopError};
use crate::protocol::{
    ChannelConnector, InboundMessage, ProtocolSession, SequencedChunkEncoder, SessionState,
    TranscriptFragment,
};
use crate::transcript::{ResultSink, TranscriptMerger};

/// Credentials expiring within this margin are refreshed before connecting.
const TOKEN_VALIDITY_MARGIN: Duration = Duration::from_secs(5);

/// Orchestrates one live recording at a time: capture, protocol session,
/// and transcript merging behind a start/stop API.
///
/// Audio only flows once the session reaches STREAMING, `stop()` is
/// idempotent and always bounded, and the merged view survives both a
/// graceful stop and a mid-session channel failure.
pub struct SessionController {
    capture: Mutex<Box<dyn CaptureBackend>>,
    connector: Arc<dyn ChannelConnector>,
    tokens: Arc<dyn TokenProvider>,
    sink: Arc<dyn ResultSink>,

    /// The ordered transcript view. Written only by the inbound task of the
    /// active session; read as snapshots everywhere else.
    merger: Arc<StdMutex<TranscriptMerger>>,

    active: Mutex<Option<ActiveSession>>,
    last_state: StdMutex<SessionState>,
    fragments_received: Arc<AtomicUsize>,
}

struct ActiveSession {
    session: Arc<Mutex<ProtocolSession>>,
    started_at: chrono::DateTime<Utc>,
    forward_task: JoinHandle<()>,
    inbound_task: JoinHandle<()>,
}

impl SessionController {
    pub fn new(
        capture: Box<dyn CaptureBackend>,
        connector: Arc<dyn ChannelConnector>,
        tokens: Arc<dyn TokenProvider>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            capture: Mutex::new(capture),
            connector,
            tokens,
            sink,
            merger: Arc::new(StdMutex::new(TranscriptMerger::new())),
            active: Mutex::new(None),
            last_state: StdMutex::new(SessionState::Idle),
            fragments_received: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a recording session.
    ///
    /// Connects and configures the channel first; the microphone opens only
    /// after the session is STREAMING, so no audio is framed into a
    /// half-open channel.
    pub async fn start(&self, config: SessionConfig) -> Result<(), StartError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(StartError::AlreadyActive);
        }

        info!("Starting recording session: {}", config.session_id);

        if !self.tokens.valid_for(TOKEN_VALIDITY_MARGIN) {
            self.tokens.refresh().await?;
        }
        let bearer = self.tokens.bearer();

        let mut session = ProtocolSession::new(config.protocol_config());
        let inbound = session.connect(self.connector.as_ref(), &bearer).await?;

        let packets = {
            let mut capture = self.capture.lock().await;
            match capture.start().await {
                Ok(packets) => packets,
                Err(e) => {
                    // Tear the channel down again; no session survives a
                    // failed start.
                    session.mark_failed();
                    return Err(StartError::CaptureUnavailable(e));
                }
            }
        };

        self.merger.lock().expect("merger lock poisoned").clear();
        self.fragments_received.store(0, Ordering::SeqCst);
        *self.last_state.lock().expect("state lock poisoned") = SessionState::Streaming;

        let session = Arc::new(Mutex::new(session));

        // Outbound path: packets -> sequence-numbered chunks -> channel.
        // Ends when capture stops and the packet channel drains.
        let forward_session = Arc::clone(&session);
        let stream_id = config.primary_stream_id();
        let forward_task = tokio::spawn(async move {
            let mut packets = packets;
            let mut encoder = SequencedChunkEncoder::new(stream_id);
            while let Some(packet) = packets.recv().await {
                let chunk = encoder.encode(packet);
                forward_session.lock().await.send_chunk(chunk);
            }
            trace!("Audio forward task finished");
        });

        // Inbound path: the single execution context that mutates the view.
        let inbound_session = Arc::clone(&session);
        let merger = Arc::clone(&self.merger);
        let sink = Arc::clone(&self.sink);
        let fragments_received = Arc::clone(&self.fragments_received);
        let granularity = config.granularity;
        let inbound_task = tokio::spawn(async move {
            let mut inbound = inbound;
            while let Some(message) = inbound.recv().await {
                match message {
                    InboundMessage::AudioChunkAck { seq_id } => {
                        trace!("Chunk {} acknowledged", seq_id);
                    }
                    InboundMessage::ErrorMessage { message } => {
                        warn!("Service reported error: {}", message);
                        sink.remote_error(&message);
                    }
                    other => {
                        if let Some(fragment) = other.into_fragment() {
                            if granularity == OutputGranularity::FinalOnly && !fragment.is_final {
                                continue;
                            }
                            fragments_received.fetch_add(1, Ordering::SeqCst);
                            let snapshot = {
                                let mut merger =
                                    merger.lock().expect("merger lock poisoned");
                                merger.apply(fragment);
                                merger.snapshot()
                            };
                            sink.view_changed(&snapshot);
                        }
                    }
                }
            }

            // Inbound stream gone: either we are shutting down, or the
            // channel died under us.
            let mut session = inbound_session.lock().await;
            if !matches!(
                session.state(),
                SessionState::Ending | SessionState::Closed | SessionState::Failed
            ) {
                warn!("Channel closed unexpectedly");
                session.mark_failed();
                sink.session_failed(&ChannelError::Closed);
            }
        });

        *active = Some(ActiveSession {
            session,
            started_at: Utc::now(),
            forward_task,
            inbound_task,
        });

        info!("Recording session started");
        Ok(())
    }

    /// Stop the active session, if any. Idempotent, and always completes
    /// within the configured ENDING bound.
    pub async fn stop(&self) -> Result<(), StopError> {
        let mut active = self.active.lock().await;
        let Some(running) = active.take() else {
            return Ok(());
        };

        info!("Stopping recording session");

        // Release the microphone first. The packet channel closes behind
        // it, which drains and finishes the forward task.
        let capture_result = {
            let mut capture = self.capture.lock().await;
            capture.stop().await
        };
        if let Err(e) = running.forward_task.await {
            warn!("Audio forward task panicked: {}", e);
        }

        // Graceful shutdown with a bounded wait for the remote close.
        {
            let mut session = running.session.lock().await;
            session.end().await;
            *self.last_state.lock().expect("state lock poisoned") = session.state();
        }

        // The inbound task ends once the channel reader stops; if the
        // remote never closes, it is parked on an empty queue. Cancel it.
        running.inbound_task.abort();
        let _ = running.inbound_task.await;

        info!("Recording session stopped");
        capture_result.map_err(StopError::Capture)
    }

    /// Whether a session is currently running.
    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Protocol state of the active session, or the final state of the
    /// last one.
    pub async fn state(&self) -> SessionState {
        let active = self.active.lock().await;
        match &*active {
            Some(running) => running.session.lock().await.state(),
            None => *self.last_state.lock().expect("state lock poisoned"),
        }
    }

    /// Snapshot of the ordered transcript view. Preserved across stop and
    /// failure until the next `start`.
    pub fn transcript(&self) -> Vec<TranscriptFragment> {
        self.merger.lock().expect("merger lock poisoned").snapshot()
    }

    /// Concatenated transcript text, for downstream note generation.
    pub fn transcript_text(&self) -> String {
        self.merger
            .lock()
            .expect("merger lock poisoned")
            .full_text()
    }

    /// Get current session statistics
    pub async fn stats(&self) -> SessionStats {
        let active = self.active.lock().await;
        match &*active {
            Some(running) => {
                let session = running.session.lock().await;
                let duration = Utc::now().signed_duration_since(running.started_at);
                SessionStats {
                    state: session.state(),
                    started_at: Some(running.started_at),
                    duration_secs: duration.num_milliseconds() as f64 / 1000.0,
                    chunks_sent: session.chunks_sent(),
                    chunks_dropped: session.chunks_dropped(),
                    fragments_received: self.fragments_received.load(Ordering::SeqCst),
                }
            }
            None => SessionStats {
                state: *self.last_state.lock().expect("state lock poisoned"),
                started_at: None,
                duration_secs: 0.0,
                chunks_sent: 0,
                chunks_dropped: 0,
                fragments_received: self.fragments_received.load(Ordering::SeqCst),
            },
        }
    }
}
