// Shared test doubles: an in-process message channel, a scriptable capture
// backend, and a sink that records everything it sees.

#![allow(dead_code)]

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use scribe_stream::{
    AudioFramer, AudioPacket, CaptureBackend, CaptureError, ChannelConnector, ChannelError,
    ChannelHandle, InboundMessage, OutboundMessage, ResultSink, TranscriptFragment,
};
use tokio::sync::{mpsc, watch};

/// The service side of a mock channel: inspect what the client sent, inject
/// inbound messages, and close the channel by flipping `open_tx`.
pub struct MockRemote {
    pub outbound_rx: mpsc::Receiver<OutboundMessage>,
    pub inbound_tx: mpsc::Sender<InboundMessage>,
    pub open_tx: watch::Sender<bool>,
}

/// Connector handing out one pre-built in-process channel.
pub struct MockConnector {
    handle: StdMutex<Option<ChannelHandle>>,
    connect_delay: Option<Duration>,
    pub last_bearer: StdMutex<Option<String>>,
}

impl MockConnector {
    pub fn new() -> (Self, MockRemote) {
        Self::with_delay(None)
    }

    /// A connector that takes `delay` to hand the channel over, for
    /// exercising the connect timeout.
    pub fn slow(delay: Duration) -> (Self, MockRemote) {
        Self::with_delay(Some(delay))
    }

    fn with_delay(connect_delay: Option<Duration>) -> (Self, MockRemote) {
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (open_tx, open_rx) = watch::channel(true);

        let connector = Self {
            handle: StdMutex::new(Some(ChannelHandle::from_parts(
                outbound_tx,
                inbound_rx,
                open_rx,
            ))),
            connect_delay,
            last_bearer: StdMutex::new(None),
        };
        let remote = MockRemote {
            outbound_rx,
            inbound_tx,
            open_tx,
        };
        (connector, remote)
    }
}

#[async_trait::async_trait]
impl ChannelConnector for MockConnector {
    async fn connect(&self, bearer_token: &str) -> Result<ChannelHandle, ChannelError> {
        *self.last_bearer.lock().unwrap() = Some(bearer_token.to_string());
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        self.handle
            .lock()
            .unwrap()
            .take()
            .ok_or(ChannelError::Handshake("channel already taken".into()))
    }
}

/// Handle the test keeps to feed packets into a `MockCapture` after it has
/// been handed to the controller.
pub type PacketFeed = Arc<StdMutex<Option<mpsc::Sender<AudioPacket>>>>;

/// Capture backend producing whatever the test pushes through its feed.
pub struct MockCapture {
    feed: PacketFeed,
    running: bool,
    fail_on_start: bool,
}

impl MockCapture {
    pub fn new() -> (Self, PacketFeed) {
        let feed: PacketFeed = Arc::new(StdMutex::new(None));
        (
            Self {
                feed: Arc::clone(&feed),
                running: false,
                fail_on_start: false,
            },
            feed,
        )
    }

    /// A backend whose start always fails, as if no microphone existed.
    pub fn unavailable() -> Self {
        Self {
            feed: Arc::new(StdMutex::new(None)),
            running: false,
            fail_on_start: true,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MockCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioPacket>, CaptureError> {
        if self.fail_on_start {
            return Err(CaptureError::NoDevice);
        }
        let (tx, rx) = mpsc::channel(32);
        *self.feed.lock().unwrap() = Some(tx);
        self.running = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        self.feed.lock().unwrap().take();
        self.running = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running
    }

    fn name(&self) -> &str {
        "mock capture"
    }
}

/// Build one packet's worth of audio through the framer.
pub fn make_packet(samples: usize, value: f32) -> AudioPacket {
    let mut framer = AudioFramer::with_packet_samples(samples);
    let mut packet = None;
    framer.push_samples(&vec![value; samples], |p| packet = Some(p));
    packet.expect("framer did not complete a packet")
}

/// Push one small packet through a capture feed.
pub async fn feed_packet(feed: &PacketFeed) {
    let tx = feed
        .lock()
        .unwrap()
        .as_ref()
        .expect("capture not started")
        .clone();
    tx.send(make_packet(4, 0.25)).await.expect("feed closed");
}

/// Sink recording every notification it receives.
#[derive(Default)]
pub struct CollectSink {
    pub views: StdMutex<Vec<Vec<TranscriptFragment>>>,
    pub remote_errors: StdMutex<Vec<String>>,
    pub failures: StdMutex<Vec<String>>,
}

impl ResultSink for CollectSink {
    fn view_changed(&self, view: &[TranscriptFragment]) {
        self.views.lock().unwrap().push(view.to_vec());
    }

    fn remote_error(&self, message: &str) {
        self.remote_errors.lock().unwrap().push(message.to_string());
    }

    fn session_failed(&self, error: &ChannelError) {
        self.failures.lock().unwrap().push(error.to_string());
    }
}

pub fn fragment(
    id: &str,
    start_offset_ms: u64,
    end_offset_ms: u64,
    text: &str,
    is_final: bool,
) -> TranscriptFragment {
    TranscriptFragment {
        id: id.to_string(),
        start_offset_ms,
        end_offset_ms,
        text: text.to_string(),
        is_final,
    }
}
