use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::framer::{AudioFramer, AudioPacket, SAMPLE_RATE};
use crate::error::CaptureError;

/// Depth of the packet handoff queue between the capture callback and the
/// sending path. When the sender falls behind, new packets are dropped
/// rather than buffered (lossy under backpressure).
const PACKET_QUEUE_DEPTH: usize = 32;

/// Audio capture backend trait
///
/// Implementations:
/// - `MicrophoneBackend`: default input device via cpal (all platforms)
/// - test doubles that feed synthetic packets
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive framed packets.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioPacket>, CaptureError>;

    /// Stop capturing and release the device. Any partially-filled packet
    /// is discarded.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Microphone capture through cpal.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread
/// for the duration of the capture; the async side only exchanges messages
/// with it. The capture callback does nothing but sample conversion and a
/// non-blocking queue push.
pub struct MicrophoneBackend {
    running: Option<RunningCapture>,
}

struct RunningCapture {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: std::thread::JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new() -> Self {
        Self { running: None }
    }
}

impl Default for MicrophoneBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioPacket>, CaptureError> {
        if self.running.is_some() {
            return Err(CaptureError::Unavailable("capture already running".into()));
        }

        let (packet_tx, packet_rx) = mpsc::channel(PACKET_QUEUE_DEPTH);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let thread = std::thread::spawn(move || {
            let stream = match build_input_stream(packet_tx) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(CaptureError::Unavailable(e.to_string())));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            // Park until stop; dropping the stream releases the device and
            // discards whatever partial packet the framer held.
            let _ = stop_rx.recv();
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.running = Some(RunningCapture { stop_tx, thread });
                Ok(packet_rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => Err(CaptureError::Unavailable(
                "capture thread exited before ready".into(),
            )),
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if let Some(running) = self.running.take() {
            let _ = running.stop_tx.send(());
            let thread = running.thread;
            tokio::task::spawn_blocking(move || {
                if thread.join().is_err() {
                    warn!("Capture thread panicked during shutdown");
                }
            })
            .await
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.running.is_some()
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

fn build_input_stream(packet_tx: mpsc::Sender<AudioPacket>) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoDevice)?;

    info!(
        "Audio input device: {}",
        device.name().unwrap_or_else(|_| "<unknown>".into())
    );

    // The service expects 16 kHz; find a supported config covering that rate.
    let ranges = device
        .supported_input_configs()
        .map_err(|e| CaptureError::Unavailable(e.to_string()))?;
    let config = ranges
        .into_iter()
        .find(|range| {
            range.min_sample_rate().0 <= SAMPLE_RATE && range.max_sample_rate().0 >= SAMPLE_RATE
        })
        .ok_or(CaptureError::UnsupportedFormat)?
        .with_sample_rate(cpal::SampleRate(SAMPLE_RATE));

    let channels = config.channels() as usize;
    info!(
        "Audio config selected: rate={}Hz, channels={}",
        SAMPLE_RATE, channels
    );

    let err_fn = |err| warn!("Audio stream error: {}", err);
    let mut framer = AudioFramer::new();

    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device
            .build_input_stream(
                &config.into(),
                move |data: &[f32], _: &_| {
                    push_mono(data, channels, &mut framer, &packet_tx);
                },
                err_fn,
                None,
            )
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?,
        cpal::SampleFormat::I16 => device
            .build_input_stream(
                &config.into(),
                move |data: &[i16], _: &_| {
                    // Convert to f32 before framing so one conversion path
                    // owns the rounding behavior.
                    let as_f32: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    push_mono(&as_f32, channels, &mut framer, &packet_tx);
                },
                err_fn,
                None,
            )
            .map_err(|e| CaptureError::Unavailable(e.to_string()))?,
        other => {
            return Err(CaptureError::Unavailable(format!(
                "unsupported sample format: {other:?}"
            )))
        }
    };

    Ok(stream)
}

/// Runs on the real-time callback: de-interleave to channel 0, frame, and
/// hand completed packets off without blocking. A full queue drops the
/// packet.
fn push_mono(
    data: &[f32],
    channels: usize,
    framer: &mut AudioFramer,
    packet_tx: &mpsc::Sender<AudioPacket>,
) {
    let emit = |packet: AudioPacket| {
        if let Err(mpsc::error::TrySendError::Full(_)) = packet_tx.try_send(packet) {
            warn!("Packet queue full, dropping audio packet");
        }
    };

    if channels <= 1 {
        framer.push_samples(data, emit);
    } else {
        let mono: Vec<f32> = data.iter().step_by(channels).copied().collect();
        framer.push_samples(&mono, emit);
    }
}
