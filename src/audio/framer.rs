//! Fixed-size packet framing for the real-time capture path.
//!
//! The platform callback delivers small quanta of f32 samples; the framer
//! accumulates them into wire-sized 16-bit PCM packets. Everything here is
//! plain arithmetic so it is safe to run inside the capture callback.

/// Samples per capture quantum delivered by the platform callback.
pub const QUANTUM_SAMPLES: usize = 128;

/// Quanta accumulated per packet. Keeps each packet short enough for a
/// live transcription service (a packet roughly every 100 ms is typical).
pub const QUANTA_PER_PACKET: usize = 24;

/// Samples per emitted packet.
pub const PACKET_SAMPLES: usize = QUANTUM_SAMPLES * QUANTA_PER_PACKET;

/// Capture sample rate expected by the transcription service.
pub const SAMPLE_RATE: u32 = 16_000;

/// One fixed-size buffer of signed 16-bit little-endian mono samples.
///
/// Immutable once produced; consumed exactly once by the outbound encoder.
#[derive(Debug, Clone)]
pub struct AudioPacket {
    samples: Vec<i16>,
}

impl AudioPacket {
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Little-endian byte view, ready for wire encoding.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Accumulates float quanta into fixed-size i16 packets.
///
/// Partial buffers are discarded when the framer is dropped at stop time:
/// at most one packet's worth of trailing audio is lost, in exchange for
/// never flushing a short packet.
pub struct AudioFramer {
    packet_samples: usize,
    accumulator: Vec<i16>,
}

impl AudioFramer {
    pub fn new() -> Self {
        Self::with_packet_samples(PACKET_SAMPLES)
    }

    pub fn with_packet_samples(packet_samples: usize) -> Self {
        Self {
            packet_samples,
            accumulator: Vec::with_capacity(packet_samples),
        }
    }

    /// Feed captured samples, invoking `emit` for every packet completed.
    ///
    /// Input slices need not align with packet boundaries; a large capture
    /// buffer may complete more than one packet.
    pub fn push_samples(&mut self, samples: &[f32], mut emit: impl FnMut(AudioPacket)) {
        for &sample in samples {
            self.accumulator.push(convert_sample(sample));
            if self.accumulator.len() == self.packet_samples {
                let full = std::mem::replace(
                    &mut self.accumulator,
                    Vec::with_capacity(self.packet_samples),
                );
                emit(AudioPacket { samples: full });
            }
        }
    }

    /// Samples currently buffered and not yet emitted.
    pub fn pending_samples(&self) -> usize {
        self.accumulator.len()
    }
}

impl Default for AudioFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// f32 in [-1.0, 1.0] to i16, rounding and clamping out-of-range input.
fn convert_sample(sample: f32) -> i16 {
    (sample * 32767.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
