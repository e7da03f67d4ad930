use base64::Engine;

use super::messages::OutboundMessage;
use crate::audio::AudioPacket;

/// Wraps audio packets into sequence-numbered wire chunks.
///
/// Sequence ids are monotonic from 0 and scoped to one session: a new
/// session gets a new encoder. Ids are global across streams, not
/// per-stream. Packets are encoded in submission order; the encoder never
/// reorders or resends.
pub struct SequencedChunkEncoder {
    stream_id: String,
    next_seq_id: u64,
}

impl SequencedChunkEncoder {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            next_seq_id: 0,
        }
    }

    /// Consume one packet, producing the wire message carrying it.
    pub fn encode(&mut self, packet: AudioPacket) -> OutboundMessage {
        let seq_id = self.next_seq_id;
        self.next_seq_id += 1;

        OutboundMessage::AudioChunk {
            payload: base64::engine::general_purpose::STANDARD.encode(packet.to_le_bytes()),
            stream_id: self.stream_id.clone(),
            seq_id,
        }
    }

    /// Number of chunks encoded so far.
    pub fn chunks_encoded(&self) -> u64 {
        self.next_seq_id
    }
}
