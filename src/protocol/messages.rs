use serde::{Deserialize, Serialize};

/// One incremental transcription result.
///
/// Several fragments may arrive for the same `id`: later arrivals are
/// revisions of the same utterance, interim (`is_final == false`) until the
/// service commits the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub id: String,
    pub start_offset_ms: u64,
    pub end_offset_ms: u64,
    pub text: String,
    pub is_final: bool,
}

impl TranscriptFragment {
    /// Whether a later revision for this fragment is still expected.
    pub fn is_revisable(&self) -> bool {
        !self.is_final
    }
}

/// Named audio stream declared in the CONFIG message. One per simultaneous
/// speaker/source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub id: String,
    pub speaker_type: String,
}

impl StreamDescriptor {
    pub fn unspecified(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            speaker_type: "unspecified".to_string(),
        }
    }
}

/// Punctuation handling requested in the CONFIG message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PunctuationMode {
    #[serde(rename = "AUTOMATIC")]
    Automatic,
    /// The speaker dictates punctuation marks explicitly.
    #[serde(rename = "EXPLICIT")]
    Explicit,
}

/// Messages sent to the transcription service.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "CONFIG")]
    Config {
        encoding: String,
        sample_rate: u32,
        /// One locale, or two for bilingual capture. Order is preserved.
        speech_locales: Vec<String>,
        streams: Vec<StreamDescriptor>,
        #[serde(skip_serializing_if = "Option::is_none")]
        punctuation_mode: Option<PunctuationMode>,
        enable_audio_chunk_ack: bool,
    },
    #[serde(rename = "AUDIO_CHUNK")]
    AudioChunk {
        /// Base64 of the little-endian i16 packet.
        payload: String,
        stream_id: String,
        seq_id: u64,
    },
    #[serde(rename = "END")]
    End,
}

/// Messages received from the transcription service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// Advisory flow-accounting acknowledgement.
    #[serde(rename = "AUDIO_CHUNK_ACK")]
    AudioChunkAck { seq_id: u64 },

    #[serde(rename = "TRANSCRIPT_ITEM")]
    TranscriptItem(TranscriptFragment),

    /// Same payload as a transcript item; emitted by dictation endpoints.
    #[serde(rename = "DICTATION_ITEM")]
    DictationItem(TranscriptFragment),

    /// Service-reported error. Non-fatal to the channel.
    #[serde(rename = "ERROR_MESSAGE")]
    ErrorMessage { message: String },
}

impl InboundMessage {
    /// The fragment carried by this message, if any.
    pub fn into_fragment(self) -> Option<TranscriptFragment> {
        match self {
            InboundMessage::TranscriptItem(f) | InboundMessage::DictationItem(f) => Some(f),
            _ => None,
        }
    }
}
