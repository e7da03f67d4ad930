pub mod audio;
pub mod auth;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transcript;

pub use audio::{
    AudioFramer, AudioPacket, CaptureBackend, MicrophoneBackend, PACKET_SAMPLES,
    QUANTA_PER_PACKET, QUANTUM_SAMPLES, SAMPLE_RATE,
};
pub use auth::{JwtTokenProvider, StaticTokenProvider, TokenProvider};
pub use config::Config;
pub use error::{AuthError, CaptureError, ChannelError, StartError, StopError};
pub use protocol::{
    ChannelConnector, ChannelHandle, InboundMessage, OutboundMessage, ProtocolConfig,
    ProtocolSession, PunctuationMode, SequencedChunkEncoder, SessionState, StreamDescriptor,
    TranscriptFragment, WebSocketConnector,
};
pub use session::{OutputGranularity, SessionConfig, SessionController, SessionStats};
pub use transcript::{ConsoleSink, ResultSink, TranscriptMerger};
