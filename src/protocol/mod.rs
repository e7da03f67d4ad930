//! Connection-oriented protocol: wire messages, chunk sequencing, the
//! channel abstraction, and the session state machine.

pub mod channel;
pub mod encoder;
pub mod messages;
pub mod session;

pub use channel::{ChannelConnector, ChannelHandle, WebSocketConnector};
pub use encoder::SequencedChunkEncoder;
pub use messages::{
    InboundMessage, OutboundMessage, PunctuationMode, StreamDescriptor, TranscriptFragment,
};
pub use session::{ProtocolConfig, ProtocolSession, SessionState};
