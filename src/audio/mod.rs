pub mod capture;
pub mod framer;

pub use capture::{CaptureBackend, MicrophoneBackend};
pub use framer::{
    AudioFramer, AudioPacket, PACKET_SAMPLES, QUANTA_PER_PACKET, QUANTUM_SAMPLES, SAMPLE_RATE,
};
