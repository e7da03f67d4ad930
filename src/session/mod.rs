//! Recording session orchestration
//!
//! This module provides the `SessionController` abstraction that manages:
//! - Microphone capture and packet framing
//! - The connection-oriented protocol session
//! - Transcript merging and observer notification
//! - Session statistics and state

mod config;
mod controller;
mod stats;

pub use config::{OutputGranularity, SessionConfig};
pub use controller::SessionController;
pub use stats::SessionStats;
