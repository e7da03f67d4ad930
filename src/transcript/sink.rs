use tracing::error;

use crate::error::ChannelError;
use crate::protocol::TranscriptFragment;

/// Observer for transcript and session events.
///
/// Called from the session's inbound task; implementations should return
/// quickly and must not block.
pub trait ResultSink: Send + Sync {
    /// The ordered view changed. `view` is the full current view, sorted by
    /// start offset, one entry per utterance id.
    fn view_changed(&self, view: &[TranscriptFragment]);

    /// The service reported a non-fatal error; the session continues.
    fn remote_error(&self, message: &str) {
        error!("Service error: {}", message);
    }

    /// The channel failed mid-session. The view accumulated so far remains
    /// available from the controller.
    fn session_failed(&self, error: &ChannelError) {
        error!("Session failed: {}", error);
    }
}

/// Renders the view to the console: interim fragments overwrite the current
/// line, finalized ones get their own.
pub struct ConsoleSink;

impl ResultSink for ConsoleSink {
    fn view_changed(&self, view: &[TranscriptFragment]) {
        if let Some(last) = view.last() {
            if last.is_revisable() {
                print!("\r{}", last.text);
                std::io::Write::flush(&mut std::io::stdout()).ok();
            } else {
                println!("\r{}", last.text);
            }
        }
    }
}
