//! Incremental transcript merging and observation.

pub mod merger;
pub mod sink;

pub use merger::TranscriptMerger;
pub use sink::{ConsoleSink, ResultSink};
