//! Transcript persistence

pub mod transcript_log;

pub use transcript_log::{JsonlTranscriptLog, MemoryTranscriptLog, TranscriptSink};
