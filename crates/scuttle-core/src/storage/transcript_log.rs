//! Durable transcript persistence.
//!
//! The runner hands the sink the full transcript exactly once, at session
//! end. The write is awaited and failures abort the run; the returned entry
//! count exists for sink implementations and is ignored by the loop.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs;
use tracing::debug;

use crate::ai::TranscriptEntry;
use crate::error::AgentError;

/// Sink for completed session transcripts.
#[async_trait]
pub trait TranscriptSink: Send + Sync {
    /// Persist the transcript recorded for `agent_id`. Returns the number of
    /// entries written.
    async fn persist(
        &self,
        agent_id: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<usize, AgentError>;
}

/// Writes one JSON line per entry to `<dir>/<agent_id>.jsonl`, replacing any
/// earlier file for the same session.
pub struct JsonlTranscriptLog {
    dir: PathBuf,
}

impl JsonlTranscriptLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, agent_id: &str) -> PathBuf {
        self.dir.join(format!("{agent_id}.jsonl"))
    }
}

#[async_trait]
impl TranscriptSink for JsonlTranscriptLog {
    async fn persist(
        &self,
        agent_id: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<usize, AgentError> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating transcript dir {}", self.dir.display()))?;

        let mut lines = String::new();
        for entry in transcript {
            let line = serde_json::to_string(entry).context("encoding transcript entry")?;
            lines.push_str(&line);
            lines.push('\n');
        }

        let path = self.path_for(agent_id);
        fs::write(&path, lines)
            .await
            .with_context(|| format!("writing transcript {}", path.display()))?;

        debug!(agent_id = %agent_id, entries = transcript.len(), "transcript persisted");
        Ok(transcript.len())
    }
}

/// In-memory sink for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryTranscriptLog {
    transcripts: Mutex<HashMap<String, Vec<TranscriptEntry>>>,
}

impl MemoryTranscriptLog {
    pub fn transcript(&self, agent_id: &str) -> Option<Vec<TranscriptEntry>> {
        self.transcripts.lock().get(agent_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.transcripts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.lock().is_empty()
    }
}

#[async_trait]
impl TranscriptSink for MemoryTranscriptLog {
    async fn persist(
        &self,
        agent_id: &str,
        transcript: &[TranscriptEntry],
    ) -> Result<usize, AgentError> {
        self.transcripts
            .lock()
            .insert(agent_id.to_string(), transcript.to_vec());
        Ok(transcript.len())
    }
}
