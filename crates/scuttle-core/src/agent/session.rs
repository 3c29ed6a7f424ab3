//! Per-run configuration and session bookkeeping.
//!
//! `AgentLoopConfig` is what a caller hands the runner; `AgentSession` is
//! what the runner derives from it once the environment has been resolved.
//! The two shared tables here are pass-throughs: the loop forwards them into
//! the turn request without interpreting their contents.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AgentError;
use crate::permission::PermissionContextHandle;

/// Shared set of tool invocation ids currently executing anywhere in the
/// process. Stream drivers consult it to avoid re-dispatching an id.
#[derive(Debug, Clone, Default)]
pub struct InFlightToolIds {
    inner: Arc<RwLock<HashSet<String>>>,
}

impl InFlightToolIds {
    pub fn insert(&self, id: impl Into<String>) -> bool {
        self.inner.write().insert(id.into())
    }

    pub fn remove(&self, id: &str) -> bool {
        self.inner.write().remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Snapshot of a file a tool has read, kept so later edits can detect
/// external modification.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub content: String,
    pub recorded_at: DateTime<Utc>,
}

/// Shared table of file snapshots keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct FileStateTable {
    inner: Arc<RwLock<HashMap<PathBuf, FileSnapshot>>>,
}

impl FileStateTable {
    pub fn record(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.inner.write().insert(
            path.into(),
            FileSnapshot {
                content: content.into(),
                recorded_at: Utc::now(),
            },
        );
    }

    pub fn get(&self, path: &Path) -> Option<FileSnapshot> {
        self.inner.read().get(path).cloned()
    }

    pub fn forget(&self, path: &Path) -> Option<FileSnapshot> {
        self.inner.write().remove(path)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Configuration for one sub-agent run.
#[derive(Clone)]
pub struct AgentLoopConfig {
    /// Caller-assigned ordinal when several agents fan out under one parent.
    pub agent_index: usize,
    /// Id of the parent message the progress ids are namespaced under.
    pub parent_message_id: String,
    /// Synthesis runs combine sibling outputs and get their own id prefix.
    pub synthesis: bool,
    /// Model override; the environment's resolution is used when `None`.
    pub model: Option<String>,
    /// System prompt override; the model's default is used when `None`.
    pub system_prompt: Option<String>,
    pub debug: bool,
    pub verbose: bool,
    pub cancellation: CancellationToken,
    pub permissions: PermissionContextHandle,
    pub file_state: FileStateTable,
    pub in_flight_tool_ids: InFlightToolIds,
}

impl Default for AgentLoopConfig {
    fn default() -> Self {
        Self {
            agent_index: 0,
            parent_message_id: String::new(),
            synthesis: false,
            model: None,
            system_prompt: None,
            debug: false,
            verbose: false,
            cancellation: CancellationToken::new(),
            permissions: PermissionContextHandle::default(),
            file_state: FileStateTable::default(),
            in_flight_tool_ids: InFlightToolIds::default(),
        }
    }
}

/// Bookkeeping for one live run, created after environment resolution and
/// discarded with it.
#[derive(Debug, Clone)]
pub struct AgentSession {
    /// Opaque unique token naming the session, minted at start.
    pub agent_id: String,
    pub agent_index: usize,
    pub synthesis: bool,
    /// Effective model after overrides.
    pub model: String,
    /// Effective system prompt after overrides.
    pub system_prompt: String,
    pub started_at: DateTime<Utc>,
}

impl AgentSession {
    pub fn begin(config: &AgentLoopConfig, model: String, system_prompt: String) -> Self {
        Self {
            agent_id: Uuid::new_v4().to_string(),
            agent_index: config.agent_index,
            synthesis: config.synthesis,
            model,
            system_prompt,
            started_at: Utc::now(),
        }
    }

    /// Human-readable name for error messages and logs.
    pub fn label(&self) -> String {
        AgentError::agent_label(self.agent_index, self.synthesis)
    }
}
