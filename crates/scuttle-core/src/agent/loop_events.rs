//! Event protocol for sub-agent runs.
//!
//! `AgentEvent` is the single source of truth for everything a
//! [`SubAgentRunner`](crate::agent::SubAgentRunner) emits. Consumers see zero
//! or more progress events followed by exactly one result; nothing else.

use serde::Serialize;

use crate::agent::normalize::NormalizedEntry;
use crate::ai::types::{ContentBlock, TranscriptEntry, Usage};

/// Events emitted by a sub-agent run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A `tool_use` or `tool_result` block landed in the transcript.
    Progress {
        /// Session-scoped id shared by every progress event of one run; the
        /// only thing disambiguating concurrent runs under one parent.
        tool_use_id: String,
        data: ProgressPayload,
    },

    /// The run finished. Always the final event.
    Result { data: AgentResultData },
}

/// Payload of one progress event: the entry that produced it plus a
/// normalized view of the whole transcript so far.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename = "agent_progress")]
pub struct ProgressPayload {
    pub message: TranscriptEntry,
    pub normalized_messages: Vec<NormalizedEntry>,
}

/// Terminal accounting for one run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResultData {
    pub agent_index: usize,
    /// Text blocks of the final assistant entry, in order. Tool blocks are
    /// dropped here; they already surfaced as progress.
    pub content: Vec<ContentBlock>,
    /// Number of `tool_use` blocks observed across the session.
    pub tool_use_count: usize,
    /// Four-field total of the final assistant entry's usage.
    pub tokens: usize,
    pub usage: Usage,
}

/// Progress-event id for one session.
///
/// Synthesis runs share the `synthesis_` namespace; fan-out runs embed their
/// ordinal so siblings under the same parent never collide.
pub fn progress_tool_use_id(synthesis: bool, agent_index: usize, parent_message_id: &str) -> String {
    if synthesis {
        format!("synthesis_{parent_message_id}")
    } else {
        format!("agent_{agent_index}_{parent_message_id}")
    }
}
