//! Transcript and tool wire types
//!
//! These are the shapes exchanged with the turn-stream collaborator, not
//! domain types. Serialization follows provider conventions (tagged content
//! blocks, lowercase entry kinds).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel text the stream driver injects as an assistant reply when the
/// user interrupts a running turn.
pub const INTERRUPT_SENTINEL: &str = "[Request interrupted by user]";

/// Sentinel text injected when the interrupt lands during tool use.
pub const TOOL_USE_INTERRUPT_SENTINEL: &str = "[Request interrupted by user for tool use]";

/// Prefix of synthesized assistant messages reporting a provider failure.
pub const API_ERROR_SENTINEL_PREFIX: &str = "API Error";

/// Tool definition advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A proposed tool invocation, as lifted from a `tool_use` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Kind of a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    User,
    Assistant,
    Progress,
}

/// Content blocks a transcript entry is made of.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        output: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    /// Plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Lift a `tool_use` block into an invocation the permission gate and
    /// registry can work with.
    pub fn as_invocation(&self) -> Option<ToolInvocation> {
        match self {
            Self::ToolUse { id, name, input } => Some(ToolInvocation {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            }),
            _ => None,
        }
    }
}

/// Token usage reported on assistant entries.
///
/// Cache fields default to zero when the provider omits them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    #[serde(default)]
    pub cache_creation_input_tokens: usize,
    #[serde(default)]
    pub cache_read_input_tokens: usize,
}

impl Usage {
    /// Total billed tokens for the entry: both cache counters plus raw
    /// input and output.
    pub fn total(&self) -> usize {
        self.cache_creation_input_tokens
            + self.cache_read_input_tokens
            + self.input_tokens
            + self.output_tokens
    }
}

/// One message in a session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl TranscriptEntry {
    /// Seed user entry holding a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::User,
            content: vec![ContentBlock::text(text)],
            usage: None,
        }
    }

    /// User entry carrying arbitrary blocks (tool results travel as user
    /// entries in provider transcripts).
    pub fn user_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            kind: EntryKind::User,
            content,
            usage: None,
        }
    }

    /// Assistant entry with its reported usage.
    pub fn assistant(content: Vec<ContentBlock>, usage: Usage) -> Self {
        Self {
            kind: EntryKind::Assistant,
            content,
            usage: Some(usage),
        }
    }

    /// Progress envelope entry.
    pub fn progress(content: Vec<ContentBlock>) -> Self {
        Self {
            kind: EntryKind::Progress,
            content,
            usage: None,
        }
    }

    /// Text of the leading block, when there is one.
    pub fn leading_text(&self) -> Option<&str> {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Whether this entry is one of the sentinel messages the stream driver
    /// injects in place of a real assistant reply after an interrupt or a
    /// provider failure.
    pub fn is_error_sentinel(&self) -> bool {
        if self.kind != EntryKind::Assistant {
            return false;
        }
        match self.leading_text() {
            Some(text) => {
                text == INTERRUPT_SENTINEL
                    || text == TOOL_USE_INTERRUPT_SENTINEL
                    || text.starts_with(API_ERROR_SENTINEL_PREFIX)
            }
            None => false,
        }
    }
}
