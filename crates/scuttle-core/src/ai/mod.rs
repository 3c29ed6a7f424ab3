//! Model-facing data types
//!
//! Transcript entries, content blocks, and tool wire shapes shared between
//! the agent loop and its collaborators.

pub mod types;

pub use types::{
    ContentBlock, EntryKind, ToolDescriptor, ToolInvocation, TranscriptEntry, Usage,
};
