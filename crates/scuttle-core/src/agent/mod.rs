//! Sub-agent orchestration
//!
//! ## Runner (the canonical loop)
//! - `SubAgentRunner` - One session: resolve, seed, drive, aggregate
//! - `AgentEvent` - Event protocol between runner and consumers
//! - `AgentLoopConfig` / `AgentServices` - Configuration and dependencies
//!
//! ## Collaborator seams
//! - `TurnStream` - Drives model turns and tool execution
//! - `AgentEnvironment` - Model, call wrapper, and execution-context
//!   resolution
//! - `ToolLoopStream` / `ModelTurn` - Stock stream for in-process tools
//!
//! ## Support
//! - `normalize` - Per-block transcript views for progress consumers
//! - `outcome` - Terminal checks and result reduction
//! - `AgentSession` / `FileStateTable` / `InFlightToolIds` - Bookkeeping and
//!   shared pass-through state

pub mod driver;
pub mod environment;
pub mod loop_events;
pub mod normalize;
pub mod outcome;
pub mod runner;
pub mod session;
pub mod stream;

pub use driver::{ModelTurn, ToolLoopStream};
pub use environment::{AgentEnvironment, FixedEnvironment, ModelCallWrapper, PassthroughWrapper};
pub use loop_events::{progress_tool_use_id, AgentEvent, AgentResultData, ProgressPayload};
pub use normalize::{normalize_entry, normalize_transcript, NormalizedEntry};
pub use runner::{AgentServices, SubAgentRunner};
pub use session::{
    AgentLoopConfig, AgentSession, FileSnapshot, FileStateTable, InFlightToolIds,
};
pub use stream::{TurnRequest, TurnStream};
