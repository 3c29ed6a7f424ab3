//! Scuttle Core - Sub-agent orchestration and permission gating
//!
//! This crate provides the core pieces for running gated sub-agent sessions:
//! - The orchestration loop: seed a prompt, drive a model turn stream,
//!   surface tool activity as progress, reduce the transcript to one result
//! - Permission gating: mode- and rule-based decisions over proposed tool
//!   invocations, with an external confirmation seam for everything else
//! - The tool seam: the trait tools implement and the registry a session
//!   advertises to the model
//! - Transcript persistence: a JSONL sink plus an in-memory one for tests
//!
//! Terminal rendering, provider transport, and retry machinery live in
//! embedding applications behind the collaborator traits.

pub mod agent;
pub mod ai;
pub mod error;
pub mod permission;
pub mod storage;
pub mod tools;

pub use agent::{
    AgentEnvironment, AgentEvent, AgentLoopConfig, AgentResultData, AgentServices, AgentSession,
    FixedEnvironment, ModelTurn, SubAgentRunner, ToolLoopStream, TurnRequest, TurnStream,
};
pub use ai::{ContentBlock, EntryKind, ToolDescriptor, ToolInvocation, TranscriptEntry, Usage};
pub use error::AgentError;
pub use permission::{
    ChannelConfirmation, ConfirmationChoice, ConfirmationHandler, ConfirmationRequest,
    GateDecision, GateObserver, GateOutcome, PermissionContextHandle, PermissionGate,
    PermissionMode, PermissionRule, ToolPermissionContext, ToolUseKind,
};
pub use storage::{JsonlTranscriptLog, MemoryTranscriptLog, TranscriptSink};
pub use tools::{ExecutionContext, Tool, ToolRegistry, ToolResult};
