//! The stream seam the runner pulls transcript entries from.
//!
//! A [`TurnStream`] drives one model conversation to completion: it sends
//! requests through the call wrapper, executes tool invocations (gating them
//! through the permission engine), and yields each transcript entry as it
//! lands. The runner only consumes; everything provider-shaped stays behind
//! this trait.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent::environment::ModelCallWrapper;
use crate::agent::session::{AgentSession, FileStateTable, InFlightToolIds};
use crate::ai::TranscriptEntry;
use crate::error::AgentError;
use crate::permission::PermissionContextHandle;
use crate::tools::{ExecutionContext, ToolRegistry};

/// Everything one model turn needs.
pub struct TurnRequest {
    pub session: AgentSession,
    /// Conversation so far, seed entry included.
    pub history: Vec<TranscriptEntry>,
    pub tools: Arc<ToolRegistry>,
    pub wrapper: Arc<dyn ModelCallWrapper>,
    pub execution: ExecutionContext,
    pub cancellation: CancellationToken,
    /// Shared gating state; drivers resolve invocations against it.
    pub permissions: PermissionContextHandle,
    pub file_state: FileStateTable,
    pub in_flight_tool_ids: InFlightToolIds,
    pub debug: bool,
    pub verbose: bool,
}

/// Yields the entries of one model turn over a channel.
///
/// The sequence must terminate: the driver closes the channel when the turn
/// completes, or sends one error item and stops. Cancellation surfaces as
/// [`AgentError::Cancelled`]; the runner never downgrades it.
pub trait TurnStream: Send + Sync {
    fn drive(&self, request: TurnRequest)
        -> mpsc::UnboundedReceiver<Result<TranscriptEntry, AgentError>>;
}
