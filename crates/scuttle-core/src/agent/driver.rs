//! Stock turn driver with in-process tool execution.
//!
//! `ToolLoopStream` is a [`TurnStream`] for embedders whose tools run
//! locally: it alternates model completions with gated tool execution until
//! the model stops asking for tools. Provider transport stays behind the
//! [`ModelTurn`] trait; every invocation is resolved through the permission
//! gate before anything executes, and a denial flows back to the model as an
//! error tool result instead of ending the turn.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::agent::stream::{TurnRequest, TurnStream};
use crate::ai::types::{
    ContentBlock, ToolInvocation, TranscriptEntry, Usage, INTERRUPT_SENTINEL,
    TOOL_USE_INTERRUPT_SENTINEL,
};
use crate::error::AgentError;
use crate::permission::{
    ConfirmationHandler, GateObserver, GateOutcome, NoopObserver, PermissionGate,
};
use crate::tools::ToolResult;

const MAX_TURNS: usize = 50;
const MAX_TOOL_OUTPUT_CHARS: usize = 30_000;

/// One model completion over the current conversation.
#[async_trait]
pub trait ModelTurn: Send + Sync {
    /// Produce the next assistant entry. Implementations route the call
    /// through `request.wrapper`; retries live behind it, not here.
    async fn complete(
        &self,
        request: &TurnRequest,
        history: &[TranscriptEntry],
    ) -> Result<TranscriptEntry, AgentError>;
}

/// [`TurnStream`] that executes tool invocations in process.
pub struct ToolLoopStream {
    model: Arc<dyn ModelTurn>,
    confirm: Arc<dyn ConfirmationHandler>,
    observer: Arc<dyn GateObserver>,
    max_turns: usize,
}

impl ToolLoopStream {
    pub fn new(model: Arc<dyn ModelTurn>, confirm: Arc<dyn ConfirmationHandler>) -> Self {
        Self {
            model,
            confirm,
            observer: Arc::new(NoopObserver),
            max_turns: MAX_TURNS,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn GateObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }
}

impl TurnStream for ToolLoopStream {
    fn drive(
        &self,
        request: TurnRequest,
    ) -> mpsc::UnboundedReceiver<Result<TranscriptEntry, AgentError>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let model = self.model.clone();
        let gate = PermissionGate::new(request.permissions.clone(), self.confirm.clone())
            .with_observer(self.observer.clone());
        let max_turns = self.max_turns;

        tokio::spawn(async move {
            let mut history = request.history.clone();

            for turn in 1..=max_turns {
                let entry = tokio::select! {
                    _ = request.cancellation.cancelled() => {
                        let _ = tx.send(Ok(interrupt_entry(INTERRUPT_SENTINEL)));
                        return;
                    }
                    completed = model.complete(&request, &history) => match completed {
                        Ok(entry) => entry,
                        Err(err) => {
                            let _ = tx.send(Err(err));
                            return;
                        }
                    },
                };

                history.push(entry.clone());
                let _ = tx.send(Ok(entry.clone()));

                let invocations: Vec<ToolInvocation> = entry
                    .content
                    .iter()
                    .filter_map(ContentBlock::as_invocation)
                    .collect();
                if invocations.is_empty() {
                    debug!(turn, "model finished without further tool use");
                    return;
                }

                let mut blocks = Vec::with_capacity(invocations.len());
                for invocation in &invocations {
                    // Interrupts between tools leave the batch unfinished.
                    if request.cancellation.is_cancelled() {
                        let _ = tx.send(Ok(interrupt_entry(TOOL_USE_INTERRUPT_SENTINEL)));
                        return;
                    }
                    match run_invocation(&gate, &request, invocation).await {
                        Ok(block) => blocks.push(block),
                        Err(err) => {
                            let _ = tx.send(Err(err));
                            return;
                        }
                    }
                }

                let results = TranscriptEntry::user_blocks(blocks);
                history.push(results.clone());
                let _ = tx.send(Ok(results));
            }

            warn!(max_turns, "turn budget exhausted before the model finished");
        });

        rx
    }
}

/// Sentinel entry recorded in place of a real assistant reply.
fn interrupt_entry(sentinel: &str) -> TranscriptEntry {
    TranscriptEntry::assistant(vec![ContentBlock::text(sentinel)], Usage::default())
}

async fn run_invocation(
    gate: &PermissionGate,
    request: &TurnRequest,
    invocation: &ToolInvocation,
) -> Result<ContentBlock, AgentError> {
    let Some(tool) = request.tools.get(&invocation.name).await else {
        warn!(tool = %invocation.name, "model invoked an unregistered tool");
        return Ok(
            ToolResult::error(format!("Unknown tool: {}", invocation.name))
                .into_block(invocation.id.clone()),
        );
    };

    request.in_flight_tool_ids.insert(invocation.id.clone());
    let evaluated = gate
        .evaluate(tool.as_ref(), invocation, &request.execution)
        .await;
    let result = match evaluated {
        Ok(GateOutcome::Allowed) => {
            let mut result = tool
                .execute(invocation.input.clone(), &request.execution)
                .await;
            result.output = truncate_output(&result.output);
            result
        }
        Ok(GateOutcome::Denied { reason }) => {
            debug!(tool = %invocation.name, %reason, "invocation rejected");
            ToolResult::error(format!("Tool execution denied: {reason}"))
        }
        Err(err) => {
            request.in_flight_tool_ids.remove(&invocation.id);
            return Err(err);
        }
    };
    request.in_flight_tool_ids.remove(&invocation.id);

    Ok(result.into_block(invocation.id.clone()))
}

/// Clamp oversized tool output, breaking at a line boundary under the cap.
fn truncate_output(output: &str) -> String {
    if output.len() <= MAX_TOOL_OUTPUT_CHARS {
        return output.to_string();
    }

    let mut boundary = MAX_TOOL_OUTPUT_CHARS.min(output.len());
    while boundary > 0 && !output.is_char_boundary(boundary) {
        boundary -= 1;
    }
    let head = &output[..boundary];
    let break_point = head.rfind('\n').unwrap_or(boundary);
    let kept = &output[..break_point];
    format!(
        "{}\n\n[output truncated: kept {} of {} chars]",
        kept,
        kept.len(),
        output.len()
    )
}
