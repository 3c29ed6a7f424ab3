//! The sub-agent orchestration loop.
//!
//! `SubAgentRunner` owns one session end to end: it resolves the
//! environment, seeds the transcript, drives the turn stream, counts tool
//! use, and reduces the finished transcript into a single result event.
//!
//! ```text
//!  ┌───────────────┐   Result<AgentEvent>    ┌──────────┐
//!  │ SubAgentRunner │ ─────────────────────►  │  Caller  │
//!  └───────┬───────┘                          └──────────┘
//!          │ TurnRequest
//!          ▼
//!  ┌───────────────┐
//!  │  TurnStream   │  model turns, tool execution, permission gating
//!  └───────────────┘
//! ```
//!
//! The runner never retries and never interprets tool payloads; retries live
//! behind the call wrapper and gating lives behind the stream's permission
//! engine.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::agent::environment::AgentEnvironment;
use crate::agent::loop_events::{
    progress_tool_use_id, AgentEvent, AgentResultData, ProgressPayload,
};
use crate::agent::normalize::normalize_transcript;
use crate::agent::outcome;
use crate::agent::session::{AgentLoopConfig, AgentSession};
use crate::agent::stream::{TurnRequest, TurnStream};
use crate::ai::types::{ContentBlock, EntryKind, TranscriptEntry};
use crate::error::AgentError;
use crate::storage::TranscriptSink;
use crate::tools::ToolRegistry;

/// Shared services a runner needs.
pub struct AgentServices {
    pub environment: Arc<dyn AgentEnvironment>,
    pub stream: Arc<dyn TurnStream>,
    pub tools: Arc<ToolRegistry>,
    pub sink: Arc<dyn TranscriptSink>,
}

/// Runs one sub-agent session.
pub struct SubAgentRunner {
    services: AgentServices,
    config: AgentLoopConfig,
}

impl SubAgentRunner {
    pub fn new(services: AgentServices, config: AgentLoopConfig) -> Self {
        Self { services, config }
    }

    /// Start the session.
    ///
    /// Returns the event stream: zero or more progress events in transcript
    /// order, then exactly one result. On failure the stream ends with one
    /// error item instead of a result; progress already emitted stands.
    pub fn run(
        self,
        initial_prompt: impl Into<String>,
    ) -> mpsc::UnboundedReceiver<Result<AgentEvent, AgentError>> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let prompt = initial_prompt.into();

        tokio::spawn(async move {
            match self.run_inner(prompt, &event_tx).await {
                Ok(data) => {
                    let _ = event_tx.send(Ok(AgentEvent::Result { data }));
                }
                Err(err) => {
                    let _ = event_tx.send(Err(err));
                }
            }
        });

        event_rx
    }

    async fn run_inner(
        self,
        prompt: String,
        event_tx: &mpsc::UnboundedSender<Result<AgentEvent, AgentError>>,
    ) -> Result<AgentResultData, AgentError> {
        let AgentServices {
            environment,
            stream,
            tools,
            sink,
        } = self.services;
        let config = self.config;

        // The three resolutions are independent; await them together.
        let (resolved_model, wrapper, execution) = tokio::try_join!(
            environment.resolve_model(),
            environment.resolve_call_wrapper(),
            environment.resolve_execution_context(),
        )?;

        let model = match &config.model {
            Some(model) => model.clone(),
            None => resolved_model,
        };
        let system_prompt = match &config.system_prompt {
            Some(prompt) => prompt.clone(),
            None => environment.default_system_prompt(&model).await?,
        };

        let session = AgentSession::begin(&config, model, system_prompt);
        debug!(
            agent_id = %session.agent_id,
            agent_index = session.agent_index,
            synthesis = session.synthesis,
            model = %session.model,
            wrapper = wrapper.label(),
            "starting sub-agent session"
        );

        let progress_id = progress_tool_use_id(
            config.synthesis,
            config.agent_index,
            &config.parent_message_id,
        );

        let seed = TranscriptEntry::user(prompt);
        let mut transcript = vec![seed];
        let mut tool_use_count = 0usize;

        let mut entries = stream.drive(TurnRequest {
            session: session.clone(),
            history: transcript.clone(),
            tools,
            wrapper,
            execution,
            cancellation: config.cancellation.clone(),
            permissions: config.permissions.clone(),
            file_state: config.file_state.clone(),
            in_flight_tool_ids: config.in_flight_tool_ids.clone(),
            debug: config.debug,
            verbose: config.verbose,
        });

        while let Some(entry) = entries.recv().await {
            let entry = entry?;
            transcript.push(entry.clone());

            // Progress envelopes stay in the record but are never forwarded.
            if entry.kind == EntryKind::Progress {
                continue;
            }

            // Full recompute for every forwarded entry; consumers always see
            // a self-consistent view of the whole conversation.
            let normalized = normalize_transcript(&transcript);
            for block in &entry.content {
                match block {
                    ContentBlock::ToolUse { .. } => tool_use_count += 1,
                    ContentBlock::ToolResult { .. } => {}
                    ContentBlock::Text { .. } => continue,
                }
                let _ = event_tx.send(Ok(AgentEvent::Progress {
                    tool_use_id: progress_id.clone(),
                    data: ProgressPayload {
                        message: entry.clone(),
                        normalized_messages: normalized.clone(),
                    },
                }));
            }
        }

        let final_entry =
            outcome::check_terminal(&transcript, config.agent_index, config.synthesis)?;
        let result = outcome::aggregate(final_entry, config.agent_index, tool_use_count);

        // One awaited write; the entry count it returns is not interesting
        // here, but a failure aborts the run.
        sink.persist(&session.agent_id, &transcript).await?;

        debug!(
            agent_id = %session.agent_id,
            tokens = result.tokens,
            tool_use_count = result.tool_use_count,
            "sub-agent session finished"
        );

        Ok(result)
    }
}
