//! Confirmation seam for invocations no cached rule covers.
//!
//! The gate hands a [`ConfirmationRequest`] to a [`ConfirmationHandler`] and
//! suspends the session until one of the three choices comes back.
//! [`ChannelConfirmation`] is the stock implementation for embedders that
//! answer prompts from a separate task.

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::ai::ToolInvocation;
use crate::error::AgentError;
use crate::permission::engine::ToolUseKind;

/// How long an approval is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantScope {
    /// This invocation only.
    Temporary,
    /// Remembered in the shared permission context.
    Permanent,
}

impl std::fmt::Display for GrantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Temporary => f.write_str("temporary"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// The three answers a confirmation can produce. All three are always on
/// offer; none is ever withheld based on the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationChoice {
    /// Approve this invocation and nothing else.
    AllowOnce,
    /// Approve and remember the grant for future invocations.
    AllowAlways,
    /// Reject this invocation.
    Deny,
}

/// One pending decision, with enough context to render a prompt.
#[derive(Debug, Clone)]
pub struct ConfirmationRequest {
    pub invocation: ToolInvocation,
    pub kind: ToolUseKind,
    /// Display key of the rule an allow-always answer would remember.
    pub rule_key: String,
    /// Pattern that rule would be scoped to, when one could be derived.
    pub suggested_pattern: Option<String>,
}

/// Resolves pending confirmations. Errors abort the session's turn.
#[async_trait]
pub trait ConfirmationHandler: Send + Sync {
    async fn confirm(&self, request: ConfirmationRequest)
        -> Result<ConfirmationChoice, AgentError>;
}

/// A request paired with the slot its answer goes into.
#[derive(Debug)]
pub struct PendingConfirmation {
    pub request: ConfirmationRequest,
    pub respond: oneshot::Sender<ConfirmationChoice>,
}

impl PendingConfirmation {
    pub fn answer(self, choice: ConfirmationChoice) {
        let _ = self.respond.send(choice);
    }
}

/// Forwards each request over an unbounded channel and awaits the paired
/// oneshot reply. Dropping the receiver or the reply sender fails the
/// confirmation rather than leaving the session suspended.
pub struct ChannelConfirmation {
    tx: mpsc::UnboundedSender<PendingConfirmation>,
}

impl ChannelConfirmation {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PendingConfirmation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ConfirmationHandler for ChannelConfirmation {
    async fn confirm(
        &self,
        request: ConfirmationRequest,
    ) -> Result<ConfirmationChoice, AgentError> {
        let (respond, rx) = oneshot::channel();
        self.tx
            .send(PendingConfirmation { request, respond })
            .map_err(|_| anyhow!("confirmation channel closed"))?;
        rx.await
            .map_err(|_| AgentError::from(anyhow!("confirmation dropped without an answer")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ConfirmationRequest {
        ConfirmationRequest {
            invocation: ToolInvocation {
                id: "toolu_01".to_string(),
                name: "bash".to_string(),
                input: json!({"command": "git status"}),
            },
            kind: ToolUseKind::Edit,
            rule_key: "bash(git *)".to_string(),
            suggested_pattern: Some("git *".to_string()),
        }
    }

    #[tokio::test]
    async fn channel_round_trip() {
        let (handler, mut rx) = ChannelConfirmation::new();

        let answering = tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            assert_eq!(pending.request.rule_key, "bash(git *)");
            pending.answer(ConfirmationChoice::AllowAlways);
        });

        let choice = handler.confirm(request()).await.unwrap();
        assert_eq!(choice, ConfirmationChoice::AllowAlways);
        answering.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_receiver_is_an_error() {
        let (handler, rx) = ChannelConfirmation::new();
        drop(rx);
        assert!(handler.confirm(request()).await.is_err());
    }

    #[tokio::test]
    async fn dropped_reply_sender_is_an_error() {
        let (handler, mut rx) = ChannelConfirmation::new();

        tokio::spawn(async move {
            let pending = rx.recv().await.unwrap();
            drop(pending);
        });

        assert!(handler.confirm(request()).await.is_err());
    }

    #[test]
    fn grant_scope_display() {
        assert_eq!(GrantScope::Temporary.to_string(), "temporary");
        assert_eq!(GrantScope::Permanent.to_string(), "permanent");
    }
}
