//! The permission gate.
//!
//! Resolution happens in a fixed order against a snapshot of the shared
//! context: bypass, deny rules, acceptEdits mode, allow rules, sanctioned
//! read-only access, and finally an external confirmation. The decision
//! stage is pure; [`PermissionGate::apply`] is where an answer mutates the
//! shared context, and [`PermissionGate::evaluate`] strings the two together
//! around the confirmation await.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::ai::ToolInvocation;
use crate::error::AgentError;
use crate::permission::confirm::{
    ConfirmationChoice, ConfirmationHandler, ConfirmationRequest, GrantScope,
};
use crate::permission::context::{
    PermissionContextHandle, PermissionMode, PermissionRule, ToolPermissionContext,
};
use crate::tools::{ExecutionContext, Tool};

/// Gating classification of one invocation. Anything a tool does not declare
/// read-only is treated as mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolUseKind {
    Read,
    Edit,
}

/// What an allow-always answer will remember.
#[derive(Debug, Clone, PartialEq)]
pub enum AlwaysGrant {
    /// Insert this rule into the shared allow set.
    Rule(PermissionRule),
    /// Flip the shared mode to acceptEdits, covering every file editor.
    AcceptEditsMode,
}

/// Everything the confirmation stage needs: the choices are fixed, the
/// grant describes what allow-always would do for this invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationOptions {
    pub kind: ToolUseKind,
    pub rule_key: String,
    pub suggested_pattern: Option<String>,
    pub always_grant: AlwaysGrant,
}

/// Result of the pure decision stage.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Bypass mode is active and acknowledged.
    Bypassed,
    /// A deny rule matched; nothing later in the order is consulted.
    DeniedByRule { rule_key: String },
    /// acceptEdits mode covers this mutating invocation.
    AllowedByMode,
    /// An allow rule matched.
    AllowedByRule { rule_key: String },
    /// Read-only invocation inside the sanctioned directories.
    AllowedReadOnly,
    /// No cached coverage; the caller must confirm.
    NeedsConfirmation(ConfirmationOptions),
}

/// Final verdict handed back to the session. A denial does not end the
/// session; the caller reports it to the model as an error tool result.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Allowed,
    Denied { reason: String },
}

impl GateOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Callbacks fired when an interactive confirmation lands.
#[allow(unused_variables)]
pub trait GateObserver: Send + Sync {
    /// The user approved `invocation`; `scope` says whether the grant was
    /// remembered beyond this one use.
    fn on_allowed(&self, scope: GrantScope, invocation: &ToolInvocation) {}

    /// The user rejected `invocation`.
    fn on_denied(&self, invocation: &ToolInvocation) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl GateObserver for NoopObserver {}

/// Gates proposed tool invocations against the shared permission context.
pub struct PermissionGate {
    context: PermissionContextHandle,
    confirm: Arc<dyn ConfirmationHandler>,
    observer: Arc<dyn GateObserver>,
}

impl PermissionGate {
    pub fn new(context: PermissionContextHandle, confirm: Arc<dyn ConfirmationHandler>) -> Self {
        Self {
            context,
            confirm,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn GateObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn context(&self) -> &PermissionContextHandle {
        &self.context
    }

    /// Classify an invocation by the tool's own capability declaration.
    pub fn classify(tool: &dyn Tool) -> ToolUseKind {
        if tool.is_read_only() {
            ToolUseKind::Read
        } else {
            ToolUseKind::Edit
        }
    }

    /// Resolve one invocation against a snapshot of the shared context.
    /// Earlier steps win outright; later steps are never consulted once one
    /// matches.
    pub fn decide(
        &self,
        tool: &dyn Tool,
        invocation: &ToolInvocation,
        env: &ExecutionContext,
    ) -> GateDecision {
        let context = self.context.snapshot();
        let kind = Self::classify(tool);
        let subject = invocation_subject(&invocation.input);

        if context.bypass_active() {
            return GateDecision::Bypassed;
        }

        if let Some(rule) = context.matching_deny(&invocation.name, subject.as_deref()) {
            return GateDecision::DeniedByRule { rule_key: rule.key() };
        }

        if context.mode == PermissionMode::AcceptEdits && kind == ToolUseKind::Edit {
            return GateDecision::AllowedByMode;
        }

        if let Some(rule) = context.matching_allow(&invocation.name, subject.as_deref()) {
            return GateDecision::AllowedByRule { rule_key: rule.key() };
        }

        if kind == ToolUseKind::Read && read_is_sanctioned(&invocation.input, env, &context) {
            return GateDecision::AllowedReadOnly;
        }

        GateDecision::NeedsConfirmation(confirmation_options(kind, invocation))
    }

    /// Commit one confirmation answer. Allow-once touches nothing shared;
    /// allow-always writes the grant through the handle under its lock.
    pub fn apply(
        &self,
        choice: ConfirmationChoice,
        options: &ConfirmationOptions,
        invocation: &ToolInvocation,
    ) -> GateOutcome {
        match choice {
            ConfirmationChoice::AllowOnce => {
                self.observer.on_allowed(GrantScope::Temporary, invocation);
                GateOutcome::Allowed
            }
            ConfirmationChoice::AllowAlways => {
                match &options.always_grant {
                    AlwaysGrant::Rule(rule) => {
                        debug!(rule = %rule.key(), "remembering allow rule");
                        self.context.update(|context| {
                            context.insert_allow(rule.clone());
                        });
                    }
                    AlwaysGrant::AcceptEditsMode => {
                        debug!(tool = %invocation.name, "switching to acceptEdits mode");
                        self.context.update(|context| {
                            context.mode = PermissionMode::AcceptEdits;
                        });
                    }
                }
                self.observer.on_allowed(GrantScope::Permanent, invocation);
                GateOutcome::Allowed
            }
            ConfirmationChoice::Deny => {
                self.observer.on_denied(invocation);
                GateOutcome::Denied {
                    reason: "denied by user".to_string(),
                }
            }
        }
    }

    /// Decide, confirm if needed, and commit. At most one confirmation is
    /// awaited per invocation, and every path lands on a terminal outcome.
    pub async fn evaluate(
        &self,
        tool: &dyn Tool,
        invocation: &ToolInvocation,
        env: &ExecutionContext,
    ) -> Result<GateOutcome, AgentError> {
        match self.decide(tool, invocation, env) {
            GateDecision::Bypassed => {
                debug!(tool = %invocation.name, "permission gate bypassed");
                Ok(GateOutcome::Allowed)
            }
            GateDecision::AllowedByMode => {
                debug!(tool = %invocation.name, "allowed by acceptEdits mode");
                Ok(GateOutcome::Allowed)
            }
            GateDecision::AllowedByRule { rule_key } => {
                debug!(tool = %invocation.name, rule = %rule_key, "allowed by rule");
                Ok(GateOutcome::Allowed)
            }
            GateDecision::AllowedReadOnly => {
                debug!(tool = %invocation.name, "read-only access sanctioned");
                Ok(GateOutcome::Allowed)
            }
            GateDecision::DeniedByRule { rule_key } => {
                debug!(tool = %invocation.name, rule = %rule_key, "blocked by deny rule");
                Ok(GateOutcome::Denied {
                    reason: format!("blocked by deny rule {rule_key}"),
                })
            }
            GateDecision::NeedsConfirmation(options) => {
                let request = ConfirmationRequest {
                    invocation: invocation.clone(),
                    kind: options.kind,
                    rule_key: options.rule_key.clone(),
                    suggested_pattern: options.suggested_pattern.clone(),
                };
                let choice = self.confirm.confirm(request).await?;
                Ok(self.apply(choice, &options, invocation))
            }
        }
    }
}

/// The string rules match against: the invocation's file path when it has
/// one, otherwise its command line.
fn invocation_subject(input: &Value) -> Option<String> {
    extract_file_path(input)
        .map(str::to_string)
        .or_else(|| extract_command(input).map(str::to_string))
}

fn extract_file_path(input: &Value) -> Option<&str> {
    input
        .get("file_path")
        .or_else(|| input.get("path"))
        .and_then(Value::as_str)
}

fn extract_command(input: &Value) -> Option<&str> {
    input.get("command").and_then(Value::as_str)
}

/// Prefix pattern for a command line, `git *` for `git push origin`.
/// Single-word commands get no pattern; the grant falls back to the bare
/// command string.
fn prefix_pattern(command: &str) -> Option<String> {
    let mut words = command.split_whitespace();
    let first = words.next()?;
    words.next().map(|_| format!("{first} *"))
}

/// A read is sanctioned when it names no path at all, or when its resolved
/// path sits under the working directory or one of the additional ones.
fn read_is_sanctioned(
    input: &Value,
    env: &ExecutionContext,
    context: &ToolPermissionContext,
) -> bool {
    let Some(path) = extract_file_path(input) else {
        return true;
    };
    let resolved = env.resolve_path(path);
    resolved.starts_with(&env.working_dir)
        || context
            .additional_working_directories
            .iter()
            .any(|dir| resolved.starts_with(dir))
}

fn confirmation_options(kind: ToolUseKind, invocation: &ToolInvocation) -> ConfirmationOptions {
    let file_path = extract_file_path(&invocation.input);
    let command = extract_command(&invocation.input);

    if kind == ToolUseKind::Edit && file_path.is_some() {
        // File editors are granted as a mode switch, not a per-path rule.
        return ConfirmationOptions {
            kind,
            rule_key: invocation.name.clone(),
            suggested_pattern: None,
            always_grant: AlwaysGrant::AcceptEditsMode,
        };
    }

    let pattern = match (command, file_path) {
        (Some(command), _) => prefix_pattern(command).or_else(|| Some(command.to_string())),
        (None, Some(path)) => Some(path.to_string()),
        (None, None) => None,
    };

    let rule = match &pattern {
        Some(pattern) => PermissionRule::with_pattern(&invocation.name, pattern),
        None => PermissionRule::for_tool(&invocation.name),
    };

    ConfirmationOptions {
        kind,
        rule_key: rule.key(),
        suggested_pattern: pattern,
        always_grant: AlwaysGrant::Rule(rule),
    }
}
