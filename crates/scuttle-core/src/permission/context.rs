//! Shared permission policy state.
//!
//! A [`ToolPermissionContext`] holds the mode and remembered rules that gate
//! tool use. Every concurrent session sees the same context through a
//! [`PermissionContextHandle`], so a rule granted while one agent waits on a
//! prompt is visible to the next agent that asks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use glob::Pattern;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Gating mode consulted before the per-rule state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Rules and directory checks apply; everything else prompts.
    #[default]
    Default,
    /// Mutating tool use is approved without prompting.
    AcceptEdits,
    /// All gating is skipped once the bypass has been acknowledged.
    BypassPermissions,
}

/// A remembered allow or deny entry for one tool, optionally scoped to a
/// pattern over the invocation's path or command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub tool_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl PermissionRule {
    /// Blanket rule covering every invocation of `tool_name`.
    pub fn for_tool(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            pattern: None,
            added_at: Utc::now(),
        }
    }

    /// Rule scoped to invocations whose subject matches `pattern`.
    pub fn with_pattern(tool_name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            pattern: Some(pattern.into()),
            added_at: Utc::now(),
        }
    }

    /// Stable display form, `tool` or `tool(pattern)`.
    pub fn key(&self) -> String {
        match &self.pattern {
            Some(pattern) => format!("{}({})", self.tool_name, pattern),
            None => self.tool_name.clone(),
        }
    }

    /// Whether this rule covers an invocation of `tool_name` whose extracted
    /// path or command is `subject`. A blanket rule matches any subject; a
    /// scoped rule requires one.
    pub fn matches(&self, tool_name: &str, subject: Option<&str>) -> bool {
        if self.tool_name != tool_name {
            return false;
        }
        match (&self.pattern, subject) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(pattern), Some(subject)) => match Pattern::new(pattern) {
                Ok(glob) => glob.matches(subject),
                Err(_) => pattern == subject,
            },
        }
    }
}

/// The full gating state: mode, remembered rules, and the directories inside
/// which read-only tool use is sanctioned without prompting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPermissionContext {
    #[serde(default)]
    pub mode: PermissionMode,
    /// Allow rules keyed by [`PermissionRule::key`].
    #[serde(default)]
    pub always_allow: BTreeMap<String, PermissionRule>,
    /// Deny rules keyed by [`PermissionRule::key`]. Checked before allows.
    #[serde(default)]
    pub always_deny: BTreeMap<String, PermissionRule>,
    /// Directories sanctioned for read-only tool use beyond the working dir.
    #[serde(default)]
    pub additional_working_directories: BTreeSet<PathBuf>,
    /// `bypassPermissions` is inert until the embedder records an explicit
    /// acknowledgement here.
    #[serde(default)]
    pub bypass_accepted: bool,
}

impl ToolPermissionContext {
    pub fn with_mode(mode: PermissionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// True when bypass mode is both selected and acknowledged.
    pub fn bypass_active(&self) -> bool {
        self.mode == PermissionMode::BypassPermissions && self.bypass_accepted
    }

    pub fn matching_allow(&self, tool_name: &str, subject: Option<&str>) -> Option<&PermissionRule> {
        Self::find(&self.always_allow, tool_name, subject)
    }

    pub fn matching_deny(&self, tool_name: &str, subject: Option<&str>) -> Option<&PermissionRule> {
        Self::find(&self.always_deny, tool_name, subject)
    }

    pub fn insert_allow(&mut self, rule: PermissionRule) {
        self.always_allow.insert(rule.key(), rule);
    }

    pub fn insert_deny(&mut self, rule: PermissionRule) {
        self.always_deny.insert(rule.key(), rule);
    }

    fn find<'a>(
        rules: &'a BTreeMap<String, PermissionRule>,
        tool_name: &str,
        subject: Option<&str>,
    ) -> Option<&'a PermissionRule> {
        rules.values().find(|rule| rule.matches(tool_name, subject))
    }
}

/// Cloneable handle to the context shared by all sessions in the process.
///
/// Mutations go through [`update`](Self::update), which holds the write lock
/// across the closure. Two sessions granting rules at the same time serialize
/// instead of overwriting each other's writes.
#[derive(Clone, Default)]
pub struct PermissionContextHandle {
    inner: Arc<RwLock<ToolPermissionContext>>,
}

impl PermissionContextHandle {
    pub fn new(context: ToolPermissionContext) -> Self {
        Self {
            inner: Arc::new(RwLock::new(context)),
        }
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> ToolPermissionContext {
        self.inner.read().clone()
    }

    /// Swap in a whole new context.
    pub fn replace(&self, next: ToolPermissionContext) {
        *self.inner.write() = next;
    }

    /// Read-modify-write under a single write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut ToolPermissionContext) -> R) -> R {
        f(&mut self.inner.write())
    }
}

impl std::fmt::Debug for PermissionContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionContextHandle")
            .field("context", &*self.inner.read())
            .finish()
    }
}
