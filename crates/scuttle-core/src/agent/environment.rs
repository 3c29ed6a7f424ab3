//! Environment resolution seam.
//!
//! Before a run can stream anything it needs three answers: which model to
//! talk to, which call wrapper to reach it through, and where tools execute.
//! [`AgentEnvironment`] provides all three plus the model's default system
//! prompt. The three resolutions are independent and the runner awaits them
//! in parallel.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::tools::ExecutionContext;

/// Opaque handle to the model-call machinery. Retries, backoff, and token
/// refresh live behind it; the core forwards it to the stream untouched.
pub trait ModelCallWrapper: Send + Sync {
    /// Short label used in logs.
    fn label(&self) -> &str;
}

/// Wrapper for embedders whose stream talks to the provider directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughWrapper;

impl ModelCallWrapper for PassthroughWrapper {
    fn label(&self) -> &str {
        "passthrough"
    }
}

/// Resolves the per-run environment.
#[async_trait]
pub trait AgentEnvironment: Send + Sync {
    /// Model to use when the caller supplies no override.
    async fn resolve_model(&self) -> Result<String, AgentError>;

    /// Call wrapper the stream should route model turns through.
    async fn resolve_call_wrapper(&self) -> Result<Arc<dyn ModelCallWrapper>, AgentError>;

    /// Execution context tools run in.
    async fn resolve_execution_context(&self) -> Result<ExecutionContext, AgentError>;

    /// System prompt for `model`, used when the caller supplies none.
    async fn default_system_prompt(&self, model: &str) -> Result<String, AgentError>;
}

/// Static environment for embedders and tests: one model, one prompt, one
/// working directory, no call-wrapper machinery.
pub struct FixedEnvironment {
    model: String,
    system_prompt: String,
    working_dir: PathBuf,
}

impl FixedEnvironment {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<PathBuf>) -> Self {
        self.working_dir = working_dir.into();
        self
    }
}

#[async_trait]
impl AgentEnvironment for FixedEnvironment {
    async fn resolve_model(&self) -> Result<String, AgentError> {
        Ok(self.model.clone())
    }

    async fn resolve_call_wrapper(&self) -> Result<Arc<dyn ModelCallWrapper>, AgentError> {
        Ok(Arc::new(PassthroughWrapper))
    }

    async fn resolve_execution_context(&self) -> Result<ExecutionContext, AgentError> {
        Ok(ExecutionContext::new(self.working_dir.clone()))
    }

    async fn default_system_prompt(&self, _model: &str) -> Result<String, AgentError> {
        Ok(self.system_prompt.clone())
    }
}
