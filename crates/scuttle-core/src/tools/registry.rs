//! Tool registry for the tools a session exposes to the model.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::ai::types::{ContentBlock, ToolDescriptor};

/// Execution environment a tool runs in, resolved once per session.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub working_dir: PathBuf,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl ExecutionContext {
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    /// Resolve a path relative to the working directory (absolute paths
    /// pass through).
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let p = PathBuf::from(path);
        if p.is_absolute() {
            p
        } else {
            self.working_dir.join(p)
        }
    }
}

/// Tool execution result.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub output: String,
    pub is_error: bool,
}

impl ToolResult {
    /// Create a success result.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            is_error: false,
        }
    }

    /// Create an error result.
    pub fn error(msg: impl std::fmt::Display) -> Self {
        Self {
            output: msg.to_string(),
            is_error: true,
        }
    }

    /// Wrap the result as a `tool_result` block answering the given
    /// invocation id. Success results omit the error flag.
    pub fn into_block(self, tool_use_id: impl Into<String>) -> ContentBlock {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            output: Value::String(self.output),
            is_error: self.is_error.then_some(true),
        }
    }
}

/// Trait for tool implementations.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (id).
    fn name(&self) -> &str;

    /// Tool description for the model.
    fn description(&self) -> &str;

    /// JSON schema for parameters.
    fn parameters_schema(&self) -> Value;

    /// Capability probe used for permission classification. Tools that
    /// never mutate state report true; everything else is gated as an
    /// edit.
    fn is_read_only(&self) -> bool {
        false
    }

    /// Execute the tool.
    async fn execute(&self, params: Value, ctx: &ExecutionContext) -> ToolResult;
}

/// Registry of the tools advertised to one session's model.
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<dyn Tool>>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a tool.
    pub async fn register(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        let mut tools = self.tools.write().await;
        tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let tools = self.tools.read().await;
        tools.get(name).cloned()
    }

    /// All registered tools as model-facing descriptors.
    pub async fn descriptors(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read().await;
        tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.parameters_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct ProbeTool {
        read_only: bool,
    }

    #[async_trait]
    impl Tool for ProbeTool {
        fn name(&self) -> &str {
            if self.read_only {
                "probe_read"
            } else {
                "probe_edit"
            }
        }

        fn description(&self) -> &str {
            "Probe tool"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "additionalProperties": false})
        }

        fn is_read_only(&self) -> bool {
            self.read_only
        }

        async fn execute(&self, _params: Value, _ctx: &ExecutionContext) -> ToolResult {
            ToolResult::success("{}")
        }
    }

    #[tokio::test]
    async fn registry_returns_none_for_unknown_tool() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn registry_round_trips_registered_tools() {
        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(ProbeTool { read_only: true }))
            .await;
        registry
            .register(Arc::new(ProbeTool { read_only: false }))
            .await;

        let read = registry.get("probe_read").await.unwrap();
        assert!(read.is_read_only());
        let edit = registry.get("probe_edit").await.unwrap();
        assert!(!edit.is_read_only());

        let mut names: Vec<String> = registry
            .descriptors()
            .await
            .into_iter()
            .map(|d| d.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["probe_edit", "probe_read"]);
    }

    #[test]
    fn tool_result_success() {
        let result = ToolResult::success("listing");
        assert!(!result.is_error);
        assert_eq!(result.output, "listing");
    }

    #[test]
    fn tool_result_blocks_only_flag_errors() {
        let ok = ToolResult::success("fine").into_block("tu_1");
        match ok {
            ContentBlock::ToolResult {
                tool_use_id,
                output,
                is_error,
            } => {
                assert_eq!(tool_use_id, "tu_1");
                assert_eq!(output, Value::String("fine".to_string()));
                assert_eq!(is_error, None);
            }
            other => panic!("unexpected block: {other:?}"),
        }

        let failed = ToolResult::error("denied").into_block("tu_2");
        match failed {
            ContentBlock::ToolResult { is_error, .. } => assert_eq!(is_error, Some(true)),
            other => panic!("unexpected block: {other:?}"),
        }
    }

    #[test]
    fn execution_context_resolves_relative_paths() {
        let ctx = ExecutionContext::new(PathBuf::from("/work/project"));
        assert_eq!(
            ctx.resolve_path("src/main.rs"),
            PathBuf::from("/work/project/src/main.rs")
        );
        assert_eq!(ctx.resolve_path("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
