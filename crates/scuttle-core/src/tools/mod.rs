//! Tool seam
//!
//! The trait sub-agent tools implement, the execution context they run in,
//! and the registry a session advertises to the model.

pub mod registry;

pub use registry::{ExecutionContext, Tool, ToolRegistry, ToolResult};
