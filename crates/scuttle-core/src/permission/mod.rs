//! Permission gating
//!
//! Policy state shared across sessions, the decision engine that resolves
//! proposed tool invocations against it, and the confirmation seam used
//! when no cached rule applies.

pub mod confirm;
pub mod context;
pub mod engine;

pub use confirm::{
    ChannelConfirmation, ConfirmationChoice, ConfirmationHandler, ConfirmationRequest,
    GrantScope, PendingConfirmation,
};
pub use context::{
    PermissionContextHandle, PermissionMode, PermissionRule, ToolPermissionContext,
};
pub use engine::{
    AlwaysGrant, ConfirmationOptions, GateDecision, GateObserver, GateOutcome, NoopObserver,
    PermissionGate, ToolUseKind,
};
