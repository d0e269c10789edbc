//! Agent tool surface for the returns assistant.
//!
//! The conversational model never decides eligibility or refund amounts. It
//! calls the tools registered here, which delegate to the deterministic
//! engine in `returns-core`:
//!
//! - `check_return_eligibility` - purchase date + category → verdict
//! - `calculate_refund_amount` - price + condition + reason → breakdown
//! - `format_policy_response` - raw policy text → customer-facing text
//! - `current_time` - the injected clock, in UTC
//!
//! [`runtime::AgentRuntime`] dispatches a [`runtime::ToolCall`] and always
//! answers with a well-formed [`runtime::ToolCallOutcome`]; failures are mapped
//! to user-safe interface errors instead of being propagated.

pub mod runtime;
pub mod tools;

pub use runtime::{AgentRuntime, ToolCall, ToolCallFailure, ToolCallOutcome, ToolCallStatus};
pub use tools::{Tool, ToolDescriptor, ToolError, ToolRegistry};
