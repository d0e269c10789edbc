use std::sync::Arc;

use returns_core::config::AppConfig;
use returns_core::{
    ApplicationError, Clock, DeterministicReturnsRuntime, DomainError, InterfaceError,
    ReturnsRuntime,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::tools::{ToolDescriptor, ToolError, ToolRegistry};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    Ok,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallFailure {
    pub error_class: String,
    pub message: String,
    pub user_message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    pub tool: String,
    pub correlation_id: String,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolCallFailure>,
}

pub struct AgentRuntime {
    tools: ToolRegistry,
}

impl AgentRuntime {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    /// Wires the returns tools against the configured window table.
    pub fn from_config(config: &AppConfig, clock: Arc<dyn Clock>) -> Self {
        let returns: Arc<dyn ReturnsRuntime> =
            Arc::new(DeterministicReturnsRuntime::with_clock(clock.clone(), config.window_table()));
        Self::new(ToolRegistry::returns_default(returns, clock))
    }

    pub fn tools(&self) -> Vec<ToolDescriptor> {
        self.tools.descriptors()
    }

    pub async fn handle_tool_call(&self, call: ToolCall) -> ToolCallOutcome {
        let correlation_id = call.correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        info!(
            event_name = "agent.tool.invoked",
            tool = %call.name,
            correlation_id = %correlation_id,
            "dispatching tool call"
        );

        match self.tools.invoke(&call.name, call.input).await {
            Ok(output) => {
                info!(
                    event_name = "agent.tool.completed",
                    tool = %call.name,
                    correlation_id = %correlation_id,
                    "tool call completed"
                );
                ToolCallOutcome {
                    tool: call.name,
                    correlation_id,
                    status: ToolCallStatus::Ok,
                    output: Some(output),
                    error: None,
                }
            }
            Err(error) => {
                let interface = classify(error).into_interface(correlation_id.clone());
                warn!(
                    event_name = "agent.tool.failed",
                    tool = %call.name,
                    correlation_id = %correlation_id,
                    error_class = interface.error_class(),
                    error = %interface,
                    "tool call failed"
                );
                ToolCallOutcome {
                    tool: call.name,
                    correlation_id,
                    status: ToolCallStatus::Error,
                    output: None,
                    error: Some(ToolCallFailure {
                        error_class: interface.error_class().to_string(),
                        message: interface.to_string(),
                        user_message: interface.user_message().to_string(),
                    }),
                }
            }
        }
    }
}

fn classify(error: ToolError) -> ApplicationError {
    match error {
        ToolError::UnknownTool(name) => {
            DomainError::invalid_input("name", format!("unknown tool `{name}`")).into()
        }
        ToolError::Execution { source, .. } => match source.downcast::<DomainError>() {
            Ok(domain) => domain.into(),
            Err(other) => match other.downcast::<ApplicationError>() {
                Ok(application) => application,
                Err(other) => ApplicationError::Integration(format!("{other:#}")),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use returns_core::config::AppConfig;
    use returns_core::{Clock, FixedClock};
    use serde_json::{json, Value};

    use super::{AgentRuntime, ToolCall, ToolCallStatus};
    use crate::tools::{Tool, ToolRegistry};

    fn runtime() -> AgentRuntime {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::on_date(
            NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date"),
        ));
        AgentRuntime::from_config(&AppConfig::default(), clock)
    }

    #[tokio::test]
    async fn successful_call_keeps_caller_correlation_id() {
        let outcome = runtime()
            .handle_tool_call(ToolCall {
                name: "check_return_eligibility".to_owned(),
                input: json!({ "purchase_date": "2025-01-15", "category": "books" }),
                correlation_id: Some("req-7".to_owned()),
            })
            .await;

        assert_eq!(outcome.status, ToolCallStatus::Ok);
        assert_eq!(outcome.correlation_id, "req-7");
        let output = outcome.output.expect("output present");
        assert_eq!(output["eligible"], false);
        assert_eq!(output["reason_code"], "EXCEEDED_WINDOW");
    }

    #[tokio::test]
    async fn malformed_input_becomes_bad_request() {
        let outcome = runtime()
            .handle_tool_call(ToolCall {
                name: "calculate_refund_amount".to_owned(),
                input: json!({ "original_price": "abc", "condition": "new", "return_reason": "x" }),
                correlation_id: None,
            })
            .await;

        assert_eq!(outcome.status, ToolCallStatus::Error);
        assert!(!outcome.correlation_id.is_empty());
        let failure = outcome.error.expect("failure details");
        assert_eq!(failure.error_class, "bad_request");
        assert_eq!(
            failure.user_message,
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[tokio::test]
    async fn unknown_tool_becomes_bad_request() {
        let outcome = runtime()
            .handle_tool_call(ToolCall {
                name: "cancel_order".to_owned(),
                input: Value::Null,
                correlation_id: Some("req-8".to_owned()),
            })
            .await;

        let failure = outcome.error.expect("failure details");
        assert_eq!(failure.error_class, "bad_request");
        assert!(failure.message.contains("cancel_order"));
    }

    #[tokio::test]
    async fn unknown_order_becomes_not_found() {
        let outcome = runtime()
            .handle_tool_call(ToolCall {
                name: "lookup_order".to_owned(),
                input: json!({ "order_id": "ORD-404" }),
                correlation_id: Some("req-9".to_owned()),
            })
            .await;

        assert_eq!(outcome.status, ToolCallStatus::Error);
        assert_eq!(outcome.correlation_id, "req-9");
        let failure = outcome.error.expect("failure details");
        assert_eq!(failure.error_class, "not_found");
        assert!(failure.message.contains("ORD-404"));
        assert!(failure.message.contains("ORD-001, ORD-002, ORD-003"));
    }

    #[tokio::test]
    async fn unexpected_tool_failure_is_service_unavailable() {
        struct FlakyTool;

        #[async_trait]
        impl Tool for FlakyTool {
            fn name(&self) -> &'static str {
                "flaky"
            }

            fn description(&self) -> &'static str {
                "always fails"
            }

            async fn execute(&self, _input: Value) -> Result<Value> {
                anyhow::bail!("upstream timed out")
            }
        }

        let mut registry = ToolRegistry::default();
        registry.register(FlakyTool);
        let outcome = AgentRuntime::new(registry)
            .handle_tool_call(ToolCall {
                name: "flaky".to_owned(),
                input: Value::Null,
                correlation_id: None,
            })
            .await;

        let failure = outcome.error.expect("failure details");
        assert_eq!(failure.error_class, "service_unavailable");
        assert!(failure.message.contains("upstream timed out"));
    }

    #[test]
    fn tool_call_deserializes_without_optional_fields() {
        let call: ToolCall =
            serde_json::from_value(json!({ "name": "current_time" })).expect("valid tool call");

        assert_eq!(call.name, "current_time");
        assert!(call.input.is_null());
        assert!(call.correlation_id.is_none());
        assert_eq!(runtime().tools().len(), 5);
    }
}
