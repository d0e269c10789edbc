use std::sync::Arc;

use returns_agent::{AgentRuntime, ToolCall, ToolCallStatus};
use returns_core::{Clock, SystemClock};
use serde_json::{json, Value};

use super::{load_config, CommandResult, EXIT_INVALID_ARGUMENT};

const COMMAND: &str = "tool";
const LIST_COMMAND: &str = "tools";

/// Exit code when a tool call is dispatched but reports an error outcome.
pub const EXIT_TOOL_FAILED: u8 = 1;

pub fn list() -> CommandResult {
    let config = match load_config(LIST_COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let agent = AgentRuntime::from_config(&config, Arc::new(SystemClock));
    let tools = agent.tools();
    CommandResult::success_with_data(
        LIST_COMMAND,
        format!("{} tools registered", tools.len()),
        Some(json!(tools)),
    )
}

/// Dispatches one tool call the same way the support agent does.
pub fn run(name: &str, input: Option<&str>, correlation_id: Option<&str>) -> CommandResult {
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let input = match input.map(serde_json::from_str::<Value>).transpose() {
        Ok(input) => input.unwrap_or(Value::Null),
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "invalid_argument",
                format!("--input must be a JSON document: {error}"),
                EXIT_INVALID_ARGUMENT,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_TOOL_FAILED,
            );
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let agent = AgentRuntime::from_config(&config, clock);
    let outcome = runtime.block_on(agent.handle_tool_call(ToolCall {
        name: name.to_string(),
        input,
        correlation_id: correlation_id.map(str::to_string),
    }));

    let data = serde_json::to_value(&outcome).ok();
    match (outcome.status, outcome.error) {
        (ToolCallStatus::Ok, _) => {
            CommandResult::success_with_data(COMMAND, format!("`{name}` completed"), data)
        }
        (ToolCallStatus::Error, failure) => {
            let (error_class, message) = failure
                .map(|failure| (failure.error_class, failure.user_message))
                .unwrap_or_else(|| ("internal".to_string(), "tool call failed".to_string()));
            CommandResult::failure_with_data(COMMAND, &error_class, message, EXIT_TOOL_FAILED, data)
        }
    }
}
