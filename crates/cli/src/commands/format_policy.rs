use std::fs;
use std::path::Path;

use returns_core::format_policy_response;
use serde_json::json;

use super::{CommandResult, EXIT_INVALID_ARGUMENT};

const COMMAND: &str = "format-policy";

pub enum PolicySource<'a> {
    File(&'a Path),
    Text(&'a str),
}

pub fn run(source: PolicySource<'_>, question: Option<&str>, raw: bool) -> CommandResult {
    let policy_text = match source {
        PolicySource::Text(text) => text.to_string(),
        PolicySource::File(path) => match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) => {
                return CommandResult::failure(
                    COMMAND,
                    "invalid_argument",
                    format!("could not read policy file `{}`: {error}", path.display()),
                    EXIT_INVALID_ARGUMENT,
                );
            }
        },
    };

    let formatted = format_policy_response(&policy_text, question.unwrap_or_default());
    if raw {
        return CommandResult::plain(formatted);
    }

    CommandResult::success_with_data(
        COMMAND,
        "policy formatted",
        Some(json!({ "formatted": formatted })),
    )
}
