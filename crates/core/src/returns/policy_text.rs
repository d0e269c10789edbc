use std::fmt::{self, Write};

use tracing::warn;

const BANNER: &str = "📋 Return Policy Information";
const HELP_TIP: &str = "💡 Tip: If you have specific questions about your return, I can help!";
const RULE_WIDTH: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineKind {
    Blank,
    Header,
    Bullet,
    Text,
}

fn classify(line: &str) -> LineKind {
    if line.is_empty() {
        LineKind::Blank
    } else if is_upper_case(line) || line.ends_with(':') {
        LineKind::Header
    } else if line.starts_with('-') || line.starts_with('•') {
        LineKind::Bullet
    } else {
        LineKind::Text
    }
}

/// True when the line has at least one cased letter and none of them are lower case.
fn is_upper_case(line: &str) -> bool {
    let mut saw_cased = false;
    for ch in line.chars() {
        if ch.is_lowercase() {
            return false;
        }
        saw_cased |= ch.is_uppercase();
    }
    saw_cased
}

/// Renders knowledge-base policy text for a customer.
pub fn format_policy_response(policy_text: &str, customer_question: &str) -> String {
    match render(policy_text, customer_question) {
        Ok(formatted) => formatted,
        Err(error) => {
            warn!(event_name = "engine.policy.format_failed", error = %error, "policy formatting failed");
            format!("Error formatting policy: {error}")
        }
    }
}

fn render(policy_text: &str, customer_question: &str) -> Result<String, fmt::Error> {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::with_capacity(policy_text.len() + 256);

    writeln!(out, "{BANNER}")?;
    writeln!(out, "{rule}")?;
    writeln!(out)?;

    if !customer_question.is_empty() {
        writeln!(out, "Regarding: {customer_question}")?;
        writeln!(out)?;
    }

    for raw in policy_text.trim().split('\n') {
        let line = raw.trim();
        match classify(line) {
            LineKind::Blank => writeln!(out)?,
            LineKind::Header => {
                writeln!(out)?;
                writeln!(out, "{line}")?;
            }
            LineKind::Bullet => writeln!(out, "  {line}")?,
            LineKind::Text => writeln!(out, "{line}")?,
        }
    }

    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "{HELP_TIP}")?;

    Ok(out)
}
