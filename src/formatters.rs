//! Formatters - Different output formatters for operation outcomes

use crate::outcome::Outcome;
use serde_json::Value;
use std::io::Write;

/// Formatter trait
pub trait Formatter {
    fn format(&self, outcome: &Outcome) -> String;
    fn write_to(&self, outcome: &Outcome, writer: &mut dyn Write) -> std::io::Result<()> {
        write!(writer, "{}", self.format(outcome))
    }
}

/// Shell formatter - colored status line followed by the details
pub struct ShellFormatter;

impl Formatter for ShellFormatter {
    fn format(&self, outcome: &Outcome) -> String {
        let prefix = if outcome.success {
            "\x1b[32m✓\x1b[0m"
        } else {
            "\x1b[31m✗\x1b[0m"
        };
        let message = outcome.message.as_deref().unwrap_or("");
        let mut feedback = format!(
            "{} {}: {}\n",
            prefix,
            outcome.operation.to_string().to_uppercase(),
            message
        );
        for line in detail_lines(outcome) {
            feedback.push_str(&line);
            feedback.push('\n');
        }
        feedback
    }
}

/// Text formatter - plain message and profile names, no decoration
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, outcome: &Outcome) -> String {
        let mut text = String::new();
        if let Some(message) = &outcome.message {
            text.push_str(message);
            text.push('\n');
        }
        for name in profile_names(outcome) {
            text.push_str(name);
            text.push('\n');
        }
        text
    }
}

/// JSON formatter - returns JSON string of structured data
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, outcome: &Outcome) -> String {
        let mut json = serde_json::to_string(outcome).unwrap_or_else(|_| "{}".to_string());
        json.push('\n');
        json
    }
}

fn profile_names(outcome: &Outcome) -> Vec<&str> {
    outcome
        .get_detail("profiles")
        .and_then(Value::as_array)
        .map(|profiles| {
            profiles
                .iter()
                .filter_map(|p| p.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn detail_lines(outcome: &Outcome) -> Vec<String> {
    let current = outcome.get_detail("current").and_then(Value::as_str);
    let mut lines = Vec::new();
    for (key, value) in &outcome.details {
        match (key.as_str(), value) {
            ("profiles", Value::Array(profiles)) => {
                for profile in profiles {
                    let name = profile.get("name").and_then(Value::as_str).unwrap_or("");
                    let id = profile.get("id").and_then(Value::as_str).unwrap_or("");
                    let marker = if current == Some(name) { "*" } else { " " };
                    lines.push(format!("  {marker} {name} ({id})"));
                }
            }
            ("current", _) => {}
            (key, Value::String(s)) => lines.push(format!("  {key}: {s}")),
            (key, value) => lines.push(format!("  {key}: {value}")),
        }
    }
    lines
}

/// Formatters module - factory for creating formatters
pub struct Formatters;

impl Formatters {
    pub fn by_name(name: &str) -> Box<dyn Formatter> {
        match name.to_lowercase().as_str() {
            "shell" => Box::new(ShellFormatter),
            "text" => Box::new(TextFormatter),
            "json" => Box::new(JsonFormatter),
            _ => Box::new(ShellFormatter),
        }
    }
}
