//! JSON extraction fallback chain for freeform LLM prose: raw parse,
//! then a fenced code block, then a balanced-brace scan. New code (the
//! teacher's `llm` crate consumes typed provider SDKs, not freeform
//! text), grounded on the degrade-gracefully shape of a `ToolCall`
//! parse in `langgraph-core::llm`.

use regex::Regex;
use serde_json::Value;

use crate::error::{GatewayError, Result};

pub fn extract_json(content: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content.trim()) {
        return Ok(value);
    }

    if let Some(block) = fenced_code_block(content) {
        if let Ok(value) = serde_json::from_str::<Value>(&block) {
            return Ok(value);
        }
    }

    if let Some(object) = balanced_brace_scan(content) {
        return Ok(serde_json::from_str(&object)?);
    }

    Err(GatewayError::NoJsonFound)
}

fn fenced_code_block(content: &str) -> Option<String> {
    let re = Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").unwrap();
    re.captures(content).map(|c| c[1].to_string())
}

/// Scans for the first `{` and returns the substring up to its
/// matching `}`, tracking nesting depth and skipping braces inside
/// string literals.
fn balanced_brace_scan(content: &str) -> Option<String> {
    let start = content.find('{')?;
    let bytes = content.as_bytes();
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        let ch = byte as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    return Some(content[start..end].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_raw_json() {
        let value = extract_json(r#"{"tool": "execute_command"}"#).unwrap();
        assert_eq!(value["tool"], "execute_command");
    }

    #[test]
    fn parses_fenced_json_block() {
        let content = "Here is the result:\n```json\n{\"tool\": \"execute_command\"}\n```\nDone.";
        let value = extract_json(content).unwrap();
        assert_eq!(value["tool"], "execute_command");
    }

    #[test]
    fn parses_json_embedded_in_prose_via_brace_scan() {
        let content = "Sure, the command is {\"tool\": \"execute_command\", \"parameters\": {\"command\": \"ls\"}} as requested.";
        let value = extract_json(content).unwrap();
        assert_eq!(value["parameters"]["command"], "ls");
    }

    #[test]
    fn returns_error_when_no_json_present() {
        assert!(extract_json("no json here at all").is_err());
    }

    #[test]
    fn brace_scan_ignores_braces_inside_strings() {
        let content = r#"{"description": "uses a { in prose", "tool": "x"}"#;
        let value = extract_json(content).unwrap();
        assert_eq!(value["tool"], "x");
    }
}
