//! CLI output formatting utilities.
//!
//! This module provides utilities for formatting CLI output: highlighted
//! JSON, short cell values for tables and transaction summaries.

use colored::Colorize;
use serde::Serialize;

use crate::error::WallspaceError;
use crate::transaction::{TransactionReport, TransactionStatus};

/// Serializes `value` and prints it as highlighted JSON.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), WallspaceError> {
    let value = serde_json::to_value(value)?;
    print_highlighted_json(&value);
    Ok(())
}

/// Prints JSON with syntax highlighting.
///
/// Colors:
/// - Keys: Cyan
/// - Strings: Green
/// - Numbers: Yellow
/// - Booleans/Null: Magenta
/// - Brackets/Braces: White (default)
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json_str = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    print_highlighted_json_str(&json_str);
}

/// Prints a JSON string with syntax highlighting.
fn print_highlighted_json_str(json: &str) {
    let mut in_string = false;
    let mut is_key = false;
    let mut escape_next = false;
    let mut current_token = String::new();
    let mut after_colon = false;

    for ch in json.chars() {
        if escape_next {
            current_token.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current_token.push(ch);
            escape_next = true;
            continue;
        }

        match ch {
            '"' => {
                if in_string {
                    // End of string
                    current_token.push(ch);
                    if is_key {
                        print!("{}", current_token.cyan());
                    } else {
                        print!("{}", current_token.green());
                    }
                    current_token.clear();
                    in_string = false;
                    is_key = false;
                } else {
                    // Start of string
                    flush_token(&mut current_token, after_colon);
                    current_token.push(ch);
                    in_string = true;
                    // It's a key if we're not after a colon
                    is_key = !after_colon;
                    after_colon = false;
                }
            }
            ':' if !in_string => {
                flush_token(&mut current_token, false);
                print!("{}", ":".white());
                after_colon = true;
            }
            ',' if !in_string => {
                flush_token(&mut current_token, after_colon);
                print!("{}", ",".white());
                after_colon = false;
            }
            '{' | '}' | '[' | ']' if !in_string => {
                flush_token(&mut current_token, after_colon);
                print!("{}", ch.to_string().white().bold());
                after_colon = false;
            }
            _ => {
                current_token.push(ch);
            }
        }
    }

    // Flush any remaining token
    flush_token(&mut current_token, after_colon);
    println!();
}

/// Flushes the current token with appropriate coloring.
fn flush_token(token: &mut String, is_value: bool) {
    if token.is_empty() {
        return;
    }

    let trimmed = token.trim();
    if trimmed.is_empty() {
        print!("{token}");
    } else if is_value {
        // Find the actual value position in the token
        let start = token.find(|c: char| !c.is_whitespace()).unwrap_or(0);
        let end = token.rfind(|c: char| !c.is_whitespace()).map_or(token.len(), |i| i + 1);

        let prefix = &token[..start];
        let value = &token[start..end];
        let suffix = &token[end..];

        // Check if it's a number, boolean, or null
        if value == "true" || value == "false" || value == "null" {
            print!("{}{}{}", prefix, value.magenta(), suffix);
        } else if value.parse::<f64>().is_ok() {
            print!("{}{}{}", prefix, value.yellow(), suffix);
        } else {
            print!("{token}");
        }
    } else {
        print!("{token}");
    }

    token.clear();
}

/// Truncates a string to a maximum number of characters, adding ellipsis if needed.
///
/// This function correctly handles multi-byte UTF-8 characters by counting
/// characters rather than bytes.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        // Find the byte index of the (max_chars - 1)th character
        let truncate_at = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
        format!("{}…", &s[..truncate_at])
    }
}

/// Formats a boolean as a colored string.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

/// Formats an optional cell value, using a dimmed dash for `None`.
#[must_use]
pub fn format_optional(value: Option<&str>) -> String {
    value.map_or_else(|| "-".dimmed().to_string(), ToString::to_string)
}

/// One-line summary of a transaction outcome.
#[must_use]
pub fn describe_report(report: &TransactionReport) -> String {
    match &report.status {
        TransactionStatus::Verified => format!("{} {}", "Applied:".green().bold(), report.expected),
        TransactionStatus::WrittenUnverified => format!(
            "{} {} {}",
            "Written:".yellow().bold(),
            report.expected,
            "(takes effect after `wallspace restart`)".dimmed()
        ),
        TransactionStatus::RolledBack { reason } => {
            let restored = if report.restored { "backup restored" } else { "backup NOT restored" };
            format!("{} {reason} ({restored})", "Rolled back:".red().bold())
        }
    }
}

/// Prints a transaction report and turns a rollback into an error.
///
/// # Errors
///
/// Returns `RolledBack` when the change did not take effect.
pub fn print_report(report: &TransactionReport, json: bool) -> Result<(), WallspaceError> {
    if json {
        print_json(report)?;
    } else {
        for line in &report.trace {
            println!("{}", line.dimmed());
        }
        println!("{}", describe_report(report));
    }

    match &report.status {
        TransactionStatus::RolledBack { reason } => Err(WallspaceError::RolledBack(reason.clone())),
        TransactionStatus::Verified | TransactionStatus::WrittenUnverified => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        assert_eq!(truncate("hello world", 8), "hello w…");
    }

    #[test]
    fn test_truncate_exact_length() {
        assert_eq!(truncate("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_min_length() {
        assert_eq!(truncate("hello", 1), "…");
    }

    #[test]
    fn test_truncate_multibyte_utf8() {
        // Middle dot is 2 bytes in UTF-8
        let s = "file.md · wallspace";
        // Should truncate at character boundary, not byte boundary
        assert_eq!(truncate(s, 10), "file.md ·…");
        // Full string should not be truncated
        assert_eq!(truncate(s, 20), s);
    }

    #[test]
    fn test_truncate_emoji() {
        // Test with emoji (4 bytes in UTF-8)
        let s = "hello 🌍 world";
        assert_eq!(truncate(s, 8), "hello 🌍…");
    }

    #[test]
    fn test_format_bool_true() {
        let result = format_bool(true);
        assert!(result.contains('✓'));
    }

    #[test]
    fn test_format_bool_false() {
        let result = format_bool(false);
        assert!(result.contains('✗'));
    }

    #[test]
    fn test_format_optional_some() {
        assert_eq!(format_optional(Some("fill")), "fill");
    }

    #[test]
    fn test_format_optional_none() {
        assert!(format_optional(None).contains('-'));
    }

    fn report(status: TransactionStatus, restored: bool) -> TransactionReport {
        TransactionReport {
            status,
            states: Vec::new(),
            expected: "Drift".to_string(),
            observed: None,
            restored,
            trace: Vec::new(),
        }
    }

    #[test]
    fn test_describe_report_verified() {
        let line = describe_report(&report(TransactionStatus::Verified, true));
        assert!(line.contains("Applied:"));
        assert!(line.contains("Drift"));
    }

    #[test]
    fn test_describe_report_rollback_mentions_restore_failure() {
        let status = TransactionStatus::RolledBack { reason: "observed Flurry".to_string() };
        let line = describe_report(&report(status, false));
        assert!(line.contains("observed Flurry"));
        assert!(line.contains("NOT restored"));
    }

    #[test]
    fn test_print_report_rollback_is_error() {
        let status = TransactionStatus::RolledBack { reason: "mismatch".to_string() };
        let result = print_report(&report(status, true), true);
        assert!(matches!(result, Err(WallspaceError::RolledBack(reason)) if reason == "mismatch"));
    }

    #[test]
    fn test_print_report_unverified_is_ok() {
        assert!(print_report(&report(TransactionStatus::WrittenUnverified, true), false).is_ok());
    }
}
