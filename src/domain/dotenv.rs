//! Dotenv parsing for `run --env-file`

use std::collections::BTreeMap;

use crate::domain::error::DomainError;

/// Parse dotenv content into an ordered map.
///
/// Accepts `KEY=value` and `export KEY=value` lines. Blank lines and
/// `#` comments are skipped; surrounding quotes and trailing comments are
/// stripped from values. Later keys override earlier ones.
pub fn parse_dotenv(content: &str) -> Result<BTreeMap<String, String>, DomainError> {
    let mut variables = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let rest = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        match parse_env_line(rest) {
            Some((key, value)) if is_valid_key(key) => {
                variables.insert(key.to_string(), value);
            }
            Some((key, _)) => {
                return Err(DomainError::InvalidDotenv {
                    line: index + 1,
                    message: format!("invalid variable name: {key:?}"),
                });
            }
            None => {
                return Err(DomainError::InvalidDotenv {
                    line: index + 1,
                    message: "expected KEY=value".into(),
                });
            }
        }
    }

    Ok(variables)
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a single `KEY=value` line.
/// Returns (key, value) with trailing comments and quotes stripped from value.
fn parse_env_line(line: &str) -> Option<(&str, String)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    let value = strip_trailing_comment(value);
    let value = strip_quotes(value);

    Some((key, value))
}

/// Strip trailing comment from a value, respecting quotes.
/// `'value'  # comment` → `'value'`
/// `'val#ue'` → `'val#ue'` (# inside quotes is not a comment)
fn strip_trailing_comment(s: &str) -> &str {
    let s = s.trim();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for (i, b) in s.bytes().enumerate() {
        match b {
            b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
            b'"' if !in_single_quote => in_double_quote = !in_double_quote,
            b'#' if !in_single_quote && !in_double_quote => {
                return s[..i].trim_end();
            }
            _ => {}
        }
    }
    s
}

/// Strip surrounding quotes (single or double) from a value.
fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    let quoted = (s.starts_with('"') && s.ends_with('"'))
        || (s.starts_with('\'') && s.ends_with('\''));
    if quoted && s.len() >= 2 {
        return s[1..s.len() - 1].to_string();
    }
    s.to_string()
}

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
///
/// Leaves the input unchanged when a variable is undefined.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
