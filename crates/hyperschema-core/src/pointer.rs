//! # JSON Pointer Evaluation
//!
//! Small recursive lookup over decoded JSON. Pointers may carry a
//! leading `#` (URI fragment form); tokens are `/`-separated, `~1`
//! unescapes to `/` and `~0` to `~`, and empty tokens are preserved
//! (`#/a//b` addresses key `""` inside `a`). Array targets require
//! tokens made only of ASCII digits.

use serde_json::Value;

/// Split a pointer into unescaped reference tokens.
///
/// Returns `None` if the pointer is malformed (non-empty and not
/// starting with `/` after the optional `#`).
pub fn parse_tokens(pointer: &str) -> Option<Vec<String>> {
    let body = pointer.strip_prefix('#').unwrap_or(pointer);
    if body.is_empty() {
        return Some(Vec::new());
    }
    let rest = body.strip_prefix('/')?;
    Some(rest.split('/').map(unescape_token).collect())
}

/// Resolve `pointer` against `value`.
pub fn evaluate<'v>(value: &'v Value, pointer: &str) -> Option<&'v Value> {
    let tokens = parse_tokens(pointer)?;
    tokens.iter().try_fold(value, |current, token| step(current, token))
}

/// Follow a single reference token.
pub fn step<'v>(value: &'v Value, token: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(token),
        Value::Array(items) => items.get(parse_index(token)?),
        _ => None,
    }
}

/// Parse an array index token. Only plain digit strings are accepted.
pub fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Escape a key for use as a reference token.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Undo [`escape_token`].
pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
