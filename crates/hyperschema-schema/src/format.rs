//! # String Formats
//!
//! Built-in `format` checks plus lookup into the configured custom
//! format table. Custom entries are consulted first, so a custom format
//! registered under a built-in name replaces it.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use url::Url;

use hyperschema_core::SchemaConfig;

/// Names of the formats understood without configuration.
pub const BUILTIN_FORMATS: [&str; 10] = [
    "date",
    "date-time",
    "email",
    "hostname",
    "ipv4",
    "ipv6",
    "regex",
    "uri",
    "uri-reference",
    "uuid",
];

const EMAIL: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$";
const HOSTNAME: &str =
    r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$";

/// Whether `name` is a built-in or registered custom format.
pub fn is_known(config: &SchemaConfig, name: &str) -> bool {
    config.custom_format(name).is_some() || BUILTIN_FORMATS.contains(&name)
}

/// All known format names: custom ones first, then built-ins.
pub fn known_names(config: &SchemaConfig) -> Vec<&str> {
    let mut names: Vec<&str> = config.custom_format_names().collect();
    for builtin in BUILTIN_FORMATS {
        if !names.contains(&builtin) {
            names.push(builtin);
        }
    }
    names
}

/// Check `value` against the named format. Unknown names pass.
pub fn check(config: &SchemaConfig, name: &str, value: &str) -> bool {
    if let Some(predicate) = config.custom_format(name) {
        return predicate(value);
    }
    check_builtin(name, value).unwrap_or(true)
}

fn check_builtin(name: &str, value: &str) -> Option<bool> {
    let valid = match name {
        "date" => is_date(value),
        "date-time" => DateTime::parse_from_rfc3339(value).is_ok(),
        "email" => matches_cached(&EMAIL_RE, EMAIL, value),
        "hostname" => value.len() <= 255 && matches_cached(&HOSTNAME_RE, HOSTNAME, value),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        "regex" => Regex::new(value).is_ok(),
        "uri" => Url::parse(value).is_ok(),
        "uri-reference" => is_uri_reference(value),
        "uuid" => value.len() == 36 && uuid::Uuid::try_parse(value).is_ok(),
        _ => return None,
    };
    Some(valid)
}

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
static HOSTNAME_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn matches_cached(cell: &OnceLock<Option<Regex>>, source: &str, value: &str) -> bool {
    cell.get_or_init(|| Regex::new(source).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(value))
}

fn is_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_uri_reference(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    if Url::parse(value).is_ok() {
        return true;
    }
    Url::parse("http://uri-reference.invalid/")
        .and_then(|base| base.join(value))
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin(name: &str, value: &str) -> bool {
        check(&SchemaConfig::new(), name, value)
    }

    #[test]
    fn dates() {
        assert!(builtin("date", "2024-02-29"));
        assert!(!builtin("date", "2023-02-29"));
        assert!(!builtin("date", "2024-2-9"));
        assert!(builtin("date-time", "2024-02-29T12:30:00Z"));
        assert!(builtin("date-time", "2024-02-29T12:30:00.5+02:00"));
        assert!(!builtin("date-time", "2024-02-29 12:30"));
    }

    #[test]
    fn network_formats() {
        assert!(builtin("email", "dev@example.com"));
        assert!(!builtin("email", "not an email"));
        assert!(builtin("hostname", "api.example.com"));
        assert!(!builtin("hostname", "-bad-.example.com"));
        assert!(builtin("ipv4", "192.168.0.1"));
        assert!(!builtin("ipv4", "256.1.1.1"));
        assert!(builtin("ipv6", "::1"));
        assert!(!builtin("ipv6", "12345::"));
    }

    #[test]
    fn uris_and_identifiers() {
        assert!(builtin("uri", "https://example.com/a?b=c"));
        assert!(!builtin("uri", "/relative/path"));
        assert!(builtin("uri-reference", "/relative/path#frag"));
        assert!(!builtin("uri-reference", "has space"));
        assert!(builtin("uuid", "6f1f2c1e-2b8e-4c4f-9d8e-0c2b3a4d5e6f"));
        assert!(!builtin("uuid", "6f1f2c1e2b8e4c4f9d8e0c2b3a4d5e6f"));
        assert!(builtin("regex", "^a+$"));
        assert!(!builtin("regex", "(unclosed"));
    }

    #[test]
    fn custom_formats_override_builtins() {
        let config = SchemaConfig::new()
            .with_custom_format("uuid", |s| s == "anything")
            .with_custom_format("the-answer", |s| s == "42");
        assert!(check(&config, "uuid", "anything"));
        assert!(!check(&config, "uuid", "6f1f2c1e-2b8e-4c4f-9d8e-0c2b3a4d5e6f"));
        assert!(check(&config, "the-answer", "42"));
        assert!(is_known(&config, "the-answer"));
        assert!(!is_known(&config, "the-question"));
        assert_eq!(known_names(&config).len(), 11);
    }

    #[test]
    fn unknown_formats_pass() {
        assert!(builtin("color", "whatever"));
    }
}
