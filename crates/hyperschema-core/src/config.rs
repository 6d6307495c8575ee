//! # Schema Configuration
//!
//! Knobs consulted while parsing and validating:
//!
//! - a regex portability validator run against every compiled pattern
//!   (`pattern`, `patternProperties` keys) at parse time;
//! - a table of custom string formats, consulted by the `format` rule
//!   before the built-in formats (a custom entry overrides a built-in of
//!   the same name);
//! - whether `allOf` failures capture a per-branch error breakdown.
//!
//! The configuration is an ordinary value. Share it between parser and
//! validator by reference or through an `Arc`; there is no global.
//!
//! Environment variables understood by [`SchemaConfig::from_env`]:
//! - `HYPERSCHEMA_ALL_OF_SUB_ERRORS` (`true`/`false`/`1`/`0`/`yes`/`no`, default: false)
//! - `HYPERSCHEMA_REGEX_VALIDATOR` (`ecma-262` or `none`, default: none)

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a string satisfies a custom format.
pub type FormatPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Predicate deciding whether a pattern source is portable.
pub type RegexValidator = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Configuration shared by the parser and the validator.
#[derive(Clone, Default)]
pub struct SchemaConfig {
    custom_formats: BTreeMap<String, FormatPredicate>,
    regex_validator: Option<RegexValidator>,
    all_of_sub_errors: bool,
}

impl fmt::Debug for SchemaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaConfig")
            .field("custom_formats", &self.custom_formats.keys().collect::<Vec<_>>())
            .field("regex_validator", &self.regex_validator.as_ref().map(|_| "<fn>"))
            .field("all_of_sub_errors", &self.all_of_sub_errors)
            .finish()
    }
}

impl SchemaConfig {
    /// Defaults: no custom formats, no regex validator, no `allOf` breakdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Some(raw) = lookup("HYPERSCHEMA_ALL_OF_SUB_ERRORS") {
            config.all_of_sub_errors = parse_flag(&raw).ok_or_else(|| {
                ConfigError::InvalidFlag("HYPERSCHEMA_ALL_OF_SUB_ERRORS".to_string(), raw.clone())
            })?;
        }

        if let Some(raw) = lookup("HYPERSCHEMA_REGEX_VALIDATOR") {
            match raw.trim() {
                "ecma-262" | "ecma262" => config = config.with_ecma262_regex(),
                "" | "none" => {}
                other => return Err(ConfigError::UnknownRegexValidator(other.to_string())),
            }
        }

        Ok(config)
    }

    /// Register (or override) a custom string format.
    pub fn with_custom_format(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.custom_formats.insert(name.into(), Arc::new(predicate));
        self
    }

    /// Install a regex portability validator.
    pub fn with_regex_validator(
        mut self,
        validator: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.regex_validator = Some(Arc::new(validator));
        self
    }

    /// Install the bundled ECMA-262 portability check.
    pub fn with_ecma262_regex(self) -> Self {
        self.with_regex_validator(ecma262_portable)
    }

    pub fn with_all_of_sub_errors(mut self, enabled: bool) -> Self {
        self.all_of_sub_errors = enabled;
        self
    }

    /// Look up a custom format predicate by name.
    pub fn custom_format(&self, name: &str) -> Option<&FormatPredicate> {
        self.custom_formats.get(name)
    }

    /// Names of all registered custom formats, sorted.
    pub fn custom_format_names(&self) -> impl Iterator<Item = &str> {
        self.custom_formats.keys().map(String::as_str)
    }

    /// Whether `pattern` passes the configured portability check.
    /// Always true when no validator is installed.
    pub fn regex_is_portable(&self, pattern: &str) -> bool {
        self.regex_validator
            .as_ref()
            .map_or(true, |validator| validator(pattern))
    }

    pub fn all_of_sub_errors(&self) -> bool {
        self.all_of_sub_errors
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid boolean for {0}: {1:?}")]
    InvalidFlag(String, String),
    #[error("unknown regex validator {0:?}, expected \"ecma-262\" or \"none\"")]
    UnknownRegexValidator(String),
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Reject pattern syntax that does not exist in ECMA-262 regular
/// expressions: inline flags and other `(?` group forms besides
/// `(?:`, `(?=`, `(?!`, `(?<=`, `(?<!` and `(?<name>`; possessive quantifiers; `\A`, `\z`, `\Z`, `\G`,
/// `\h`, `\R`, `\K`, `\p{..}`, `\Q..\E`; and POSIX bracket classes.
pub fn ecma262_portable(pattern: &str) -> bool {
    let chars: Vec<char> = pattern.chars().collect();
    let mut in_class = false;
    let mut after_quantifier = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            match chars.get(i + 1) {
                None => return false,
                Some('A' | 'Z' | 'z' | 'G' | 'h' | 'H' | 'R' | 'K' | 'p' | 'P' | 'Q' | 'E') => {
                    return false
                }
                Some(_) => {}
            }
            after_quantifier = false;
            i += 2;
            continue;
        }

        if in_class {
            match c {
                '[' if chars.get(i + 1) == Some(&':') => return false,
                ']' => in_class = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        match c {
            '[' => {
                in_class = true;
                after_quantifier = false;
            }
            '(' => {
                if chars.get(i + 1) == Some(&'?') {
                    match chars.get(i + 2) {
                        Some(':' | '=' | '!') => i += 2,
                        Some('<') => match chars.get(i + 3) {
                            Some('=' | '!') => i += 3,
                            Some(_) => match group_name_len(&chars[i + 3..]) {
                                Some(len) => i += 2 + len,
                                None => return false,
                            },
                            None => return false,
                        },
                        _ => return false,
                    }
                }
                after_quantifier = false;
            }
            '*' | '+' | '?' | '}' => {
                if after_quantifier {
                    if c == '+' {
                        return false;
                    }
                    // `??`, `*?`, `}?`: lazy suffix ends the quantifier.
                    after_quantifier = false;
                } else {
                    after_quantifier = true;
                }
            }
            _ => after_quantifier = false,
        }
        i += 1;
    }

    !in_class
}

/// Length of an ECMA-262 group name plus its closing `>`, if `rest`
/// starts with one.
fn group_name_len(rest: &[char]) -> Option<usize> {
    let first = *rest.first()?;
    if !(first.is_alphabetic() || first == '_' || first == '$') {
        return None;
    }
    let close = rest.iter().position(|&c| c == '>')?;
    rest[1..close]
        .iter()
        .all(|&c| c.is_alphanumeric() || c == '_' || c == '$')
        .then_some(close + 1)
}
