//! # hyperschema-core: Foundational Types
//!
//! Shared building blocks for the hyperschema pipeline (parse → expand →
//! validate). Every other crate in the workspace depends on
//! `hyperschema-core`; it depends on nothing internal.
//!
//! ## Contents
//!
//! 1. **Error model** ([`error`]). Structural, resolution and validation
//!    errors, each rendering as one `"{pointer}: {message}"` line and
//!    carrying a kebab-case [`ErrorKind`] tag.
//!
//! 2. **Node identity** ([`identity`]). [`NodeId`] arena indices replace
//!    object identity for parent links, clone sets and cycle checks.
//!
//! 3. **JSON Pointer** ([`pointer`]). Lookup over decoded JSON with
//!    `~0`/`~1` unescaping and preserved empty segments.
//!
//! 4. **Configuration** ([`config`]). Regex portability validator,
//!    custom format table, and the `allOf` diagnostics switch.
//!
//! 5. **Value helpers** ([`value`]). Kind names and value equality with
//!    numbers compared by mathematical value.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `hyperschema-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod error;
pub mod identity;
pub mod pointer;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use config::{ConfigError, FormatPredicate, RegexValidator, SchemaConfig};
pub use error::{
    DataPath, ErrorCategory, ErrorKind, ErrorList, HyperschemaError, KeywordError, PathSegment,
    SchemaError, StoreError, ValidationError,
};
pub use identity::NodeId;
