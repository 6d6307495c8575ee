//! # hyperschema-cli
//!
//! Command-line front end for the hyperschema crates. Argument parsing
//! lives here; parsing, expansion and validation are delegated to
//! `hyperschema-schema`.
//!
//! ## Subcommands
//!
//! - `validate`: check data files against a schema, with optional
//!   supporting documents preloaded into the document store
//!
//! Schemas and data may be JSON or YAML, chosen by file extension.

pub mod load;
pub mod validate;
