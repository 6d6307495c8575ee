//! # hyperschema-schema: Parse, Expand, Validate
//!
//! Compiles JSON Schema draft-04 documents (plus the hyper-schema `links`
//! and `media` keywords and the non-standard `strictProperties`) into an
//! in-memory graph and validates decoded JSON data against it.
//!
//! ## Pipeline
//!
//! 1. **Parse** ([`parser`]). Decoded JSON becomes nodes of a
//!    [`SchemaGraph`]. Keyword shapes are checked and every structural
//!    error in the document is reported at once. `$ref` objects become
//!    placeholders.
//!
//! 2. **Expand** ([`expand`]). Placeholders are resolved against the same
//!    document or against other documents registered in a
//!    [`DocumentStore`], including cyclic references.
//!
//! 3. **Validate** ([`validate`]). A recursive rule engine checks data in
//!    collect-all or fail-fast [`Mode`].
//!
//! [`SchemaSet`] ties the three together for the common case.
//!
//! ## Crate Policy
//!
//! - Depends only on `hyperschema-core` internally.
//! - No network access: references to remote documents must be
//!   pre-registered in the store.
//! - Errors are returned, never logged and swallowed.

pub mod expand;
pub mod format;
pub mod keyword;
pub mod node;
pub mod parser;
pub mod session;
pub mod store;
pub mod validate;

pub use expand::Expander;
pub use keyword::{Keyword, KeywordValue};
pub use node::{
    Additional, Dependency, Items, Keywords, Link, Media, Pattern, Reference, SchemaGraph,
    SchemaNode, SimpleType,
};
pub use parser::Parser;
pub use session::SchemaSet;
pub use store::DocumentStore;
pub use validate::{Mode, Validator};
