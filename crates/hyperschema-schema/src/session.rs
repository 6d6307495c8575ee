//! # Schema Sessions
//!
//! [`SchemaSet`] owns one schema graph, the document store its references
//! resolve against, and the configuration shared by parsing and
//! validation. It is the entry point most callers need:
//!
//! ```
//! use hyperschema_schema::SchemaSet;
//! use serde_json::json;
//!
//! let mut set = SchemaSet::default();
//! let root = set
//!     .compile(&json!({ "type": "object", "required": ["name"] }))
//!     .unwrap();
//! assert!(set.validate(root, &json!({ "name": "x" })).is_ok());
//! assert!(set.validate(root, &json!({})).is_err());
//! ```

use std::sync::Arc;

use serde_json::Value;

use hyperschema_core::{ErrorList, HyperschemaError, NodeId, SchemaConfig, ValidationError};

use crate::expand::Expander;
use crate::node::SchemaGraph;
use crate::parser::Parser;
use crate::store::DocumentStore;
use crate::validate::{Mode, Validator};

/// A schema graph together with its document store and configuration.
#[derive(Debug, Default)]
pub struct SchemaSet {
    graph: SchemaGraph,
    store: DocumentStore,
    config: Arc<SchemaConfig>,
}

impl SchemaSet {
    pub fn new(config: SchemaConfig) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    pub fn with_shared_config(config: Arc<SchemaConfig>) -> Self {
        Self {
            graph: SchemaGraph::new(),
            store: DocumentStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Parse a schema document into the graph without expanding it.
    pub fn parse(&mut self, raw: &Value) -> Result<NodeId, HyperschemaError> {
        Parser::new(&self.config)
            .parse(&mut self.graph, raw)
            .map_err(HyperschemaError::Parse)
    }

    /// Register a parsed document in the store under its URI.
    pub fn add_to_store(&mut self, root: NodeId) -> Result<(), HyperschemaError> {
        self.store.add(&self.graph, root)?;
        Ok(())
    }

    /// Parse every document, register all of them, then expand each one.
    ///
    /// Documents are registered before any is expanded so that they may
    /// reference each other in any order. Parse errors from every document
    /// are reported together.
    pub fn initialize_store(&mut self, documents: &[Value]) -> Result<Vec<NodeId>, HyperschemaError> {
        let mut roots = Vec::with_capacity(documents.len());
        let mut errors = Vec::new();
        for document in documents {
            match Parser::new(&self.config).parse(&mut self.graph, document) {
                Ok(root) => roots.push(root),
                Err(list) => errors.extend(list),
            }
        }
        if !errors.is_empty() {
            return Err(HyperschemaError::Parse(ErrorList::new(errors)));
        }

        for &root in &roots {
            self.add_to_store(root)?;
        }
        for &root in &roots {
            self.expand(root)?;
        }

        tracing::debug!(documents = roots.len(), "initialized document store");
        Ok(roots)
    }

    /// Expand the references reachable from `root` against the store.
    pub fn expand(&mut self, root: NodeId) -> Result<(), HyperschemaError> {
        Expander::new(&self.config)
            .expand(&mut self.graph, root, &self.store)
            .map_err(HyperschemaError::Expand)
    }

    /// Parse and expand a schema document.
    pub fn compile(&mut self, raw: &Value) -> Result<NodeId, HyperschemaError> {
        let root = self.parse(raw)?;
        self.expand(root)?;
        Ok(root)
    }

    /// Validator borrowing this set's graph and configuration.
    pub fn validator(&self) -> Validator<'_> {
        Validator::new(&self.graph, &self.config)
    }

    /// Validate `data` against `root`, collecting every violation.
    pub fn validate(&self, root: NodeId, data: &Value) -> Result<(), ErrorList<ValidationError>> {
        self.validate_with(root, data, Mode::CollectAll)
    }

    pub fn validate_with(
        &self,
        root: NodeId,
        data: &Value,
        mode: Mode,
    ) -> Result<(), ErrorList<ValidationError>> {
        self.validator().validate(root, data, mode)
    }
}
