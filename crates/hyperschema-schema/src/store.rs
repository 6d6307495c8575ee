//! # Document Store
//!
//! Registry of parsed schema documents keyed by URI, consulted by the
//! expander to resolve references that name another document.
//!
//! Keys have any trailing `#` stripped, both when adding and when looking
//! up. Adding a second schema under an existing URI replaces the earlier
//! entry in place, so iteration order stays the order in which URIs were
//! first added.

use std::collections::HashMap;

use hyperschema_core::{NodeId, StoreError};

use crate::node::SchemaGraph;

/// URI → root node mapping, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    entries: Vec<(String, NodeId)>,
    positions: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under its URI.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingUri`] if the node has no URI, which is
    /// the case for a placeholder that has not been hydrated yet.
    pub fn add(&mut self, graph: &SchemaGraph, node: NodeId) -> Result<(), StoreError> {
        let uri = graph
            .node(node)
            .uri
            .as_deref()
            .ok_or_else(|| StoreError::MissingUri {
                pointer: graph.pointer(node),
            })?;
        self.insert(uri, node);
        Ok(())
    }

    /// Register `node` under an explicit URI.
    pub fn insert(&mut self, uri: &str, node: NodeId) {
        let key = normalize(uri);
        match self.positions.get(key) {
            Some(&position) => self.entries[position].1 = node,
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push((key.to_string(), node));
            }
        }
    }

    pub fn lookup(&self, uri: &str) -> Option<NodeId> {
        self.positions
            .get(normalize(uri))
            .map(|&position| self.entries[position].1)
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.positions.contains_key(normalize(uri))
    }

    /// `(uri, root)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(uri, id)| (uri.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(uri: &str) -> &str {
    uri.trim_end_matches('#')
}
