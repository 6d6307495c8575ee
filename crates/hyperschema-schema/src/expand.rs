//! # Reference Expander
//!
//! Replaces every `$ref` placeholder reachable from a root with concrete
//! schema content, across documents and through cycles.
//!
//! ## Phases
//!
//! 1. **Indexing.** Every document in the external store and the root
//!    document are walked once, recording `(document URI, pointer) → node`.
//!    A node whose URI differs from its document's (it carries its own
//!    `id`) is additionally indexed as the root of that URI. The same walk
//!    registers the root tree's concrete nodes in a local *seen* store,
//!    keeping the shallowest pointer when two nodes share a URI.
//!
//! 2. **Traversal.** A depth-first walk over schema-bearing children
//!    dereferences each unresolved placeholder. A placeholder whose target
//!    is an already-parsed node is recorded as a *clone* of that node and
//!    copies its keywords once traversal finishes. A target that no parsed
//!    node covers is parsed fresh from the document's raw JSON and copied
//!    into the placeholder immediately.
//!
//! Expansion fails if any reference could not be resolved; in that case the
//! graph may be left partially hydrated and must not be validated against.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use url::Url;

use hyperschema_core::{pointer, ErrorKind, ErrorList, NodeId, SchemaConfig, SchemaError};

use crate::node::{Reference, SchemaGraph};
use crate::parser::Parser;
use crate::store::DocumentStore;

/// Resolves `$ref` placeholders in a [`SchemaGraph`].
#[derive(Debug)]
pub struct Expander<'c> {
    config: &'c SchemaConfig,
    errors: Vec<SchemaError>,
    /// Document URI → pointer → node.
    index: HashMap<String, HashMap<String, NodeId>>,
    /// Concrete nodes of the root tree by URI.
    seen: DocumentStore,
    /// Pointer length of each `seen` entry.
    seen_depth: HashMap<String, usize>,
    /// Descriptor → node its reference resolved to.
    resolved: HashMap<String, NodeId>,
    visited: HashSet<NodeId>,
}

impl<'c> Expander<'c> {
    pub fn new(config: &'c SchemaConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
            index: HashMap::new(),
            seen: DocumentStore::new(),
            seen_depth: HashMap::new(),
            resolved: HashMap::new(),
            visited: HashSet::new(),
        }
    }

    /// Expand every reference reachable from `root`.
    ///
    /// `store` holds the other documents references may name; it is only
    /// read. Running expansion again on an expanded tree changes nothing.
    ///
    /// # Errors
    ///
    /// Returns every resolution error found: `unresolved-pointer`,
    /// `scheme-not-supported`, `loop-detected`, and finally one
    /// `unresolved-references` error listing the distinct references
    /// still unresolved.
    pub fn expand(
        &mut self,
        graph: &mut SchemaGraph,
        root: NodeId,
        store: &DocumentStore,
    ) -> Result<(), ErrorList<SchemaError>> {
        self.errors.clear();
        self.index.clear();
        self.seen = DocumentStore::new();
        self.seen_depth.clear();
        self.resolved.clear();
        self.visited.clear();

        self.build_index(graph, root, store);

        if graph.node(root).is_unresolved() {
            self.dereference(graph, root, root, store, &mut Vec::new());
        }
        self.traverse(graph, root, root, store);
        let hydrated = hydrate_clones(graph);

        let mut dangling: Vec<String> = graph
            .reachable(root)
            .into_iter()
            .filter(|&id| graph.node(id).is_unresolved())
            .filter_map(|id| graph.node(id).reference.as_ref().map(Reference::to_string))
            .collect();
        dangling.sort();
        dangling.dedup();
        if !dangling.is_empty() {
            self.errors.push(SchemaError::new(
                graph.pointer(root),
                format!("Couldn't resolve references: {}.", dangling.join(", ")),
                ErrorKind::UnresolvedReferences,
            ));
        }

        let mut errors = std::mem::take(&mut self.errors);
        let mut unique = HashSet::new();
        errors.retain(|e| unique.insert((e.pointer.clone(), e.message.clone())));

        tracing::debug!(
            nodes = graph.len(),
            clones = hydrated,
            errors = errors.len(),
            "expanded schema references"
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ErrorList::new(errors))
        }
    }

    fn error(&mut self, graph: &SchemaGraph, id: NodeId, message: String, kind: ErrorKind) {
        self.errors
            .push(SchemaError::new(graph.pointer(id), message, kind));
    }

    // -- Phase 1 ------------------------------------------------------------

    fn build_index(&mut self, graph: &SchemaGraph, root: NodeId, store: &DocumentStore) {
        let mut alternates = HashSet::new();
        for (_, document) in store.iter() {
            self.index_document(graph, document, &mut alternates, false);
        }
        self.index_document(graph, root, &mut alternates, true);
    }

    fn index_document(
        &mut self,
        graph: &SchemaGraph,
        document: NodeId,
        alternates: &mut HashSet<String>,
        register: bool,
    ) {
        let mut pending = vec![(document, graph.scope(document))];
        while let Some((start, uri)) = pending.pop() {
            let mut visited = HashSet::new();
            let mut stack = vec![(start, "#".to_string())];
            while let Some((id, path)) = stack.pop() {
                if !visited.insert(id) {
                    continue;
                }
                self.index
                    .entry(uri.clone())
                    .or_default()
                    .entry(path.clone())
                    .or_insert(id);

                let node = graph.node(id);
                if node.is_reference() {
                    continue;
                }
                if register {
                    self.register_seen(graph, id);
                }
                if let Some(own) = &node.uri {
                    if *own != uri && alternates.insert(own.clone()) {
                        pending.push((id, own.clone()));
                    }
                }
                for child in graph.children(id).into_iter().rev() {
                    let fragment = &graph.node(child).fragment;
                    stack.push((child, format!("{path}/{fragment}")));
                }
            }
        }
    }

    /// Record a concrete node in the seen store unless a node with a
    /// shorter pointer already holds its URI.
    fn register_seen(&mut self, graph: &SchemaGraph, id: NodeId) {
        let node = graph.node(id);
        let Some(uri) = node.uri.as_deref() else {
            return;
        };
        if node.is_reference() && !node.expanded {
            return;
        }
        let depth = graph.pointer(id).len();
        match self.seen_depth.get(uri) {
            Some(&kept) if kept <= depth => {}
            _ => {
                self.seen_depth.insert(uri.to_string(), depth);
                self.seen.insert(uri, id);
            }
        }
    }

    // -- Phase 2 ------------------------------------------------------------

    fn traverse(&mut self, graph: &mut SchemaGraph, id: NodeId, root: NodeId, store: &DocumentStore) {
        if !self.visited.insert(id) {
            return;
        }
        self.register_seen(graph, id);

        for child in graph.children(id) {
            if graph.node(child).is_unresolved() {
                self.dereference(graph, child, root, store, &mut Vec::new());
            }
            self.traverse(graph, child, root, store);
        }

        if let Some(canonical) = graph.node(id).clone_of {
            self.traverse(graph, canonical, root, store);
        }
    }

    /// Resolve placeholder `id`. `stack` holds the descriptors currently
    /// being resolved further up the call chain.
    fn dereference(
        &mut self,
        graph: &mut SchemaGraph,
        id: NodeId,
        root: NodeId,
        store: &DocumentStore,
        stack: &mut Vec<String>,
    ) -> bool {
        let Some(reference) = graph.node(id).reference.clone() else {
            return true;
        };
        let descriptor = reference.to_string();
        if stack.contains(&descriptor) {
            let mut chain = stack.clone();
            chain.sort();
            self.error(
                graph,
                id,
                format!("Reference loop detected: {}.", chain.join(", ")),
                ErrorKind::LoopDetected,
            );
            return false;
        }

        tracing::trace!(pointer = %graph.pointer(id), reference = %descriptor, "dereferencing");
        stack.push(descriptor.clone());
        let resolved = self.resolve(graph, id, &reference, root, store, stack);
        stack.pop();

        if resolved {
            tracing::debug!(pointer = %graph.pointer(id), reference = %descriptor, "resolved reference");
        }
        resolved
    }

    fn resolve(
        &mut self,
        graph: &mut SchemaGraph,
        id: NodeId,
        reference: &Reference,
        root: NodeId,
        store: &DocumentStore,
        stack: &mut Vec<String>,
    ) -> bool {
        let Some(document) = self.resolve_document(graph, id, reference, root, store) else {
            return false;
        };
        let document_uri = graph.scope(document);
        let fragment = reference.fragment();

        let hit = self
            .index
            .get(&document_uri)
            .and_then(|pointers| pointers.get(fragment))
            .copied();
        if let Some(hit) = hit {
            if graph.node(hit).is_unresolved() && !self.dereference(graph, hit, root, store, stack) {
                return false;
            }
            let target = graph.canonical(hit);
            self.record_clone(graph, id, target, reference);
            return true;
        }

        let Some(raw) = graph.node(document).data.clone() else {
            self.error(
                graph,
                id,
                format!("Couldn't resolve pointer \"{fragment}\"."),
                ErrorKind::UnresolvedPointer,
            );
            return false;
        };
        let Some(value) = pointer::evaluate(&raw, fragment) else {
            self.error(
                graph,
                id,
                format!("Couldn't resolve pointer \"{fragment}\"."),
                ErrorKind::UnresolvedPointer,
            );
            return false;
        };

        if let Some(prior) = self.prior_target(value) {
            let target = graph.canonical(prior);
            self.record_clone(graph, id, target, reference);
            return true;
        }

        self.parse_target(graph, id, reference, document, value, root, store, stack)
    }

    /// A raw `{"$ref": ...}` whose descriptor was already resolved.
    fn prior_target(&self, value: &Value) -> Option<NodeId> {
        let inner = value.as_object()?.get("$ref")?.as_str()?;
        self.resolved
            .get(&Reference::parse(inner).to_string())
            .copied()
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_target(
        &mut self,
        graph: &mut SchemaGraph,
        id: NodeId,
        reference: &Reference,
        document: NodeId,
        value: &Value,
        root: NodeId,
        store: &DocumentStore,
        stack: &mut Vec<String>,
    ) -> bool {
        let parent = graph.node(id).parent;
        let slot = graph.node(id).fragment.clone();
        let fresh = match Parser::new(self.config).parse_fragment(graph, value, parent, &slot, document) {
            Ok(fresh) => fresh,
            Err(errors) => {
                self.errors.extend(errors);
                return false;
            }
        };
        self.index
            .entry(graph.scope(document))
            .or_default()
            .insert(reference.fragment().to_string(), fresh);

        if graph.node(fresh).is_unresolved() && !self.dereference(graph, fresh, root, store, stack) {
            return false;
        }
        let source = graph.canonical(fresh);
        graph.hydrate(id, source);
        if graph.node(id).is_original() {
            graph.reparent_children(id);
        }
        self.resolved.insert(reference.to_string(), id);
        true
    }

    fn record_clone(&mut self, graph: &mut SchemaGraph, id: NodeId, target: NodeId, reference: &Reference) {
        if target == id {
            graph.node_mut(id).expanded = true;
        } else {
            graph.node_mut(target).clones.push(id);
            graph.node_mut(id).clone_of = Some(target);
        }
        self.resolved.insert(reference.to_string(), target);
    }

    fn resolve_document(
        &mut self,
        graph: &SchemaGraph,
        id: NodeId,
        reference: &Reference,
        root: NodeId,
        store: &DocumentStore,
    ) -> Option<NodeId> {
        let Some(uri) = reference.uri() else {
            return Some(graph.node(id).document.unwrap_or(root));
        };

        if let Ok(url) = Url::parse(uri) {
            if let Some(document) = self.lookup(uri, store) {
                return Some(document);
            }
            if url.has_host() {
                self.error(
                    graph,
                    id,
                    format!(
                        "Reference resolution over {} is not currently supported (URI: {uri}).",
                        url.scheme()
                    ),
                    ErrorKind::SchemeNotSupported,
                );
            } else {
                self.unresolved_uri(graph, id, uri);
            }
            return None;
        }

        let absolute = if uri.starts_with('/') {
            uri.to_string()
        } else {
            format!("{}/{}", graph.scope(id).trim_end_matches('/'), uri)
        };
        let document = self.lookup(&absolute, store);
        if document.is_none() {
            self.unresolved_uri(graph, id, &absolute);
        }
        document
    }

    /// Find the node rooting `uri`: a node seen in this tree, a store
    /// document, or an `id`-scoped node inside a store document.
    fn lookup(&self, uri: &str, store: &DocumentStore) -> Option<NodeId> {
        self.seen
            .lookup(uri)
            .or_else(|| store.lookup(uri))
            .or_else(|| self.scope_root(uri))
    }

    fn scope_root(&self, uri: &str) -> Option<NodeId> {
        let uri = uri.strip_suffix('#').unwrap_or(uri);
        self.index.get(uri)?.get("#").copied()
    }

    fn unresolved_uri(&mut self, graph: &SchemaGraph, id: NodeId, uri: &str) {
        self.error(
            graph,
            id,
            format!("Couldn't resolve URI: {uri}."),
            ErrorKind::UnresolvedPointer,
        );
    }
}

/// Copy each canonical node into its recorded clones. Returns the number
/// of clones hydrated.
fn hydrate_clones(graph: &mut SchemaGraph) -> usize {
    let mut count = 0;
    for index in 0..graph.len() {
        let canonical = NodeId::from_index(index);
        let clones = graph.node(canonical).clones.clone();
        for clone in clones {
            graph.hydrate(clone, canonical);
            count += 1;
        }
    }
    count
}
