//! # Schema Graph
//!
//! All schema nodes of a session live in one arena, [`SchemaGraph`], and
//! refer to each other by [`NodeId`]. A node is either a *reference
//! placeholder* (it carries a `$ref` [`Reference`] and nothing else until
//! the expander hydrates it) or a *concrete schema* whose draft-04 and
//! hyper-schema keywords are held as typed fields in [`Keywords`].
//!
//! ## Identity
//!
//! A node's pointer is not stored: it is the parent's pointer plus `/`
//! plus the node's own fragment, with `#` at the root. Hydration may
//! re-parent children, but never in a way that creates a parent cycle.
//!
//! ## Clones
//!
//! A placeholder that resolves to an already-resolved canonical node is
//! recorded in that node's `clones` list and copies its keywords once
//! traversal has finished. Hydration is a one-time value copy, not a live
//! alias: the placeholder keeps its own parent and fragment, and later
//! changes to the canonical node are not reflected in it.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Number, Value};

use hyperschema_core::value::is_integer;
use hyperschema_core::NodeId;

/// The simple types a `type` keyword may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimpleType {
    Any,
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl SimpleType {
    /// Every accepted type name, sorted.
    pub const NAMES: [&'static str; 8] = [
        "any", "array", "boolean", "integer", "null", "number", "object", "string",
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "any" => SimpleType::Any,
            "array" => SimpleType::Array,
            "boolean" => SimpleType::Boolean,
            "integer" => SimpleType::Integer,
            "null" => SimpleType::Null,
            "number" => SimpleType::Number,
            "object" => SimpleType::Object,
            "string" => SimpleType::String,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleType::Any => "any",
            SimpleType::Array => "array",
            SimpleType::Boolean => "boolean",
            SimpleType::Integer => "integer",
            SimpleType::Null => "null",
            SimpleType::Number => "number",
            SimpleType::Object => "object",
            SimpleType::String => "string",
        }
    }

    /// Whether `value` is of this type. Integers are also numbers.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (SimpleType::Any, _) => true,
            (SimpleType::Array, Value::Array(_)) => true,
            (SimpleType::Boolean, Value::Bool(_)) => true,
            (SimpleType::Integer, Value::Number(n)) => is_integer(n),
            (SimpleType::Null, Value::Null) => true,
            (SimpleType::Number, Value::Number(_)) => true,
            (SimpleType::Object, Value::Object(_)) => true,
            (SimpleType::String, Value::String(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compiled pattern together with its source text.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: source.to_string(),
            regex: Regex::new(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Unanchored search: true if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// `items`: one schema for every element, or a tuple of positional schemas.
#[derive(Debug, Clone, PartialEq)]
pub enum Items {
    Single(NodeId),
    Tuple(Vec<NodeId>),
}

/// `additionalItems` / `additionalProperties`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Additional {
    Allowed(bool),
    Schema(NodeId),
}

/// One entry of `dependencies`.
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    /// Sibling property names that must be present too.
    Required(Vec<String>),
    /// A schema the whole object must also satisfy.
    Schema(NodeId),
}

/// Hyper-schema `media`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Media {
    pub binary_encoding: Option<String>,
    pub media_type: Option<String>,
}

/// Hyper-schema link description object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub href: Option<String>,
    /// Lower-cased HTTP method.
    pub method: Option<String>,
    pub rel: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_type: Option<String>,
    pub enc_type: Option<String>,
    pub schema: Option<NodeId>,
    pub target_schema: Option<NodeId>,
    pub job_schema: Option<NodeId>,
}

/// Every keyword of a concrete schema as a typed field.
#[derive(Debug, Clone, Default)]
pub struct Keywords {
    // Metadata.
    pub id: Option<String>,
    pub schema: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub definitions: Vec<(String, NodeId)>,

    // Any instance.
    pub all_of: Vec<NodeId>,
    pub any_of: Vec<NodeId>,
    pub one_of: Vec<NodeId>,
    pub not: Option<NodeId>,
    pub enum_values: Option<Vec<Value>>,
    /// Empty means unconstrained.
    pub types: Vec<SimpleType>,

    // Arrays.
    pub items: Option<Items>,
    pub additional_items: Option<Additional>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: Option<bool>,

    // Numbers.
    pub minimum: Option<Number>,
    pub maximum: Option<Number>,
    pub exclusive_minimum: Option<bool>,
    pub exclusive_maximum: Option<bool>,
    pub multiple_of: Option<Number>,

    // Objects.
    pub properties: Vec<(String, NodeId)>,
    pub pattern_properties: Vec<(Pattern, NodeId)>,
    pub additional_properties: Option<Additional>,
    pub dependencies: Vec<(String, Dependency)>,
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
    pub required: Option<Vec<String>>,
    pub strict_properties: Option<bool>,

    // Strings.
    pub format: Option<String>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<Pattern>,

    // Hyper-schema.
    pub links: Vec<NodeId>,
    pub media: Option<Media>,
    pub path_start: Option<String>,
    pub read_only: Option<bool>,
}

impl Keywords {
    /// Look up a declared property schema by name.
    pub fn property(&self, name: &str) -> Option<NodeId> {
        self.properties
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, id)| *id)
    }

    /// Look up a definition by name.
    pub fn definition(&self, name: &str) -> Option<NodeId> {
        self.definitions
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, id)| *id)
    }
}

/// A `$ref` target: optional URI plus a normalized fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference {
    uri: Option<String>,
    fragment: String,
}

impl Reference {
    /// Parse a `$ref` value. The fragment always starts with `#` and
    /// never ends with `/`; a trailing `#` on the URI part is dropped.
    pub fn parse(raw: &str) -> Self {
        let (uri, fragment) = match raw.split_once('#') {
            Some((uri, fragment)) => (uri, fragment),
            None => (raw, ""),
        };
        let fragment = format!("#{}", fragment.trim_end_matches('/'));
        Self {
            uri: (!uri.is_empty()).then(|| uri.to_string()),
            fragment,
        }
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.uri.as_deref().unwrap_or(""), self.fragment)
    }
}

/// One node of the schema graph.
#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    pub parent: Option<NodeId>,
    /// Keyword path from the parent (e.g. `properties/name`), `#` at a root.
    pub fragment: String,
    /// Present on `$ref` placeholders.
    pub reference: Option<Reference>,
    /// Resolution scope. `None` only on unhydrated placeholders.
    pub uri: Option<String>,
    /// Raw JSON of a document root or `id`-scoped node, the bases that
    /// references evaluate pointers against. Read only during expansion.
    pub data: Option<Arc<Value>>,
    pub expanded: bool,
    /// Root node of the document this node was parsed from.
    pub document: Option<NodeId>,
    pub keywords: Keywords,
    /// Present on hyper-schema link nodes.
    pub link: Option<Link>,
    /// Placeholders that resolved to this node and copy it after traversal.
    pub clones: Vec<NodeId>,
    /// Set on a placeholder recorded in another node's clone set.
    pub clone_of: Option<NodeId>,
}

impl SchemaNode {
    pub(crate) fn new(parent: Option<NodeId>, fragment: impl Into<String>) -> Self {
        Self {
            parent,
            fragment: fragment.into(),
            ..Self::default()
        }
    }

    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// A placeholder that has neither been hydrated nor recorded as a clone.
    pub fn is_unresolved(&self) -> bool {
        self.reference.is_some() && !self.expanded && self.clone_of.is_none()
    }

    /// Not a member of any clone set.
    pub fn is_original(&self) -> bool {
        self.clone_of.is_none()
    }
}

/// Arena of schema nodes.
#[derive(Debug, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not allocated by this graph.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn alloc(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// JSON Pointer identity of a node, computed from its parent chain.
    pub fn pointer(&self, id: NodeId) -> String {
        let mut fragments = Vec::new();
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            let Some(cur) = current else { break };
            let node = self.node(cur);
            match node.parent {
                Some(parent) => {
                    fragments.push(node.fragment.as_str());
                    current = Some(parent);
                }
                None => {
                    current = None;
                }
            }
        }
        let mut pointer = String::from("#");
        for fragment in fragments.iter().rev() {
            pointer.push('/');
            pointer.push_str(fragment);
        }
        pointer
    }

    /// Resolution scope of a node: its own URI, else the nearest
    /// ancestor's, else `/`.
    pub fn scope(&self, id: NodeId) -> String {
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            let Some(cur) = current else { break };
            let node = self.node(cur);
            if let Some(uri) = &node.uri {
                return uri.clone();
            }
            current = node.parent;
        }
        "/".to_string()
    }

    /// Follow `clone_of` to the canonical node.
    pub fn canonical(&self, id: NodeId) -> NodeId {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match self.node(current).clone_of {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// Schema-bearing children in traversal order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let node = self.node(id);
        let kw = &node.keywords;
        let mut out = Vec::new();
        out.extend(kw.all_of.iter().copied());
        out.extend(kw.any_of.iter().copied());
        out.extend(kw.one_of.iter().copied());
        out.extend(kw.definitions.iter().map(|(_, id)| *id));
        out.extend(kw.pattern_properties.iter().map(|(_, id)| *id));
        out.extend(kw.properties.iter().map(|(_, id)| *id));
        if let Some(Additional::Schema(id)) = kw.additional_properties {
            out.push(id);
        }
        out.extend(kw.not);
        match &kw.items {
            Some(Items::Single(id)) => out.push(*id),
            Some(Items::Tuple(ids)) => out.extend(ids.iter().copied()),
            None => {}
        }
        if let Some(Additional::Schema(id)) = kw.additional_items {
            out.push(id);
        }
        out.extend(kw.dependencies.iter().filter_map(|(_, dep)| match dep {
            Dependency::Schema(id) => Some(*id),
            Dependency::Required(_) => None,
        }));
        out.extend(kw.links.iter().copied());
        if let Some(link) = &node.link {
            out.extend(link.schema);
            out.extend(link.target_schema);
            out.extend(link.job_schema);
        }
        out
    }

    /// Whether `ancestor` appears on the parent chain of `id` (or is `id`).
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        for _ in 0..=self.nodes.len() {
            let Some(cur) = current else { return false };
            if cur == ancestor {
                return true;
            }
            current = self.node(cur).parent;
        }
        false
    }

    /// Copy keyword values, link fields and URI from `from` into `into`,
    /// keeping `into`'s parent, fragment and reference. Raw data is copied
    /// only when `into` holds none of its own.
    pub(crate) fn hydrate(&mut self, into: NodeId, from: NodeId) {
        if into == from {
            self.node_mut(into).expanded = true;
            return;
        }
        let source = self.node(from);
        let keywords = source.keywords.clone();
        let link = source.link.clone();
        let uri = source.uri.clone();
        let data = source.data.clone();

        let node = self.node_mut(into);
        node.keywords = keywords;
        node.link = link;
        node.uri = uri;
        if node.data.is_none() {
            node.data = data;
        }
        node.expanded = true;
    }

    /// Point the children of `id` back at `id`. A child is skipped when
    /// re-parenting it would close a parent cycle.
    pub(crate) fn reparent_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            if !self.is_ancestor_or_self(child, id) {
                self.node_mut(child).parent = Some(id);
            }
        }
    }

    /// Every node reachable from `root` through schema-bearing children.
    pub fn reachable(&self, root: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reference_normalization() {
        let r = Reference::parse("#/definitions/x/");
        assert_eq!(r.uri(), None);
        assert_eq!(r.fragment(), "#/definitions/x");
        assert_eq!(r.to_string(), "#/definitions/x");

        let r = Reference::parse("/schemata/app#/definitions/name");
        assert_eq!(r.uri(), Some("/schemata/app"));
        assert_eq!(r.to_string(), "/schemata/app#/definitions/name");

        let r = Reference::parse("http://example.com/schema#");
        assert_eq!(r.uri(), Some("http://example.com/schema"));
        assert_eq!(r.fragment(), "#");

        let r = Reference::parse("other.json");
        assert_eq!(r.uri(), Some("other.json"));
        assert_eq!(r.fragment(), "#");
    }

    #[test]
    fn simple_type_matching() {
        assert!(SimpleType::Integer.matches(&json!(1)));
        assert!(!SimpleType::Integer.matches(&json!(1.5)));
        assert!(SimpleType::Number.matches(&json!(1)));
        assert!(SimpleType::Any.matches(&json!(null)));
        assert!(!SimpleType::String.matches(&json!(1)));
        assert_eq!(SimpleType::parse("object"), Some(SimpleType::Object));
        assert_eq!(SimpleType::parse("float"), None);
    }

    #[test]
    fn pattern_is_substring_search() {
        let p = Pattern::new("b+").unwrap();
        assert!(p.is_match("abbbc"));
        assert!(!p.is_match("ac"));
        assert_eq!(p.source(), "b+");
    }

    #[test]
    fn pointers_follow_parent_chain() {
        let mut graph = SchemaGraph::new();
        let root = graph.alloc(SchemaNode::new(None, "#"));
        let defs = graph.alloc(SchemaNode::new(Some(root), "definitions/a"));
        let prop = graph.alloc(SchemaNode::new(Some(defs), "properties/x"));
        assert_eq!(graph.pointer(root), "#");
        assert_eq!(graph.pointer(prop), "#/definitions/a/properties/x");
        assert!(graph.is_ancestor_or_self(root, prop));
        assert!(!graph.is_ancestor_or_self(prop, root));
    }

    #[test]
    fn reparenting_never_creates_cycles() {
        let mut graph = SchemaGraph::new();
        let root = graph.alloc(SchemaNode::new(None, "#"));
        let child = graph.alloc(SchemaNode::new(Some(root), "properties/next"));
        // The child's own properties contain the root: a cycle in content.
        graph.node_mut(child).keywords.properties = vec![("back".to_string(), root)];
        graph.node_mut(root).keywords.properties = vec![("next".to_string(), child)];

        graph.reparent_children(child);
        assert_eq!(graph.node(root).parent, None);
        assert_eq!(graph.pointer(child), "#/properties/next");
    }

    #[test]
    fn hydrate_copies_values_and_keeps_identity() {
        let mut graph = SchemaGraph::new();
        let root = graph.alloc(SchemaNode::new(None, "#"));
        let target = graph.alloc(SchemaNode::new(Some(root), "definitions/t"));
        graph.node_mut(target).keywords.types = vec![SimpleType::String];
        graph.node_mut(target).uri = Some("/".to_string());
        let placeholder = graph.alloc(SchemaNode {
            reference: Some(Reference::parse("#/definitions/t")),
            ..SchemaNode::new(Some(root), "properties/p")
        });
        assert!(graph.node(placeholder).is_unresolved());

        graph.hydrate(placeholder, target);
        let node = graph.node(placeholder);
        assert!(node.expanded);
        assert!(!node.is_unresolved());
        assert_eq!(node.keywords.types, vec![SimpleType::String]);
        assert_eq!(graph.pointer(placeholder), "#/properties/p");

        // Later changes to the target are not reflected.
        graph.node_mut(target).keywords.types = vec![SimpleType::Integer];
        assert_eq!(graph.node(placeholder).keywords.types, vec![SimpleType::String]);
    }

    #[test]
    fn hydrate_keeps_existing_raw_data() {
        let mut graph = SchemaGraph::new();
        let document = Arc::new(serde_json::json!({ "$ref": "#/definitions/t" }));
        let root = graph.alloc(SchemaNode {
            reference: Some(Reference::parse("#/definitions/t")),
            data: Some(Arc::clone(&document)),
            ..SchemaNode::new(None, "#")
        });
        let target = graph.alloc(SchemaNode {
            data: Some(Arc::new(serde_json::json!({ "type": "string" }))),
            ..SchemaNode::new(Some(root), "definitions/t")
        });
        let bare = graph.alloc(SchemaNode::new(Some(root), "properties/p"));

        graph.hydrate(root, target);
        graph.hydrate(bare, target);
        assert_eq!(graph.node(root).data.as_deref(), Some(&*document));
        assert_eq!(graph.node(bare).data, graph.node(target).data);
    }
}
