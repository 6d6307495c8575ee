//! # Schema Parser
//!
//! Builds schema nodes from decoded JSON. Each JSON object in schema
//! position becomes one node; an object carrying `$ref` becomes a
//! reference placeholder with no other keywords read.
//!
//! ## Error Collection
//!
//! Parsing never stops at the first problem. A keyword whose value has
//! the wrong JSON kind is reported as `invalid-type` and treated as
//! absent, and parsing carries on; the caller receives every structural
//! error found anywhere in the document. A document with any error
//! yields no tree. A JSON `null` keyword value counts as absent.
//!
//! ## Resolution Scope
//!
//! Each node's URI comes from `id`: an absolute `id` (a parseable URI or
//! a `/`-prefixed path) replaces the scope, a relative one is appended as
//! a path segment to the parent's scope, and no `id` inherits the parent's
//! scope. The root scope defaults to `/`.

use std::sync::Arc;

use serde_json::{Map, Number, Value};
use url::Url;

use hyperschema_core::pointer::escape_token;
use hyperschema_core::{ErrorKind, ErrorList, NodeId, SchemaConfig, SchemaError};

use crate::format;
use crate::node::{
    Additional, Dependency, Items, Keywords, Link, Media, Pattern, Reference, SchemaGraph,
    SchemaNode, SimpleType,
};

/// Where a value being parsed sits in the graph.
#[derive(Debug, Clone)]
struct Slot {
    parent: Option<NodeId>,
    fragment: String,
    pointer: String,
    scope: Option<String>,
    document: Option<NodeId>,
}

impl Slot {
    fn root() -> Self {
        Self {
            parent: None,
            fragment: "#".to_string(),
            pointer: "#".to_string(),
            scope: None,
            document: None,
        }
    }

    fn child(&self, parent: NodeId, fragment: String, scope: &str, document: NodeId) -> Self {
        Self {
            parent: Some(parent),
            pointer: format!("{}/{}", self.pointer, fragment),
            fragment,
            scope: Some(scope.to_string()),
            document: Some(document),
        }
    }
}

/// Converts decoded JSON into nodes of a [`SchemaGraph`].
#[derive(Debug)]
pub struct Parser<'c> {
    config: &'c SchemaConfig,
    errors: Vec<SchemaError>,
}

impl<'c> Parser<'c> {
    pub fn new(config: &'c SchemaConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
        }
    }

    /// Parse a whole schema document into `graph`, returning its root.
    ///
    /// # Errors
    ///
    /// Returns every structural error found if the document is not an
    /// object or any keyword has the wrong shape.
    pub fn parse(
        &mut self,
        graph: &mut SchemaGraph,
        data: &Value,
    ) -> Result<NodeId, ErrorList<SchemaError>> {
        self.errors.clear();
        let before = graph.len();
        let root = self.parse_data(graph, data, Slot::root());
        let errors = std::mem::take(&mut self.errors);

        tracing::debug!(
            nodes = graph.len() - before,
            errors = errors.len(),
            "parsed schema document"
        );

        match root {
            Some(root) if errors.is_empty() => Ok(root),
            _ => Err(ErrorList::new(errors)),
        }
    }

    /// Parse a raw sub-value as if it sat at `fragment` under `parent`,
    /// belonging to `document`. Used by the expander when a reference
    /// points at JSON no parsed node covers.
    pub(crate) fn parse_fragment(
        &mut self,
        graph: &mut SchemaGraph,
        data: &Value,
        parent: Option<NodeId>,
        fragment: &str,
        document: NodeId,
    ) -> Result<NodeId, Vec<SchemaError>> {
        self.errors.clear();
        let pointer = match parent {
            Some(parent) => format!("{}/{}", graph.pointer(parent), fragment),
            None => "#".to_string(),
        };
        let slot = Slot {
            parent,
            fragment: fragment.to_string(),
            pointer,
            scope: Some(graph.scope(document)),
            document: Some(document),
        };
        let node = self.parse_data(graph, data, slot);
        let errors = std::mem::take(&mut self.errors);
        match node {
            Some(node) if errors.is_empty() => Ok(node),
            _ => Err(errors),
        }
    }

    fn error(&mut self, pointer: &str, message: String, kind: ErrorKind) {
        self.errors.push(SchemaError::new(pointer, message, kind));
    }

    fn parse_data(&mut self, graph: &mut SchemaGraph, data: &Value, slot: Slot) -> Option<NodeId> {
        let Some(obj) = data.as_object() else {
            self.error(
                &slot.pointer,
                format!("{data} is not a valid schema."),
                ErrorKind::SchemaNotFound,
            );
            return None;
        };

        match obj.get("$ref") {
            Some(Value::String(raw)) => {
                let id = graph.alloc(SchemaNode {
                    reference: Some(Reference::parse(raw)),
                    data: slot.document.is_none().then(|| Arc::new(data.clone())),
                    ..SchemaNode::new(slot.parent, slot.fragment)
                });
                graph.node_mut(id).document = Some(slot.document.unwrap_or(id));
                Some(id)
            }
            Some(other) => {
                self.error(
                    &slot.pointer,
                    format!("{other} is not a valid \"$ref\", must be a string."),
                    ErrorKind::InvalidType,
                );
                None
            }
            None => Some(self.parse_schema(graph, data, obj, slot)),
        }
    }

    fn parse_schema(
        &mut self,
        graph: &mut SchemaGraph,
        data: &Value,
        obj: &Map<String, Value>,
        slot: Slot,
    ) -> NodeId {
        let id = graph.alloc(SchemaNode::new(slot.parent, slot.fragment.clone()));
        let document = slot.document.unwrap_or(id);
        let is_document_root = slot.document.is_none();
        let pointer = slot.pointer.clone();

        let mut kw = Keywords::default();
        let mut fields = Fields::new(obj, &pointer, &mut self.errors);

        // Metadata.
        kw.id = fields.string("id");
        let uri = build_uri(kw.id.as_deref(), slot.scope.as_deref());
        kw.schema = fields.string("$schema");
        kw.title = fields.string("title");
        kw.description = fields.string("description");
        kw.default = obj.get("default").filter(|v| !v.is_null()).cloned();
        let definitions = fields.object("definitions");

        // Any instance.
        let all_of = fields.array("allOf");
        let any_of = fields.array("anyOf");
        let one_of = fields.array("oneOf");
        let not = fields.schema("not");
        kw.enum_values = fields.array("enum").cloned();
        let types = fields.take("type", "string or array", |v| match v {
            Value::String(s) => Some(vec![s.as_str()]),
            Value::Array(items) => items.iter().map(Value::as_str).collect(),
            _ => None,
        });

        // Arrays.
        let additional_items = fields.bool_or_schema("additionalItems");
        let items = fields.take("items", "array or object", |v| match v {
            Value::Array(_) | Value::Object(_) => Some(v),
            _ => None,
        });
        kw.min_items = fields.count("minItems");
        kw.max_items = fields.count("maxItems");
        kw.unique_items = fields.boolean("uniqueItems");

        // Numbers.
        kw.minimum = fields.number("minimum");
        kw.maximum = fields.number("maximum");
        kw.exclusive_minimum = fields.boolean("exclusiveMinimum");
        kw.exclusive_maximum = fields.boolean("exclusiveMaximum");
        kw.multiple_of = fields.number("multipleOf");

        // Objects.
        let additional_properties = fields.bool_or_schema("additionalProperties");
        let dependencies = fields.object("dependencies");
        kw.min_properties = fields.count("minProperties");
        kw.max_properties = fields.count("maxProperties");
        let pattern_properties = fields.object("patternProperties");
        let properties = fields.object("properties");
        kw.required = fields.string_list("required");
        kw.strict_properties = fields.boolean("strictProperties");

        // Strings.
        kw.format = fields.string("format");
        kw.min_length = fields.count("minLength");
        kw.max_length = fields.count("maxLength");
        let pattern = fields.string("pattern");

        // Hyper-schema.
        let links = fields.array("links");
        let media = fields.object("media");
        kw.path_start = fields.string("pathStart");
        kw.read_only = fields.boolean("readOnly");

        if let Some(types) = types {
            kw.types = self.parse_types(&pointer, &types);
        }
        if let Some(source) = pattern {
            kw.pattern = self.compile(&pointer, &source);
        }
        if let Some(name) = &kw.format {
            self.check_format(&pointer, name);
        }
        kw.media = media.map(|m| Media {
            binary_encoding: m.get("binaryEncoding").and_then(Value::as_str).map(str::to_string),
            media_type: m.get("type").and_then(Value::as_str).map(str::to_string),
        });

        let parent = Slot {
            parent: slot.parent,
            fragment: slot.fragment,
            pointer: pointer.clone(),
            scope: Some(uri.clone()),
            document: Some(document),
        };
        let child = |fragment: String| parent.child(id, fragment, &uri, document);

        kw.all_of = self.parse_list(graph, all_of, "allOf", &child);
        kw.any_of = self.parse_list(graph, any_of, "anyOf", &child);
        kw.one_of = self.parse_list(graph, one_of, "oneOf", &child);
        kw.definitions = self.parse_map(graph, definitions, "definitions", &child);
        kw.properties = self.parse_map(graph, properties, "properties", &child);
        kw.not = not.and_then(|raw| self.parse_data(graph, raw, child("not".to_string())));

        kw.items = match items {
            Some(Value::Array(list)) => Some(Items::Tuple(self.parse_list(graph, Some(list), "items", &child))),
            Some(raw) => self
                .parse_data(graph, raw, child("items".to_string()))
                .map(Items::Single),
            None => None,
        };
        kw.additional_items =
            self.parse_additional(graph, additional_items, child("additionalItems".to_string()));
        kw.additional_properties = self.parse_additional(
            graph,
            additional_properties,
            child("additionalProperties".to_string()),
        );

        if let Some(map) = pattern_properties {
            for (source, raw) in map {
                let fragment = format!("patternProperties/{}", escape_token(source));
                let compiled = self.compile(&format!("{pointer}/{fragment}"), source);
                let node = self.parse_data(graph, raw, child(fragment));
                if let (Some(pattern), Some(node)) = (compiled, node) {
                    kw.pattern_properties.push((pattern, node));
                }
            }
        }

        if let Some(map) = dependencies {
            for (key, raw) in map {
                let fragment = format!("dependencies/{}", escape_token(key));
                let dependency = match raw {
                    Value::Object(_) => self.parse_data(graph, raw, child(fragment)).map(Dependency::Schema),
                    Value::String(name) => Some(Dependency::Required(vec![name.clone()])),
                    Value::Array(names) => match names
                        .iter()
                        .map(|n| n.as_str().map(str::to_string))
                        .collect::<Option<Vec<String>>>()
                    {
                        Some(names) => Some(Dependency::Required(names)),
                        None => {
                            self.invalid_dependency(&pointer, &fragment, raw);
                            None
                        }
                    },
                    _ => {
                        self.invalid_dependency(&pointer, &fragment, raw);
                        None
                    }
                };
                if let Some(dependency) = dependency {
                    kw.dependencies.push((key.clone(), dependency));
                }
            }
        }

        if let Some(list) = links {
            for (i, raw) in list.iter().enumerate() {
                if let Some(link) = self.parse_link(graph, raw, child(format!("links/{i}")), &uri) {
                    kw.links.push(link);
                }
            }
        }

        let node = graph.node_mut(id);
        node.uri = Some(uri);
        if is_document_root || kw.id.is_some() {
            node.data = Some(Arc::new(data.clone()));
        }
        node.document = Some(document);
        node.keywords = kw;
        id
    }

    fn parse_link(
        &mut self,
        graph: &mut SchemaGraph,
        raw: &Value,
        slot: Slot,
        uri: &str,
    ) -> Option<NodeId> {
        let Some(obj) = raw.as_object() else {
            self.error(
                &slot.pointer,
                format!("{raw} is not a valid link, must be an object."),
                ErrorKind::InvalidType,
            );
            return None;
        };

        let id = graph.alloc(SchemaNode::new(slot.parent, slot.fragment.clone()));
        let document = slot.document.unwrap_or(id);
        let mut fields = Fields::new(obj, &slot.pointer, &mut self.errors);
        let mut link = Link {
            href: fields.string("href"),
            method: fields.string("method").map(|m| m.to_lowercase()),
            rel: fields.string("rel"),
            title: fields.string("title"),
            description: fields.string("description"),
            media_type: fields.string("mediaType"),
            enc_type: fields.string("encType"),
            ..Link::default()
        };
        let schema = fields.schema("schema");
        let target_schema = fields.schema("targetSchema");
        let job_schema = fields.schema("jobSchema");

        let child = |fragment: &str| slot.child(id, fragment.to_string(), uri, document);
        link.schema = schema.and_then(|raw| self.parse_data(graph, raw, child("schema")));
        link.target_schema =
            target_schema.and_then(|raw| self.parse_data(graph, raw, child("targetSchema")));
        link.job_schema = job_schema.and_then(|raw| self.parse_data(graph, raw, child("jobSchema")));

        let node = graph.node_mut(id);
        node.uri = Some(uri.to_string());
        node.document = Some(document);
        node.expanded = true;
        node.link = Some(link);
        Some(id)
    }

    fn parse_list(
        &mut self,
        graph: &mut SchemaGraph,
        list: Option<&Vec<Value>>,
        keyword: &str,
        child: &dyn Fn(String) -> Slot,
    ) -> Vec<NodeId> {
        list.into_iter()
            .flatten()
            .enumerate()
            .filter_map(|(i, raw)| self.parse_data(graph, raw, child(format!("{keyword}/{i}"))))
            .collect()
    }

    fn parse_map(
        &mut self,
        graph: &mut SchemaGraph,
        map: Option<&Map<String, Value>>,
        keyword: &str,
        child: &dyn Fn(String) -> Slot,
    ) -> Vec<(String, NodeId)> {
        map.into_iter()
            .flatten()
            .filter_map(|(key, raw)| {
                let fragment = format!("{keyword}/{}", escape_token(key));
                self.parse_data(graph, raw, child(fragment))
                    .map(|id| (key.clone(), id))
            })
            .collect()
    }

    fn parse_additional(
        &mut self,
        graph: &mut SchemaGraph,
        raw: Option<&Value>,
        slot: Slot,
    ) -> Option<Additional> {
        match raw? {
            Value::Bool(allowed) => Some(Additional::Allowed(*allowed)),
            other => self.parse_data(graph, other, slot).map(Additional::Schema),
        }
    }

    fn parse_types(&mut self, pointer: &str, names: &[&str]) -> Vec<SimpleType> {
        let mut unknown: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| SimpleType::parse(name).is_none())
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            self.error(
                pointer,
                format!(
                    "Unknown types: {}. Allowed types are: {}.",
                    unknown.join(", "),
                    SimpleType::NAMES.join(", ")
                ),
                ErrorKind::UnknownType,
            );
        }
        names.iter().filter_map(|name| SimpleType::parse(name)).collect()
    }

    fn compile(&mut self, pointer: &str, source: &str) -> Option<Pattern> {
        if !self.config.regex_is_portable(source) {
            self.error(
                pointer,
                format!("{source:?} is not a portable regular expression."),
                ErrorKind::RegexInvalid,
            );
        }
        match Pattern::new(source) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                self.error(
                    pointer,
                    format!("{source:?} is not a valid regular expression: {e}"),
                    ErrorKind::RegexInvalid,
                );
                None
            }
        }
    }

    fn check_format(&mut self, pointer: &str, name: &str) {
        if !format::is_known(self.config, name) {
            let known = format::known_names(self.config).join(", ");
            self.error(
                pointer,
                format!("{name:?} is not a valid format, must be one of {known}."),
                ErrorKind::UnknownFormat,
            );
        }
    }

    fn invalid_dependency(&mut self, pointer: &str, fragment: &str, raw: &Value) {
        self.error(
            &format!("{pointer}/{fragment}"),
            format!("{raw} is not a valid dependency, must be an object, a string or an array of strings."),
            ErrorKind::InvalidType,
        );
    }
}

/// Typed accessors over one schema object that report shape mismatches.
struct Fields<'a, 'e> {
    obj: &'a Map<String, Value>,
    pointer: &'e str,
    errors: &'e mut Vec<SchemaError>,
}

impl<'a, 'e> Fields<'a, 'e> {
    fn new(obj: &'a Map<String, Value>, pointer: &'e str, errors: &'e mut Vec<SchemaError>) -> Self {
        Self { obj, pointer, errors }
    }

    fn take<T>(
        &mut self,
        key: &str,
        expected: &str,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Option<T> {
        let value = self.obj.get(key).filter(|v| !v.is_null())?;
        let extracted = extract(value);
        if extracted.is_none() {
            self.errors.push(SchemaError::new(
                self.pointer,
                format!("{value} is not a valid \"{key}\", must be a {expected}."),
                ErrorKind::InvalidType,
            ));
        }
        extracted
    }

    fn string(&mut self, key: &str) -> Option<String> {
        self.take(key, "string", |v| v.as_str().map(str::to_string))
    }

    fn boolean(&mut self, key: &str) -> Option<bool> {
        self.take(key, "boolean", Value::as_bool)
    }

    fn count(&mut self, key: &str) -> Option<u64> {
        self.take(key, "non-negative integer", Value::as_u64)
    }

    fn number(&mut self, key: &str) -> Option<Number> {
        self.take(key, "number", |v| match v {
            Value::Number(n) => Some(n.clone()),
            _ => None,
        })
    }

    fn array(&mut self, key: &str) -> Option<&'a Vec<Value>> {
        self.take(key, "array", Value::as_array)
    }

    fn object(&mut self, key: &str) -> Option<&'a Map<String, Value>> {
        self.take(key, "object", Value::as_object)
    }

    fn schema(&mut self, key: &str) -> Option<&'a Value> {
        self.take(key, "object", |v| v.is_object().then_some(v))
    }

    fn bool_or_schema(&mut self, key: &str) -> Option<&'a Value> {
        self.take(key, "boolean or object", |v| {
            (v.is_boolean() || v.is_object()).then_some(v)
        })
    }

    fn string_list(&mut self, key: &str) -> Option<Vec<String>> {
        self.take(key, "array of strings", |v| {
            v.as_array()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }
}

/// Compute a node's resolution scope from its `id` and the parent scope.
pub(crate) fn build_uri(id: Option<&str>, parent: Option<&str>) -> String {
    let parent = parent.unwrap_or("/");
    let Some(id) = id else {
        return parent.to_string();
    };
    let id = id.split('#').next().unwrap_or("");
    if id.is_empty() {
        return parent.to_string();
    }
    let joined = if id.starts_with('/') || Url::parse(id).is_ok() {
        id.to_string()
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), id)
    };
    let trimmed = joined.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
