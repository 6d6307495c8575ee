//! # Keyword Lookup
//!
//! Name-indexed access to the keyword fields of a schema node, driven by
//! a static table. Both the JSON spelling (`additionalProperties`) and the
//! field spelling (`additional_properties`) are accepted. Names outside the
//! table, including internal bookkeeping fields such as `parent`, `clones`
//! or `expanded`, are rejected with [`KeywordError::NotAKeyword`].
//!
//! Also provides JSON Pointer evaluation over the node graph rather than
//! over raw JSON.

use serde_json::{Number, Value};

use hyperschema_core::pointer::{escape_token, parse_tokens};
use hyperschema_core::{KeywordError, NodeId};

use crate::node::{Additional, Dependency, Items, Media, Pattern, SchemaGraph, SimpleType};

/// Every keyword that can be read by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Id,
    Schema,
    Title,
    Description,
    Default,
    Definitions,
    AllOf,
    AnyOf,
    OneOf,
    Not,
    Enum,
    Type,
    Items,
    AdditionalItems,
    MinItems,
    MaxItems,
    UniqueItems,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
    Properties,
    PatternProperties,
    AdditionalProperties,
    Dependencies,
    MinProperties,
    MaxProperties,
    Required,
    StrictProperties,
    Format,
    MinLength,
    MaxLength,
    Pattern,
    Links,
    Media,
    PathStart,
    ReadOnly,
    // Link description fields.
    Href,
    Method,
    Rel,
    MediaType,
    EncType,
    LinkSchema,
    TargetSchema,
    JobSchema,
}

/// `(json name, field name, keyword)`.
static KEYWORDS: &[(&str, &str, Keyword)] = &[
    ("id", "id", Keyword::Id),
    ("$schema", "schema", Keyword::Schema),
    ("title", "title", Keyword::Title),
    ("description", "description", Keyword::Description),
    ("default", "default", Keyword::Default),
    ("definitions", "definitions", Keyword::Definitions),
    ("allOf", "all_of", Keyword::AllOf),
    ("anyOf", "any_of", Keyword::AnyOf),
    ("oneOf", "one_of", Keyword::OneOf),
    ("not", "not", Keyword::Not),
    ("enum", "enum_values", Keyword::Enum),
    ("type", "types", Keyword::Type),
    ("items", "items", Keyword::Items),
    ("additionalItems", "additional_items", Keyword::AdditionalItems),
    ("minItems", "min_items", Keyword::MinItems),
    ("maxItems", "max_items", Keyword::MaxItems),
    ("uniqueItems", "unique_items", Keyword::UniqueItems),
    ("minimum", "minimum", Keyword::Minimum),
    ("maximum", "maximum", Keyword::Maximum),
    ("exclusiveMinimum", "exclusive_minimum", Keyword::ExclusiveMinimum),
    ("exclusiveMaximum", "exclusive_maximum", Keyword::ExclusiveMaximum),
    ("multipleOf", "multiple_of", Keyword::MultipleOf),
    ("properties", "properties", Keyword::Properties),
    ("patternProperties", "pattern_properties", Keyword::PatternProperties),
    ("additionalProperties", "additional_properties", Keyword::AdditionalProperties),
    ("dependencies", "dependencies", Keyword::Dependencies),
    ("minProperties", "min_properties", Keyword::MinProperties),
    ("maxProperties", "max_properties", Keyword::MaxProperties),
    ("required", "required", Keyword::Required),
    ("strictProperties", "strict_properties", Keyword::StrictProperties),
    ("format", "format", Keyword::Format),
    ("minLength", "min_length", Keyword::MinLength),
    ("maxLength", "max_length", Keyword::MaxLength),
    ("pattern", "pattern", Keyword::Pattern),
    ("links", "links", Keyword::Links),
    ("media", "media", Keyword::Media),
    ("pathStart", "path_start", Keyword::PathStart),
    ("readOnly", "read_only", Keyword::ReadOnly),
    ("href", "href", Keyword::Href),
    ("method", "method", Keyword::Method),
    ("rel", "rel", Keyword::Rel),
    ("mediaType", "media_type", Keyword::MediaType),
    ("encType", "enc_type", Keyword::EncType),
    ("schema", "link_schema", Keyword::LinkSchema),
    ("targetSchema", "target_schema", Keyword::TargetSchema),
    ("jobSchema", "job_schema", Keyword::JobSchema),
];

impl Keyword {
    /// Resolve a keyword by JSON or field spelling. The JSON spelling
    /// wins, so `schema` is the link field and `$schema` the metaschema.
    pub fn from_name(name: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(json, _, _)| *json == name)
            .or_else(|| KEYWORDS.iter().find(|(_, field, _)| *field == name))
            .map(|(_, _, keyword)| *keyword)
    }

    /// The JSON spelling.
    pub fn json_name(&self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, _, keyword)| keyword == self)
            .map_or("", |(json, _, _)| json)
    }
}

/// A keyword's value, borrowed from the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeywordValue<'g> {
    /// The keyword is not set on this node.
    Absent,
    Bool(bool),
    Count(u64),
    Number(&'g Number),
    Str(&'g str),
    Strings(&'g [String]),
    Json(&'g Value),
    JsonList(&'g [Value]),
    Types(&'g [SimpleType]),
    Pattern(&'g Pattern),
    Node(NodeId),
    Nodes(&'g [NodeId]),
    NamedNodes(&'g [(String, NodeId)]),
    PatternNodes(&'g [(Pattern, NodeId)]),
    Items(&'g Items),
    Additional(Additional),
    Dependencies(&'g [(String, Dependency)]),
    Media(&'g Media),
}

impl KeywordValue<'_> {
    pub fn is_absent(&self) -> bool {
        matches!(self, KeywordValue::Absent)
    }
}

fn opt<'g, T>(value: Option<T>, wrap: impl FnOnce(T) -> KeywordValue<'g>) -> KeywordValue<'g> {
    value.map_or(KeywordValue::Absent, wrap)
}

fn nodes(list: &[NodeId]) -> KeywordValue<'_> {
    if list.is_empty() {
        KeywordValue::Absent
    } else {
        KeywordValue::Nodes(list)
    }
}

fn named(list: &[(String, NodeId)]) -> KeywordValue<'_> {
    if list.is_empty() {
        KeywordValue::Absent
    } else {
        KeywordValue::NamedNodes(list)
    }
}

impl SchemaGraph {
    /// Read a keyword of `id` by name.
    ///
    /// # Errors
    ///
    /// Returns [`KeywordError::NotAKeyword`] if `name` is not in the keyword
    /// table.
    pub fn keyword(&self, id: NodeId, name: &str) -> Result<KeywordValue<'_>, KeywordError> {
        let keyword =
            Keyword::from_name(name).ok_or_else(|| KeywordError::NotAKeyword(name.to_string()))?;
        let node = self.node(id);
        let kw = &node.keywords;
        let link = node.link.as_ref();

        Ok(match keyword {
            Keyword::Id => opt(kw.id.as_deref(), KeywordValue::Str),
            Keyword::Schema => opt(kw.schema.as_deref(), KeywordValue::Str),
            Keyword::Title => opt(kw.title.as_deref(), KeywordValue::Str),
            Keyword::Description => opt(kw.description.as_deref(), KeywordValue::Str),
            Keyword::Default => opt(kw.default.as_ref(), KeywordValue::Json),
            Keyword::Definitions => named(&kw.definitions),
            Keyword::AllOf => nodes(&kw.all_of),
            Keyword::AnyOf => nodes(&kw.any_of),
            Keyword::OneOf => nodes(&kw.one_of),
            Keyword::Not => opt(kw.not, KeywordValue::Node),
            Keyword::Enum => opt(kw.enum_values.as_deref(), KeywordValue::JsonList),
            Keyword::Type if kw.types.is_empty() => KeywordValue::Absent,
            Keyword::Type => KeywordValue::Types(&kw.types),
            Keyword::Items => opt(kw.items.as_ref(), KeywordValue::Items),
            Keyword::AdditionalItems => opt(kw.additional_items, KeywordValue::Additional),
            Keyword::MinItems => opt(kw.min_items, KeywordValue::Count),
            Keyword::MaxItems => opt(kw.max_items, KeywordValue::Count),
            Keyword::UniqueItems => opt(kw.unique_items, KeywordValue::Bool),
            Keyword::Minimum => opt(kw.minimum.as_ref(), KeywordValue::Number),
            Keyword::Maximum => opt(kw.maximum.as_ref(), KeywordValue::Number),
            Keyword::ExclusiveMinimum => opt(kw.exclusive_minimum, KeywordValue::Bool),
            Keyword::ExclusiveMaximum => opt(kw.exclusive_maximum, KeywordValue::Bool),
            Keyword::MultipleOf => opt(kw.multiple_of.as_ref(), KeywordValue::Number),
            Keyword::Properties => named(&kw.properties),
            Keyword::PatternProperties if kw.pattern_properties.is_empty() => KeywordValue::Absent,
            Keyword::PatternProperties => KeywordValue::PatternNodes(&kw.pattern_properties),
            Keyword::AdditionalProperties => {
                opt(kw.additional_properties, KeywordValue::Additional)
            }
            Keyword::Dependencies if kw.dependencies.is_empty() => KeywordValue::Absent,
            Keyword::Dependencies => KeywordValue::Dependencies(&kw.dependencies),
            Keyword::MinProperties => opt(kw.min_properties, KeywordValue::Count),
            Keyword::MaxProperties => opt(kw.max_properties, KeywordValue::Count),
            Keyword::Required => opt(kw.required.as_deref(), KeywordValue::Strings),
            Keyword::StrictProperties => opt(kw.strict_properties, KeywordValue::Bool),
            Keyword::Format => opt(kw.format.as_deref(), KeywordValue::Str),
            Keyword::MinLength => opt(kw.min_length, KeywordValue::Count),
            Keyword::MaxLength => opt(kw.max_length, KeywordValue::Count),
            Keyword::Pattern => opt(kw.pattern.as_ref(), KeywordValue::Pattern),
            Keyword::Links => nodes(&kw.links),
            Keyword::Media => opt(kw.media.as_ref(), KeywordValue::Media),
            Keyword::PathStart => opt(kw.path_start.as_deref(), KeywordValue::Str),
            Keyword::ReadOnly => opt(kw.read_only, KeywordValue::Bool),
            Keyword::Href => opt(link.and_then(|l| l.href.as_deref()), KeywordValue::Str),
            Keyword::Method => opt(link.and_then(|l| l.method.as_deref()), KeywordValue::Str),
            Keyword::Rel => opt(link.and_then(|l| l.rel.as_deref()), KeywordValue::Str),
            Keyword::MediaType => {
                opt(link.and_then(|l| l.media_type.as_deref()), KeywordValue::Str)
            }
            Keyword::EncType => opt(link.and_then(|l| l.enc_type.as_deref()), KeywordValue::Str),
            Keyword::LinkSchema => opt(link.and_then(|l| l.schema), KeywordValue::Node),
            Keyword::TargetSchema => opt(link.and_then(|l| l.target_schema), KeywordValue::Node),
            Keyword::JobSchema => opt(link.and_then(|l| l.job_schema), KeywordValue::Node),
        })
    }

    /// Evaluate a JSON Pointer over the node graph starting at `root`.
    ///
    /// Tokens are matched against child fragments, so `#/properties/a~1b`
    /// reaches the property named `a/b`. Returns `None` for malformed
    /// pointers and for paths that leave the schema-bearing structure.
    pub fn evaluate_pointer(&self, root: NodeId, pointer: &str) -> Option<NodeId> {
        let tokens: Vec<String> = parse_tokens(pointer)?
            .iter()
            .map(|token| escape_token(token))
            .collect();
        let mut current = root;
        let mut rest = tokens.as_slice();
        while !rest.is_empty() {
            let (child, used) = self.children(current).into_iter().find_map(|child| {
                let segments: Vec<&str> = self.node(child).fragment.split('/').collect();
                let matches = segments.len() <= rest.len()
                    && segments.iter().zip(rest).all(|(segment, token)| *segment == token.as_str());
                matches.then_some((child, segments.len()))
            })?;
            current = child;
            rest = &rest[used..];
        }
        Some(current)
    }
}
