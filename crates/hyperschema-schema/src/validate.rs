//! # Validator
//!
//! Checks decoded JSON data against an expanded schema graph.
//!
//! ## Rule Order
//!
//! Every node applies `allOf`, `anyOf`, `oneOf`, `not`, `enum` and `type`
//! first, then the rule group matching the data's kind: arrays, numbers,
//! objects or strings. Rules at the same node are independent; in
//! collect-all mode one failing rule never stops its siblings.
//!
//! ## Modes
//!
//! [`Mode::CollectAll`] reports every violation found. [`Mode::FailFast`]
//! unwinds at the first violation and reports at most one error. Both
//! modes always agree on the verdict. The mode travels in a `Copy`
//! context passed down the recursion, so validations running on several
//! threads against the same graph never share state.
//!
//! ## Composition
//!
//! `anyOf`, `oneOf` and `not` evaluate each branch fail-fast into its own
//! list so branch errors never leak into the caller's list. A failed
//! `anyOf`/`oneOf` carries every branch's errors as sub-errors; `not`
//! discards them. `allOf` appends branch errors to the shared list unless
//! the `allOf` diagnostics switch is on, in which case every branch is
//! evaluated into its own sub-error list.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use hyperschema_core::value::{compare_numbers, is_multiple_of, json_equal};
use hyperschema_core::{DataPath, ErrorKind, ErrorList, NodeId, SchemaConfig, ValidationError};

use crate::format;
use crate::node::{Additional, Dependency, Items, SchemaGraph, SimpleType};

/// How much of the data to examine after the first violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Report every violation.
    #[default]
    CollectAll,
    /// Stop at the first violation.
    FailFast,
}

/// Validates data against nodes of an expanded [`SchemaGraph`].
#[derive(Debug, Clone, Copy)]
pub struct Validator<'g> {
    graph: &'g SchemaGraph,
    config: &'g SchemaConfig,
}

impl<'g> Validator<'g> {
    pub fn new(graph: &'g SchemaGraph, config: &'g SchemaConfig) -> Self {
        Self { graph, config }
    }

    /// Validate `data` against `root`.
    ///
    /// # Errors
    ///
    /// Returns the violations found, in discovery order. In fail-fast mode
    /// the list holds exactly one error.
    pub fn validate(
        &self,
        root: NodeId,
        data: &Value,
        mode: Mode,
    ) -> Result<(), ErrorList<ValidationError>> {
        let cx = Context {
            graph: self.graph,
            config: self.config,
            fail_fast: mode == Mode::FailFast,
        };
        let mut errors = Vec::new();
        let mut path = DataPath::root();
        let valid = cx.validate(root, data, &mut path, &mut errors);

        tracing::trace!(valid, errors = errors.len(), ?mode, "validated data");

        if valid {
            Ok(())
        } else {
            Err(ErrorList::new(errors))
        }
    }

    /// Verdict only, computed fail-fast.
    pub fn is_valid(&self, root: NodeId, data: &Value) -> bool {
        self.validate(root, data, Mode::FailFast).is_ok()
    }
}

type Rule<'g> = fn(Context<'g>, NodeId, &Value, &mut DataPath, &mut Vec<ValidationError>) -> bool;

/// Per-call evaluation state.
#[derive(Clone, Copy)]
struct Context<'g> {
    graph: &'g SchemaGraph,
    config: &'g SchemaConfig,
    fail_fast: bool,
}

impl<'g> Context<'g> {
    fn scoped(self) -> Self {
        Self {
            fail_fast: true,
            ..self
        }
    }

    const ANY_RULES: [Rule<'g>; 6] = [
        Self::all_of,
        Self::any_of,
        Self::one_of,
        Self::not,
        Self::enumeration,
        Self::types,
    ];

    const ARRAY_RULES: [Rule<'g>; 4] = [
        Self::items,
        Self::min_items,
        Self::max_items,
        Self::unique_items,
    ];

    const NUMBER_RULES: [Rule<'g>; 3] = [Self::minimum, Self::maximum, Self::multiple_of];

    const OBJECT_RULES: [Rule<'g>; 8] = [
        Self::properties,
        Self::pattern_properties,
        Self::additional_properties,
        Self::dependencies,
        Self::min_properties,
        Self::max_properties,
        Self::required,
        Self::strict_properties,
    ];

    const STRING_RULES: [Rule<'g>; 4] = [
        Self::format,
        Self::min_length,
        Self::max_length,
        Self::pattern,
    ];

    fn validate(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let valid = self.apply(&Self::ANY_RULES, id, data, path, errors);
        if !valid && self.fail_fast {
            return false;
        }
        let kind_valid = match data {
            Value::Array(_) => self.apply(&Self::ARRAY_RULES, id, data, path, errors),
            Value::Number(_) => self.apply(&Self::NUMBER_RULES, id, data, path, errors),
            Value::Object(_) => self.apply(&Self::OBJECT_RULES, id, data, path, errors),
            Value::String(_) => self.apply(&Self::STRING_RULES, id, data, path, errors),
            Value::Null | Value::Bool(_) => true,
        };
        valid && kind_valid
    }

    fn apply(
        self,
        rules: &[Rule<'g>],
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let mut valid = true;
        for rule in rules {
            if !rule(self, id, data, path, errors) {
                valid = false;
                if self.fail_fast {
                    return false;
                }
            }
        }
        valid
    }

    fn error(
        self,
        id: NodeId,
        path: &DataPath,
        data: &Value,
        message: String,
        kind: ErrorKind,
    ) -> ValidationError {
        ValidationError {
            schema: id,
            pointer: self.graph.pointer(id),
            path: path.clone(),
            message,
            kind,
            data: data.clone(),
            sub_errors: None,
        }
    }

    fn fail(
        self,
        id: NodeId,
        path: &DataPath,
        data: &Value,
        message: String,
        kind: ErrorKind,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        errors.push(self.error(id, path, data, message, kind));
        false
    }

    /// Validate `data` against each of `children` in turn, each under its
    /// own path segment, honouring fail-fast.
    fn each<'d>(
        self,
        children: impl IntoIterator<Item = (Segment<'d>, NodeId, &'d Value)>,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let mut valid = true;
        for (segment, child, value) in children {
            match segment {
                Segment::Key(key) => path.push_key(key),
                Segment::Index(index) => path.push_index(index),
            }
            let ok = self.validate(child, value, path, errors);
            path.pop();
            if !ok {
                valid = false;
                if self.fail_fast {
                    return false;
                }
            }
        }
        valid
    }

    // -- Any instance ---------------------------------------------------------

    fn all_of(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let branches = &self.graph.node(id).keywords.all_of;
        if branches.is_empty() {
            return true;
        }
        let message = "Not all subschemas of \"allOf\" matched.".to_string();

        if self.fail_fast {
            for &branch in branches {
                let mut branch_errors = Vec::new();
                if !self.validate(branch, data, path, &mut branch_errors) {
                    let mut error = self.error(id, path, data, message, ErrorKind::AllOfFailed);
                    error.sub_errors = Some(vec![branch_errors]);
                    errors.push(error);
                    return false;
                }
            }
            return true;
        }

        if self.config.all_of_sub_errors() {
            let mut valid = true;
            let mut groups = Vec::with_capacity(branches.len());
            for &branch in branches {
                let mut branch_errors = Vec::new();
                valid &= self.validate(branch, data, path, &mut branch_errors);
                groups.push(branch_errors);
            }
            if !valid {
                let mut error = self.error(id, path, data, message, ErrorKind::AllOfFailed);
                error.sub_errors = Some(groups);
                errors.push(error);
            }
            return valid;
        }

        let valid = branches
            .iter()
            .all(|&branch| self.validate(branch, data, path, errors));
        if !valid {
            errors.push(self.error(id, path, data, message, ErrorKind::AllOfFailed));
        }
        valid
    }

    fn any_of(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let branches = &self.graph.node(id).keywords.any_of;
        if branches.is_empty() {
            return true;
        }
        let mut groups = Vec::with_capacity(branches.len());
        for &branch in branches {
            let mut branch_errors = Vec::new();
            if self.scoped().validate(branch, data, path, &mut branch_errors) {
                return true;
            }
            groups.push(branch_errors);
        }
        let mut error = self.error(
            id,
            path,
            data,
            "No subschema in \"anyOf\" matched.".to_string(),
            ErrorKind::AnyOfFailed,
        );
        error.sub_errors = Some(groups);
        errors.push(error);
        false
    }

    fn one_of(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let branches = &self.graph.node(id).keywords.one_of;
        if branches.is_empty() {
            return true;
        }
        let mut matched = 0;
        let mut groups = Vec::with_capacity(branches.len());
        for &branch in branches {
            let mut branch_errors = Vec::new();
            if self.scoped().validate(branch, data, path, &mut branch_errors) {
                matched += 1;
            }
            groups.push(branch_errors);
        }
        let message = match matched {
            1 => return true,
            0 => "No subschema in \"oneOf\" matched.",
            _ => "More than one subschema in \"oneOf\" matched.",
        };
        let mut error = self.error(id, path, data, message.to_string(), ErrorKind::OneOfFailed);
        error.sub_errors = Some(groups);
        errors.push(error);
        false
    }

    fn not(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Some(inner) = self.graph.node(id).keywords.not else {
            return true;
        };
        if !self.scoped().validate(inner, data, path, &mut Vec::new()) {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            "Matched \"not\" subschema.".to_string(),
            ErrorKind::NotFailed,
            errors,
        )
    }

    fn enumeration(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Some(members) = &self.graph.node(id).keywords.enum_values else {
            return true;
        };
        if members.iter().any(|member| json_equal(member, data)) {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!("{data} is not a member of {}.", Value::Array(members.clone())),
            ErrorKind::InvalidEnum,
            errors,
        )
    }

    fn types(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let types = &self.graph.node(id).keywords.types;
        if types.is_empty() || types.iter().any(|t| t.matches(data)) {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!("{data} is not {}.", describe_types(types)),
            ErrorKind::TypeFailed,
            errors,
        )
    }

    // -- Arrays ---------------------------------------------------------------

    fn items(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Value::Array(elements) = data else {
            return true;
        };
        let kw = &self.graph.node(id).keywords;
        let tuple = match &kw.items {
            None => return true,
            Some(Items::Single(schema)) => {
                let children = elements
                    .iter()
                    .enumerate()
                    .map(|(i, value)| (Segment::Index(i), *schema, value));
                return self.each(children, path, errors);
            }
            Some(Items::Tuple(tuple)) => tuple,
        };

        let mut valid = true;
        if elements.len() < tuple.len() {
            valid = self.fail(
                id,
                path,
                data,
                format!(
                    "{} {} supplied, but the tuple requires {}.",
                    elements.len(),
                    plural(elements.len(), "item was", "items were"),
                    tuple.len()
                ),
                ErrorKind::MinItemsFailed,
                errors,
            );
        } else if elements.len() > tuple.len()
            && matches!(kw.additional_items, Some(Additional::Allowed(false)))
        {
            valid = self.fail(
                id,
                path,
                data,
                format!(
                    "No more than {} {} allowed; {} were supplied.",
                    tuple.len(),
                    plural(tuple.len(), "item is", "items are"),
                    elements.len()
                ),
                ErrorKind::MaxItemsFailed,
                errors,
            );
        }
        if !valid && self.fail_fast {
            return false;
        }

        let positional = elements
            .iter()
            .zip(tuple)
            .enumerate()
            .map(|(i, (value, schema))| (Segment::Index(i), *schema, value));
        valid &= self.each(positional, path, errors);
        if !valid && self.fail_fast {
            return false;
        }

        if let Some(Additional::Schema(extra)) = kw.additional_items {
            let overflow = elements
                .iter()
                .enumerate()
                .skip(tuple.len())
                .map(|(i, value)| (Segment::Index(i), extra, value));
            valid &= self.each(overflow, path, errors);
        }
        valid
    }

    fn min_items(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(min), Value::Array(elements)) = (self.graph.node(id).keywords.min_items, data) else {
            return true;
        };
        if elements.len() as u64 >= min {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!(
                "At least {min} {} required; only {} {} supplied.",
                plural(min as usize, "item is", "items are"),
                elements.len(),
                plural(elements.len(), "was", "were")
            ),
            ErrorKind::MinItemsFailed,
            errors,
        )
    }

    fn max_items(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(max), Value::Array(elements)) = (self.graph.node(id).keywords.max_items, data) else {
            return true;
        };
        if elements.len() as u64 <= max {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!(
                "No more than {max} {} allowed; {} were supplied.",
                plural(max as usize, "item is", "items are"),
                elements.len()
            ),
            ErrorKind::MaxItemsFailed,
            errors,
        )
    }

    fn unique_items(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(true), Value::Array(elements)) = (self.graph.node(id).keywords.unique_items, data) else {
            return true;
        };
        let duplicated = elements
            .iter()
            .enumerate()
            .any(|(i, a)| elements[i + 1..].iter().any(|b| json_equal(a, b)));
        if !duplicated {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            "Duplicate items are not allowed.".to_string(),
            ErrorKind::UniqueItemsFailed,
            errors,
        )
    }

    // -- Numbers --------------------------------------------------------------

    fn minimum(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let kw = &self.graph.node(id).keywords;
        let (Some(min), Value::Number(n)) = (&kw.minimum, data) else {
            return true;
        };
        let exclusive = kw.exclusive_minimum == Some(true);
        let ordering = compare_numbers(n, min);
        let valid = match ordering {
            Some(std::cmp::Ordering::Greater) => true,
            Some(std::cmp::Ordering::Equal) => !exclusive,
            _ => false,
        };
        if valid {
            return true;
        }
        let relation = if exclusive { "greater than" } else { "greater than or equal to" };
        self.fail(
            id,
            path,
            data,
            format!("{n} must be {relation} {min}."),
            ErrorKind::MinFailed,
            errors,
        )
    }

    fn maximum(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let kw = &self.graph.node(id).keywords;
        let (Some(max), Value::Number(n)) = (&kw.maximum, data) else {
            return true;
        };
        let exclusive = kw.exclusive_maximum == Some(true);
        let valid = match compare_numbers(n, max) {
            Some(std::cmp::Ordering::Less) => true,
            Some(std::cmp::Ordering::Equal) => !exclusive,
            _ => false,
        };
        if valid {
            return true;
        }
        let relation = if exclusive { "less than" } else { "less than or equal to" };
        self.fail(
            id,
            path,
            data,
            format!("{n} must be {relation} {max}."),
            ErrorKind::MaxFailed,
            errors,
        )
    }

    fn multiple_of(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(divisor), Value::Number(n)) = (&self.graph.node(id).keywords.multiple_of, data) else {
            return true;
        };
        if is_multiple_of(n, divisor) {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!("{n} is not a multiple of {divisor}."),
            ErrorKind::MultipleOfFailed,
            errors,
        )
    }

    // -- Objects --------------------------------------------------------------

    fn properties(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Value::Object(map) = data else {
            return true;
        };
        let children = self
            .graph
            .node(id)
            .keywords
            .properties
            .iter()
            .filter_map(|(key, schema)| {
                map.get(key)
                    .map(|value| (Segment::Key(key.as_str()), *schema, value))
            });
        self.each(children, path, errors)
    }

    fn pattern_properties(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Value::Object(map) = data else {
            return true;
        };
        let children = self
            .graph
            .node(id)
            .keywords
            .pattern_properties
            .iter()
            .flat_map(|(pattern, schema)| {
                map.iter()
                    .filter(move |(key, _)| pattern.is_match(key))
                    .map(move |(key, value)| (Segment::Key(key.as_str()), *schema, value))
            });
        self.each(children, path, errors)
    }

    fn additional_properties(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Value::Object(map) = data else {
            return true;
        };
        match self.graph.node(id).keywords.additional_properties {
            None | Some(Additional::Allowed(true)) => true,
            Some(Additional::Allowed(false)) => {
                let extra = self.extra_keys(id, map);
                extra.is_empty() || self.fail(id, path, data, not_permitted(&extra), ErrorKind::InvalidKeys, errors)
            }
            Some(Additional::Schema(schema)) => {
                let extra = self.extra_keys(id, map);
                let children = extra
                    .into_iter()
                    .filter_map(|key| map.get_key_value(key))
                    .map(|(key, value)| (Segment::Key(key.as_str()), schema, value));
                self.each(children, path, errors)
            }
        }
    }

    /// Data keys claimed by neither `properties` nor `patternProperties`.
    fn extra_keys<'d>(self, id: NodeId, map: &'d Map<String, Value>) -> Vec<&'d str> {
        let kw = &self.graph.node(id).keywords;
        map.keys()
            .filter(|key| kw.property(key).is_none())
            .filter(|key| !kw.pattern_properties.iter().any(|(p, _)| p.is_match(key)))
            .map(String::as_str)
            .collect()
    }

    fn dependencies(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let Value::Object(map) = data else {
            return true;
        };
        let mut valid = true;
        for (key, dependency) in &self.graph.node(id).keywords.dependencies {
            if !map.contains_key(key) {
                continue;
            }
            let ok = match dependency {
                Dependency::Required(names) => self.require(id, names, map, data, path, errors),
                Dependency::Schema(schema) => self.validate(*schema, data, path, errors),
            };
            if !ok {
                valid = false;
                if self.fail_fast {
                    return false;
                }
            }
        }
        valid
    }

    fn min_properties(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(min), Value::Object(map)) = (self.graph.node(id).keywords.min_properties, data) else {
            return true;
        };
        if map.len() as u64 >= min {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!(
                "At least {min} {} required; only {} {} supplied.",
                plural(min as usize, "property is", "properties are"),
                map.len(),
                plural(map.len(), "was", "were")
            ),
            ErrorKind::MinPropertiesFailed,
            errors,
        )
    }

    fn max_properties(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(max), Value::Object(map)) = (self.graph.node(id).keywords.max_properties, data) else {
            return true;
        };
        if map.len() as u64 <= max {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!(
                "No more than {max} {} allowed; {} were supplied.",
                plural(max as usize, "property is", "properties are"),
                map.len()
            ),
            ErrorKind::MaxPropertiesFailed,
            errors,
        )
    }

    fn required(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(names), Value::Object(map)) = (&self.graph.node(id).keywords.required, data) else {
            return true;
        };
        self.require(id, names, map, data, path, errors)
    }

    fn require(
        self,
        id: NodeId,
        names: &[String],
        map: &Map<String, Value>,
        data: &Value,
        path: &DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let missing: BTreeSet<&str> = names
            .iter()
            .filter(|name| !map.contains_key(name.as_str()))
            .map(String::as_str)
            .collect();
        if missing.is_empty() {
            return true;
        }
        let missing: Vec<&str> = missing.into_iter().collect();
        self.fail(
            id,
            path,
            data,
            format!(
                "\"{}\" {} supplied.",
                missing.join("\", \""),
                plural(missing.len(), "wasn't", "weren't")
            ),
            ErrorKind::RequiredFailed,
            errors,
        )
    }

    fn strict_properties(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let kw = &self.graph.node(id).keywords;
        let (Some(true), Value::Object(map)) = (kw.strict_properties, data) else {
            return true;
        };
        let mut valid = true;
        let extra = self.extra_keys(id, map);
        if !extra.is_empty() {
            valid = self.fail(id, path, data, not_permitted(&extra), ErrorKind::InvalidKeys, errors);
            if self.fail_fast {
                return false;
            }
        }
        let declared: Vec<String> = kw.properties.iter().map(|(key, _)| key.clone()).collect();
        valid &= self.require(id, &declared, map, data, path, errors);
        valid
    }

    // -- Strings --------------------------------------------------------------

    fn format(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(name), Value::String(s)) = (&self.graph.node(id).keywords.format, data) else {
            return true;
        };
        if format::check(self.config, name, s) {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!("{data} is not a valid {name}."),
            ErrorKind::InvalidFormat,
            errors,
        )
    }

    fn min_length(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(min), Value::String(s)) = (self.graph.node(id).keywords.min_length, data) else {
            return true;
        };
        let length = s.chars().count();
        if length as u64 >= min {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!(
                "At least {min} {} required; only {length} {} supplied.",
                plural(min as usize, "character is", "characters are"),
                plural(length, "was", "were")
            ),
            ErrorKind::MinLengthFailed,
            errors,
        )
    }

    fn max_length(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(max), Value::String(s)) = (self.graph.node(id).keywords.max_length, data) else {
            return true;
        };
        let length = s.chars().count();
        if length as u64 <= max {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!(
                "Only {max} {} allowed; {length} were supplied.",
                plural(max as usize, "character is", "characters are")
            ),
            ErrorKind::MaxLengthFailed,
            errors,
        )
    }

    fn pattern(
        self,
        id: NodeId,
        data: &Value,
        path: &mut DataPath,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let (Some(pattern), Value::String(s)) = (&self.graph.node(id).keywords.pattern, data) else {
            return true;
        };
        if pattern.is_match(s) {
            return true;
        }
        self.fail(
            id,
            path,
            data,
            format!("{data} does not match {}.", pattern.source()),
            ErrorKind::PatternFailed,
            errors,
        )
    }
}

/// One step below the current data path.
enum Segment<'d> {
    Key(&'d str),
    Index(usize),
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

fn not_permitted(keys: &[&str]) -> String {
    format!(
        "\"{}\" {} not permitted.",
        keys.join("\", \""),
        plural(keys.len(), "is", "are")
    )
}

fn describe_types(types: &[SimpleType]) -> String {
    let names: Vec<&str> = types
        .iter()
        .map(|t| match t {
            SimpleType::Any => "any value",
            SimpleType::Array => "an array",
            SimpleType::Boolean => "a boolean",
            SimpleType::Integer => "an integer",
            SimpleType::Null => "null",
            SimpleType::Number => "a number",
            SimpleType::Object => "an object",
            SimpleType::String => "a string",
        })
        .collect();
    match names.split_last() {
        Some((last, [])) => (*last).to_string(),
        Some((last, rest)) => format!("{} or {last}", rest.join(", ")),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::Expander;
    use crate::parser::Parser;
    use crate::store::DocumentStore;
    use serde_json::json;

    struct Fixture {
        graph: SchemaGraph,
        root: NodeId,
        config: SchemaConfig,
    }

    impl Fixture {
        fn new(schema: Value) -> Self {
            Self::with_config(schema, SchemaConfig::new())
        }

        fn with_config(schema: Value, config: SchemaConfig) -> Self {
            let mut graph = SchemaGraph::new();
            let root = Parser::new(&config).parse(&mut graph, &schema).unwrap();
            Expander::new(&config)
                .expand(&mut graph, root, &DocumentStore::new())
                .unwrap();
            Self { graph, root, config }
        }

        fn validate(&self, data: Value) -> Result<(), ErrorList<ValidationError>> {
            Validator::new(&self.graph, &self.config).validate(self.root, &data, Mode::CollectAll)
        }

        fn fail_fast(&self, data: Value) -> Result<(), ErrorList<ValidationError>> {
            Validator::new(&self.graph, &self.config).validate(self.root, &data, Mode::FailFast)
        }

        fn kinds(&self, data: Value) -> Vec<ErrorKind> {
            match self.validate(data) {
                Ok(()) => Vec::new(),
                Err(errors) => errors.iter().map(|e| e.kind).collect(),
            }
        }
    }

    #[test]
    fn required_property_scenario() {
        let f = Fixture::new(json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        }));
        assert!(f.validate(json!({ "name": "x" })).is_ok());
        let errors = f.validate(json!({})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].message, "\"name\" wasn't supplied.");
        assert_eq!(errors.errors()[0].kind, ErrorKind::RequiredFailed);
    }

    #[test]
    fn nested_error_paths() {
        let f = Fixture::new(json!({
            "properties": {
                "tags": { "items": { "type": "string" } }
            }
        }));
        let errors = f.validate(json!({ "tags": ["a", 2, "c", false] })).unwrap_err();
        let paths: Vec<String> = errors.iter().map(|e| e.path.to_string()).collect();
        assert_eq!(paths, vec!["#/tags/1", "#/tags/3"]);
        assert_eq!(errors.errors()[0].pointer, "#/properties/tags/items");
        assert_eq!(errors.errors()[0].message, "2 is not a string.");
        assert_eq!(errors.errors()[0].data, json!(2));
    }

    #[test]
    fn collect_all_reports_sibling_rules() {
        let f = Fixture::new(json!({
            "type": "string",
            "minLength": 5,
            "pattern": "^[a-z]+$"
        }));
        assert_eq!(
            f.kinds(json!("AB")),
            vec![ErrorKind::MinLengthFailed, ErrorKind::PatternFailed]
        );
        assert_eq!(f.fail_fast(json!("AB")).unwrap_err().len(), 1);
    }

    #[test]
    fn pattern_is_unanchored() {
        let f = Fixture::new(json!({ "type": "string", "pattern": "[0-9]" }));
        assert!(f.validate(json!("abc1def")).is_ok());
        assert_eq!(f.kinds(json!("abc")), vec![ErrorKind::PatternFailed]);
    }

    #[test]
    fn item_counts() {
        let f = Fixture::new(json!({ "minItems": 2, "maxItems": 2 }));
        assert_eq!(f.kinds(json!([1])), vec![ErrorKind::MinItemsFailed]);
        assert!(f.validate(json!([1, 2])).is_ok());
        assert_eq!(f.kinds(json!([1, 2, 3])), vec![ErrorKind::MaxItemsFailed]);
    }

    #[test]
    fn tuple_items() {
        let f = Fixture::new(json!({
            "items": [{ "type": "string" }, { "type": "integer" }],
            "additionalItems": false
        }));
        assert!(f.validate(json!(["a", 1])).is_ok());
        assert_eq!(f.kinds(json!(["a"])), vec![ErrorKind::MinItemsFailed]);
        assert_eq!(f.kinds(json!(["a", 1, 2])), vec![ErrorKind::MaxItemsFailed]);
        assert_eq!(f.kinds(json!([1, 1])), vec![ErrorKind::TypeFailed]);

        let open = Fixture::new(json!({
            "items": [{ "type": "string" }],
            "additionalItems": { "type": "boolean" }
        }));
        assert!(open.validate(json!(["a", true, false])).is_ok());
        let errors = open.validate(json!(["a", true, 3])).unwrap_err();
        assert_eq!(errors.errors()[0].path.to_string(), "#/2");

        let unspecified = Fixture::new(json!({ "items": [{ "type": "string" }] }));
        assert!(unspecified.validate(json!(["a", 1, null])).is_ok());
    }

    #[test]
    fn unique_items_compares_numbers_by_value() {
        let f = Fixture::new(json!({ "uniqueItems": true }));
        assert!(f.validate(json!([1, 2, "1"])).is_ok());
        assert_eq!(f.kinds(json!([1, 1.0])), vec![ErrorKind::UniqueItemsFailed]);
        assert_eq!(
            f.kinds(json!([{ "a": 1, "b": 2 }, { "b": 2, "a": 1 }])),
            vec![ErrorKind::UniqueItemsFailed]
        );
    }

    #[test]
    fn numeric_bounds() {
        let f = Fixture::new(json!({
            "minimum": 1,
            "maximum": 10,
            "exclusiveMaximum": true,
            "multipleOf": 3
        }));
        assert!(f.validate(json!(3)).is_ok());
        assert!(f.validate(json!(9.0)).is_ok());
        assert_eq!(f.kinds(json!(-1)), vec![ErrorKind::MinFailed, ErrorKind::MultipleOfFailed]);
        assert_eq!(f.kinds(json!(12)), vec![ErrorKind::MaxFailed]);
        let errors = f.validate(json!(10)).unwrap_err();
        assert_eq!(errors.errors()[0].message, "10 must be less than 10.");
    }

    #[test]
    fn integer_type_requires_integral_representation() {
        let f = Fixture::new(json!({ "type": "integer" }));
        assert!(f.validate(json!(4)).is_ok());
        assert_eq!(f.kinds(json!(4.5)), vec![ErrorKind::TypeFailed]);
        assert_eq!(f.kinds(json!(4.0)), vec![ErrorKind::TypeFailed]);

        let number = Fixture::new(json!({ "type": ["number", "null"] }));
        assert!(number.validate(json!(4)).is_ok());
        assert!(number.validate(json!(null)).is_ok());
        let errors = number.validate(json!("4")).unwrap_err();
        assert_eq!(errors.errors()[0].message, "\"4\" is not a number or null.");
    }

    #[test]
    fn enum_membership() {
        let f = Fixture::new(json!({ "enum": ["red", 1, { "a": [true] }] }));
        assert!(f.validate(json!("red")).is_ok());
        assert!(f.validate(json!(1.0)).is_ok());
        assert!(f.validate(json!({ "a": [true] })).is_ok());
        let errors = f.validate(json!("blue")).unwrap_err();
        assert_eq!(errors.errors()[0].kind, ErrorKind::InvalidEnum);
        assert_eq!(
            errors.errors()[0].message,
            "\"blue\" is not a member of [\"red\",1,{\"a\":[true]}]."
        );
    }

    #[test]
    fn one_of_counts_matches() {
        let f = Fixture::new(json!({
            "oneOf": [{ "type": "integer" }, { "minimum": 10 }]
        }));
        assert!(f.validate(json!(5)).is_ok());
        assert!(f.validate(json!(10.5)).is_ok());

        let errors = f.validate(json!(12)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.errors()[0].message,
            "More than one subschema in \"oneOf\" matched."
        );

        let errors = f.validate(json!(2.5)).unwrap_err();
        assert_eq!(errors.errors()[0].message, "No subschema in \"oneOf\" matched.");
        let groups = errors.errors()[0].sub_errors.as_ref().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].kind, ErrorKind::TypeFailed);
        assert_eq!(groups[1][0].kind, ErrorKind::MinFailed);
    }

    #[test]
    fn any_of_isolates_branch_errors() {
        let f = Fixture::new(json!({
            "anyOf": [{ "type": "string" }, { "type": "integer", "minimum": 3 }]
        }));
        assert!(f.validate(json!("x")).is_ok());
        assert!(f.validate(json!(4)).is_ok());
        let errors = f.validate(json!(1)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].kind, ErrorKind::AnyOfFailed);
        assert_eq!(errors.errors()[0].sub_errors.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn not_discards_inner_errors() {
        let f = Fixture::new(json!({ "not": { "type": "string" } }));
        assert!(f.validate(json!(1)).is_ok());
        let errors = f.validate(json!("x")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].message, "Matched \"not\" subschema.");
        assert!(errors.errors()[0].sub_errors.is_none());
    }

    #[test]
    fn all_of_modes() {
        let schema = json!({
            "allOf": [
                { "type": "string" },
                { "minLength": 3 },
                { "maxLength": 1 }
            ]
        });
        let shared = Fixture::new(schema.clone());
        let errors = shared.validate(json!("ab")).unwrap_err();
        assert_eq!(
            errors.iter().map(|e| e.kind).collect::<Vec<_>>(),
            vec![ErrorKind::MinLengthFailed, ErrorKind::AllOfFailed]
        );

        let detailed = Fixture::with_config(schema, SchemaConfig::new().with_all_of_sub_errors(true));
        let errors = detailed.validate(json!("ab")).unwrap_err();
        assert_eq!(errors.len(), 1);
        let groups = errors.errors()[0].sub_errors.as_ref().unwrap();
        assert_eq!(groups.len(), 3);
        assert!(groups[0].is_empty());
        assert_eq!(groups[1][0].kind, ErrorKind::MinLengthFailed);
        assert_eq!(groups[2][0].kind, ErrorKind::MaxLengthFailed);

        let errors = shared.fail_fast(json!(5)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].kind, ErrorKind::AllOfFailed);
        assert_eq!(errors.errors()[0].sub_errors.as_ref().unwrap()[0][0].kind, ErrorKind::TypeFailed);
    }

    #[test]
    fn object_key_rules() {
        let f = Fixture::new(json!({
            "properties": { "id": { "type": "integer" } },
            "patternProperties": { "^x-": { "type": "string" } },
            "additionalProperties": false
        }));
        assert!(f.validate(json!({ "id": 1, "x-note": "n" })).is_ok());
        assert_eq!(f.kinds(json!({ "x-note": 1 })), vec![ErrorKind::TypeFailed]);
        let errors = f.validate(json!({ "id": 1, "b": 1, "a": 2 })).unwrap_err();
        assert_eq!(errors.errors()[0].kind, ErrorKind::InvalidKeys);
        assert_eq!(errors.errors()[0].message, "\"b\", \"a\" are not permitted.");

        let typed = Fixture::new(json!({
            "properties": { "id": {} },
            "additionalProperties": { "type": "boolean" }
        }));
        assert!(typed.validate(json!({ "id": "any", "flag": true })).is_ok());
        let errors = typed.validate(json!({ "flag": "yes" })).unwrap_err();
        assert_eq!(errors.errors()[0].path.to_string(), "#/flag");
    }

    #[test]
    fn dependencies_and_counts() {
        let f = Fixture::new(json!({
            "dependencies": {
                "card": ["billing", "address"],
                "gift": { "required": ["recipient"] }
            },
            "minProperties": 1,
            "maxProperties": 3
        }));
        assert!(f.validate(json!({ "other": 1 })).is_ok());
        let errors = f.validate(json!({ "card": 1 })).unwrap_err();
        assert_eq!(errors.errors()[0].message, "\"address\", \"billing\" weren't supplied.");
        assert_eq!(f.kinds(json!({ "gift": 1 })), vec![ErrorKind::RequiredFailed]);
        assert_eq!(f.kinds(json!({})), vec![ErrorKind::MinPropertiesFailed]);
        assert_eq!(
            f.kinds(json!({ "a": 1, "b": 2, "c": 3, "d": 4 })),
            vec![ErrorKind::MaxPropertiesFailed]
        );
    }

    #[test]
    fn strict_properties() {
        let f = Fixture::new(json!({
            "strictProperties": true,
            "properties": { "a": {}, "b": {} }
        }));
        assert!(f.validate(json!({ "a": 1, "b": 2 })).is_ok());
        assert_eq!(
            f.kinds(json!({ "a": 1, "c": 3 })),
            vec![ErrorKind::InvalidKeys, ErrorKind::RequiredFailed]
        );
    }

    #[test]
    fn formats() {
        let f = Fixture::new(json!({ "format": "ipv4" }));
        assert!(f.validate(json!("10.0.0.1")).is_ok());
        assert!(f.validate(json!(7)).is_ok());
        let errors = f.validate(json!("10.0.0")).unwrap_err();
        assert_eq!(errors.errors()[0].message, "\"10.0.0\" is not a valid ipv4.");

        let custom = Fixture::with_config(
            json!({ "format": "even" }),
            SchemaConfig::new().with_custom_format("even", |s| s.len() % 2 == 0),
        );
        assert!(custom.validate(json!("ab")).is_ok());
        assert_eq!(custom.kinds(json!("abc")), vec![ErrorKind::InvalidFormat]);
    }

    #[test]
    fn string_length_counts_characters() {
        let f = Fixture::new(json!({ "maxLength": 3 }));
        assert!(f.validate(json!("äöü")).is_ok());
        assert_eq!(f.kinds(json!("äöüß")), vec![ErrorKind::MaxLengthFailed]);
    }

    #[test]
    fn recursive_schema_terminates_on_finite_data() {
        let f = Fixture::new(json!({
            "type": "object",
            "properties": {
                "value": { "type": "integer" },
                "next": { "$ref": "#" }
            }
        }));
        assert!(f.validate(json!({ "value": 1, "next": { "value": 2, "next": { "value": 3 } } })).is_ok());
        let errors = f
            .validate(json!({ "value": 1, "next": { "next": { "value": "x" } } }))
            .unwrap_err();
        assert_eq!(errors.errors()[0].path.to_string(), "#/next/next/value");
    }
}
