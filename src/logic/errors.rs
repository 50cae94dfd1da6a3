use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

/// One raw schema-validator failure: a JSON-Pointer fragment addressing the
/// offending value plus the validator's free-text message.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub pointer: String,
    pub message: String,
}

impl Violation {
    pub fn new(pointer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pointer: pointer.into(),
            message: message.into(),
        }
    }
}

/// Nested error document node. Serializes directly to the JSON shape the
/// caller submitted data in: message lists at leaves, arrays for positional
/// errors, maps for field-keyed errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorTree {
    Messages(Vec<String>),
    List(Vec<ErrorTree>),
    Map(BTreeMap<String, ErrorTree>),
}

impl ErrorTree {
    fn empty_map() -> Self {
        ErrorTree::Map(BTreeMap::new())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ErrorTree::Messages(msgs) => msgs.is_empty(),
            ErrorTree::List(nodes) => nodes.iter().all(ErrorTree::is_empty),
            ErrorTree::Map(map) => map.values().all(ErrorTree::is_empty),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PathSeg {
    Key(String),
    Index(usize),
}

/// Field-keyed validation error document for one record and its nested
/// associations. Never fails to build; a record with no errors anywhere
/// serializes to `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    tree: BTreeMap<String, ErrorTree>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.values().all(ErrorTree::is_empty)
    }

    /// Attach a message directly to a top-level field
    pub fn add(&mut self, field: &str, message: &str) {
        self.insert_segments(&[PathSeg::Key(field.to_string())], message.to_string());
    }

    /// Convert a flat list of validator violations into the nested document.
    ///
    /// Missing-required-property violations are keyed at the property named
    /// in the message text, because JSON Schema reports them against the
    /// parent pointer rather than the missing child's own path. All other
    /// pointers are split on `/`: numeric segments become array positions,
    /// the rest object keys.
    pub fn from_violations(violations: &[Violation]) -> Self {
        let mut errors = Self::new();
        for violation in violations {
            let mut segments = parse_pointer(&violation.pointer);
            let message = if let Some(property) = required_property_name(&violation.message) {
                segments.push(PathSeg::Key(property));
                "can't be blank".to_string()
            } else {
                humanize_message(&violation.message)
            };
            if segments.is_empty() {
                // whole-document failure with no addressable field
                segments.push(PathSeg::Key("base".to_string()));
            }
            errors.insert_segments(&segments, message);
        }
        errors
    }

    /// Merge another error document into this one (native field errors
    /// alongside schema-validation errors, per the serializer contract)
    pub fn merge(&mut self, other: ValidationErrors) {
        for (key, node) in other.tree {
            merge_node(self.tree.entry(key).or_insert_with(ErrorTree::empty_map), node);
        }
    }

    /// Nest a child record's errors under a has-many association key at the
    /// given element position. Clean positions appear as empty maps so the
    /// array lines up with the submitted payload.
    pub fn attach_child(&mut self, association_key: &str, index: usize, child: ValidationErrors) {
        let node = self
            .tree
            .entry(association_key.to_string())
            .or_insert_with(|| ErrorTree::List(Vec::new()));
        if !matches!(node, ErrorTree::List(_)) {
            *node = ErrorTree::List(Vec::new());
        }
        if let ErrorTree::List(elements) = node {
            while elements.len() <= index {
                elements.push(ErrorTree::empty_map());
            }
            elements[index] = ErrorTree::Map(child.tree);
        }
    }

    /// Nest a child record's errors under a has-one association key as a
    /// single nested map
    pub fn attach_one(&mut self, association_key: &str, child: ValidationErrors) {
        self.tree
            .insert(association_key.to_string(), ErrorTree::Map(child.tree));
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    fn insert_segments(&mut self, segments: &[PathSeg], message: String) {
        let (first, rest) = match segments.split_first() {
            Some(split) => split,
            None => return,
        };
        let key = match first {
            PathSeg::Key(key) => key.clone(),
            PathSeg::Index(index) => index.to_string(),
        };
        let node = self.tree.entry(key).or_insert_with(ErrorTree::empty_map);
        insert_into_node(node, rest, message);
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

fn insert_into_node(node: &mut ErrorTree, segments: &[PathSeg], message: String) {
    match segments.split_first() {
        None => {
            if !matches!(node, ErrorTree::Messages(_)) {
                if node.is_empty() {
                    *node = ErrorTree::Messages(Vec::new());
                } else if let ErrorTree::Map(map) = node {
                    // field has both its own error and nested ones; keep both
                    let leaf = map
                        .entry("base".to_string())
                        .or_insert_with(|| ErrorTree::Messages(Vec::new()));
                    insert_into_node(leaf, &[], message);
                    return;
                } else {
                    return;
                }
            }
            if let ErrorTree::Messages(msgs) = node {
                if !msgs.contains(&message) {
                    msgs.push(message);
                }
            }
        }
        Some((PathSeg::Index(index), rest)) => {
            if !matches!(node, ErrorTree::List(_)) {
                *node = ErrorTree::List(Vec::new());
            }
            if let ErrorTree::List(elements) = node {
                while elements.len() <= *index {
                    elements.push(ErrorTree::empty_map());
                }
                insert_into_node(&mut elements[*index], rest, message);
            }
        }
        Some((PathSeg::Key(key), rest)) => {
            if !matches!(node, ErrorTree::Map(_)) {
                *node = ErrorTree::empty_map();
            }
            if let ErrorTree::Map(map) = node {
                let child = map
                    .entry(key.clone())
                    .or_insert_with(ErrorTree::empty_map);
                insert_into_node(child, rest, message);
            }
        }
    }
}

fn merge_node(into: &mut ErrorTree, from: ErrorTree) {
    match (into, from) {
        (ErrorTree::Messages(dst), ErrorTree::Messages(src)) => {
            for msg in src {
                if !dst.contains(&msg) {
                    dst.push(msg);
                }
            }
        }
        (ErrorTree::Map(dst), ErrorTree::Map(src)) => {
            for (key, node) in src {
                merge_node(dst.entry(key).or_insert_with(ErrorTree::empty_map), node);
            }
        }
        (ErrorTree::List(dst), ErrorTree::List(src)) => {
            for (index, node) in src.into_iter().enumerate() {
                while dst.len() <= index {
                    dst.push(ErrorTree::empty_map());
                }
                merge_node(&mut dst[index], node);
            }
        }
        (dst, src) => {
            if dst.is_empty() {
                *dst = src;
            }
        }
    }
}

fn parse_pointer(pointer: &str) -> Vec<PathSeg> {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let unescaped = segment.replace("~1", "/").replace("~0", "~");
            match unescaped.parse::<usize>() {
                Ok(index) => PathSeg::Index(index),
                Err(_) => PathSeg::Key(unescaped),
            }
        })
        .collect()
}

/// Property named by a `"x" is a required property` message, if any
fn required_property_name(message: &str) -> Option<String> {
    let rest = message.strip_prefix('"')?;
    let (name, tail) = rest.split_once('"')?;
    if tail.trim_start().starts_with("is a required property") {
        Some(name.to_string())
    } else {
        None
    }
}

/// Map a validator's free-text message onto the fixed human-readable
/// lexicon. Unmatched messages fall back to a cleaned, lower-cased copy.
pub fn humanize_message(raw: &str) -> String {
    if raw.contains("is a required property") {
        return "can't be blank".to_string();
    }
    if let Some(type_name) = not_of_type(raw) {
        return match type_name.as_str() {
            "string" => "must be a string".to_string(),
            "integer" => "must be an integer".to_string(),
            "number" => "must be a number".to_string(),
            "boolean" => "must be a boolean".to_string(),
            "array" => "must be an array".to_string(),
            "object" => "must be an object".to_string(),
            _ => "is invalid".to_string(),
        };
    }
    if raw.contains("does not match") {
        return "is invalid".to_string();
    }
    if raw.contains("is not one of") {
        return "is not included in the list".to_string();
    }
    if raw.contains("is shorter than") {
        return "is too short".to_string();
    }
    if raw.contains("is longer than") {
        return "is too long".to_string();
    }
    if raw.contains("is less than the minimum") {
        return "is too small".to_string();
    }
    if raw.contains("is greater than the maximum") {
        return "is too large".to_string();
    }
    if raw.contains("Additional properties are not allowed") {
        return "contains unknown fields".to_string();
    }
    clean_raw_message(raw)
}

/// `<value> is not of type "integer"` -> `integer`
fn not_of_type(message: &str) -> Option<String> {
    let (_, tail) = message.split_once("is not of type")?;
    let name: String = tail
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect();
    Some(name.to_lowercase())
}

/// Fallback cleanup for unmatched validator messages: schema-path and
/// JSON-Pointer tokens are stripped so internal schema structure never
/// leaks to users, the rest is whitespace-collapsed and lower-cased.
fn clean_raw_message(raw: &str) -> String {
    raw.split_whitespace()
        .filter(|token| !is_schema_identifier(token))
        .join(" ")
        .to_lowercase()
}

fn is_schema_identifier(token: &str) -> bool {
    let trimmed = token.trim_matches(|ch: char| matches!(ch, '"' | '\'' | '(' | ')' | ',' | '.'));
    trimmed.starts_with("#/") || trimmed.starts_with('/')
}
