//! Internal `$ref` resolution
//!
//! References are followed as JSON pointers into the same document. The walk
//! keeps the chain of references currently being expanded; meeting one of
//! them again is a cycle, and the node is left as its `{"$ref": ...}` form.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::RefResolutionWarning;

/// Look up a local reference (`#/components/schemas/Pet`) in `root`
pub fn lookup<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    if pointer.is_empty() {
        return Some(root);
    }
    if !pointer.starts_with('/') {
        return None;
    }
    let decoded = percent_decode_str(pointer).decode_utf8().ok()?;
    root.pointer(&decoded)
}

/// Last segment of a reference, e.g. `Pet` for `#/components/schemas/Pet`
pub fn ref_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// The `$ref` string of a node, if it is a reference object
pub fn as_ref(value: &Value) -> Option<&str> {
    value.get("$ref").and_then(|r| r.as_str())
}

/// Whether any `$ref` remains anywhere below `value`
pub fn contains_ref(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("$ref") || map.values().any(contains_ref),
        Value::Array(items) => items.iter().any(contains_ref),
        _ => false,
    }
}

/// Collect every `$ref` string below `value`, in document order
pub fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(r) = map.get("$ref").and_then(|r| r.as_str()) {
                out.push(r.to_string());
            }
            for (key, child) in map {
                if key != "$ref" {
                    collect_refs(child, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_refs(item, out)),
        _ => {}
    }
}

/// Recursive resolver over one document
pub struct RefResolver<'a> {
    root: &'a Value,
    /// Fully expanded targets, reused when the same reference appears again
    memo: HashMap<String, Value>,
    warnings: Vec<RefResolutionWarning>,
}

impl<'a> RefResolver<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self {
            root,
            memo: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Return a copy of `value` with every resolvable reference expanded.
    ///
    /// `location` is the JSON pointer of `value` inside the document and is
    /// only used for warnings.
    pub fn resolve(&mut self, value: &Value, location: &str) -> Value {
        let mut chain = Vec::new();
        self.walk(value, location, &mut chain)
    }

    pub fn warnings(&self) -> &[RefResolutionWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<RefResolutionWarning> {
        self.warnings
    }

    fn walk(&mut self, value: &Value, location: &str, chain: &mut Vec<String>) -> Value {
        match value {
            Value::Object(map) => match map.get("$ref").and_then(|r| r.as_str()) {
                Some(reference) => self.expand(map, reference, location, chain),
                None => {
                    let mut out = Map::with_capacity(map.len());
                    for (key, child) in map {
                        let child_location = format!("{}/{}", location, escape_token(key));
                        out.insert(key.clone(), self.walk(child, &child_location, chain));
                    }
                    Value::Object(out)
                }
            },
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.walk(item, &format!("{}/{}", location, i), chain))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn expand(
        &mut self,
        node: &Map<String, Value>,
        reference: &str,
        location: &str,
        chain: &mut Vec<String>,
    ) -> Value {
        if chain.iter().any(|r| r == reference) {
            debug!(reference, location, "Cyclic $ref left in place");
            return Value::Object(node.clone());
        }

        let expanded = match self.memo.get(reference).cloned() {
            Some(done) => done,
            None => {
                let Some(target) = lookup(self.root, reference) else {
                    let reason = if reference.starts_with('#') {
                        "target does not exist in the document"
                    } else {
                        "external references are not followed"
                    };
                    self.warn(location, reference, reason);
                    return Value::Object(node.clone());
                };

                chain.push(reference.to_string());
                let target_location = reference.trim_start_matches('#').to_string();
                let expanded = self.walk(target, &target_location, chain);
                chain.pop();

                // A result that still holds a back-reference depends on the
                // chain it was expanded under, so only cache closed results.
                if !contains_ref(&expanded) {
                    self.memo.insert(reference.to_string(), expanded.clone());
                }
                expanded
            }
        };

        merge_siblings(expanded, node, location, self, chain)
    }

    fn warn(&mut self, location: &str, reference: &str, reason: &str) {
        let warning = RefResolutionWarning::new(location, reference, reason);
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// Keys next to `$ref` (OpenAPI 3.1 allows `description`, `summary` etc.)
/// override the referenced object.
fn merge_siblings(
    expanded: Value,
    node: &Map<String, Value>,
    location: &str,
    resolver: &mut RefResolver<'_>,
    chain: &mut Vec<String>,
) -> Value {
    if node.len() == 1 {
        return expanded;
    }
    match expanded {
        Value::Object(mut target) => {
            for (key, child) in node {
                if key == "$ref" {
                    continue;
                }
                let child_location = format!("{}/{}", location, escape_token(key));
                target.insert(key.clone(), resolver.walk(child, &child_location, chain));
            }
            Value::Object(target)
        }
        other => other,
    }
}

/// JSON pointer escaping of one token
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
