//! Full `$ref` resolution normalizer

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::loader::RawDocument;
use super::model::{Capability, Specification};
use super::normalize::{check_structure, parse_security_scheme, raw_security_schemes, Extractor, Normalizer};
use super::refs::RefResolver;
use crate::errors::Result;

/// Dereferences paths and security schemes recursively before extraction
#[derive(Debug, Default, Clone, Copy)]
pub struct EnhancedNormalizer;

impl Normalizer for EnhancedNormalizer {
    fn capability(&self) -> Capability {
        Capability::Enhanced
    }

    fn normalize(&self, document: &RawDocument) -> Result<Specification> {
        let root = &document.value;
        let top = check_structure(root)?;

        let mut resolver = RefResolver::new(root);

        // Only the parts extraction reads are expanded; unrelated component
        // cycles are never walked.
        let mut resolved: Map<String, Value> = top.clone();
        resolved.insert("paths".to_string(), resolver.resolve(&top["paths"], "/paths"));

        let mut schemes = IndexMap::new();
        if let Some((defs, pointer)) = raw_security_schemes(root) {
            for (name, def) in defs {
                let location = format!("{}/{}", pointer, super::refs::escape_token(name));
                let def = resolver.resolve(def, &location);
                schemes.insert(name.clone(), parse_security_scheme(&def));
            }
        }

        let doc = Value::Object(resolved);
        Extractor::new(document, Capability::Enhanced, resolver.into_warnings()).extract(&doc, schemes)
    }
}
