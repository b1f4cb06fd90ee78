//! Fallback normalizer with shallow `$ref` handling
//!
//! Only references sitting directly under the security scheme map are
//! followed. Everything else that still holds a `$ref` is passed through and
//! flagged as partially resolved.

use indexmap::IndexMap;

use super::loader::RawDocument;
use super::model::{Capability, SecurityScheme, Specification};
use super::normalize::{check_structure, parse_security_scheme, raw_security_schemes, Extractor, Normalizer};
use super::refs::{as_ref, escape_token, lookup};
use crate::errors::{RefResolutionWarning, Result};

#[derive(Debug, Default, Clone, Copy)]
pub struct MinimalNormalizer;

impl Normalizer for MinimalNormalizer {
    fn capability(&self) -> Capability {
        Capability::Minimal
    }

    fn normalize(&self, document: &RawDocument) -> Result<Specification> {
        let root = &document.value;
        check_structure(root)?;

        let mut warnings = Vec::new();
        let mut schemes = IndexMap::new();

        if let Some((defs, pointer)) = raw_security_schemes(root) {
            for (name, def) in defs {
                let scheme = match as_ref(def) {
                    // One hop only
                    Some(reference) => match lookup(root, reference) {
                        Some(target) if as_ref(target).is_none() => parse_security_scheme(target),
                        _ => {
                            warnings.push(RefResolutionWarning::new(
                                format!("{}/{}", pointer, escape_token(name)),
                                reference,
                                "security scheme reference could not be resolved",
                            ));
                            SecurityScheme::Unsupported {
                                kind: "unresolved reference".to_string(),
                            }
                        }
                    },
                    None => parse_security_scheme(def),
                };
                schemes.insert(name.clone(), scheme);
            }
        }

        Extractor::new(document, Capability::Minimal, warnings).extract(root, schemes)
    }
}
