//! Mapping security requirements to concrete schemes

use crate::errors::Result;
use crate::openapi::{Endpoint, SecurityScheme, Specification};
use crate::prompt::Prompter;

/// A scheme named by a requirement, with the scopes that requirement asks for
#[derive(Debug, Clone, PartialEq)]
pub struct SchemeBinding {
    pub name: String,
    pub scheme: SecurityScheme,
    pub scopes: Vec<String>,
}

/// One way of satisfying a requirement: all of its schemes together
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alternative {
    pub bindings: Vec<SchemeBinding>,
    /// Scheme names the document references but never defines
    pub unresolved: Vec<String>,
}

impl Alternative {
    pub fn is_anonymous(&self) -> bool {
        self.bindings.is_empty() && self.unresolved.is_empty()
    }

    pub fn describe(&self) -> String {
        if self.is_anonymous() {
            return "no authentication".to_string();
        }
        self.bindings
            .iter()
            .map(|b| format!("{} ({})", b.name, b.scheme.kind()))
            .chain(self.unresolved.iter().map(|n| format!("{} (undefined)", n)))
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Authentication an endpoint needs
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSecurity {
    None,
    Single(Alternative),
    AnyOf(Vec<Alternative>),
}

impl ResolvedSecurity {
    /// Names of every scheme this endpoint may depend on
    pub fn scheme_names(&self) -> Vec<&str> {
        let alternatives: &[Alternative] = match self {
            ResolvedSecurity::None => &[],
            ResolvedSecurity::Single(a) => std::slice::from_ref(a),
            ResolvedSecurity::AnyOf(list) => list,
        };
        alternatives
            .iter()
            .flat_map(|a| a.bindings.iter().map(|b| b.name.as_str()))
            .collect()
    }
}

/// Resolve the requirement that applies to `endpoint`.
///
/// The operation-level requirement wins over the global one when present,
/// an explicit empty list included.
pub fn resolve_requirement(spec: &Specification, endpoint: &Endpoint) -> ResolvedSecurity {
    let requirement = endpoint.security.as_ref().unwrap_or(&spec.security);
    if requirement.is_empty() {
        return ResolvedSecurity::None;
    }

    let mut alternatives: Vec<Alternative> = requirement
        .iter()
        .map(|alt| {
            let mut resolved = Alternative::default();
            for (name, scopes) in alt {
                match spec.security_schemes.get(name) {
                    Some(scheme) => resolved.bindings.push(SchemeBinding {
                        name: name.clone(),
                        scheme: scheme.clone(),
                        scopes: scopes.clone(),
                    }),
                    None => resolved.unresolved.push(name.clone()),
                }
            }
            resolved
        })
        .collect();

    if alternatives.len() == 1 {
        let only = alternatives.remove(0);
        if only.is_anonymous() {
            ResolvedSecurity::None
        } else {
            ResolvedSecurity::Single(only)
        }
    } else {
        ResolvedSecurity::AnyOf(alternatives)
    }
}

/// Let the user pick one alternative out of several (1-based, default 1)
pub fn choose_alternative(alternatives: &[Alternative], prompter: &mut dyn Prompter) -> Result<usize> {
    prompter.info("This endpoint accepts several kinds of authentication:");
    for (i, alt) in alternatives.iter().enumerate() {
        prompter.info(&format!("  {}. {}", i + 1, alt.describe()));
    }

    loop {
        let answer = prompter.text("Choose authentication", Some("1"))?;
        match answer.trim().parse::<usize>() {
            Ok(n) if (1..=alternatives.len()).contains(&n) => return Ok(n - 1),
            _ => prompter.error(&format!(
                "Selection error: enter a number between 1 and {}",
                alternatives.len()
            )),
        }
    }
}
