//! Endpoint selection

use crate::errors::{Result, SpecPulseError};
use crate::openapi::Endpoint;
use crate::prompt::Prompter;

/// One listing line per endpoint: `N. METHOD /path - summary`
pub fn listing(endpoints: &[Endpoint]) -> Vec<String> {
    endpoints
        .iter()
        .enumerate()
        .map(|(i, ep)| {
            let mut line = format!("{}. {} {}", i + 1, ep.method, ep.path);
            if let Some(summary) = ep.summary.as_deref().filter(|s| !s.is_empty()) {
                line.push_str(" - ");
                line.push_str(summary);
            }
            if ep.deprecated {
                line.push_str(" [deprecated]");
            }
            line
        })
        .collect()
}

/// Parse a comma-separated list of 1-based indices into 0-based ones.
///
/// Any bad token rejects the whole input. Repeats keep their first position.
/// Blank input selects nothing.
pub fn parse_selection(input: &str, count: usize) -> Result<Vec<usize>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut selected = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        let index = token
            .parse::<usize>()
            .map_err(|_| SpecPulseError::Selection(format!("'{}' is not a number", token)))?;
        if index == 0 || index > count {
            return Err(SpecPulseError::Selection(format!(
                "{} is out of range (1-{})",
                index, count
            )));
        }
        if !selected.contains(&(index - 1)) {
            selected.push(index - 1);
        }
    }
    Ok(selected)
}

/// Show the endpoints and ask until the answer parses
pub fn select_endpoints(endpoints: &[Endpoint], prompter: &mut dyn Prompter) -> Result<Vec<usize>> {
    if endpoints.is_empty() {
        prompter.warn("No callable endpoints found in the document.");
        return Ok(Vec::new());
    }

    prompter.info("Available endpoints:");
    for line in listing(endpoints) {
        prompter.info(&line);
    }

    loop {
        let answer = prompter.text("Enter numbers of endpoints to call (comma-separated, e.g. 1,3)", None)?;
        match parse_selection(&answer, endpoints.len()) {
            Ok(selection) => return Ok(selection),
            Err(err) => prompter.error(&err.to_string()),
        }
    }
}
