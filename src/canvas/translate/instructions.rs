// SPDX-License-Identifier: MIT

//! Scanning agent instructions for numbered steps and tool calls

use once_cell::sync::Lazy;
use regex::Regex;

/// `<int>. ` at the start of a line
static STEP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*(\d+)\.[ \t]+").unwrap());

/// `identifier(...)`, lower-case identifiers only
static TOOL_CALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([a-z_][a-z0-9_]*)\([^()]*\)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStep {
    pub order: u32,
    pub text: String,
}

/// Split an instruction into its numbered steps.
///
/// Each step's text runs until the next numbered line or the end of the
/// instruction. Text before the first numbered line is ignored. A number too
/// large for `u32` is replaced by the step's position in the list.
pub fn parse_steps(instruction: &str) -> Vec<ParsedStep> {
    let markers: Vec<_> = STEP_RE.captures_iter(instruction).collect();

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, caps)| {
            let whole = caps.get(0)?;
            let order = caps[1]
                .parse::<u32>()
                .unwrap_or_else(|_| u32::try_from(i + 1).unwrap_or(u32::MAX));
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(instruction.len(), |m| m.start());
            let text = instruction[whole.end()..end].trim();
            Some(ParsedStep {
                order,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Names of the functions called in `text`, first occurrence order, deduplicated
pub fn extract_tool_calls(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in TOOL_CALL_RE.captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
