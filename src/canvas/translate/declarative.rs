// SPDX-License-Identifier: MIT

//! Agent node back into declarative YAML
//!
//! The emitted document has the same shape the runtime serves:
//! `agents: { root: ..., <sub-agent>: ... }`. Empty fields are omitted.

use crate::canvas::graph::types::AgentData;
use crate::canvas::graph::WorkflowGraph;
use crate::runtime::types::{AgentSpec, ROOT_AGENT};
use crate::runtime::CanvasError;
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;

/// First of `name`, `name_2`, `name_3`, ... not already taken
fn unique_key(name: &str, taken: &mut HashSet<String>) -> String {
    let base = if name.is_empty() { "agent" } else { name };
    let mut key = base.to_string();
    let mut n = 2;
    while !taken.insert(key.clone()) {
        key = format!("{}_{}", base, n);
        n += 1;
    }
    key
}

fn spec_of(agent: &AgentData, sub_names: Vec<String>) -> AgentSpec {
    AgentSpec {
        model: agent.model.clone(),
        description: agent.description.clone(),
        instruction: agent.instruction.clone(),
        toolsets: agent.toolsets.clone(),
        sub_agents: sub_names,
    }
}

/// Emit `node_id`'s configuration, with every sub-agent below it.
///
/// Keys are unique: a sub-agent labelled `root` or sharing a label with an
/// earlier agent gets a numeric suffix, used in its parent's `sub_agents` too.
pub fn to_declarative(graph: &WorkflowGraph, node_id: &str) -> Result<String, CanvasError> {
    let root = graph
        .node(node_id)
        .filter(|n| n.is_agent())
        .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;

    let mut agents = Mapping::new();
    let mut seen = HashSet::from([root.id.as_str()]);
    let mut keys = HashSet::from([ROOT_AGENT.to_string()]);
    let mut pending = vec![(ROOT_AGENT.to_string(), root)];

    while let Some((key, node)) = pending.pop() {
        let Some(agent) = node.as_agent() else {
            continue;
        };
        let mut sub_names = Vec::new();
        let mut children = Vec::new();
        for sub_id in &agent.sub_agents {
            let Some(sub) = graph.node(sub_id).filter(|n| n.is_agent()) else {
                continue;
            };
            if !seen.insert(sub.id.as_str()) {
                continue;
            }
            let key = unique_key(sub.label(), &mut keys);
            sub_names.push(key.clone());
            children.push((key, sub));
        }

        let spec = serde_yaml::to_value(spec_of(agent, sub_names))?;
        agents.insert(Value::String(key), spec);
        pending.extend(children.into_iter().rev());
    }

    let mut doc = Mapping::new();
    doc.insert(Value::String("agents".to_string()), Value::Mapping(agents));
    Ok(serde_yaml::to_string(&doc)?)
}
