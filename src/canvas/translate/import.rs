// SPDX-License-Identifier: MIT

//! Declarative YAML agent configuration into graph nodes
//!
//! Every entry under `agents` becomes an agent node. Numbered steps in the
//! instruction become a `flow` chain of step nodes, and each function call a
//! step mentions becomes a tool node linked from that step with a `tool` edge.

use super::instructions::{extract_tool_calls, parse_steps};
use crate::canvas::config::LayoutConfig;
use crate::canvas::engine::Editor;
use crate::canvas::graph::types::{
    new_id, AgentData, Connection, Node, NodeKind, Position, StepData, StepDescriptor, ToolData,
};
use crate::canvas::graph::GraphBatch;
use crate::canvas::layout;
use crate::runtime::error::{CanvasError, ImportError};
use crate::runtime::types::{AgentSpec, Toolset, ToolsetType};
use std::collections::HashMap;

/// What an import added to the graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub agents: usize,
    pub steps: usize,
    pub tools: usize,
    pub connections: usize,
}

impl ImportSummary {
    fn of(batch: &GraphBatch) -> Self {
        let mut summary = Self {
            connections: batch.connections.len(),
            ..Default::default()
        };
        for node in &batch.nodes {
            match node.kind {
                NodeKind::Agent(_) => summary.agents += 1,
                NodeKind::Step(_) => summary.steps += 1,
                NodeKind::Tool(_) => summary.tools += 1,
                _ => {}
            }
        }
        summary
    }
}

/// Parse the `agents` mapping, keeping document order
fn declared_agents(content: &str) -> Result<Vec<(String, AgentSpec)>, ImportError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(content)
        .map_err(|e| ImportError::InvalidDocument(e.to_string()))?;
    let agents = doc
        .get("agents")
        .and_then(serde_yaml::Value::as_mapping)
        .ok_or(ImportError::MissingAgents)?;
    if agents.is_empty() {
        return Err(ImportError::EmptyDocument);
    }

    agents
        .iter()
        .map(|(key, value)| {
            let name = key
                .as_str()
                .ok_or_else(|| ImportError::InvalidDocument("agent names must be strings".into()))?;
            let spec = if value.is_null() {
                AgentSpec::default()
            } else {
                serde_yaml::from_value(value.clone())
                    .map_err(|e| ImportError::InvalidDocument(format!("agent '{}': {}", name, e)))?
            };
            Ok((name.to_string(), spec))
        })
        .collect()
}

/// Nodes for one declared agent: the agent, its step chain and the tools
/// the steps call. Returns the agent id.
fn push_agent(
    layout: &LayoutConfig,
    batch: &mut GraphBatch,
    name: &str,
    spec: &AgentSpec,
    position: Position,
) -> String {
    let agent_id = new_id("agent");
    let mut data = AgentData::named(name);
    data.model = spec.model.clone();
    data.description = spec.description.clone();
    data.instruction = spec.instruction.clone();
    data.toolsets = spec
        .toolsets
        .iter()
        .filter(|ts| ts.toolset_type() == ToolsetType::Mcp)
        .cloned()
        .collect();

    let mut tool_ids: HashMap<String, String> = HashMap::new();
    let mut previous = agent_id.clone();

    for (i, step) in parse_steps(&spec.instruction).into_iter().enumerate() {
        let step_id = new_id("step");
        let mut step_tools = Vec::new();

        for call in extract_tool_calls(&step.text) {
            let tool_id = match tool_ids.get(&call) {
                Some(id) => id.clone(),
                None => {
                    let pos = layout::step_position(layout, position, tool_ids.len())
                        .offset(layout.import_tool_offset_x, 0.0);
                    let mut tool = ToolData::from_toolset(&Toolset::named(call.as_str()));
                    tool.parent_agent_id = Some(agent_id.clone());
                    let node = Node::new(new_id("tool"), pos, NodeKind::Tool(tool));
                    let id = node.id.clone();
                    batch.nodes.push(node);
                    tool_ids.insert(call, id.clone());
                    id
                }
            };
            batch
                .connections
                .push(Connection::tool(step_id.clone(), tool_id.clone()));
            step_tools.push(tool_id);
        }

        data.steps.push(StepDescriptor {
            order: step.order,
            description: step.text.clone(),
            tool_ids: step_tools.clone(),
        });
        let pos = layout::step_position(layout, position, i);
        batch.nodes.push(Node::new(
            step_id.clone(),
            pos,
            NodeKind::Step(StepData {
                order: step.order,
                description: step.text,
                tool_ids: step_tools,
                parent_agent_id: Some(agent_id.clone()),
            }),
        ));
        batch
            .connections
            .push(Connection::flow(previous, step_id.clone()));
        previous = step_id;
    }

    batch
        .nodes
        .push(Node::new(agent_id.clone(), position, NodeKind::Agent(data)));
    agent_id
}

/// Link declared sub-agents that were imported in the same document
fn link_sub_agents(batch: &mut GraphBatch, specs: &[(String, AgentSpec)], ids: &[String]) {
    let by_name: HashMap<&str, &str> = specs
        .iter()
        .zip(ids)
        .map(|((name, _), id)| (name.as_str(), id.as_str()))
        .collect();
    let mut links: Vec<(String, String)> = Vec::new();

    for ((name, spec), parent_id) in specs.iter().zip(ids) {
        for sub in &spec.sub_agents {
            match by_name.get(sub.as_str()) {
                Some(&child_id) if sub != name && !links.iter().any(|(c, _)| c == child_id) => {
                    links.push((child_id.to_string(), parent_id.clone()));
                }
                _ => log::debug!("Skipping sub-agent '{}' of '{}'", sub, name),
            }
        }
    }

    for (child_id, parent_id) in links {
        for node in batch.nodes.iter_mut() {
            if let NodeKind::Agent(a) = &mut node.kind {
                if node.id == child_id {
                    a.parent_agent_id = Some(parent_id.clone());
                } else if node.id == parent_id {
                    a.sub_agents.push(child_id.clone());
                }
            }
        }
        batch
            .connections
            .push(Connection::tool(child_id, parent_id));
    }
}

/// Translate a declarative document into a batch ready for commit.
///
/// Fails without producing anything when the document has no `agents`
/// mapping or an entry does not parse.
pub fn declarative_batch(content: &str, layout: &LayoutConfig) -> Result<GraphBatch, ImportError> {
    let specs = declared_agents(content)?;
    let origin = layout.import_origin;
    let mut batch = GraphBatch::default();

    let ids: Vec<String> = specs
        .iter()
        .enumerate()
        .map(|(i, (name, spec))| {
            let position = origin.offset(i as f64 * layout.import_agent_spacing_x, 0.0);
            push_agent(layout, &mut batch, name, spec, position)
        })
        .collect();
    link_sub_agents(&mut batch, &specs, &ids);

    Ok(batch)
}

impl Editor {
    /// Import a declarative agent configuration into the current graph
    pub fn import_declarative(&mut self, content: &str) -> Result<ImportSummary, CanvasError> {
        let batch = declarative_batch(content, &self.config().layout)?;
        let summary = ImportSummary::of(&batch);
        self.commit_batch(batch)?;
        log::info!(
            "Imported {} agents, {} steps, {} tools",
            summary.agents,
            summary.steps,
            summary.tools
        );
        Ok(summary)
    }
}
