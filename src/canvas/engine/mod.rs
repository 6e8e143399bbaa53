// SPDX-License-Identifier: MIT

//! Graph mutation engine
//!
//! Every change to a [`WorkflowGraph`] goes through the [`Editor`]. Operations
//! that would break an invariant (deleting a reserved node, duplicating an
//! edge, splitting a `tool` edge) are rejected as no-ops and logged at debug
//! level.

mod execution;
mod expansion;

pub use execution::{RunOutcome, RunRequest};
pub use expansion::{expand, Expansion, ExpansionRequest, ExpansionTask};

use crate::canvas::config::EditorConfig;
use crate::canvas::graph::types::{
    AgentData, Connection, ConnectionType, InputData, KnowledgeData, KnowledgeItem, Node, NodeKind,
    NodeTemplate, NodeType, OutputData, Position, VisibilityFlag,
};
use crate::canvas::graph::{GraphBatch, WorkflowGraph};
use crate::canvas::layout;
use crate::runtime::types::AgentSpec;
use crate::runtime::{AgentRuntime, CanvasError};
use std::collections::HashSet;

/// Result of dropping a template on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct AddOutcome {
    pub node_id: String,
    /// Set for agents: the configuration fetch still to be performed
    pub expansion: Option<ExpansionRequest>,
}

/// Owner of the workflow graph and its invariants
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    graph: WorkflowGraph,
    is_executing: bool,
}

impl Editor {
    /// Create an editor holding only the three reserved nodes
    pub fn new(config: EditorConfig) -> Self {
        let mut editor = Self {
            config,
            graph: WorkflowGraph::new(),
            is_executing: false,
        };
        editor.ensure_reserved_nodes();
        editor
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn is_reserved(&self, id: &str) -> bool {
        self.config.reserved.contains(id)
    }

    /// Default node lookup: the reserved input, output or knowledge node
    pub fn default_node(&self, node_type: NodeType) -> Option<&Node> {
        let reserved = &self.config.reserved;
        let id = match node_type {
            NodeType::Input => &reserved.input,
            NodeType::Output => &reserved.output,
            NodeType::Knowledge => &reserved.knowledge,
            _ => return None,
        };
        self.graph.node(id)
    }

    fn reserved_nodes(config: &EditorConfig) -> [Node; 3] {
        let r = &config.reserved;
        let l = &config.layout;
        [
            Node::new(&r.input, l.input_position, NodeKind::Input(InputData::default())),
            Node::new(&r.output, l.output_position, NodeKind::Output(OutputData::default())),
            Node::new(
                &r.knowledge,
                l.knowledge_position,
                NodeKind::Knowledge(KnowledgeData::default()),
            ),
        ]
    }

    /// Recreate any reserved node that is missing
    fn ensure_reserved_nodes(&mut self) {
        for node in Self::reserved_nodes(&self.config) {
            if !self.graph.contains(&node.id) {
                self.graph.insert_node(node);
            }
        }
    }

    /// AddNode: place a node from a template.
    ///
    /// For agents this only creates the shell; the returned
    /// [`ExpansionRequest`] describes the configuration fetch whose result is
    /// committed later through [`Editor::apply_expansion`].
    pub fn add_node(&mut self, template: &NodeTemplate, position: Position) -> AddOutcome {
        let node = template.instantiate(position);
        let node_id = node.id.clone();
        let expansion = node.as_agent().map(|a| ExpansionRequest {
            agent_id: node_id.clone(),
            agent_name: a.name.clone(),
        });

        self.graph.insert_node(node);
        log::info!("Added {} node {}", template.node_type(), node_id);

        AddOutcome { node_id, expansion }
    }

    /// AddNode including the agent configuration fetch, awaited inline
    pub async fn add_node_expanded(
        &mut self,
        runtime: &dyn AgentRuntime,
        template: &NodeTemplate,
        position: Position,
    ) -> String {
        let outcome = self.add_node(template, position);
        if let Some(request) = outcome.expansion {
            let expansion = expand(runtime, request).await;
            self.apply_expansion(expansion);
        }
        outcome.node_id
    }

    /// AttachChild: drop a tool or agent template onto an existing agent.
    ///
    /// Returns the new node id, or `None` when the parent is not an agent or
    /// the template is neither a tool nor an agent.
    pub fn attach_child(&mut self, parent_id: &str, template: &NodeTemplate) -> Option<String> {
        let parent = self.graph.node(parent_id)?;
        let Some(parent_agent) = parent.as_agent() else {
            log::debug!("Rejected attach to non-agent node {}", parent_id);
            return None;
        };
        let parent_pos = parent.position;
        let sub_agent_count = parent_agent.sub_agents.len();
        let tool_count = self.owned_tool_ids(parent_id).len();

        let (mut node, toolset) = match template {
            NodeTemplate::Agent { .. } => {
                let pos =
                    layout::sub_agent_position(&self.config.layout, parent_pos, sub_agent_count);
                (template.instantiate(pos), None)
            }
            NodeTemplate::Tool { toolset } => {
                let pos = layout::tool_position(
                    &self.config.layout,
                    parent_pos,
                    tool_count,
                    sub_agent_count,
                );
                (template.instantiate(pos), Some(toolset.clone()))
            }
            _ => {
                log::debug!("Rejected attaching {} node to agent", template.node_type());
                return None;
            }
        };

        match &mut node.kind {
            NodeKind::Agent(a) => a.parent_agent_id = Some(parent_id.to_string()),
            NodeKind::Tool(t) => t.parent_agent_id = Some(parent_id.to_string()),
            _ => {}
        }
        let node_id = node.id.clone();
        let is_agent = node.is_agent();

        self.graph.insert_node(node);
        self.graph
            .insert_connection(Connection::tool(node_id.clone(), parent_id));

        if let Some(parent) = self.graph.node_mut(parent_id).and_then(Node::as_agent_mut) {
            if is_agent {
                parent.sub_agents.push(node_id.clone());
            }
            if let Some(toolset) = toolset {
                parent.toolsets.push(toolset);
            }
        }
        let sub_rows = &self.config.layout.sub_agents;
        if is_agent && sub_rows.rows_for(sub_agent_count + 1) != sub_rows.rows_for(sub_agent_count)
        {
            self.relayout_tools(parent_id);
        }

        log::info!(
            "Attached {} {} to agent {}",
            if is_agent { "sub-agent" } else { "tool" },
            node_id,
            parent_id
        );
        Some(node_id)
    }

    /// Tool nodes owned by `agent_id`, in attachment order
    fn owned_tool_ids(&self, agent_id: &str) -> Vec<String> {
        self.graph
            .tools_of(agent_id)
            .into_iter()
            .filter(|n| n.parent_agent_id() == Some(agent_id))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Re-tile an agent's owned tools below its current sub-agent rows
    pub(crate) fn relayout_tools(&mut self, agent_id: &str) {
        let Some(parent) = self.graph.node(agent_id) else {
            return;
        };
        let parent_pos = parent.position;
        let sub_agent_count = parent.as_agent().map_or(0, |a| a.sub_agents.len());
        for (index, id) in self.owned_tool_ids(agent_id).iter().enumerate() {
            let pos =
                layout::tool_position(&self.config.layout, parent_pos, index, sub_agent_count);
            if let Some(node) = self.graph.node_mut(id) {
                node.position = pos;
            }
        }
        log::debug!("Re-laid out tools of agent {}", agent_id);
    }

    /// MoveNode: overwrite a node's position; children stay where they are
    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> bool {
        match self.graph.node_mut(id) {
            Some(node) => {
                node.position = Position::new(x, y);
                true
            }
            None => false,
        }
    }

    /// Node ids removed together with `id`: listed sub-agents and every node
    /// owned through `parent_agent_id`, transitively.
    fn deletion_closure(&self, id: &str) -> HashSet<String> {
        let mut collected = HashSet::new();
        let mut stack = vec![id.to_string()];

        while let Some(current) = stack.pop() {
            if self.is_reserved(&current) || !collected.insert(current.clone()) {
                continue;
            }
            if let Some(agent) = self.graph.node(&current).and_then(Node::as_agent) {
                stack.extend(agent.sub_agents.iter().cloned());
            }
            stack.extend(self.graph.children_of(&current).iter().cloned());
        }

        collected.retain(|n| self.graph.contains(n));
        collected
    }

    /// DeleteNode: remove a node with its cascade.
    ///
    /// Reserved nodes are never removed. Returns the ids actually deleted.
    pub fn delete_node(&mut self, id: &str) -> Vec<String> {
        if self.is_reserved(id) {
            log::debug!("Rejected deletion of reserved node {}", id);
            return Vec::new();
        }
        let Some(node) = self.graph.node(id).cloned() else {
            return Vec::new();
        };

        let doomed = self.deletion_closure(id);
        self.detach_from_survivors(&node, &doomed);
        let removed = self.graph.remove_nodes(&doomed);

        log::info!("Deleted node {} ({} nodes removed)", id, removed);
        let mut ids: Vec<String> = doomed.into_iter().collect();
        ids.sort();
        ids
    }

    /// Scrub references to deleted nodes from the nodes that survive
    fn detach_from_survivors(&mut self, node: &Node, doomed: &HashSet<String>) {
        if let Some(parent_id) = node.parent_agent_id().map(str::to_string) {
            if !doomed.contains(&parent_id) {
                if let Some(parent) = self.graph.node_mut(&parent_id).and_then(Node::as_agent_mut)
                {
                    parent.sub_agents.retain(|s| s != &node.id);
                    match &node.kind {
                        NodeKind::Tool(t) => {
                            if let Some(toolset) = &t.toolset {
                                if let Some(pos) = parent.toolsets.iter().position(|ts| ts == toolset)
                                {
                                    parent.toolsets.remove(pos);
                                }
                            }
                        }
                        NodeKind::Step(s) => parent.steps.retain(|d| d.order != s.order),
                        _ => {}
                    }
                }
            }
        }

        let survivors: Vec<String> = self
            .graph
            .nodes()
            .iter()
            .filter(|n| !doomed.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        for id in survivors {
            let Some(survivor) = self.graph.node_mut(&id) else {
                continue;
            };
            match &mut survivor.kind {
                NodeKind::Step(s) => s.tool_ids.retain(|t| !doomed.contains(t)),
                NodeKind::Agent(a) => {
                    a.sub_agents.retain(|s| !doomed.contains(s));
                    for step in &mut a.steps {
                        step.tool_ids.retain(|t| !doomed.contains(t));
                    }
                }
                _ => {}
            }
        }
    }

    /// ToggleVisibility: flip one switch on an agent; returns the new value
    pub fn toggle_visibility(&mut self, id: &str, flag: VisibilityFlag) -> Option<bool> {
        let agent = self.graph.node_mut(id)?.as_agent_mut()?;
        Some(agent.visibility.toggle(flag))
    }

    /// Connect: add an edge, inferring its type.
    ///
    /// Rejects self-loops, duplicate (source, target) pairs and unknown
    /// endpoints. The edge is `tool` iff a tool points at an agent.
    pub fn connect(&mut self, source_id: &str, target_id: &str) -> Option<String> {
        if source_id == target_id || self.graph.has_edge(source_id, target_id) {
            log::debug!("Rejected connection {} -> {}", source_id, target_id);
            return None;
        }
        let source = self.graph.node(source_id)?;
        let target = self.graph.node(target_id)?;

        let connection_type = if source.is_tool() && target.is_agent() {
            ConnectionType::Tool
        } else {
            ConnectionType::Flow
        };
        let connection = Connection::new(source_id, target_id, connection_type);
        let id = connection.id.clone();
        self.graph.insert_connection(connection);
        Some(id)
    }

    /// SplitFlowEdgeWithAgent: reroute a `flow` edge through an agent.
    ///
    /// `tool` edges are never split.
    pub fn split_flow_edge(&mut self, connection_id: &str, agent_id: &str) -> bool {
        let Some(existing) = self.graph.connection(connection_id).cloned() else {
            return false;
        };
        if existing.connection_type != ConnectionType::Flow {
            log::debug!("Rejected split of tool connection {}", connection_id);
            return false;
        }
        if !self.graph.node(agent_id).is_some_and(Node::is_agent) || existing.touches(agent_id) {
            log::debug!("Rejected split of {} with {}", connection_id, agent_id);
            return false;
        }

        self.graph.remove_connection(connection_id);
        for (source, target) in [
            (existing.source_id.as_str(), agent_id),
            (agent_id, existing.target_id.as_str()),
        ] {
            if !self.graph.has_edge(source, target) {
                self.graph.insert_connection(Connection::flow(source, target));
            }
        }
        true
    }

    /// DeleteConnection
    pub fn delete_connection(&mut self, id: &str) -> bool {
        self.graph.remove_connection(id).is_some()
    }

    /// ClearWorkflow: keep only the reserved nodes, with default payloads
    pub fn clear_workflow(&mut self) {
        let mut graph = WorkflowGraph::new();
        for mut node in Self::reserved_nodes(&self.config) {
            if let Some(existing) = self.graph.node(&node.id) {
                node.position = existing.position;
            }
            graph.insert_node(node);
        }
        self.graph = graph;
        log::info!("Cleared workflow");
    }

    /// Insert a batch of nodes and connections atomically
    pub fn commit_batch(&mut self, batch: GraphBatch) -> Result<usize, CanvasError> {
        let count = self.graph.commit(batch)?;
        log::info!("Committed batch of {} nodes", count);
        Ok(count)
    }

    /// Configuration save for an agent node
    pub fn save_agent_config(&mut self, id: &str, spec: &AgentSpec) -> bool {
        match self.graph.node_mut(id).and_then(Node::as_agent_mut) {
            Some(agent) => {
                agent.apply_spec(spec);
                true
            }
            None => false,
        }
    }

    pub fn set_input_prompt(&mut self, prompt: impl Into<String>) -> bool {
        let id = self.config.reserved.input.clone();
        match self.graph.node_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Input(input)) => {
                input.prompt = prompt.into();
                true
            }
            _ => false,
        }
    }

    fn knowledge_mut(&mut self) -> Option<&mut KnowledgeData> {
        let id = self.config.reserved.knowledge.clone();
        match self.graph.node_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Knowledge(k)) => Some(k),
            _ => None,
        }
    }

    /// Attach a file or URL to the shared knowledge node
    pub fn add_knowledge_item(&mut self, item: KnowledgeItem) -> bool {
        match self.knowledge_mut() {
            Some(knowledge) => {
                log::info!("Added knowledge item {}", item.name);
                knowledge.items.push(item);
                true
            }
            None => false,
        }
    }

    pub fn remove_knowledge_item(&mut self, item_id: &str) -> bool {
        let Some(knowledge) = self.knowledge_mut() else {
            return false;
        };
        let before = knowledge.items.len();
        knowledge.items.retain(|i| i.id != item_id);
        knowledge.items.len() != before
    }

    /// Replace the whole graph, e.g. from a loaded workflow document.
    ///
    /// Duplicate nodes, dangling or duplicate edges and broken parent links
    /// are dropped; missing reserved nodes, and reserved ids loaded with the
    /// wrong node type, are recreated.
    pub fn replace_graph(&mut self, nodes: Vec<Node>, connections: Vec<Connection>) {
        let reserved = &self.config.reserved;
        let nodes: Vec<Node> = nodes
            .into_iter()
            .filter(|node| match reserved.node_type_of(&node.id) {
                Some(expected) if node.node_type() != expected => {
                    log::warn!(
                        "Replacing reserved node {}: expected {}, found {}",
                        node.id,
                        expected,
                        node.node_type()
                    );
                    false
                }
                _ => true,
            })
            .collect();
        let agent_ids: HashSet<String> = nodes
            .iter()
            .filter(|n| n.is_agent())
            .map(|n| n.id.clone())
            .collect();

        self.graph = WorkflowGraph::new();
        for mut node in nodes {
            if node
                .parent_agent_id()
                .is_some_and(|p| !agent_ids.contains(p))
            {
                log::warn!("Node {} references a missing parent agent", node.id);
                node.clear_parent_agent_id();
            }
            if let NodeKind::Agent(a) = &mut node.kind {
                a.sub_agents.retain(|s| agent_ids.contains(s));
            }
            let id = node.id.clone();
            if !self.graph.insert_node(node) {
                log::warn!("Skipped duplicate node id {} while loading", id);
            }
        }
        self.ensure_reserved_nodes();

        for conn in connections {
            let resolves =
                self.graph.contains(&conn.source_id) && self.graph.contains(&conn.target_id);
            if !resolves || conn.source_id == conn.target_id {
                log::warn!("Dropped invalid connection {}", conn.id);
                continue;
            }
            if self.graph.has_edge(&conn.source_id, &conn.target_id) {
                continue;
            }
            self.graph.insert_connection(conn);
        }
    }

    pub(crate) fn agent_mut(&mut self, id: &str) -> Option<&mut AgentData> {
        self.graph.node_mut(id).and_then(Node::as_agent_mut)
    }
}
