// SPDX-License-Identifier: MIT

//! The authoritative node/connection collections and read-only queries
//!
//! Mutators are crate-private: only the [`Editor`](crate::canvas::engine::Editor)
//! changes a graph, and it is responsible for keeping the invariants.

use super::types::{Connection, ConnectionType, KnowledgeItem, Node, NodeKind, NodeType};
use crate::runtime::CanvasError;
use std::collections::{HashMap, HashSet};

/// Nodes and connections to be inserted together
#[derive(Debug, Clone, Default)]
pub struct GraphBatch {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

impl GraphBatch {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.connections.is_empty()
    }
}

/// In-memory workflow graph
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    nodes: Vec<Node>,
    /// id -> index into `nodes`
    index: HashMap<String, usize>,
    connections: Vec<Connection>,
    /// parent agent id -> ids of nodes whose `parent_agent_id` points at it
    children: HashMap<String, Vec<String>>,
}

impl WorkflowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => None,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn connection(&self, id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn has_edge(&self, source_id: &str, target_id: &str) -> bool {
        self.connections
            .iter()
            .any(|c| c.source_id == source_id && c.target_id == target_id)
    }

    /// Ids of nodes owned by `parent_id` through their back-reference
    pub fn children_of(&self, parent_id: &str) -> &[String] {
        self.children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Tool nodes attached to an agent by a `tool` connection
    pub fn tools_of(&self, agent_id: &str) -> Vec<&Node> {
        self.connections
            .iter()
            .filter(|c| c.connection_type == ConnectionType::Tool && c.target_id == agent_id)
            .filter_map(|c| self.node(&c.source_id))
            .filter(|n| n.is_tool())
            .collect()
    }

    /// Agent nodes a tool is attached to by a `tool` connection
    pub fn agents_of(&self, tool_id: &str) -> Vec<&Node> {
        if !self.node(tool_id).is_some_and(Node::is_tool) {
            return Vec::new();
        }
        self.connections
            .iter()
            .filter(|c| c.connection_type == ConnectionType::Tool && c.source_id == tool_id)
            .filter_map(|c| self.node(&c.target_id))
            .filter(|n| n.is_agent())
            .collect()
    }

    /// Items attached to a knowledge node (empty for any other node)
    pub fn knowledge_items(&self, knowledge_id: &str) -> &[KnowledgeItem] {
        match self.node(knowledge_id).map(|n| &n.kind) {
            Some(NodeKind::Knowledge(k)) => &k.items,
            _ => &[],
        }
    }

    pub fn knowledge_item_count(&self, knowledge_id: &str) -> usize {
        self.knowledge_items(knowledge_id).len()
    }

    /// Count of nodes of one type
    pub fn count_of(&self, node_type: NodeType) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.node_type() == node_type)
            .count()
    }

    /// Owned children of `parent_id` that are sub-agents
    pub fn sub_agent_count(&self, parent_id: &str) -> usize {
        self.children_of(parent_id)
            .iter()
            .filter(|id| self.node(id).is_some_and(Node::is_agent))
            .count()
    }

    /// Whether a node passes every visibility switch on its ancestor chain.
    ///
    /// Steps are gated by `show_steps`, sub-agents by `show_sub_agents`,
    /// connectors by `show_connectors` and other tools by `show_tools` of the
    /// owning agent; a hidden owner hides everything below it.
    pub fn is_visible(&self, id: &str) -> bool {
        let mut current = match self.node(id) {
            Some(node) => node,
            None => return false,
        };

        // A well-formed ownership chain is never longer than the graph.
        for _ in 0..self.nodes.len() {
            let parent = match current.parent_agent_id().and_then(|p| self.node(p)) {
                Some(parent) => parent,
                None => return true,
            };
            let Some(agent) = parent.as_agent() else {
                return true;
            };
            let vis = agent.visibility;
            let shown = match &current.kind {
                NodeKind::Step(_) => vis.show_steps,
                NodeKind::Agent(_) => vis.show_sub_agents,
                NodeKind::Tool(t) if t.is_connector() => vis.show_connectors,
                NodeKind::Tool(_) => vis.show_tools,
                _ => true,
            };
            if !shown {
                return false;
            }
            current = parent;
        }
        log::warn!("Ownership cycle detected while resolving visibility of {}", id);
        true
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| self.is_visible(&n.id))
    }

    /// Connections whose endpoints are both visible
    pub fn visible_connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections
            .iter()
            .filter(|c| self.is_visible(&c.source_id) && self.is_visible(&c.target_id))
    }

    /// Connections whose source or target does not resolve
    pub fn dangling_connections(&self) -> Vec<&Connection> {
        self.connections
            .iter()
            .filter(|c| !self.contains(&c.source_id) || !self.contains(&c.target_id))
            .collect()
    }

    /// Insert a node; rejects duplicate ids
    pub(crate) fn insert_node(&mut self, node: Node) -> bool {
        if self.contains(&node.id) {
            return false;
        }
        if let Some(parent) = node.parent_agent_id() {
            self.children
                .entry(parent.to_string())
                .or_default()
                .push(node.id.clone());
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub(crate) fn insert_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub(crate) fn remove_connection(&mut self, id: &str) -> Option<Connection> {
        let pos = self.connections.iter().position(|c| c.id == id)?;
        Some(self.connections.remove(pos))
    }

    /// Remove nodes and every connection touching them
    pub(crate) fn remove_nodes(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| !ids.contains(&n.id));
        self.connections
            .retain(|c| !ids.contains(&c.source_id) && !ids.contains(&c.target_id));

        for id in ids {
            self.children.remove(id);
        }
        for owned in self.children.values_mut() {
            owned.retain(|child| !ids.contains(child));
        }
        self.children.retain(|_, owned| !owned.is_empty());

        self.reindex();
        before - self.nodes.len()
    }

    /// Insert a batch all-or-nothing.
    ///
    /// Fails without touching the graph if any id collides or any connection
    /// endpoint resolves neither in the graph nor in the batch.
    pub(crate) fn commit(&mut self, batch: GraphBatch) -> Result<usize, CanvasError> {
        let mut batch_ids = HashSet::new();
        for node in &batch.nodes {
            if self.contains(&node.id) || !batch_ids.insert(node.id.as_str()) {
                return Err(CanvasError::other(format!("Duplicate node id: {}", node.id)));
            }
        }
        for conn in &batch.connections {
            for endpoint in [&conn.source_id, &conn.target_id] {
                if !self.contains(endpoint) && !batch_ids.contains(endpoint.as_str()) {
                    return Err(CanvasError::NodeNotFound(endpoint.clone()));
                }
            }
        }

        let count = batch.nodes.len();
        for node in batch.nodes {
            self.insert_node(node);
        }
        for conn in batch.connections {
            self.insert_connection(conn);
        }
        Ok(count)
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }
}
