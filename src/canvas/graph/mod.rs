// SPDX-License-Identifier: MIT

//! Workflow graph data model
//!
//! Flat node and connection collections with a parent -> children index kept
//! in step with each node's `parent_agent_id` back-reference.

pub mod model;
pub mod types;

pub use model::{GraphBatch, WorkflowGraph};
pub use types::{
    AgentData, Connection, ConnectionType, KnowledgeItem, Node, NodeKind, NodeTemplate, NodeType,
    Position, Visibility, VisibilityFlag,
};
