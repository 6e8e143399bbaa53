// SPDX-License-Identifier: MIT

//! Node and connection types of the workflow graph
//!
//! A node's payload is a tagged union keyed by its `type`, so fields that only
//! make sense for one kind (a step's order, an agent's toolsets) cannot be set
//! on any other.

use crate::runtime::types::{AgentSpec, Toolset, ToolsetType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

/// Generate a fresh, never reused identifier with a readable prefix
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

/// Canvas coordinate (top-left corner for nodes)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Input,
    Output,
    Agent,
    Tool,
    Knowledge,
    Step,
    Condition,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Input => "input",
            NodeType::Output => "output",
            NodeType::Agent => "agent",
            NodeType::Tool => "tool",
            NodeType::Knowledge => "knowledge",
            NodeType::Step => "step",
            NodeType::Condition => "condition",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A vertex of the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub id: String,
    pub position: Position,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Per-type payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Input(InputData),
    Output(OutputData),
    Agent(AgentData),
    Tool(ToolData),
    Knowledge(KnowledgeData),
    Step(StepData),
    Condition(ConditionData),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InputData {
    #[serde(default)]
    pub prompt: String,
}

/// Result of the last workflow run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentData {
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub toolsets: Vec<Toolset>,
    /// Owning agent when this is a sub-agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<String>,
    /// Child agent node ids, in insertion order
    #[serde(default)]
    pub sub_agents: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepDescriptor>,
    #[serde(default)]
    pub visibility: Visibility,
}

impl AgentData {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Overwrite the declarative fields from a fetched or saved spec
    pub fn apply_spec(&mut self, spec: &AgentSpec) {
        self.model = spec.model.clone();
        self.description = spec.description.clone();
        self.instruction = spec.instruction.clone();
        self.toolsets = spec.toolsets.clone();
    }
}

/// Independent show/hide switches for an agent's dependent subtrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Visibility {
    pub show_tools: bool,
    pub show_connectors: bool,
    pub show_sub_agents: bool,
    pub show_steps: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            show_tools: true,
            show_connectors: true,
            show_sub_agents: true,
            show_steps: true,
        }
    }
}

/// Names one of the [`Visibility`] switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisibilityFlag {
    Tools,
    Connectors,
    SubAgents,
    Steps,
}

impl Visibility {
    pub fn get(&self, flag: VisibilityFlag) -> bool {
        match flag {
            VisibilityFlag::Tools => self.show_tools,
            VisibilityFlag::Connectors => self.show_connectors,
            VisibilityFlag::SubAgents => self.show_sub_agents,
            VisibilityFlag::Steps => self.show_steps,
        }
    }

    /// Flip one switch and return its new value
    pub fn toggle(&mut self, flag: VisibilityFlag) -> bool {
        let slot = match flag {
            VisibilityFlag::Tools => &mut self.show_tools,
            VisibilityFlag::Connectors => &mut self.show_connectors,
            VisibilityFlag::SubAgents => &mut self.show_sub_agents,
            VisibilityFlag::Steps => &mut self.show_steps,
        };
        *slot = !*slot;
        *slot
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToolData {
    pub name: String,
    pub toolset_type: ToolsetType,
    /// Descriptor this node was spawned from, as stored on the owning agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolset: Option<Toolset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<String>,
}

impl ToolData {
    pub fn from_toolset(toolset: &Toolset) -> Self {
        Self {
            name: toolset.display_name().to_string(),
            toolset_type: toolset.toolset_type(),
            toolset: Some(toolset.clone()),
            parent_agent_id: None,
        }
    }

    pub fn is_connector(&self) -> bool {
        self.toolset_type == ToolsetType::Mcp
    }
}

/// One numbered instruction step as recorded on its agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    pub order: u32,
    pub description: String,
    #[serde(default)]
    pub tool_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    pub order: u32,
    pub description: String,
    #[serde(default)]
    pub tool_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeData {
    #[serde(default)]
    pub items: Vec<KnowledgeItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeKind {
    File,
    Url,
}

/// A file or URL shared with every agent through the knowledge node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    pub id: String,
    pub name: String,
    pub kind: KnowledgeKind,
    /// File name or absolute URL
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl KnowledgeItem {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            id: new_id("knowledge-item"),
            location: name.clone(),
            name,
            kind: KnowledgeKind::File,
            size: Some(size),
        }
    }

    /// Reference a URL; relative or malformed URLs are rejected
    pub fn url(location: &str) -> Result<Self, url::ParseError> {
        let parsed = Url::parse(location)?;
        let name = parsed
            .host_str()
            .map(|host| format!("{}{}", host, parsed.path().trim_end_matches('/')))
            .unwrap_or_else(|| parsed.to_string());
        Ok(Self {
            id: new_id("knowledge-item"),
            name,
            kind: KnowledgeKind::Url,
            location: parsed.to_string(),
            size: None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConditionData {
    #[serde(default)]
    pub expression: String,
}

impl Node {
    pub fn new(id: impl Into<String>, position: Position, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            position,
            kind,
        }
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Input(_) => NodeType::Input,
            NodeKind::Output(_) => NodeType::Output,
            NodeKind::Agent(_) => NodeType::Agent,
            NodeKind::Tool(_) => NodeType::Tool,
            NodeKind::Knowledge(_) => NodeType::Knowledge,
            NodeKind::Step(_) => NodeType::Step,
            NodeKind::Condition(_) => NodeType::Condition,
        }
    }

    /// Owning agent for tools, steps and sub-agents
    pub fn parent_agent_id(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Agent(a) => a.parent_agent_id.as_deref(),
            NodeKind::Tool(t) => t.parent_agent_id.as_deref(),
            NodeKind::Step(s) => s.parent_agent_id.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn clear_parent_agent_id(&mut self) {
        match &mut self.kind {
            NodeKind::Agent(a) => a.parent_agent_id = None,
            NodeKind::Tool(t) => t.parent_agent_id = None,
            NodeKind::Step(s) => s.parent_agent_id = None,
            _ => {}
        }
    }

    pub fn as_agent(&self) -> Option<&AgentData> {
        match &self.kind {
            NodeKind::Agent(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_agent_mut(&mut self) -> Option<&mut AgentData> {
        match &mut self.kind {
            NodeKind::Agent(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_tool(&self) -> Option<&ToolData> {
        match &self.kind {
            NodeKind::Tool(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self.kind, NodeKind::Agent(_))
    }

    pub fn is_tool(&self) -> bool {
        matches!(self.kind, NodeKind::Tool(_))
    }

    /// Human-readable label
    pub fn label(&self) -> &str {
        match &self.kind {
            NodeKind::Agent(a) => &a.name,
            NodeKind::Tool(t) => &t.name,
            NodeKind::Step(s) => &s.description,
            _ => self.node_type().as_str(),
        }
    }
}

/// Edge semantics: execution order or capability attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Solid execution-order edge; may be split by dropping an agent on it
    Flow,
    /// Dashed attachment edge
    Tool,
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub connection_type: ConnectionType,
}

impl Connection {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            id: new_id("conn"),
            source_id: source_id.into(),
            target_id: target_id.into(),
            connection_type,
        }
    }

    pub fn flow(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, ConnectionType::Flow)
    }

    pub fn tool(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, ConnectionType::Tool)
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// Palette entry dropped onto the canvas
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTemplate {
    Input,
    Output,
    Knowledge,
    Agent { name: String, description: String },
    Tool { toolset: Toolset },
    Step { order: u32, description: String },
    Condition { expression: String },
}

impl NodeTemplate {
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent {
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn tool(toolset: Toolset) -> Self {
        Self::Tool { toolset }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeTemplate::Input => NodeType::Input,
            NodeTemplate::Output => NodeType::Output,
            NodeTemplate::Knowledge => NodeType::Knowledge,
            NodeTemplate::Agent { .. } => NodeType::Agent,
            NodeTemplate::Tool { .. } => NodeType::Tool,
            NodeTemplate::Step { .. } => NodeType::Step,
            NodeTemplate::Condition { .. } => NodeType::Condition,
        }
    }

    /// Create a node with a fresh id at `position`
    pub fn instantiate(&self, position: Position) -> Node {
        let kind = match self {
            NodeTemplate::Input => NodeKind::Input(InputData::default()),
            NodeTemplate::Output => NodeKind::Output(OutputData::default()),
            NodeTemplate::Knowledge => NodeKind::Knowledge(KnowledgeData::default()),
            NodeTemplate::Agent { name, description } => NodeKind::Agent(AgentData {
                description: description.clone(),
                ..AgentData::named(name.clone())
            }),
            NodeTemplate::Tool { toolset } => NodeKind::Tool(ToolData::from_toolset(toolset)),
            NodeTemplate::Step { order, description } => NodeKind::Step(StepData {
                order: *order,
                description: description.clone(),
                tool_ids: Vec::new(),
                parent_agent_id: None,
            }),
            NodeTemplate::Condition { expression } => NodeKind::Condition(ConditionData {
                expression: expression.clone(),
            }),
        };
        Node::new(new_id(self.node_type().as_str()), position, kind)
    }
}
