// SPDX-License-Identifier: MIT

//! Connection anchors and bezier routing
//!
//! Pure functions of the graph: the same node positions always yield the same
//! path. A connection whose endpoint cannot be resolved is simply not drawn.

use crate::canvas::graph::types::{Connection, ConnectionType, Node, NodeKind, NodeType, Position};
use crate::canvas::graph::WorkflowGraph;
use std::fmt;

// ── Node boxes ──────────────────────────────────────────────────────
const DEFAULT_NODE_SIZE: (f64, f64) = (200.0, 80.0);
const AGENT_NODE_SIZE: (f64, f64) = (240.0, 160.0);
const TOOL_NODE_SIZE: (f64, f64) = (180.0, 60.0);
const STEP_NODE_SIZE: (f64, f64) = (220.0, 70.0);

// ── Attachment sections on an agent's left edge ────────────────────
/// Offset from the agent's top to the first section anchor.
const SECTION_TOP_OFFSET: f64 = 56.0;
/// Vertical distance between consecutive occupied sections.
const SECTION_ROW_HEIGHT: f64 = 32.0;

// ── Curve shape ─────────────────────────────────────────────────────
/// Horizontal pull of attachment-edge control points.
const ATTACHMENT_CURVE_OFFSET: f64 = 60.0;

/// Width and height of a node's box by type
pub fn node_size(node_type: NodeType) -> (f64, f64) {
    match node_type {
        NodeType::Agent => AGENT_NODE_SIZE,
        NodeType::Tool => TOOL_NODE_SIZE,
        NodeType::Step => STEP_NODE_SIZE,
        _ => DEFAULT_NODE_SIZE,
    }
}

/// Attachment section on a parent agent, in stacking order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    SubAgents,
    Tools,
    Connectors,
}

impl Section {
    /// Section a child node is listed under, if it attaches to an agent
    pub fn of(node: &Node) -> Option<Self> {
        match &node.kind {
            NodeKind::Agent(_) => Some(Section::SubAgents),
            NodeKind::Tool(t) if t.is_connector() => Some(Section::Connectors),
            NodeKind::Tool(_) => Some(Section::Tools),
            _ => None,
        }
    }
}

/// Cubic bezier from `start` to `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierPath {
    pub start: Position,
    pub control1: Position,
    pub control2: Position,
    pub end: Position,
}

impl BezierPath {
    /// Horizontal S-curve through the midpoint
    pub fn horizontal(start: Position, end: Position) -> Self {
        let mid_x = (start.x + end.x) / 2.0;
        Self {
            start,
            control1: Position::new(mid_x, start.y),
            control2: Position::new(mid_x, end.y),
            end,
        }
    }

    /// Vertical S-curve through the midpoint
    pub fn vertical(start: Position, end: Position) -> Self {
        let mid_y = (start.y + end.y) / 2.0;
        Self {
            start,
            control1: Position::new(start.x, mid_y),
            control2: Position::new(end.x, mid_y),
            end,
        }
    }

    /// S-curve bowing out to the left of both endpoints
    pub fn attachment(start: Position, end: Position) -> Self {
        Self {
            start,
            control1: Position::new(start.x - ATTACHMENT_CURVE_OFFSET, start.y),
            control2: Position::new(end.x - ATTACHMENT_CURVE_OFFSET, end.y),
            end,
        }
    }

    /// SVG path data (`M x y C c1x c1y, c2x c2y, x y`)
    pub fn to_svg_path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BezierPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

pub fn left_center(node: &Node) -> Position {
    let (_, h) = node_size(node.node_type());
    node.position.offset(0.0, h / 2.0)
}

pub fn right_center(node: &Node) -> Position {
    let (w, h) = node_size(node.node_type());
    node.position.offset(w, h / 2.0)
}

pub fn top_center(node: &Node) -> Position {
    let (w, _) = node_size(node.node_type());
    node.position.offset(w / 2.0, 0.0)
}

pub fn bottom_center(node: &Node) -> Position {
    let (w, h) = node_size(node.node_type());
    node.position.offset(w / 2.0, h)
}

/// Anchor on a parent agent's left edge for a child listed in `section`.
///
/// Sections stack as sub-agents, tools, connectors; every occupied section
/// above `section` pushes the anchor down one row.
pub fn section_anchor(graph: &WorkflowGraph, parent: &Node, section: Section) -> Position {
    let tools = graph.tools_of(&parent.id);
    let has_sub_agents = parent.as_agent().is_some_and(|a| !a.sub_agents.is_empty())
        || graph.sub_agent_count(&parent.id) > 0;
    let occupied = |s: Section| match s {
        Section::SubAgents => has_sub_agents,
        Section::Tools => tools.iter().any(|t| Section::of(t) == Some(Section::Tools)),
        Section::Connectors => tools.iter().any(|t| Section::of(t) == Some(Section::Connectors)),
    };

    let preceding = [Section::SubAgents, Section::Tools, Section::Connectors]
        .into_iter()
        .filter(|s| *s < section && occupied(*s))
        .count();

    parent
        .position
        .offset(0.0, SECTION_TOP_OFFSET + preceding as f64 * SECTION_ROW_HEIGHT)
}

/// Whether an edge attaches a child (tool or sub-agent) to its agent
fn is_attachment(source: &Node, target: &Node, connection_type: ConnectionType) -> bool {
    if !target.is_agent() {
        return false;
    }
    match &source.kind {
        NodeKind::Tool(_) => connection_type == ConnectionType::Tool,
        NodeKind::Agent(a) => a.parent_agent_id.as_deref() == Some(target.id.as_str()),
        _ => false,
    }
}

fn is_sequence(source: &Node, target: &Node) -> bool {
    matches!(source.node_type(), NodeType::Agent | NodeType::Step)
        && target.node_type() == NodeType::Step
}

/// Route an edge between two resolved nodes
pub fn route_between(
    graph: &WorkflowGraph,
    source: &Node,
    target: &Node,
    connection_type: ConnectionType,
) -> BezierPath {
    if is_attachment(source, target, connection_type) {
        let section = Section::of(source).unwrap_or(Section::Tools);
        return BezierPath::attachment(left_center(source), section_anchor(graph, target, section));
    }
    if is_sequence(source, target) {
        return BezierPath::vertical(bottom_center(source), top_center(target));
    }
    BezierPath::horizontal(right_center(source), left_center(target))
}

/// Route a stored connection; `None` when an endpoint is missing
pub fn route(graph: &WorkflowGraph, connection: &Connection) -> Option<BezierPath> {
    let source = graph.node(&connection.source_id)?;
    let target = graph.node(&connection.target_id)?;
    Some(route_between(graph, source, target, connection.connection_type))
}

/// Preview path while a connection is being dragged towards `cursor`
pub fn drag_path(graph: &WorkflowGraph, source_id: &str, cursor: Position) -> Option<BezierPath> {
    let source = graph.node(source_id)?;
    Some(BezierPath::horizontal(right_center(source), cursor))
}

/// Paths for every visible connection, keyed by connection id
pub fn route_visible(graph: &WorkflowGraph) -> Vec<(&str, BezierPath)> {
    graph
        .visible_connections()
        .filter_map(|c| route(graph, c).map(|path| (c.id.as_str(), path)))
        .collect()
}
