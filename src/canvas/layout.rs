// SPDX-License-Identifier: MIT

//! Grid placement of generated child nodes
//!
//! Tools, sub-agents and steps are tiled below their owning agent. Under an
//! agent the sub-agent rows come first and the tool grid starts below them.
//! Positions depend only on the parent position, the child's ordinal and the
//! sub-agent count, so the same inputs always give the same coordinates.

use crate::canvas::config::LayoutConfig;
use crate::canvas::graph::types::Position;

/// Grid shape for one kind of generated child
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutProfile {
    pub columns: usize,
    pub spacing_x: f64,
    pub spacing_y: f64,
    /// Distance from the parent's y to the first row
    pub start_offset_y: f64,
}

impl LayoutProfile {
    /// Two-column grid with the standard 250 x 140 spacing
    pub const fn grid(start_offset_y: f64) -> Self {
        Self {
            columns: 2,
            spacing_x: 250.0,
            spacing_y: 140.0,
            start_offset_y,
        }
    }

    /// Single vertical chain
    pub const fn column(start_offset_y: f64) -> Self {
        Self {
            columns: 1,
            spacing_x: 250.0,
            spacing_y: 140.0,
            start_offset_y,
        }
    }

    /// Number of rows `count` children occupy
    pub fn rows_for(&self, count: usize) -> usize {
        let columns = self.columns.max(1);
        count.div_ceil(columns)
    }

    /// Vertical space taken by `count` children
    pub fn height_of(&self, count: usize) -> f64 {
        self.rows_for(count) as f64 * self.spacing_y
    }
}

/// Absolute position of the `index`-th child in a grid under `parent`.
///
/// `row = index / columns`, `col = index % columns`; the grid is centred on
/// the parent's x and starts `start_offset_y + extra_offset_y` below it.
pub fn grid_position(
    parent: Position,
    index: usize,
    profile: &LayoutProfile,
    extra_offset_y: f64,
) -> Position {
    let columns = profile.columns.max(1);
    let row = index / columns;
    let col = index % columns;
    let centering = (columns - 1) as f64 * profile.spacing_x / 2.0;

    Position::new(
        parent.x + col as f64 * profile.spacing_x - centering,
        parent.y + profile.start_offset_y + extra_offset_y + row as f64 * profile.spacing_y,
    )
}

/// Position of the `tool_index`-th tool under an agent owning
/// `sub_agent_count` sub-agents; the tool grid starts below their rows.
pub fn tool_position(
    layout: &LayoutConfig,
    parent: Position,
    tool_index: usize,
    sub_agent_count: usize,
) -> Position {
    let shift = layout.sub_agents.height_of(sub_agent_count);
    grid_position(parent, tool_index, &layout.tools, shift)
}

/// Position of the `sub_agent_index`-th sub-agent, always in the first rows
pub fn sub_agent_position(
    layout: &LayoutConfig,
    parent: Position,
    sub_agent_index: usize,
) -> Position {
    grid_position(parent, sub_agent_index, &layout.sub_agents, 0.0)
}

/// Position of the `step_index`-th step in an agent's vertical chain
pub fn step_position(layout: &LayoutConfig, parent: Position, step_index: usize) -> Position {
    grid_position(parent, step_index, &layout.steps, 0.0)
}
