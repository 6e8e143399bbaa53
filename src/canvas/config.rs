// SPDX-License-Identifier: MIT

//! Editor configuration
//!
//! Reserved node identifiers, layout profiles and the runtime address are
//! injected into the [`Editor`](crate::canvas::engine::Editor) through this
//! struct instead of being scattered through the mutation logic.

use crate::canvas::graph::types::{NodeType, Position};
use crate::canvas::layout::LayoutProfile;
use crate::runtime::client::DEFAULT_RUNTIME_URL;
use crate::runtime::CanvasError;
use std::env;
use url::Url;

/// Environment variable overriding the agent runtime address
pub const RUNTIME_URL_ENV: &str = "FLOWCANVAS_RUNTIME_URL";

/// Identifiers of the three permanent nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedIds {
    pub input: String,
    pub output: String,
    pub knowledge: String,
}

impl ReservedIds {
    pub fn contains(&self, id: &str) -> bool {
        id == self.input || id == self.output || id == self.knowledge
    }

    /// Node type the reserved `id` must have, `None` for ordinary ids
    pub fn node_type_of(&self, id: &str) -> Option<NodeType> {
        if id == self.input {
            Some(NodeType::Input)
        } else if id == self.output {
            Some(NodeType::Output)
        } else if id == self.knowledge {
            Some(NodeType::Knowledge)
        } else {
            None
        }
    }
}

impl Default for ReservedIds {
    fn default() -> Self {
        Self {
            input: "input-default".to_string(),
            output: "output-default".to_string(),
            knowledge: "knowledge-default".to_string(),
        }
    }
}

/// Placement of generated and default nodes
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Tool nodes under an agent
    pub tools: LayoutProfile,
    /// Sub-agent nodes under an agent
    pub sub_agents: LayoutProfile,
    /// Step chain under an agent
    pub steps: LayoutProfile,
    /// Horizontal distance from an imported agent to its tool column
    pub import_tool_offset_x: f64,
    /// Position of the first imported agent
    pub import_origin: Position,
    /// Horizontal distance between imported agents
    pub import_agent_spacing_x: f64,
    pub input_position: Position,
    pub output_position: Position,
    pub knowledge_position: Position,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tools: LayoutProfile::grid(200.0),
            sub_agents: LayoutProfile::grid(200.0),
            steps: LayoutProfile::column(200.0),
            import_tool_offset_x: 320.0,
            import_origin: Position::new(400.0, 100.0),
            import_agent_spacing_x: 700.0,
            input_position: Position::new(50.0, 200.0),
            output_position: Position::new(900.0, 200.0),
            knowledge_position: Position::new(50.0, 420.0),
        }
    }
}

/// Complete editor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Base address of the agent runtime
    pub runtime_url: String,
    pub reserved: ReservedIds,
    pub layout: LayoutConfig,
}

impl EditorConfig {
    /// Load configuration from the environment (and `.env` if present)
    pub fn from_env() -> Result<Self, CanvasError> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Ok(url) = env::var(RUNTIME_URL_ENV) {
            config.runtime_url = url;
        }
        config.validate()?;

        log::debug!("Using agent runtime at {}", config.runtime_url);
        Ok(config)
    }

    /// Check that the configured values are usable
    pub fn validate(&self) -> Result<(), CanvasError> {
        let url = Url::parse(&self.runtime_url)?;
        if url.cannot_be_a_base() {
            return Err(CanvasError::config(format!(
                "Runtime URL cannot be used as a base: {}",
                self.runtime_url
            )));
        }

        let r = &self.reserved;
        if r.input == r.output || r.input == r.knowledge || r.output == r.knowledge {
            return Err(CanvasError::config("Reserved node ids must be distinct"));
        }

        for profile in [&self.layout.tools, &self.layout.sub_agents, &self.layout.steps] {
            if profile.columns == 0 {
                return Err(CanvasError::config("Layout profiles need at least one column"));
            }
        }
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            runtime_url: DEFAULT_RUNTIME_URL.to_string(),
            reserved: ReservedIds::default(),
            layout: LayoutConfig::default(),
        }
    }
}
