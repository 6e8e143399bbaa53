// SPDX-License-Identifier: MIT

//! Boundary to the external HTTP agent runtime
//!
//! The editor never executes agents itself; it lists them, fetches their
//! declarative configuration and forwards a single chat request. Everything
//! behind these three calls is opaque.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpRuntime;
pub use error::{CanvasError, ImportError};
pub use types::{AgentConfigDocument, AgentSpec, AgentSummary, Toolset, ToolsetType};

use async_trait::async_trait;

/// Operations the editor consumes from an agent runtime.
///
/// Implemented over HTTP by [`HttpRuntime`]; tests provide in-memory fakes.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// List the agents available for the palette
    async fn list_agents(&self) -> Result<Vec<AgentSummary>, CanvasError>;

    /// Fetch the declarative configuration of one agent
    async fn agent_config(&self, name: &str) -> Result<AgentConfigDocument, CanvasError>;

    /// Send a single user prompt to an agent and return the reply text
    async fn chat(&self, name: &str, prompt: &str) -> Result<String, CanvasError>;
}

/// Populate the agent palette.
///
/// A failing runtime yields an empty palette; the failure is only logged.
pub async fn load_palette(runtime: &dyn AgentRuntime) -> Vec<AgentSummary> {
    match runtime.list_agents().await {
        Ok(agents) => {
            log::info!("Loaded {} agents into the palette", agents.len());
            agents
        }
        Err(e) => {
            log::warn!("Failed to load agent palette: {}", e);
            Vec::new()
        }
    }
}
