// SPDX-License-Identifier: MIT

//! The workflow "Run" action
//!
//! A run sends the input prompt to the first agent reachable from the input
//! node and writes the answer, or the error text, into the output node. Only
//! one run may be in flight; the guard is cleared on every completion path.

use super::Editor;
use crate::canvas::graph::types::{ConnectionType, NodeKind, OutputData};
use crate::runtime::{AgentRuntime, CanvasError};
use std::collections::{HashSet, VecDeque};

/// A run that passed the guard and still has to call the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub agent_id: String,
    pub agent_name: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(String),
    Failed(String),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

impl Editor {
    pub fn is_executing(&self) -> bool {
        self.is_executing
    }

    /// First agent reached from the input node following `flow` edges,
    /// breadth first in connection order.
    pub fn entry_agent(&self) -> Option<&str> {
        let input = self.config.reserved.input.as_str();
        let mut seen = HashSet::from([input]);
        let mut queue = VecDeque::from([input]);

        while let Some(current) = queue.pop_front() {
            for conn in self.graph.connections() {
                if conn.connection_type != ConnectionType::Flow || conn.source_id != current {
                    continue;
                }
                let target = conn.target_id.as_str();
                if !seen.insert(target) {
                    continue;
                }
                if self.graph.node(target).is_some_and(|n| n.is_agent()) {
                    return Some(target);
                }
                queue.push_back(target);
            }
        }
        None
    }

    /// Start a run: set the executing flag and describe the chat call.
    ///
    /// Returns `None` while another run is in flight, when the prompt is
    /// empty, or when no agent is wired to the input node.
    pub fn begin_run(&mut self) -> Option<RunRequest> {
        if self.is_executing {
            log::debug!("Rejected run: another run is in flight");
            return None;
        }
        let prompt = match self
            .graph
            .node(&self.config.reserved.input)
            .map(|n| &n.kind)
        {
            Some(NodeKind::Input(input)) if !input.prompt.trim().is_empty() => input.prompt.clone(),
            _ => {
                log::debug!("Rejected run: input prompt is empty");
                return None;
            }
        };
        let Some(agent_id) = self.entry_agent().map(str::to_string) else {
            log::debug!("Rejected run: no agent connected to the input node");
            return None;
        };
        let agent_name = self
            .graph
            .node(&agent_id)
            .map(|n| n.label().to_string())
            .unwrap_or_default();

        self.is_executing = true;
        Some(RunRequest {
            agent_id,
            agent_name,
            prompt,
        })
    }

    /// Complete a run with the runtime's answer; always clears the guard
    pub fn finish_run(&mut self, result: Result<String, CanvasError>) -> RunOutcome {
        self.is_executing = false;

        let (outcome, output) = match result {
            Ok(content) => (
                RunOutcome::Completed(content.clone()),
                OutputData {
                    result: Some(content),
                    error: None,
                },
            ),
            Err(e) => {
                let message = e.to_string();
                log::warn!("Workflow run failed: {}", message);
                (
                    RunOutcome::Failed(message.clone()),
                    OutputData {
                        result: None,
                        error: Some(message),
                    },
                )
            }
        };

        let output_id = self.config.reserved.output.clone();
        if let Some(node) = self.graph.node_mut(&output_id) {
            node.kind = NodeKind::Output(output);
        }
        outcome
    }

    /// Run the workflow against `runtime`; `None` when the run was rejected
    pub async fn run(&mut self, runtime: &dyn AgentRuntime) -> Option<RunOutcome> {
        let request = self.begin_run()?;
        log::info!("Running workflow through agent '{}'", request.agent_name);
        let result = runtime.chat(&request.agent_name, &request.prompt).await;
        Some(self.finish_run(result))
    }
}
