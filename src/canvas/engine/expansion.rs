// SPDX-License-Identifier: MIT

//! Two-phase agent expansion
//!
//! Dropping an agent creates its shell synchronously. Fetching the agent's
//! configuration is a separate, cancellable step whose result is committed as
//! one batch: tool nodes for every declared toolset and sub-agent nodes for
//! every declared sub-agent, each wired back with a `tool` connection.

use super::Editor;
use crate::canvas::config::LayoutConfig;
use crate::canvas::graph::types::{new_id, AgentData, Connection, Node, NodeKind, Position, ToolData};
use crate::canvas::graph::GraphBatch;
use crate::canvas::layout;
use crate::runtime::types::{AgentConfigDocument, Toolset};
use crate::runtime::AgentRuntime;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Configuration fetch owed to a freshly created agent shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionRequest {
    pub agent_id: String,
    pub agent_name: String,
}

/// Outcome of a configuration fetch; `config` is `None` when it failed
#[derive(Debug, Clone)]
pub struct Expansion {
    pub request: ExpansionRequest,
    pub config: Option<AgentConfigDocument>,
}

impl Expansion {
    pub fn failed(request: ExpansionRequest) -> Self {
        Self {
            request,
            config: None,
        }
    }
}

/// Fetch an agent's configuration; failures are logged and yield an empty expansion
pub async fn expand(runtime: &dyn AgentRuntime, request: ExpansionRequest) -> Expansion {
    match runtime.agent_config(&request.agent_name).await {
        Ok(config) => {
            log::info!(
                "Fetched configuration for agent '{}' ({} entries)",
                request.agent_name,
                config.agents.len()
            );
            Expansion {
                request,
                config: Some(config),
            }
        }
        Err(e) => {
            log::warn!(
                "Failed to fetch configuration for agent '{}': {}",
                request.agent_name,
                e
            );
            Expansion::failed(request)
        }
    }
}

/// Expansion running on the tokio runtime
pub struct ExpansionTask {
    request: ExpansionRequest,
    handle: JoinHandle<Expansion>,
}

impl ExpansionTask {
    /// Start fetching in the background
    pub fn spawn(runtime: Arc<dyn AgentRuntime>, request: ExpansionRequest) -> Self {
        let task_request = request.clone();
        let handle = tokio::spawn(async move { expand(runtime.as_ref(), task_request).await });
        Self { request, handle }
    }

    pub fn request(&self) -> &ExpansionRequest {
        &self.request
    }

    /// Cancel the fetch; a later `join` yields a failed expansion
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the fetch. Cancellation or a panicked task count as failure.
    pub async fn join(self) -> Expansion {
        match self.handle.await {
            Ok(expansion) => expansion,
            Err(e) => {
                if e.is_cancelled() {
                    log::info!("Expansion of agent '{}' cancelled", self.request.agent_name);
                } else {
                    log::error!("Expansion of agent '{}' failed: {}", self.request.agent_name, e);
                }
                Expansion::failed(self.request)
            }
        }
    }
}

/// Tool nodes (and their `tool` connections) for `toolsets` owned by `owner_id`
fn push_tool_nodes(
    layout: &LayoutConfig,
    batch: &mut GraphBatch,
    owner_id: &str,
    owner_pos: Position,
    toolsets: &[Toolset],
    first_index: usize,
    sub_agent_count: usize,
) {
    for (i, toolset) in toolsets.iter().enumerate() {
        let pos = layout::tool_position(layout, owner_pos, first_index + i, sub_agent_count);
        let mut data = ToolData::from_toolset(toolset);
        data.parent_agent_id = Some(owner_id.to_string());

        let node = Node::new(new_id("tool"), pos, NodeKind::Tool(data));
        batch
            .connections
            .push(Connection::tool(node.id.clone(), owner_id));
        batch.nodes.push(node);
    }
}

impl Editor {
    /// Commit a finished expansion.
    ///
    /// Returns the number of nodes added. A failed fetch, a missing `root`
    /// entry or an agent deleted in the meantime leave the graph unchanged.
    pub fn apply_expansion(&mut self, expansion: Expansion) -> usize {
        let Expansion { request, config } = expansion;
        let Some(config) = config else {
            return 0;
        };
        let agent_id = request.agent_id.as_str();
        let Some(agent) = self.graph.node(agent_id).filter(|n| n.is_agent()) else {
            log::warn!("Discarding expansion for removed agent {}", agent_id);
            return 0;
        };
        let Some(root) = config.root() else {
            log::warn!("Configuration of '{}' has no root agent", request.agent_name);
            return 0;
        };

        let layout = &self.config.layout;
        let parent_pos = agent.position;
        let existing_tools = self.owned_tool_ids(agent_id).len();
        let existing_subs = agent.as_agent().map_or(0, |a| a.sub_agents.len());

        let mut batch = GraphBatch::default();
        let mut sub_ids = Vec::new();

        let declared_subs = root.sub_agents.iter().filter_map(|name| {
            let spec = config.agents.get(name);
            if spec.is_none() {
                log::debug!("Sub-agent '{}' is not defined in the configuration", name);
            }
            spec.map(|spec| (name, spec))
        });
        for (i, (name, spec)) in declared_subs.enumerate() {
            let pos = layout::sub_agent_position(layout, parent_pos, existing_subs + i);
            let mut data = AgentData::named(name.clone());
            data.apply_spec(spec);
            data.parent_agent_id = Some(agent_id.to_string());

            let sub = Node::new(new_id("agent"), pos, NodeKind::Agent(data));
            push_tool_nodes(layout, &mut batch, &sub.id, pos, &spec.toolsets, 0, 0);
            batch
                .connections
                .push(Connection::tool(sub.id.clone(), agent_id));
            sub_ids.push(sub.id.clone());
            batch.nodes.push(sub);
        }

        push_tool_nodes(
            layout,
            &mut batch,
            agent_id,
            parent_pos,
            &root.toolsets,
            existing_tools,
            existing_subs + sub_ids.len(),
        );

        let root = root.clone();
        let total_subs = existing_subs + sub_ids.len();
        let added = match self.commit_batch(batch) {
            Ok(added) => added,
            Err(e) => {
                log::error!("Failed to commit expansion of {}: {}", agent_id, e);
                return 0;
            }
        };

        if let Some(agent) = self.agent_mut(agent_id) {
            agent.model = root.model;
            agent.description = root.description;
            agent.instruction = root.instruction;
            agent.toolsets.extend(root.toolsets);
            agent.sub_agents.extend(sub_ids);
        }
        let sub_rows = &self.config.layout.sub_agents;
        if sub_rows.rows_for(existing_subs) != sub_rows.rows_for(total_subs) {
            self.relayout_tools(agent_id);
        }
        log::info!(
            "Expanded agent '{}' with {} nodes",
            request.agent_name,
            added
        );
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::config::EditorConfig;
    use crate::canvas::graph::types::{ConnectionType, NodeTemplate};
    use crate::runtime::types::AgentSpec;
    use crate::runtime::CanvasError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;

    fn config_with(root: AgentSpec, extra: Vec<(&str, AgentSpec)>) -> AgentConfigDocument {
        let mut agents = BTreeMap::new();
        agents.insert("root".to_string(), root);
        for (name, spec) in extra {
            agents.insert(name.to_string(), spec);
        }
        AgentConfigDocument { agents }
    }

    fn shell(editor: &mut Editor) -> ExpansionRequest {
        editor
            .add_node(&NodeTemplate::agent("researcher"), Position::new(400.0, 100.0))
            .expansion
            .unwrap()
    }

    #[test]
    fn test_apply_expansion_spawns_tools() {
        let mut editor = Editor::new(EditorConfig::default());
        let request = shell(&mut editor);
        let root = AgentSpec {
            model: "anthropic/claude".to_string(),
            toolsets: vec![Toolset::new("think"), Toolset::new("mcp"), Toolset::named("web")],
            ..Default::default()
        };
        let added = editor.apply_expansion(Expansion {
            request: request.clone(),
            config: Some(config_with(root, vec![])),
        });
        assert_eq!(added, 3);

        let graph = editor.graph();
        assert_eq!(graph.tools_of(&request.agent_id).len(), 3);
        assert!(graph
            .connections()
            .iter()
            .all(|c| c.connection_type == ConnectionType::Tool && c.target_id == request.agent_id));

        let agent = graph.node(&request.agent_id).unwrap().as_agent().unwrap();
        assert_eq!(agent.model, "anthropic/claude");
        assert_eq!(agent.toolsets.len(), 3);
    }

    #[test]
    fn test_apply_expansion_spawns_sub_agents_above_tools() {
        let mut editor = Editor::new(EditorConfig::default());
        let request = shell(&mut editor);
        let root = AgentSpec {
            toolsets: vec![Toolset::new("think")],
            sub_agents: vec!["helper".to_string(), "undefined".to_string()],
            ..Default::default()
        };
        let helper = AgentSpec {
            toolsets: vec![Toolset::new("filesystem")],
            ..Default::default()
        };
        let added = editor.apply_expansion(Expansion {
            request: request.clone(),
            config: Some(config_with(root, vec![("helper", helper)])),
        });
        // helper + its tool + root tool
        assert_eq!(added, 3);

        let graph = editor.graph();
        let agent = graph.node(&request.agent_id).unwrap();
        let subs = &agent.as_agent().unwrap().sub_agents;
        assert_eq!(subs.len(), 1);
        let sub = graph.node(&subs[0]).unwrap();
        assert_eq!(sub.parent_agent_id(), Some(request.agent_id.as_str()));
        assert_eq!(graph.tools_of(&sub.id).len(), 1);

        let tool = graph.tools_of(&request.agent_id)[0];
        assert!(tool.position.y > sub.position.y);
    }

    #[test]
    fn test_expansion_moves_earlier_tools_below_new_sub_agents() {
        let mut editor = Editor::new(EditorConfig::default());
        let request = shell(&mut editor);
        let agent_id = request.agent_id.clone();
        let mut manual = Vec::new();
        for name in ["a", "b", "c"] {
            let template = NodeTemplate::tool(Toolset::named(name));
            manual.push(editor.attach_child(&agent_id, &template).unwrap());
        }

        let root = AgentSpec {
            toolsets: vec![Toolset::new("think")],
            sub_agents: vec!["one".to_string(), "two".to_string(), "three".to_string()],
            ..Default::default()
        };
        let extra = vec![
            ("one", AgentSpec::default()),
            ("two", AgentSpec::default()),
            ("three", AgentSpec::default()),
        ];
        assert_eq!(
            editor.apply_expansion(Expansion {
                request,
                config: Some(config_with(root, extra)),
            }),
            4
        );

        let graph = editor.graph();
        let subs = &graph.node(&agent_id).unwrap().as_agent().unwrap().sub_agents;
        let tools: Vec<&Node> = graph.tools_of(&agent_id);
        assert_eq!(tools.len(), 4);
        assert_eq!(tools[0].id, manual[0]);

        let lowest_sub = subs
            .iter()
            .map(|id| graph.node(id).unwrap().position.y)
            .fold(f64::MIN, f64::max);
        assert!(tools.iter().all(|t| t.position.y > lowest_sub));

        let mut seen: Vec<Position> = Vec::new();
        for pos in subs
            .iter()
            .map(|id| graph.node(id).unwrap().position)
            .chain(tools.iter().map(|t| t.position))
        {
            assert!(!seen.contains(&pos), "overlap at {:?}", pos);
            seen.push(pos);
        }
    }

    #[test]
    fn test_failed_expansion_leaves_bare_agent() {
        let mut editor = Editor::new(EditorConfig::default());
        let request = shell(&mut editor);
        assert_eq!(editor.apply_expansion(Expansion::failed(request.clone())), 0);

        let graph = editor.graph();
        assert_eq!(graph.nodes().len(), 4);
        assert!(graph.connections().is_empty());
        let agent = graph.node(&request.agent_id).unwrap().as_agent().unwrap();
        assert!(agent.toolsets.is_empty());
    }

    #[test]
    fn test_expansion_for_deleted_agent_is_discarded() {
        let mut editor = Editor::new(EditorConfig::default());
        let request = shell(&mut editor);
        editor.delete_node(&request.agent_id);
        let root = AgentSpec {
            toolsets: vec![Toolset::new("think")],
            ..Default::default()
        };
        let added = editor.apply_expansion(Expansion {
            request,
            config: Some(config_with(root, vec![])),
        });
        assert_eq!(added, 0);
        assert_eq!(editor.graph().nodes().len(), 3);
    }

    struct SlowRuntime;

    #[async_trait]
    impl AgentRuntime for SlowRuntime {
        async fn list_agents(&self) -> Result<Vec<crate::runtime::AgentSummary>, CanvasError> {
            Ok(vec![])
        }

        async fn agent_config(&self, _name: &str) -> Result<AgentConfigDocument, CanvasError> {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(AgentConfigDocument::default())
        }

        async fn chat(&self, _name: &str, _prompt: &str) -> Result<String, CanvasError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_aborted_task_yields_failed_expansion() {
        let mut editor = Editor::new(EditorConfig::default());
        let request = shell(&mut editor);
        let task = ExpansionTask::spawn(Arc::new(SlowRuntime), request.clone());
        assert_eq!(task.request(), &request);
        task.abort();

        let expansion = task.join().await;
        assert!(expansion.config.is_none());
        assert_eq!(editor.apply_expansion(expansion), 0);
    }
}
