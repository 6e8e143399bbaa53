//! Integration tests for the editor engine
//!
//! These tests drive the public API end to end against an in-memory agent runtime.

use async_trait::async_trait;
use flowcanvas_rs::canvas::engine::{ExpansionTask, RunOutcome};
use flowcanvas_rs::canvas::geometry;
use flowcanvas_rs::canvas::graph::types::{
    ConnectionType, NodeKind, NodeTemplate, NodeType, Position, VisibilityFlag,
};
use flowcanvas_rs::canvas::layout;
use flowcanvas_rs::canvas::translate::WorkflowDocument;
use flowcanvas_rs::canvas::{Editor, EditorConfig};
use flowcanvas_rs::runtime::{
    load_palette, AgentConfigDocument, AgentRuntime, AgentSpec, AgentSummary, CanvasError, Toolset,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// Mock Components
// ============================================================================

/// Runtime serving canned configurations and replies
#[derive(Default)]
struct MockRuntime {
    configs: HashMap<String, AgentConfigDocument>,
    reply: Option<String>,
    offline: bool,
    config_calls: AtomicUsize,
}

impl MockRuntime {
    fn offline() -> Self {
        Self {
            offline: true,
            ..Default::default()
        }
    }

    fn with_agent(mut self, name: &str, root: AgentSpec) -> Self {
        let mut agents = BTreeMap::new();
        agents.insert("root".to_string(), root);
        self.configs
            .insert(name.to_string(), AgentConfigDocument { agents });
        self
    }

    fn with_reply(mut self, reply: &str) -> Self {
        self.reply = Some(reply.to_string());
        self
    }
}

#[async_trait]
impl AgentRuntime for MockRuntime {
    async fn list_agents(&self) -> Result<Vec<AgentSummary>, CanvasError> {
        if self.offline {
            return Err(CanvasError::runtime(503, "unavailable"));
        }
        let mut agents: Vec<AgentSummary> = self
            .configs
            .keys()
            .map(|name| AgentSummary {
                name: name.clone(),
                description: String::new(),
                multi: false,
            })
            .collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents)
    }

    async fn agent_config(&self, name: &str) -> Result<AgentConfigDocument, CanvasError> {
        self.config_calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(CanvasError::runtime(503, "unavailable"));
        }
        self.configs
            .get(name)
            .cloned()
            .ok_or_else(|| CanvasError::runtime(404, format!("agent '{}' not found", name)))
    }

    async fn chat(&self, name: &str, _prompt: &str) -> Result<String, CanvasError> {
        match &self.reply {
            Some(reply) if !self.offline => Ok(reply.clone()),
            _ => Err(CanvasError::runtime(500, format!("agent '{}' failed", name))),
        }
    }
}

fn researcher_spec() -> AgentSpec {
    let mut gateway = Toolset::new("mcp");
    gateway.command = Some("docker".to_string());
    AgentSpec {
        model: "openai/gpt-4o".to_string(),
        description: "Finds things".to_string(),
        toolsets: vec![Toolset::new("think"), gateway, Toolset::named("web_search")],
        ..Default::default()
    }
}

fn editor() -> Editor {
    Editor::new(EditorConfig::default())
}

fn assert_no_dangling(editor: &Editor) {
    let graph = editor.graph();
    for conn in graph.connections() {
        assert!(graph.contains(&conn.source_id), "dangling source {}", conn.id);
        assert!(graph.contains(&conn.target_id), "dangling target {}", conn.id);
    }
}

// ============================================================================
// Agent expansion
// ============================================================================

#[tokio::test]
async fn test_add_agent_expands_toolsets() {
    let runtime = MockRuntime::default().with_agent("researcher", researcher_spec());
    let mut editor = editor();

    let id = editor
        .add_node_expanded(&runtime, &NodeTemplate::agent("researcher"), Position::new(500.0, 100.0))
        .await;

    let graph = editor.graph();
    let tools = graph.tools_of(&id);
    assert_eq!(tools.len(), 3);
    assert_eq!(graph.connections().len(), 3);
    assert!(graph
        .connections()
        .iter()
        .all(|c| c.connection_type == ConnectionType::Tool && c.target_id == id));

    let positions: HashSet<(u64, u64)> = tools
        .iter()
        .map(|t| (t.position.x.to_bits(), t.position.y.to_bits()))
        .collect();
    assert_eq!(positions.len(), 3);

    let agent = graph.node(&id).unwrap().as_agent().unwrap();
    assert_eq!(agent.model, "openai/gpt-4o");
    assert_eq!(agent.toolsets.len(), 3);
}

#[tokio::test]
async fn test_add_agent_with_failed_fetch_creates_bare_agent() {
    let runtime = MockRuntime::offline();
    let mut editor = editor();
    let before = editor.graph().nodes().len();

    let id = editor
        .add_node_expanded(&runtime, &NodeTemplate::agent("X"), Position::new(10.0, 10.0))
        .await;

    let graph = editor.graph();
    assert_eq!(graph.nodes().len(), before + 1);
    let node = graph.node(&id).unwrap();
    assert_eq!(node.node_type(), NodeType::Agent);
    assert!(node.as_agent().unwrap().toolsets.is_empty());
    assert!(graph.connections().is_empty());
    assert_eq!(runtime.config_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_expansions_are_independent() {
    let runtime: Arc<dyn AgentRuntime> = Arc::new(
        MockRuntime::default()
            .with_agent("researcher", researcher_spec())
            .with_agent(
                "writer",
                AgentSpec {
                    toolsets: vec![Toolset::new("filesystem")],
                    ..Default::default()
                },
            ),
    );
    let mut editor = editor();

    let first = editor.add_node(&NodeTemplate::agent("researcher"), Position::new(300.0, 100.0));
    let second = editor.add_node(&NodeTemplate::agent("writer"), Position::new(900.0, 100.0));
    // both shells exist before any fetch resolves
    assert_eq!(editor.graph().count_of(NodeType::Agent), 2);

    let task_a = ExpansionTask::spawn(runtime.clone(), first.expansion.unwrap());
    let task_b = ExpansionTask::spawn(runtime.clone(), second.expansion.unwrap());

    // resolve out of order
    editor.apply_expansion(task_b.join().await);
    editor.apply_expansion(task_a.join().await);

    assert_eq!(editor.graph().tools_of(&first.node_id).len(), 3);
    assert_eq!(editor.graph().tools_of(&second.node_id).len(), 1);
    assert_no_dangling(&editor);
}

// ============================================================================
// Graph mutation properties
// ============================================================================

#[test]
fn test_node_ids_are_unique() {
    let mut editor = editor();
    let mut ids = Vec::new();
    for i in 0..5 {
        let agent = editor
            .add_node(&NodeTemplate::agent(format!("a{}", i)), Position::default())
            .node_id;
        for j in 0..3 {
            ids.push(
                editor
                    .attach_child(&agent, &NodeTemplate::tool(Toolset::named(format!("t{}", j))))
                    .unwrap(),
            );
        }
        ids.push(editor.attach_child(&agent, &NodeTemplate::agent("sub")).unwrap());
        ids.push(agent);
    }
    let distinct: HashSet<&String> = ids.iter().collect();
    assert_eq!(distinct.len(), ids.len());

    let graph_ids: HashSet<&str> = editor.graph().nodes().iter().map(|n| n.id.as_str()).collect();
    assert_eq!(graph_ids.len(), editor.graph().nodes().len());
}

#[test]
fn test_cascade_delete_is_complete() {
    let mut editor = editor();
    let root = editor
        .add_node(&NodeTemplate::agent("root"), Position::new(500.0, 100.0))
        .node_id;
    let mut doomed = vec![root.clone()];
    for i in 0..3 {
        let sub = editor
            .attach_child(&root, &NodeTemplate::agent(format!("sub{}", i)))
            .unwrap();
        for kind in ["think", "mcp"] {
            doomed.push(editor.attach_child(&sub, &NodeTemplate::tool(Toolset::new(kind))).unwrap());
        }
        doomed.push(sub);
    }
    let survivor = editor
        .add_node(&NodeTemplate::agent("other"), Position::default())
        .node_id;
    editor.connect("input-default", &root).unwrap();
    editor.connect(&root, &survivor).unwrap();
    editor.connect(&survivor, "output-default").unwrap();

    editor.delete_node(&root);

    let graph = editor.graph();
    for id in &doomed {
        assert!(!graph.contains(id));
        assert!(graph.connections().iter().all(|c| !c.touches(id)));
    }
    assert!(graph.contains(&survivor));
    assert_eq!(graph.connections().len(), 1);
    assert_no_dangling(&editor);
}

#[test]
fn test_reserved_nodes_survive_delete_and_clear() {
    let mut editor = editor();
    editor
        .import_declarative("agents:\n  root:\n    instruction: \"1. Use lookup(x)\"\n")
        .unwrap();
    editor.add_knowledge_item(flowcanvas_rs::canvas::graph::KnowledgeItem::file("a.txt", 3));

    for id in ["input-default", "output-default", "knowledge-default"] {
        assert!(editor.delete_node(id).is_empty());
        assert!(editor.graph().contains(id));
    }

    editor.clear_workflow();
    let mut ids: Vec<&str> = editor.graph().nodes().iter().map(|n| n.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["input-default", "knowledge-default", "output-default"]);
    assert_eq!(editor.graph().knowledge_item_count("knowledge-default"), 0);
    assert!(editor.graph().connections().is_empty());
}

#[test]
fn test_no_dangling_edges_after_mixed_operations() {
    let mut editor = editor();
    let a = editor.add_node(&NodeTemplate::agent("a"), Position::default()).node_id;
    let b = editor.add_node(&NodeTemplate::agent("b"), Position::default()).node_id;
    let flow = editor.connect("input-default", "output-default").unwrap();
    editor.split_flow_edge(&flow, &a);
    let tool = editor
        .attach_child(&b, &NodeTemplate::tool(Toolset::new("think")))
        .unwrap();
    editor.connect(&tool, &a).unwrap();
    let sub = editor.attach_child(&a, &NodeTemplate::agent("s")).unwrap();
    editor.connect(&sub, "output-default");
    assert_no_dangling(&editor);

    editor.delete_node(&b);
    assert_no_dangling(&editor);
    editor.delete_node(&a);
    assert_no_dangling(&editor);
    assert_eq!(editor.graph().nodes().len(), 3);
}

#[test]
fn test_connection_type_inference() {
    let mut editor = editor();
    let agent = editor.add_node(&NodeTemplate::agent("a"), Position::default()).node_id;
    let tool = editor
        .add_node(&NodeTemplate::tool(Toolset::new("think")), Position::default())
        .node_id;

    let attach = editor.connect(&tool, &agent).unwrap();
    let flow = editor.connect("input-default", &agent).unwrap();
    let graph = editor.graph();
    assert_eq!(graph.connection(&attach).unwrap().connection_type, ConnectionType::Tool);
    assert_eq!(graph.connection(&flow).unwrap().connection_type, ConnectionType::Flow);
}

#[test]
fn test_fourth_tool_lands_one_row_and_column_over() {
    let mut editor = editor();
    let agent = editor
        .add_node(&NodeTemplate::agent("a"), Position::new(600.0, 100.0))
        .node_id;
    let first = editor
        .attach_child(&agent, &NodeTemplate::tool(Toolset::new("t0")))
        .unwrap();
    for kind in ["t1", "t2"] {
        editor.attach_child(&agent, &NodeTemplate::tool(Toolset::new(kind))).unwrap();
    }
    let fourth = editor
        .attach_child(&agent, &NodeTemplate::tool(Toolset::new("t3")))
        .unwrap();

    let profile = editor.config().layout.tools;
    let base = editor.graph().node(&first).unwrap().position;
    let pos = editor.graph().node(&fourth).unwrap().position;
    assert_eq!(pos.x - base.x, profile.spacing_x);
    assert_eq!(pos.y - base.y, profile.spacing_y);

    let expected = layout::grid_position(Position::new(600.0, 100.0), 3, &profile, 0.0);
    assert_eq!(pos, expected);
}

#[test]
fn test_sub_agents_added_between_tools_get_their_own_cells() {
    let mut editor = editor();
    let agent = editor
        .add_node(&NodeTemplate::agent("a"), Position::new(500.0, 100.0))
        .node_id;
    let mut children = Vec::new();
    for kind in ["t0", "t1", "t2"] {
        children.push(editor.attach_child(&agent, &NodeTemplate::tool(Toolset::new(kind))).unwrap());
    }
    for name in ["s0", "s1"] {
        children.push(editor.attach_child(&agent, &NodeTemplate::agent(name)).unwrap());
    }
    children.push(editor.attach_child(&agent, &NodeTemplate::tool(Toolset::new("t3"))).unwrap());

    let graph = editor.graph();
    let cells: HashSet<(u64, u64)> = children
        .iter()
        .map(|id| graph.node(id).unwrap().position)
        .map(|p| (p.x.to_bits(), p.y.to_bits()))
        .collect();
    assert_eq!(cells.len(), children.len());

    let (subs, tools): (Vec<_>, Vec<_>) = children
        .iter()
        .map(|id| graph.node(id).unwrap())
        .partition(|n| n.is_agent());
    let sub_rows: HashSet<u64> = subs.iter().map(|n| n.position.y.to_bits()).collect();
    let tool_rows: HashSet<u64> = tools.iter().map(|n| n.position.y.to_bits()).collect();
    assert!(sub_rows.is_disjoint(&tool_rows));
    assert_eq!(tool_rows.len(), 2);
}

#[test]
fn test_hidden_subtrees_are_not_routed() {
    let mut editor = editor();
    let agent = editor
        .add_node(&NodeTemplate::agent("a"), Position::new(400.0, 100.0))
        .node_id;
    editor
        .attach_child(&agent, &NodeTemplate::tool(Toolset::new("mcp")))
        .unwrap();
    editor
        .attach_child(&agent, &NodeTemplate::tool(Toolset::new("think")))
        .unwrap();
    assert_eq!(geometry::route_visible(editor.graph()).len(), 2);

    editor.toggle_visibility(&agent, VisibilityFlag::Connectors);
    let routes = geometry::route_visible(editor.graph());
    assert_eq!(routes.len(), 1);
    assert_eq!(routes, geometry::route_visible(editor.graph()));
    assert_eq!(editor.graph().nodes().len(), 6);
}

// ============================================================================
// Import / export
// ============================================================================

#[test]
fn test_import_numbered_instruction() {
    let yaml = r#"
agents:
  root:
    instruction: "1. Call search_web() to find data\n2. Call summarize() on results"
"#;
    let mut editor = editor();
    let summary = editor.import_declarative(yaml).unwrap();
    assert_eq!((summary.agents, summary.steps, summary.tools), (1, 2, 2));

    let graph = editor.graph();
    let agent = graph.nodes().iter().find(|n| n.is_agent()).unwrap();
    let step = |order: u32| {
        graph
            .nodes()
            .iter()
            .find(|n| matches!(&n.kind, NodeKind::Step(s) if s.order == order))
            .unwrap()
    };
    let tool = |name: &str| {
        graph
            .nodes()
            .iter()
            .find(|n| n.as_tool().is_some_and(|t| t.name == name))
            .unwrap()
    };
    let (step1, step2) = (step(1), step(2));
    let edge = |s: &str, t: &str| {
        graph
            .connections()
            .iter()
            .find(|c| c.source_id == s && c.target_id == t)
            .map(|c| c.connection_type)
    };

    assert_eq!(edge(&agent.id, &step1.id), Some(ConnectionType::Flow));
    assert_eq!(edge(&step1.id, &step2.id), Some(ConnectionType::Flow));
    assert_eq!(edge(&step1.id, &tool("search_web").id), Some(ConnectionType::Tool));
    assert_eq!(edge(&step2.id, &tool("summarize").id), Some(ConnectionType::Tool));
    assert!(step2.position.y > step1.position.y);
}

#[test]
fn test_import_without_agents_is_rejected() {
    let mut editor = editor();
    let err = editor.import_declarative("version: 2\n").unwrap_err();
    assert!(matches!(err, CanvasError::Import(_)));
    assert_eq!(editor.graph().nodes().len(), 3);
}

#[test]
fn test_export_round_trip_is_isomorphic() {
    let yaml = r#"
agents:
  root:
    instruction: |
      1. Fetch with http_get(url)
      2. Store with write_file(path)
    sub_agents: [critic]
  critic:
    description: Reviews the output
"#;
    let mut source = editor();
    source.import_declarative(yaml).unwrap();
    let json = source.export().to_json().unwrap();

    let mut target = editor();
    target.load_document(WorkflowDocument::from_json(&json).unwrap());

    let census = |e: &Editor| {
        let mut types: BTreeMap<&'static str, usize> = BTreeMap::new();
        for n in e.graph().nodes() {
            *types.entry(n.node_type().as_str()).or_default() += 1;
        }
        let mut edges: Vec<(&'static str, &'static str, bool)> = e
            .graph()
            .connections()
            .iter()
            .map(|c| {
                (
                    e.graph().node(&c.source_id).unwrap().node_type().as_str(),
                    e.graph().node(&c.target_id).unwrap().node_type().as_str(),
                    c.connection_type == ConnectionType::Tool,
                )
            })
            .collect();
        edges.sort();
        (types, edges)
    };
    assert_eq!(census(&source), census(&target));
    assert_no_dangling(&target);
}

// ============================================================================
// Runtime boundary
// ============================================================================

#[tokio::test]
async fn test_palette_falls_back_to_empty() {
    assert!(load_palette(&MockRuntime::offline()).await.is_empty());

    let runtime = MockRuntime::default().with_agent("researcher", researcher_spec());
    let palette = load_palette(&runtime).await;
    assert_eq!(palette.len(), 1);
    assert_eq!(palette[0].name, "researcher");
}

#[tokio::test]
async fn test_run_writes_reply_to_output() {
    let runtime = MockRuntime::default().with_reply("All done");
    let mut editor = editor();
    let agent = editor.add_node(&NodeTemplate::agent("a"), Position::default()).node_id;
    editor.connect("input-default", &agent).unwrap();
    editor.set_input_prompt("Go");

    let outcome = editor.run(&runtime).await.unwrap();
    assert_eq!(outcome, RunOutcome::Completed("All done".to_string()));
    assert!(!editor.is_executing());
    match &editor.graph().node("output-default").unwrap().kind {
        NodeKind::Output(out) => assert_eq!(out.result.as_deref(), Some("All done")),
        other => panic!("unexpected output payload {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_run_clears_guard_and_reports_error() {
    let runtime = MockRuntime::offline();
    let mut editor = editor();
    let agent = editor.add_node(&NodeTemplate::agent("a"), Position::default()).node_id;
    editor.connect("input-default", &agent).unwrap();
    editor.set_input_prompt("Go");

    let outcome = editor.run(&runtime).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Failed(ref m) if m.contains("agent 'a' failed")));
    assert!(!editor.is_executing());
    match &editor.graph().node("output-default").unwrap().kind {
        NodeKind::Output(out) => assert!(out.error.as_deref().unwrap().contains("500")),
        other => panic!("unexpected output payload {:?}", other),
    }

    // guard was released, a new run is accepted
    assert!(editor.begin_run().is_some());
}
