use anyhow::Context;
use clap::{Parser, Subcommand};
use flowcanvas_rs::canvas::engine::RunOutcome;
use flowcanvas_rs::canvas::geometry;
use flowcanvas_rs::canvas::graph::types::{NodeTemplate, NodeType, Position};
use flowcanvas_rs::canvas::translate::{document_schema, to_declarative, WorkflowDocument};
use flowcanvas_rs::canvas::{Editor, EditorConfig};
use flowcanvas_rs::runtime::{load_palette, HttpRuntime};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the agents offered by the runtime
    Agents,
    /// Import a declarative agent configuration
    Import {
        /// Path to the YAML configuration
        #[arg(short, long)]
        file: PathBuf,

        /// Where to write the resulting workflow document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Drop an agent on the canvas and expand it from the runtime
    AddAgent {
        /// Agent name as known to the runtime
        #[arg(short, long)]
        name: String,

        /// Existing workflow document to extend
        #[arg(short, long)]
        workflow: Option<PathBuf>,

        #[arg(long, default_value_t = 400.0)]
        x: f64,

        #[arg(long, default_value_t = 200.0)]
        y: f64,

        /// Where to write the resulting workflow document
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print an agent node as declarative YAML
    Declare {
        #[arg(short, long)]
        workflow: PathBuf,

        /// Agent node id
        #[arg(short, long)]
        node: String,
    },
    /// Summarise a workflow document
    Inspect {
        #[arg(short, long)]
        workflow: PathBuf,

        /// Also print the SVG path of every visible connection
        #[arg(long)]
        paths: bool,
    },
    /// Send a prompt through the workflow's entry agent
    Run {
        #[arg(short, long)]
        workflow: PathBuf,

        /// The prompt to send
        #[arg(short, long)]
        prompt: String,
    },
    /// Print the JSON schema of workflow documents
    Schema,
}

fn open_editor(config: EditorConfig, workflow: Option<&Path>) -> anyhow::Result<Editor> {
    let mut editor = Editor::new(config);
    if let Some(path) = workflow {
        let document = WorkflowDocument::load(path)
            .with_context(|| format!("failed to load workflow {}", path.display()))?;
        editor.load_document(document);
    }
    Ok(editor)
}

fn write_document(editor: &Editor, output: Option<&Path>) -> anyhow::Result<()> {
    let document = editor.export();
    match output {
        Some(path) => {
            document.save(path)?;
            log::info!("Wrote workflow document to {}", path.display());
        }
        None => println!("{}", document.to_json()?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = EditorConfig::from_env()?;
    let runtime = HttpRuntime::from_str_url(&config.runtime_url)?;
    log::info!("Using agent runtime at {}", runtime.base_url());

    match args.command {
        Commands::Agents => {
            for agent in load_palette(&runtime).await {
                let kind = if agent.multi { "multi" } else { "single" };
                println!("{:<24} {:<7} {}", agent.name, kind, agent.description);
            }
        }
        Commands::Import { file, output } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let mut editor = Editor::new(config);
            let summary = editor.import_declarative(&content)?;
            eprintln!(
                "Imported {} agents, {} steps, {} tools, {} connections",
                summary.agents, summary.steps, summary.tools, summary.connections
            );
            write_document(&editor, output.as_deref())?;
        }
        Commands::AddAgent {
            name,
            workflow,
            x,
            y,
            output,
        } => {
            let mut editor = open_editor(config, workflow.as_deref())?;
            let id = editor
                .add_node_expanded(&runtime, &NodeTemplate::agent(name), Position::new(x, y))
                .await;
            eprintln!(
                "Added agent {} with {} tools",
                id,
                editor.graph().tools_of(&id).len()
            );
            write_document(&editor, output.as_deref().or(workflow.as_deref()))?;
        }
        Commands::Declare { workflow, node } => {
            let editor = open_editor(config, Some(&workflow))?;
            print!("{}", to_declarative(editor.graph(), &node)?);
        }
        Commands::Inspect { workflow, paths } => {
            let editor = open_editor(config, Some(&workflow))?;
            let graph = editor.graph();
            for node_type in [
                NodeType::Input,
                NodeType::Output,
                NodeType::Agent,
                NodeType::Tool,
                NodeType::Knowledge,
                NodeType::Step,
                NodeType::Condition,
            ] {
                let count = graph.count_of(node_type);
                if count > 0 {
                    println!("{:<10} {}", node_type, count);
                }
            }
            println!("{:<10} {}", "edges", graph.connections().len());
            if let Some(knowledge) = editor.default_node(NodeType::Knowledge) {
                println!("{:<10} {}", "items", graph.knowledge_item_count(&knowledge.id));
            }
            if paths {
                for (id, path) in geometry::route_visible(graph) {
                    println!("{} {}", id, path);
                }
            }
        }
        Commands::Run { workflow, prompt } => {
            let mut editor = open_editor(config, Some(&workflow))?;
            editor.set_input_prompt(prompt);
            let outcome = editor
                .run(&runtime)
                .await
                .context("nothing to run: connect an agent to the input node")?;
            write_document(&editor, Some(&workflow))?;
            match outcome {
                RunOutcome::Completed(content) => println!("{}", content),
                RunOutcome::Failed(message) => anyhow::bail!("run failed: {}", message),
            }
        }
        Commands::Schema => {
            println!("{}", document_schema()?);
        }
    }

    Ok(())
}
