// SPDX-License-Identifier: MIT

//! Portable JSON workflow document

use crate::canvas::engine::Editor;
use crate::canvas::graph::types::{Connection, Node};
use crate::canvas::graph::WorkflowGraph;
use crate::runtime::CanvasError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DOCUMENT_VERSION: &str = "1.0";

/// Snapshot of the whole graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowDocument {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub version: String,
    /// RFC 3339 export time
    pub timestamp: String,
}

impl WorkflowDocument {
    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self, CanvasError> {
        let doc: WorkflowDocument = serde_json::from_str(content)?;
        if doc.version != DOCUMENT_VERSION {
            log::warn!(
                "Loading workflow document version {} (expected {})",
                doc.version,
                DOCUMENT_VERSION
            );
        }
        Ok(doc)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CanvasError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CanvasError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Serialize the graph verbatim; no validation
pub fn export_document(graph: &WorkflowGraph) -> WorkflowDocument {
    WorkflowDocument {
        nodes: graph.nodes().to_vec(),
        connections: graph.connections().to_vec(),
        version: DOCUMENT_VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// JSON Schema of [`WorkflowDocument`]
pub fn document_schema() -> Result<String, CanvasError> {
    let schema = schemars::schema_for!(WorkflowDocument);
    Ok(serde_json::to_string_pretty(&schema)?)
}

impl Editor {
    pub fn export(&self) -> WorkflowDocument {
        export_document(self.graph())
    }

    /// Replace the current graph with a loaded document
    pub fn load_document(&mut self, document: WorkflowDocument) {
        log::info!(
            "Loading workflow document with {} nodes and {} connections",
            document.nodes.len(),
            document.connections.len()
        );
        self.replace_graph(document.nodes, document.connections);
    }
}
