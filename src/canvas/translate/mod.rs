// SPDX-License-Identifier: MIT

//! Conversions between the graph and external documents
//!
//! - `export`: JSON workflow document (`{nodes, connections, version, timestamp}`)
//! - `import`: declarative YAML agent configuration into a graph batch
//! - `declarative`: one agent node back into declarative YAML

pub mod declarative;
pub mod export;
pub mod import;
pub mod instructions;

pub use declarative::to_declarative;
pub use export::{document_schema, export_document, WorkflowDocument, DOCUMENT_VERSION};
pub use import::{declarative_batch, ImportSummary};
