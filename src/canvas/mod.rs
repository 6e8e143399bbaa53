// SPDX-License-Identifier: MIT

//! Editor core: graph model, geometry, auto-layout, mutations and translators

pub mod config;
pub mod engine;
pub mod geometry;
pub mod graph;
pub mod layout;
pub mod translate;

pub use config::EditorConfig;
pub use engine::{AddOutcome, Editor};
pub use graph::WorkflowGraph;
