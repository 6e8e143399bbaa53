// SPDX-License-Identifier: MIT

//! Graph-editing and layout engine for visual agent-workflow composition.
//!
//! `runtime` is the boundary to the external HTTP agent runtime; `canvas`
//! holds the node/connection model, routing, auto-layout, the mutation engine
//! and the import/export translators.

pub mod canvas;
pub mod runtime;
