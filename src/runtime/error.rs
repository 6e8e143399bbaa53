// SPDX-License-Identifier: MIT

//! Typed error handling for flowcanvas-rs

use thiserror::Error;

/// Top-level error type for flowcanvas-rs
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Non-success response from the agent runtime
    #[error("Runtime error ({status}): {message}")]
    Runtime { status: u16, message: String },

    /// Configuration errors (invalid runtime URL, bad env values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Declarative document could not be imported
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Lookup of a node that is not in the graph
    #[error("Node '{0}' not found")]
    NodeNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while importing a declarative agent document
#[derive(Debug, Error)]
pub enum ImportError {
    /// Top-level `agents` mapping is absent
    #[error("Document has no top-level 'agents' collection")]
    MissingAgents,

    /// `agents` is present but declares nothing
    #[error("Document declares no agents")]
    EmptyDocument,

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl CanvasError {
    /// Create a runtime error from an HTTP status and body
    pub fn runtime(status: u16, message: impl Into<String>) -> Self {
        Self::Runtime {
            status,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for CanvasError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for CanvasError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
