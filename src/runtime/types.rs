// SPDX-License-Identifier: MIT

//! Wire types shared with the agent runtime and the declarative agent format
//!
//! The same `AgentSpec`/`Toolset` shapes are returned by
//! `GET /api/agents/{name}`, read from imported YAML documents and emitted
//! by the config-to-declarative translator.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Name of the entry holding the requested agent in an `AgentConfigDocument`
pub const ROOT_AGENT: &str = "root";

/// Palette entry returned by `GET /api/agents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub multi: bool,
}

/// Response body of `GET /api/agents/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfigDocument {
    #[serde(default)]
    pub agents: BTreeMap<String, AgentSpec>,
}

impl AgentConfigDocument {
    /// The requested agent's own configuration
    pub fn root(&self) -> Option<&AgentSpec> {
        self.agents.get(ROOT_AGENT)
    }
}

/// Declarative configuration of one agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AgentSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub toolsets: Vec<Toolset>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_agents: Vec<String>,
}

/// How a toolset is provided to an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToolsetType {
    /// Named external tool
    Ref,
    /// Platform-provided capability
    Builtin,
    /// External protocol connector
    Mcp,
}

/// Toolset descriptor as declared on an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Toolset {
    /// Raw declared type (`mcp`, `filesystem`, `think`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Command-line arguments; bare numbers and booleans are read as text
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "scalar_strings"
    )]
    pub args: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "scalar_strings"
    )]
    pub tools: Vec<String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "scalar_string_map"
    )]
    pub env: BTreeMap<String, String>,
}

/// Render a YAML/JSON scalar the way it was written; `null` becomes empty
fn scalar_text<E: serde::de::Error>(value: Value) -> Result<String, E> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Tagged(tagged) => scalar_text(tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => {
            Err(E::custom("expected a string, number or boolean"))
        }
    }
}

fn scalar_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(scalar_text)
        .collect()
}

fn scalar_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| Ok((key, scalar_text(value)?)))
        .collect()
}

impl Toolset {
    /// A bare toolset of the given declared type
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            reference: None,
            command: None,
            args: Vec::new(),
            tools: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// A named-reference toolset
    pub fn named(name: impl Into<String>) -> Self {
        let mut toolset = Self::new("ref");
        toolset.reference = Some(name.into());
        toolset
    }

    /// Classify the declared type into routing/visibility groups
    pub fn toolset_type(&self) -> ToolsetType {
        match self.kind.as_str() {
            "mcp" => ToolsetType::Mcp,
            "ref" => ToolsetType::Ref,
            _ if self.reference.is_some() => ToolsetType::Ref,
            _ => ToolsetType::Builtin,
        }
    }

    /// Label shown on the tool node spawned for this toolset
    pub fn display_name(&self) -> &str {
        self.reference
            .as_deref()
            .or(self.tools.first().map(String::as_str))
            .or(self.command.as_deref())
            .unwrap_or(&self.kind)
    }
}

/// One message of a chat request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default)]
    pub role: String,
    pub content: String,
}

/// Body of `POST /api/agents/{name}/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    /// Single-turn, non-streaming request
    pub fn user(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.into(),
            }],
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl ChatResponse {
    /// Content of the first choice, if any
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
