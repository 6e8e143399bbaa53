// SPDX-License-Identifier: MIT

use super::types::{AgentConfigDocument, AgentSummary, ChatRequest, ChatResponse};
use super::{AgentRuntime, CanvasError};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Default address of the agent runtime
pub const DEFAULT_RUNTIME_URL: &str = "http://localhost:8080";

/// HTTP client for the agent runtime's `/api/agents` endpoints
pub struct HttpRuntime {
    client: Client,
    base_url: Url,
}

impl HttpRuntime {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Build a client from a base URL string
    pub fn from_str_url(base_url: &str) -> Result<Self, CanvasError> {
        Ok(Self::new(Url::parse(base_url)?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, CanvasError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CanvasError::config(format!("Invalid runtime URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, CanvasError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        Err(CanvasError::runtime(status.as_u16(), text))
    }
}

#[async_trait]
impl AgentRuntime for HttpRuntime {
    async fn list_agents(&self) -> Result<Vec<AgentSummary>, CanvasError> {
        let url = self.endpoint(&["api", "agents"])?;
        log::debug!("GET {}", url);
        let resp = Self::check(self.client.get(url).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn agent_config(&self, name: &str) -> Result<AgentConfigDocument, CanvasError> {
        let url = self.endpoint(&["api", "agents", name])?;
        log::debug!("GET {}", url);
        let resp = Self::check(self.client.get(url).send().await?).await?;
        Ok(resp.json().await?)
    }

    async fn chat(&self, name: &str, prompt: &str) -> Result<String, CanvasError> {
        let url = self.endpoint(&["api", "agents", name, "chat"])?;
        log::info!("POST {} ({} chars)", url, prompt.len());
        let resp = self
            .client
            .post(url)
            .json(&ChatRequest::user(prompt))
            .send()
            .await?;
        let body: ChatResponse = Self::check(resp).await?.json().await?;
        body.content()
            .map(str::to_string)
            .ok_or_else(|| CanvasError::other("Runtime returned no choices"))
    }
}
