use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;

use crate::web::models::{ChatRequest, ChatResponse, Template};

/// The two calls the conversation client makes against the server.
#[async_trait]
pub trait ReplyTransport: Send + Sync {
    async fn generate(&self, req: &ChatRequest) -> Result<ChatResponse>;
    async fn templates(&self) -> Result<Vec<Template>>;
}

// A wrapper for the ai-interface server API
pub struct HttpTransport {
    server_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        info!("Using ai-interface server at: {}", server_url);

        Self {
            server_url,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ReplyTransport for HttpTransport {
    async fn generate(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/models", self.server_url);
        debug!("Sending {} message(s) to {}", req.messages.len(), url);

        let response = self.client.post(&url).json(req).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("API request failed ({}): {}", status, error_text));
        }

        Ok(response.json().await?)
    }

    async fn templates(&self) -> Result<Vec<Template>> {
        let url = format!("{}/api/templates", self.server_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Template request failed ({}): {}", status, error_text));
        }

        Ok(response.json().await?)
    }
}
