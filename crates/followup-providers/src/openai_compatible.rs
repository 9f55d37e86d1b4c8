//! OpenAI-compatible chat completions composer.
//!
//! One struct covers every endpoint that speaks the OpenAI dialect; providers
//! differ only by base URL and API key.

use async_trait::async_trait;
use followup_core::config::ComposerConfig;
use followup_core::error::{FollowUpError, Result};
use followup_core::traits::MessageComposer;
use followup_core::types::{ContextTag, Prospect};
use serde_json::{Value, json};

use crate::prompt::{SYSTEM_PROMPT, user_prompt};

pub struct OpenAiComposer {
    /// Provider name (e.g., "groq", "openai").
    name: String,
    api_key: String,
    /// Base URL without trailing slash (e.g., "https://api.groq.com/openai/v1").
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiComposer {
    pub fn new(name: &str, base_url: String, config: &ComposerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.to_string(),
            api_key: config.api_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        }
    }

    /// Local endpoints (ollama) accept unauthenticated requests.
    fn requires_key(&self) -> bool {
        self.name != "ollama"
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            req
        } else {
            req.header("Authorization", format!("Bearer {}", self.api_key))
        }
    }
}

#[async_trait]
impl MessageComposer for OpenAiComposer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn compose(&self, prospect: &Prospect, tag: &ContextTag) -> Result<String> {
        if self.requires_key() && self.api_key.is_empty() {
            return Err(FollowUpError::Composer(format!("{}: API key missing", self.name)));
        }

        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt(prospect, tag) },
            ],
        });

        let url = format!("{}/chat/completions", self.base_url);
        let req = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body);
        let resp = self.apply_auth(req).send().await.map_err(|e| {
            FollowUpError::Http(format!("{} connection failed ({}): {}", self.name, url, e))
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(FollowUpError::Composer(format!(
                "{} API error {}: {}",
                self.name, status, text
            )));
        }

        let json: Value = resp
            .json()
            .await
            .map_err(|e| FollowUpError::Http(e.to_string()))?;

        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| FollowUpError::Composer(format!("{}: empty completion", self.name)))?;

        tracing::debug!(
            "✍️ {} composed {} chars for prospect {} ({})",
            self.name,
            content.len(),
            prospect.id,
            tag
        );
        Ok(content.to_string())
    }
}
