// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}
fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}

/// Generative extraction provider settings (`[openai]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            model: default_model(),
            endpoint: default_endpoint(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl OpenAiConfig {
    /// The literal key, or OPENAI_API_KEY when configured as "ENV".
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        let key = if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?
        } else {
            self.api_key.trim().to_string()
        };
        if key.is_empty() {
            anyhow::bail!("OpenAI api key is empty");
        }
        Ok(key)
    }

    pub(crate) fn sanitize(&mut self) {
        if self.model.trim().is_empty() {
            self.model = default_model();
        }
        if self.endpoint.trim().is_empty() {
            self.endpoint = default_endpoint();
        }
        if self.max_tokens == 0 {
            self.max_tokens = default_max_tokens();
        }
    }
}

fn default_wait_budget_ms() -> u64 {
    10_000
}
fn default_settle_ms() -> u64 {
    1_000
}

/// Headless browser service (`[browser]` table). Without an endpoint, rendered fetches are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Base URL of a Browserless instance; "ENV" means: read from BROWSERLESS_URL
    #[serde(default)]
    pub endpoint: Option<String>,
    /// "ENV" means: read from BROWSERLESS_TOKEN
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_wait_budget_ms")]
    pub wait_budget_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            wait_budget_ms: default_wait_budget_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

fn resolve_env(value: Option<&str>, var: &str) -> Option<String> {
    let v = value?.trim();
    if v.eq_ignore_ascii_case("env") {
        env::var(var).ok().filter(|s| !s.trim().is_empty())
    } else if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

impl BrowserConfig {
    pub fn resolve_endpoint(&self) -> Option<String> {
        resolve_env(self.endpoint.as_deref(), "BROWSERLESS_URL")
    }

    pub fn resolve_token(&self) -> Option<String> {
        resolve_env(self.token.as_deref(), "BROWSERLESS_TOKEN")
    }

    pub(crate) fn sanitize(&mut self) {
        if self.wait_budget_ms == 0 {
            self.wait_budget_ms = default_wait_budget_ms();
        }
    }
}
