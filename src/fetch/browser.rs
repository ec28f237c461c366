// src/fetch/browser.rs
//! Rendered retrieval for pages that build their content client-side.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::Instant;

use super::remaining;
use crate::error::RetrievalError;

/// Navigate, wait for an element to become visible, settle, then read text.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub url: String,
    pub wait_selector: String,
    pub wait_budget: Duration,
    pub settle: Duration,
    pub target_selector: String,
}

impl RenderPlan {
    pub fn navigate(url: &str) -> Self {
        Self {
            url: url.to_string(),
            wait_selector: "body".to_string(),
            wait_budget: Duration::from_secs(10),
            settle: Duration::from_secs(1),
            target_selector: "body".to_string(),
        }
    }

    pub fn wait_visible(mut self, selector: &str, budget: Duration) -> Self {
        self.wait_selector = selector.to_string();
        self.wait_budget = budget;
        self
    }

    pub fn settle(mut self, delay: Duration) -> Self {
        self.settle = delay;
        self
    }

    pub fn text_of(mut self, selector: &str) -> Self {
        self.target_selector = selector.to_string();
        self
    }
}

#[async_trait]
pub trait BrowserRuntime: Send + Sync {
    /// Run `plan` and return the text content of its target element.
    async fn render_text(&self, plan: &RenderPlan, deadline: Instant)
        -> Result<String, RetrievalError>;
}

/// Headless Chrome behind a Browserless `/scrape` endpoint.
pub struct BrowserlessRuntime {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessRuntime {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RetrievalError::Browser {
                url: base_url.to_string(),
                message: format!("building http client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn endpoint(&self) -> String {
        let mut endpoint = format!("{}/scrape", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }
}

/// Request body for the Browserless scrape API. The wait budget never exceeds what the
/// caller's deadline leaves.
pub fn scrape_request_body(plan: &RenderPlan, time_left: Duration) -> serde_json::Value {
    let wait_ms = plan.wait_budget.min(time_left).as_millis() as u64;
    serde_json::json!({
        "url": plan.url,
        "elements": [{ "selector": plan.target_selector }],
        "waitForSelector": {
            "selector": plan.wait_selector,
            "timeout": wait_ms,
            "visible": true,
        },
        "waitForTimeout": plan.settle.as_millis() as u64,
    })
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    data: Vec<ScrapeElement>,
}

#[derive(Debug, Deserialize)]
struct ScrapeElement {
    #[serde(default)]
    results: Vec<ScrapeResult>,
}

#[derive(Debug, Deserialize)]
struct ScrapeResult {
    #[serde(default)]
    text: String,
}

/// Text of the first matched element, or a browser error if nothing matched.
pub fn parse_scrape_response(url: &str, body: &str) -> Result<String, RetrievalError> {
    let parsed: ScrapeResponse = serde_json::from_str(body).map_err(|e| RetrievalError::Browser {
        url: url.to_string(),
        message: format!("decoding scrape response: {e}"),
    })?;
    parsed
        .data
        .into_iter()
        .flat_map(|el| el.results)
        .map(|r| r.text)
        .find(|t| !t.trim().is_empty())
        .ok_or_else(|| RetrievalError::Browser {
            url: url.to_string(),
            message: "target element not found".to_string(),
        })
}

#[async_trait]
impl BrowserRuntime for BrowserlessRuntime {
    async fn render_text(
        &self,
        plan: &RenderPlan,
        deadline: Instant,
    ) -> Result<String, RetrievalError> {
        let time_left = remaining(deadline, &plan.url)?;
        let body = scrape_request_body(plan, time_left);

        tracing::debug!(url = %plan.url, selector = %plan.wait_selector, "rendering page");
        let resp = self
            .client
            .post(self.endpoint())
            .timeout(time_left)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::from_reqwest(&plan.url, e))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| RetrievalError::from_reqwest(&plan.url, e))?;
        if !status.is_success() {
            return Err(RetrievalError::Browser {
                url: plan.url.clone(),
                message: format!("status {}: {}", status.as_u16(), text),
            });
        }
        parse_scrape_response(&plan.url, &text)
    }
}
