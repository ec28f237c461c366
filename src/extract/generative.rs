// src/extract/generative.rs
//! Generative extraction: a vision/text model turns unstructured schedules into entries.
//! The real provider is OpenAI chat completions; `CachedExtractor` puts the content store
//! in front of any provider so identical inputs are only sent once.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::Instant;

use crate::cache::{checksum, ContentStore, ContentStoreExt};
use crate::config::ai::OpenAiConfig;
use crate::error::{AdapterError, ExtractionError, RetrievalError};
use crate::fetch::{image_media_type, remaining};
use crate::ingest::types::{Event, EventTemplate};
use crate::ingest::{local_today, start_time};

/// One service as the model reports it. Field names are the JSON contract with the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntry {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub day_of_week: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default)]
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occasion: Option<String>,
}

#[async_trait]
pub trait GenerativeExtractor: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &'static str;

    async fn extract_from_image(
        &self,
        image: &[u8],
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError>;

    async fn extract_from_text(
        &self,
        text: &str,
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError>;
}

// ------------------------------------------------------------
// Prompt + output handling
// ------------------------------------------------------------

const FIELDS: &str = "Return a JSON array of services with these fields:
- date: in YYYY-MM-DD format (use year {year} if not specified)
- day_of_week: the day name in Swedish (e.g., \"Måndag\", \"Söndag\")
- time: in HH:MM format (24-hour)
- service_name: the name of the service in Swedish
- occasion: optional, any special occasion or holiday mentioned

Only include entries that have both a date/day and a time specified.
Return ONLY the JSON array, no other text.";

pub fn image_prompt(today: NaiveDate) -> String {
    format!(
        "Extract church service schedule information from this image.\n{}",
        FIELDS.replace("{year}", &today.year().to_string())
    )
}

pub fn text_prompt(today: NaiveDate, text: &str) -> String {
    format!(
        "Extract church service schedule information from the following text. \
         Today is {today}.\n{}\n\nText:\n{text}",
        FIELDS.replace("{year}", &today.year().to_string())
    )
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(content: &str) -> &str {
    let s = content.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

pub fn parse_model_output(content: &str) -> Result<Vec<ExtractedEntry>, ExtractionError> {
    let body = strip_code_fence(content);
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        ExtractionError::Decode(format!("schedule entries: {e} (content: {preview})"))
    })
}

/// Map model entries to events. Entries whose date does not parse are dropped.
pub fn entries_to_events(entries: &[ExtractedEntry], template: &EventTemplate) -> Vec<Event> {
    entries
        .iter()
        .filter_map(|entry| {
            let date = match NaiveDate::parse_from_str(entry.date.trim(), "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => {
                    tracing::debug!(source = %template.source, date = %entry.date, "dropping entry with invalid date");
                    return None;
                }
            };
            let mut ev = template.event(date, entry.day_of_week.trim(), entry.service_name.trim());
            ev.time = entry.time.as_deref().and_then(start_time);
            ev.occasion = entry
                .occasion
                .as_deref()
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from);
            Some(ev)
        })
        .collect()
}

// ------------------------------------------------------------
// OpenAI provider
// ------------------------------------------------------------

/// Chat Completions with image input. Requires a resolved API key.
pub struct OpenAiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
}

impl OpenAiExtractor {
    pub fn new(cfg: &OpenAiConfig, api_key: String) -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .user_agent("ortodoxa-gudstjanster/0.1 (+schedule aggregator)")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RetrievalError::Network {
                url: cfg.endpoint.clone(),
                message: format!("building http client: {e}"),
            })?;
        Ok(Self {
            http,
            api_key,
            model: cfg.model.clone(),
            endpoint: cfg.endpoint.clone(),
            max_tokens: cfg.max_tokens,
        })
    }

    async fn complete(
        &self,
        content: serde_json::Value,
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let url = self.endpoint.as_str();
        let budget = remaining(deadline, url)?;
        let req = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.max_tokens,
        });

        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .timeout(budget)
            .json(&req)
            .send()
            .await
            .map_err(|e| RetrievalError::from_reqwest(url, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RetrievalError::from_reqwest(url, e))?;
        if !status.is_success() {
            return Err(ExtractionError::ExternalService {
                status: status.as_u16(),
                message: body.chars().take(300).collect(),
            }
            .into());
        }

        let parsed: Resp =
            serde_json::from_str(&body).map_err(|e| ExtractionError::Decode(e.to_string()))?;
        let first = parsed
            .choices
            .first()
            .ok_or(ExtractionError::NoMatch { field: "choices" })?;
        Ok(parse_model_output(&first.message.content)?)
    }
}

#[async_trait]
impl GenerativeExtractor for OpenAiExtractor {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn extract_from_image(
        &self,
        image: &[u8],
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let data_url = format!("data:{};base64,{}", image_media_type(image), encoded);
        let content = json!([
            { "type": "text", "text": image_prompt(local_today()) },
            { "type": "image_url", "image_url": { "url": data_url } },
        ]);
        self.complete(content, deadline).await
    }

    async fn extract_from_text(
        &self,
        text: &str,
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        let content = json!(text_prompt(local_today(), text));
        self.complete(content, deadline).await
    }
}

// ------------------------------------------------------------
// Content-store wrapper
// ------------------------------------------------------------

/// Looks up the checksum of the exact input before calling `inner`, and records
/// successful results under it. Store failures never fail the extraction.
pub struct CachedExtractor<E: GenerativeExtractor> {
    inner: E,
    store: std::sync::Arc<dyn ContentStore>,
}

impl<E: GenerativeExtractor> CachedExtractor<E> {
    pub fn new(inner: E, store: std::sync::Arc<dyn ContentStore>) -> Self {
        Self { inner, store }
    }

    fn remember(&self, key: &str, entries: &[ExtractedEntry]) {
        if let Err(e) = self.store.set_json(key, entries) {
            tracing::warn!(key, error = %e, "failed to store extraction result");
        }
    }
}

#[async_trait]
impl<E: GenerativeExtractor> GenerativeExtractor for CachedExtractor<E> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn extract_from_image(
        &self,
        image: &[u8],
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        let key = checksum(image);
        if let Some(hit) = self.store.get_json::<Vec<ExtractedEntry>>(&key) {
            tracing::debug!(key, "extraction served from store");
            return Ok(hit);
        }
        let fresh = self.inner.extract_from_image(image, deadline).await?;
        self.remember(&key, &fresh);
        Ok(fresh)
    }

    async fn extract_from_text(
        &self,
        text: &str,
        deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        let key = checksum(text.as_bytes());
        if let Some(hit) = self.store.get_json::<Vec<ExtractedEntry>>(&key) {
            tracing::debug!(key, "extraction served from store");
            return Ok(hit);
        }
        let fresh = self.inner.extract_from_text(text, deadline).await?;
        self.remember(&key, &fresh);
        Ok(fresh)
    }
}
