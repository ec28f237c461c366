// src/ingest/types.rs
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::AdapterError;

/// Display name of a service: either one string or one label per language code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServiceName {
    Plain(String),
    Localized(BTreeMap<String, String>),
}

impl ServiceName {
    pub fn localized(lang: &str, name: impl Into<String>) -> Self {
        let mut m = BTreeMap::new();
        m.insert(lang.to_string(), name.into());
        ServiceName::Localized(m)
    }

    /// Label in `preferred` language, else any available label.
    pub fn display(&self, preferred: &str) -> &str {
        match self {
            ServiceName::Plain(s) => s,
            ServiceName::Localized(m) => m
                .get(preferred)
                .or_else(|| m.values().next())
                .map(String::as_str)
                .unwrap_or(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ServiceName::Plain(s) => s.trim().is_empty(),
            ServiceName::Localized(m) => m.values().all(|v| v.trim().is_empty()),
        }
    }
}

impl From<&str> for ServiceName {
    fn from(s: &str) -> Self {
        ServiceName::Plain(s.to_string())
    }
}

impl From<String> for ServiceName {
    fn from(s: String) -> Self {
        ServiceName::Plain(s)
    }
}

/// One dated service occurrence. Serialized with the feed's camelCase keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub source: String,
    #[serde(rename = "sourceURL", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub date: NaiveDate,
    /// Weekday label as the source wrote it (not recomputed from `date`).
    pub day_of_week: String,
    pub service_name: ServiceName,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Per-adapter constant fields stamped onto every event it emits.
#[derive(Debug, Clone, Default)]
pub struct EventTemplate {
    pub source: String,
    pub source_url: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
}

impl EventTemplate {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn event(
        &self,
        date: NaiveDate,
        day_of_week: impl Into<String>,
        service_name: impl Into<ServiceName>,
    ) -> Event {
        Event {
            source: self.source.clone(),
            source_url: self.source_url.clone(),
            date,
            day_of_week: day_of_week.into(),
            service_name: service_name.into(),
            location: self.location.clone(),
            time: None,
            occasion: None,
            notes: None,
            language: self.language.clone(),
        }
    }
}

/// One upstream source: retrieval plus extraction behind a stable name.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch and extract this source's events. Must give up by `deadline`.
    async fn fetch(&self, deadline: Instant) -> Result<Vec<Event>, AdapterError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_name_prefers_requested_language() {
        let mut m = BTreeMap::new();
        m.insert("fi".to_string(), "Liturgia".to_string());
        m.insert("sv".to_string(), "Liturgi".to_string());
        let name = ServiceName::Localized(m);
        assert_eq!(name.display("sv"), "Liturgi");
        assert_eq!(name.display("en"), "Liturgia");
        assert_eq!(ServiceName::from("Vesper").display("sv"), "Vesper");
    }

    #[test]
    fn service_name_json_shape_is_untagged() {
        let plain: ServiceName = serde_json::from_str(r#""Liturgi""#).unwrap();
        assert_eq!(plain, ServiceName::Plain("Liturgi".into()));
        let loc: ServiceName = serde_json::from_str(r#"{"sv":"Liturgi"}"#).unwrap();
        assert_eq!(loc, ServiceName::localized("sv", "Liturgi"));
    }

    #[test]
    fn event_serializes_feed_keys() {
        let t = EventTemplate::new("Src")
            .with_url("https://example.se/kalender")
            .with_location("Stockholm");
        let ev = t.event(
            NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            "Söndag",
            "Liturgi",
        );
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["date"], "2026-02-08");
        assert_eq!(v["location"], "Stockholm");
        assert_eq!(v["dayOfWeek"], "Söndag");
        assert_eq!(v["serviceName"], "Liturgi");
        assert_eq!(v["sourceURL"], "https://example.se/kalender");
        assert!(v["time"].is_null());
        assert!(v.get("language").is_none());
    }
}
