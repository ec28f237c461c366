// src/ingest/providers/ryska.rs
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AdapterError, ExtractionError};
use crate::extract::generative::entries_to_events;
use crate::extract::text::{extract_schedule_text, TextWindow};
use crate::extract::GenerativeExtractor;
use crate::fetch::Fetch;
use crate::ingest::types::{Event, EventTemplate, SourceAdapter};

pub const NAME: &str = "Kristi Förklarings Ortodoxa Församling";
pub const URL: &str = "https://www.ryskaortodoxakyrkan.se/gudstjänst";
const LOCATION: &str = "Stockholm, Birger Jarlsgatan 98";
const LANGUAGE: &str = "Kyrkoslaviska, svenska";

const END_MARKERS: &[&str] = &["bottom of page", "KRISTI FÖRKLARINGS"];

/// Russian parish: the schedule is loose prose in a site-builder page, so the cleaned
/// text goes through generative extraction.
pub struct RyskaAdapter {
    fetcher: Arc<dyn Fetch>,
    extractor: Arc<dyn GenerativeExtractor>,
}

impl RyskaAdapter {
    pub fn new(fetcher: Arc<dyn Fetch>, extractor: Arc<dyn GenerativeExtractor>) -> Self {
        Self { fetcher, extractor }
    }
}

/// The schedule part of the page as plain text, one day per line.
pub fn schedule_text(html: &str) -> String {
    extract_schedule_text(html, &TextWindow::month_schedule(END_MARKERS))
}

#[async_trait]
impl SourceAdapter for RyskaAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, deadline: Instant) -> Result<Vec<Event>, AdapterError> {
        let html = self.fetcher.get_text(URL, deadline).await?;
        let text = schedule_text(&html);
        if text.is_empty() {
            return Err(ExtractionError::MarkupMismatch("page has no text content".into()).into());
        }

        let entries = self.extractor.extract_from_text(&text, deadline).await?;
        let template = EventTemplate::new(NAME)
            .with_url(URL)
            .with_location(LOCATION)
            .with_language(LANGUAGE);
        Ok(entries_to_events(&entries, &template))
    }
}
