// src/ingest/providers/finska.rs
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{AdapterError, ExtractionError};
use crate::extract::dom::{extract_calendar_items, CalendarLayout};
use crate::fetch::Fetch;
use crate::ingest::start_time;
use crate::ingest::types::{Event, EventTemplate, ServiceName, SourceAdapter};

pub const NAME: &str = "Finska Ortodoxa Församlingen";
pub const URL: &str = "https://www.ortodox-finsk.se/kalender/";
const LANGUAGE: &str = "Svenska, finska";

const LAYOUT: CalendarLayout = CalendarLayout {
    item: "section.calendar div.calendar-item",
    meta: "div.meta",
    content: "div.calendar-item-content",
    title: "h3",
    location_label: "Plats",
    time_label: "Tid",
};

/// Finnish parish calendar: one static page of calendar items.
pub struct FinskaAdapter {
    fetcher: Arc<dyn Fetch>,
    url: String,
}

impl FinskaAdapter {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self {
            fetcher,
            url: URL.to_string(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }
}

/// Calendar page → events. Titles are Swedish and carried as a localized name.
pub fn parse_calendar(html: &str, url: &str) -> Result<Vec<Event>, ExtractionError> {
    let template = EventTemplate::new(NAME).with_url(url).with_language(LANGUAGE);
    let items = extract_calendar_items(html, &LAYOUT)?;
    Ok(items
        .into_iter()
        .map(|item| {
            let mut ev = template.event(
                item.date,
                item.day_of_week,
                ServiceName::localized("sv", item.title),
            );
            ev.location = item.location;
            ev.time = item.time.as_deref().and_then(start_time);
            ev.occasion = item.occasion;
            ev.notes = item.notes;
            ev
        })
        .collect())
}

#[async_trait]
impl SourceAdapter for FinskaAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, deadline: Instant) -> Result<Vec<Event>, AdapterError> {
        let html = self.fetcher.get_text(&self.url, deadline).await?;
        Ok(parse_calendar(&html, &self.url)?)
    }
}
