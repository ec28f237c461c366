// src/ingest/providers/heliga_anna.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::time::Instant;

use crate::error::{AdapterError, ExtractionError};
use crate::extract::dom::{list_items_under_heading, parse_weekday_line};
use crate::fetch::Fetch;
use crate::ingest::local_today;
use crate::ingest::types::{Event, EventTemplate, SourceAdapter};

pub const NAME: &str = "Heliga Anna av Novgorod";
pub const URL: &str = "https://heligaanna.nu/gudstjanster/";
const LOCATION: &str = "Stockholm, Kyrkvägen 27, Stocksund";

const CONTAINER: &str = ".elementor-widget-text-editor";
const HEADING: &str = "Stockholm";

/// Parish page listing upcoming services as "Söndag 8/2 kl. 09:00. Liturgi." list items,
/// grouped by city. Only the Stockholm group is read.
pub struct HeligaAnnaAdapter {
    fetcher: Arc<dyn Fetch>,
}

impl HeligaAnnaAdapter {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }
}

pub fn parse_schedule(html: &str, today: NaiveDate) -> Result<Vec<Event>, ExtractionError> {
    let template = EventTemplate::new(NAME)
        .with_url(URL)
        .with_location(LOCATION);
    let items = list_items_under_heading(html, CONTAINER, HEADING)?;
    if items.is_empty() {
        tracing::debug!(source = NAME, "no list items under the {HEADING} heading");
    }

    Ok(items
        .iter()
        .filter_map(|text| parse_weekday_line(text, today))
        .map(|line| {
            let mut ev = template.event(line.date, line.day_of_week, line.service_name);
            ev.time = line.time;
            ev.occasion = line.occasion;
            ev
        })
        .collect())
}

#[async_trait]
impl SourceAdapter for HeligaAnnaAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, deadline: Instant) -> Result<Vec<Event>, AdapterError> {
        let html = self.fetcher.get_text(URL, deadline).await?;
        Ok(parse_schedule(&html, local_today())?)
    }
}
