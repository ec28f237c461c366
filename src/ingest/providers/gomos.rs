// src/ingest/providers/gomos.rs
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::cache::{checksum, ContentStore};
use crate::error::{AdapterError, ExtractionError};
use crate::extract::dom::{find_first_link, find_image_urls};
use crate::extract::generative::entries_to_events;
use crate::extract::GenerativeExtractor;
use crate::fetch::{download_image, image_extension, resolve_url, Fetch};
use crate::ingest::dedup_events;
use crate::ingest::types::{Event, EventTemplate, SourceAdapter};

pub const NAME: &str = "St. Georgios Cathedral";
pub const CATEGORY_URL: &str = "https://gomos.se/en/category/schedule/";
const LOCATION: &str = "Stockholm, St. Georgios Cathedral, Birger Jarlsgatan 92";

const POST_LINKS: &str = "article a, .entry-title a, h2 a";
const POST_IMAGES: &str = "article img, .entry-content img, .wp-block-image img";

/// Vision calls in flight at once; the model API is rate limited.
pub const MAX_CONCURRENT_EXTRACTIONS: usize = 2;

/// Greek cathedral: the schedule is published as images inside the latest "schedule" post.
pub struct GomosAdapter {
    fetcher: Arc<dyn Fetch>,
    extractor: Arc<dyn GenerativeExtractor>,
    store: Arc<dyn ContentStore>,
    language: String,
    semaphore: Semaphore,
}

impl GomosAdapter {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        extractor: Arc<dyn GenerativeExtractor>,
        store: Arc<dyn ContentStore>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            language: "sv".to_string(),
            semaphore: Semaphore::new(MAX_CONCURRENT_EXTRACTIONS),
        }
    }

    /// Language used when comparing service names during dedup.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    async fn latest_post_url(&self, deadline: Instant) -> Result<String, AdapterError> {
        let page = self.fetcher.get_text(CATEGORY_URL, deadline).await?;
        let href = find_first_link(&page, POST_LINKS, "schedule")?.ok_or(
            ExtractionError::NoMatch {
                field: "schedule post link",
            },
        )?;
        Ok(resolve_url(CATEGORY_URL, &href)?)
    }

    async fn image_urls(&self, post_url: &str, deadline: Instant) -> Result<Vec<String>, AdapterError> {
        let post = self.fetcher.get_text(post_url, deadline).await?;
        let mut urls = Vec::new();
        for src in find_image_urls(&post, POST_IMAGES)? {
            urls.push(resolve_url(post_url, &src)?);
        }
        Ok(urls)
    }

    async fn process_image(
        &self,
        image_url: &str,
        template: &EventTemplate,
        deadline: Instant,
    ) -> Result<Vec<Event>, AdapterError> {
        let bytes = download_image(self.fetcher.as_ref(), image_url, deadline).await?;
        let key = checksum(&bytes);
        if let Err(e) = self
            .store
            .set_with_extension(&key, image_extension(&bytes), &bytes)
        {
            tracing::warn!(source = NAME, key, error = %e, "failed to archive schedule image");
        }

        let _permit = self.semaphore.acquire().await.map_err(|_| {
            ExtractionError::ExternalService {
                status: 0,
                message: "extraction semaphore closed".to_string(),
            }
        })?;
        let entries = self.extractor.extract_from_image(&bytes, deadline).await?;
        Ok(entries_to_events(&entries, template))
    }
}

#[async_trait]
impl SourceAdapter for GomosAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, deadline: Instant) -> Result<Vec<Event>, AdapterError> {
        let post_url = self.latest_post_url(deadline).await?;
        let images = self.image_urls(&post_url, deadline).await?;
        if images.is_empty() {
            tracing::warn!(source = NAME, post = %post_url, "schedule post has no images");
        }

        let template = EventTemplate::new(NAME)
            .with_url(&post_url)
            .with_location(LOCATION);

        let mut pending = Vec::with_capacity(images.len());
        for url in &images {
            pending.push(self.process_image(url, &template, deadline));
        }
        let results = join_all(pending).await;

        let mut events = Vec::new();
        let mut succeeded = 0usize;
        let mut last_err = None;
        for (url, res) in images.iter().zip(results) {
            match res {
                Ok(found) => {
                    succeeded += 1;
                    events.extend(found);
                }
                Err(e) => {
                    tracing::warn!(source = NAME, image = %url, stage = e.stage(), error = %e, "skipping schedule image");
                    last_err = Some(e);
                }
            }
        }
        // Images present but none extracted: the adapter failed.
        if succeeded == 0 {
            if let Some(e) = last_err {
                return Err(e);
            }
        }
        Ok(dedup_events(events, &self.language))
    }
}
