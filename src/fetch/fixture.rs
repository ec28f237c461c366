// src/fetch/fixture.rs
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{remaining, Fetch};
use crate::error::RetrievalError;

/// In-memory URL → body map. Lets adapters run against saved pages.
#[derive(Default)]
pub struct FixtureFetcher {
    pages: HashMap<String, Vec<u8>>,
    hits: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    /// URLs requested so far, in call order.
    pub fn requested(&self) -> Vec<String> {
        self.hits.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetch for FixtureFetcher {
    async fn get_bytes(&self, url: &str, deadline: Instant) -> Result<Vec<u8>, RetrievalError> {
        remaining(deadline, url)?;
        if let Ok(mut g) = self.hits.lock() {
            g.push(url.to_string());
        }
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| RetrievalError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}
