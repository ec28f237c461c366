// tests/common/mod.rs
// Shared fakes for adapter and registry tests. Not every test file uses every helper.
#![allow(dead_code)]

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ortodoxa_gudstjanster::error::{AdapterError, ExtractionError, RetrievalError};
use ortodoxa_gudstjanster::extract::{ExtractedEntry, GenerativeExtractor};
use ortodoxa_gudstjanster::fetch::{BrowserRuntime, RenderPlan};
use tokio::time::Instant;

pub fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}"))
        .unwrap_or_else(|e| panic!("missing tests/fixtures/{name}: {e}"))
}

pub fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(10)
}

pub fn entry(date: &str, day: &str, time: &str, name: &str) -> ExtractedEntry {
    ExtractedEntry {
        date: date.to_string(),
        day_of_week: day.to_string(),
        time: Some(time.to_string()),
        service_name: name.to_string(),
        occasion: None,
    }
}

/// Returns canned entries and counts calls. Remembers the last text it was given.
pub struct CountingExtractor {
    pub calls: Arc<AtomicUsize>,
    pub last_text: Arc<Mutex<Option<String>>>,
    entries: Vec<ExtractedEntry>,
    fail: bool,
}

impl CountingExtractor {
    pub fn returning(entries: Vec<ExtractedEntry>) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            last_text: Arc::new(Mutex::new(None)),
            entries,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(Vec::new())
        }
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self) -> Result<Vec<ExtractedEntry>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractionError::Decode("model returned prose".into()).into());
        }
        Ok(self.entries.clone())
    }
}

#[async_trait]
impl GenerativeExtractor for CountingExtractor {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn extract_from_image(
        &self,
        _image: &[u8],
        _deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        self.answer()
    }

    async fn extract_from_text(
        &self,
        text: &str,
        _deadline: Instant,
    ) -> Result<Vec<ExtractedEntry>, AdapterError> {
        *self.last_text.lock().unwrap() = Some(text.to_string());
        self.answer()
    }
}

/// Browser that returns fixed text, or fails as if the element never appeared.
pub struct FakeBrowser {
    pub text: Option<String>,
    pub plans: Mutex<Vec<RenderPlan>>,
}

impl FakeBrowser {
    pub fn rendering(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            plans: Mutex::new(Vec::new()),
        }
    }

    pub fn broken() -> Self {
        Self {
            text: None,
            plans: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BrowserRuntime for FakeBrowser {
    async fn render_text(
        &self,
        plan: &RenderPlan,
        _deadline: Instant,
    ) -> Result<String, RetrievalError> {
        self.plans.lock().unwrap().push(plan.clone());
        self.text.clone().ok_or_else(|| RetrievalError::Browser {
            url: plan.url.clone(),
            message: "waiting for selector `table` failed: timeout exceeded".into(),
        })
    }
}
