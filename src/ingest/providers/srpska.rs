// src/ingest/providers/srpska.rs
//! Serbian parish. The calendar is a client-side app: the page itself only carries a
//! JSON-LD summary, while the weekly schedule lives in a rendered table and in the
//! translation strings of the JS bundle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::config::{AppConfig, BrowserConfig, SrpskaConfig};
use crate::error::{AdapterError, ExtractionError};
use crate::extract::dom::find_script_sources;
use crate::extract::jsonld::{self, OpeningHours};
use crate::extract::recurrence::{
    expand, extract_translation_map, parse_schedule_table, recurring_from_translations,
    RecurringService,
};
use crate::fetch::{resolve_url, BrowserRuntime, Fetch, RenderPlan};
use crate::ingest::local_today;
use crate::ingest::types::{Event, EventTemplate, SourceAdapter};

pub const NAME: &str = "Srpska Pravoslavna Crkva Sveti Sava";
pub const CALENDAR_URL: &str = "https://www.crkvastokholm.se/calendar";
const LOCATION: &str = "Stockholm, Bägerstavägen 68";
const LANGUAGE: &str = "Serbiska, svenska";

const TABLE_SELECTOR: &str = "table";
const MAX_BUNDLES: usize = 5;

/// Published opening hours differ from the configured expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDrift {
    pub current: Vec<OpeningHours>,
    pub expected: Vec<OpeningHours>,
}

pub struct SrpskaAdapter {
    fetcher: Arc<dyn Fetch>,
    browser: Option<Arc<dyn BrowserRuntime>>,
    cfg: SrpskaConfig,
    wait_budget: Duration,
    settle: Duration,
    weeks: u32,
    drift: Mutex<Option<ScheduleDrift>>,
}

impl SrpskaAdapter {
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        browser: Option<Arc<dyn BrowserRuntime>>,
        cfg: &AppConfig,
    ) -> Self {
        Self {
            fetcher,
            browser,
            cfg: cfg.srpska.clone(),
            wait_budget: Duration::from_millis(cfg.browser.wait_budget_ms),
            settle: Duration::from_millis(cfg.browser.settle_ms),
            weeks: cfg.recurrence_weeks,
            drift: Mutex::new(None),
        }
    }

    /// Drift seen on the most recent fetch, if any.
    pub fn last_drift(&self) -> Option<ScheduleDrift> {
        self.drift
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    fn check_drift(&self, html: &str) {
        let drift = match jsonld::extract_opening_hours(html) {
            Ok(current) if !jsonld::schedules_match(&current, &self.cfg.expected) => {
                tracing::warn!(
                    source = NAME,
                    current = %jsonld::format_schedule(&current),
                    expected = %jsonld::format_schedule(&self.cfg.expected),
                    "published opening hours differ from the expected schedule"
                );
                Some(ScheduleDrift {
                    current,
                    expected: self.cfg.expected.clone(),
                })
            }
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(source = NAME, error = %e, "no opening hours on calendar page");
                None
            }
        };
        *self.drift.lock().unwrap_or_else(|p| p.into_inner()) = drift;
    }

    async fn rules_from_bundles(
        &self,
        html: &str,
        deadline: Instant,
    ) -> Result<Vec<RecurringService>, AdapterError> {
        let inline = self.rules_from_source(html);
        if !inline.is_empty() {
            return Ok(inline);
        }

        for src in find_script_sources(html)?.into_iter().take(MAX_BUNDLES) {
            let url = resolve_url(CALENDAR_URL, &src)?;
            let js = match self.fetcher.get_text(&url, deadline).await {
                Ok(js) => js,
                Err(e) => {
                    tracing::debug!(source = NAME, bundle = %url, error = %e, "bundle fetch failed");
                    continue;
                }
            };
            let rules = self.rules_from_source(&js);
            if !rules.is_empty() {
                tracing::debug!(source = NAME, bundle = %url, rules = rules.len(), "schedule from bundle");
                return Ok(rules);
            }
        }
        Err(ExtractionError::NoMatch {
            field: "schedule translations",
        }
        .into())
    }

    fn rules_from_source(&self, source: &str) -> Vec<RecurringService> {
        let map = extract_translation_map(source);
        recurring_from_translations(
            &map,
            &self.cfg.footer_prefix,
            &self.cfg.table_prefix,
            &self.cfg.default_service_name,
        )
    }

    /// Rendered table, then translation strings, then the configured schedule.
    async fn recurring_rules(&self, page: Option<&str>, deadline: Instant) -> Vec<RecurringService> {
        if let Some(browser) = &self.browser {
            let plan = table_plan(self.wait_budget, self.settle);
            match render_schedule_table(browser.as_ref(), &plan, deadline).await {
                Ok(rules) => return rules,
                Err(e) => {
                    tracing::warn!(source = NAME, stage = e.stage(), error = %e, "rendered schedule unavailable")
                }
            }
        }

        if let Some(html) = page {
            match self.rules_from_bundles(html, deadline).await {
                Ok(rules) => return rules,
                Err(e) => {
                    tracing::warn!(source = NAME, stage = e.stage(), error = %e, "bundle schedule unavailable")
                }
            }
        }

        tracing::info!(source = NAME, "using configured schedule");
        jsonld::to_recurring(&self.cfg.expected)
    }
}

/// Navigate, wait for the schedule table, let the client app settle, read the table text.
pub fn table_plan(wait_budget: Duration, settle: Duration) -> RenderPlan {
    RenderPlan::navigate(CALENDAR_URL)
        .wait_visible(TABLE_SELECTOR, wait_budget)
        .settle(settle)
        .text_of(TABLE_SELECTOR)
}

pub fn table_plan_from_config(cfg: &BrowserConfig) -> RenderPlan {
    table_plan(
        Duration::from_millis(cfg.wait_budget_ms),
        Duration::from_millis(cfg.settle_ms),
    )
}

/// Render the schedule table and parse it into weekly rules.
pub async fn render_schedule_table(
    browser: &dyn BrowserRuntime,
    plan: &RenderPlan,
    deadline: Instant,
) -> Result<Vec<RecurringService>, AdapterError> {
    let text = browser.render_text(plan, deadline).await?;
    Ok(parse_schedule_table(&text)?)
}

#[async_trait]
impl SourceAdapter for SrpskaAdapter {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch(&self, deadline: Instant) -> Result<Vec<Event>, AdapterError> {
        let page = match self.fetcher.get_text(CALENDAR_URL, deadline).await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(source = NAME, error = %e, "calendar page unavailable");
                None
            }
        };
        if let Some(html) = page.as_deref() {
            self.check_drift(html);
        }

        let rules = self.recurring_rules(page.as_deref(), deadline).await;
        let template = EventTemplate::new(NAME)
            .with_url(CALENDAR_URL)
            .with_location(LOCATION)
            .with_language(LANGUAGE);
        Ok(expand(&rules, self.weeks, local_today(), &template))
    }
}
