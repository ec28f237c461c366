// src/ingest/mod.rs
pub mod providers;
pub mod registry;
pub mod types;

use std::collections::HashSet;

use chrono::NaiveDate;
use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::Event;

/// One-time metrics registration (so series show up once an exporter is installed).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_events_total",
            "Events returned by adapters (fresh or cached)."
        );
        describe_counter!(
            "aggregate_adapter_errors_total",
            "Adapter fetch/extract failures, including deadline overruns."
        );
        describe_counter!(
            "aggregate_cache_hits_total",
            "Adapter results served from the response cache."
        );
        describe_histogram!("aggregate_adapter_ms", "Adapter fetch time in milliseconds.");
        describe_counter!("store_hits_total", "Content store lookups that hit.");
        describe_counter!("store_misses_total", "Content store lookups that missed.");
    });
}

/// Local wall-clock date, time of day truncated.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Lowercase and collapse whitespace runs; used as a comparison key for names.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Extract the start of a free-text time field as zero-padded `HH:MM`.
///
/// Handles `"18:00"`, `"9.30"`, `"1800"`, `"18:00 - 20:00"`, `"1800 - ca 2000"`.
/// Returns `None` when nothing time-like is present (rendered as all-day).
pub fn start_time(raw: &str) -> Option<String> {
    static RE_HM: OnceCell<Regex> = OnceCell::new();
    static RE_COMPACT: OnceCell<Regex> = OnceCell::new();
    let re_hm = RE_HM.get_or_init(|| Regex::new(r"(\d{1,2})[:.](\d{2})").unwrap());
    let re_compact = RE_COMPACT.get_or_init(|| Regex::new(r"^(\d{2})(\d{2})(?:\D|$)").unwrap());

    let head = raw
        .split(" - ")
        .next()
        .unwrap_or_default()
        .split(" – ")
        .next()
        .unwrap_or_default()
        .trim();

    let caps = re_hm
        .captures(head)
        .or_else(|| re_compact.captures(head))?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{hour:02}:{minute:02}"))
}

/// Collapse events sharing (date, time, normalized name), keeping the first.
///
/// Localized names are compared by their `language` label.
pub fn dedup_events(events: Vec<Event>, language: &str) -> Vec<Event> {
    let mut seen: HashSet<(NaiveDate, String, String)> = HashSet::new();
    let mut keep = Vec::with_capacity(events.len());
    for ev in events {
        let key = (
            ev.date,
            ev.time.clone().unwrap_or_default(),
            normalize_name(ev.service_name.display(language)),
        );
        if seen.insert(key) {
            keep.push(ev);
        }
    }
    keep
}

/// Drop events before `today` and order the rest by date, then time.
pub fn upcoming_sorted(events: Vec<Event>, today: NaiveDate) -> Vec<Event> {
    let mut out: Vec<Event> = events.into_iter().filter(|e| e.date >= today).collect();
    out.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.time.as_deref().unwrap_or("").cmp(b.time.as_deref().unwrap_or("")))
    });
    out
}
