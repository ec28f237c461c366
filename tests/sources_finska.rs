// tests/sources_finska.rs
use std::sync::Arc;

use chrono::NaiveDate;
use ortodoxa_gudstjanster::fetch::FixtureFetcher;
use ortodoxa_gudstjanster::ingest::providers::finska::{self, FinskaAdapter};
use ortodoxa_gudstjanster::ingest::types::SourceAdapter;
use ortodoxa_gudstjanster::ServiceName;

mod common;
use common::{deadline, fixture};

#[tokio::test]
async fn calendar_items_become_events() {
    let fetcher = Arc::new(FixtureFetcher::new().with_page(finska::URL, fixture("finska_calendar.html")));
    let adapter = FinskaAdapter::new(fetcher);

    let events = adapter.fetch(deadline()).await.expect("finska fetch ok");
    // The news row has no date and is skipped.
    assert_eq!(events.len(), 3);

    let first = &events[0];
    assert_eq!(first.source, finska::NAME);
    assert_eq!(first.date, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());
    assert_eq!(first.day_of_week, "Söndag");
    assert_eq!(first.service_name, ServiceName::localized("sv", "Liturgi"));
    assert_eq!(first.location.as_deref(), Some("Helige Nikolai kyrka, Stockholm"));
    assert_eq!(first.time.as_deref(), Some("10:00"));
    assert_eq!(first.occasion.as_deref(), Some("Alla helgons dag"));
    assert_eq!(first.notes.as_deref(), Some("Präst: Fr. Mikael\nKyrkkaffe efteråt"));
    assert_eq!(first.language.as_deref(), Some("Svenska, finska"));
    assert_eq!(first.source_url.as_deref(), Some(finska::URL));

    let vigil = &events[1];
    assert_eq!(vigil.time.as_deref(), Some("17:00"));
    assert!(vigil.occasion.is_none());
    assert!(vigil.notes.is_none());

    assert_eq!(events[2].service_name.display("sv"), "Unknown");
    assert!(events[2].location.is_none());
}

#[tokio::test]
async fn custom_url_is_used_and_reported() {
    let url = "https://mirror.example/kalender/";
    let fetcher = Arc::new(FixtureFetcher::new().with_page(url, fixture("finska_calendar.html")));
    let adapter = FinskaAdapter::new(fetcher.clone()).with_url(url);

    let events = adapter.fetch(deadline()).await.unwrap();
    assert!(events.iter().all(|e| e.source_url.as_deref() == Some(url)));
    assert_eq!(fetcher.requested(), vec![url.to_string()]);
}

#[tokio::test]
async fn missing_page_is_a_network_stage_error() {
    let adapter = FinskaAdapter::new(Arc::new(FixtureFetcher::new()));
    let err = adapter.fetch(deadline()).await.unwrap_err();
    assert_eq!(err.stage(), "network");
}
