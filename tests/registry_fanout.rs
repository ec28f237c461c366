// tests/registry_fanout.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use ortodoxa_gudstjanster::cache::ResponseCache;
use ortodoxa_gudstjanster::error::{AdapterError, ExtractionError};
use ortodoxa_gudstjanster::ingest::types::{Event, EventTemplate, SourceAdapter};
use ortodoxa_gudstjanster::Registry;
use tokio::time::Instant;

enum Behavior {
    Ok(usize),
    Fail,
    Hang,
    Panic,
}

struct Scripted {
    name: &'static str,
    behavior: Behavior,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(name: &'static str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name,
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, _deadline: Instant) -> Result<Vec<Event>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Ok(n) => {
                let template = EventTemplate::new(self.name);
                let first = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
                Ok((0..n)
                    .map(|i| template.event(first + chrono::Days::new(i as u64), "Söndag", "Liturgi"))
                    .collect())
            }
            Behavior::Fail => Err(ExtractionError::MarkupMismatch("layout changed".into()).into()),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Vec::new())
            }
            Behavior::Panic => panic!("adapter bug"),
        }
    }
}

fn registry(adapters: Vec<Arc<Scripted>>) -> Registry {
    let mut r = Registry::new();
    for a in adapters {
        r.register(a);
    }
    r
}

#[tokio::test]
async fn one_bad_adapter_does_not_sink_the_others() {
    let reg = registry(vec![
        Scripted::new("hang", Behavior::Hang),
        Scripted::new("fail", Behavior::Fail),
        Scripted::new("panic", Behavior::Panic),
        Scripted::new("good", Behavior::Ok(3)),
    ]);

    let started = std::time::Instant::now();
    let events = reg.fetch_all(Instant::now() + Duration::from_millis(300)).await;

    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.source == "good"));
    assert!(started.elapsed() < Duration::from_secs(5), "bounded by the deadline");
}

#[tokio::test]
async fn fetch_one_reports_errors_and_unknown_names() {
    let reg = registry(vec![
        Scripted::new("fail", Behavior::Fail),
        Scripted::new("hang", Behavior::Hang),
        Scripted::new("good", Behavior::Ok(2)),
    ]);
    let deadline = Instant::now() + Duration::from_millis(200);

    assert_eq!(reg.fetch_one("good", deadline).await.unwrap().unwrap().len(), 2);
    assert_eq!(reg.fetch_one("fail", deadline).await.unwrap().unwrap_err().stage(), "markup");
    assert_eq!(reg.fetch_one("hang", deadline).await.unwrap().unwrap_err().stage(), "timeout");
    assert!(reg.fetch_one("nope", deadline).await.is_none());
    assert_eq!(reg.names(), vec!["fail", "hang", "good"]);
}

#[tokio::test]
async fn cached_round_skips_fresh_adapters_and_retries_failures() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = ResponseCache::new(tmp.path(), Duration::from_secs(3600)).unwrap();
    let good = Scripted::new("good", Behavior::Ok(2));
    let fail = Scripted::new("fail", Behavior::Fail);
    let reg = registry(vec![good.clone(), fail.clone()]);

    let deadline = Instant::now() + Duration::from_secs(5);
    let first = reg.fetch_all_cached(deadline, &cache).await;
    let second = reg.fetch_all_cached(deadline, &cache).await;

    assert_eq!(first.len(), 2);
    assert_eq!(second, first);
    assert_eq!(good.calls(), 1, "second round served from cache");
    assert_eq!(fail.calls(), 2, "failures are never cached");
    assert!(cache.get("fail").is_none());
}

#[tokio::test]
async fn empty_registry_yields_nothing() {
    let reg = Registry::new();
    assert!(reg.fetch_all(Instant::now() + Duration::from_secs(1)).await.is_empty());
}
