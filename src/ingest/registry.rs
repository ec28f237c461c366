// src/ingest/registry.rs
//! Fan-out over registered adapters with best-effort partial results.

use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};

use crate::cache::ResponseCache;
use crate::error::{AdapterError, RetrievalError};
use crate::ingest::ensure_metrics_described;
use crate::ingest::types::{Event, SourceAdapter};

/// Ordered set of adapters. Failures of one adapter never affect the others.
#[derive(Default, Clone)]
pub struct Registry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl Registry {
    pub fn new() -> Self {
        ensure_metrics_described();
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.push(adapter);
    }

    pub fn adapters(&self) -> &[Arc<dyn SourceAdapter>] {
        &self.adapters
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.name() == name).cloned()
    }

    /// Every adapter concurrently; successful results combined in completion order.
    pub async fn fetch_all(&self, deadline: Instant) -> Vec<Event> {
        fan_out(self.adapters.clone(), deadline)
            .await
            .into_iter()
            .flat_map(|(_, events)| events)
            .collect()
    }

    /// Like [`Registry::fetch_all`], but fresh per-adapter cache entries are served
    /// without invoking the adapter. Fresh results are written back; write errors are logged.
    /// Cache file I/O runs on the blocking pool.
    pub async fn fetch_all_cached(&self, deadline: Instant, cache: &ResponseCache) -> Vec<Event> {
        let mut combined = Vec::new();
        let mut misses = Vec::new();

        for adapter in &self.adapters {
            match cache.load(adapter.name()).await {
                Some(hit) => {
                    tracing::debug!(source = adapter.name(), events = hit.len(), "response cache hit");
                    counter!("aggregate_cache_hits_total").increment(1);
                    counter!("aggregate_events_total").increment(hit.len() as u64);
                    combined.extend(hit);
                }
                None => {
                    tracing::debug!(source = adapter.name(), "response cache miss");
                    misses.push(adapter.clone());
                }
            }
        }

        for (name, events) in fan_out(misses, deadline).await {
            if let Err(e) = cache.store(&name, events.clone()).await {
                tracing::warn!(source = %name, error = %e, "response cache write failed");
            }
            combined.extend(events);
        }
        combined
    }

    /// A single adapter by name, bounded by `deadline`. `None` if no adapter has that name.
    pub async fn fetch_one(
        &self,
        name: &str,
        deadline: Instant,
    ) -> Option<Result<Vec<Event>, AdapterError>> {
        let adapter = self.get(name)?;
        Some(run_bounded(adapter, deadline).await)
    }
}

async fn run_bounded(
    adapter: Arc<dyn SourceAdapter>,
    deadline: Instant,
) -> Result<Vec<Event>, AdapterError> {
    match timeout_at(deadline, adapter.fetch(deadline)).await {
        Ok(result) => result,
        Err(_) => Err(RetrievalError::Timeout {
            url: adapter.name().to_string(),
        }
        .into()),
    }
}

/// One task per adapter; each pushes `(name, result)` into a channel drained here.
/// A panicking task simply never reports and contributes nothing.
async fn fan_out(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    deadline: Instant,
) -> Vec<(String, Vec<Event>)> {
    if adapters.is_empty() {
        return Vec::new();
    }
    let (tx, mut rx) = mpsc::channel(adapters.len());

    for adapter in adapters {
        let tx = tx.clone();
        tokio::spawn(async move {
            let name = adapter.name().to_string();
            let started = std::time::Instant::now();
            let result = run_bounded(adapter, deadline).await;
            histogram!("aggregate_adapter_ms").record(started.elapsed().as_millis() as f64);
            let _ = tx.send((name, result)).await;
        });
    }
    drop(tx);

    let mut out = Vec::new();
    while let Some((name, result)) = rx.recv().await {
        match result {
            Ok(events) => {
                tracing::info!(source = %name, events = events.len(), "adapter fetched");
                counter!("aggregate_events_total").increment(events.len() as u64);
                out.push((name, events));
            }
            Err(e) => {
                tracing::warn!(source = %name, stage = e.stage(), error = %e, "adapter failed");
                counter!("aggregate_adapter_errors_total", "source" => name).increment(1);
            }
        }
    }
    out
}
