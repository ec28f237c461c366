// src/cache/response.rs
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{safe_file_stem, write_atomic};
use crate::error::PersistenceError;
use crate::ingest::types::Event;

#[derive(Debug, Deserialize)]
struct Entry {
    events: Vec<Event>,
    fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct EntryRef<'a> {
    events: &'a [Event],
    fetched_at: DateTime<Utc>,
}

/// Disk-backed per-adapter result cache with a fixed TTL. One JSON file per adapter name.
///
/// Clones share the same directory and lock. Async callers go through
/// [`ResponseCache::load`] and [`ResponseCache::store`], which run on the blocking pool.
#[derive(Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    ttl: chrono::Duration,
    lock: Arc<Mutex<()>>,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Ok(Self {
            dir,
            ttl,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cached events if present and not older than the TTL. Read failures count as misses.
    pub fn get(&self, name: &str) -> Option<Vec<Event>> {
        self.get_at(name, Utc::now())
    }

    pub fn get_at(&self, name: &str, now: DateTime<Utc>) -> Option<Vec<Event>> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let path = self.file_path(name);
        let data = match fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(source = name, error = %e, "response cache read failed");
                return None;
            }
        };
        let entry: Entry = match serde_json::from_slice(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!(source = name, error = %e, "response cache entry unreadable");
                return None;
            }
        };
        if now.signed_duration_since(entry.fetched_at) > self.ttl {
            return None;
        }
        Some(entry.events)
    }

    /// [`ResponseCache::get`] off the async worker threads.
    pub async fn load(&self, name: &str) -> Option<Vec<Event>> {
        let cache = self.clone();
        let key = name.to_string();
        match tokio::task::spawn_blocking(move || cache.get(&key)).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(source = name, error = %e, "response cache read task failed");
                None
            }
        }
    }

    /// [`ResponseCache::set`] off the async worker threads.
    pub async fn store(&self, name: &str, events: Vec<Event>) -> Result<(), PersistenceError> {
        let cache = self.clone();
        let key = name.to_string();
        match tokio::task::spawn_blocking(move || cache.set(&key, &events)).await {
            Ok(res) => res,
            Err(e) => Err(PersistenceError::io(self.file_path(name), io::Error::other(e))),
        }
    }

    /// Overwrite the entry for `name` unconditionally.
    pub fn set(&self, name: &str, events: &[Event]) -> Result<(), PersistenceError> {
        self.set_at(name, events, Utc::now())
    }

    pub fn set_at(
        &self,
        name: &str,
        events: &[Event],
        fetched_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let data = serde_json::to_vec_pretty(&EntryRef { events, fetched_at })?;
        write_atomic(&self.file_path(name), &data)
    }

    pub fn invalidate(&self, name: &str) -> Result<(), PersistenceError> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let path = self.file_path(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::io(path, e)),
        }
    }

    pub fn invalidate_all(&self) -> Result<(), PersistenceError> {
        let _g = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let entries = fs::read_dir(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "could not remove cache entry");
                }
            }
        }
        Ok(())
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_file_stem(name)))
    }
}
