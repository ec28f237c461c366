// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::error::{AdapterError, ExtractionError, PersistenceError, RetrievalError};
pub use crate::ingest::providers::{build_registry, Deps};
pub use crate::ingest::registry::Registry;
pub use crate::ingest::types::{Event, ServiceName, SourceAdapter};

use std::sync::Arc;

use crate::cache::{ContentStore, LocalStore};
use crate::extract::{CachedExtractor, GenerativeExtractor, OpenAiExtractor};
use crate::fetch::{BrowserRuntime, BrowserlessRuntime, HttpFetcher};

/// Production collaborators from config: HTTP fetcher, local content store, cached OpenAI
/// extractor when a key is available, Browserless runtime when an endpoint is configured.
pub fn live_deps(cfg: &AppConfig) -> anyhow::Result<Deps> {
    use anyhow::Context;

    let fetcher = Arc::new(HttpFetcher::new().context("building http fetcher")?);
    let store: Arc<dyn ContentStore> = Arc::new(
        LocalStore::new(&cfg.store_dir)
            .with_context(|| format!("opening content store {}", cfg.store_dir.display()))?,
    );

    let extractor: Option<Arc<dyn GenerativeExtractor>> = match cfg.openai.resolve_api_key() {
        Ok(key) => {
            let openai = OpenAiExtractor::new(&cfg.openai, key).context("building OpenAI client")?;
            Some(Arc::new(CachedExtractor::new(openai, store.clone())))
        }
        Err(e) => {
            tracing::warn!(error = %e, "generative extraction disabled");
            None
        }
    };

    let browser: Option<Arc<dyn BrowserRuntime>> = match cfg.browser.resolve_endpoint() {
        Some(endpoint) => {
            let token = cfg.browser.resolve_token();
            let runtime = BrowserlessRuntime::new(&endpoint, token.as_deref())
                .context("building browser runtime")?;
            Some(Arc::new(runtime))
        }
        None => None,
    };

    Ok(Deps {
        fetcher,
        store,
        extractor,
        browser,
    })
}
