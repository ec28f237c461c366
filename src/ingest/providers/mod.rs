// src/ingest/providers/mod.rs
//! Concrete source adapters and the registry wiring for them.

pub mod finska;
pub mod gomos;
pub mod heliga_anna;
pub mod ryska;
pub mod srpska;

use std::sync::Arc;

use crate::cache::ContentStore;
use crate::config::AppConfig;
use crate::extract::GenerativeExtractor;
use crate::fetch::{BrowserRuntime, Fetch};
use crate::ingest::registry::Registry;

pub use finska::FinskaAdapter;
pub use gomos::GomosAdapter;
pub use heliga_anna::HeligaAnnaAdapter;
pub use ryska::RyskaAdapter;
pub use srpska::{ScheduleDrift, SrpskaAdapter};

/// Collaborators injected into the adapters.
#[derive(Clone)]
pub struct Deps {
    pub fetcher: Arc<dyn Fetch>,
    pub store: Arc<dyn ContentStore>,
    /// `None` when no model API key is configured; generative sources are then not registered.
    pub extractor: Option<Arc<dyn GenerativeExtractor>>,
    /// `None` when no browser service is configured; rendered fetches are then skipped.
    pub browser: Option<Arc<dyn BrowserRuntime>>,
}

/// All adapters in their fixed registration order.
pub fn build_registry(cfg: &AppConfig, deps: Deps) -> Registry {
    let mut registry = Registry::new();

    registry.register(Arc::new(FinskaAdapter::new(deps.fetcher.clone())));
    registry.register(Arc::new(HeligaAnnaAdapter::new(deps.fetcher.clone())));

    match &deps.extractor {
        Some(extractor) => {
            registry.register(Arc::new(RyskaAdapter::new(
                deps.fetcher.clone(),
                extractor.clone(),
            )));
            registry.register(Arc::new(
                GomosAdapter::new(deps.fetcher.clone(), extractor.clone(), deps.store.clone())
                    .with_language(&cfg.default_language),
            ));
        }
        None => tracing::info!(
            "no generative extractor configured; skipping {} and {}",
            ryska::NAME,
            gomos::NAME
        ),
    }

    registry.register(Arc::new(SrpskaAdapter::new(
        deps.fetcher.clone(),
        deps.browser.clone(),
        cfg,
    )));

    tracing::info!(adapters = ?registry.names(), "registry built");
    registry
}
