//! Schedule aggregator: binary entrypoint.
//! Runs one aggregation round over every registered source and prints the upcoming
//! events as JSON on stdout.
//!
//! Usage: `ortodoxa-gudstjanster [--refresh] [--source <name>] [--list]`

use anyhow::{bail, Context, Result};
use tokio::time::Instant;

use ortodoxa_gudstjanster::cache::ResponseCache;
use ortodoxa_gudstjanster::config::load_config_default;
use ortodoxa_gudstjanster::ingest::{local_today, upcoming_sorted};
use ortodoxa_gudstjanster::telemetry::init_tracing;
use ortodoxa_gudstjanster::{build_registry, live_deps};

#[derive(Debug, Default)]
struct Args {
    refresh: bool,
    source: Option<String>,
    list: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--refresh" => args.refresh = true,
            "--list" => args.list = true,
            "--source" => {
                let name = it.next().context("--source needs a source name")?;
                args.source = Some(name);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = parse_args()?;
    let cfg = load_config_default().context("loading configuration")?;
    let registry = build_registry(&cfg, live_deps(&cfg)?);

    if args.list {
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let cache = ResponseCache::new(&cfg.cache_dir, cfg.cache_ttl())
        .with_context(|| format!("opening response cache {}", cfg.cache_dir.display()))?;
    if args.refresh {
        cache.invalidate_all().context("invalidating response cache")?;
        tracing::info!("response cache invalidated");
    }

    let deadline = Instant::now() + cfg.request_timeout();
    let events = match args.source.as_deref() {
        Some(name) => match registry.fetch_one(name, deadline).await {
            Some(Ok(events)) => {
                if let Err(e) = cache.store(name, events.clone()).await {
                    tracing::warn!(source = name, error = %e, "response cache write failed");
                }
                events
            }
            Some(Err(e)) => bail!("{name} failed at stage {}: {e}", e.stage()),
            None => bail!(
                "unknown source {name:?}; known sources: {}",
                registry.names().join(", ")
            ),
        },
        None => registry.fetch_all_cached(deadline, &cache).await,
    };

    let events = upcoming_sorted(events, local_today());
    tracing::info!(events = events.len(), "aggregation finished");
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}
