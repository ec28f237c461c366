//! Render the Serbian parish schedule table through the browser service and print the
//! parsed weekly rules as JSON. Useful when the table markup changes.
//!
//! Usage: `BROWSERLESS_URL=http://localhost:3000 recurring-schedule [--weeks <n>]`
//! With `--weeks`, the expanded events are printed instead of the rules.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tokio::time::Instant;

use ortodoxa_gudstjanster::config::load_config_default;
use ortodoxa_gudstjanster::extract::recurrence::{expand, RecurringService};
use ortodoxa_gudstjanster::fetch::BrowserlessRuntime;
use ortodoxa_gudstjanster::ingest::local_today;
use ortodoxa_gudstjanster::ingest::providers::srpska;
use ortodoxa_gudstjanster::ingest::types::EventTemplate;
use ortodoxa_gudstjanster::telemetry::init_tracing;

#[derive(Serialize)]
struct RecurringSchedule {
    services: Vec<RecurringService>,
}

fn parse_weeks() -> Result<Option<u32>> {
    let mut it = std::env::args().skip(1);
    let mut weeks = None;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--weeks" => {
                let raw = it.next().context("--weeks needs a number")?;
                weeks = Some(raw.parse().with_context(|| format!("invalid week count {raw:?}"))?);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(weeks)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let weeks = parse_weeks()?;
    let cfg = load_config_default().context("loading configuration")?;
    let endpoint = cfg
        .browser
        .resolve_endpoint()
        .ok_or_else(|| anyhow!("no browser endpoint configured (set [browser].endpoint or BROWSERLESS_URL)"))?;
    let token = cfg.browser.resolve_token();
    let runtime = BrowserlessRuntime::new(&endpoint, token.as_deref())?;

    let deadline = Instant::now() + cfg.request_timeout();
    let plan = srpska::table_plan_from_config(&cfg.browser);
    let services = srpska::render_schedule_table(&runtime, &plan, deadline)
        .await
        .map_err(|e| anyhow!("schedule table failed at stage {}: {e}", e.stage()))?;

    let out = match weeks {
        Some(n) => {
            let template = EventTemplate::new(srpska::NAME).with_url(srpska::CALENDAR_URL);
            serde_json::to_string_pretty(&expand(&services, n, local_today(), &template))?
        }
        None => serde_json::to_string_pretty(&RecurringSchedule { services })?,
    };
    println!("{out}");
    Ok(())
}
