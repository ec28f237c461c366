// src/config/mod.rs
//! Application configuration: one TOML or JSON document, every field defaulted.

pub mod ai;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::extract::jsonld::OpeningHours;

pub use ai::{BrowserConfig, OpenAiConfig};

const ENV_PATH: &str = "AGGREGATOR_CONFIG_PATH";

const MIN_TTL_SECS: u64 = 60;
const MAX_WEEKS: u32 = 26;

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}
fn default_cache_ttl_secs() -> u64 {
    6 * 60 * 60
}
fn default_store_dir() -> PathBuf {
    PathBuf::from("disk")
}
fn default_request_timeout_secs() -> u64 {
    180
}
fn default_language() -> String {
    "sv".to_string()
}
fn default_recurrence_weeks() -> u32 {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Response cache directory (one file per adapter).
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Content store directory (checksum-keyed extraction results and archived images).
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Overall deadline for one aggregation round.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Preferred language when displaying localized service names.
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_recurrence_weeks")]
    pub recurrence_weeks: u32,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub srpska: SrpskaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            cache_ttl_secs: default_cache_ttl_secs(),
            store_dir: default_store_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            default_language: default_language(),
            recurrence_weeks: default_recurrence_weeks(),
            openai: OpenAiConfig::default(),
            browser: BrowserConfig::default(),
            srpska: SrpskaConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn sanitize(mut self) -> Self {
        if self.cache_ttl_secs < MIN_TTL_SECS {
            self.cache_ttl_secs = default_cache_ttl_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        if !(1..=MAX_WEEKS).contains(&self.recurrence_weeks) {
            self.recurrence_weeks = default_recurrence_weeks();
        }
        if self.default_language.trim().is_empty() {
            self.default_language = default_language();
        }
        self.openai.sanitize();
        self.browser.sanitize();
        self.srpska.sanitize();
        self
    }
}

fn default_footer_prefix() -> String {
    "footer.schedule".to_string()
}
fn default_table_prefix() -> String {
    "schedule.table".to_string()
}
fn default_service_name() -> String {
    "Gudstjänst".to_string()
}
fn default_expected() -> Vec<OpeningHours> {
    vec![OpeningHours {
        day_of_week: "Sunday".to_string(),
        opens: "10:00".to_string(),
        closes: "12:00".to_string(),
        service_name: "Helig Liturgi".to_string(),
    }]
}

/// Serbian parish: expected schedule for drift checks and fallback generation,
/// plus the translation-map key prefixes of its footer and schedule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SrpskaConfig {
    #[serde(default = "default_expected")]
    pub expected: Vec<OpeningHours>,
    #[serde(default = "default_footer_prefix")]
    pub footer_prefix: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    /// Name for footer entries that do not state one.
    #[serde(default = "default_service_name")]
    pub default_service_name: String,
}

impl Default for SrpskaConfig {
    fn default() -> Self {
        Self {
            expected: default_expected(),
            footer_prefix: default_footer_prefix(),
            table_prefix: default_table_prefix(),
            default_service_name: default_service_name(),
        }
    }
}

impl SrpskaConfig {
    fn sanitize(&mut self) {
        if self.default_service_name.trim().is_empty() {
            self.default_service_name = default_service_name();
        }
        if self.footer_prefix.trim().is_empty() {
            self.footer_prefix = default_footer_prefix();
        }
        if self.table_prefix.trim().is_empty() {
            self.table_prefix = default_table_prefix();
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg.sanitize())
}

/// Load config using env var + fallbacks:
/// 1) $AGGREGATOR_CONFIG_PATH
/// 2) config/aggregator.toml
/// 3) config/aggregator.json
/// 4) built-in defaults
pub fn load_config_default() -> Result<AppConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/aggregator.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/aggregator.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(AppConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<AppConfig> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return serde_json::from_str(s).map_err(|e| anyhow!("invalid JSON config: {e}"));
    }
    toml::from_str(s).map_err(|e| anyhow!("invalid TOML config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = parse_config("", "toml").unwrap().sanitize();
        assert_eq!(cfg.cache_ttl_secs, 21_600);
        assert_eq!(cfg.recurrence_weeks, 8);
        assert_eq!(cfg.openai.model, "gpt-4o");
        assert_eq!(cfg.srpska.expected.len(), 1);
        assert_eq!(cfg.srpska.default_service_name, "Gudstjänst");
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let toml = r#"
cache_ttl_secs = 5
recurrence_weeks = 100

[browser]
wait_budget_ms = 0
"#;
        let cfg = parse_config(toml, "toml").unwrap().sanitize();
        assert_eq!(cfg.cache_ttl_secs, 21_600);
        assert_eq!(cfg.recurrence_weeks, 8);
        assert_eq!(cfg.browser.wait_budget_ms, 10_000);
    }

    #[test]
    fn json_is_accepted() {
        let json = r#"{"recurrence_weeks": 4, "srpska": {"expected": []}}"#;
        let cfg = parse_config(json, "").unwrap().sanitize();
        assert_eq!(cfg.recurrence_weeks, 4);
        assert!(cfg.srpska.expected.is_empty());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        let v = load_config_default().unwrap();
        assert_eq!(v.recurrence_weeks, 8);

        fs::create_dir_all("config").unwrap();
        fs::write("config/aggregator.toml", "recurrence_weeks = 3\n").unwrap();
        assert_eq!(load_config_default().unwrap().recurrence_weeks, 3);

        let p_json = tmp.path().join("other.json");
        fs::write(&p_json, r#"{"recurrence_weeks": 12}"#).unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        assert_eq!(load_config_default().unwrap().recurrence_weeks, 12);

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_config_default().is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
