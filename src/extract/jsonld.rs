// src/extract/jsonld.rs
//! `openingHoursSpecification` blocks in embedded JSON-LD, used as a drift signal for
//! sources whose real schedule is rendered client-side.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::extract::recurrence::RecurringService;
use crate::extract::translate::english_day_to_sv;

/// One weekly opening slot. Also the shape of the configured expected schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHours {
    /// English day name as schema.org writes it, e.g. `Sunday`.
    pub day_of_week: String,
    pub opens: String,
    pub closes: String,
    #[serde(default)]
    pub service_name: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawHours {
    #[serde(rename = "dayOfWeek")]
    day_of_week: OneOrMany,
    #[serde(default)]
    opens: String,
    #[serde(default)]
    closes: String,
}

#[derive(Deserialize)]
struct RawDoc {
    #[serde(rename = "openingHoursSpecification", default)]
    opening_hours: Vec<RawHours>,
}

/// Strip a schema.org URL prefix: `https://schema.org/Sunday` → `Sunday`.
fn bare_day(day: &str) -> &str {
    day.rsplit('/').next().unwrap_or(day).trim()
}

/// Parse the first JSON-LD script block's opening hours.
pub fn extract_opening_hours(html: &str) -> Result<Vec<OpeningHours>, ExtractionError> {
    static RE_LD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"<script type="application/ld\+json">\s*(\{[\s\S]*?\})\s*</script>"#).unwrap()
    });
    let caps = RE_LD
        .captures(html)
        .ok_or(ExtractionError::NoMatch { field: "json-ld" })?;
    let doc: RawDoc =
        serde_json::from_str(&caps[1]).map_err(|e| ExtractionError::Decode(e.to_string()))?;

    let mut out = Vec::new();
    for hours in doc.opening_hours {
        let days = match hours.day_of_week {
            OneOrMany::One(d) => vec![d],
            OneOrMany::Many(ds) => ds,
        };
        for day in days {
            let day = bare_day(&day).to_string();
            let service_name = infer_service_name(&day, &hours.opens).to_string();
            out.push(OpeningHours {
                day_of_week: day,
                opens: hours.opens.clone(),
                closes: hours.closes.clone(),
                service_name,
            });
        }
    }
    Ok(out)
}

/// Sunday at 10:00 is the liturgy, Saturday is the evening service.
pub fn infer_service_name(day_of_week: &str, opens: &str) -> &'static str {
    match (day_of_week, opens) {
        ("Sunday", "10:00") => "Helig Liturgi",
        ("Saturday", _) => "Kvällsgudstjänst",
        _ => "Gudstjänst",
    }
}

/// Element-wise comparison of day, opens and closes. Service names are not compared.
pub fn schedules_match(current: &[OpeningHours], expected: &[OpeningHours]) -> bool {
    current.len() == expected.len()
        && current.iter().zip(expected).all(|(c, e)| {
            c.day_of_week == e.day_of_week && c.opens == e.opens && c.closes == e.closes
        })
}

/// One line per slot, for logs.
pub fn format_schedule(schedule: &[OpeningHours]) -> String {
    schedule
        .iter()
        .map(|s| format!("{}: {}-{} ({})", s.day_of_week, s.opens, s.closes, s.service_name))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Recurrence rules from opening slots; unknown day names are skipped.
pub fn to_recurring(schedule: &[OpeningHours]) -> Vec<RecurringService> {
    schedule
        .iter()
        .filter_map(|s| {
            let day = english_day_to_sv(&s.day_of_week)?;
            let name = if s.service_name.trim().is_empty() {
                infer_service_name(&s.day_of_week, &s.opens).to_string()
            } else {
                s.service_name.clone()
            };
            Some(RecurringService {
                name,
                days: vec![day.to_string()],
                time: (!s.opens.is_empty()).then(|| s.opens.clone()),
            })
        })
        .collect()
}
