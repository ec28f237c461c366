// src/extract/recurrence.rs
//! Weekly recurrence rules: parsing from tables and translation maps, merging the two
//! representations, and expansion into dated events.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::extract::translate::{
    find_service_name, parse_days, translate_service_name, weekday_label_sv, weekday_token_sv,
    HOLIDAY,
};
use crate::ingest::normalize_name;
use crate::ingest::types::{Event, EventTemplate};

/// `{name, days, time}` before expansion. Days are lowercase Swedish tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringService {
    pub name: String,
    pub days: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

static RE_TABLE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s*[-–]\s*([^:]+?)\s*:\s*(?:(\d{1,2})[:.](\d{2}))?").unwrap()
});
static RE_KL_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)kl\.?\s*(\d{1,2})[.:](\d{2})").unwrap());

/// Zero-padded `HH:MM`, or `None` when the hour or minute is out of range.
pub fn hhmm(hour: &str, minute: &str) -> Option<String> {
    let h: u32 = hour.parse().ok()?;
    let m: u32 = minute.parse().ok()?;
    (h <= 23 && m <= 59).then(|| format!("{h:02}:{m:02}"))
}

/// Parse one `"Name - day list: H:MM"` row; the time is optional.
pub fn parse_table_entry(line: &str) -> Option<RecurringService> {
    let line = line.replace('\t', " ");
    let caps = RE_TABLE_ROW.captures(line.trim())?;
    let name = translate_service_name(caps[1].trim());
    let days = parse_days(caps[2].trim());
    let time = match (caps.get(3), caps.get(4)) {
        (Some(h), Some(m)) => hhmm(h.as_str(), m.as_str()),
        _ => None,
    };
    if name.is_empty() || days.is_empty() {
        return None;
    }
    Some(RecurringService { name, days, time })
}

/// Parse the text of a rendered schedule table, one row per line.
pub fn parse_schedule_table(text: &str) -> Result<Vec<RecurringService>, ExtractionError> {
    let services: Vec<RecurringService> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(parse_table_entry)
        .collect();
    if services.is_empty() {
        return Err(ExtractionError::MarkupMismatch(format!(
            "no schedule rows in table text: {:?}",
            text.chars().take(200).collect::<String>()
        )));
    }
    Ok(services)
}

/// Parse a footer line: `"[Name:] day list | daily kl. HH:MM"`.
pub fn parse_footer_line(line: &str, default_name: &str) -> Option<RecurringService> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let time = RE_KL_TIME
        .captures(line)
        .and_then(|c| hhmm(&c[1], &c[2]));
    let rest = RE_KL_TIME.replace(line, " ");
    let rest = rest.trim().trim_end_matches(['.', ',']).trim();

    let split = rest
        .find(':')
        .map(|i| (&rest[..i], &rest[i + 1..]))
        .or_else(|| rest.split_once(" - "))
        .or_else(|| rest.split_once(" – "));
    let (name_part, days_part) = match split {
        Some((n, d)) => (n.trim(), d.trim()),
        None if parse_days(rest).is_empty() => (rest, ""),
        None => ("", rest),
    };

    let days = parse_days(days_part);
    if name_part.is_empty() && days.is_empty() && time.is_none() {
        return None;
    }
    // "Liturgija nedelja kl. 10:00": no separator, the name sits inside the day text.
    let name = if !name_part.is_empty() {
        translate_service_name(name_part)
    } else if let Some(known) = find_service_name(days_part) {
        known.to_string()
    } else {
        default_name.to_string()
    };
    Some(RecurringService { name, days, time })
}

/// Pull `"key": "text"` string pairs out of a JS bundle or JSON metadata block.
pub fn extract_translation_map(source: &str) -> BTreeMap<String, String> {
    static RE_PAIR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#""([A-Za-z0-9_.\-]+)"\s*:\s*"((?:[^"\\]|\\.)*)""#).unwrap()
    });
    RE_PAIR
        .captures_iter(source)
        .map(|c| {
            let raw = &c[2];
            let value = serde_json::from_str::<String>(&format!("\"{raw}\""))
                .unwrap_or_else(|_| raw.to_string());
            (c[1].to_string(), value)
        })
        .collect()
}

const SYNONYM_ROOTS: &[&[&str]] = &[
    &["liturg", "литург"],
    &["morgon", "jutr", "јутр", "matin", "morning"],
    &["afton", "kväll", "večer", "vecer", "вечер", "vesper", "evening"],
];

/// Footer and table names refer to the same service.
pub fn names_match(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize_name(a), normalize_name(b));
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na.contains(&nb) || nb.contains(&na) {
        return true;
    }
    SYNONYM_ROOTS.iter().any(|roots| {
        roots.iter().any(|r| na.contains(r)) && roots.iter().any(|r| nb.contains(r))
    })
}

/// Complete footer entries from table entries.
///
/// A footer entry lacking a time or days takes the first unconsumed table entry whose
/// name matches: days come from the table, time from the footer (table as fallback).
/// A table entry is consumed at most once. Leftover table entries with a name and days
/// are kept as-is. Tie-breaks follow the order of `table`.
pub fn merge_footer_and_table(
    footer: Vec<RecurringService>,
    table: Vec<RecurringService>,
) -> Vec<RecurringService> {
    let mut consumed = vec![false; table.len()];
    let mut out = Vec::with_capacity(footer.len() + table.len());

    for f in footer {
        let incomplete = f.time.is_none() || f.days.is_empty();
        let candidate = incomplete
            .then(|| {
                table
                    .iter()
                    .enumerate()
                    .position(|(i, t)| !consumed[i] && names_match(&f.name, &t.name))
            })
            .flatten();

        match candidate {
            Some(idx) => {
                consumed[idx] = true;
                let t = &table[idx];
                let days = if t.days.is_empty() { f.days } else { t.days.clone() };
                out.push(RecurringService {
                    name: f.name,
                    days,
                    time: f.time.or_else(|| t.time.clone()),
                });
            }
            None => out.push(f),
        }
    }

    out.extend(
        table
            .into_iter()
            .zip(consumed)
            .filter(|(t, used)| !used && !t.name.is_empty() && !t.days.is_empty())
            .map(|(t, _)| t),
    );
    out
}

/// Footer/table merge over a key → text map. Keys are visited in sorted order.
pub fn recurring_from_translations(
    map: &BTreeMap<String, String>,
    footer_prefix: &str,
    table_prefix: &str,
    default_name: &str,
) -> Vec<RecurringService> {
    let footer: Vec<RecurringService> = map
        .iter()
        .filter(|(k, _)| k.starts_with(footer_prefix))
        .filter_map(|(_, v)| parse_footer_line(v, default_name))
        .collect();
    let table: Vec<RecurringService> = map
        .iter()
        .filter(|(k, _)| k.starts_with(table_prefix))
        .filter_map(|(_, v)| parse_table_entry(v))
        .collect();
    merge_footer_and_table(footer, table)
}

/// One event per matching rule for each day in `[today, today + weeks*7)`.
///
/// The holiday token never matches.
pub fn expand(
    rules: &[RecurringService],
    weeks: u32,
    today: NaiveDate,
    template: &EventTemplate,
) -> Vec<Event> {
    let mut out = Vec::new();
    for offset in 0..u64::from(weeks) * 7 {
        let Some(date) = today.checked_add_days(Days::new(offset)) else {
            break;
        };
        let token = weekday_token_sv(date.weekday());
        for rule in rules {
            if rule.days.iter().any(|d| d != HOLIDAY && d == token) {
                let mut ev = template.event(date, weekday_label_sv(date.weekday()), rule.name.as_str());
                ev.time = rule.time.clone();
                out.push(ev);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn rs(name: &str, days: &[&str], time: Option<&str>) -> RecurringService {
        RecurringService {
            name: name.to_string(),
            days: days.iter().map(|d| d.to_string()).collect(),
            time: time.map(String::from),
        }
    }

    #[test]
    fn table_row_translates_name_and_days() {
        let got = parse_table_entry("Jutrenje - ponedeljak, petak: 8:00").unwrap();
        assert_eq!(got, rs("Morgongudstjänst", &["måndag", "fredag"], Some("08:00")));
    }

    #[test]
    fn table_row_cyrillic_with_tab() {
        let got = parse_table_entry("Литургија - недеља и празник:\t10:00").unwrap();
        assert_eq!(got, rs("Helig Liturgi", &["söndag", HOLIDAY], Some("10:00")));
    }

    #[test]
    fn table_row_without_time() {
        let got = parse_table_entry("Večernje - subota:").unwrap();
        assert_eq!(got, rs("Aftongudstjänst", &["lördag"], None));
    }

    #[test]
    fn schedule_table_errors_when_nothing_parses() {
        assert!(parse_schedule_table("Распоред\nнема").is_err());
    }

    #[test]
    fn footer_line_with_daily_keyword() {
        let got = parse_footer_line("Svaki dan kl. 7:30", "Gudstjänst").unwrap();
        assert_eq!(got.name, "Gudstjänst");
        assert_eq!(got.days.len(), 7);
        assert_eq!(got.time.as_deref(), Some("07:30"));
    }

    #[test]
    fn footer_line_named_without_days() {
        let got = parse_footer_line("Liturgija kl. 10:00", "Gudstjänst").unwrap();
        assert_eq!(got, rs("Helig Liturgi", &[], Some("10:00")));
    }

    #[test]
    fn footer_line_name_and_days_without_separator() {
        let got = parse_footer_line("Liturgija nedelja kl. 10:00", "Gudstjänst").unwrap();
        assert_eq!(got, rs("Helig Liturgi", &["söndag"], Some("10:00")));

        let got = parse_footer_line("Jutrenje svaki dan kl. 8:00", "Gudstjänst").unwrap();
        assert_eq!(got.name, "Morgongudstjänst");
        assert_eq!(got.days.len(), 7);
        assert_eq!(got.time.as_deref(), Some("08:00"));

        let got = parse_footer_line("nedelja kl. 10:00", "Gudstjänst").unwrap();
        assert_eq!(got.name, "Gudstjänst");
    }

    #[test]
    fn footer_line_named_with_days() {
        let got = parse_footer_line("Večernje: subota, nedelja kl. 17:00", "Gudstjänst").unwrap();
        assert_eq!(got, rs("Aftongudstjänst", &["lördag", "söndag"], Some("17:00")));
    }

    #[test]
    fn names_match_by_containment_and_synonyms() {
        assert!(names_match("Helig Liturgi", "liturgi"));
        assert!(names_match("Morgongudstjänst", "Jutrenje"));
        assert!(!names_match("Helig Liturgi", "Aftongudstjänst"));
        assert!(!names_match("", "Liturgi"));
    }

    #[test]
    fn merge_takes_table_days_and_footer_time() {
        let footer = vec![rs("Helig Liturgi", &[], Some("10:00"))];
        let table = vec![
            rs("Helig Liturgi", &["söndag", HOLIDAY], None),
            rs("Aftongudstjänst", &["lördag"], None),
        ];
        let merged = merge_footer_and_table(footer, table);
        assert_eq!(
            merged,
            vec![
                rs("Helig Liturgi", &["söndag", HOLIDAY], Some("10:00")),
                rs("Aftongudstjänst", &["lördag"], None),
            ]
        );
    }

    #[test]
    fn merge_without_match_keeps_footer_unchanged() {
        let f = rs("Akatist", &[], Some("18:00"));
        let merged = merge_footer_and_table(vec![f.clone()], vec![]);
        assert_eq!(merged, vec![f]);
    }

    #[test]
    fn merge_consumes_table_entry_once() {
        let footer = vec![
            rs("Helig Liturgi", &[], Some("09:00")),
            rs("Liturgi", &[], Some("11:00")),
        ];
        let table = vec![rs("Helig Liturgi", &["söndag"], None)];
        let merged = merge_footer_and_table(footer, table);
        assert_eq!(merged[0].days, vec!["söndag"]);
        assert!(merged[1].days.is_empty());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn translation_map_unescapes_values() {
        let js = r#"var t={"footer.schedule.1":"Liturgija: nedelja kl. 10:00","x":"a\"b","n":1};"#;
        let map = extract_translation_map(js);
        assert_eq!(map["footer.schedule.1"], "Liturgija: nedelja kl. 10:00");
        assert_eq!(map["x"], "a\"b");
        assert!(!map.contains_key("n"));
    }

    #[test]
    fn expansion_eight_mondays() {
        let monday = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        assert_eq!(monday.weekday(), Weekday::Mon);
        let rules = vec![rs("Morgongudstjänst", &["måndag"], Some("10:00"))];
        let events = expand(&rules, 8, monday, &EventTemplate::new("S"));
        assert_eq!(events.len(), 8);
        assert!(events.iter().all(|e| e.date.weekday() == Weekday::Mon));
        assert!(events.iter().all(|e| e.day_of_week == "Måndag"));
        assert_eq!(events[7].date, NaiveDate::from_ymd_opt(2026, 3, 23).unwrap());
    }

    #[test]
    fn expansion_skips_holiday_only_rules() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();
        let rules = vec![rs("Helgdagsliturgi", &[HOLIDAY], Some("09:00"))];
        assert!(expand(&rules, 4, today, &EventTemplate::new("S")).is_empty());
    }
}
