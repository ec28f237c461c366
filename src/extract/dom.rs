// src/extract/dom.rs
//! HTML/DOM pattern extraction with CSS selectors.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::ExtractionError;
use crate::extract::recurrence::hhmm;
use crate::extract::translate::capitalize;

/// Selectors describing a page of repeating calendar items.
#[derive(Debug, Clone)]
pub struct CalendarLayout {
    pub item: &'static str,
    pub meta: &'static str,
    pub content: &'static str,
    pub title: &'static str,
    /// Inline labels (`<strong>Plats:</strong> value`), first is location, second is time.
    pub location_label: &'static str,
    pub time_label: &'static str,
}

/// One calendar row after pattern matching; not yet an `Event`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarItem {
    pub date: NaiveDate,
    pub day_of_week: String,
    pub title: String,
    pub location: Option<String>,
    pub time: Option<String>,
    pub occasion: Option<String>,
    pub notes: Option<String>,
}

fn selector(s: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(s).map_err(|e| ExtractionError::MarkupMismatch(format!("bad selector {s}: {e}")))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn labeled_value(html: &str, label: &str) -> Option<String> {
    let re = Regex::new(&format!(
        r"<strong>\s*{}:\s*</strong>\s*([^<]+)",
        regex::escape(label)
    ))
    .ok()?;
    let raw = re.captures(html)?.get(1)?.as_str();
    let value = html_escape::decode_html_entities(raw).trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Extract calendar items. Rows whose meta line lacks a `YYYY-MM-DD | weekday` pair are
/// skipped as boilerplate.
pub fn extract_calendar_items(
    html: &str,
    layout: &CalendarLayout,
) -> Result<Vec<CalendarItem>, ExtractionError> {
    static RE_DATE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})\s*\|\s*(\S+)").unwrap());

    let item_sel = selector(layout.item)?;
    let meta_sel = selector(layout.meta)?;
    let content_sel = selector(layout.content)?;
    let title_sel = selector(layout.title)?;
    let div_sel = selector("div")?;
    let strong_sel = selector("strong")?;
    let p_sel = selector("p")?;

    let location_marker = format!("{}:", layout.location_label);
    let time_marker = format!("{}:", layout.time_label);

    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for item in doc.select(&item_sel) {
        let meta: String = item
            .select(&meta_sel)
            .map(|m| m.text().collect::<String>())
            .collect();
        let Some(caps) = RE_DATE.captures(&meta) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d") else {
            tracing::debug!(raw = &caps[1], "calendar row with impossible date skipped");
            continue;
        };
        let day_of_week = caps[2].to_string();

        let content = item.select(&content_sel).next();
        let title = content
            .and_then(|c| c.select(&title_sel).next())
            .map(element_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());

        let details = content.and_then(|c| c.select(&div_sel).next());
        let (location, time, occasion, notes) = match details {
            Some(d) => {
                let inner = d.inner_html();
                let occasion = d
                    .select(&strong_sel)
                    .map(element_text)
                    .find(|t| !t.is_empty() && *t != location_marker && *t != time_marker);
                let paragraphs: Vec<String> = d
                    .select(&p_sel)
                    .map(element_text)
                    .filter(|t| !t.is_empty())
                    .collect();
                (
                    labeled_value(&inner, layout.location_label),
                    labeled_value(&inner, layout.time_label),
                    occasion,
                    (!paragraphs.is_empty()).then(|| paragraphs.join("\n")),
                )
            }
            None => (None, None, None, None),
        };

        out.push(CalendarItem {
            date,
            day_of_week,
            title,
            location,
            time,
            occasion,
            notes,
        });
    }

    Ok(out)
}

/// Year of the next occurrence of `month`: this year, or next year if the month has passed.
pub fn infer_year(month: u32, today: NaiveDate) -> i32 {
    if month < today.month() {
        today.year() + 1
    } else {
        today.year()
    }
}

/// A "Söndag 8/2 kl. 09:00. Liturgi. Occasion" line.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayLine {
    pub day_of_week: String,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub service_name: String,
    pub occasion: Option<String>,
}

pub const DEFAULT_SERVICE_NAME: &str = "Liturgi";

/// Parse a Swedish weekday + day/month line. `None` when the line has no date.
pub fn parse_weekday_line(text: &str, today: NaiveDate) -> Option<WeekdayLine> {
    static RE_DAY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)(måndag|tisdag|onsdag|torsdag|fredag|lördag|söndag)\s+(\d{1,2})/(\d{1,2})")
            .unwrap()
    });
    static RE_TIME: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"kl\.?\s*(\d{1,2})[.:](\d{2})").unwrap());

    let caps = RE_DAY.captures(text)?;
    let day: u32 = caps[2].parse().ok()?;
    let month: u32 = caps[3].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(infer_year(month, today), month, day)?;

    let mut time = None;
    let mut service_name = DEFAULT_SERVICE_NAME.to_string();
    let mut occasion = None;

    if let Some(tc) = RE_TIME.captures(text) {
        time = hhmm(&tc[1], &tc[2]);

        let end = tc.get(0).map(|m| m.end()).unwrap_or(text.len());
        let after = text[end..].trim().trim_start_matches('.').trim();
        let mut parts = after.splitn(2, '.');
        if let Some(name) = parts.next().map(str::trim).filter(|s| !s.is_empty()) {
            service_name = name.to_string();
        }
        occasion = parts
            .next()
            .map(|s| s.trim().trim_end_matches('.').trim().to_string())
            .filter(|s| !s.is_empty());
    }

    Some(WeekdayLine {
        day_of_week: capitalize(&caps[1]),
        date,
        time,
        service_name,
        occasion,
    })
}

/// Text of every `li` inside containers that carry a heading equal to `heading`.
pub fn list_items_under_heading(
    html: &str,
    container: &str,
    heading: &str,
) -> Result<Vec<String>, ExtractionError> {
    let container_sel = selector(container)?;
    let heading_sel = selector("h1, h2, h3, h4")?;
    let li_sel = selector("li")?;

    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for c in doc.select(&container_sel) {
        if !c.select(&heading_sel).any(|h| element_text(h) == heading) {
            continue;
        }
        out.extend(c.select(&li_sel).map(|li| li.text().collect::<String>()));
    }
    Ok(out)
}

/// First `href` under `selector` containing `needle`.
pub fn find_first_link(
    html: &str,
    selector_str: &str,
    needle: &str,
) -> Result<Option<String>, ExtractionError> {
    let sel = selector(selector_str)?;
    let doc = Html::parse_document(html);
    let found = doc
        .select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .find(|href| href.contains(needle))
        .map(String::from);
    Ok(found)
}

/// Image `src` values under `selector` that look like JPEG/PNG files, in document order.
pub fn find_image_urls(html: &str, selector_str: &str) -> Result<Vec<String>, ExtractionError> {
    let sel = selector(selector_str)?;
    let doc = Html::parse_document(html);
    let mut out: Vec<String> = Vec::new();
    for src in doc.select(&sel).filter_map(|el| el.value().attr("src")) {
        let lower = src.to_ascii_lowercase();
        let is_image = [".jpg", ".jpeg", ".png"].iter().any(|ext| lower.contains(ext));
        if is_image && !out.iter().any(|u| u == src) {
            out.push(src.to_string());
        }
    }
    Ok(out)
}

/// `src` of every external script, in document order.
pub fn find_script_sources(html: &str) -> Result<Vec<String>, ExtractionError> {
    let sel = selector("script[src]")?;
    let doc = Html::parse_document(html);
    Ok(doc
        .select(&sel)
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| src.contains(".js"))
        .map(String::from)
        .collect())
}
