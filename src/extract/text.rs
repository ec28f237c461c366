// src/extract/text.rs
//! Markup cleanup for sources whose schedule is loose prose inside a page.

use once_cell::sync::OnceCell;
use regex::Regex;

const MONTHS_SV: &str =
    "Januari|Februari|Mars|April|Maj|Juni|Juli|Augusti|September|Oktober|November|December";
const WEEKDAYS_SV: &str = "Söndag|Måndag|Tisdag|Onsdag|Torsdag|Fredag|Lördag";

/// Where the schedule starts and what may end it.
#[derive(Debug, Clone)]
pub struct TextWindow {
    /// Regex; the window starts at its first match.
    pub start: String,
    /// Literal markers (case-insensitive); the window ends at the earliest one after start.
    pub end_markers: Vec<String>,
}

impl TextWindow {
    /// A Swedish month heading directly followed by a "<day> <weekday>" line.
    pub fn month_schedule(end_markers: &[&str]) -> Self {
        Self {
            start: format!(r"(?i)(?:{MONTHS_SV})\s+\d{{1,2}}\s+(?:{WEEKDAYS_SV})"),
            end_markers: end_markers.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Strip tags, decode entities and collapse whitespace runs.
pub fn strip_markup(html: &str) -> String {
    static RE_SCRIPT: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_script = RE_SCRIPT
        .get_or_init(|| Regex::new(r"(?is)<(script|style)\b.*?</(script|style)>").unwrap());
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    let out = re_script.replace_all(html, " ");
    let out = re_tags.replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out);
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Slice `text` to the window; the whole text when the start marker is absent.
pub fn slice_window<'a>(text: &'a str, window: &TextWindow) -> &'a str {
    let Ok(start_re) = Regex::new(&window.start) else {
        tracing::warn!(pattern = %window.start, "invalid window start pattern");
        return text;
    };
    let Some(start) = start_re.find(text).map(|m| m.start()) else {
        return text;
    };
    let rest = &text[start..];

    if window.end_markers.is_empty() {
        return rest;
    }
    let alternation = window
        .end_markers
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&format!("(?i){alternation}")) {
        Ok(end_re) => match end_re.find(rest) {
            Some(m) => &rest[..m.start()],
            None => rest,
        },
        Err(_) => rest,
    }
}

/// Restore the line structure lost when tags were stripped.
pub fn inject_line_breaks(text: &str) -> String {
    static RE_MONTH: OnceCell<Regex> = OnceCell::new();
    static RE_DAYLINE: OnceCell<Regex> = OnceCell::new();
    let re_month = RE_MONTH.get_or_init(|| Regex::new(&format!(r"\s+({MONTHS_SV})\s")).unwrap());
    let re_dayline = RE_DAYLINE
        .get_or_init(|| Regex::new(&format!(r"\s+(\d{{1,2}}\s+(?:{WEEKDAYS_SV}))")).unwrap());

    let out = re_month.replace_all(text, "\n\n$1\n");
    let out = re_dayline.replace_all(&out, "\n$1");
    out.trim().to_string()
}

/// Full cleanup: markup → plain text → schedule window → line structure.
pub fn extract_schedule_text(html: &str, window: &TextWindow) -> String {
    let plain = strip_markup(html);
    let sliced = slice_window(&plain, window);
    inject_line_breaks(sliced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_decodes_and_collapses() {
        let html = "<p>Liturgi&nbsp;&amp;\n\n<b>Vesper</b></p><script>var x = '<p>';</script>";
        assert_eq!(strip_markup(html), "Liturgi & Vesper");
    }

    #[test]
    fn window_cuts_between_markers() {
        let w = TextWindow::month_schedule(&["bottom of page"]);
        let text = "Meny Hem Februari 1 Söndag Liturgi 10:00 bottom of page footer";
        assert_eq!(slice_window(text, &w), "Februari 1 Söndag Liturgi 10:00 ");
    }

    #[test]
    fn window_without_start_keeps_everything() {
        let w = TextWindow::month_schedule(&["bottom of page"]);
        assert_eq!(slice_window("nothing here", &w), "nothing here");
    }

    #[test]
    fn line_breaks_before_months_and_day_lines() {
        let text = "Februari 1 Söndag Liturgi 10:00 7 Lördag Vigilia 17:00 Mars 1 Söndag Liturgi";
        let out = inject_line_breaks(text);
        assert_eq!(
            out,
            "Februari\n1 Söndag Liturgi 10:00\n7 Lördag Vigilia 17:00\n\nMars\n1 Söndag Liturgi"
        );
    }
}
