// src/extract/translate.rs
//! Lookup tables from Serbian (Cyrillic and Latin) and English terms to Swedish.
//! Matching is substring containment: source markup embeds the terms in longer phrases.

use chrono::Weekday;

/// Day token that never matches a calendar day; no holiday calendar is consulted.
pub const HOLIDAY: &str = "helgdag";

pub const WEEKDAYS_SV: [&str; 7] = [
    "måndag", "tisdag", "onsdag", "torsdag", "fredag", "lördag", "söndag",
];

const SERVICE_NAMES: &[(&str, &str)] = &[
    ("Јутрење", "Morgongudstjänst"),
    ("Литургија", "Helig Liturgi"),
    ("Вечерње", "Aftongudstjänst"),
    ("Jutrenje", "Morgongudstjänst"),
    ("Liturgija", "Helig Liturgi"),
    ("Večernje", "Aftongudstjänst"),
];

const DAY_TOKENS: &[(&[&str], &str)] = &[
    (&["понедељак", "ponedeljak", "måndag", "monday"], "måndag"),
    (&["уторак", "utorak", "tisdag", "tuesday"], "tisdag"),
    (&["среда", "sreda", "onsdag", "wednesday"], "onsdag"),
    (&["четвртак", "četvrtak", "torsdag", "thursday"], "torsdag"),
    (&["петак", "petak", "fredag", "friday"], "fredag"),
    (&["субота", "subota", "lördag", "saturday"], "lördag"),
    (&["недеља", "nedelja", "söndag", "sunday"], "söndag"),
    (&["празник", "praznik", "helgdag", "holiday"], HOLIDAY),
];

const WORKING_DAYS: &[&str] = &["радни дани", "radni dan", "vardagar", "working day", "weekday"];

const DAILY: &[&str] = &[
    "свакодневно",
    "сваки дан",
    "svakodnevno",
    "svaki dan",
    "dagligen",
    "varje dag",
    "daily",
    "every day",
];

/// Swedish name for a Serbian service name, or the input unchanged.
pub fn translate_service_name(name: &str) -> String {
    let lower = name.to_lowercase();
    for (serbian, swedish) in SERVICE_NAMES {
        if name.contains(serbian) || lower.contains(&serbian.to_lowercase()) {
            return swedish.to_string();
        }
    }
    name.trim().to_string()
}

/// Swedish name of the first known service mentioned anywhere in `s`.
pub fn find_service_name(s: &str) -> Option<&'static str> {
    let lower = s.to_lowercase();
    SERVICE_NAMES
        .iter()
        .find(|(serbian, _)| lower.contains(&serbian.to_lowercase()))
        .map(|(_, swedish)| *swedish)
}

/// True when the text says "every day" in any supported language.
pub fn is_daily(s: &str) -> bool {
    let lower = s.to_lowercase();
    DAILY.iter().any(|k| lower.contains(k))
}

/// Swedish lowercase day tokens mentioned in `s`, in table order, without duplicates.
///
/// "Daily" phrases expand to all seven days, "working days" to Monday–Friday.
pub fn parse_days(s: &str) -> Vec<String> {
    if is_daily(s) {
        return WEEKDAYS_SV.iter().map(|d| d.to_string()).collect();
    }
    let lower = s.to_lowercase();
    if WORKING_DAYS.iter().any(|k| lower.contains(k)) {
        return WEEKDAYS_SV[..5].iter().map(|d| d.to_string()).collect();
    }

    // Word-prefix match: "ponedeljak" (Monday) contains "nedelja" (Sunday).
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let mut days: Vec<String> = Vec::new();
    for (patterns, swedish) in DAY_TOKENS {
        let hit = patterns
            .iter()
            .any(|p| words.iter().any(|w| w.starts_with(p)));
        if hit && !days.iter().any(|d| d == swedish) {
            days.push(swedish.to_string());
        }
    }
    days
}

/// Capitalized Swedish label, e.g. `Söndag`.
pub fn weekday_label_sv(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Måndag",
        Weekday::Tue => "Tisdag",
        Weekday::Wed => "Onsdag",
        Weekday::Thu => "Torsdag",
        Weekday::Fri => "Fredag",
        Weekday::Sat => "Lördag",
        Weekday::Sun => "Söndag",
    }
}

/// Lowercase Swedish token as used in recurrence day sets.
pub fn weekday_token_sv(day: Weekday) -> &'static str {
    WEEKDAYS_SV[day.num_days_from_monday() as usize]
}

/// Swedish token for an English or schema.org day (`Sunday`, `https://schema.org/Sunday`).
pub fn english_day_to_sv(day: &str) -> Option<&'static str> {
    let tail = day.rsplit('/').next().unwrap_or(day).trim();
    let wd: Weekday = tail.parse().ok()?;
    Some(weekday_token_sv(wd))
}

/// Uppercase the first character, lowercase the rest (`SÖNDAG` → `Söndag`).
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_match_inside_phrases() {
        assert_eq!(translate_service_name("Света Литургија"), "Helig Liturgi");
        assert_eq!(translate_service_name("jutrenje"), "Morgongudstjänst");
        assert_eq!(translate_service_name(" Akatist "), "Akatist");
    }

    #[test]
    fn finds_service_name_in_longer_text() {
        assert_eq!(find_service_name("Večernje subota"), Some("Aftongudstjänst"));
        assert_eq!(find_service_name("недеља Литургија"), Some("Helig Liturgi"));
        assert_eq!(find_service_name("nedelja i praznik"), None);
    }

    #[test]
    fn day_lists_in_three_languages() {
        assert_eq!(parse_days("ponedeljak, petak"), vec!["måndag", "fredag"]);
        assert_eq!(parse_days("субота и недеља"), vec!["lördag", "söndag"]);
        assert_eq!(parse_days("радни дани").len(), 5);
        assert_eq!(parse_days("svaki dan").len(), 7);
        assert_eq!(parse_days("недеља и празник"), vec!["söndag", HOLIDAY]);
    }

    #[test]
    fn monday_is_not_mistaken_for_sunday() {
        assert_eq!(parse_days("понедељак"), vec!["måndag"]);
        assert_eq!(parse_days("Ponedeljak"), vec!["måndag"]);
    }

    #[test]
    fn english_days_map_to_swedish_tokens() {
        assert_eq!(english_day_to_sv("Sunday"), Some("söndag"));
        assert_eq!(english_day_to_sv("https://schema.org/Saturday"), Some("lördag"));
        assert_eq!(english_day_to_sv("Someday"), None);
    }

    #[test]
    fn capitalize_handles_non_ascii() {
        assert_eq!(capitalize("söndag"), "Söndag");
        assert_eq!(capitalize("LÖRDAG"), "Lördag");
    }
}
