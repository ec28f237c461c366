// tests/ingest_dedup.rs
use chrono::NaiveDate;
use ortodoxa_gudstjanster::ingest::types::{EventTemplate, ServiceName};
use ortodoxa_gudstjanster::ingest::{dedup_events, upcoming_sorted};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn repeated_entries_from_overlapping_images_are_collapsed() {
    let t = EventTemplate::new("St. Georgios Cathedral");
    let mut a = t.event(d(2026, 2, 1), "Söndag", "Divine Liturgy");
    a.time = Some("09:30".into());
    let mut b = t.event(d(2026, 2, 1), "Sunday", "  divine   LITURGY");
    b.time = Some("09:30".into());
    let mut c = t.event(d(2026, 2, 1), "Söndag", "Divine Liturgy");
    c.time = Some("18:00".into()); // same name, other time
    let no_time = t.event(d(2026, 2, 1), "Söndag", "Divine Liturgy");

    let kept = dedup_events(vec![a.clone(), b, c, no_time], "sv");
    assert_eq!(kept.len(), 3);
    // the first occurrence wins, label included
    assert_eq!(kept[0], a);
}

#[test]
fn localized_names_compare_in_the_requested_language() {
    let t = EventTemplate::new("Finska Ortodoxa Församlingen");
    let mut fi_sv = std::collections::BTreeMap::new();
    fi_sv.insert("fi".to_string(), "Liturgia".to_string());
    fi_sv.insert("sv".to_string(), "Liturgi".to_string());
    let localized = t.event(d(2026, 11, 1), "Söndag", ServiceName::Localized(fi_sv));
    let plain_sv = t.event(d(2026, 11, 1), "Söndag", "Liturgi");
    let plain_fi = t.event(d(2026, 11, 1), "Söndag", "Liturgia");

    let kept = dedup_events(vec![localized.clone(), plain_sv.clone(), plain_fi.clone()], "sv");
    assert_eq!(kept, vec![localized.clone(), plain_fi.clone()]);

    let kept = dedup_events(vec![localized.clone(), plain_sv.clone(), plain_fi], "fi");
    assert_eq!(kept, vec![localized, plain_sv]);
}

#[test]
fn feed_drops_past_days_and_orders_all_day_events_first() {
    let t = EventTemplate::new("S");
    let today = d(2026, 10, 17);
    let mut evening = t.event(d(2026, 10, 18), "Söndag", "Vesper");
    evening.time = Some("17:00".into());
    let mut morning = t.event(d(2026, 10, 18), "Söndag", "Liturgi");
    morning.time = Some("10:00".into());
    let all_day = t.event(d(2026, 10, 18), "Söndag", "Kyrkkaffe");
    let mut today_ev = t.event(today, "Lördag", "Vigilia");
    today_ev.time = Some("18:00".into());
    let past = t.event(d(2026, 10, 16), "Fredag", "Akathist");

    let out = upcoming_sorted(vec![evening, past, morning, all_day, today_ev], today);
    let names: Vec<&str> = out.iter().map(|e| e.service_name.display("sv")).collect();
    assert_eq!(names, vec!["Vigilia", "Kyrkkaffe", "Liturgi", "Vesper"]);
}
