use std::collections::HashMap;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

use crate::models::DailyCountSeries;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parses a crawler timestamp into a calendar date, truncating any time part.
pub fn parse_mention_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    let value = value.strip_suffix('.').unwrap_or(value);
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// Builds the daily count series from one keyword's raw timestamps.
///
/// Counting happens per distinct raw value before parsing; values that fail to
/// parse are dropped and values naming the same day are merged.
pub fn daily_counts<'a, I>(timestamps: I) -> DailyCountSeries
where
    I: IntoIterator<Item = &'a str>,
{
    let mut per_value: HashMap<&str, u64> = HashMap::new();
    for raw in timestamps {
        *per_value.entry(raw).or_insert(0) += 1;
    }

    let mut series = DailyCountSeries::new();
    let mut dropped = 0u64;
    for (raw, count) in per_value {
        match parse_mention_date(raw) {
            Some(date) => series.add(date, count),
            None => {
                tracing::debug!(timestamp = raw, count, "dropping unparseable timestamp");
                dropped += count;
            }
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = series.total(), "aggregated daily counts");
    }
    series
}

/// First day of a `days`-long window ending on `anchor`, saturating at the
/// earliest representable date.
pub fn window_start(anchor: NaiveDate, days: u32) -> NaiveDate {
    let span = u64::from(days.max(1)) - 1;
    anchor.checked_sub_days(Days::new(span)).unwrap_or(NaiveDate::MIN)
}

/// The trailing `recent_days` of the series, anchored to its latest observed
/// date rather than the calendar.
pub fn recent_window(series: &DailyCountSeries, recent_days: u32) -> DailyCountSeries {
    match series.latest_date() {
        Some(latest) => series.since(window_start(latest, recent_days)),
        None => DailyCountSeries::new(),
    }
}
