use chrono::NaiveDate;

use crate::models::{DailyCountSeries, DropOutcome};

const MIN_WINDOW_ENTRIES: usize = 3;

/// Compares today's count with the peak of the rest of the recent window.
pub fn detect_drop(recent: &DailyCountSeries, today: NaiveDate, drop_ratio: f64) -> DropOutcome {
    if recent.len() < MIN_WINDOW_ENTRIES {
        return DropOutcome::NotApplicable;
    }
    let Some(today_count) = recent.get(today) else {
        return DropOutcome::NotApplicable;
    };

    let peak = recent
        .iter()
        .filter(|(date, _)| *date != today)
        .map(|(_, count)| count)
        .max()
        .unwrap_or(0);
    if peak == 0 {
        return DropOutcome::NotApplicable;
    }

    let ratio = today_count as f64 / peak as f64;
    if ratio < drop_ratio {
        DropOutcome::Drop { ratio, peak }
    } else {
        DropOutcome::NoDrop { peak }
    }
}
