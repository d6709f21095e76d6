use crate::models::{DailyCountSeries, SensitivityProfile};

/// Picks detection sensitivity from how concentrated volume is in the recent
/// window. Young, recent-heavy series get a tight `k` and a gentle escalation.
pub fn select_sensitivity(
    series: &DailyCountSeries,
    recent: &DailyCountSeries,
) -> SensitivityProfile {
    let total = series.total();
    let recency_ratio = if total == 0 {
        0.0
    } else {
        recent.total() as f64 / total as f64
    };

    let (k, attention_factor) = sensitivity_band(recency_ratio);
    SensitivityProfile {
        k,
        attention_factor,
        recency_ratio,
    }
}

pub fn sensitivity_band(recency_ratio: f64) -> (f64, f64) {
    if recency_ratio > 0.8 {
        (1.0, 1.2)
    } else if recency_ratio > 0.5 {
        (1.2, 1.25)
    } else if recency_ratio > 0.2 {
        (1.5, 1.3)
    } else {
        (2.0, 1.5)
    }
}
