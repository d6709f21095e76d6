use chrono::NaiveDate;
use serde::Serialize;

use crate::models::DailyCountSeries;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyThreshold {
    pub date: NaiveDate,
    pub count: u64,
    pub moving_avg: f64,
    pub moving_stddev: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdModel {
    pub days: Vec<DailyThreshold>,
    pub anomalous_dates: Vec<NaiveDate>,
    pub today_threshold: Option<f64>,
}

/// Rolling mean + `k` sample standard deviations over the trailing `window`
/// entries of the recent series. Windows count observed entries, not calendar
/// days, so gaps compress the window.
pub fn rolling_threshold(
    recent: &DailyCountSeries,
    window: usize,
    k: f64,
    today: NaiveDate,
) -> ThresholdModel {
    let window = window.max(1);
    let entries: Vec<(NaiveDate, u64)> = recent.iter().collect();
    let mut model = ThresholdModel::default();

    for (index, &(date, count)) in entries.iter().enumerate() {
        let start = (index + 1).saturating_sub(window);
        let samples: Vec<f64> = entries[start..=index]
            .iter()
            .map(|(_, value)| *value as f64)
            .collect();
        let moving_avg = mean(&samples);
        let moving_stddev = sample_stddev(&samples, moving_avg);
        let threshold = moving_avg + k * moving_stddev;

        if count as f64 > threshold {
            model.anomalous_dates.push(date);
        }
        if date == today {
            model.today_threshold = Some(threshold);
        }
        model.days.push(DailyThreshold {
            date,
            count,
            moving_avg,
            moving_stddev,
            threshold,
        });
    }

    model
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn sample_stddev(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let variance = samples
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (samples.len() - 1) as f64;
    variance.sqrt()
}
