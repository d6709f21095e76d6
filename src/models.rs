use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::threshold::DailyThreshold;

/// One crawled mention of a keyword. The timestamp stays raw until the
/// aggregator parses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionRecord {
    pub keyword: String,
    pub timestamp: String,
    pub related_search_terms: Option<String>,
    pub related_keywords: Option<String>,
}

/// Per-date mention counts for a single keyword, ascending by date.
///
/// Dates with no mentions are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailyCountSeries {
    counts: BTreeMap<NaiveDate, u64>,
}

impl DailyCountSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, date: NaiveDate, count: u64) {
        *self.counts.entry(date).or_insert(0) += count;
    }

    pub fn get(&self, date: NaiveDate) -> Option<u64> {
        self.counts.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.counts.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.counts.iter().map(|(date, count)| (*date, *count))
    }

    /// Entries on or after `start`.
    pub fn since(&self, start: NaiveDate) -> Self {
        Self {
            counts: self
                .counts
                .range(start..)
                .map(|(date, count)| (*date, *count))
                .collect(),
        }
    }
}

impl FromIterator<(NaiveDate, u64)> for DailyCountSeries {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, u64)>>(iter: T) -> Self {
        let mut series = Self::new();
        for (date, count) in iter {
            series.add(date, count);
        }
        series
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityProfile {
    pub k: f64,
    pub attention_factor: f64,
    pub recency_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyLevel {
    NoData,
    Healthy,
    Caution,
    Warning,
}

impl AnomalyLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::NoData => "No data",
            Self::Healthy => "Healthy",
            Self::Caution => "Caution",
            Self::Warning => "Warning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropOutcome {
    NotApplicable,
    NoDrop { peak: u64 },
    Drop { ratio: f64, peak: u64 },
}

impl DropOutcome {
    pub fn ratio(&self) -> Option<f64> {
        match self {
            Self::Drop { ratio, .. } => Some(*ratio),
            _ => None,
        }
    }

    pub fn peak(&self) -> Option<u64> {
        match self {
            Self::NotApplicable => None,
            Self::NoDrop { peak } | Self::Drop { peak, .. } => Some(*peak),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub anomalous_dates: Vec<NaiveDate>,
    pub today_threshold: Option<f64>,
    pub threshold_series: Vec<DailyThreshold>,
    pub today_count: u64,
    pub drop_ratio: Option<f64>,
    pub recent_peak: Option<u64>,
    pub status: AnomalyLevel,
}

/// One output row of the trend report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordReport {
    pub keyword: String,
    pub total_count: usize,
    pub recent_count: usize,
    pub recent_share_pct: f64,
    pub today_count: usize,
    pub yesterday_count: usize,
    pub day_delta: i64,
    pub change_pct: Option<f64>,
    pub drop_alert: bool,
    pub status: AnomalyLevel,
    pub top_search_terms: Vec<String>,
    pub top_related_keywords: Vec<String>,
    pub sensitivity: Option<SensitivityProfile>,
    pub anomaly: AnomalyReport,
}
