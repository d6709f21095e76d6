use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{Duration, NaiveDate};

use crate::aggregate::{daily_counts, parse_mention_date, recent_window, window_start};
use crate::config::AnalysisConfig;
use crate::drop::detect_drop;
use crate::models::{AnomalyLevel, AnomalyReport, KeywordReport, MentionRecord, SensitivityProfile};
use crate::sensitivity::select_sensitivity;
use crate::status::classify_status;
use crate::terms::top_terms;
use crate::threshold::rolling_threshold;

/// Runs the anomaly engine over one keyword's timestamps. `as_of` is the real
/// current date and `today_count` the mentions dated on it; the recent window
/// itself anchors to the latest observed date, so `as_of` may fall outside it.
pub fn evaluate_anomaly<'a, I>(
    timestamps: I,
    as_of: NaiveDate,
    today_count: u64,
    config: &AnalysisConfig,
) -> (AnomalyReport, Option<SensitivityProfile>)
where
    I: IntoIterator<Item = &'a str>,
{
    let series = daily_counts(timestamps);
    let recent = recent_window(&series, config.recent_days);

    if recent.is_empty() {
        let report = AnomalyReport {
            anomalous_dates: Vec::new(),
            today_threshold: None,
            threshold_series: Vec::new(),
            today_count,
            drop_ratio: None,
            recent_peak: None,
            status: AnomalyLevel::NoData,
        };
        return (report, None);
    }

    let profile = select_sensitivity(&series, &recent);
    let model = rolling_threshold(&recent, config.rolling_window, profile.k, as_of);
    let drop = detect_drop(&recent, as_of, config.drop_ratio_threshold);
    let status = classify_status(today_count, model.today_threshold, profile.attention_factor);

    let report = AnomalyReport {
        anomalous_dates: model.anomalous_dates,
        today_threshold: model.today_threshold,
        threshold_series: model.days,
        today_count,
        drop_ratio: drop.ratio(),
        recent_peak: drop.peak(),
        status,
    };
    (report, Some(profile))
}

pub fn build_keyword_report(
    keyword: &str,
    records: &[&MentionRecord],
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> KeywordReport {
    let dated: Vec<(NaiveDate, &MentionRecord)> = records
        .iter()
        .filter_map(|record| parse_mention_date(&record.timestamp).map(|date| (date, *record)))
        .collect();

    let total_count = dated.len();
    let cutoff = window_start(as_of, config.recent_days);
    let recent_count = dated.iter().filter(|(date, _)| *date >= cutoff).count();
    let recent_share_pct = if total_count == 0 {
        0.0
    } else {
        recent_count as f64 / total_count as f64 * 100.0
    };

    let yesterday = as_of - Duration::days(1);
    let today_count = dated.iter().filter(|(date, _)| *date == as_of).count();
    let yesterday_count = dated.iter().filter(|(date, _)| *date == yesterday).count();
    let day_delta = today_count as i64 - yesterday_count as i64;
    let change_pct = if yesterday_count > 0 {
        Some(day_delta as f64 / yesterday_count as f64 * 100.0)
    } else {
        None
    };

    let (anomaly, sensitivity) = evaluate_anomaly(
        dated.iter().map(|(_, record)| record.timestamp.as_str()),
        as_of,
        today_count as u64,
        config,
    );

    let top_search_terms = top_terms(
        dated.iter().map(|(_, record)| record.related_search_terms.as_deref()),
        &config.term_delimiter,
        config.top_terms,
    );
    let top_related_keywords = top_terms(
        dated.iter().map(|(_, record)| record.related_keywords.as_deref()),
        &config.term_delimiter,
        config.top_terms,
    );

    tracing::debug!(
        keyword,
        total_count,
        status = anomaly.status.label(),
        k = sensitivity.map(|profile| profile.k),
        recency_ratio = sensitivity.map(|profile| profile.recency_ratio),
        "evaluated keyword"
    );

    KeywordReport {
        keyword: keyword.to_string(),
        total_count,
        recent_count,
        recent_share_pct,
        today_count,
        yesterday_count,
        day_delta,
        change_pct,
        drop_alert: anomaly.drop_ratio.is_some(),
        status: anomaly.status,
        top_search_terms,
        top_related_keywords,
        sensitivity,
        anomaly,
    }
}

/// One row per keyword, sorted by keyword.
pub fn build_report(
    records: &[MentionRecord],
    as_of: NaiveDate,
    config: &AnalysisConfig,
) -> Vec<KeywordReport> {
    let mut groups: BTreeMap<&str, Vec<&MentionRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.keyword.as_str()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(keyword, group)| build_keyword_report(keyword, &group, as_of, config))
        .collect()
}

pub fn format_recent_share(row: &KeywordReport) -> String {
    format!("{} ({:.1}%)", row.recent_count, row.recent_share_pct)
}

pub fn format_today(row: &KeywordReport) -> String {
    let change = match row.change_pct {
        Some(pct) => format!("{pct:+.1}%"),
        None => "not computable".to_string(),
    };
    format!(
        "{} (vs yesterday {}: {:+} / {})",
        row.today_count, row.yesterday_count, row.day_delta, change
    )
}

pub fn format_drop(row: &KeywordReport) -> &'static str {
    if row.drop_alert {
        "DROP"
    } else {
        "none"
    }
}

pub fn render_markdown(as_of: NaiveDate, config: &AnalysisConfig, rows: &[KeywordReport]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Keyword Trend Report");
    let _ = writeln!(
        output,
        "Generated for {} (recent window {} days, rolling window {}, drop ratio {:.2})",
        as_of, config.recent_days, config.rolling_window, config.drop_ratio_threshold
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Keyword Status");

    if rows.is_empty() {
        let _ = writeln!(output, "No mentions recorded.");
        return output;
    }

    let _ = writeln!(
        output,
        "| Keyword | Total | Recent {} days (share) | Today | Drop alert | Status | Top search terms | Top related keywords |",
        config.recent_days
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|");
    for row in rows {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} |",
            row.keyword,
            row.total_count,
            format_recent_share(row),
            format_today(row),
            format_drop(row),
            row.status.label(),
            row.top_search_terms.join(", "),
            row.top_related_keywords.join(", ")
        );
    }

    let flagged: Vec<&KeywordReport> = rows
        .iter()
        .filter(|row| !row.anomaly.anomalous_dates.is_empty() || row.drop_alert)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Anomaly Detail");

    if flagged.is_empty() {
        let _ = writeln!(output, "No anomalous days or drops in the recent window.");
    } else {
        for row in flagged {
            let dates: Vec<String> = row
                .anomaly
                .anomalous_dates
                .iter()
                .map(|date| date.to_string())
                .collect();
            let threshold = row
                .anomaly
                .today_threshold
                .map(|value| format!("{value:.2}"))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = write!(
                output,
                "- {}: anomalous days [{}], today's threshold {}",
                row.keyword,
                dates.join(", "),
                threshold
            );
            if let (Some(ratio), Some(peak)) = (row.anomaly.drop_ratio, row.anomaly.recent_peak) {
                let _ = write!(output, ", today at {:.1}% of recent peak {}", ratio * 100.0, peak);
            }
            let _ = writeln!(output);
        }
    }

    output
}

pub fn render_json(rows: &[KeywordReport]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(rows)?)
}
