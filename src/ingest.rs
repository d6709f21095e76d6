use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::DEFAULT_TOP_TERMS;
use crate::models::MentionRecord;
use crate::terms::extract_related_keywords;

const RELATIVE_MARKERS: [&str; 7] = ["전", "시간", "분", "일", "ago", "just now", "today"];

#[derive(Debug, Deserialize)]
struct CsvRow {
    keyword: String,
    #[serde(default)]
    posted_at: Option<String>,
    #[serde(default)]
    related_search_terms: Option<String>,
    #[serde(default)]
    related_keywords: Option<String>,
    #[serde(default)]
    source_key: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub record: MentionRecord,
    pub source_key: Option<String>,
}

/// Fresh posts are stamped "3시간 전" / "2 hours ago" by the crawler; pin those
/// (and blanks) to the crawl date. Everything else passes through for the
/// aggregator to parse or drop.
pub fn normalize_timestamp(raw: Option<&str>, crawl_date: NaiveDate) -> String {
    let value = raw.map(str::trim).unwrap_or_default();
    let lowered = value.to_lowercase();
    if value.is_empty() || RELATIVE_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        crawl_date.to_string()
    } else {
        value.to_string()
    }
}

pub fn read_mentions<R: Read>(reader: R, crawl_date: NaiveDate) -> anyhow::Result<Vec<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid CSV row {}", line + 1))?;
        let keyword = row.keyword.trim().to_string();
        if keyword.is_empty() {
            tracing::warn!(row = line + 1, "skipping row without keyword");
            continue;
        }
        let related_keywords = row
            .related_keywords
            .filter(|value| !value.trim().is_empty())
            .or_else(|| {
                extract_related_keywords(
                    row.title.as_deref(),
                    row.body.as_deref(),
                    DEFAULT_TOP_TERMS,
                )
            });
        rows.push(ImportRow {
            record: MentionRecord {
                keyword,
                timestamp: normalize_timestamp(row.posted_at.as_deref(), crawl_date),
                related_search_terms: row.related_search_terms,
                related_keywords,
            },
            source_key: row.source_key.filter(|key| !key.trim().is_empty()),
        });
    }

    Ok(rows)
}

pub fn read_mentions_csv(path: &Path, crawl_date: NaiveDate) -> anyhow::Result<Vec<ImportRow>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let rows = read_mentions(file, crawl_date)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "read mentions CSV");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawl_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
    }

    #[test]
    fn relative_and_blank_timestamps_use_crawl_date() {
        for raw in ["3시간 전", "5분 전", "2 hours ago", "Just now", "", "   "] {
            assert_eq!(normalize_timestamp(Some(raw), crawl_date()), "2025-07-10");
        }
        assert_eq!(normalize_timestamp(None, crawl_date()), "2025-07-10");
    }

    #[test]
    fn absolute_timestamps_pass_through() {
        assert_eq!(normalize_timestamp(Some(" 2025.07.01. "), crawl_date()), "2025.07.01.");
        assert_eq!(normalize_timestamp(Some("garbage"), crawl_date()), "garbage");
    }

    #[test]
    fn reads_rows_with_optional_columns() {
        let data = "\
keyword,posted_at,related_search_terms,related_keywords,source_key
manual therapy,2025.07.09.,\"neck, price\",,post-1
manual therapy,1시간 전,,stretch,
,2025-07-09,,,post-3
";
        let rows = read_mentions(data.as_bytes(), crawl_date()).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].record.timestamp, "2025.07.09.");
        assert_eq!(rows[0].record.related_search_terms.as_deref(), Some("neck, price"));
        assert_eq!(rows[0].record.related_keywords, None);
        assert_eq!(rows[0].source_key.as_deref(), Some("post-1"));

        assert_eq!(rows[1].record.timestamp, "2025-07-10");
        assert_eq!(rows[1].record.related_keywords.as_deref(), Some("stretch"));
        assert_eq!(rows[1].source_key, None);
    }

    #[test]
    fn related_keywords_derived_from_post_text_when_blank() {
        let data = "\
keyword,posted_at,related_keywords,title,body
posture,2025-07-08,,Desk posture tips,\"desk stretch and desk height, a stretch\"
posture,2025-07-08,\"chair, lumbar\",Desk posture tips,desk desk desk
posture,2025-07-08,,,
";
        let rows = read_mentions(data.as_bytes(), crawl_date()).unwrap();
        assert_eq!(
            rows[0].record.related_keywords.as_deref(),
            Some("desk, stretch, Desk")
        );
        assert_eq!(rows[1].record.related_keywords.as_deref(), Some("chair, lumbar"));
        assert_eq!(rows[2].record.related_keywords, None);
    }

    #[test]
    fn minimal_columns_are_enough() {
        let data = "keyword,posted_at\nposture,2025-07-08\n";
        let rows = read_mentions(data.as_bytes(), crawl_date()).unwrap();
        assert_eq!(rows[0].record.keyword, "posture");
        assert_eq!(rows[0].record.related_search_terms, None);
    }

    #[test]
    fn reads_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mentions.csv");
        std::fs::write(&path, "keyword,posted_at\nposture,2025-07-08\n").unwrap();
        assert_eq!(read_mentions_csv(&path, crawl_date()).unwrap().len(), 1);
        assert!(read_mentions_csv(&dir.path().join("nope.csv"), crawl_date()).is_err());
    }
}
