use chrono::{Duration, NaiveDate};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::ingest::ImportRow;
use crate::models::MentionRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Inserts a small two-keyword history ending on `today`.
pub async fn seed(pool: &PgPool, today: NaiveDate) -> anyhow::Result<usize> {
    let history: [(&str, [u32; 8], &str, &str); 2] = [
        (
            "manual therapy",
            [2, 3, 1, 2, 3, 2, 3, 14],
            "manual therapy price, neck pain, posture",
            "clinic, session, shoulder",
        ),
        (
            "posture correction",
            [6, 7, 5, 8, 6, 7, 6, 1],
            "posture brace, desk setup",
            "stretch, back, office",
        ),
    ];

    let mut inserted = 0usize;
    for (keyword, daily, search_terms, related) in history {
        for (offset, count) in daily.iter().enumerate() {
            let day = today - Duration::days((daily.len() - 1 - offset) as i64);
            for n in 0..*count {
                let source_key = format!("seed-{}-{}-{}", keyword.replace(' ', "-"), day, n);
                let record = MentionRecord {
                    keyword: keyword.to_string(),
                    timestamp: day.format("%Y.%m.%d.").to_string(),
                    related_search_terms: Some(search_terms.to_string()),
                    related_keywords: Some(related.to_string()),
                };
                if insert_mention(pool, &record, &source_key).await? {
                    inserted += 1;
                }
            }
        }
    }

    Ok(inserted)
}

async fn insert_mention(
    pool: &PgPool,
    record: &MentionRecord,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO trend_watch.mentions
        (id, keyword, posted_at, related_search_terms, related_keywords, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&record.keyword)
    .bind(&record.timestamp)
    .bind(&record.related_search_terms)
    .bind(&record.related_keywords)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn fetch_mentions(
    pool: &PgPool,
    keyword: Option<&str>,
) -> anyhow::Result<Vec<MentionRecord>> {
    let mut query = String::from(
        "SELECT keyword, posted_at, related_search_terms, related_keywords \
         FROM trend_watch.mentions",
    );
    if keyword.is_some() {
        query.push_str(" WHERE keyword = $1");
    }
    query.push_str(" ORDER BY keyword, ingested_at");

    let mut rows = sqlx::query(&query);
    if let Some(value) = keyword {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut mentions = Vec::with_capacity(records.len());

    for row in records {
        mentions.push(MentionRecord {
            keyword: row.get("keyword"),
            timestamp: row.get("posted_at"),
            related_search_terms: row.get("related_search_terms"),
            related_keywords: row.get("related_keywords"),
        });
    }

    Ok(mentions)
}

pub async fn import_rows(pool: &PgPool, rows: &[ImportRow]) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for row in rows {
        let source_key = row
            .source_key
            .clone()
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_mention(pool, &row.record, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}
