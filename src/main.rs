use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod aggregate;
mod config;
mod db;
mod drop;
mod ingest;
mod models;
mod report;
mod sensitivity;
mod status;
mod terms;
mod threshold;

use config::{AnalysisConfig, ConfigOverrides};
use models::MentionRecord;

#[derive(Parser)]
#[command(name = "keyword-trend-watch")]
#[command(about = "Daily keyword mention trend and anomaly monitor", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data ending today
    Seed,
    /// Import crawled mentions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        /// Date assigned to relative timestamps such as "3 hours ago"
        #[arg(long)]
        crawl_date: Option<NaiveDate>,
    },
    /// Print one status line per keyword
    Status {
        #[command(flatten)]
        analysis: AnalysisArgs,
    },
    /// Write a trend report
    Report {
        #[command(flatten)]
        analysis: AnalysisArgs,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args)]
struct AnalysisArgs {
    /// Only evaluate this keyword
    #[arg(long)]
    keyword: Option<String>,
    /// Read mentions from a CSV file instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Reference date for "today" (defaults to the current UTC date)
    #[arg(long)]
    as_of: Option<NaiveDate>,
    /// TOML file with analysis settings
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    recent_days: Option<u32>,
    #[arg(long)]
    rolling_window: Option<usize>,
    #[arg(long)]
    drop_ratio: Option<f64>,
    #[arg(long)]
    top_terms: Option<usize>,
    #[arg(long)]
    term_delimiter: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

impl AnalysisArgs {
    fn resolve_config(&self) -> anyhow::Result<AnalysisConfig> {
        let cwd = std::env::current_dir().context("failed to resolve working directory")?;
        let config = AnalysisConfig::load(self.config.as_deref(), &cwd)?.with_overrides(
            ConfigOverrides {
                recent_days: self.recent_days,
                rolling_window: self.rolling_window,
                drop_ratio_threshold: self.drop_ratio,
                top_terms: self.top_terms,
                term_delimiter: self.term_delimiter.clone(),
            },
        )?;
        Ok(config)
    }

    async fn load_mentions(&self, as_of: NaiveDate) -> anyhow::Result<Vec<MentionRecord>> {
        let mentions: Vec<MentionRecord> = match &self.csv {
            Some(path) => ingest::read_mentions_csv(path, as_of)?
                .into_iter()
                .map(|row| row.record)
                .filter(|record| {
                    self.keyword
                        .as_deref()
                        .map_or(true, |keyword| record.keyword == keyword)
                })
                .collect(),
            None => {
                let pool = connect().await?;
                db::fetch_mentions(&pool, self.keyword.as_deref()).await?
            }
        };
        tracing::info!(mentions = mentions.len(), "loaded mentions");
        Ok(mentions)
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::InitDb => {
            let pool = connect().await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect().await?;
            let inserted = db::seed(&pool, today()).await?;
            println!("Seeded {inserted} mentions.");
        }
        Commands::Import { csv, crawl_date } => {
            let rows = ingest::read_mentions_csv(&csv, crawl_date.unwrap_or_else(today))?;
            let pool = connect().await?;
            let inserted = db::import_rows(&pool, &rows).await?;
            tracing::info!(read = rows.len(), inserted, "import finished");
            println!("Inserted {inserted} mentions from {}.", csv.display());
        }
        Commands::Status { analysis } => {
            let config = analysis.resolve_config()?;
            let as_of = analysis.as_of.unwrap_or_else(today);
            let mentions = analysis.load_mentions(as_of).await?;
            let rows = report::build_report(&mentions, as_of, &config);

            if rows.is_empty() {
                println!("No mentions found.");
                return Ok(());
            }

            println!("Keyword status as of {as_of}:");
            for row in &rows {
                println!(
                    "- {} [{}] total {}, recent {}, today {}, drop {}",
                    row.keyword,
                    row.status.label(),
                    row.total_count,
                    report::format_recent_share(row),
                    report::format_today(row),
                    report::format_drop(row)
                );
            }
        }
        Commands::Report {
            analysis,
            format,
            out,
        } => {
            let config = analysis.resolve_config()?;
            let as_of = analysis.as_of.unwrap_or_else(today);
            let mentions = analysis.load_mentions(as_of).await?;
            let rows = report::build_report(&mentions, as_of, &config);

            let rendered = match format {
                ReportFormat::Markdown => report::render_markdown(as_of, &config, &rows),
                ReportFormat::Json => report::render_json(&rows)?,
            };
            std::fs::write(&out, rendered)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
