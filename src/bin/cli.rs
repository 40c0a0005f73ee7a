//! snoocrawl CLI
//!
//! Crawls one or more subreddits over a UTC date window and writes
//! newline-delimited JSON records, one `(submission, tree)` pair per line.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use snoocrawl::{
    client::HttpSession,
    error::{AppError, Result},
    models::{Config, DateWindow},
    pipeline::{self, CrawlRecord},
};

/// snoocrawl - date-bounded subreddit crawler
#[derive(Parser, Debug)]
#[command(
    name = "snoocrawl",
    version,
    about = "Date-bounded Reddit submission and comment crawler"
)]
struct Cli {
    /// Subreddits to crawl (without the r/ prefix)
    #[arg(required = true)]
    subreddits: Vec<String>,

    /// Window start, inclusive: YYYY-MM-DD or RFC 3339
    #[arg(long)]
    start: String,

    /// Window end, exclusive: YYYY-MM-DD or RFC 3339
    #[arg(long)]
    end: String,

    /// Write NDJSON records here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip submissions below this score
    #[arg(long)]
    min_score: Option<i64>,

    /// Only keep submissions with this flair (repeatable)
    #[arg(long = "flair")]
    flairs: Vec<String>,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Parse a window bound: full RFC 3339, or a plain date taken as UTC
/// midnight.
fn parse_bound(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            AppError::config(format!(
                "invalid date {input:?}: use YYYY-MM-DD or RFC 3339"
            ))
        })
}

/// Write one record as a single NDJSON line.
fn write_record(writer: &mut dyn Write, record: &CrawlRecord) -> Result<()> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    if cli.min_score.is_some() {
        config.filter.min_score = cli.min_score;
    }
    if !cli.flairs.is_empty() {
        config.filter.flairs = cli.flairs.clone();
    }
    config.validate()?;

    // Window validation happens before any network activity.
    let window = DateWindow::new(parse_bound(&cli.start)?, parse_bound(&cli.end)?)?;

    log::info!(
        "Crawling {} subreddit(s) in [{}, {})",
        cli.subreddits.len(),
        window.start,
        window.end
    );

    let config = Arc::new(config);
    let session = Arc::new(HttpSession::new(Arc::clone(&config))?);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupt received - finishing in-flight work...");
                cancel.cancel();
            }
        });
    }

    let mut writer: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    let (tx, mut rx) = mpsc::channel(64);
    let run = pipeline::run_crawl(
        session,
        Arc::clone(&config),
        cli.subreddits.clone(),
        window,
        cancel.clone(),
        tx,
    );
    let consume = async {
        while let Some(record) = rx.recv().await {
            write_record(writer.as_mut(), &record)?;
        }
        writer.flush()?;
        Ok::<(), AppError>(())
    };

    let (summary, written) = tokio::join!(run, consume);
    written?;
    let summary = summary?;

    log::info!("Submissions written: {}", summary.records_emitted);
    log::info!("Comments written: {}", summary.comments_emitted);
    if summary.duplicates_skipped > 0 {
        log::info!("Duplicates skipped: {}", summary.duplicates_skipped);
    }
    if summary.trees_incomplete > 0 {
        log::warn!("Trees with unresolved gaps: {}", summary.trees_incomplete);
    }
    for failure in &summary.failures {
        log::error!("r/{}: {}", failure.subreddit, failure.message);
    }
    if summary.cancelled {
        log::warn!("Run was cancelled before completion.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    use chrono::TimeZone;
    use snoocrawl::models::{CommentTree, Submission};

    #[test]
    fn test_parse_bound_accepts_plain_dates() {
        let ts = parse_bound("2024-06-01").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_bound_accepts_rfc3339() {
        let ts = parse_bound("2024-06-01T12:30:00Z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_bound_rejects_garbage() {
        assert!(parse_bound("yesterday").is_err());
        assert!(parse_bound("2024-13-01").is_err());
    }

    #[test]
    fn test_write_record_emits_one_line_per_record() {
        let record = CrawlRecord {
            submission: Submission {
                id: "abc".into(),
                subreddit: "rust".into(),
                title: "title".into(),
                author: Some("alice".into()),
                selftext: String::new(),
                created_utc: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
                score: 1,
                num_comments: 0,
                permalink: "/r/rust/comments/abc/".into(),
                url: "https://reddit.com/r/rust/comments/abc/".into(),
                link_flair_text: None,
            },
            tree: CommentTree::empty("abc"),
        };

        let mut file = tempfile::tempfile().unwrap();
        write_record(&mut file, &record).unwrap();
        write_record(&mut file, &record).unwrap();

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["submission"]["id"], "abc");
        assert_eq!(parsed["tree"]["complete"], true);
    }
}
