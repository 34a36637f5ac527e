//! The daily digest: discover papers, extract content, post to the channel.
//!
//! The batch is strictly sequential and each paper runs inside its own fault
//! boundary: [`feed_paper`] returns a [`PaperError`] and the driver logs it,
//! counts it, and moves on. Only failures that make the whole run pointless
//! (listing unreachable, the digest header cannot be posted) surface as
//! [`FeedError`].
//!
//! One JSON snapshot per run is written under `<data>/papers/`, recording
//! the papers that completed acquisition and parsing together with their
//! cache paths.

use crate::config::{ensure_cache_dirs, FeedConfig};
use crate::discovery::{fetch_daily_papers, PaperCandidate};
use crate::error::{FeedError, PaperError};
use crate::pipeline::{acquire, images, parse};
use crate::slack::{paper_link_text, SlackClient};
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Called by the feed driver as it processes each paper.
///
/// All methods have default no-op implementations so callers only override
/// what they care about (the CLI renders a progress bar from these).
pub trait FeedProgress: Send + Sync {
    /// Discovery finished; `candidates` papers will be processed.
    fn on_discovery_complete(&self, _candidates: usize) {}
    /// Processing of one paper is starting. `index` is 1-based.
    fn on_paper_start(&self, _index: usize, _total: usize, _id: &str) {}
    /// One paper was fed, with `images` composites uploaded.
    fn on_paper_complete(&self, _index: usize, _total: usize, _id: &str, _images: usize) {}
    /// One paper was skipped.
    fn on_paper_error(&self, _index: usize, _total: usize, _id: &str, _error: &str) {}
}

/// Summary of one feed run.
#[derive(Debug, Clone, Serialize)]
pub struct FeedReport {
    /// Candidates surviving dedup, threshold, and truncation.
    pub discovered: usize,
    /// Papers fully posted to the channel.
    pub fed: usize,
    /// Papers dropped by their per-item fault boundary.
    pub skipped: usize,
    /// Composite images uploaded across all papers.
    pub images_uploaded: usize,
    /// Where this run's snapshot was written.
    pub snapshot_path: PathBuf,
    pub duration_ms: u64,
}

/// What one successfully fed paper leaves behind.
struct PaperOutcome {
    pdf_path: PathBuf,
    parse_path: PathBuf,
    images: usize,
}

#[derive(Serialize)]
struct SnapshotEntry<'a> {
    pdf_path: &'a Path,
    parse_path: &'a Path,
    #[serde(flatten)]
    paper: &'a PaperCandidate,
}

/// Run one feed batch: discovery, per-paper extraction, channel posting,
/// and the run snapshot.
pub async fn run_daily_feed(
    http: &reqwest::Client,
    slack: &SlackClient,
    channel: &str,
    config: &FeedConfig,
    progress: Option<&dyn FeedProgress>,
) -> Result<FeedReport, FeedError> {
    let start = Instant::now();

    ensure_cache_dirs(&config.data_dir)
        .await
        .map_err(|e| FeedError::Io {
            path: config.data_dir.clone(),
            source: e,
        })?;

    let papers = fetch_daily_papers(http, config).await?;
    info!("Discovery complete: {} papers", papers.len());
    if let Some(p) = progress {
        p.on_discovery_complete(papers.len());
    }

    let listing_date = config.listing_date();
    let header = format!(
        "_*Top {} papers at {}*_",
        papers.len(),
        listing_date.format("%Y-%m-%d")
    );
    slack.post_message(channel, &header, None).await?;

    let total = papers.len();
    let mut fed = 0usize;
    let mut skipped = 0usize;
    let mut images_uploaded = 0usize;
    let mut outcomes: Vec<(PaperOutcome, &PaperCandidate)> = Vec::new();

    for (i, paper) in papers.iter().enumerate() {
        let index = i + 1;
        if let Some(p) = progress {
            p.on_paper_start(index, total, &paper.arxiv_id);
        }

        match feed_paper(http, slack, channel, paper, config).await {
            Ok(outcome) => {
                fed += 1;
                images_uploaded += outcome.images;
                if let Some(p) = progress {
                    p.on_paper_complete(index, total, &paper.arxiv_id, outcome.images);
                }
                outcomes.push((outcome, paper));
            }
            Err(e) => {
                skipped += 1;
                warn!("Skipping paper {}: {e}", e.paper_id());
                if let Some(p) = progress {
                    p.on_paper_error(index, total, &paper.arxiv_id, &e.to_string());
                }
            }
        }
    }

    let snapshot_path = write_snapshot(config, &outcomes).await?;

    let report = FeedReport {
        discovered: total,
        fed,
        skipped,
        images_uploaded,
        snapshot_path,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Feed run complete: {}/{} papers, {} images, {}ms",
        report.fed, report.discovered, report.images_uploaded, report.duration_ms
    );
    Ok(report)
}

/// Process one paper end to end. Any failure here is this paper's alone.
async fn feed_paper(
    http: &reqwest::Client,
    slack: &SlackClient,
    channel: &str,
    paper: &PaperCandidate,
    config: &FeedConfig,
) -> Result<PaperOutcome, PaperError> {
    let id = &paper.arxiv_id;

    let pdf_path = acquire::ensure_pdf(http, id, config).await?;
    let parse_path = parse::ensure_parsed(http, &pdf_path, id, config).await?;

    let post_err = |e| PaperError::Post {
        id: id.clone(),
        source: e,
    };

    let ts = slack
        .post_message(channel, &paper_link_text(&paper.link, &paper.title), None)
        .await
        .map_err(post_err)?;

    if !paper.abstract_text.is_empty() {
        let abstract_message = format!("*Abstract*\n{}", paper.abstract_text);
        slack
            .post_message(channel, &abstract_message, Some(&ts))
            .await
            .map_err(post_err)?;
    }

    let doc = parse::load_parsed(&parse_path, id).await?;
    let composites = images::extract_images(&doc, id, config.max_images)?;
    let count = composites.len();

    for (i, composite) in composites.into_iter().enumerate() {
        slack
            .upload_file(
                channel,
                &format!("{id}.{i}.png"),
                &format!("{id}.{i}"),
                composite.png,
                Some(&ts),
            )
            .await
            .map_err(post_err)?;
    }

    Ok(PaperOutcome {
        pdf_path,
        parse_path,
        images: count,
    })
}

/// Persist the run snapshot: one JSON file listing the fed papers.
async fn write_snapshot(
    config: &FeedConfig,
    outcomes: &[(PaperOutcome, &PaperCandidate)],
) -> Result<PathBuf, FeedError> {
    let entries: Vec<SnapshotEntry<'_>> = outcomes
        .iter()
        .map(|(outcome, paper)| SnapshotEntry {
            pdf_path: &outcome.pdf_path,
            parse_path: &outcome.parse_path,
            paper,
        })
        .collect();

    let path = config.snapshot_path(Local::now().date_naive());
    let json = serde_json::to_string_pretty(&entries)
        .map_err(|e| FeedError::Internal(format!("snapshot serialisation: {e}")))?;

    tokio::fs::write(&path, json)
        .await
        .map_err(|e| FeedError::Io {
            path: path.clone(),
            source: e,
        })?;

    Ok(path)
}
