//! Document acquisition: ensure a paper's PDF exists in the cache.
//!
//! The cache is an arena of files keyed by identifier — `<data>/pdfs/<id>.pdf`
//! — and the file's presence is the source of truth for "already downloaded".
//! Acquisition is therefore idempotent: a second call for the same identifier
//! performs no network traffic at all.

use crate::config::FeedConfig;
use crate::error::PaperError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Ensure a PDF for `id` exists at its deterministic cache path.
///
/// Returns the path on success. A non-2xx response or transport failure is a
/// soft failure — the caller skips this paper and continues the batch.
pub async fn ensure_pdf(
    client: &reqwest::Client,
    id: &str,
    config: &FeedConfig,
) -> Result<PathBuf, PaperError> {
    let path = config.pdf_path(id);
    if path.exists() {
        debug!("PDF already cached for {id}: {}", path.display());
        return Ok(path);
    }

    let url = config.pdf_url(id);
    info!("Downloading PDF for {id} from {url}");

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| PaperError::DownloadFailed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(PaperError::DownloadFailed {
            id: id.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PaperError::DownloadFailed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PaperError::CacheIo {
                id: id.to_string(),
                path: path.clone(),
                source: e,
            })?;
    }

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| PaperError::CacheIo {
            id: id.to_string(),
            path: path.clone(),
            source: e,
        })?;

    debug!("PDF for {id} written to cache ({} bytes)", bytes.len());
    Ok(path)
}
