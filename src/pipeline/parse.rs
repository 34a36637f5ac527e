//! Document parsing adapter: call the parse service, cache its output.
//!
//! The service takes a multipart POST — the PDF binary plus two flags
//! selecting which element categories get base64 visuals and which rendered
//! formats to emit — and returns the element stream described in
//! [`crate::document`]. The response JSON is persisted verbatim at
//! `<data>/parses/<id>.json`; like acquisition, presence of that file makes
//! the call a no-op.

use crate::config::FeedConfig;
use crate::document::ParsedDocument;
use crate::error::PaperError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Element categories the service is asked to return base64 visuals for.
const BASE64_CATEGORIES: &str = "['table', 'figure', 'chart', 'caption', 'paragraph']";

/// Rendered formats requested for every element.
const OUTPUT_FORMATS: &str = "['text', 'html']";

/// Ensure a parse result for `id` exists at its deterministic cache path.
///
/// Returns the path on success. A non-2xx response from the parse service is
/// a soft failure for this paper only.
pub async fn ensure_parsed(
    client: &reqwest::Client,
    pdf_path: &Path,
    id: &str,
    config: &FeedConfig,
) -> Result<PathBuf, PaperError> {
    let path = config.parse_path(id);
    if path.exists() {
        debug!("Parse result already cached for {id}: {}", path.display());
        return Ok(path);
    }

    let pdf_bytes = tokio::fs::read(pdf_path)
        .await
        .map_err(|e| PaperError::CacheIo {
            id: id.to_string(),
            path: pdf_path.to_path_buf(),
            source: e,
        })?;

    info!("Submitting PDF for {id} to the parse service ({} bytes)", pdf_bytes.len());

    let document_part = reqwest::multipart::Part::bytes(pdf_bytes)
        .file_name(format!("{id}.pdf"))
        .mime_str("application/pdf")
        .map_err(|e| PaperError::ParseFailed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    let form = reqwest::multipart::Form::new()
        .part("document", document_part)
        .text("base64_encoding", BASE64_CATEGORIES)
        .text("output_formats", OUTPUT_FORMATS);

    let mut request = client.post(&config.parse_api_url).multipart(form);
    if let Some(ref key) = config.parse_api_key {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(|e| PaperError::ParseFailed {
        id: id.to_string(),
        reason: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(PaperError::ParseFailed {
            id: id.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let body: serde_json::Value =
        response.json().await.map_err(|e| PaperError::ParseFailed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;

    let pretty =
        serde_json::to_string_pretty(&body).map_err(|e| PaperError::MalformedParse {
            id: id.to_string(),
            detail: e.to_string(),
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

    tokio::fs::write(&path, pretty)
        .await
        .map_err(|e| PaperError::CacheIo {
            id: id.to_string(),
            path: path.clone(),
            source: e,
        })?;

    debug!("Parse result for {id} written to cache");
    Ok(path)
}

/// Load a cached parse result into the typed document model.
pub async fn load_parsed(path: &Path, id: &str) -> Result<ParsedDocument, PaperError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PaperError::CacheIo {
            id: id.to_string(),
            path: path.to_path_buf(),
            source: e,
        })?;
    serde_json::from_str(&raw).map_err(|e| PaperError::MalformedParse {
        id: id.to_string(),
        detail: e.to_string(),
    })
}
