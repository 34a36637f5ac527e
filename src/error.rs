//! Error types for the paperfeed library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`FeedError`] — **Fatal for the operation at hand**: the listing page
//!   is unreachable, the configuration is invalid, no LLM provider could be
//!   resolved. Returned as `Err(FeedError)` from the top-level entry points.
//!
//! * [`PaperError`] — **Non-fatal**: a single paper failed (PDF host returned
//!   a 404, the parse service rejected the document, a base64 payload would
//!   not decode) but the rest of the batch is fine. Caught at the per-paper
//!   loop boundary in [`crate::feed`] so one bad paper never aborts the run.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! paper failure, log and continue, or collect all errors for a post-run
//! report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paperfeed library.
///
/// Per-paper failures use [`PaperError`] and are handled inside the batch
/// loop rather than propagated here.
#[derive(Debug, Error)]
pub enum FeedError {
    // ── Discovery errors ─────────────────────────────────────────────────
    /// The paper listing page could not be fetched.
    #[error("Failed to fetch listing '{url}': {reason}\nCheck your internet connection.")]
    ListingFetchFailed { url: String, reason: String },

    // ── LLM errors ───────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// Token encoding or decoding failed.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    // ── Chat-platform errors ─────────────────────────────────────────────
    /// A Slack Web API call failed.
    #[error(transparent)]
    Slack(#[from] SlackError),

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Could not read or write a file under the data directory.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached parse file exists but is not valid JSON of the expected shape.
    #[error("Malformed parse cache '{path}': {detail}")]
    MalformedCache { path: PathBuf, detail: String },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single paper.
///
/// Produced by the acquisition, parsing, and image-reconstruction stages and
/// caught at the per-paper boundary of [`crate::feed::run_daily_feed`].
/// The overall batch continues with the next paper.
#[derive(Debug, Error)]
pub enum PaperError {
    /// The PDF host returned a non-2xx status or the transfer failed.
    #[error("Paper {id}: PDF download failed: {reason}")]
    DownloadFailed { id: String, reason: String },

    /// The document-parse service returned a non-2xx status or the call failed.
    #[error("Paper {id}: document parse failed: {reason}")]
    ParseFailed { id: String, reason: String },

    /// A visual element's base64 payload was missing or would not decode.
    #[error("Paper {id}: image reconstruction failed: {detail}")]
    ImageExtraction { id: String, detail: String },

    /// Reading or writing a cache file for this paper failed.
    #[error("Paper {id}: cache I/O failed at '{path}': {source}")]
    CacheIo {
        id: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached parse file for this paper is not valid JSON.
    #[error("Paper {id}: malformed parse cache: {detail}")]
    MalformedParse { id: String, detail: String },

    /// Posting this paper's digest to the chat platform failed.
    #[error("Paper {id}: {source}")]
    Post {
        id: String,
        #[source]
        source: SlackError,
    },
}

impl PaperError {
    /// Identifier of the paper this error belongs to.
    pub fn paper_id(&self) -> &str {
        match self {
            PaperError::DownloadFailed { id, .. }
            | PaperError::ParseFailed { id, .. }
            | PaperError::ImageExtraction { id, .. }
            | PaperError::CacheIo { id, .. }
            | PaperError::MalformedParse { id, .. }
            | PaperError::Post { id, .. } => id,
        }
    }
}

/// Errors from the Slack Web API client.
#[derive(Debug, Error)]
pub enum SlackError {
    /// The HTTP request itself failed (connection, TLS, timeout).
    #[error("Slack request '{method}' failed: {reason}")]
    Transport { method: String, reason: String },

    /// Slack answered `ok: false` with an error code.
    #[error("Slack API '{method}' rejected the call: {error}")]
    Api { method: String, error: String },

    /// Slack answered `ok: true` but the payload is missing a field we need.
    #[error("Slack API '{method}' returned an unexpected payload: {detail}")]
    MalformedResponse { method: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_failed_display() {
        let e = PaperError::DownloadFailed {
            id: "2401.00001".into(),
            reason: "HTTP 404".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("2401.00001"), "got: {msg}");
        assert!(msg.contains("404"), "got: {msg}");
    }

    #[test]
    fn paper_id_accessor() {
        let e = PaperError::ParseFailed {
            id: "2401.00002".into(),
            reason: "HTTP 500".into(),
        };
        assert_eq!(e.paper_id(), "2401.00002");
    }

    #[test]
    fn slack_error_converts_to_feed_error() {
        let e: FeedError = SlackError::Api {
            method: "chat.postMessage".into(),
            error: "channel_not_found".into(),
        }
        .into();
        assert!(e.to_string().contains("channel_not_found"));
    }

    #[test]
    fn provider_not_configured_display() {
        let e = FeedError::ProviderNotConfigured {
            provider: "auto".into(),
            hint: "set OPENAI_API_KEY".into(),
        };
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }
}
