//! Configuration for the paper-feed pipeline.
//!
//! All behaviour is controlled through [`FeedConfig`], built via its
//! [`FeedConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across entry points, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! Cache-path derivation lives here too: a paper identifier maps to exactly
//! one PDF path and one parse path under the data directory, and those
//! mappings are the source of truth for "already processed".

use crate::error::FeedError;
use chrono::{Duration, Local, NaiveDate};
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default listing page for trending papers.
pub const DEFAULT_LISTING_URL: &str = "https://huggingface.co/papers";

/// Default host serving paper PDFs, keyed by identifier.
pub const DEFAULT_PDF_BASE_URL: &str = "https://arxiv.org/pdf";

/// Default host serving paper abstract pages, keyed by identifier.
pub const DEFAULT_ABS_BASE_URL: &str = "https://arxiv.org/abs";

/// Default document-parse service endpoint.
pub const DEFAULT_PARSE_API_URL: &str =
    "https://api.upstage.ai/v1/document-ai/document-parse";

/// Configuration for paper discovery, extraction, and Q&A.
///
/// Built via [`FeedConfig::builder()`] or using [`FeedConfig::default()`].
///
/// # Example
/// ```rust
/// use paperfeed::FeedConfig;
///
/// let config = FeedConfig::builder()
///     .min_upvotes(10)
///     .max_papers(5)
///     .data_dir("data")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct FeedConfig {
    /// Listing page URL (without the `?date=` query). Default: Hugging Face daily papers.
    pub listing_url: String,

    /// How many days back the listing date parameter points. Default: 7.
    ///
    /// The listing page ranks by community upvotes, which take a few days to
    /// accumulate. Looking a week back trades freshness for a stable ranking.
    pub date_offset_days: i64,

    /// Minimum upvote count for a candidate to survive filtering. Default: 0.
    pub min_upvotes: u32,

    /// Maximum number of papers returned per run. Default: 5.
    pub max_papers: usize,

    /// Maximum composite images extracted per paper. Default: 3.
    pub max_images: usize,

    /// Root of the filesystem cache (`pdfs/`, `parses/`, `papers/`,
    /// `categories/` live under it). Default: `data`.
    pub data_dir: PathBuf,

    /// Base URL for PDF downloads; `<base>/<id>.pdf`. Default: arXiv.
    pub pdf_base_url: String,

    /// Base URL for abstract pages; `<base>/<id>`. Default: arXiv.
    pub abs_base_url: String,

    /// Document-parse service endpoint.
    pub parse_api_url: String,

    /// Bearer token for the document-parse service.
    pub parse_api_key: Option<String>,

    /// LLM model identifier, e.g. "gpt-4o-mini". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for LLM completions. Default: 0.1.
    ///
    /// Low temperature keeps answers grounded in the supplied document text,
    /// which is exactly what paper Q&A wants.
    pub temperature: f32,

    /// Token budget for the paper HTML placed in the Q&A context. Default: 32_000.
    ///
    /// Documents over the budget are cut at the token boundary and the answer
    /// carries a truncation note.
    pub max_paper_tokens: usize,

    /// Maximum tokens the LLM may generate per answer. Default: 16_000.
    pub max_answer_tokens: usize,

    /// HTTP download timeout in seconds (PDF host, listing pages). Default: 120.
    pub download_timeout_secs: u64,

    /// Per-LLM-call and parse-service timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            listing_url: DEFAULT_LISTING_URL.to_string(),
            date_offset_days: 7,
            min_upvotes: 0,
            max_papers: 5,
            max_images: 3,
            data_dir: PathBuf::from("data"),
            pdf_base_url: DEFAULT_PDF_BASE_URL.to_string(),
            abs_base_url: DEFAULT_ABS_BASE_URL.to_string(),
            parse_api_url: DEFAULT_PARSE_API_URL.to_string(),
            parse_api_key: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_paper_tokens: 32_000,
            max_answer_tokens: 16_000,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for FeedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedConfig")
            .field("listing_url", &self.listing_url)
            .field("date_offset_days", &self.date_offset_days)
            .field("min_upvotes", &self.min_upvotes)
            .field("max_papers", &self.max_papers)
            .field("max_images", &self.max_images)
            .field("data_dir", &self.data_dir)
            .field("pdf_base_url", &self.pdf_base_url)
            .field("abs_base_url", &self.abs_base_url)
            .field("parse_api_url", &self.parse_api_url)
            .field("parse_api_key", &self.parse_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_paper_tokens", &self.max_paper_tokens)
            .field("max_answer_tokens", &self.max_answer_tokens)
            .finish()
    }
}

impl FeedConfig {
    /// Create a new builder for `FeedConfig`.
    pub fn builder() -> FeedConfigBuilder {
        FeedConfigBuilder {
            config: Self::default(),
        }
    }

    /// Deterministic cache path of the PDF for `id`.
    pub fn pdf_path(&self, id: &str) -> PathBuf {
        self.data_dir.join("pdfs").join(format!("{id}.pdf"))
    }

    /// Deterministic cache path of the parse result for `id`.
    pub fn parse_path(&self, id: &str) -> PathBuf {
        self.data_dir.join("parses").join(format!("{id}.json"))
    }

    /// Directory holding the newline-delimited category-name files.
    pub fn categories_dir(&self) -> PathBuf {
        self.data_dir.join("categories")
    }

    /// Path of the one-per-run discovery snapshot for `date`.
    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join("papers")
            .join(format!("{}_papers.json", date.format("%Y-%m-%d")))
    }

    /// The listing date this run targets: today minus `date_offset_days`.
    pub fn listing_date(&self) -> NaiveDate {
        (Local::now() - Duration::days(self.date_offset_days)).date_naive()
    }

    /// Full listing URL including the date query parameter.
    pub fn listing_url_for(&self, date: NaiveDate) -> String {
        format!("{}?date={}", self.listing_url, date.format("%Y-%m-%d"))
    }

    /// Canonical abstract-page link for a paper identifier.
    pub fn paper_link(&self, id: &str) -> String {
        format!("{}/{}", self.abs_base_url, id)
    }

    /// Download URL of a paper's PDF.
    pub fn pdf_url(&self, id: &str) -> String {
        format!("{}/{}.pdf", self.pdf_base_url, id)
    }
}

/// Builder for [`FeedConfig`].
#[derive(Debug)]
pub struct FeedConfigBuilder {
    config: FeedConfig,
}

impl FeedConfigBuilder {
    pub fn listing_url(mut self, url: impl Into<String>) -> Self {
        self.config.listing_url = url.into();
        self
    }

    pub fn date_offset_days(mut self, days: i64) -> Self {
        self.config.date_offset_days = days.max(0);
        self
    }

    pub fn min_upvotes(mut self, n: u32) -> Self {
        self.config.min_upvotes = n;
        self
    }

    pub fn max_papers(mut self, n: usize) -> Self {
        self.config.max_papers = n.max(1);
        self
    }

    pub fn max_images(mut self, n: usize) -> Self {
        self.config.max_images = n;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn pdf_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.pdf_base_url = url.into();
        self
    }

    pub fn abs_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.abs_base_url = url.into();
        self
    }

    pub fn parse_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.parse_api_url = url.into();
        self
    }

    pub fn parse_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.parse_api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_paper_tokens(mut self, n: usize) -> Self {
        self.config.max_paper_tokens = n;
        self
    }

    pub fn max_answer_tokens(mut self, n: usize) -> Self {
        self.config.max_answer_tokens = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<FeedConfig, FeedError> {
        let c = &self.config;
        if c.listing_url.is_empty() {
            return Err(FeedError::InvalidConfig("listing_url must not be empty".into()));
        }
        if c.max_papers == 0 {
            return Err(FeedError::InvalidConfig("max_papers must be ≥ 1".into()));
        }
        if c.max_paper_tokens == 0 {
            return Err(FeedError::InvalidConfig(
                "max_paper_tokens must be ≥ 1".into(),
            ));
        }
        if c.date_offset_days < 0 {
            return Err(FeedError::InvalidConfig(
                "date_offset_days must be ≥ 0".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Ensure the cache directory layout exists under `data_dir`.
pub(crate) async fn ensure_cache_dirs(data_dir: &Path) -> std::io::Result<()> {
    for sub in ["pdfs", "parses", "papers", "categories"] {
        tokio::fs::create_dir_all(data_dir.join(sub)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_paths_are_deterministic() {
        let config = FeedConfig::builder().data_dir("/tmp/pf").build().unwrap();
        assert_eq!(
            config.pdf_path("2401.00001"),
            PathBuf::from("/tmp/pf/pdfs/2401.00001.pdf")
        );
        assert_eq!(
            config.parse_path("2401.00001"),
            PathBuf::from("/tmp/pf/parses/2401.00001.json")
        );
        // Same identifier, same path — calling twice must agree.
        assert_eq!(config.pdf_path("2401.00001"), config.pdf_path("2401.00001"));
    }

    #[test]
    fn listing_url_carries_date() {
        let config = FeedConfig::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            config.listing_url_for(date),
            "https://huggingface.co/papers?date=2024-03-01"
        );
    }

    #[test]
    fn builder_rejects_zero_papers() {
        // The setter clamps, so poke the field directly to test validation.
        let mut config = FeedConfig::default();
        config.max_papers = 0;
        let builder = FeedConfigBuilder { config };
        assert!(builder.build().is_err());
    }

    #[test]
    fn pdf_url_shape() {
        let config = FeedConfig::default();
        assert_eq!(
            config.pdf_url("2401.00001"),
            "https://arxiv.org/pdf/2401.00001.pdf"
        );
        assert_eq!(config.paper_link("2401.00001"), "https://arxiv.org/abs/2401.00001");
    }

    #[test]
    fn debug_hides_secrets() {
        let config = FeedConfig::builder().parse_api_key("sk-secret").build().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
