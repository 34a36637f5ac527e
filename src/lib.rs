//! # paperfeed
//!
//! Discover trending academic papers, extract structured content from their
//! PDFs, post digests to a Slack channel, and answer follow-up questions
//! about a paper with an LLM grounded in its parsed content.
//!
//! ## Why this crate?
//!
//! Trending-paper listings rank by community signal but carry no content;
//! the papers themselves are PDFs a chat channel cannot preview. This crate
//! glues the two together: it scrapes the listing, caches each paper's PDF
//! and its parse-service output on disk keyed by identifier, rebuilds the
//! figures and tables with their captions as single images, and serves both
//! a daily channel digest and grounded Q&A from the same cache.
//!
//! ## Pipeline Overview
//!
//! ```text
//! listing page
//!  │
//!  ├─ 1. Discover  scrape, dedupe by identifier, rank by upvotes
//!  ├─ 2. Acquire   fetch the PDF (idempotent, cache keyed by id)
//!  ├─ 3. Parse     call the document-parse service, cache the JSON
//!  ├─ 4. Images    pair figures/tables with captions, composite
//!  └─ 5. Feed      post digest + thread replies + image uploads
//!
//! cached parse ──▶ Q&A  token-budget the HTML, ask the LLM, disclose cuts
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paperfeed::{answer_question, FeedConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = FeedConfig::default();
//!     let answer = answer_question("2401.00001", "What is the key result?", &config).await?;
//!     println!("{answer}");
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Fatal problems return [`FeedError`]; anything that breaks a single paper
//! returns [`PaperError`] and is absorbed at the batch loop's boundary, so a
//! 404 PDF or a malformed figure payload costs one paper, not the run.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paperfeed` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! paperfeed = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod categories;
pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod feed;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod qa;
pub mod slack;
pub mod tokens;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use categories::{add_custom_category, load_categories, similar_categories, suggest_categories, CategoryMatch};
pub use config::{FeedConfig, FeedConfigBuilder};
pub use discovery::{fetch_daily_papers, parse_abstract_page, parse_listing, rank_candidates, PaperCandidate};
pub use document::{DocElement, DocumentContent, ElementCategory, ElementContent, ParsedDocument};
pub use error::{FeedError, PaperError, SlackError};
pub use feed::{run_daily_feed, FeedProgress, FeedReport};
pub use pipeline::acquire::ensure_pdf;
pub use pipeline::images::{extract_images, CompositeImage};
pub use pipeline::parse::{ensure_parsed, load_parsed};
pub use qa::{answer_in_thread, answer_question, extract_paper_id, NOT_AVAILABLE_MESSAGE};
pub use slack::SlackClient;
pub use tokens::truncate_to_tokens;
