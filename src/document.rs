//! Data model for document-parse service output.
//!
//! The parse service returns an ordered element stream: each element carries
//! a category, rendered text/markup, and — for visual categories — a base64
//! PNG of the element's region. The JSON is cached verbatim on disk keyed by
//! paper identifier; this module only defines the shape we read back.
//!
//! Unknown categories deserialize to [`ElementCategory::Other`] rather than
//! failing the whole document: the service adds categories over time and a
//! cached file must stay readable.

use serde::{Deserialize, Serialize};

/// Category tag of a parsed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementCategory {
    Paragraph,
    Table,
    Figure,
    Chart,
    Caption,
    /// Any category this crate does not act on (headings, footers, equations, …).
    #[serde(other)]
    Other,
}

impl ElementCategory {
    /// Whether this element qualifies for image reconstruction.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Table | Self::Figure | Self::Chart)
    }
}

/// Rendered representations of one element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: String,
}

/// One element of the parsed stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocElement {
    pub category: ElementCategory,
    /// Base64-encoded PNG of the element's region. Present for the
    /// categories the parse request asked to encode.
    #[serde(default)]
    pub base64_encoding: Option<String>,
    #[serde(default)]
    pub content: ElementContent,
}

/// Document-level rendered content.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub html: String,
}

/// The structured output of the document-parse service for one paper.
///
/// Treated as append-only once cached: the file is written exactly once per
/// identifier and re-read on every feed or Q&A request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    #[serde(default)]
    pub elements: Vec<DocElement>,
    #[serde(default)]
    pub content: DocumentContent,
}
