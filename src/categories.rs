//! Category taxonomy and LLM-backed category suggestion.
//!
//! The taxonomy is a directory of newline-delimited name files, one list of
//! subcategory strings per top-level category, plus a `custom` list that an
//! approval workflow appends to. Appending is the only mutation; everything
//! else reads.
//!
//! The two LLM operations are thin prompt/response wrappers. Their only
//! logic is shape validation of the model's JSON reply: malformed JSON or a
//! missing field degrades to an empty list (never an error), and over-long
//! lists are clamped to [`prompts::MAX_SUGGESTED_CATEGORIES`].

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::llm::{chat_text, resolve_provider};
use crate::prompts::{self, MAX_SUGGESTED_CATEGORIES};
use tracing::warn;

/// Completion budget for the category prompts — the replies are tiny JSON.
const CATEGORY_MAX_TOKENS: usize = 1000;

/// Name of the mutable, approval-curated list.
pub const CUSTOM_LIST: &str = "custom";

/// Result of comparing a proposed category against the custom list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch {
    /// The proposed name is already in the list verbatim.
    pub exists: bool,
    /// Up to three entries the model considers similar.
    pub similar: Vec<String>,
}

/// Load one category file as a trimmed, blank-free list.
///
/// A missing file reads as an empty list — the `custom` list starts out
/// nonexistent until the first approval.
pub async fn load_categories(config: &FeedConfig, name: &str) -> Result<Vec<String>, FeedError> {
    let path = config.categories_dir().join(name);
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(FeedError::Io { path, source: e }),
    };
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Append a newly approved name to the custom list.
pub async fn add_custom_category(config: &FeedConfig, name: &str) -> Result<(), FeedError> {
    let dir = config.categories_dir();
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| FeedError::Io {
            path: dir.clone(),
            source: e,
        })?;

    let path = dir.join(CUSTOM_LIST);
    let mut existing = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(FeedError::Io { path, source: e }),
    };
    if !existing.is_empty() && !existing.ends_with('\n') {
        existing.push('\n');
    }
    existing.push_str(name.trim());
    existing.push('\n');

    tokio::fs::write(&path, existing)
        .await
        .map_err(|e| FeedError::Io { path, source: e })
}

/// Ask the model for at most three categories relevant to the paper.
///
/// An empty candidate list short-circuits to an empty reply without an LLM
/// call.
pub async fn suggest_categories(
    title: &str,
    abstract_text: &str,
    candidates: &[String],
    config: &FeedConfig,
) -> Result<Vec<String>, FeedError> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let provider = resolve_provider(config)?;
    let reply = chat_text(
        &provider,
        &prompts::category_system_prompt(candidates),
        &prompts::category_user_prompt(title, abstract_text),
        CATEGORY_MAX_TOKENS,
        config.temperature,
    )
    .await?;

    Ok(parse_string_list(&reply, "categories"))
}

/// Check a proposed category against the curated custom list.
///
/// Exact membership short-circuits without an LLM call; an empty custom list
/// likewise. Otherwise the model names up to three similar entries.
pub async fn similar_categories(
    proposed: &str,
    config: &FeedConfig,
) -> Result<CategoryMatch, FeedError> {
    let custom = load_categories(config, CUSTOM_LIST).await?;
    if custom.is_empty() {
        return Ok(CategoryMatch {
            exists: false,
            similar: Vec::new(),
        });
    }
    if custom.iter().any(|c| c == proposed) {
        return Ok(CategoryMatch {
            exists: true,
            similar: Vec::new(),
        });
    }

    let provider = resolve_provider(config)?;
    let reply = chat_text(
        &provider,
        &prompts::category_compare_system_prompt(&custom),
        &format!("Category to compare: {proposed}"),
        CATEGORY_MAX_TOKENS,
        config.temperature,
    )
    .await?;

    Ok(CategoryMatch {
        exists: false,
        similar: parse_string_list(&reply, "similar_categories"),
    })
}

/// Pull `field` out of the model's JSON reply, tolerating code fences.
///
/// Anything malformed — non-JSON, wrong field, non-string entries — degrades
/// to an empty list. Over-long lists are clamped.
fn parse_string_list(reply: &str, field: &str) -> Vec<String> {
    let body = strip_code_fences(reply);
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(e) => {
            warn!(field, error = %e, "LLM returned malformed JSON, treating as empty");
            return Vec::new();
        }
    };

    let Some(items) = value.get(field).and_then(|v| v.as_array()) else {
        warn!(field, "LLM reply is missing the expected field, treating as empty");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .take(MAX_SUGGESTED_CATEGORIES)
        .collect()
}

/// Models occasionally wrap JSON in ```json fences despite the prompt.
fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches('\n')
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::builder().data_dir(dir.path()).build().unwrap();
        assert!(load_categories(&config, CUSTOM_LIST).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_trims_and_drops_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::builder().data_dir(dir.path()).build().unwrap();
        std::fs::create_dir_all(config.categories_dir()).unwrap();
        std::fs::write(config.categories_dir().join("nlp"), "  Parsing \n\nQA\n").unwrap();

        let list = load_categories(&config, "nlp").await.unwrap();
        assert_eq!(list, vec!["Parsing", "QA"]);
    }

    #[tokio::test]
    async fn add_custom_appends() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::builder().data_dir(dir.path()).build().unwrap();

        add_custom_category(&config, "Speech").await.unwrap();
        add_custom_category(&config, "Alignment").await.unwrap();

        let list = load_categories(&config, CUSTOM_LIST).await.unwrap();
        assert_eq!(list, vec!["Speech", "Alignment"]);
    }

    #[tokio::test]
    async fn empty_custom_list_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::builder().data_dir(dir.path()).build().unwrap();
        let m = similar_categories("Speech", &config).await.unwrap();
        assert_eq!(
            m,
            CategoryMatch {
                exists: false,
                similar: vec![]
            }
        );
    }

    #[tokio::test]
    async fn exact_match_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::builder().data_dir(dir.path()).build().unwrap();
        add_custom_category(&config, "Speech").await.unwrap();

        let m = similar_categories("Speech", &config).await.unwrap();
        assert!(m.exists);
        assert!(m.similar.is_empty());
    }

    #[tokio::test]
    async fn empty_candidates_short_circuit_suggestion() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::builder().data_dir(dir.path()).build().unwrap();
        let list = suggest_categories("T", "A", &[], &config).await.unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn parse_list_accepts_plain_json() {
        let out = parse_string_list(r#"{"categories": ["A", "B"]}"#, "categories");
        assert_eq!(out, vec!["A", "B"]);
    }

    #[test]
    fn parse_list_clamps_to_three() {
        let out = parse_string_list(
            r#"{"categories": ["A", "B", "C", "D", "E"]}"#,
            "categories",
        );
        assert_eq!(out, vec!["A", "B", "C"]);
    }

    #[test]
    fn parse_list_tolerates_code_fences() {
        let reply = "```json\n{\"similar_categories\": [\"X\"]}\n```";
        assert_eq!(parse_string_list(reply, "similar_categories"), vec!["X"]);
    }

    #[test]
    fn malformed_reply_degrades_to_empty() {
        assert!(parse_string_list("not json", "categories").is_empty());
        assert!(parse_string_list(r#"{"other": []}"#, "categories").is_empty());
        assert!(parse_string_list(r#"{"categories": "A"}"#, "categories").is_empty());
    }
}
