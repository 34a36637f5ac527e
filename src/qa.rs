//! Question answering over a paper's cached parse result.
//!
//! The answer is grounded exclusively in the cached document HTML: the
//! system prompt embeds the (token-budgeted) HTML and the user prompt is the
//! question. When no parse cache exists for the identifier, a fixed
//! "not available" message comes back and **no LLM call is made** — the
//! cache check runs before the provider is even resolved.

use crate::config::FeedConfig;
use crate::document::ParsedDocument;
use crate::error::FeedError;
use crate::llm::{chat_text, resolve_provider};
use crate::prompts;
use crate::slack::SlackClient;
use crate::tokens::truncate_to_tokens;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

/// Reply used when the identifier has no cached parse result.
pub const NOT_AVAILABLE_MESSAGE: &str =
    "I don't have the paper you mentioned. Please check the paper ID.";

/// Disclosure appended when the paper HTML was cut to fit the token budget.
const TRUNCATION_NOTE: &str = "*Note: The paper is truncated due to the token limit. \
Please refer to the full paper for more information.*";

/// Reply used when an interactive handler fails mid-request.
pub const SOMETHING_WENT_WRONG_MESSAGE: &str = "Something went wrong. Sorry";

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^\n]*?)\*\*").unwrap());

/// Digest messages carry the paper link as `<https://…/abs/<id>|*title*>`;
/// this pulls the identifier back out of a quoted message.
static RE_MESSAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<https?://[^|>]*/abs/([^|>]+)\|").unwrap());

/// Answer a free-text question about the paper `id`, grounded in its cached
/// parse result.
pub async fn answer_question(
    id: &str,
    question: &str,
    config: &FeedConfig,
) -> Result<String, FeedError> {
    let path = config.parse_path(id);
    if !path.exists() {
        info!("No cached parse for {id}, returning the fixed reply");
        return Ok(NOT_AVAILABLE_MESSAGE.to_string());
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| FeedError::Io {
            path: path.clone(),
            source: e,
        })?;
    let doc: ParsedDocument =
        serde_json::from_str(&raw).map_err(|e| FeedError::MalformedCache {
            path: path.clone(),
            detail: e.to_string(),
        })?;

    let (html, truncated) = truncate_to_tokens(&doc.content.html, config.max_paper_tokens)?;
    debug!("Paper {id} HTML prepared for the context window (truncated: {truncated})");

    let provider = resolve_provider(config)?;
    let answer = chat_text(
        &provider,
        &prompts::qa_system_prompt(&html),
        question,
        config.max_answer_tokens,
        config.temperature,
    )
    .await?;

    Ok(finalize_answer(&answer, truncated))
}

/// Answer a question inside a channel thread, the way mention handlers use
/// it: post a placeholder reply immediately, then edit it into the answer.
///
/// A failure while answering is converted into a user-facing status message
/// on the placeholder — it never propagates out of the handler. Only a
/// failure to talk to the chat platform itself is returned.
pub async fn answer_in_thread(
    slack: &SlackClient,
    channel: &str,
    thread_ts: &str,
    id: &str,
    question: &str,
    config: &FeedConfig,
) -> Result<(), FeedError> {
    let placeholder_ts = slack
        .post_message(channel, ":loading:", Some(thread_ts))
        .await?;

    let text = match answer_question(id, question, config).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("answering failed for {id}: {e}");
            SOMETHING_WENT_WRONG_MESSAGE.to_string()
        }
    };

    slack.update_message(channel, &placeholder_ts, &text).await?;
    Ok(())
}

/// Extract the paper identifier from a digest message's link markup.
///
/// Mention events quote the thread's root message; the identifier rides in
/// the `<link|title>` the feed posted there.
pub fn extract_paper_id(message: &str) -> Option<String> {
    RE_MESSAGE_LINK
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Convert the model's Markdown bold to chat-platform markup and append the
/// truncation disclosure when the context was cut.
fn finalize_answer(answer: &str, truncated: bool) -> String {
    let answer = RE_BOLD.replace_all(answer, "*$1*").to_string();
    if truncated {
        format!("{answer}\n\n{TRUNCATION_NOTE}")
    } else {
        answer
    }
}
