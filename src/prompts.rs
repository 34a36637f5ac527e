//! System prompts for the LLM-backed operations.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (e.g. the
//!    grounding rules for Q&A or the category-count cap) requires editing
//!    exactly one place.
//!
//! 2. **Testability** — unit tests can inspect the rendered prompts directly
//!    without spinning up a real LLM, making prompt regressions easy to
//!    catch.

use serde_json::json;

/// How many categories the suggestion/comparison prompts ask for at most.
/// Replies longer than this are clamped by the caller.
pub const MAX_SUGGESTED_CATEGORIES: usize = 3;

const QA_SYSTEM_PROMPT: &str = r#"You are a helpful assistant specialized in Academic Paper Reading. Carefully read the paper and answer the user's question.
Guidelines:
- Use the full HTML of the paper to answer the user's question.
- If the user's question is not related to the paper, politely say that you are not sure about the answer.
- If the user's question is related to the paper, answer the question based on the paper.
- Answer in user's language.
- Never hallucinate.

You can use the following information to answer the user's question:
- Full HTML of the paper: {html}"#;

const CATEGORY_SYSTEM_PROMPT: &str = r#"You are a helpful assistant specialized in Academic Paper Categorization. Carefully read the provided information and find the top 3 most relevant categories for the paper.
Guidelines:
- Use the title and abstract to find the most relevant categories.
- If the paper is not related to any of the categories, return an empty list.
- If the paper is related to one, two, or three categories, return them.
- If the paper is related to more than three categories, return the top three.
- Respond in JSON format only, with no surrounding prose or code fences.

Categories:
{category_list}

Example output:
{example}"#;

const CATEGORY_COMPARE_SYSTEM_PROMPT: &str = r#"You are a helpful assistant specialized in comparing Academic Paper Categories. Check the provided category and find the top 3 most similar categories from the list.
Guidelines:
- If the category is not related to any of the categories, return an empty list.
- If the category is related to one, two, or three categories, return them.
- If the category is related to more than three categories, return the top three.
- Respond in JSON format only, with no surrounding prose or code fences.

Category list:
{category_list}

Example output:
{example}"#;

/// Build the Q&A system prompt around the (possibly truncated) paper HTML.
pub fn qa_system_prompt(html: &str) -> String {
    QA_SYSTEM_PROMPT.replace("{html}", html)
}

/// Build the category-suggestion system prompt from the candidate list.
pub fn category_system_prompt(candidates: &[String]) -> String {
    CATEGORY_SYSTEM_PROMPT
        .replace("{category_list}", &bullet_list(candidates))
        .replace(
            "{example}",
            &json!({ "categories": head(candidates) }).to_string(),
        )
}

/// Build the category-comparison system prompt from the curated custom list.
pub fn category_compare_system_prompt(custom: &[String]) -> String {
    CATEGORY_COMPARE_SYSTEM_PROMPT
        .replace("{category_list}", &bullet_list(custom))
        .replace(
            "{example}",
            &json!({ "similar_categories": head(custom) }).to_string(),
        )
}

/// User-prompt body for category suggestion.
pub fn category_user_prompt(title: &str, abstract_text: &str) -> String {
    let mut prompt = format!("Title: {title}");
    if !abstract_text.is_empty() {
        prompt.push_str(&format!("\nAbstract: {abstract_text}"));
    }
    prompt
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn head(items: &[String]) -> Vec<&String> {
    items.iter().take(MAX_SUGGESTED_CATEGORIES).collect()
}
