//! Token budgeting for LLM context windows.
//!
//! Paper HTML regularly exceeds the model context, so the Q&A path cuts it
//! at a token boundary: encode, keep the first `limit` tokens, decode. When
//! the text already fits, it is returned untouched — byte-identical, not a
//! decode round-trip — so budgeting is a no-op for small documents.

use crate::error::FeedError;
use once_cell::sync::Lazy;
use tiktoken_rs::CoreBPE;

// o200k_base covers the gpt-4o model family. The vocabulary ships inside
// the tiktoken-rs crate, so construction cannot fail at runtime.
static O200K: Lazy<CoreBPE> =
    Lazy::new(|| tiktoken_rs::o200k_base().expect("embedded o200k_base vocabulary"));

/// Cut `text` to at most `limit` tokens.
///
/// Returns the (possibly truncated) text and whether truncation happened.
/// Under the limit, the returned text is byte-identical to the input; over
/// it, the result encodes to exactly `limit` tokens.
pub fn truncate_to_tokens(text: &str, limit: usize) -> Result<(String, bool), FeedError> {
    let tokens = O200K.encode_with_special_tokens(text);
    if tokens.len() <= limit {
        return Ok((text.to_string(), false));
    }

    let cut = O200K
        .decode(tokens[..limit].to_vec())
        .map_err(|e| FeedError::Tokenizer(e.to_string()))?;
    Ok((cut, true))
}

/// Number of tokens `text` encodes to.
pub fn count_tokens(text: &str) -> usize {
    O200K.encode_with_special_tokens(text).len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_limit_is_byte_identical() {
        let text = "A short paragraph about attention mechanisms.";
        let (out, truncated) = truncate_to_tokens(text, 10_000).unwrap();
        assert_eq!(out, text);
        assert!(!truncated);
    }

    #[test]
    fn over_limit_cuts_to_exactly_the_limit() {
        let text = "token ".repeat(500);
        let limit = 32;
        let (out, truncated) = truncate_to_tokens(&text, limit).unwrap();
        assert!(truncated);
        assert_eq!(count_tokens(&out), limit);
        assert!(text.starts_with(&out));
    }

    #[test]
    fn exact_limit_is_not_truncated() {
        let text = "exact fit";
        let limit = count_tokens(text);
        let (out, truncated) = truncate_to_tokens(text, limit).unwrap();
        assert_eq!(out, text);
        assert!(!truncated);
    }

    #[test]
    fn empty_text_passes_through() {
        let (out, truncated) = truncate_to_tokens("", 5).unwrap();
        assert!(out.is_empty());
        assert!(!truncated);
    }
}
