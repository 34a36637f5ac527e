//! Paper discovery: scrape the trending listing and rank candidates.
//!
//! The listing page and the abstract pages are external collaborators whose
//! markup shape is a fragile contract — the selectors below name the exact
//! classes the pages use today. Parsing is split from fetching so the scrape
//! logic stays unit-testable offline: [`parse_listing`] and
//! [`parse_abstract_page`] are pure `&str → data` functions, and
//! [`fetch_daily_papers`] only does the network plumbing around them.
//!
//! ## Ranking contract
//!
//! Candidates are deduplicated by identifier (first occurrence wins),
//! filtered by the upvote threshold, stable-sorted by upvotes descending
//! (ties keep first-seen order), and truncated to the requested count.

use crate::config::FeedConfig;
use crate::error::FeedError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, warn};

static RE_PAPER_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/papers/(\d+\.\d+)").unwrap());

static SEL_ENTRY: Lazy<Selector> = Lazy::new(|| Selector::parse("div.w-full").unwrap());
static SEL_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("a.line-clamp-3").unwrap());
static SEL_AUTHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("li").unwrap());
static SEL_UPVOTES: Lazy<Selector> = Lazy::new(|| Selector::parse("div.leading-none").unwrap());
static SEL_ABSTRACT: Lazy<Selector> =
    Lazy::new(|| Selector::parse("blockquote.abstract").unwrap());
static SEL_SUBJECTS: Lazy<Selector> = Lazy::new(|| Selector::parse("td.subjects").unwrap());

/// A paper surfaced by discovery. Immutable once created; one run's list is
/// persisted as a JSON snapshot by the feed driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperCandidate {
    pub title: String,
    pub authors: Vec<String>,
    /// External catalog identifier (e.g. "2401.00001"); the cache key.
    pub arxiv_id: String,
    /// Canonical abstract-page link.
    pub link: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Externally supplied popularity signal; used only for sort/filter.
    pub upvotes: u32,
    /// Subject tags from the abstract page.
    pub categories: Vec<String>,
}

/// Abstract-page fields used for candidate enrichment.
#[derive(Debug, Clone, Default)]
pub struct AbstractPage {
    pub abstract_text: String,
    pub categories: Vec<String>,
}

/// Parse the trending listing into deduplicated candidates.
///
/// Entries missing a title or identifier are skipped with a diagnostic.
/// An identifier already seen in this listing is dropped, keeping the first
/// (highest-positioned) occurrence. Abstracts and categories are left empty
/// here; enrichment is a separate per-candidate fetch.
pub fn parse_listing(html: &str, abs_base_url: &str) -> Vec<PaperCandidate> {
    let document = Html::parse_document(html);
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for entry in document.select(&SEL_ENTRY) {
        let Some(title_tag) = entry.select(&SEL_TITLE).next() else {
            warn!("listing entry without a title link, skipping");
            continue;
        };
        let title = title_tag.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            warn!("listing entry with an empty title, skipping");
            continue;
        }

        let href = title_tag.value().attr("href").unwrap_or_default();
        let Some(id) = RE_PAPER_ID
            .captures(href)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
        else {
            warn!("Could not extract a paper identifier from link '{href}', skipping");
            continue;
        };

        if !seen_ids.insert(id.clone()) {
            debug!("Duplicate listing entry {id}, keeping the first occurrence");
            continue;
        }

        let authors: Vec<String> = entry
            .select(&SEL_AUTHOR)
            .filter_map(|li| li.value().attr("title"))
            .map(|a| a.to_string())
            .collect();

        // A missing or non-numeric upvote counter ranks as zero.
        let upvotes = entry
            .select(&SEL_UPVOTES)
            .next()
            .map(|div| div.text().collect::<String>())
            .and_then(|t| t.trim().parse::<u32>().ok())
            .unwrap_or(0);

        candidates.push(PaperCandidate {
            title,
            authors,
            link: format!("{abs_base_url}/{id}"),
            arxiv_id: id,
            abstract_text: String::new(),
            upvotes,
            categories: Vec::new(),
        });
    }

    candidates
}

/// Filter by threshold, sort by upvotes descending (stable — ties keep
/// first-seen order), and truncate to `max_papers`.
pub fn rank_candidates(
    mut candidates: Vec<PaperCandidate>,
    min_upvotes: u32,
    max_papers: usize,
) -> Vec<PaperCandidate> {
    candidates.retain(|c| c.upvotes >= min_upvotes);
    candidates.sort_by_key(|c| Reverse(c.upvotes));
    candidates.truncate(max_papers);
    candidates
}

/// Parse a paper's abstract page.
///
/// The abstract lives in `blockquote.abstract` with an "Abstract:" label
/// prefix; subject tags live in `td.subjects`, `;`-separated.
pub fn parse_abstract_page(html: &str) -> AbstractPage {
    let document = Html::parse_document(html);

    let mut abstract_text = document
        .select(&SEL_ABSTRACT)
        .next()
        .map(|b| b.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    if let Some(stripped) = abstract_text.strip_prefix("Abstract:") {
        abstract_text = stripped.trim().to_string();
    }

    let categories = document
        .select(&SEL_SUBJECTS)
        .next()
        .map(|td| td.text().collect::<String>())
        .map(|t| {
            t.trim()
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    AbstractPage {
        abstract_text,
        categories,
    }
}

/// Discover the day's trending papers, ranked and enriched.
///
/// Fetches the listing for `config.listing_date()`, parses and ranks the
/// entries, then fetches each surviving candidate's abstract page. A failed
/// enrichment fetch degrades that candidate to an empty abstract — it never
/// aborts discovery.
pub async fn fetch_daily_papers(
    client: &reqwest::Client,
    config: &FeedConfig,
) -> Result<Vec<PaperCandidate>, FeedError> {
    let url = config.listing_url_for(config.listing_date());
    debug!("Fetching paper listing: {url}");

    let html = fetch_page(client, &url).await.map_err(|reason| {
        FeedError::ListingFetchFailed {
            url: url.clone(),
            reason,
        }
    })?;

    let candidates = parse_listing(&html, &config.abs_base_url);
    debug!("Parsed {} listing entries", candidates.len());

    let mut ranked = rank_candidates(candidates, config.min_upvotes, config.max_papers);

    for candidate in &mut ranked {
        match fetch_page(client, &candidate.link).await {
            Ok(page) => {
                let enriched = parse_abstract_page(&page);
                candidate.abstract_text = enriched.abstract_text;
                candidate.categories = enriched.categories;
            }
            Err(reason) => {
                warn!("Abstract fetch failed for {}: {reason}", candidate.arxiv_id);
            }
        }
    }

    Ok(ranked)
}

/// GET a page and return its body, folding transport and status errors into
/// one reason string.
async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    response.text().await.map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABS_BASE: &str = "https://arxiv.org/abs";

    fn entry(id: &str, title: &str, upvotes: &str) -> String {
        format!(
            r#"<div class="w-full">
                 <a class="line-clamp-3" href="/papers/{id}">{title}</a>
                 <ul><li title="Ada Lovelace"></li><li title="Alan Turing"></li><li></li></ul>
                 <div class="leading-none">{upvotes}</div>
               </div>"#
        )
    }

    #[test]
    fn parses_a_listing_entry() {
        let html = entry("2401.00001", "A Paper", "42");
        let candidates = parse_listing(&html, ABS_BASE);
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.arxiv_id, "2401.00001");
        assert_eq!(c.title, "A Paper");
        assert_eq!(c.upvotes, 42);
        assert_eq!(c.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(c.link, "https://arxiv.org/abs/2401.00001");
    }

    #[test]
    fn duplicate_identifier_keeps_first() {
        let html = format!(
            "{}{}",
            entry("2401.00001", "First", "10"),
            entry("2401.00001", "Second", "99")
        );
        let candidates = parse_listing(&html, ABS_BASE);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "First");
    }

    #[test]
    fn entry_without_identifier_is_skipped() {
        let html = r#"<div class="w-full">
            <a class="line-clamp-3" href="/blog/not-a-paper">Not a paper</a>
        </div>"#;
        assert!(parse_listing(html, ABS_BASE).is_empty());
    }

    #[test]
    fn entry_without_title_is_skipped() {
        let html = r#"<div class="w-full"><div class="leading-none">5</div></div>"#;
        assert!(parse_listing(html, ABS_BASE).is_empty());
    }

    #[test]
    fn unparseable_upvotes_rank_as_zero() {
        let html = entry("2401.00002", "Quiet Paper", "—");
        let candidates = parse_listing(&html, ABS_BASE);
        assert_eq!(candidates[0].upvotes, 0);
    }

    #[test]
    fn ranking_sorts_descending_and_truncates() {
        let html = format!(
            "{}{}{}",
            entry("2401.00001", "Low", "1"),
            entry("2401.00002", "High", "50"),
            entry("2401.00003", "Mid", "25")
        );
        let ranked = rank_candidates(parse_listing(&html, ABS_BASE), 0, 2);
        let ids: Vec<&str> = ranked.iter().map(|c| c.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["2401.00002", "2401.00003"]);
    }

    #[test]
    fn ranking_ties_preserve_first_seen_order() {
        let html = format!(
            "{}{}{}",
            entry("2401.00001", "A", "7"),
            entry("2401.00002", "B", "7"),
            entry("2401.00003", "C", "7")
        );
        let ranked = rank_candidates(parse_listing(&html, ABS_BASE), 0, 10);
        let ids: Vec<&str> = ranked.iter().map(|c| c.arxiv_id.as_str()).collect();
        assert_eq!(ids, vec!["2401.00001", "2401.00002", "2401.00003"]);
    }

    #[test]
    fn ranking_applies_threshold_before_truncation() {
        let html = format!(
            "{}{}",
            entry("2401.00001", "A", "3"),
            entry("2401.00002", "B", "30")
        );
        let ranked = rank_candidates(parse_listing(&html, ABS_BASE), 10, 5);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].arxiv_id, "2401.00002");
    }

    #[test]
    fn abstract_page_strips_label_prefix() {
        let html = r#"
            <blockquote class="abstract">Abstract: We study things.</blockquote>
            <table><tr><td class="subjects">Machine Learning (cs.LG); Computation and Language (cs.CL)</td></tr></table>
        "#;
        let page = parse_abstract_page(html);
        assert_eq!(page.abstract_text, "We study things.");
        assert_eq!(
            page.categories,
            vec!["Machine Learning (cs.LG)", "Computation and Language (cs.CL)"]
        );
    }

    #[test]
    fn missing_abstract_degrades_to_empty() {
        let page = parse_abstract_page("<html><body>404</body></html>");
        assert!(page.abstract_text.is_empty());
        assert!(page.categories.is_empty());
    }
}
