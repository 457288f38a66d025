//! Near-duplicate detection.
//!
//! Two articles are duplicates when they share a key built from the first
//! [`TITLE_KEY_PREFIX_CHARS`] characters of the normalized title and the
//! normalized source. The same headline from two different outlets yields two
//! different keys and both records survive.

use std::cmp::Ordering;
use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::article::Article;

/// Normalized title characters kept in the key. Tunable.
pub const TITLE_KEY_PREFIX_CHARS: usize = 48;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "to", "in", "on", "for", "at", "by", "with",
    "from", "as", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that", "after",
    "over", "amid", "into", "says", "said",
];

const TLD_SUFFIXES: &[&str] = &[".co.uk", ".com", ".org", ".net", ".io", ".news"];

/// Lowercase, punctuation and stop words stripped, truncated prefix.
pub fn normalize_title(title: &str, source_name: &str) -> String {
    let title = strip_source_suffix(title, source_name).to_lowercase();
    let words: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(w))
        .collect();
    let joined = words.join(" ");
    let truncated: String = joined.chars().take(TITLE_KEY_PREFIX_CHARS).collect();
    truncated.trim_end().to_string()
}

/// `CNN`, `cnn.com` and `https://www.cnn.com/politics` all map to `cnn`.
pub fn normalize_source(source_name: &str) -> String {
    let mut s = source_name.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(scheme) {
            s = rest.to_string();
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }
    if let Some(idx) = s.find('/') {
        s.truncate(idx);
    }
    if let Some(suffix) = TLD_SUFFIXES.iter().find(|suffix| s.ends_with(*suffix)) {
        s.truncate(s.len() - suffix.len());
    }
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

pub fn dedup_key(title: &str, source_name: &str) -> String {
    format!("{}|{}", normalize_title(title, source_name), normalize_source(source_name))
}

/// Stable 32-char hex identifier derived from the dedup key.
pub fn article_id(title: &str, source_name: &str) -> String {
    let digest = Sha256::digest(dedup_key(title, source_name).as_bytes());
    digest[..16].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Headlines syndicated through aggregators often end in " - Outlet".
fn strip_source_suffix<'a>(title: &'a str, source_name: &str) -> &'a str {
    let source = source_name.trim();
    if source.is_empty() {
        return title;
    }
    for sep in [" - ", " | ", " — "] {
        if let Some(idx) = title.rfind(sep) {
            let tail = title[idx + sep.len()..].trim();
            if tail.eq_ignore_ascii_case(source) {
                return &title[..idx];
            }
        }
    }
    title
}

/// Collapse articles sharing an id.
///
/// The survivor is the earliest publication; ties go to the provider with the
/// higher priority, then to the lexicographically smaller url. Returns the
/// survivors in first-seen order.
pub fn deduplicate<F>(articles: Vec<Article>, priority_of: F) -> Vec<Article>
where
    F: Fn(&str) -> i32,
{
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Article> = Vec::with_capacity(articles.len());

    for article in articles {
        match slots.get(&article.id) {
            Some(&idx) => {
                if prefer(&article, &kept[idx], &priority_of) == Ordering::Less {
                    kept[idx] = article;
                }
            }
            None => {
                slots.insert(article.id.clone(), kept.len());
                kept.push(article);
            }
        }
    }
    kept
}

/// `Less` means `a` should be kept over `b`.
fn prefer<F>(a: &Article, b: &Article, priority_of: &F) -> Ordering
where
    F: Fn(&str) -> i32,
{
    a.published_at
        .cmp(&b.published_at)
        .then_with(|| priority_of(&b.provider).cmp(&priority_of(&a.provider)))
        .then_with(|| a.url.cmp(&b.url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn article(title: &str, source: &str, url: &str, minutes_ago: i64, provider: &str) -> Article {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Article::new(title, "", source, url, now - Duration::minutes(minutes_ago), provider)
    }

    fn priority(provider: &str) -> i32 {
        match provider {
            "high" => 10,
            _ => 1,
        }
    }

    #[test]
    fn title_normalization_strips_noise() {
        assert_eq!(
            normalize_title("The Senate Passes a Budget Bill!", "Reuters"),
            "senate passes budget bill"
        );
        assert_eq!(
            normalize_title("Senate passes budget bill - Reuters", "Reuters"),
            "senate passes budget bill"
        );
        assert_eq!(
            normalize_title("Late-night vote: Senate OKs $1.2T plan", ""),
            "late night vote senate oks 1 2t plan"
        );
    }

    #[test]
    fn title_key_is_truncated() {
        let long = "word ".repeat(40);
        assert!(normalize_title(&long, "").chars().count() <= TITLE_KEY_PREFIX_CHARS);
    }

    #[test]
    fn source_normalization_matches_domains() {
        assert_eq!(normalize_source("CNN"), "cnn");
        assert_eq!(normalize_source("cnn.com"), "cnn");
        assert_eq!(normalize_source("https://www.cnn.com/politics"), "cnn");
        assert_eq!(normalize_source("BBC.co.uk"), "bbc");
        assert_eq!(normalize_source("The Hill"), "thehill");
    }

    #[test]
    fn near_identical_titles_from_same_source_collapse() {
        let articles = vec![
            article("Senate passes budget bill after late-night vote", "CNN", "https://cnn.com/b", 30, "low"),
            article("Senate Passes Budget Bill After Late Night Vote", "CNN", "https://cnn.com/a", 60, "low"),
        ];
        let kept = deduplicate(articles, priority);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].url, "https://cnn.com/a", "earliest publication wins");
    }

    #[test]
    fn identical_titles_from_different_sources_survive() {
        let articles = vec![
            article("Senate passes budget bill", "CNN", "https://cnn.com/a", 30, "low"),
            article("Senate passes budget bill", "Fox News", "https://foxnews.com/a", 30, "low"),
        ];
        assert_eq!(deduplicate(articles, priority).len(), 2);
    }

    #[test]
    fn ties_break_on_priority_then_url() {
        let articles = vec![
            article("Senate passes budget bill", "CNN", "https://cnn.com/a", 30, "low"),
            article("Senate passes budget bill", "CNN", "https://cnn.com/z", 30, "high"),
        ];
        let kept = deduplicate(articles, priority);
        assert_eq!(kept[0].provider, "high");

        let articles = vec![
            article("Senate passes budget bill", "CNN", "https://cnn.com/z", 30, "low"),
            article("Senate passes budget bill", "CNN", "https://cnn.com/a", 30, "low"),
        ];
        let kept = deduplicate(articles, priority);
        assert_eq!(kept[0].url, "https://cnn.com/a");
    }

    #[test]
    fn ids_are_stable() {
        let a = article_id("Senate passes budget bill", "CNN");
        let b = article_id("senate passes the budget bill!", "cnn.com");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
