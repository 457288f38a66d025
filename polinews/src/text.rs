//! Tokenizing and sentence splitting shared by the lexicon and the scorer.

use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("valid regex"));

/// Words in their original case: alphanumeric runs, keeping inner apostrophes.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|w| w.trim_matches(|c: char| c == '\'' || c == '\u{2019}').replace('\u{2019}', "'"))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lowercased [`words`].
pub fn tokenize(text: &str) -> Vec<String> {
    words(text).into_iter().map(|w| w.to_lowercase()).collect()
}

/// Split on runs of `.`, `!` or `?` followed by whitespace or end of text.
/// Fragments without any word are ignored.
pub fn sentences(text: &str) -> Vec<&str> {
    SENTENCE_BREAK
        .split(text)
        .map(str::trim)
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_words() {
        assert_eq!(
            tokenize("Far-right groups don’t agree, 'officials' said."),
            vec!["far", "right", "groups", "don't", "agree", "officials", "said"]
        );
        assert!(tokenize("  ... ").is_empty());
    }

    #[test]
    fn splits_sentences() {
        assert_eq!(
            sentences("The bill passed. Was it fair?! Critics think so...   Then nothing"),
            vec!["The bill passed", "Was it fair", "Critics think so", "Then nothing"]
        );
        assert_eq!(sentences("The U.S. Senate voted."), vec!["The U.S", "Senate voted"]);
        assert!(sentences("").is_empty());
        assert!(sentences(" ... !").is_empty());
    }
}
