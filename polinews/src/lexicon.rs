use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::text::tokenize;

/// Which partisan marker set a term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    /// Partisan framing that names no side of its own, e.g. "red state"
    Neutral,
}

/// A lexicon entry matched as a whole token sequence.
#[derive(Debug, Clone)]
pub struct Term {
    pub text: String,
    tokens: Vec<String>,
}

impl Term {
    fn new(text: &str) -> Option<Self> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            text: tokens.join(" "),
            tokens,
        })
    }

    fn matches_at(&self, tokens: &[String], at: usize, used: &[bool]) -> bool {
        let end = at + self.tokens.len();
        end <= tokens.len()
            && tokens[at..end] == self.tokens[..]
            && !used[at..end].iter().any(|u| *u)
    }
}

/// Matches found in one text.
#[derive(Debug, Clone, Default)]
pub struct LexicalScan {
    pub left: BTreeMap<String, usize>,
    pub right: BTreeMap<String, usize>,
    pub neutral: BTreeMap<String, usize>,
    pub emotional: BTreeMap<String, usize>,
    /// Tokens covered by a partisan or emotional match
    pub marker_tokens: usize,
}

impl LexicalScan {
    pub fn partisan_hits(&self) -> usize {
        [&self.left, &self.right, &self.neutral]
            .iter()
            .flat_map(|bucket| bucket.values())
            .sum()
    }

    pub fn emotional_hits(&self) -> usize {
        self.emotional.values().sum()
    }
}

/// Read-only marker sets used by the bias scorer.
///
/// A term belongs to one partisan side at most. Terms are stored
/// longest-first so multi-word phrases win over their prefixes.
#[derive(Debug, Clone)]
pub struct Lexicon {
    partisan: Vec<(Term, Side)>,
    emotional: Vec<Term>,
    opinion_markers: Vec<Term>,
}

impl Lexicon {
    /// Build and validate a lexicon.
    pub fn new<S: AsRef<str>>(left: &[S], right: &[S], emotional: &[S], opinion_markers: &[S]) -> Result<Self> {
        let lexicon = Self::build(left, right, emotional, opinion_markers);
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub(crate) fn build<S: AsRef<str>>(left: &[S], right: &[S], emotional: &[S], opinion_markers: &[S]) -> Self {
        let mut partisan: Vec<(Term, Side)> = left
            .iter()
            .filter_map(|t| Term::new(t.as_ref()).map(|t| (t, Side::Left)))
            .chain(right.iter().filter_map(|t| Term::new(t.as_ref()).map(|t| (t, Side::Right))))
            .collect();
        sort_partisan(&mut partisan);

        Self {
            partisan,
            emotional: sorted_terms(emotional),
            opinion_markers: sorted_terms(opinion_markers),
        }
    }

    /// Add side-neutral partisan markers and revalidate.
    pub fn with_neutral<S: AsRef<str>>(self, neutral: &[S]) -> Result<Self> {
        let lexicon = self.add_neutral(neutral);
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub(crate) fn add_neutral<S: AsRef<str>>(mut self, neutral: &[S]) -> Self {
        self.partisan
            .extend(neutral.iter().filter_map(|t| Term::new(t.as_ref()).map(|t| (t, Side::Neutral))));
        sort_partisan(&mut self.partisan);
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut sides: HashMap<&str, Side> = HashMap::new();
        let mut overlap: Vec<&str> = Vec::new();
        for (term, side) in &self.partisan {
            if let Some(existing) = sides.insert(term.text.as_str(), *side) {
                if existing != *side && !overlap.contains(&term.text.as_str()) {
                    overlap.push(term.text.as_str());
                }
            }
        }
        if !overlap.is_empty() {
            bail!("partisan marker sets overlap: {}", overlap.join(", "));
        }
        if self.partisan.is_empty() {
            bail!("lexicon has no partisan markers");
        }
        Ok(())
    }

    /// Find partisan and emotional markers in lowercased tokens.
    ///
    /// Matches never overlap within an axis. A token used by both axes is
    /// counted once in `marker_tokens`.
    pub fn scan(&self, tokens: &[String]) -> LexicalScan {
        let mut scan = LexicalScan::default();
        let mut covered = vec![false; tokens.len()];

        let mut used = vec![false; tokens.len()];
        for_each_match(tokens, &self.partisan, |(t, _)| t, &mut used, |(term, side)| {
            let bucket = match side {
                Side::Left => &mut scan.left,
                Side::Right => &mut scan.right,
                Side::Neutral => &mut scan.neutral,
            };
            *bucket.entry(term.text.clone()).or_insert(0) += 1;
        });
        merge_coverage(&mut covered, &used);

        let mut used = vec![false; tokens.len()];
        for_each_match(tokens, &self.emotional, |t| t, &mut used, |term| {
            *scan.emotional.entry(term.text.clone()).or_insert(0) += 1;
        });
        merge_coverage(&mut covered, &used);

        scan.marker_tokens = covered.iter().filter(|c| **c).count();
        scan
    }

    /// True when any opinion marker occurs in the tokens.
    pub fn has_opinion_marker(&self, tokens: &[String]) -> bool {
        let free = vec![false; tokens.len()];
        (0..tokens.len()).any(|i| self.opinion_markers.iter().any(|t| t.matches_at(tokens, i, &free)))
    }
}

fn sort_partisan(partisan: &mut [(Term, Side)]) {
    partisan.sort_by(|a, b| b.0.tokens.len().cmp(&a.0.tokens.len()).then_with(|| a.0.text.cmp(&b.0.text)));
}

fn sorted_terms<S: AsRef<str>>(raw: &[S]) -> Vec<Term> {
    let mut terms: Vec<Term> = raw.iter().filter_map(|t| Term::new(t.as_ref())).collect();
    terms.sort_by(|a, b| b.tokens.len().cmp(&a.tokens.len()).then_with(|| a.text.cmp(&b.text)));
    terms.dedup_by(|a, b| a.text == b.text);
    terms
}

fn merge_coverage(covered: &mut [bool], used: &[bool]) {
    for (c, u) in covered.iter_mut().zip(used) {
        *c |= *u;
    }
}

/// Left-to-right scan taking the longest term at each position.
fn for_each_match<'a, E>(
    tokens: &[String],
    entries: &'a [E],
    term_of: impl Fn(&'a E) -> &'a Term,
    used: &mut [bool],
    mut on_match: impl FnMut(&'a E),
) {
    let mut i = 0;
    while i < tokens.len() {
        match entries.iter().find(|&e| term_of(e).matches_at(tokens, i, used)) {
            Some(entry) => {
                let len = term_of(entry).tokens.len();
                used[i..i + len].iter_mut().for_each(|u| *u = true);
                on_match(entry);
                i += len;
            }
            None => i += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lexicon() -> Lexicon {
        Lexicon::new(
            &["progressive", "climate crisis"],
            &["radical left", "woke", "open borders"],
            &["shocking", "outrage"],
            &["should", "i think"],
        )
        .expect("valid lexicon")
    }

    #[test]
    fn rejects_overlapping_partisan_sets() {
        let err = Lexicon::new(&["woke"], &["Woke"], &["shocking"], &["should"]).unwrap_err();
        assert!(err.to_string().contains("woke"));
    }

    #[test]
    fn scans_multi_word_terms() {
        let tokens = tokenize("The radical left and woke activists call the climate crisis shocking, shocking!");
        let scan = lexicon().scan(&tokens);
        assert_eq!(scan.right.get("radical left"), Some(&1));
        assert_eq!(scan.right.get("woke"), Some(&1));
        assert_eq!(scan.left.get("climate crisis"), Some(&1));
        assert_eq!(scan.emotional.get("shocking"), Some(&2));
        assert_eq!(scan.partisan_hits(), 3);
        assert_eq!(scan.marker_tokens, 2 + 1 + 2 + 2);
    }

    #[test]
    fn neutral_markers_count_without_taking_a_side() {
        let lex = lexicon().with_neutral(&["red state", "the left"]).expect("valid lexicon");
        let scan = lex.scan(&tokenize("The left says red state voters fear the radical left"));
        assert_eq!(scan.neutral.get("the left"), Some(&1));
        assert_eq!(scan.neutral.get("red state"), Some(&1));
        assert_eq!(scan.right.get("radical left"), Some(&1));
        assert_eq!(scan.partisan_hits(), 3);

        let err = lexicon().with_neutral(&["woke"]).unwrap_err();
        assert!(err.to_string().contains("overlap: woke"));
    }

    #[test]
    fn matches_whole_words_only() {
        let scan = lexicon().scan(&tokenize("Progressives awoke to outrageous news"));
        assert_eq!(scan.partisan_hits(), 0);
        assert_eq!(scan.emotional_hits(), 0);
    }

    #[test]
    fn detects_opinion_markers() {
        let lex = lexicon();
        assert!(lex.has_opinion_marker(&tokenize("Voters should decide")));
        assert!(lex.has_opinion_marker(&tokenize("I think it passed")));
        assert!(!lex.has_opinion_marker(&tokenize("The bill passed 52 to 48")));
    }
}
