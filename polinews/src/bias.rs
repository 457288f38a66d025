//! Lexical bias scoring of single articles.
//!
//! The score is an explainable heuristic. Partisan and emotional markers are
//! counted per 50-word window of non-marker text:
//!
//! ```text
//! density   = hits * 50 / max(context_words, 50)
//! partisan  = min(partisan_density / 3.0, 1)
//! emotional = min(emotional_density / 4.0, 1)
//! score     = clamp(0.7 * partisan + 0.3 * emotional, 0, 1)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::credibility::CredibilityTier;
use crate::lexicon::{LexicalScan, Lexicon};
use crate::text::{sentences, tokenize, words};

const WINDOW_WORDS: f64 = 50.0;
const PARTISAN_SATURATION: f64 = 3.0;
const EMOTIONAL_SATURATION: f64 = 4.0;
const PARTISAN_WEIGHT: f64 = 0.7;
const EMOTIONAL_WEIGHT: f64 = 0.3;

const PRONOUNS: &[&str] = &["i", "me", "my", "mine", "we", "us", "our", "ours", "you", "your", "yours"];

pub const NOTE_UNKNOWN_SOURCE: &str = "Source credibility unknown - verify independently";
pub const NOTE_LOW_CREDIBILITY: &str = "Source has a low credibility rating - cross-reference claims";
pub const NOTE_EMOTIONAL: &str = "Emotional language present - focus on the facts";
pub const NOTE_PARTISAN: &str = "Partisan framing detected - seek balanced coverage";
pub const NOTE_OPINION: &str = "Article contains more opinion than fact";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BiasCategory {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl BiasCategory {
    pub const ALL: [BiasCategory; 4] = [
        BiasCategory::Low,
        BiasCategory::Moderate,
        BiasCategory::High,
        BiasCategory::VeryHigh,
    ];

    /// `[0,0.25)` Low, `[0.25,0.5)` Moderate, `[0.5,0.75)` High, `[0.75,1]` Very High.
    pub fn from_score(score: f64) -> Self {
        if score < 0.25 {
            BiasCategory::Low
        } else if score < 0.5 {
            BiasCategory::Moderate
        } else if score < 0.75 {
            BiasCategory::High
        } else {
            BiasCategory::VeryHigh
        }
    }
}

impl fmt::Display for BiasCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BiasCategory::Low => "Low",
            BiasCategory::Moderate => "Moderate",
            BiasCategory::High => "High",
            BiasCategory::VeryHigh => "Very High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartisanLean {
    None,
    Left,
    Right,
    Mixed,
}

/// Per-article verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub article_id: String,
    pub source_name: String,
    pub bias_score: f64,
    pub bias_category: BiasCategory,
    pub emotional_language_flags: BTreeSet<String>,
    pub partisan_markers: BTreeSet<String>,
    pub partisan_lean: PartisanLean,
    /// `"partisan: <term>"` / `"emotional: <term>"` → occurrences
    pub indicator_counts: BTreeMap<String, usize>,
    pub credibility_tier: CredibilityTier,
    pub fact_opinion_ratio: f64,
    pub sentence_count: usize,
    pub notes: Vec<String>,
}

impl BiasAnalysis {
    /// Attach the source's credibility tier and refresh the notes.
    pub fn with_credibility(mut self, tier: CredibilityTier) -> Self {
        self.credibility_tier = tier;
        self.notes = self.compute_notes();
        self
    }

    fn hits(&self, axis: &str) -> usize {
        let prefix = format!("{}: ", axis);
        self.indicator_counts
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, n)| *n)
            .sum()
    }

    fn compute_notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        match self.credibility_tier {
            CredibilityTier::Unknown => notes.push(NOTE_UNKNOWN_SOURCE),
            CredibilityTier::Low => notes.push(NOTE_LOW_CREDIBILITY),
            _ => {}
        }
        if self.hits("emotional") >= 2 {
            notes.push(NOTE_EMOTIONAL);
        }
        if self.hits("partisan") >= 2 {
            notes.push(NOTE_PARTISAN);
        }
        if self.fact_opinion_ratio < 0.5 {
            notes.push(NOTE_OPINION);
        }
        notes.into_iter().map(String::from).collect()
    }
}

/// Pure scorer over an injected lexicon.
#[derive(Debug, Clone)]
pub struct BiasScorer {
    lexicon: Lexicon,
}

impl BiasScorer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Score one article. The credibility tier starts as `Unknown`; see
    /// [`BiasAnalysis::with_credibility`].
    pub fn score(&self, article: &Article) -> BiasAnalysis {
        let text = format!("{}. {}", article.title, article.body_snippet);
        let tokens = tokenize(&text);
        let scan = self.lexicon.scan(&tokens);

        let context_words = tokens.len().saturating_sub(scan.marker_tokens);
        let bias_score = combined_score(scan.partisan_hits(), scan.emotional_hits(), context_words);
        let (fact_opinion_ratio, sentence_count) = self.fact_opinion_ratio(&text);

        let mut analysis = BiasAnalysis {
            article_id: article.id.clone(),
            source_name: article.source_name.clone(),
            bias_score,
            bias_category: BiasCategory::from_score(bias_score),
            emotional_language_flags: scan.emotional.keys().cloned().collect(),
            partisan_markers: partisan_terms(&scan).map(|(t, _)| t.clone()).collect(),
            partisan_lean: lean(&scan),
            indicator_counts: indicator_counts(&scan),
            credibility_tier: CredibilityTier::Unknown,
            fact_opinion_ratio,
            sentence_count,
            notes: Vec::new(),
        };
        analysis.notes = analysis.compute_notes();
        analysis
    }

    /// Factual sentences over all sentences; `1.0` when there are none.
    fn fact_opinion_ratio(&self, text: &str) -> (f64, usize) {
        let all = sentences(text);
        if all.is_empty() {
            return (1.0, 0);
        }
        let opinion = all.iter().filter(|s| self.is_opinion(s)).count();
        ((all.len() - opinion) as f64 / all.len() as f64, all.len())
    }

    fn is_opinion(&self, sentence: &str) -> bool {
        let original = words(sentence);
        if original.iter().any(|w| is_pronoun(w)) {
            return true;
        }
        let tokens: Vec<String> = original.iter().map(|w| w.to_lowercase()).collect();
        self.lexicon.has_opinion_marker(&tokens)
    }
}

fn combined_score(partisan_hits: usize, emotional_hits: usize, context_words: usize) -> f64 {
    let window = (context_words as f64).max(WINDOW_WORDS);
    let density = |hits: usize| hits as f64 * WINDOW_WORDS / window;
    let partisan = (density(partisan_hits) / PARTISAN_SATURATION).min(1.0);
    let emotional = (density(emotional_hits) / EMOTIONAL_SATURATION).min(1.0);
    (PARTISAN_WEIGHT * partisan + EMOTIONAL_WEIGHT * emotional).clamp(0.0, 1.0)
}

/// "US" in capitals is the country, not the pronoun.
fn is_pronoun(word: &str) -> bool {
    let shouted = word.chars().count() > 1 && word.chars().all(|c| c.is_uppercase());
    !shouted && PRONOUNS.contains(&word.to_lowercase().as_str())
}

fn lean(scan: &LexicalScan) -> PartisanLean {
    let left: usize = scan.left.values().sum();
    let right: usize = scan.right.values().sum();
    match (left, right) {
        (0, 0) => PartisanLean::None,
        (l, r) if l > r => PartisanLean::Left,
        (l, r) if r > l => PartisanLean::Right,
        _ => PartisanLean::Mixed,
    }
}

fn partisan_terms(scan: &LexicalScan) -> impl Iterator<Item = (&String, &usize)> {
    scan.left.iter().chain(scan.right.iter()).chain(scan.neutral.iter())
}

fn indicator_counts(scan: &LexicalScan) -> BTreeMap<String, usize> {
    let partisan = partisan_terms(scan).map(|(t, n)| (format!("partisan: {}", t), *n));
    let emotional = scan.emotional.iter().map(|(t, n)| (format!("emotional: {}", t), *n));
    partisan.chain(emotional).collect()
}
