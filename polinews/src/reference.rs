//! Versioned reference data: partisan/emotional lexicon and credibility tables.
//!
//! The built-in set can be replaced wholesale by a TOML file:
//!
//! ```toml
//! version = "2025.2"
//!
//! [lexicon]
//! left_leaning = ["climate crisis"]
//! right_leaning = ["radical left"]
//! neutral = ["red state"]
//! emotional = ["shocking"]
//! opinion_markers = ["should"]
//!
//! [credibility]
//! high = ["Reuters"]
//! medium = ["Bloomberg"]
//! low = ["Breitbart"]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::credibility::CredibilityTable;
use crate::lexicon::Lexicon;

pub const BUILTIN_VERSION: &str = "builtin-2025.1";

// Sides follow who typically uses a term, not whom it describes.
const LEFT_LEANING: &[&str] = &[
    "progressive", "social justice", "systemic racism", "climate crisis", "climate emergency",
    "undocumented immigrants", "reproductive rights", "pro-choice", "corporate greed",
    "wealth inequality", "voter suppression", "far-right", "alt-right", "maga extremists",
    "assault weapons", "gun violence epidemic", "white supremacy", "defund the police",
    "living wage", "tax cuts for the rich",
];

const RIGHT_LEANING: &[&str] = &[
    "radical left", "far-left", "liberal agenda", "socialist", "woke", "cancel culture",
    "illegal aliens", "open borders", "pro-life", "gun rights", "traditional values",
    "america first", "deep state", "mainstream media", "big government", "election integrity",
    "death tax", "job killing", "government takeover", "conservative agenda",
];

const NEUTRAL_PARTISAN: &[&str] = &[
    "democrats say", "republicans claim", "liberals argue", "conservatives believe", "the left",
    "the right", "blue state", "red state",
];

const EMOTIONAL: &[&str] = &[
    "outrageous", "shocking", "devastating", "amazing", "incredible", "terrible", "wonderful",
    "horrible", "fantastic", "disgusting", "disaster", "catastrophe", "catastrophic", "miracle",
    "slams", "blasts", "destroys", "chaos", "meltdown", "bombshell", "furious", "outrage",
    "explosive", "stunning", "scandal", "nightmare", "revolutionary", "groundbreaking",
];

const OPINION_MARKERS: &[&str] = &[
    "i think", "i believe", "in my opinion", "it seems", "appears", "arguably", "clearly",
    "obviously", "undoubtedly", "certainly", "definitely", "should", "must", "ought to",
    "many say", "some argue", "critics claim", "supporters believe", "unfortunately",
    "fortunately", "sadly",
];

const HIGH_CREDIBILITY: &[&str] = &[
    "reuters", "associated press", "ap", "ap news", "bbc news", "bbc", "npr", "pbs", "c-span",
    "wall street journal", "the wall street journal", "new york times", "the new york times",
    "washington post", "the washington post", "usa today", "cnn", "fox news", "msnbc", "abc news",
    "cbs news", "nbc news", "politico", "roll call", "the hill",
];

const MEDIUM_CREDIBILITY: &[&str] = &[
    "bloomberg", "forbes", "time", "newsweek", "the atlantic", "the new yorker",
    "national review", "the nation", "mother jones",
];

const LOW_CREDIBILITY: &[&str] = &[
    "breitbart", "breitbart news", "daily caller", "the daily caller", "daily beast",
    "the daily beast", "huffpost", "vox", "buzzfeed news", "vice news", "salon", "alternet",
];

/// Lexicon and credibility tables travelling together under one version.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub version: String,
    pub lexicon: Lexicon,
    pub credibility: CredibilityTable,
}

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    version: String,
    lexicon: LexiconSection,
    credibility: CredibilitySection,
}

#[derive(Debug, Deserialize)]
struct LexiconSection {
    left_leaning: Vec<String>,
    right_leaning: Vec<String>,
    #[serde(default)]
    neutral: Vec<String>,
    emotional: Vec<String>,
    #[serde(default)]
    opinion_markers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CredibilitySection {
    #[serde(default)]
    high: Vec<String>,
    #[serde(default)]
    medium: Vec<String>,
    #[serde(default)]
    low: Vec<String>,
}

impl ReferenceData {
    /// The curated tables shipped with the crate.
    pub fn builtin() -> Self {
        // checked by builtin_tables_are_valid
        Self {
            version: BUILTIN_VERSION.to_string(),
            lexicon: Lexicon::build(LEFT_LEANING, RIGHT_LEANING, EMOTIONAL, OPINION_MARKERS)
                .add_neutral(NEUTRAL_PARTISAN),
            credibility: CredibilityTable::build(HIGH_CREDIBILITY, MEDIUM_CREDIBILITY, LOW_CREDIBILITY),
        }
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let file: ReferenceFile = toml::from_str(data).context("failed to parse reference data")?;
        let lexicon = Lexicon::new(
            file.lexicon.left_leaning.as_slice(),
            file.lexicon.right_leaning.as_slice(),
            file.lexicon.emotional.as_slice(),
            file.lexicon.opinion_markers.as_slice(),
        )
        .and_then(|lexicon| lexicon.with_neutral(file.lexicon.neutral.as_slice()))
        .context("invalid lexicon")?;
        let credibility = CredibilityTable::new(
            file.credibility.high.as_slice(),
            file.credibility.medium.as_slice(),
            file.credibility.low.as_slice(),
        )
        .context("invalid credibility table")?;
        Ok(Self {
            version: file.version,
            lexicon,
            credibility,
        })
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("failed to read reference data: {}", path.as_ref().display()))?;
        Self::from_toml_str(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::{BiasScorer, PartisanLean};
    use crate::credibility::CredibilityTier;
    use crate::Article;
    use chrono::{TimeZone, Utc};

    fn score(title: &str, body: &str) -> crate::bias::BiasAnalysis {
        let published = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let article = Article::new(title, body, "Example Wire", "https://example.com/a", published, "test");
        BiasScorer::new(ReferenceData::builtin().lexicon).score(&article)
    }

    #[test]
    fn builtin_tables_are_valid() {
        let data = ReferenceData::builtin();
        assert!(data.lexicon.validate().is_ok());
        let checked = CredibilityTable::new(HIGH_CREDIBILITY, MEDIUM_CREDIBILITY, LOW_CREDIBILITY)
            .expect("builtin credibility tiers are disjoint");
        assert_eq!(data.credibility.len(), checked.len());
        assert!(!data.credibility.is_empty());
        assert_eq!(data.credibility.tier_of("Reuters"), CredibilityTier::High);
        assert_eq!(data.credibility.tier_of("Breitbart News"), CredibilityTier::Low);
        assert_eq!(data.version, BUILTIN_VERSION);
    }

    #[test]
    fn side_neutral_partisan_framing_is_scored() {
        let a = score(
            "Democrats say the left is united",
            "Republicans claim the right is winning. Liberals argue blue state budgets grow. \
             Conservatives believe red state taxes fall.",
        );
        assert!(a.bias_score > 0.0);
        assert_eq!(a.partisan_markers.len(), 8);
        assert!(a.partisan_markers.contains("red state"));
        assert_eq!(a.indicator_counts.get("partisan: the left"), Some(&1));
        assert_eq!(a.partisan_lean, PartisanLean::None);
    }

    #[test]
    fn sides_follow_who_uses_the_term() {
        assert_eq!(score("Woke mob targets school board", "").partisan_lean, PartisanLean::Right);
        assert_eq!(score("Far-right group rallies downtown", "").partisan_lean, PartisanLean::Left);
    }

    #[test]
    fn parses_reference_file() {
        let data = ReferenceData::from_toml_str(
            r#"
            version = "test-1"

            [lexicon]
            left_leaning = ["climate crisis"]
            right_leaning = ["radical left"]
            neutral = ["red state"]
            emotional = ["shocking"]

            [credibility]
            high = ["Example Wire"]
            "#,
        )
        .expect("valid reference data");
        assert_eq!(data.version, "test-1");
        assert_eq!(data.credibility.tier_of("example wire"), CredibilityTier::High);
        assert_eq!(data.credibility.tier_of("Reuters"), CredibilityTier::Unknown);
    }

    #[test]
    fn rejects_overlapping_lexicon() {
        let err = ReferenceData::from_toml_str(
            r#"
            version = "bad"
            [lexicon]
            left_leaning = ["woke"]
            right_leaning = ["woke"]
            emotional = []
            [credibility]
            "#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("overlap"));
    }
}
