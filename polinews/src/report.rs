use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::article::Article;
use crate::bias::{BiasAnalysis, BiasCategory};
use crate::credibility::CredibilityTier;
use crate::dedup::normalize_source;

pub const DEFAULT_TOP_K: usize = 3;
const TOP_INDICATORS: usize = 10;

pub const REC_EMPTY: &str = "No articles were analyzed - broaden the query or time window";
pub const REC_BALANCED: &str = "Most articles appear credible and balanced";
pub const REC_SIGNIFICANT_BIAS: &str = "Overall coverage shows significant bias - seek diverse sources";
pub const REC_MODERATE_BIAS: &str = "Coverage shows moderate bias - compare perspectives across outlets";
pub const REC_MAJORITY_BIASED: &str = "Majority of articles show bias - verify information independently";
pub const REC_UNKNOWN_SOURCES: &str = "Many sources have unknown credibility - verify independently";
pub const REC_LOW_SOURCES: &str = "Several articles come from low-credibility sources - cross-reference claims";
pub const REC_MIXED: &str = "Coverage is mixed - cross-reference key claims with multiple sources";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRanking {
    pub source_name: String,
    /// High and Medium appearances minus Low appearances
    pub score: i64,
    pub articles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorCount {
    pub indicator: String,
    pub occurrences: usize,
}

/// Corpus-level view over every analyzed article of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total_articles_analyzed: usize,
    pub no_articles_analyzed: bool,
    pub average_bias_score: f64,
    pub bias_distribution: BTreeMap<BiasCategory, usize>,
    pub credibility_distribution: BTreeMap<CredibilityTier, usize>,
    pub most_credible_sources: Vec<SourceRanking>,
    pub least_credible_sources: Vec<SourceRanking>,
    pub unknown_credibility_sources: Vec<String>,
    pub common_bias_indicators: Vec<IndicatorCount>,
    pub overall_recommendations: Vec<String>,
    pub reference_version: String,
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    top_k: usize,
    reference_version: String,
}

impl ReportBuilder {
    pub fn new(reference_version: impl Into<String>) -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            reference_version: reference_version.into(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn build(&self, analyses: &[(Article, BiasAnalysis)]) -> AggregateReport {
        let total = analyses.len();

        let mut bias_distribution: BTreeMap<BiasCategory, usize> =
            BiasCategory::ALL.iter().map(|c| (*c, 0)).collect();
        let mut credibility_distribution: BTreeMap<CredibilityTier, usize> =
            CredibilityTier::ALL.iter().map(|t| (*t, 0)).collect();
        let mut unknown = BTreeSet::new();
        let mut score_sum = 0.0;

        for (_, analysis) in analyses {
            score_sum += analysis.bias_score;
            *bias_distribution.entry(analysis.bias_category).or_insert(0) += 1;
            *credibility_distribution.entry(analysis.credibility_tier).or_insert(0) += 1;
            if analysis.credibility_tier == CredibilityTier::Unknown {
                unknown.insert(analysis.source_name.clone());
            }
        }

        let average_bias_score = if total == 0 { 0.0 } else { score_sum / total as f64 };
        let (most_credible_sources, least_credible_sources) = self.rank_sources(analyses);

        let overall_recommendations = recommendations(
            total,
            average_bias_score,
            &bias_distribution,
            &credibility_distribution,
        );

        AggregateReport {
            total_articles_analyzed: total,
            no_articles_analyzed: total == 0,
            average_bias_score,
            bias_distribution,
            credibility_distribution,
            most_credible_sources,
            least_credible_sources,
            unknown_credibility_sources: unknown.into_iter().collect(),
            common_bias_indicators: common_indicators(analyses),
            overall_recommendations,
            reference_version: self.reference_version.clone(),
        }
    }

    fn rank_sources(&self, analyses: &[(Article, BiasAnalysis)]) -> (Vec<SourceRanking>, Vec<SourceRanking>) {
        // grouped like the diversity cap; the first spelling seen is displayed
        let mut by_source: HashMap<String, SourceRanking> = HashMap::new();
        for (_, analysis) in analyses {
            let entry = by_source
                .entry(normalize_source(&analysis.source_name))
                .or_insert_with(|| SourceRanking {
                    source_name: analysis.source_name.clone(),
                    score: 0,
                    articles: 0,
                });
            entry.articles += 1;
            entry.score += match analysis.credibility_tier {
                CredibilityTier::High | CredibilityTier::Medium => 1,
                CredibilityTier::Low => -1,
                CredibilityTier::Unknown => 0,
            };
        }

        let (mut most, mut least): (Vec<_>, Vec<_>) = by_source
            .into_values()
            .filter(|r| r.score != 0)
            .partition(|r| r.score > 0);

        most.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.articles.cmp(&a.articles))
                .then_with(|| a.source_name.cmp(&b.source_name))
        });
        least.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| b.articles.cmp(&a.articles))
                .then_with(|| a.source_name.cmp(&b.source_name))
        });
        most.truncate(self.top_k);
        least.truncate(self.top_k);
        (most, least)
    }
}

fn common_indicators(analyses: &[(Article, BiasAnalysis)]) -> Vec<IndicatorCount> {
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, analysis) in analyses {
        for (indicator, n) in &analysis.indicator_counts {
            *totals.entry(indicator.as_str()).or_insert(0) += n;
        }
    }
    let mut counts: Vec<IndicatorCount> = totals
        .into_iter()
        .map(|(indicator, occurrences)| IndicatorCount {
            indicator: indicator.to_string(),
            occurrences,
        })
        .collect();
    // stable sort keeps the alphabetical order from the BTreeMap for ties
    counts.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
    counts.truncate(TOP_INDICATORS);
    counts
}

fn recommendations(
    total: usize,
    average: f64,
    bias: &BTreeMap<BiasCategory, usize>,
    credibility: &BTreeMap<CredibilityTier, usize>,
) -> Vec<String> {
    if total == 0 {
        return vec![REC_EMPTY.to_string()];
    }
    let n = total as f64;
    let share = |count: usize| count as f64 / n;
    let bias_count = |c: BiasCategory| bias.get(&c).copied().unwrap_or(0);
    let tier_count = |t: CredibilityTier| credibility.get(&t).copied().unwrap_or(0);

    let mut recs = Vec::new();
    let low_or_moderate = bias_count(BiasCategory::Low) + bias_count(BiasCategory::Moderate);
    if average < 0.3 && share(low_or_moderate) >= 0.7 {
        recs.push(REC_BALANCED);
    }
    if average >= 0.5 {
        recs.push(REC_SIGNIFICANT_BIAS);
    } else if average >= 0.3 {
        recs.push(REC_MODERATE_BIAS);
    }
    let high_or_very_high = bias_count(BiasCategory::High) + bias_count(BiasCategory::VeryHigh);
    if share(high_or_very_high) > 0.5 {
        recs.push(REC_MAJORITY_BIASED);
    }
    if share(tier_count(CredibilityTier::Unknown)) >= 0.5 {
        recs.push(REC_UNKNOWN_SOURCES);
    }
    if share(tier_count(CredibilityTier::Low)) > 0.3 {
        recs.push(REC_LOW_SOURCES);
    }
    if recs.is_empty() {
        recs.push(REC_MIXED);
    }
    recs.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeSet;

    use crate::bias::PartisanLean;

    fn pair(source: &str, n: usize, score: f64, tier: CredibilityTier, indicators: &[(&str, usize)]) -> (Article, BiasAnalysis) {
        let published = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let article = Article::new(
            format!("Story {} from {}", n, source),
            "",
            source,
            format!("https://example.com/{}/{}", source, n),
            published,
            "test",
        );
        let analysis = BiasAnalysis {
            article_id: article.id.clone(),
            source_name: source.to_string(),
            bias_score: score,
            bias_category: BiasCategory::from_score(score),
            emotional_language_flags: BTreeSet::new(),
            partisan_markers: BTreeSet::new(),
            partisan_lean: PartisanLean::None,
            indicator_counts: indicators.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            credibility_tier: tier,
            fact_opinion_ratio: 1.0,
            sentence_count: 1,
            notes: Vec::new(),
        };
        (article, analysis)
    }

    #[test]
    fn empty_input_is_flagged() {
        let report = ReportBuilder::new("test").build(&[]);
        assert_eq!(report.total_articles_analyzed, 0);
        assert!(report.no_articles_analyzed);
        assert_eq!(report.average_bias_score, 0.0);
        assert_eq!(report.bias_distribution.len(), 4);
        assert!(report.bias_distribution.values().all(|n| *n == 0));
        assert_eq!(report.overall_recommendations, vec![REC_EMPTY.to_string()]);
    }

    #[test]
    fn distribution_and_average() {
        let items = vec![
            pair("Reuters", 1, 0.1, CredibilityTier::High, &[]),
            pair("Reuters", 2, 0.3, CredibilityTier::High, &[]),
            pair("Blog", 1, 0.8, CredibilityTier::Unknown, &[]),
        ];
        let report = ReportBuilder::new("test").build(&items);
        assert_eq!(report.total_articles_analyzed, 3);
        assert!((report.average_bias_score - 0.4).abs() < 1e-12);
        assert_eq!(report.bias_distribution[&BiasCategory::Low], 1);
        assert_eq!(report.bias_distribution[&BiasCategory::Moderate], 1);
        assert_eq!(report.bias_distribution[&BiasCategory::VeryHigh], 1);
        assert_eq!(report.bias_distribution.values().sum::<usize>(), 3);
        assert_eq!(report.credibility_distribution[&CredibilityTier::High], 2);
        assert_eq!(report.unknown_credibility_sources, vec!["Blog".to_string()]);
        assert_eq!(report.overall_recommendations, vec![REC_MODERATE_BIAS.to_string()]);
    }

    #[test]
    fn ranks_sources_with_tie_breaks() {
        let items = vec![
            pair("NPR", 1, 0.1, CredibilityTier::High, &[]),
            pair("Reuters", 1, 0.1, CredibilityTier::High, &[]),
            pair("Reuters", 2, 0.1, CredibilityTier::High, &[]),
            pair("AP", 1, 0.1, CredibilityTier::High, &[]),
            pair("Bloomberg", 1, 0.1, CredibilityTier::Medium, &[]),
            pair("Breitbart", 1, 0.1, CredibilityTier::Low, &[]),
            pair("Salon", 1, 0.1, CredibilityTier::Low, &[]),
            pair("Salon", 2, 0.1, CredibilityTier::Low, &[]),
            pair("Blog", 1, 0.1, CredibilityTier::Unknown, &[]),
        ];
        let report = ReportBuilder::new("test").build(&items);
        let most: Vec<&str> = report.most_credible_sources.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(most, vec!["Reuters", "AP", "Bloomberg"]);
        let least: Vec<&str> = report.least_credible_sources.iter().map(|r| r.source_name.as_str()).collect();
        assert_eq!(least, vec!["Salon", "Breitbart"]);
    }

    #[test]
    fn ranks_domain_and_name_as_one_source() {
        let analyses = vec![
            pair("CNN", 1, 0.1, CredibilityTier::High, &[]),
            pair("cnn.com", 2, 0.1, CredibilityTier::Unknown, &[]),
            pair("https://www.cnn.com/politics", 3, 0.1, CredibilityTier::High, &[]),
            pair("Breitbart", 4, 0.6, CredibilityTier::Low, &[]),
        ];
        let report = ReportBuilder::new("test").build(&analyses);
        assert_eq!(report.most_credible_sources.len(), 1);
        let cnn = &report.most_credible_sources[0];
        assert_eq!(cnn.source_name, "CNN");
        assert_eq!(cnn.articles, 3);
        assert_eq!(cnn.score, 2);
        assert_eq!(report.least_credible_sources[0].source_name, "Breitbart");
        assert_eq!(report.unknown_credibility_sources, vec!["cnn.com".to_string()]);
    }

    #[test]
    fn common_indicators_sorted_by_frequency_then_name() {
        let items = vec![
            pair("A", 1, 0.5, CredibilityTier::High, &[("emotional: shocking", 2), ("partisan: woke", 1)]),
            pair("B", 1, 0.5, CredibilityTier::High, &[("partisan: woke", 1), ("emotional: chaos", 2)]),
        ];
        let report = ReportBuilder::new("test").build(&items);
        let keys: Vec<(&str, usize)> = report
            .common_bias_indicators
            .iter()
            .map(|c| (c.indicator.as_str(), c.occurrences))
            .collect();
        assert_eq!(
            keys,
            vec![("emotional: chaos", 2), ("emotional: shocking", 2), ("partisan: woke", 2)]
        );
    }

    #[test]
    fn recommendation_rules() {
        let balanced: Vec<_> = (0..10).map(|i| pair("Reuters", i, 0.1, CredibilityTier::High, &[])).collect();
        assert_eq!(
            ReportBuilder::new("t").build(&balanced).overall_recommendations,
            vec![REC_BALANCED.to_string()]
        );

        let biased: Vec<_> = (0..4).map(|i| pair("Salon", i, 0.8, CredibilityTier::Low, &[])).collect();
        assert_eq!(
            ReportBuilder::new("t").build(&biased).overall_recommendations,
            vec![
                REC_SIGNIFICANT_BIAS.to_string(),
                REC_MAJORITY_BIASED.to_string(),
                REC_LOW_SOURCES.to_string()
            ]
        );

        let unknown: Vec<_> = (0..2).map(|i| pair("Blog", i, 0.1, CredibilityTier::Unknown, &[])).collect();
        assert_eq!(
            ReportBuilder::new("t").build(&unknown).overall_recommendations,
            vec![REC_BALANCED.to_string(), REC_UNKNOWN_SOURCES.to_string()]
        );

        // avg 0.28 but only half Low/Moderate: nothing fires
        let mixed = vec![
            pair("Reuters", 1, 0.0, CredibilityTier::High, &[]),
            pair("NPR", 1, 0.0, CredibilityTier::High, &[]),
            pair("AP", 1, 0.56, CredibilityTier::High, &[]),
            pair("PBS", 1, 0.56, CredibilityTier::High, &[]),
        ];
        assert_eq!(
            ReportBuilder::new("t").build(&mixed).overall_recommendations,
            vec![REC_MIXED.to_string()]
        );
    }
}
