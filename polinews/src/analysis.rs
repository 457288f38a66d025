use tracing::info;

use crate::article::Article;
use crate::bias::{BiasAnalysis, BiasScorer};
use crate::credibility::CredibilityAssessor;
use crate::reference::ReferenceData;
use crate::report::{AggregateReport, ReportBuilder, DEFAULT_TOP_K};

/// Scores a set of articles and folds the verdicts into a report.
///
/// Scoring is pure; the same articles always produce the same analyses and
/// report, in input order.
#[derive(Debug, Clone)]
pub struct BiasEngine {
    scorer: BiasScorer,
    assessor: CredibilityAssessor,
    reports: ReportBuilder,
}

impl BiasEngine {
    pub fn new(reference: ReferenceData) -> Self {
        Self::with_top_k(reference, DEFAULT_TOP_K)
    }

    pub fn with_top_k(reference: ReferenceData, top_k: usize) -> Self {
        Self {
            scorer: BiasScorer::new(reference.lexicon),
            assessor: CredibilityAssessor::new(reference.credibility),
            reports: ReportBuilder::new(reference.version).with_top_k(top_k),
        }
    }

    pub fn analyze_article(&self, article: &Article) -> BiasAnalysis {
        let tier = self.assessor.assess(&article.source_name);
        self.scorer.score(article).with_credibility(tier)
    }

    pub fn analyze(&self, articles: &[Article]) -> (AggregateReport, Vec<BiasAnalysis>) {
        let pairs: Vec<(Article, BiasAnalysis)> = articles
            .iter()
            .map(|a| (a.clone(), self.analyze_article(a)))
            .collect();
        let report = self.reports.build(&pairs);
        info!(
            articles = report.total_articles_analyzed,
            average = report.average_bias_score,
            "bias analysis complete"
        );
        let analyses = pairs.into_iter().map(|(_, analysis)| analysis).collect();
        (report, analyses)
    }
}
