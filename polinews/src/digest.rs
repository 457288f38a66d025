use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregator::{AggregationOutcome, DropStats, ProviderOutcome};
use crate::article::Article;
use crate::bias::BiasAnalysis;
use crate::report::AggregateReport;

/// Everything one run produces, shaped for a downstream summarizer.
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub query: String,
    pub hours: u32,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub providers: Vec<ProviderOutcome>,
    pub dropped: DropStats,
    pub sources_represented: usize,
    pub meets_source_minimum: bool,
    pub articles: Vec<Article>,
    pub analyses: Vec<BiasAnalysis>,
    pub report: AggregateReport,
}

impl Digest {
    pub fn new(
        query: impl Into<String>,
        hours: u32,
        outcome: AggregationOutcome,
        report: AggregateReport,
        analyses: Vec<BiasAnalysis>,
    ) -> Self {
        Self {
            query: query.into(),
            hours,
            window_start: outcome.window_start,
            window_end: outcome.window_end,
            fetched_at: outcome.fetched_at,
            providers: outcome.providers,
            dropped: outcome.dropped,
            sources_represented: outcome.sources_represented,
            meets_source_minimum: outcome.meets_source_minimum,
            articles: outcome.articles,
            analyses,
            report,
        }
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
