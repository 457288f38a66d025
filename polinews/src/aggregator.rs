//! Multi-provider fan-out, time filtering, dedup and source diversity.
//!
//! Pipeline for one request:
//!
//! 1. every adapter is fetched concurrently, each under its own timeout, and
//!    all of them are joined before anything is merged;
//! 2. articles outside `[now - hours, now]` are dropped;
//! 3. near-duplicates collapse onto one record (see [`crate::dedup`]);
//! 4. each source is capped at a fraction of the target size;
//! 5. the survivors are ordered newest first and truncated to the target.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::AggregationConfig;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::article::Article;
use crate::dedup::{self, normalize_source};
use crate::error::{AggregateError, ProviderUnavailable, UnavailableReason};
use crate::providers::ProviderAdapter;

pub const DEFAULT_HOURS: u32 = 24;
pub const DEFAULT_DIVERSITY_CAP: f64 = 0.4;
pub const DEFAULT_MAX_ARTICLES: usize = 20;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Largest share of the target size a single source may fill
    pub diversity_cap: f64,
    pub max_articles: usize,
    pub provider_timeout: Duration,
    pub min_sources_represented: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            diversity_cap: DEFAULT_DIVERSITY_CAP,
            max_articles: DEFAULT_MAX_ARTICLES,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            min_sources_represented: 0,
        }
    }
}

impl AggregatorSettings {
    pub fn from_config(config: &AggregationConfig) -> Self {
        let defaults = Self::default();
        Self {
            diversity_cap: config
                .diversity_cap
                .filter(|f| *f > 0.0 && *f <= 1.0)
                .unwrap_or(defaults.diversity_cap),
            max_articles: config.max_articles.filter(|n| *n > 0).unwrap_or(defaults.max_articles),
            provider_timeout: config
                .provider_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            min_sources_represented: config.min_sources_represented.unwrap_or(defaults.min_sources_represented),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub query: String,
    pub hours: u32,
    /// Overrides the configured coverage target when set
    pub min_sources_represented: Option<usize>,
}

impl AggregateRequest {
    pub fn new(query: impl Into<String>, hours: u32) -> Self {
        Self {
            query: query.into(),
            hours,
            min_sources_represented: None,
        }
    }

    pub fn with_min_sources(mut self, min_sources: usize) -> Self {
        self.min_sources_represented = Some(min_sources);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOutcome {
    pub provider: String,
    pub fetched: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Articles removed at each pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropStats {
    pub stale: usize,
    pub duplicate: usize,
    pub over_cap: usize,
    pub over_target: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregationOutcome {
    /// Newest first
    pub articles: Vec<Article>,
    pub providers: Vec<ProviderOutcome>,
    pub dropped: DropStats,
    pub sources_represented: usize,
    pub meets_source_minimum: bool,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

/// Fans a query out to every adapter and merges the results.
pub struct Aggregator<P> {
    providers: Vec<Arc<P>>,
    settings: AggregatorSettings,
}

impl<P> Aggregator<P>
where
    P: ProviderAdapter + 'static,
{
    pub fn new(providers: Vec<P>, settings: AggregatorSettings) -> Self {
        Self {
            providers: providers.into_iter().map(Arc::new).collect(),
            settings,
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub async fn aggregate(&self, request: &AggregateRequest) -> Result<AggregationOutcome, AggregateError> {
        self.aggregate_at(request, Utc::now()).await
    }

    /// Same as [`Aggregator::aggregate`] with an explicit "now".
    pub async fn aggregate_at(
        &self,
        request: &AggregateRequest,
        now: DateTime<Utc>,
    ) -> Result<AggregationOutcome, AggregateError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(AggregateError::InvalidRequest("query must not be empty".to_string()));
        }
        if request.hours == 0 {
            return Err(AggregateError::InvalidRequest("hours must be greater than zero".to_string()));
        }

        let window_start = now
            .checked_sub_signed(chrono::Duration::hours(i64::from(request.hours)))
            .ok_or_else(|| {
                AggregateError::InvalidRequest(format!("hours {} reaches past the supported date range", request.hours))
            })?;
        let min_sources = request
            .min_sources_represented
            .unwrap_or(self.settings.min_sources_represented);

        if self.providers.is_empty() {
            warn!("no news providers configured, returning empty result");
            return Ok(AggregationOutcome {
                articles: Vec::new(),
                providers: Vec::new(),
                dropped: DropStats::default(),
                sources_represented: 0,
                meets_source_minimum: min_sources == 0,
                window_start,
                window_end: now,
                fetched_at: Utc::now(),
            });
        }

        info!(query, hours = request.hours, providers = self.providers.len(), "aggregating news");
        let results = self.fetch_all(query, request.hours).await;

        let mut outcomes = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        let mut candidates = Vec::new();
        for result in results {
            match result {
                Ok((provider, articles)) => {
                    info!("{}: {} articles", provider, articles.len());
                    outcomes.push(ProviderOutcome {
                        provider,
                        fetched: articles.len(),
                        failure: None,
                    });
                    candidates.extend(articles);
                }
                Err(failure) => {
                    warn!(provider = %failure.provider, reason = %failure.reason, "provider unavailable, skipping");
                    outcomes.push(ProviderOutcome {
                        provider: failure.provider.clone(),
                        fetched: 0,
                        failure: Some(failure.reason.to_string()),
                    });
                    failures.push(failure);
                }
            }
        }
        if failures.len() == self.providers.len() {
            return Err(AggregateError::AggregationFailed { failures });
        }

        let mut dropped = DropStats::default();

        let before = candidates.len();
        candidates.retain(|a| a.published_at >= window_start && a.published_at <= now);
        dropped.stale = before - candidates.len();

        let priorities: HashMap<String, i32> = self
            .providers
            .iter()
            .map(|p| (p.name().to_string(), p.priority()))
            .collect();
        let before = candidates.len();
        let unique = dedup::deduplicate(candidates, |name| priorities.get(name).copied().unwrap_or(0));
        dropped.duplicate = before - unique.len();

        let before = unique.len();
        let mut articles = self.diversify(unique);
        dropped.over_cap = before - articles.len();

        sort_newest_first(&mut articles);
        dropped.over_target = articles.len().saturating_sub(self.settings.max_articles);
        articles.truncate(self.settings.max_articles);

        let sources_represented = articles
            .iter()
            .map(|a| normalize_source(&a.source_name))
            .collect::<HashSet<_>>()
            .len();
        let meets_source_minimum = sources_represented >= min_sources;
        if !meets_source_minimum {
            warn!(
                sources_represented,
                min_sources, "fewer distinct sources than requested"
            );
        }

        debug!(?dropped, "aggregation filters applied");
        info!("aggregated {} articles from {} sources", articles.len(), sources_represented);

        Ok(AggregationOutcome {
            articles,
            providers: outcomes,
            dropped,
            sources_represented,
            meets_source_minimum,
            window_start,
            window_end: now,
            fetched_at: Utc::now(),
        })
    }

    /// One task per adapter, all joined before returning. Results keep
    /// provider order.
    async fn fetch_all(&self, query: &str, hours: u32) -> Vec<Result<(String, Vec<Article>), ProviderUnavailable>> {
        let timeout = self.settings.provider_timeout;
        let handles: Vec<_> = self
            .providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let query = query.to_string();
                tokio::spawn(async move {
                    let name = provider.name().to_string();
                    match tokio::time::timeout(timeout, provider.fetch(&query, hours)).await {
                        Ok(Ok(articles)) => Ok((name, articles)),
                        Ok(Err(e)) => Err(e),
                        Err(_) => Err(ProviderUnavailable::new(name, UnavailableReason::TimedOut(timeout))),
                    }
                })
            })
            .collect();

        let names: Vec<String> = self.providers.iter().map(|p| p.name().to_string()).collect();
        join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, name)| {
                joined.unwrap_or_else(|e| Err(ProviderUnavailable::new(name, UnavailableReason::Aborted(e.to_string()))))
            })
            .collect()
    }

    /// Keep at most `max(1, floor(fraction * min(max_articles, n)))` articles
    /// per source, preferring the most recent.
    fn diversify(&self, articles: Vec<Article>) -> Vec<Article> {
        let target = self.settings.max_articles.min(articles.len());
        let cap = ((self.settings.diversity_cap * target as f64).floor() as usize).max(1);

        let mut by_source: HashMap<String, Vec<Article>> = HashMap::new();
        for article in articles {
            by_source
                .entry(normalize_source(&article.source_name))
                .or_default()
                .push(article);
        }

        let mut kept = Vec::new();
        for (source, mut group) in by_source {
            sort_newest_first(&mut group);
            if group.len() > cap {
                debug!(source = %source, total = group.len(), cap, "source over diversity cap");
                group.truncate(cap);
            }
            kept.extend(group);
        }
        kept
    }
}

fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.url.cmp(&b.url))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderResult;
    use chrono::TimeZone;

    struct Fixed {
        name: &'static str,
        articles: Vec<Article>,
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _query: &str, _hours: u32) -> ProviderResult<Vec<Article>> {
            Ok(self.articles.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn article(title: &str, source: &str, minutes_ago: i64) -> Article {
        Article::new(
            title,
            "",
            source,
            format!("https://{}.example/{}", source.to_lowercase(), minutes_ago),
            now() - chrono::Duration::minutes(minutes_ago),
            "fixed",
        )
    }

    #[tokio::test]
    async fn rejects_invalid_requests() {
        let agg = Aggregator::new(Vec::<Fixed>::new(), AggregatorSettings::default());
        assert!(matches!(
            agg.aggregate_at(&AggregateRequest::new("  ", 24), now()).await,
            Err(AggregateError::InvalidRequest(_))
        ));
        assert!(matches!(
            agg.aggregate_at(&AggregateRequest::new("senate", 0), now()).await,
            Err(AggregateError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn rejects_window_reaching_past_supported_dates() {
        let provider = Fixed {
            name: "fixed",
            articles: vec![article("Story", "Reuters", 5)],
        };
        let agg = Aggregator::new(vec![provider], AggregatorSettings::default());
        match agg.aggregate_at(&AggregateRequest::new("senate", u32::MAX), now()).await {
            Err(AggregateError::InvalidRequest(msg)) => assert!(msg.contains("hours")),
            other => panic!("expected InvalidRequest, got {:?}", other.map(|o| o.articles.len())),
        }
        // a window of decades is still valid
        let outcome = agg
            .aggregate_at(&AggregateRequest::new("senate", 24 * 365 * 50), now())
            .await
            .expect("long window");
        assert_eq!(outcome.articles.len(), 1);
    }

    #[tokio::test]
    async fn no_providers_is_an_empty_result() {
        let agg = Aggregator::new(Vec::<Fixed>::new(), AggregatorSettings::default());
        let outcome = agg
            .aggregate_at(&AggregateRequest::new("senate", 24), now())
            .await
            .expect("empty result");
        assert!(outcome.articles.is_empty());
        assert!(outcome.providers.is_empty());
    }

    #[tokio::test]
    async fn window_bounds_are_inclusive() {
        let provider = Fixed {
            name: "fixed",
            articles: vec![
                article("Exactly now", "Reuters", 0),
                article("Exactly at start", "NPR", 24 * 60),
                article("Just too old", "PBS", 24 * 60 + 1),
                article("From the future", "AP", -5),
            ],
        };
        let agg = Aggregator::new(vec![provider], AggregatorSettings::default());
        let outcome = agg
            .aggregate_at(&AggregateRequest::new("senate", 24), now())
            .await
            .expect("aggregation");
        let titles: Vec<&str> = outcome.articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Exactly now", "Exactly at start"]);
        assert_eq!(outcome.dropped.stale, 2);
    }

    #[test]
    fn diversity_caps_dominant_source() {
        let settings = AggregatorSettings {
            max_articles: 5,
            ..AggregatorSettings::default()
        };
        let agg: Aggregator<Fixed> = Aggregator::new(Vec::new(), settings);
        let mut articles: Vec<Article> = (0..10).map(|i| article(&format!("Story {}", i), "CNN", i)).collect();
        articles.push(article("Other story", "NPR", 3));

        let kept = agg.diversify(articles);
        let from_cnn: Vec<&Article> = kept.iter().filter(|a| a.source_name == "CNN").collect();
        assert_eq!(from_cnn.len(), 2);
        // the two most recent survive
        assert!(from_cnn.iter().any(|a| a.title == "Story 0"));
        assert!(from_cnn.iter().any(|a| a.title == "Story 1"));
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn settings_fall_back_on_invalid_config() {
        let config = AggregationConfig {
            diversity_cap: Some(1.5),
            max_articles: Some(0),
            provider_timeout_seconds: Some(3),
            ..AggregationConfig::default()
        };
        let settings = AggregatorSettings::from_config(&config);
        assert_eq!(settings.diversity_cap, DEFAULT_DIVERSITY_CAP);
        assert_eq!(settings.max_articles, DEFAULT_MAX_ARTICLES);
        assert_eq!(settings.provider_timeout, Duration::from_secs(3));
    }
}
