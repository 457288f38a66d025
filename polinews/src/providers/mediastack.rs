use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{build_client, get_json, window_start, ProviderAdapter, ProviderSettings, Throttle};
use crate::article::{Article, RawArticle};
use crate::error::{ProviderResult, ProviderUnavailable, UnavailableReason};

/// MediaStack `/v1/news`.
///
/// Only day granularity is available for the time filter, so the aggregator's
/// own window check does the precise cut.
pub struct MediaStackAdapter {
    settings: ProviderSettings,
    client: Client,
    throttle: Throttle,
}

impl MediaStackAdapter {
    pub const NAME: &'static str = "mediastack";

    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(settings.request_timeout)?,
            throttle: Throttle::new(settings.min_interval),
            settings,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for MediaStackAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    async fn fetch(&self, query: &str, hours: u32) -> ProviderResult<Vec<Article>> {
        self.throttle.wait().await;

        let now = Utc::now();
        let since = window_start(now, hours);
        let date_range = format!("{},{}", since.format("%Y-%m-%d"), now.format("%Y-%m-%d"));
        let limit = self.settings.page_size.to_string();
        let mut params = vec![
            ("access_key", self.settings.api_key.as_str()),
            ("keywords", query),
            ("languages", self.settings.language.as_str()),
            ("limit", limit.as_str()),
            ("sort", "published_desc"),
            ("date", date_range.as_str()),
            ("countries", self.settings.country.as_deref().unwrap_or("us")),
        ];
        if let Some(category) = self.settings.category.as_deref() {
            params.push(("categories", category));
        }

        let request = self.client.get(&self.settings.base_url).query(&params);
        let body: MediaStackResponse = get_json(Self::NAME, self.settings.request_timeout, request).await?;
        if let Some(error) = body.error {
            return Err(in_band_error(error));
        }

        let total = body.data.len();
        let articles: Vec<Article> = body
            .data
            .into_iter()
            .filter_map(|a| a.into_raw().into_article(Self::NAME))
            .collect();
        info!("mediastack: {} records, {} usable for query {:?}", total, articles.len(), query);
        Ok(articles)
    }
}

fn in_band_error(error: MediaStackError) -> ProviderUnavailable {
    let code = error.code.unwrap_or_default();
    let reason = if code.contains("access_key") || code.contains("inactive_user") {
        UnavailableReason::Unauthorized(401)
    } else if code.contains("limit_reached") {
        UnavailableReason::RateLimited
    } else {
        UnavailableReason::Malformed(error.message.unwrap_or(code))
    };
    ProviderUnavailable::new(MediaStackAdapter::NAME, reason)
}

#[derive(Debug, Deserialize)]
struct MediaStackResponse {
    #[serde(default)]
    data: Vec<MediaStackArticle>,
    #[serde(default)]
    error: Option<MediaStackError>,
}

#[derive(Debug, Deserialize)]
struct MediaStackError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaStackArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<String>,
    published_at: Option<String>,
}

impl MediaStackArticle {
    fn into_raw(self) -> RawArticle {
        RawArticle {
            title: self.title,
            description: self.description,
            // no article body in MediaStack payloads
            content: None,
            source_name: self.source,
            url: self.url,
            published_at: self.published_at,
        }
    }
}
