use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{build_client, get_json, window_start, ProviderAdapter, ProviderSettings, Throttle};
use crate::article::{Article, RawArticle};
use crate::error::ProviderResult;

/// GNews `/api/v4/search`.
pub struct GNewsAdapter {
    settings: ProviderSettings,
    client: Client,
    throttle: Throttle,
}

impl GNewsAdapter {
    pub const NAME: &'static str = "gnews";

    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(settings.request_timeout)?,
            throttle: Throttle::new(settings.min_interval),
            settings,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GNewsAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    async fn fetch(&self, query: &str, hours: u32) -> ProviderResult<Vec<Article>> {
        self.throttle.wait().await;

        let from = window_start(Utc::now(), hours).to_rfc3339_opts(SecondsFormat::Secs, true);
        let max = self.settings.page_size.to_string();
        let params = [
            ("q", query),
            ("lang", self.settings.language.as_str()),
            ("country", self.settings.country.as_deref().unwrap_or("us")),
            ("max", max.as_str()),
            ("from", from.as_str()),
            ("sortby", "publishedAt"),
            ("apikey", self.settings.api_key.as_str()),
        ];

        let request = self.client.get(&self.settings.base_url).query(&params);
        let body: GNewsResponse = get_json(Self::NAME, self.settings.request_timeout, request).await?;

        let total = body.articles.len();
        let articles: Vec<Article> = body
            .articles
            .into_iter()
            .filter_map(|a| a.into_raw().into_article(Self::NAME))
            .collect();
        info!("gnews: {} records, {} usable for query {:?}", total, articles.len(), query);
        Ok(articles)
    }
}

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
}

#[derive(Debug, Deserialize)]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

impl GNewsArticle {
    fn into_raw(self) -> RawArticle {
        RawArticle {
            title: self.title,
            description: self.description,
            content: self.content,
            source_name: self.source.and_then(|s| s.name),
            url: self.url,
            published_at: self.published_at,
        }
    }
}
