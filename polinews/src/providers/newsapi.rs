use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{build_client, get_json, window_start, ProviderAdapter, ProviderSettings, Throttle};
use crate::article::{Article, RawArticle};
use crate::error::{ProviderResult, ProviderUnavailable, UnavailableReason};

/// NewsAPI.org `/v2/everything` search.
pub struct NewsApiAdapter {
    settings: ProviderSettings,
    client: Client,
    throttle: Throttle,
}

impl NewsApiAdapter {
    pub const NAME: &'static str = "newsapi";

    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(settings.request_timeout)?,
            throttle: Throttle::new(settings.min_interval),
            settings,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for NewsApiAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    async fn fetch(&self, query: &str, hours: u32) -> ProviderResult<Vec<Article>> {
        self.throttle.wait().await;

        let from = window_start(Utc::now(), hours).to_rfc3339_opts(SecondsFormat::Secs, true);
        let page_size = self.settings.page_size.to_string();
        let request = self
            .client
            .get(&self.settings.base_url)
            .header("X-Api-Key", &self.settings.api_key)
            .query(&[
                ("q", query),
                ("language", self.settings.language.as_str()),
                ("sortBy", "publishedAt"),
                ("from", from.as_str()),
                ("pageSize", page_size.as_str()),
            ]);

        let body: NewsApiResponse = get_json(Self::NAME, self.settings.request_timeout, request).await?;
        if body.status != "ok" {
            return Err(in_band_error(body.code.as_deref(), body.message.as_deref()));
        }

        let total = body.articles.len();
        let articles: Vec<Article> = body
            .articles
            .into_iter()
            // articles pulled by the publisher keep their slot with a placeholder title
            .filter(|a| a.title.as_deref() != Some("[Removed]"))
            .filter_map(|a| a.into_raw().into_article(Self::NAME))
            .collect();
        info!("newsapi: {} records, {} usable for query {:?}", total, articles.len(), query);
        Ok(articles)
    }
}

fn in_band_error(code: Option<&str>, message: Option<&str>) -> ProviderUnavailable {
    let reason = match code {
        Some("rateLimited") => UnavailableReason::RateLimited,
        Some(c) if c.starts_with("apiKey") => UnavailableReason::Unauthorized(401),
        _ => UnavailableReason::Malformed(message.unwrap_or("error status without message").to_string()),
    };
    ProviderUnavailable::new(NewsApiAdapter::NAME, reason)
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    #[serde(default)]
    source: Option<NewsApiSource>,
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl NewsApiArticle {
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
