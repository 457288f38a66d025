use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{build_client, get_json, ProviderAdapter, ProviderSettings, Throttle};
use crate::article::{Article, RawArticle};
use crate::error::{ProviderResult, ProviderUnavailable, UnavailableReason};

/// NewsData.io `/api/1/news` (latest news).
///
/// The free tier has no time filter; `hours` is enforced by the aggregator.
pub struct NewsDataAdapter {
    settings: ProviderSettings,
    client: Client,
    throttle: Throttle,
}

impl NewsDataAdapter {
    pub const NAME: &'static str = "newsdata";

    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(settings.request_timeout)?,
            throttle: Throttle::new(settings.min_interval),
            settings,
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for NewsDataAdapter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        self.settings.priority
    }

    async fn fetch(&self, query: &str, _hours: u32) -> ProviderResult<Vec<Article>> {
        self.throttle.wait().await;

        let size = self.settings.page_size.to_string();
        let request = self
            .client
            .get(&self.settings.base_url)
            .header("X-ACCESS-KEY", &self.settings.api_key)
            .query(&[
                ("q", query),
                ("language", self.settings.language.as_str()),
                ("category", self.settings.category.as_deref().unwrap_or("politics")),
                ("size", size.as_str()),
            ]);

        let body: NewsDataResponse = get_json(Self::NAME, self.settings.request_timeout, request).await?;
        // on error `results` carries an object with code/message instead of a list
        if body.status != "success" {
            return Err(in_band_error(&body.results));
        }
        let records: Vec<NewsDataArticle> = serde_json::from_value(body.results).map_err(|e| {
            ProviderUnavailable::new(Self::NAME, UnavailableReason::Malformed(e.to_string()))
        })?;

        let total = records.len();
        let articles: Vec<Article> = records
            .into_iter()
            .filter_map(|a| a.into_raw().into_article(Self::NAME))
            .collect();
        info!("newsdata: {} records, {} usable for query {:?}", total, articles.len(), query);
        Ok(articles)
    }
}

fn in_band_error(results: &Value) -> ProviderUnavailable {
    let code = results.get("code").and_then(Value::as_str).unwrap_or_default();
    let message = results.get("message").and_then(Value::as_str).unwrap_or("error status without message");
    let reason = match code {
        "Unauthorized" | "ApiKeyInvalid" => UnavailableReason::Unauthorized(401),
        "RateLimitExceeded" | "TooManyRequests" => UnavailableReason::RateLimited,
        _ => UnavailableReason::Malformed(message.to_string()),
    };
    ProviderUnavailable::new(NewsDataAdapter::NAME, reason)
}

#[derive(Debug, Deserialize)]
struct NewsDataResponse {
    status: String,
    #[serde(default)]
    results: Value,
}

#[derive(Debug, Deserialize)]
struct NewsDataArticle {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    source_name: Option<String>,
    source_id: Option<String>,
}

impl NewsDataArticle {
    fn into_raw(self) -> RawArticle {
        // paid-only fields come back as a placeholder sentence on free plans
        let content = self.content.filter(|c| !c.starts_with("ONLY AVAILABLE IN"));
        RawArticle {
            title: self.title,
            description: self.description,
            content,
            source_name: self.source_name.or(self.source_id),
            url: self.link,
            published_at: self.pub_date,
        }
    }
}
