use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use common::{ProviderConfig, ProvidersConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::article::Article;
use crate::error::{ProviderResult, ProviderUnavailable, UnavailableReason};

pub mod gnews;
pub mod mediastack;
pub mod newsapi;
pub mod newsdata;

pub use gnews::GNewsAdapter;
pub use mediastack::MediaStackAdapter;
pub use newsapi::NewsApiAdapter;
pub use newsdata::NewsDataAdapter;

/// One external news API, normalized to [`Article`]s.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short stable name, recorded in `Article::provider`
    fn name(&self) -> &str;

    /// Dedup tie-break weight; higher wins
    fn priority(&self) -> i32 {
        0
    }

    /// Fetch articles matching `query` published in the last `hours` hours.
    ///
    /// Records missing a title or url are dropped here. Any failure of the
    /// provider itself is reported as [`ProviderUnavailable`].
    async fn fetch(&self, query: &str, hours: u32) -> ProviderResult<Vec<Article>>;
}

/// Providers known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    NewsApi,
    GNews,
    MediaStack,
    NewsData,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::NewsApi,
        ProviderKind::GNews,
        ProviderKind::NewsData,
        ProviderKind::MediaStack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::NewsApi => "newsapi",
            ProviderKind::GNews => "gnews",
            ProviderKind::MediaStack => "mediastack",
            ProviderKind::NewsData => "newsdata",
        }
    }

    fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::NewsApi => "https://newsapi.org/v2/everything",
            ProviderKind::GNews => "https://gnews.io/api/v4/search",
            ProviderKind::MediaStack => "http://api.mediastack.com/v1/news",
            ProviderKind::NewsData => "https://newsdata.io/api/1/news",
        }
    }

    fn default_key_env(self) -> &'static str {
        match self {
            ProviderKind::NewsApi => "NEWSAPI_KEY",
            ProviderKind::GNews => "GNEWS_API_KEY",
            ProviderKind::MediaStack => "MEDIASTACK_API_KEY",
            ProviderKind::NewsData => "NEWSDATA_API_KEY",
        }
    }

    fn default_priority(self) -> i32 {
        match self {
            ProviderKind::NewsApi => 40,
            ProviderKind::GNews => 30,
            ProviderKind::NewsData => 20,
            ProviderKind::MediaStack => 10,
        }
    }

    fn default_page_size(self) -> u32 {
        match self {
            // free NewsData plans cap page size at 10
            ProviderKind::NewsData => 10,
            _ => 20,
        }
    }

    fn section(self, config: &ProvidersConfig) -> Option<&ProviderConfig> {
        match self {
            ProviderKind::NewsApi => config.newsapi.as_ref(),
            ProviderKind::GNews => config.gnews.as_ref(),
            ProviderKind::MediaStack => config.mediastack.as_ref(),
            ProviderKind::NewsData => config.newsdata.as_ref(),
        }
    }
}

/// Resolved settings for one adapter.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: String,
    pub priority: i32,
    pub page_size: u32,
    pub min_interval: Duration,
    pub language: String,
    pub country: Option<String>,
    pub category: Option<String>,
    pub request_timeout: Duration,
}

impl ProviderSettings {
    /// Defaults for `kind`, overridden by the matching config section.
    pub fn resolve(kind: ProviderKind, section: Option<&ProviderConfig>, api_key: impl Into<String>) -> Self {
        let section = section.cloned().unwrap_or_default();
        Self {
            api_key: api_key.into(),
            base_url: section.base_url.unwrap_or_else(|| kind.default_base_url().to_string()),
            priority: section.priority.unwrap_or_else(|| kind.default_priority()),
            page_size: section.page_size.unwrap_or_else(|| kind.default_page_size()),
            min_interval: Duration::from_millis(section.min_interval_ms.unwrap_or(1000)),
            language: section.language.unwrap_or_else(|| "en".to_string()),
            country: section.country,
            category: section.category,
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Test/embedding helper: defaults pointing at an arbitrary endpoint.
    pub fn for_endpoint(kind: ProviderKind, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut settings = Self::resolve(kind, None, api_key);
        settings.base_url = base_url.into();
        settings.min_interval = Duration::ZERO;
        settings
    }
}

/// Production adapters, composed as a closed set.
pub enum NewsProvider {
    NewsApi(NewsApiAdapter),
    GNews(GNewsAdapter),
    MediaStack(MediaStackAdapter),
    NewsData(NewsDataAdapter),
}

impl NewsProvider {
    pub fn build(kind: ProviderKind, settings: ProviderSettings) -> Result<Self> {
        Ok(match kind {
            ProviderKind::NewsApi => NewsProvider::NewsApi(NewsApiAdapter::new(settings)?),
            ProviderKind::GNews => NewsProvider::GNews(GNewsAdapter::new(settings)?),
            ProviderKind::MediaStack => NewsProvider::MediaStack(MediaStackAdapter::new(settings)?),
            ProviderKind::NewsData => NewsProvider::NewsData(NewsDataAdapter::new(settings)?),
        })
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for NewsProvider {
    fn name(&self) -> &str {
        match self {
            NewsProvider::NewsApi(p) => p.name(),
            NewsProvider::GNews(p) => p.name(),
            NewsProvider::MediaStack(p) => p.name(),
            NewsProvider::NewsData(p) => p.name(),
        }
    }

    fn priority(&self) -> i32 {
        match self {
            NewsProvider::NewsApi(p) => p.priority(),
            NewsProvider::GNews(p) => p.priority(),
            NewsProvider::MediaStack(p) => p.priority(),
            NewsProvider::NewsData(p) => p.priority(),
        }
    }

    async fn fetch(&self, query: &str, hours: u32) -> ProviderResult<Vec<Article>> {
        match self {
            NewsProvider::NewsApi(p) => p.fetch(query, hours).await,
            NewsProvider::GNews(p) => p.fetch(query, hours).await,
            NewsProvider::MediaStack(p) => p.fetch(query, hours).await,
            NewsProvider::NewsData(p) => p.fetch(query, hours).await,
        }
    }
}

/// Build every enabled provider whose API key is present.
///
/// A missing key is not an error: the provider is left out of the active set
/// and the engine runs with partial coverage.
pub fn active_providers<F>(config: &ProvidersConfig, lookup_env: F) -> Result<Vec<NewsProvider>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut providers = Vec::new();
    for kind in ProviderKind::ALL {
        let section = kind.section(config);
        if section.and_then(|s| s.enabled) == Some(false) {
            info!(provider = kind.name(), "provider disabled in configuration");
            continue;
        }
        let key_env = section
            .and_then(|s| s.api_key_env.clone())
            .unwrap_or_else(|| kind.default_key_env().to_string());
        let Some(api_key) = lookup_env(&key_env).filter(|k| !k.trim().is_empty()) else {
            warn!(provider = kind.name(), env = %key_env, "API key not set, provider excluded");
            continue;
        };
        let settings = ProviderSettings::resolve(kind, section, api_key);
        let provider = NewsProvider::build(kind, settings)
            .with_context(|| format!("failed to initialize provider {}", kind.name()))?;
        providers.push(provider);
    }
    info!("{} news providers active", providers.len());
    Ok(providers)
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent("Polinews/0.1.0")
        .build()
        .context("failed to build reqwest client")
}

/// Enforces a minimum delay between consecutive requests of one adapter.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.min_interval;
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Send a request and decode a JSON body, mapping failures onto
/// [`UnavailableReason`].
pub(crate) async fn get_json<T: DeserializeOwned>(
    provider: &str,
    timeout: Duration,
    request: RequestBuilder,
) -> ProviderResult<T> {
    let unavailable = |reason| ProviderUnavailable::new(provider, reason);

    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            unavailable(UnavailableReason::TimedOut(timeout))
        } else {
            unavailable(UnavailableReason::Transport(e.to_string()))
        }
    })?;

    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(unavailable(UnavailableReason::Unauthorized(status.as_u16())));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(unavailable(UnavailableReason::RateLimited));
    }
    if !status.is_success() {
        return Err(unavailable(UnavailableReason::Status(status.as_u16())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| unavailable(UnavailableReason::Transport(e.to_string())))?;
    serde_json::from_slice(&bytes).map_err(|e| unavailable(UnavailableReason::Malformed(e.to_string())))
}

/// Start of a look-back window of `hours`, saturating at the earliest representable instant.
pub(crate) fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now.checked_sub_signed(ChronoDuration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

static TRUNCATION_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:…|\.\.\.)?\s*\[\+\d+ chars\]\s*$").expect("valid regex"));

/// Merge description and content into one plain-text snippet.
pub fn clean_snippet(description: &str, content: &str) -> String {
    let description = to_plain_text(description);
    let content = to_plain_text(content);
    let content = TRUNCATION_MARKER.replace(&content, "").to_string();

    let merged = if content.is_empty() {
        description
    } else if description.is_empty() || content.starts_with(&description) {
        content
    } else if description.contains(&content) {
        description
    } else {
        format!("{} {}", description, content)
    };
    collapse_whitespace(&merged)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_plain_text(raw: &str) -> String {
    if !raw.contains('<') {
        return collapse_whitespace(raw);
    }
    match html2text::from_read(raw.as_bytes(), 10_000) {
        Ok(text) => collapse_whitespace(&text),
        Err(e) => {
            warn!("failed to convert snippet HTML to text: {}", e);
            collapse_whitespace(raw)
        }
    }
}
