use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dedup;

/// Canonical article record shared by every provider.
///
/// Created once by a provider adapter and never mutated afterwards; the
/// aggregator only ever drops whole records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Hash of the dedup key (normalized title prefix + normalized source)
    pub id: String,
    pub title: String,
    pub body_snippet: String,
    pub source_name: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    /// Adapter that produced the record. Traceability only, never scored.
    pub provider: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        body_snippet: impl Into<String>,
        source_name: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
        provider: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let source_name = source_name.into();
        let id = dedup::article_id(&title, &source_name);
        Self {
            id,
            title,
            body_snippet: body_snippet.into(),
            source_name,
            url: url.into(),
            published_at,
            provider: provider.into(),
        }
    }
}

/// Best-effort field mapping of one provider record, before validation.
#[derive(Debug, Clone, Default)]
pub struct RawArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub source_name: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<String>,
}

impl RawArticle {
    /// Validate and convert into an [`Article`].
    ///
    /// Returns `None` for records missing a title or URL, with a URL that is
    /// not absolute http(s), or whose timestamp cannot be parsed.
    pub fn into_article(self, provider: &str) -> Option<Article> {
        let title = non_blank(self.title)?;
        let Some(url) = non_blank(self.url).filter(|u| is_http_url(u)) else {
            debug!(provider, title = %title, "dropping record without usable url");
            return None;
        };
        let Some(published_at) = self.published_at.as_deref().and_then(parse_timestamp) else {
            debug!(provider, url = %url, raw = ?self.published_at, "dropping record with unparsable timestamp");
            return None;
        };

        let body = crate::providers::clean_snippet(
            self.description.as_deref().unwrap_or_default(),
            self.content.as_deref().unwrap_or_default(),
        );
        let source_name = non_blank(self.source_name).unwrap_or_else(|| host_of(&url));

        Some(Article::new(
            crate::providers::collapse_whitespace(&title),
            body,
            source_name,
            url,
            published_at,
            provider,
        ))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_http_url(raw: &str) -> bool {
    url::Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

fn host_of(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_default()
}

/// Parse the timestamp formats seen across providers.
///
/// Accepts RFC 3339, RFC 2822 and `YYYY-MM-DD HH:MM:SS` (taken as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw(title: Option<&str>, url: Option<&str>, published: Option<&str>) -> RawArticle {
        RawArticle {
            title: title.map(String::from),
            description: Some("Lawmakers met on Tuesday.".to_string()),
            content: None,
            source_name: Some("Reuters".to_string()),
            url: url.map(String::from),
            published_at: published.map(String::from),
        }
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 4, 12, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-04T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("Tue, 04 Mar 2025 12:30:00 +0000"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-04 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("  "), None);
    }

    #[test]
    fn drops_records_missing_required_fields() {
        let ts = Some("2025-03-04T12:30:00Z");
        assert!(raw(None, Some("https://example.com/a"), ts).into_article("test").is_none());
        assert!(raw(Some("  "), Some("https://example.com/a"), ts).into_article("test").is_none());
        assert!(raw(Some("Title"), None, ts).into_article("test").is_none());
        assert!(raw(Some("Title"), Some("not a url"), ts).into_article("test").is_none());
        assert!(raw(Some("Title"), Some("ftp://example.com/a"), ts).into_article("test").is_none());
        assert!(raw(Some("Title"), Some("https://example.com/a"), Some("soon")).into_article("test").is_none());
    }

    #[test]
    fn maps_valid_record() {
        let article = raw(Some(" Senate  passes bill "), Some("https://example.com/a"), Some("2025-03-04T12:30:00Z"))
            .into_article("newsapi")
            .expect("valid record");
        assert_eq!(article.title, "Senate passes bill");
        assert_eq!(article.source_name, "Reuters");
        assert_eq!(article.provider, "newsapi");
        assert_eq!(article.body_snippet, "Lawmakers met on Tuesday.");
        assert_eq!(article.id.len(), 32);
    }

    #[test]
    fn falls_back_to_url_host_for_source() {
        let mut record = raw(Some("Title"), Some("https://www.apnews.com/article/x"), Some("2025-03-04T12:30:00Z"));
        record.source_name = None;
        let article = record.into_article("gnews").expect("valid record");
        assert_eq!(article.source_name, "apnews.com");
    }
}
