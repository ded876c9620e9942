//! Encyclopedia lookup via the MediaWiki search and REST summary APIs.

use serde::Deserialize;

use super::{ServiceError, ServiceResult};

const SEARCH_URL: &str = "https://en.wikipedia.org/w/api.php";
const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

/// Top search result with optional summary detail.
#[derive(Debug, Clone)]
pub struct WikiResult {
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    title: Option<String>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<DesktopUrls>,
}

#[derive(Debug, Deserialize)]
struct DesktopUrls {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WikipediaService {
    http_client: reqwest::Client,
}

impl WikipediaService {
    pub fn new() -> Self {
        Self::default()
    }

    fn article_url(title: &str) -> String {
        let encoded: String = title
            .chars()
            .map(|c| if c == ' ' { '_' } else { c })
            .collect();
        format!("https://en.wikipedia.org/wiki/{encoded}")
    }

    /// Search and return the top result, enriched with the page summary
    /// when available. The summary fetch is best-effort: a failure there
    /// still yields a result with title and url.
    pub async fn search_top_result(&self, query: &str) -> ServiceResult<Option<WikiResult>> {
        let response = self
            .http_client
            .get(SEARCH_URL)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("srlimit", "1"),
                ("srsearch", query),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let search: SearchResponse = response.json().await?;
        let Some(hit) = search.query.and_then(|q| q.search.into_iter().next()) else {
            return Ok(None);
        };
        let title = hit.title;

        let summary_response = self
            .http_client
            .get(format!("{SUMMARY_URL}/{title}"))
            .send()
            .await;

        let summary: Option<SummaryResponse> = match summary_response {
            Ok(response) if response.status().is_success() => response.json().await.ok(),
            _ => None,
        };

        let Some(summary) = summary else {
            return Ok(Some(WikiResult {
                url: Self::article_url(&title),
                title,
                summary: None,
                thumbnail_url: None,
            }));
        };

        Ok(Some(WikiResult {
            url: summary
                .content_urls
                .and_then(|urls| urls.desktop)
                .and_then(|desktop| desktop.page)
                .unwrap_or_else(|| Self::article_url(&title)),
            title: summary.title.unwrap_or(title),
            summary: summary.extract,
            thumbnail_url: summary.thumbnail.and_then(|t| t.source),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_url_replaces_spaces() {
        assert_eq!(
            WikipediaService::article_url("Rust (programming language)"),
            "https://en.wikipedia.org/wiki/Rust_(programming_language)"
        );
    }
}
