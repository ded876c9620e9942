//! Headline feed with embedding-ranked search.
//!
//! Headlines come from a public BBC feed grouped by category. A
//! snapshot is cached for 15 minutes with in-flight dedup so a burst of
//! invocations produces one upstream fetch. Search ranks the snapshot
//! against a query by cosine similarity of embeddings; item embeddings
//! are cached by link for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::error;

use super::{LlmClient, ServiceError, ServiceResult};

const NEWS_ENDPOINT: &str = "https://bbc-news-api.vercel.app/latest?lang=english";
const CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// One headline.
#[derive(Debug, Clone)]
pub struct NewsItem {
    pub title: String,
    pub summary: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub category: String,
}

/// A headline with its similarity score against a search query.
#[derive(Debug, Clone)]
pub struct ScoredNewsItem {
    pub item: NewsItem,
    pub score: f32,
}

#[derive(Debug)]
struct Snapshot {
    fetched_at: Instant,
    items: Vec<NewsItem>,
    categories: HashMap<String, Vec<NewsItem>>,
}

#[derive(Debug)]
pub struct NewsService {
    http_client: reqwest::Client,
    snapshot: Mutex<Option<Arc<Snapshot>>>,
    // Serializes upstream fetches; the snapshot mutex is never held
    // across an await.
    fetch_gate: tokio::sync::Mutex<()>,
    embedding_cache: Mutex<HashMap<String, Vec<f32>>>,
}

fn text_field(entry: &Value, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_feed(raw: &Value) -> (Vec<NewsItem>, HashMap<String, Vec<NewsItem>>) {
    let mut items = Vec::new();
    let mut categories: HashMap<String, Vec<NewsItem>> = HashMap::new();

    let Some(object) = raw.as_object() else {
        return (items, categories);
    };

    for (category, value) in object {
        let Some(entries) = value.as_array() else {
            continue;
        };
        let mut list = Vec::new();
        for entry in entries {
            let Some(title) = text_field(entry, "title") else {
                continue;
            };
            list.push(NewsItem {
                title,
                summary: text_field(entry, "summary"),
                image: text_field(entry, "image_link"),
                link: text_field(entry, "news_link"),
                category: category.clone(),
            });
        }
        if !list.is_empty() {
            items.extend(list.iter().cloned());
            categories.insert(category.clone(), list);
        }
    }

    (items, categories)
}

fn embedding_text(item: &NewsItem) -> String {
    match &item.summary {
        Some(summary) => format!("{}\n{}", item.title, summary),
        None => item.title.clone(),
    }
}

fn dedup_key(item: &NewsItem) -> String {
    match &item.link {
        Some(link) => link.clone(),
        None => format!(
            "{}:{}",
            item.title,
            item.summary.as_deref().unwrap_or_default()
        ),
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (av, bv) in a.iter().zip(b) {
        dot += av * bv;
        mag_a += av * av;
        mag_b += bv * bv;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

impl Default for NewsService {
    fn default() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            snapshot: Mutex::new(None),
            fetch_gate: tokio::sync::Mutex::new(()),
            embedding_cache: Mutex::new(HashMap::new()),
        }
    }
}

impl NewsService {
    pub fn new() -> Self {
        Self::default()
    }

    fn cached_snapshot(&self, max_age: Duration) -> Option<Arc<Snapshot>> {
        let snapshot = self.snapshot.lock().expect("news cache poisoned");
        snapshot
            .as_ref()
            .filter(|s| s.fetched_at.elapsed() < max_age)
            .cloned()
    }

    async fn latest(&self) -> ServiceResult<Arc<Snapshot>> {
        if let Some(snapshot) = self.cached_snapshot(CACHE_TTL) {
            return Ok(snapshot);
        }

        let _guard = self.fetch_gate.lock().await;
        // A concurrent caller may have refreshed while we waited.
        if let Some(snapshot) = self.cached_snapshot(CACHE_TTL) {
            return Ok(snapshot);
        }

        match self.fetch_latest().await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.snapshot.lock().expect("news cache poisoned") = Some(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(err) => {
                error!("Failed to fetch news: {}", err);
                // Serve a stale snapshot over nothing.
                if let Some(snapshot) = self.cached_snapshot(Duration::MAX) {
                    return Ok(snapshot);
                }
                Err(err)
            }
        }
    }

    async fn fetch_latest(&self) -> ServiceResult<Snapshot> {
        let response = self.http_client.get(NEWS_ENDPOINT).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let raw: Value = response.json().await?;
        let (items, categories) = parse_feed(&raw);
        Ok(Snapshot {
            fetched_at: Instant::now(),
            items,
            categories,
        })
    }

    /// Headlines for one category, empty when the category is unknown.
    pub async fn get_category(&self, category: &str) -> ServiceResult<Vec<NewsItem>> {
        let snapshot = self.latest().await?;
        Ok(snapshot.categories.get(category).cloned().unwrap_or_default())
    }

    /// Names of the currently known categories, sorted.
    pub async fn category_names(&self) -> ServiceResult<Vec<String>> {
        let snapshot = self.latest().await?;
        let mut names: Vec<String> = snapshot.categories.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Rank the current snapshot against a query, best match first.
    pub async fn search(&self, query: &str, llm: &LlmClient) -> ServiceResult<Vec<ScoredNewsItem>> {
        let snapshot = self.latest().await?;
        let items = unique_items(&snapshot.items);
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = llm.embed(query).await?;
        self.fill_embedding_cache(&items, llm).await?;

        let cache = self.embedding_cache.lock().expect("embedding cache poisoned");
        let mut scored: Vec<ScoredNewsItem> = items
            .into_iter()
            .filter_map(|item| {
                let link = item.link.as_deref()?;
                let embedding = cache.get(link)?;
                Some(ScoredNewsItem {
                    score: cosine_similarity(&query_embedding, embedding),
                    item,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scored)
    }

    async fn fill_embedding_cache(&self, items: &[NewsItem], llm: &LlmClient) -> ServiceResult<()> {
        let missing: Vec<(String, String)> = {
            let cache = self.embedding_cache.lock().expect("embedding cache poisoned");
            items
                .iter()
                .filter_map(|item| {
                    let link = item.link.clone()?;
                    if cache.contains_key(&link) {
                        return None;
                    }
                    Some((link, embedding_text(item)))
                })
                .collect()
        };

        if missing.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = missing.iter().map(|(_, text)| text.clone()).collect();
        let embeddings = llm.embed_many(&texts).await?;

        let mut cache = self.embedding_cache.lock().expect("embedding cache poisoned");
        for ((link, _), embedding) in missing.into_iter().zip(embeddings) {
            cache.insert(link, embedding);
        }

        Ok(())
    }
}

fn unique_items(items: &[NewsItem]) -> Vec<NewsItem> {
    let mut seen = HashMap::new();
    let mut unique = Vec::new();
    for item in items {
        let key = dedup_key(item);
        if seen.insert(key, ()).is_none() {
            unique.push(item.clone());
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_feed_groups_by_category() {
        let raw = json!({
            "World news": [
                { "title": "Alpha", "summary": "s1", "news_link": "https://x/1" },
                { "title": "  ", "summary": "skipped, blank title" },
                { "title": "Beta", "image_link": "https://img/2" }
            ],
            "Latest news": [],
            "status": "ok"
        });

        let (items, categories) = parse_feed(&raw);
        assert_eq!(items.len(), 2);
        assert_eq!(categories.len(), 1);
        let world = &categories["World news"];
        assert_eq!(world[0].title, "Alpha");
        assert_eq!(world[0].link.as_deref(), Some("https://x/1"));
        assert!(world[1].summary.is_none());
        assert_eq!(world[1].image.as_deref(), Some("https://img/2"));
    }

    #[test]
    fn test_cosine_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_unique_items_prefers_link_key() {
        let item = |title: &str, link: Option<&str>| NewsItem {
            title: title.to_string(),
            summary: None,
            image: None,
            link: link.map(String::from),
            category: "World news".to_string(),
        };

        let unique = unique_items(&[
            item("A", Some("https://x/1")),
            item("A duplicate", Some("https://x/1")),
            item("B", None),
            item("B", None),
        ]);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title, "A");
        assert_eq!(unique[1].title, "B");
    }
}
