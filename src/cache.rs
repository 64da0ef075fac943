//! Catalog page fetching and the per-session response cache.
//!
//! Pages are keyed by their exact request URL. A URL that has been fetched
//! once is trusted for the rest of the session and never refetched.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::CatalogError;

/// One page of catalog results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(rename = "nextUrl", default)]
    pub next_url: Option<String>,
}

impl CatalogPage {
    /// Pull `items` and `nextUrl` out of a response body.
    ///
    /// Missing or mistyped fields become empty rather than failing.
    pub fn from_json(body: &Value) -> Self {
        let items = match body.get("items").and_then(Value::as_array) {
            Some(items) => items.clone(),
            None => {
                debug!("Response has no items array, treating as empty");
                Vec::new()
            }
        };
        let next_url = body
            .get("nextUrl")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self { items, next_url }
    }
}

/// Source of catalog pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<CatalogPage, CatalogError>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch(&self, url: &str) -> Result<CatalogPage, CatalogError> {
        (**self).fetch(url).await
    }
}

/// Fetches catalog pages over HTTP.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(CatalogError::Client)?;

        Ok(Self { client })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, CatalogError> {
        Self::new(
            &settings.user_agent,
            Duration::from_secs(settings.request_timeout),
        )
    }

    /// GET `url`, failing on a non-success status.
    pub(crate) async fn send(&self, url: &str) -> Result<Response, CatalogError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| CatalogError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// GET `url` and parse the body as JSON.
    pub async fn get_json(&self, url: &str) -> Result<Value, CatalogError> {
        let response = self.send(url).await?;
        let body = response
            .text()
            .await
            .map_err(|source| CatalogError::Http {
                url: url.to_string(),
                source,
            })?;
        serde_json::from_str(&body).map_err(|source| CatalogError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<CatalogPage, CatalogError> {
        let body = self.get_json(url).await?;
        Ok(CatalogPage::from_json(&body))
    }
}

#[derive(Default)]
struct Entries {
    pages: HashMap<String, Arc<CatalogPage>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

/// Memoizes catalog pages by request URL.
///
/// Concurrent resolves of the same uncached URL are not coalesced; each
/// fetches and the last write wins.
pub struct ResponseCache<F> {
    fetcher: F,
    entries: RwLock<Entries>,
    capacity: Option<usize>,
    fetches: AtomicU64,
}

impl<F: PageFetcher> ResponseCache<F> {
    /// Create an unbounded cache.
    pub fn new(fetcher: F) -> Self {
        Self::with_capacity(fetcher, None)
    }

    /// Create a cache that evicts its oldest entry once `capacity` pages are
    /// stored. `None` or `Some(0)` means unbounded.
    pub fn with_capacity(fetcher: F, capacity: Option<usize>) -> Self {
        Self {
            fetcher,
            entries: RwLock::new(Entries::default()),
            capacity: capacity.filter(|c| *c > 0),
            fetches: AtomicU64::new(0),
        }
    }

    /// Return the cached page for `url`, fetching it on first use.
    pub async fn resolve(&self, url: &str) -> Result<Arc<CatalogPage>, CatalogError> {
        if let Some(page) = self.get(url).await {
            debug!("Cache hit for {}", url);
            return Ok(page);
        }

        info!("Fetching {}", url);
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let page = self.fetcher.fetch(url).await?;
        Ok(self.set(url, page).await)
    }

    pub async fn get(&self, url: &str) -> Option<Arc<CatalogPage>> {
        self.entries.read().await.pages.get(url).cloned()
    }

    /// Store `page` under `url`, replacing any existing entry whole.
    pub async fn set(&self, url: &str, page: CatalogPage) -> Arc<CatalogPage> {
        let page = Arc::new(page);
        let mut entries = self.entries.write().await;

        if entries
            .pages
            .insert(url.to_string(), page.clone())
            .is_none()
        {
            entries.order.push_back(url.to_string());
        }

        if let Some(capacity) = self.capacity {
            while entries.pages.len() > capacity {
                let Some(oldest) = entries.order.pop_front() else {
                    break;
                };
                entries.pages.remove(&oldest);
                debug!("Evicted {} from response cache", oldest);
            }
        }

        page
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.entries.read().await.pages.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.pages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of network fetches issued by [`resolve`](Self::resolve).
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }
}
