//! Drives filter snapshots and page selections through the cache.
//!
//! Every request is tagged with a generation. Responses that arrive after a
//! newer request was issued still land in the cache, but are not shown.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::cache::{CatalogPage, PageFetcher, ResponseCache};
use crate::clicks::Selection;
use crate::error::CatalogError;
use crate::filters::{FilterCodec, Filters};
use crate::pagination::{PageButton, PaginationState};

/// What the presentation layer should show.
#[derive(Debug, Clone)]
pub struct SessionView {
    /// Request URL of the shown page.
    pub url: String,
    pub page: Arc<CatalogPage>,
    pub active_index: usize,
    pub buttons: Vec<PageButton<String>>,
}

#[derive(Debug)]
pub enum SessionEvent {
    View(SessionView),
    Error { url: String, error: CatalogError },
}

struct Fetched {
    generation: u64,
    url: String,
    result: Result<Arc<CatalogPage>, CatalogError>,
}

/// Known pages for the current filters, keyed by request URL.
type KnownPages = PaginationState<String, Option<Arc<CatalogPage>>>;

pub struct CatalogSession<F> {
    codec: FilterCodec,
    cache: Arc<ResponseCache<F>>,
    pages: KnownPages,
    generation: u64,
    in_flight: usize,
}

impl<F: PageFetcher + 'static> CatalogSession<F> {
    pub fn new(codec: FilterCodec, cache: Arc<ResponseCache<F>>) -> Self {
        Self {
            codec,
            cache,
            pages: KnownPages::new(),
            generation: 0,
            in_flight: 0,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache<F>> {
        &self.cache
    }

    /// Process input until both input streams close and every fetch has
    /// settled, or until `events` is dropped.
    pub async fn run(
        mut self,
        mut filters: UnboundedReceiver<Filters>,
        mut selections: UnboundedReceiver<Selection>,
        events: UnboundedSender<SessionEvent>,
    ) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Fetched>();
        let mut filters_open = true;
        let mut selections_open = true;

        loop {
            tokio::select! {
                next = filters.recv(), if filters_open => match next {
                    Some(filters) => self.apply_filters(&filters, &done_tx),
                    None => filters_open = false,
                },
                next = selections.recv(), if selections_open => match next {
                    Some(selection) => {
                        if let Some(view) = self.select(selection, &done_tx) {
                            if events.send(SessionEvent::View(view)).is_err() {
                                break;
                            }
                        }
                    }
                    None => selections_open = false,
                },
                Some(fetched) = done_rx.recv(), if self.in_flight > 0 => {
                    self.in_flight -= 1;
                    if let Some(event) = self.settle(fetched) {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                }
                else => break,
            }
        }
    }

    /// Start over with the first page for `filters`.
    fn apply_filters(&mut self, filters: &Filters, done: &UnboundedSender<Fetched>) {
        let url = self.codec.encode(filters).to_string();
        self.pages.clear();
        self.pages.insert(url.clone(), None);
        self.pages.set_active(0);
        self.request(url, done);
    }

    /// Switch to the selected page. Returns a view straight away when the
    /// page is already loaded and active.
    fn select(
        &mut self,
        selection: Selection,
        done: &UnboundedSender<Fetched>,
    ) -> Option<SessionView> {
        let Some(url) = self.pages.key_at(selection.index).cloned() else {
            debug!(
                "Ignoring selection of page {} ({} known)",
                selection.index,
                self.pages.len()
            );
            return None;
        };

        if selection.index == self.pages.active_index() {
            return match self.pages.get(selection.index) {
                Some(Some(page)) => Some(self.view(url, page.clone())),
                // Already on its way
                _ => None,
            };
        }

        self.pages.set_active(selection.index);
        self.request(url, done);
        None
    }

    fn request(&mut self, url: String, done: &UnboundedSender<Fetched>) {
        self.generation += 1;
        self.in_flight += 1;

        let generation = self.generation;
        let cache = self.cache.clone();
        let done = done.clone();
        tokio::spawn(async move {
            let result = cache.resolve(&url).await;
            let _ = done.send(Fetched {
                generation,
                url,
                result,
            });
        });
    }

    fn settle(&mut self, fetched: Fetched) -> Option<SessionEvent> {
        if fetched.generation != self.generation {
            debug!(
                "Discarding response for {} from superseded request {}",
                fetched.url, fetched.generation
            );
            return None;
        }

        let page = match fetched.result {
            Ok(page) => page,
            Err(error) => {
                warn!("Failed to load {}: {}", fetched.url, error);
                return Some(SessionEvent::Error {
                    url: fetched.url,
                    error,
                });
            }
        };

        self.pages.insert(fetched.url.clone(), Some(page.clone()));
        if let Some(next) = &page.next_url {
            if self.pages.index_of(next).is_none() {
                self.pages.insert(next.clone(), None);
            }
        }

        Some(SessionEvent::View(self.view(fetched.url, page)))
    }

    fn view(&self, url: String, page: Arc<CatalogPage>) -> SessionView {
        SessionView {
            url,
            page,
            active_index: self.pages.active_index(),
            buttons: self.pages.buttons(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Three linked pages; `gate` lets a test hold back one URL.
    #[derive(Default)]
    struct FakeCatalog {
        gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
        fail: Vec<String>,
    }

    #[async_trait]
    impl PageFetcher for FakeCatalog {
        async fn fetch(&self, url: &str) -> Result<CatalogPage, CatalogError> {
            let gate = self.gates.lock().unwrap().remove(url);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if self.fail.iter().any(|f| f == url) {
                return Err(CatalogError::Status {
                    url: url.to_string(),
                    status: 502,
                });
            }
            let page: u32 = url
                .rsplit_once("page=")
                .and_then(|(_, p)| p.parse().ok())
                .unwrap_or(1);
            let base = url.split("&page=").next().unwrap_or(url);
            Ok(CatalogPage {
                items: vec![json!({ "page": page, "url": url })],
                next_url: (page < 3).then(|| format!("{base}&page={}", page + 1)),
            })
        }
    }

    struct Harness {
        filters: UnboundedSender<Filters>,
        selections: UnboundedSender<Selection>,
        events: UnboundedReceiver<SessionEvent>,
        cache: Arc<ResponseCache<FakeCatalog>>,
    }

    fn start(catalog: FakeCatalog) -> Harness {
        let codec = FilterCodec::new("https://api.example/media").unwrap();
        let cache = Arc::new(ResponseCache::new(catalog));
        let session = CatalogSession::new(codec, cache.clone());

        let (filters_tx, filters_rx) = mpsc::unbounded_channel();
        let (selections_tx, selections_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        tokio::spawn(session.run(filters_rx, selections_rx, events_tx));

        Harness {
            filters: filters_tx,
            selections: selections_tx,
            events: events_rx,
            cache,
        }
    }

    fn search(term: &str) -> Filters {
        Filters {
            search: term.to_string(),
            limit: 20,
            ..Default::default()
        }
    }

    async fn next_view(events: &mut UnboundedReceiver<SessionEvent>) -> SessionView {
        match events.recv().await {
            Some(SessionEvent::View(view)) => view,
            other => panic!("expected a view, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_filters_load_first_page() {
        let mut h = start(FakeCatalog::default());
        h.filters.send(search("cat")).unwrap();

        let view = next_view(&mut h.events).await;
        assert_eq!(view.url, "https://api.example/media?search=cat&limit=20");
        assert_eq!(view.active_index, 0);
        // Page 1 plus the discovered next page
        let indices: Vec<usize> = view.buttons.iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![0, 0, 1, 1, 1]);
    }

    #[tokio::test]
    async fn test_selection_follows_next_pages() {
        let mut h = start(FakeCatalog::default());
        h.filters.send(search("cat")).unwrap();
        let first = next_view(&mut h.events).await;

        let next = first.buttons.iter().find(|b| b.index == 1).unwrap();
        h.selections
            .send(Selection {
                index: next.index,
                key: next.key.clone(),
            })
            .unwrap();

        let second = next_view(&mut h.events).await;
        assert_eq!(second.active_index, 1);
        assert_eq!(second.page.items[0]["page"], 2);
        assert_eq!(second.buttons.last().unwrap().index, 2);

        // Going back to page one is served from the cache
        h.selections
            .send(Selection {
                index: 0,
                key: String::new(),
            })
            .unwrap();
        let back = next_view(&mut h.events).await;
        assert_eq!(back.active_index, 0);
        assert_eq!(h.cache.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_selection_is_ignored() {
        let mut h = start(FakeCatalog::default());
        h.selections
            .send(Selection {
                index: 0,
                key: "https://site.example/".to_string(),
            })
            .unwrap();
        h.selections
            .send(Selection {
                index: 9,
                key: "nowhere".to_string(),
            })
            .unwrap();
        h.filters.send(search("cat")).unwrap();

        let view = next_view(&mut h.events).await;
        assert_eq!(view.active_index, 0);
        assert_eq!(h.cache.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_response_is_not_shown() {
        let (release, gate) = oneshot::channel();
        let catalog = FakeCatalog::default();
        catalog.gates.lock().unwrap().insert(
            "https://api.example/media?search=slow&limit=20".to_string(),
            gate,
        );
        let mut h = start(catalog);

        h.filters.send(search("slow")).unwrap();
        h.filters.send(search("fast")).unwrap();

        let view = next_view(&mut h.events).await;
        assert_eq!(view.url, "https://api.example/media?search=fast&limit=20");

        release.send(()).unwrap();
        drop(h.filters);
        drop(h.selections);

        // The slow page is cached but never shown
        assert!(h.events.recv().await.is_none());
        assert!(
            h.cache
                .contains("https://api.example/media?search=slow&limit=20")
                .await
        );
    }

    #[tokio::test]
    async fn test_fetch_error_is_reported() {
        let mut h = start(FakeCatalog {
            fail: vec!["https://api.example/media?search=broken&limit=20".to_string()],
            ..Default::default()
        });
        h.filters.send(search("broken")).unwrap();

        match h.events.recv().await {
            Some(SessionEvent::Error { url, error }) => {
                assert_eq!(url, "https://api.example/media?search=broken&limit=20");
                assert!(error.is_status());
            }
            other => panic!("expected an error, got {other:?}"),
        }

        // The session keeps going
        h.filters.send(search("cat")).unwrap();
        next_view(&mut h.events).await;
    }
}
