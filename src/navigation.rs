//! Address bar and history context.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use url::Url;

/// The address bar and its history.
pub trait Navigator: Send + Sync {
    /// Address currently shown.
    fn current_url(&self) -> Url;

    /// Push `url` as a new history entry and make it current.
    fn push_state(&self, url: Url);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn current_url(&self) -> Url {
        (**self).current_url()
    }

    fn push_state(&self, url: Url) {
        (**self).push_state(url)
    }
}

#[derive(Debug)]
struct HistoryInner {
    entries: Vec<Url>,
    index: usize,
}

/// In-memory history with browser-style back/forward.
#[derive(Debug)]
pub struct MemoryHistory {
    inner: Mutex<HistoryInner>,
}

impl MemoryHistory {
    pub fn new(initial: Url) -> Self {
        Self {
            inner: Mutex::new(HistoryInner {
                entries: vec![initial],
                index: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Step back one entry, returning the new current address.
    pub fn back(&self) -> Option<Url> {
        let mut inner = self.lock();
        if inner.index == 0 {
            return None;
        }
        inner.index -= 1;
        Some(inner.entries[inner.index].clone())
    }

    /// Step forward one entry, returning the new current address.
    pub fn forward(&self) -> Option<Url> {
        let mut inner = self.lock();
        if inner.index + 1 >= inner.entries.len() {
            return None;
        }
        inner.index += 1;
        Some(inner.entries[inner.index].clone())
    }

    pub fn entries(&self) -> Vec<Url> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

impl Navigator for MemoryHistory {
    fn current_url(&self) -> Url {
        let inner = self.lock();
        inner.entries[inner.index].clone()
    }

    fn push_state(&self, url: Url) {
        let mut inner = self.lock();
        // Pushing discards anything ahead of the current entry
        let keep = inner.index + 1;
        inner.entries.truncate(keep);
        debug!("History push {}", url);
        inner.entries.push(url);
        inner.index = inner.entries.len() - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_push_creates_entries() {
        let history = MemoryHistory::new(url("https://site.example/"));
        history.push_state(url("https://site.example/?search=a"));
        history.push_state(url("https://site.example/?search=ab"));

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.current_url().as_str(),
            "https://site.example/?search=ab"
        );
    }

    #[test]
    fn test_back_and_forward() {
        let history = MemoryHistory::new(url("https://site.example/"));
        history.push_state(url("https://site.example/?search=a"));

        assert_eq!(history.back().unwrap().as_str(), "https://site.example/");
        assert!(history.back().is_none());
        assert_eq!(
            history.forward().unwrap().as_str(),
            "https://site.example/?search=a"
        );
        assert!(history.forward().is_none());
    }

    #[test]
    fn test_push_after_back_drops_forward_entries() {
        let history = MemoryHistory::new(url("https://site.example/"));
        history.push_state(url("https://site.example/?search=a"));
        history.back();
        history.push_state(url("https://site.example/?search=b"));

        assert_eq!(history.len(), 2);
        assert!(history.forward().is_none());
        assert!(!history.is_empty());
    }
}
