//! Combines the filter controls into one canonical [`Filters`] stream.
//!
//! Every control publishes its current value; whenever any of them changes,
//! the composer emits a snapshot holding the latest value of all of them
//! and pushes the matching address onto the navigator's history.

use std::marker::PhantomData;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::filters::{FilterCodec, Filters};
use crate::navigation::Navigator;
use crate::stream::{MergedStream, SlotSender};

const SLOT_SEARCH: usize = 0;
const SLOT_TYPE: usize = 1;
const SLOT_CATEGORY: usize = 2;
const SLOT_SOURCE: usize = 3;
const SLOT_LIMIT: usize = 4;
const SLOT_LANG_CODE: usize = 5;

/// Value published by a filter control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    List(Vec<String>),
    Number(u32),
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(value: Vec<String>) -> Self {
        FilterValue::List(value)
    }
}

impl From<u32> for FilterValue {
    fn from(value: u32) -> Self {
        FilterValue::Number(value)
    }
}

/// Live value stream of a single filter control.
#[derive(Debug)]
pub struct FilterControl<T> {
    sender: SlotSender<FilterValue>,
    _value: PhantomData<fn(T)>,
}

impl<T: Into<FilterValue>> FilterControl<T> {
    fn new(sender: SlotSender<FilterValue>) -> Self {
        Self {
            sender,
            _value: PhantomData,
        }
    }

    /// Publish a new value. Returns false once the composer has stopped.
    pub fn set(&self, value: T) -> bool {
        self.sender.send(value.into())
    }
}

/// Handles for every filter control.
///
/// Dropping all of them ends the snapshot stream.
#[derive(Debug)]
pub struct FilterControls {
    pub search: FilterControl<String>,
    pub types: FilterControl<Vec<String>>,
    pub categories: FilterControl<Vec<String>>,
    pub sources: FilterControl<Vec<String>>,
    pub limit: FilterControl<u32>,
    pub lang_codes: FilterControl<Vec<String>>,
}

/// Builds the filter controls and the canonical snapshot stream.
#[derive(Debug, Clone)]
pub struct FilterComposer {
    default_limit: u32,
    limit_options: Vec<u32>,
}

impl FilterComposer {
    pub fn new(default_limit: u32, limit_options: Vec<u32>) -> Self {
        Self {
            default_limit,
            limit_options,
        }
    }

    /// Page sizes the limit control offers.
    pub fn limit_options(&self) -> &[u32] {
        &self.limit_options
    }

    /// Filters encoded in the navigator's current address.
    pub fn initial_filters<N: Navigator + ?Sized>(&self, navigator: &N) -> Filters {
        FilterCodec::decode(&navigator.current_url(), self.default_limit)
            .into_filters(self.default_limit)
    }

    /// Seed every control from the current address and start composing.
    ///
    /// Each snapshot is pushed onto `navigator` as a new history entry before
    /// it is delivered. Must be called from within a tokio runtime.
    pub fn spawn<N: Navigator + ?Sized + 'static>(
        &self,
        navigator: Arc<N>,
    ) -> (FilterControls, UnboundedReceiver<Filters>) {
        let initial = self.initial_filters(navigator.as_ref());
        if !self.limit_options.contains(&initial.limit) {
            debug!(
                "Limit {} is not one of the offered options {:?}",
                initial.limit, self.limit_options
            );
        }

        let mut merged = MergedStream::new();
        let search = merged.source(initial.search.into());
        let types = merged.source(initial.types.into());
        let categories = merged.source(initial.categories.into());
        let sources = merged.source(initial.sources.into());
        let limit = merged.source(initial.limit.into());
        let lang_codes = merged.source(initial.lang_codes.into());

        let controls = FilterControls {
            search: FilterControl::new(search),
            types: FilterControl::new(types),
            categories: FilterControl::new(categories),
            sources: FilterControl::new(sources),
            limit: FilterControl::new(limit),
            lang_codes: FilterControl::new(lang_codes),
        };

        let mut combined = merged.combine_latest();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(values) = combined.recv().await {
                let filters = snapshot(values);
                let address = FilterCodec::address_for(&navigator.current_url(), &filters);
                navigator.push_state(address);
                if tx.send(filters).is_err() {
                    break;
                }
            }
        });

        (controls, rx)
    }
}

fn snapshot(values: Vec<FilterValue>) -> Filters {
    let mut filters = Filters::default();
    for (slot, value) in values.into_iter().enumerate() {
        match (slot, value) {
            (SLOT_SEARCH, FilterValue::Text(search)) => filters.search = search,
            (SLOT_TYPE, FilterValue::List(types)) => filters.types = types,
            (SLOT_CATEGORY, FilterValue::List(categories)) => filters.categories = categories,
            (SLOT_SOURCE, FilterValue::List(sources)) => filters.sources = sources,
            (SLOT_LIMIT, FilterValue::Number(limit)) => filters.limit = limit,
            (SLOT_LANG_CODE, FilterValue::List(lang_codes)) => filters.lang_codes = lang_codes,
            (slot, value) => debug!("Unexpected value {:?} in slot {}", value, slot),
        }
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::MemoryHistory;
    use url::Url;

    fn history(address: &str) -> Arc<MemoryHistory> {
        Arc::new(MemoryHistory::new(Url::parse(address).unwrap()))
    }

    fn composer() -> FilterComposer {
        FilterComposer::new(20, vec![20, 40])
    }

    #[tokio::test]
    async fn test_seeds_from_current_address() {
        let nav = history("https://site.example/browse?search=cat&type=video,audio&limit=40");
        let (_controls, mut snapshots) = composer().spawn(nav.clone());

        let first = snapshots.recv().await.unwrap();
        assert_eq!(first.search, "cat");
        assert_eq!(first.types, vec!["video", "audio"]);
        assert!(first.categories.is_empty());
        assert_eq!(first.limit, 40);
    }

    #[tokio::test]
    async fn test_search_change_keeps_other_values() {
        let nav = history("https://site.example/?category=nature&langCode=en&limit=40");
        let (controls, mut snapshots) = composer().spawn(nav.clone());
        let first = snapshots.recv().await.unwrap();

        assert!(controls.search.set("owl".to_string()));
        let second = snapshots.recv().await.unwrap();

        assert_eq!(second.search, "owl");
        assert_eq!(second.categories, first.categories);
        assert_eq!(second.lang_codes, first.lang_codes);
        assert_eq!(second.types, first.types);
        assert_eq!(second.sources, first.sources);
        assert_eq!(second.limit, first.limit);
    }

    #[tokio::test]
    async fn test_every_snapshot_pushes_history() {
        let nav = history("https://site.example/browse");
        let (controls, mut snapshots) = composer().spawn(nav.clone());
        snapshots.recv().await.unwrap();

        controls.types.set(vec!["image".to_string()]);
        snapshots.recv().await.unwrap();
        controls.limit.set(40);
        snapshots.recv().await.unwrap();

        let entries: Vec<String> = nav.entries().iter().map(|u| u.to_string()).collect();
        assert_eq!(
            entries,
            vec![
                "https://site.example/browse",
                "https://site.example/browse?limit=20",
                "https://site.example/browse?type=image&limit=20",
                "https://site.example/browse?type=image&limit=40",
            ]
        );
        assert_eq!(
            nav.back().unwrap().as_str(),
            "https://site.example/browse?type=image&limit=20"
        );
    }

    #[tokio::test]
    async fn test_cleared_field_leaves_address() {
        let nav = history("https://site.example/?search=cat&limit=20");
        let (controls, mut snapshots) = composer().spawn(nav.clone());
        snapshots.recv().await.unwrap();

        controls.search.set(String::new());
        let filters = snapshots.recv().await.unwrap();

        assert_eq!(filters.search, "");
        assert_eq!(
            nav.current_url().as_str(),
            "https://site.example/?limit=20"
        );
    }

    #[tokio::test]
    async fn test_non_numeric_limit_uses_default() {
        let nav = history("https://site.example/?limit=many");
        let filters = composer().initial_filters(nav.as_ref());
        assert_eq!(filters.limit, 20);
    }

    #[tokio::test]
    async fn test_dropping_controls_ends_stream() {
        let nav = history("https://site.example/");
        let (controls, mut snapshots) = composer().spawn(nav);
        snapshots.recv().await.unwrap();

        drop(controls);
        assert!(snapshots.recv().await.is_none());
    }
}
