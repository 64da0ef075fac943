//! Windowed pagination controls.
//!
//! The pager always shows the first and last three pages plus three pages
//! either side of the active one, so the number of controls stays bounded
//! no matter how many pages are known.

use std::fmt::Write as _;

/// Role of a pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonKind {
    First,
    Previous,
    Page,
    Next,
    Last,
}

impl ButtonKind {
    fn label(self, index: usize) -> String {
        match self {
            ButtonKind::First => "«".to_string(),
            ButtonKind::Previous => "‹".to_string(),
            ButtonKind::Page => (index + 1).to_string(),
            ButtonKind::Next => "›".to_string(),
            ButtonKind::Last => "»".to_string(),
        }
    }
}

/// A single rendered pagination control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageButton<K> {
    pub kind: ButtonKind,
    pub index: usize,
    /// Key of the page this control navigates to.
    pub key: K,
    pub label: String,
    pub active: bool,
}

/// Compute the pagination controls for `keys` with `active_index` selected.
///
/// Out-of-range indices are dropped, never clamped.
pub fn compute_buttons<K: Clone>(keys: &[K], active_index: usize) -> Vec<PageButton<K>> {
    let max = keys.len() as i64 - 1;
    let active = i64::try_from(active_index).unwrap_or(i64::MAX);
    let is_valid = |i: i64| i > -1 && i <= max;

    let button = |kind: ButtonKind, i: i64| -> Option<PageButton<K>> {
        if !is_valid(i) {
            return None;
        }
        let index = i as usize;
        Some(PageButton {
            kind,
            index,
            key: keys[index].clone(),
            label: kind.label(index),
            active: index == active_index,
        })
    };

    let candidates = [0, 1, 2]
        .into_iter()
        .chain(active.saturating_sub(3)..=active.saturating_add(3))
        .chain([max - 2, max - 1, max]);

    // Set semantics, first occurrence wins.
    let mut numbered: Vec<i64> = Vec::with_capacity(13);
    for i in candidates.filter(|i| is_valid(*i)) {
        if !numbered.contains(&i) {
            numbered.push(i);
        }
    }

    let mut buttons = Vec::with_capacity(numbered.len() + 4);
    buttons.extend(button(ButtonKind::First, 0));
    buttons.extend(button(ButtonKind::Previous, active.saturating_sub(1)));
    buttons.extend(numbered.into_iter().filter_map(|i| button(ButtonKind::Page, i)));
    buttons.extend(button(ButtonKind::Next, active.saturating_add(1)));
    buttons.extend(button(ButtonKind::Last, max));
    buttons
}

/// Render the pagination region.
///
/// Each link carries its `(index, key)` pair as `data-index` / `data-key`.
pub fn render_html<K: AsRef<str>>(buttons: &[PageButton<K>]) -> String {
    let mut html = String::from(r#"<ul class="d-flex pagination justify-content-center">"#);
    for button in buttons {
        let class = if button.active {
            "page-link active"
        } else {
            "page-link"
        };
        let _ = write!(
            html,
            r##"<li class="page-item"><a class="{}" data-index="{}" data-key="{}" href="#">{}</a></li>"##,
            class,
            button.index,
            html_escape(button.key.as_ref()),
            html_escape(&button.label),
        );
    }
    html.push_str("</ul>");
    html
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Ordered set of known pages plus the active one.
#[derive(Debug, Clone)]
pub struct PaginationState<K, V> {
    pages: Vec<(K, V)>,
    active_index: usize,
}

impl<K, V> Default for PaginationState<K, V> {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            active_index: 0,
        }
    }
}

impl<K: Clone + PartialEq, V> PaginationState<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the page under `key`, keeping its original position.
    /// Returns the page's index.
    pub fn insert(&mut self, key: K, value: V) -> usize {
        match self.index_of(&key) {
            Some(index) => {
                self.pages[index].1 = value;
                index
            }
            None => {
                self.pages.push((key, value));
                self.pages.len() - 1
            }
        }
    }

    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.pages.iter().position(|(k, _)| k == key)
    }

    pub fn key_at(&self, index: usize) -> Option<&K> {
        self.pages.get(index).map(|(k, _)| k)
    }

    pub fn get(&self, index: usize) -> Option<&V> {
        self.pages.get(index).map(|(_, v)| v)
    }

    pub fn is_valid(&self, index: usize) -> bool {
        index < self.pages.len()
    }

    /// Make `index` the active page. Returns false, leaving the state
    /// untouched, when the index is out of range.
    pub fn set_active(&mut self, index: usize) -> bool {
        if !self.is_valid(index) {
            return false;
        }
        self.active_index = index;
        true
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_key(&self) -> Option<&K> {
        self.key_at(self.active_index)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Drop every page and reset the active index.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.active_index = 0;
    }

    pub fn keys(&self) -> Vec<K> {
        self.pages.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn buttons(&self) -> Vec<PageButton<K>> {
        compute_buttons(&self.keys(), self.active_index)
    }
}
