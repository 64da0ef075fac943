//! Turns clicks on pagination controls into page selections.

use scraper::{ElementRef, Html, Selector};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use crate::navigation::Navigator;
use crate::pagination::PageButton;

/// Class carried by every pagination link.
pub const PAGE_LINK_CLASS: &str = "page-link";
/// Class marking the pagination region.
pub const PAGINATION_CLASS: &str = "pagination";

/// A page chosen by the user: its index and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub key: String,
}

/// The element a click landed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickTarget {
    pub classes: Vec<String>,
    /// Whether the element or one of its ancestors is the pagination region.
    pub in_pagination: bool,
    /// `(index, key)` payload embedded in the element.
    pub value: Option<(usize, String)>,
}

impl ClickTarget {
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Target for the link that renders `button`.
    pub fn from_button(button: &PageButton<String>) -> Self {
        Self {
            classes: vec![PAGE_LINK_CLASS.to_string()],
            in_pagination: true,
            value: Some((button.index, button.key.clone())),
        }
    }

    /// Target for the `nth` link in rendered markup.
    pub fn from_markup(html: &str, nth: usize) -> Option<Self> {
        let fragment = Html::parse_fragment(html);
        let links = Selector::parse("a").ok()?;
        let link = fragment.select(&links).nth(nth)?;
        Some(Self::from_element(link))
    }

    fn from_element(element: ElementRef<'_>) -> Self {
        let classes = element.value().classes().map(str::to_string).collect();

        let in_pagination = std::iter::once(*element)
            .chain(element.ancestors())
            .filter_map(|node| node.value().as_element())
            .any(|e| e.classes().any(|c| c == PAGINATION_CLASS));

        let index = element
            .value()
            .attr("data-index")
            .and_then(|i| i.parse::<usize>().ok());
        let key = element.value().attr("data-key").map(str::to_string);

        Self {
            classes,
            in_pagination,
            value: index.zip(key),
        }
    }
}

/// A click event whose default action can be suppressed.
#[derive(Debug, Clone)]
pub struct ClickEvent {
    pub target: ClickTarget,
    default_prevented: bool,
}

impl ClickEvent {
    pub fn new(target: ClickTarget) -> Self {
        Self {
            target,
            default_prevented: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Listens for clicks and emits the selected page.
#[derive(Debug, Clone)]
pub struct PaginationClicks {
    tx: UnboundedSender<Selection>,
}

impl PaginationClicks {
    /// Create the stream. The first selection is `(0, current address)`.
    pub fn new<N: Navigator + ?Sized>(navigator: &N) -> (Self, UnboundedReceiver<Selection>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Selection {
            index: 0,
            key: navigator.current_url().to_string(),
        });
        (Self { tx }, rx)
    }

    /// Handle a click. Returns true if it was a pagination control.
    pub fn dispatch(&self, event: &mut ClickEvent) -> bool {
        let target = &event.target;
        if !target.in_pagination || !target.has_class(PAGE_LINK_CLASS) {
            return false;
        }

        let value = target.value.clone();
        event.prevent_default();

        match value {
            Some((index, key)) => {
                let _ = self.tx.send(Selection { index, key });
            }
            None => debug!("Pagination link without an index/key payload"),
        }
        true
    }
}
