//! mediacat - browse a filterable, paginated media catalog.
//!
//! Filter selections are kept in sync with an address so results can be
//! bookmarked, fetched pages are cached for the session, and the pager
//! shows a bounded window of page links.

pub mod cache;
pub mod clicks;
pub mod composer;
pub mod config;
pub mod error;
pub mod filters;
pub mod navigation;
pub mod ndjson;
pub mod options;
pub mod pagination;
pub mod session;
pub mod stream;

pub use cache::{CatalogPage, HttpFetcher, PageFetcher, ResponseCache};
pub use clicks::{ClickEvent, ClickTarget, PaginationClicks, Selection};
pub use composer::{FilterComposer, FilterControl, FilterControls};
pub use config::{load_settings, Config, Settings};
pub use error::CatalogError;
pub use filters::{DecodedFilters, FilterCodec, Filters};
pub use navigation::{MemoryHistory, Navigator};
pub use ndjson::{NdjsonPages, DEFAULT_PAGE_SIZE};
pub use pagination::{compute_buttons, render_html, ButtonKind, PageButton, PaginationState};
pub use session::{CatalogSession, SessionEvent, SessionView};
