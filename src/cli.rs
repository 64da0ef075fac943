//! Command-line interface.

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::info;
use url::Url;

use mediacat::options::{OptionKind, OptionsClient};
use mediacat::{
    render_html, ButtonKind, CatalogSession, ClickEvent, ClickTarget, FilterCodec,
    FilterComposer, Filters, HttpFetcher, MemoryHistory, Navigator, PageButton,
    PaginationClicks, ResponseCache, SessionEvent, SessionView, Settings, DEFAULT_PAGE_SIZE,
};

#[derive(Parser, Debug)]
#[command(name = "mediacat", version, about = "Browse a filterable media catalog")]
pub struct Cli {
    /// Catalog endpoint (overrides the config file)
    #[arg(long, global = true, env = "MEDIACAT_HOST")]
    pub host: Option<String>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the catalog request URL for a set of filters
    Url {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Fetch catalog pages, following next links
    Fetch {
        #[command(flatten)]
        filters: FilterArgs,
        /// Number of pages to fetch
        #[arg(long)]
        pages: Option<usize>,
        /// Also print the pagination markup
        #[arg(long)]
        html: bool,
    },
    /// List the values offered for a filter
    Options {
        #[arg(value_enum)]
        kind: OptionKind,
    },
    /// Stream an NDJSON catalog page by page
    Stream {
        /// NDJSON source (defaults to the host)
        url: Option<String>,
        /// Records per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: usize,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Address whose query seeds the filters (e.g. a bookmarked page)
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub search: Option<String>,
    /// Media types, comma separated
    #[arg(long = "type", value_delimiter = ',')]
    pub types: Vec<String>,
    #[arg(long = "category", value_delimiter = ',')]
    pub categories: Vec<String>,
    #[arg(long = "source", value_delimiter = ',')]
    pub sources: Vec<String>,
    #[arg(long = "lang-code", value_delimiter = ',')]
    pub lang_codes: Vec<String>,
    #[arg(long)]
    pub limit: Option<u32>,
}

impl FilterArgs {
    /// Overlay the flags that were given onto `filters`.
    pub fn apply(&self, filters: &mut Filters) {
        if let Some(ref search) = self.search {
            filters.search = search.clone();
        }
        if !self.types.is_empty() {
            filters.types = self.types.clone();
        }
        if !self.categories.is_empty() {
            filters.categories = self.categories.clone();
        }
        if !self.sources.is_empty() {
            filters.sources = self.sources.clone();
        }
        if !self.lang_codes.is_empty() {
            filters.lang_codes = self.lang_codes.clone();
        }
        if let Some(limit) = self.limit {
            filters.limit = limit;
        }
    }

    /// Starting address and the filters it resolves to after the flags.
    fn resolve(&self, codec: &FilterCodec, default_limit: u32) -> anyhow::Result<(Url, Filters)> {
        let start = match &self.address {
            Some(address) => {
                Url::parse(address).with_context(|| format!("invalid address {address:?}"))?
            }
            None => codec.host().clone(),
        };
        let mut filters = FilterCodec::decode(&start, default_limit).into_filters(default_limit);
        self.apply(&mut filters);
        Ok((start, filters))
    }
}

pub async fn run(cli: Cli, mut settings: Settings) -> anyhow::Result<()> {
    if let Some(host) = cli.host {
        settings.host = host;
    }

    match cli.command {
        Commands::Url { filters } => {
            let codec = FilterCodec::new(&settings.host)?;
            let (_, filters) = filters.resolve(&codec, settings.default_limit)?;
            println!("{}", codec.encode(&filters));
            Ok(())
        }
        Commands::Fetch {
            filters,
            pages,
            html,
        } => fetch(&settings, &filters, pages.unwrap_or(settings.pages), html).await,
        Commands::Options { kind } => {
            let codec = FilterCodec::new(&settings.host)?;
            let client = OptionsClient::new(HttpFetcher::from_settings(&settings)?, codec.host());
            for option in client.fetch(kind).await? {
                println!("{}\t{}", option.value, option.label);
            }
            Ok(())
        }
        Commands::Stream { url, page_size } => {
            let url = url.unwrap_or_else(|| settings.host.clone());
            stream(&settings, &url, page_size).await
        }
    }
}

async fn stream(settings: &Settings, url: &str, page_size: usize) -> anyhow::Result<()> {
    let fetcher = HttpFetcher::from_settings(settings)?;
    let mut pages = fetcher.stream_pages(url, page_size).await?;

    let mut count = 0;
    while let Some(page) = pages.recv().await {
        let page = page.with_context(|| format!("failed to stream {url}"))?;
        count += 1;
        println!("# page {} ({} records)", count, page.len());
        for record in &page {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    info!("Streamed {} pages from {}", count, url);
    Ok(())
}

async fn fetch(
    settings: &Settings,
    args: &FilterArgs,
    pages: usize,
    html: bool,
) -> anyhow::Result<()> {
    let codec = FilterCodec::new(&settings.host)?;
    let (start, filters) = args.resolve(&codec, settings.default_limit)?;
    let history = Arc::new(MemoryHistory::new(FilterCodec::address_for(
        &start, &filters,
    )));

    let composer = FilterComposer::new(settings.default_limit, settings.limit_options.clone());
    let (controls, snapshots) = composer.spawn(history.clone());
    let (clicks, selections) = PaginationClicks::new(history.as_ref());

    let fetcher = HttpFetcher::from_settings(settings)?;
    let cache = Arc::new(ResponseCache::with_capacity(fetcher, settings.cache_capacity));
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let session = tokio::spawn(
        CatalogSession::new(codec, cache.clone()).run(snapshots, selections, events_tx),
    );

    let mut shown = 0;
    let mut last_url: Option<String> = None;
    while let Some(event) = events.recv().await {
        let view = match event {
            SessionEvent::View(view) => view,
            SessionEvent::Error { url, error } => {
                return Err(anyhow::Error::new(error).context(format!("failed to load {url}")));
            }
        };

        // The initial page-0 selection can repeat the first page
        if last_url.as_deref() == Some(view.url.as_str()) {
            continue;
        }
        print_view(&view, html)?;
        last_url = Some(view.url.clone());
        shown += 1;

        if shown >= pages {
            break;
        }
        let Some(next) = view.buttons.iter().find(|b| b.kind == ButtonKind::Next) else {
            break;
        };
        clicks.dispatch(&mut ClickEvent::new(ClickTarget::from_button(next)));
    }

    drop(controls);
    drop(clicks);
    drop(events);
    session.await.context("catalog session panicked")?;

    println!("address: {}", history.current_url());
    info!(
        "Fetched {} pages, {} cached",
        cache.fetch_count(),
        cache.len().await
    );
    Ok(())
}

fn print_view(view: &SessionView, html: bool) -> anyhow::Result<()> {
    println!("# page {} ({})", view.active_index + 1, view.url);
    for item in &view.page.items {
        println!("{}", serde_json::to_string(item)?);
    }
    println!("{}", pager_line(&view.buttons));
    if html {
        println!("{}", render_html(&view.buttons));
    }
    Ok(())
}

fn pager_line(buttons: &[PageButton<String>]) -> String {
    buttons
        .iter()
        .map(|b| {
            if b.active && b.kind == ButtonKind::Page {
                format!("[{}]", b.label)
            } else {
                b.label.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_address() {
        let codec = FilterCodec::new("https://api.example/media").unwrap();
        let args = FilterArgs {
            address: Some("https://site.example/?search=cat&type=video&limit=40".to_string()),
            types: vec!["audio".to_string()],
            ..Default::default()
        };
        let (start, filters) = args.resolve(&codec, 20).unwrap();

        assert_eq!(start.host_str(), Some("site.example"));
        assert_eq!(filters.search, "cat");
        assert_eq!(filters.types, vec!["audio"]);
        assert_eq!(filters.limit, 40);
    }

    #[test]
    fn test_cli_parses_lists() {
        let cli = Cli::try_parse_from([
            "mediacat",
            "url",
            "--type",
            "video,audio",
            "--lang-code",
            "en",
        ])
        .unwrap();
        match cli.command {
            Commands::Url { filters } => {
                assert_eq!(filters.types, vec!["video", "audio"]);
                assert_eq!(filters.lang_codes, vec!["en"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_stream_page_size_defaults() {
        let cli =
            Cli::try_parse_from(["mediacat", "stream", "http://cat.example/all.ndjson"]).unwrap();
        match cli.command {
            Commands::Stream { url, page_size } => {
                assert_eq!(url.as_deref(), Some("http://cat.example/all.ndjson"));
                assert_eq!(page_size, 12);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_pager_line_marks_active() {
        let keys: Vec<String> = (0..3).map(|i| i.to_string()).collect();
        let line = pager_line(&mediacat::compute_buttons(&keys, 1));
        assert_eq!(line, "« ‹ 1 [2] 3 › »");
    }
}
