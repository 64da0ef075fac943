//! Newline-delimited JSON catalogs delivered as fixed-size pages.
//!
//! The body is decoded as it arrives, so large catalogs never have to be
//! held in memory at once. Streamed pages do not go through the response
//! cache.

use reqwest::Response;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::HttpFetcher;
use crate::error::CatalogError;

/// Records per page when the caller does not choose.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Pages buffered ahead of a slow receiver.
const CHANNEL_CAPACITY: usize = 4;

pub type PageResult = Result<Vec<Value>, CatalogError>;

/// Incremental NDJSON decoder that groups records into pages.
#[derive(Debug)]
pub struct NdjsonPages {
    page_size: usize,
    pending: Vec<u8>,
    page: Vec<Value>,
}

impl NdjsonPages {
    /// A `page_size` of zero is treated as one.
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            pending: Vec::new(),
            page: Vec::with_capacity(page_size),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Feed raw body bytes, appending every page they complete to `pages`.
    ///
    /// A record split across calls is held until its newline arrives. On a
    /// bad line, pages completed before it are still appended.
    pub fn feed(
        &mut self,
        bytes: &[u8],
        pages: &mut Vec<Vec<Value>>,
    ) -> Result<(), serde_json::Error> {
        self.pending.extend_from_slice(bytes);

        while let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            if let Some(page) = self.push_line(&line)? {
                pages.push(page);
            }
        }
        Ok(())
    }

    /// Flush an unterminated last line and the final, possibly short, page.
    pub fn finish(mut self) -> Result<Option<Vec<Value>>, serde_json::Error> {
        let rest = std::mem::take(&mut self.pending);
        if let Some(page) = self.push_line(&rest)? {
            return Ok(Some(page));
        }
        if self.page.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.page))
    }

    fn push_line(&mut self, line: &[u8]) -> Result<Option<Vec<Value>>, serde_json::Error> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return Ok(None);
        }

        self.page.push(serde_json::from_slice(line)?);
        if self.page.len() < self.page_size {
            return Ok(None);
        }
        Ok(Some(std::mem::replace(
            &mut self.page,
            Vec::with_capacity(self.page_size),
        )))
    }
}

impl HttpFetcher {
    /// Stream the NDJSON body at `url` in pages of `page_size` records.
    ///
    /// A bad status fails here. Errors after the body starts arrive as the
    /// last item on the channel.
    pub async fn stream_pages(
        &self,
        url: &str,
        page_size: usize,
    ) -> Result<mpsc::Receiver<PageResult>, CatalogError> {
        let response = self.send(url).await?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let url = url.to_string();

        tokio::spawn(async move {
            if let Err(e) = pump(response, NdjsonPages::new(page_size), &tx, &url).await {
                warn!("NDJSON stream from {} failed: {}", url, e);
                let _ = tx.send(Err(e)).await;
            }
        });

        Ok(rx)
    }
}

async fn pump(
    mut response: Response,
    mut pages: NdjsonPages,
    tx: &mpsc::Sender<PageResult>,
    url: &str,
) -> Result<(), CatalogError> {
    let decode_err = |source: serde_json::Error| CatalogError::Decode {
        url: url.to_string(),
        source,
    };
    let mut sent = 0usize;
    let mut ready = Vec::new();

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| CatalogError::Http {
            url: url.to_string(),
            source,
        })?
    {
        let fed = pages.feed(&chunk, &mut ready);
        for page in ready.drain(..) {
            if tx.send(Ok(page)).await.is_err() {
                debug!("Receiver for {} dropped after {} pages", url, sent);
                return Ok(());
            }
            sent += 1;
        }
        fed.map_err(decode_err)?;
    }

    if let Some(page) = pages.finish().map_err(decode_err)? {
        if tx.send(Ok(page)).await.is_ok() {
            sent += 1;
        }
    }

    debug!("Streamed {} pages from {}", sent, url);
    Ok(())
}
