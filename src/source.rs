//! Subscription source loading
//!
//! The source list is newline-delimited. Each line is either a direct node link
//! or a URL of a subscription to fetch.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SubsiftError};
use crate::models::ProtocolFamily;

/// Fetches raw text over the network
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("subsift/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let unavailable = |reason: String| SubsiftError::SourceUnavailable {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| unavailable(e.to_string()))?;

        response.text().await.map_err(|e| unavailable(e.to_string()))
    }
}

/// One line of the source list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRecord {
    /// A node link given inline
    Link(String),
    /// A subscription to fetch
    Url(String),
}

impl SourceRecord {
    /// Classify a line; blank lines, comments and unknown schemes yield `None`
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if ProtocolFamily::detect(line).is_some() {
            return Some(SourceRecord::Link(line.to_string()));
        }

        match url::Url::parse(line) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                Some(SourceRecord::Url(line.to_string()))
            }
            _ => {
                debug!("Ignoring source line {:.48}", line);
                None
            }
        }
    }
}

/// Fetch and classify the source list.
///
/// Failing to fetch it, or finding no usable records, ends the run.
#[instrument(skip(fetcher))]
pub async fn load_source_records(
    fetcher: &dyn SourceFetcher,
    list_url: &str,
    timeout: Duration,
) -> Result<Vec<SourceRecord>> {
    let text = fetcher.fetch(list_url, timeout).await?;
    let records: Vec<SourceRecord> = text.lines().filter_map(SourceRecord::from_line).collect();

    if records.is_empty() {
        return Err(SubsiftError::EmptySourceList(list_url.to_string()));
    }

    info!("Found {} source records", records.len());
    Ok(records)
}

/// Raw subscription text gathered from all records
#[derive(Debug, Default)]
pub struct GatheredSources {
    /// One entry per fetched subscription, plus one holding all inline links
    pub blocks: Vec<String>,
    /// URL records attempted
    pub attempted: usize,
    /// URL records that could not be fetched
    pub failed: usize,
}

/// Fetch every URL record concurrently; failures are logged and skipped
#[instrument(skip_all, fields(records = records.len()))]
pub async fn gather_link_text(
    fetcher: &dyn SourceFetcher,
    records: Vec<SourceRecord>,
    timeout: Duration,
    concurrency: usize,
) -> GatheredSources {
    let mut inline = Vec::new();
    let mut urls = Vec::new();
    for record in records {
        match record {
            SourceRecord::Link(link) => inline.push(link),
            SourceRecord::Url(url) => urls.push(url),
        }
    }

    let mut gathered = GatheredSources {
        attempted: urls.len(),
        ..Default::default()
    };

    // Fetch results are collected in source-list order
    let results = futures::stream::iter(urls)
        .map(|url| async move {
            let result = fetcher.fetch(&url, timeout).await;
            (url, result)
        })
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    for (url, result) in results {
        match result {
            Ok(text) => {
                debug!("Fetched {} ({} bytes)", url, text.len());
                gathered.blocks.push(text);
            }
            Err(e) => {
                warn!(category = e.category().as_str(), "Skipping source: {}", e);
                gathered.failed += 1;
            }
        }
    }

    if !inline.is_empty() {
        gathered.blocks.push(inline.join("\n"));
    }

    info!(
        "Gathered {} subscriptions ({} failed, {} inline links)",
        gathered.attempted - gathered.failed,
        gathered.failed,
        inline.len()
    );

    gathered
}
