//! Page scraping and the combined web evidence collector

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::clients::tavily::TavilySearch;
use crate::clients::traits::{CallStatus, EvidenceCollector, ScrapeOutcome, SearchOutcome};
use crate::config::Config;
use crate::error::Result;
use crate::models::PageMetadata;
use crate::utils::html::{extract_title, html_to_text, meta_content};

const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko)";

pub struct HttpScraper {
    http: Client,
}

/// Metadata from the document head
pub fn page_metadata(html: &str) -> PageMetadata {
    PageMetadata {
        title: extract_title(html),
        description: meta_content(html, "name", "description").unwrap_or_default(),
        published_at: meta_content(html, "property", "article:published_time"),
    }
}

impl HttpScraper {
    pub fn new(timeout_ms: u64) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(BROWSER_UA)
            .build()
            .context("Failed to build reqwest client for scraping")?;
        Ok(Self { http })
    }

    pub async fn scrape(&self, url: &str) -> ScrapeOutcome {
        let parsed = match url::Url::parse(url.trim()) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => u,
            _ => return ScrapeOutcome::failed(url, format!("Invalid URL: {}", url)),
        };

        let response = match self.http.get(parsed).send().await {
            Ok(r) => r,
            Err(e) => return ScrapeOutcome::failed(url, e.to_string()),
        };
        if let Err(e) = response.error_for_status_ref() {
            return ScrapeOutcome::failed(url, e.to_string());
        }
        let html = match response.text().await {
            Ok(t) => t,
            Err(e) => return ScrapeOutcome::failed(url, e.to_string()),
        };

        let content = html_to_text(&html);
        debug!("scraped {} ({} chars of text)", url, content.len());
        ScrapeOutcome {
            url: url.to_string(),
            content,
            metadata: page_metadata(&html),
            html,
            status: CallStatus::Success,
            error: None,
        }
    }
}

/// Tavily search plus HTTP scraping behind one collector
pub struct WebCollector {
    search: TavilySearch,
    scraper: HttpScraper,
}

impl WebCollector {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            search: TavilySearch::new(config)?,
            scraper: HttpScraper::new(config.runtime.request_timeout_ms)?,
        })
    }
}

#[async_trait]
impl EvidenceCollector for WebCollector {
    async fn search(&self, query: &str) -> Result<SearchOutcome> {
        Ok(self.search.search(query).await)
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeOutcome> {
        let outcome = self.scraper.scrape(url).await;
        if let Some(err) = &outcome.error {
            warn!("scrape of {} failed: {}", url, err);
        }
        Ok(outcome)
    }
}
