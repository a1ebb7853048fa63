//! Tavily web search adapter

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clients::traits::SearchOutcome;
use crate::config::Config;
use crate::models::EvidenceItem;

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyHit>,
}

/// Human-readable message for the status codes Tavily documents
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        401 => "Tavily API authentication failed. Please check your API key and ensure it is valid."
            .to_string(),
        429 => "Tavily API rate limit exceeded. Please wait a moment before trying again."
            .to_string(),
        403 => "Access to Tavily API is forbidden. Please verify your API key permissions."
            .to_string(),
        503 => "Tavily API service is temporarily unavailable. Please try again later.".to_string(),
        _ => format!("Tavily API error {}", status),
    }
}

pub struct TavilySearch {
    http: Client,
    api_key: Option<String>,
    endpoint: String,
    max_results: usize,
    limiter: DefaultDirectRateLimiter,
}

impl TavilySearch {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.runtime.request_timeout_ms))
            .build()
            .context("Failed to build reqwest client for search")?;
        let qps = NonZeroU32::new(config.runtime.search_qps).unwrap_or(NonZeroU32::MIN);
        let api_key = config
            .runtime
            .tavily_api_key
            .clone()
            .filter(|k| !k.trim().is_empty());
        Ok(Self {
            http,
            api_key,
            endpoint: config.runtime.search_url.clone(),
            max_results: config.pipeline.max_results,
            limiter: RateLimiter::direct(Quota::per_second(qps)),
        })
    }

    /// Failures come back as a failed outcome, never as an error.
    pub async fn search(&self, query: &str) -> SearchOutcome {
        if query.trim().is_empty() {
            return SearchOutcome::failed("Search query cannot be empty");
        }
        let Some(api_key) = self.api_key.as_deref() else {
            return SearchOutcome::failed("TAVILY_API_KEY environment variable is not set or empty");
        };

        self.limiter.until_ready().await;
        info!("Performing search with query: {}", query);

        let body = TavilyRequest {
            api_key,
            query,
            max_results: self.max_results,
        };
        let response = match self.http.post(&self.endpoint).json(&body).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return SearchOutcome::failed(
                    "Request to Tavily API timed out. Please try again later.",
                );
            }
            Err(e) => return SearchOutcome::failed(format!("Tavily request failed: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let message = status_message(status);
            warn!("search failed: {}", message);
            return SearchOutcome::failed(message);
        }

        match response.json::<TavilyResponse>().await {
            Ok(parsed) => {
                let items: Vec<EvidenceItem> = parsed
                    .results
                    .into_iter()
                    .take(self.max_results)
                    .enumerate()
                    .map(|(i, hit)| {
                        EvidenceItem::new(hit.url, hit.title, hit.content).at_position(i)
                    })
                    .collect();
                debug!("search returned {} results", items.len());
                SearchOutcome::success(items)
            }
            Err(e) => SearchOutcome::failed(format!("Invalid response format from Tavily API: {}", e)),
        }
    }
}
