//! Fakes shared by the integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use veracity::Config;
use veracity::clients::traits::{
    AdjudicationRequest, Adjudicator, CallStatus, DomainInspector, EvidenceCollector,
    PersistentStore,
    RawJudgement, ScrapeOutcome, SearchOutcome,
};
use veracity::clients::{Collaborators, MemoryStore};
use veracity::detector::{ArgumentClassifier, Detection};
use veracity::error::{Result, VeracityError};
use veracity::models::{EvidenceItem, PageMetadata, VerdictResult};

pub enum SearchBehaviour {
    Results(Vec<EvidenceItem>),
    Reports(String),
    Errors(String),
}

pub struct FakeCollector {
    pub search: SearchBehaviour,
    pub page_html: Option<String>,
}

impl FakeCollector {
    pub fn with_results(results: Vec<EvidenceItem>) -> Self {
        Self {
            search: SearchBehaviour::Results(results),
            page_html: None,
        }
    }

    pub fn with_page(mut self, html: &str) -> Self {
        self.page_html = Some(html.to_string());
        self
    }
}

#[async_trait]
impl EvidenceCollector for FakeCollector {
    async fn search(&self, _query: &str) -> Result<SearchOutcome> {
        match &self.search {
            SearchBehaviour::Results(items) => Ok(SearchOutcome::success(items.clone())),
            SearchBehaviour::Reports(msg) => Ok(SearchOutcome::failed(msg.clone())),
            SearchBehaviour::Errors(msg) => Err(VeracityError::collaborator("search", msg.clone())),
        }
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeOutcome> {
        match &self.page_html {
            Some(html) => Ok(ScrapeOutcome {
                url: url.to_string(),
                content: veracity::utils::html_to_text(html),
                html: html.clone(),
                metadata: PageMetadata::default(),
                status: CallStatus::Success,
                error: None,
            }),
            None => Ok(ScrapeOutcome::failed(url, "404 Not Found")),
        }
    }
}

pub struct PanickingClassifier;

#[async_trait]
impl ArgumentClassifier for PanickingClassifier {
    async fn classify(&self, _claim: &str, _evidence: &[EvidenceItem]) -> Result<Detection> {
        panic!("classifier model failed to load")
    }
}

/// Never answers within any reasonable stage deadline
pub struct HangingAdjudicator;

#[async_trait]
impl Adjudicator for HangingAdjudicator {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn judge(&self, _request: &AdjudicationRequest<'_>) -> Result<RawJudgement> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RawJudgement {
            verdict: "True".into(),
            confidence: 1.0,
        })
    }

    async fn narrate(
        &self,
        _request: &AdjudicationRequest<'_>,
        _verdict: &VerdictResult,
    ) -> Result<String> {
        Ok("never".into())
    }
}

/// Sleeps, then fails, counting every lookup
pub struct SlowInspector {
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowInspector {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainInspector for SlowInspector {
    async fn age_days(&self, domain: &str) -> anyhow::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        anyhow::bail!("rdap lookup for {domain} failed")
    }
}

pub struct BrokenStore;

#[async_trait]
impl PersistentStore for BrokenStore {
    async fn store(&self, _claim: &str, _record: &Value) -> Result<bool> {
        Err(VeracityError::collaborator("store", "connection refused"))
    }

    async fn query(&self, _claim: &str) -> Result<Option<Value>> {
        Err(VeracityError::collaborator("store", "connection refused"))
    }
}

pub fn collaborators(collector: FakeCollector) -> Collaborators {
    Collaborators::with_collector(&Config::default(), Arc::new(collector))
}

pub fn with_memory_store(mut c: Collaborators) -> Collaborators {
    c.store = Some(Arc::new(MemoryStore::new(16)));
    c
}

pub fn confirmed_by(domain: &str, n: usize) -> Vec<EvidenceItem> {
    (0..n)
        .map(|i| {
            EvidenceItem::new(
                format!("https://www.{domain}/articles/{i}"),
                format!("Study {i}"),
                "The result was confirmed by independent replication.",
            )
            .at_position(i)
        })
        .collect()
}
