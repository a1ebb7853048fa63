use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    EvidenceItem, PageMetadata, ResearchBlock, ValidationBlock, VerdictResult, VerificationBlock,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub organic_results: Vec<EvidenceItem>,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchOutcome {
    pub fn success(organic_results: Vec<EvidenceItem>) -> Self {
        Self {
            organic_results,
            status: CallStatus::Success,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            organic_results: Vec::new(),
            status: CallStatus::Failed,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeOutcome {
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub html: String,
    pub metadata: PageMetadata,
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrapeOutcome {
    pub fn failed(url: &str, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            content: String::new(),
            html: String::new(),
            metadata: PageMetadata::default(),
            status: CallStatus::Failed,
            error: Some(error.into()),
        }
    }
}

/// Web search and page scraping
#[async_trait]
pub trait EvidenceCollector: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchOutcome>;
    async fn scrape(&self, url: &str) -> Result<ScrapeOutcome>;
}

/// Claim history. Each call must be atomic on its own; failures never block the pipeline.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn store(&self, claim: &str, record: &serde_json::Value) -> Result<bool>;
    async fn query(&self, claim: &str) -> Result<Option<serde_json::Value>>;
}

/// Everything an adjudicator may look at
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AdjudicationRequest<'a> {
    pub claim: &'a str,
    pub research: Option<&'a ResearchBlock>,
    pub verification: Option<&'a VerificationBlock>,
    pub validation: Option<&'a ValidationBlock>,
}

/// Unvalidated adjudicator answer. The verdict engine decides whether to trust it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawJudgement {
    pub verdict: String,
    pub confidence: f64,
}

/// External decision-making capability (typically an LLM)
#[async_trait]
pub trait Adjudicator: Send + Sync {
    fn name(&self) -> &str;

    async fn judge(&self, request: &AdjudicationRequest<'_>) -> Result<RawJudgement>;

    /// Prose summary of the evidence for an already-decided verdict
    async fn narrate(
        &self,
        request: &AdjudicationRequest<'_>,
        verdict: &VerdictResult,
    ) -> Result<String>;
}

/// Registration-age lookup (WHOIS/RDAP style)
#[async_trait]
pub trait DomainInspector: Send + Sync {
    async fn age_days(&self, domain: &str) -> anyhow::Result<u64>;
}

/// Inspector used when lookups are disabled; every domain reads as unknown.
pub struct NoDomainLookup;

#[async_trait]
impl DomainInspector for NoDomainLookup {
    async fn age_days(&self, _domain: &str) -> anyhow::Result<u64> {
        anyhow::bail!("domain lookup disabled")
    }
}
