//! Shared data types for the verification pipeline
//!
//! Stage blocks are plain values: each stage produces a new block and the
//! orchestrator stores it once in [`crate::pipeline::PipelineState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use std::fmt;
use std::str::FromStr;

/// A single retrieved snippet with its source URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub position: usize,
}

impl EvidenceItem {
    pub fn new(link: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            title: title.into(),
            snippet: snippet.into(),
            position: 0,
        }
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = position;
        self
    }
}

// Identity is the (link, snippet) pair; title and rank are presentation only.
impl PartialEq for EvidenceItem {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link && self.snippet == other.snippet
    }
}

impl Eq for EvidenceItem {}

impl std::hash::Hash for EvidenceItem {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.link.hash(state);
        self.snippet.hash(state);
    }
}

/// Metadata pulled from a scraped page's head
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub published_at: Option<String>,
}

/// Content of the user-supplied source URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub url: String,
    /// Readable text extracted from the page
    pub content: String,
    /// Raw markup, kept for structure analysis
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub html: String,
    pub metadata: PageMetadata,
}

/// A collaborator call that failed inside a stage without aborting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaboratorFault {
    pub collaborator: String,
    pub message: String,
}

impl CollaboratorFault {
    pub fn new(collaborator: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            collaborator: collaborator.into(),
            message: message.into(),
        }
    }
}

/// Output of the research stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchBlock {
    pub search_results: Vec<EvidenceItem>,
    pub source_content: Option<ScrapedPage>,
    /// Earlier research for the same claim, if the store had one
    pub prior_record: Option<serde_json::Value>,
    pub faults: Vec<CollaboratorFault>,
    pub collected_at: DateTime<Utc>,
    pub degraded: bool,
}

impl ResearchBlock {
    pub fn empty() -> Self {
        Self {
            search_results: Vec::new(),
            source_content: None,
            prior_record: None,
            faults: Vec::new(),
            collected_at: Utc::now(),
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::empty()
        }
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.search_results
    }

    /// Every URL the stage gathered: search hits first, then the scraped source.
    pub fn source_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self
            .search_results
            .iter()
            .map(|r| r.link.as_str())
            .filter(|l| !l.is_empty())
            .collect();
        if let Some(page) = &self.source_content
            && !page.url.is_empty()
        {
            urls.push(page.url.as_str());
        }
        urls
    }
}

/// Domain-derived score modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainModifiers {
    pub uses_https: f64,
    pub domain_age: f64,
    pub trusted_domain: f64,
}

impl DomainModifiers {
    pub fn sum(&self) -> f64 {
        self.uses_https + self.domain_age + self.trusted_domain
    }
}

/// Content-derived score modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentModifiers {
    pub citations: f64,
    pub content_length: f64,
    pub structure: f64,
    pub dates_present: f64,
}

impl ContentModifiers {
    pub fn sum(&self) -> f64 {
        self.citations + self.content_length + self.structure + self.dates_present
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub base_score: f64,
    pub domain_modifiers: DomainModifiers,
    pub content_modifiers: ContentModifiers,
}

/// Normalized credibility estimate for one source; `score` is always in [0,1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    pub score: f64,
    pub components: ScoreComponents,
    pub explanation: String,
}

/// Credibility outcome for one source URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAssessment {
    pub url: String,
    pub trust: Option<TrustScore>,
    pub error: Option<String>,
}

/// Output of the verification stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationBlock {
    pub assessments: Vec<SourceAssessment>,
    /// Mean of successful trust scores; `None` when nothing could be scored
    pub overall_credibility: Option<f64>,
    pub checked_at: DateTime<Utc>,
    pub degraded: bool,
}

impl VerificationBlock {
    pub fn from_assessments(assessments: Vec<SourceAssessment>) -> Self {
        let scores: Vec<f64> = assessments
            .iter()
            .filter_map(|a| a.trust.as_ref().map(|t| t.score))
            .collect();
        let overall_credibility = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        };
        Self {
            assessments,
            overall_credibility,
            checked_at: Utc::now(),
            degraded: false,
        }
    }

    pub fn degraded() -> Self {
        Self {
            assessments: Vec::new(),
            overall_credibility: None,
            checked_at: Utc::now(),
            degraded: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.assessments.iter().any(|a| a.error.is_some())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasCategory {
    ConfirmationBias,
    AuthorityBias,
}

impl BiasCategory {
    pub fn description(&self) -> &'static str {
        match self {
            BiasCategory::ConfirmationBias => {
                "Limited number of sources may indicate confirmation bias"
            }
            BiasCategory::AuthorityBias => "Claim relies on authority figures",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallacyCategory {
    AdHominem,
    PotentialFalseCausality,
    AppealToEmotion,
}

impl FallacyCategory {
    pub fn description(&self) -> &'static str {
        match self {
            FallacyCategory::AdHominem => "Arguments contain personal attacks",
            FallacyCategory::PotentialFalseCausality => {
                "Claim may assume causation without sufficient evidence"
            }
            FallacyCategory::AppealToEmotion => "Claim uses emotional language instead of facts",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasTag {
    pub category: BiasCategory,
    pub description: String,
}

impl From<BiasCategory> for BiasTag {
    fn from(category: BiasCategory) -> Self {
        Self {
            category,
            description: category.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallacyTag {
    pub category: FallacyCategory,
    pub description: String,
}

impl From<FallacyCategory> for FallacyTag {
    fn from(category: FallacyCategory) -> Self {
        Self {
            category,
            description: category.description().to_string(),
        }
    }
}

/// Output of the validation stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationBlock {
    pub biases: Vec<BiasTag>,
    pub fallacies: Vec<FallacyTag>,
    pub cross_references: Vec<String>,
    /// `None` only when the stage degraded
    pub confidence: Option<f64>,
    pub degraded: bool,
}

impl ValidationBlock {
    pub fn degraded() -> Self {
        Self {
            biases: Vec::new(),
            fallacies: Vec::new(),
            cross_references: Vec::new(),
            confidence: None,
            degraded: true,
        }
    }
}

/// The four admissible verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "True")]
    True,
    #[serde(rename = "False")]
    False,
    #[serde(rename = "Partially True")]
    PartiallyTrue,
    #[serde(rename = "Insufficient Evidence")]
    InsufficientEvidence,
}

impl Verdict {
    pub const ALL: [Verdict; 4] = [
        Verdict::True,
        Verdict::False,
        Verdict::PartiallyTrue,
        Verdict::InsufficientEvidence,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "True",
            Verdict::False => "False",
            Verdict::PartiallyTrue => "Partially True",
            Verdict::InsufficientEvidence => "Insufficient Evidence",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown verdict '{0}'")]
pub struct UnknownVerdict(pub String);

impl FromStr for Verdict {
    type Err = UnknownVerdict;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Verdict::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownVerdict(s.to_string()))
    }
}

/// Verdict plus confidence in [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictResult {
    pub verdict: Verdict,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relevance {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFinding {
    pub finding: String,
    pub source: String,
    pub relevance: Relevance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub source: String,
    pub trust_score: f64,
    pub citation_text: String,
}

/// Rendered result of the summary stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    pub verdict: Verdict,
    pub confidence: f64,
    pub key_findings: Vec<KeyFinding>,
    pub evidence_summary: String,
    pub citations: Vec<CitationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evidence_equality_ignores_title_and_rank() {
        let a = EvidenceItem::new("https://a.org/x", "One", "same text").at_position(1);
        let b = EvidenceItem::new("https://a.org/x", "Two", "same text").at_position(7);
        let c = EvidenceItem::new("https://a.org/y", "One", "same text");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn verdict_parses_only_the_four_values() {
        assert_eq!("partially true".parse::<Verdict>(), Ok(Verdict::PartiallyTrue));
        assert_eq!(" True ".parse::<Verdict>(), Ok(Verdict::True));
        assert!("Maybe".parse::<Verdict>().is_err());
        assert_eq!(
            "Maybe".parse::<Verdict>().unwrap_err().to_string(),
            "unknown verdict 'Maybe'"
        );
        assert!("".parse::<Verdict>().is_err());
    }

    #[test]
    fn verdict_serializes_with_display_names() {
        let v = serde_json::to_value(Verdict::InsufficientEvidence).unwrap();
        assert_eq!(v, "Insufficient Evidence");
    }

    #[test]
    fn overall_credibility_is_mean_of_scored_sources() {
        let scored = |url: &str, score: f64| SourceAssessment {
            url: url.to_string(),
            trust: Some(TrustScore {
                score,
                components: ScoreComponents::default(),
                explanation: String::new(),
            }),
            error: None,
        };
        let failed = SourceAssessment {
            url: "nope".to_string(),
            trust: None,
            error: Some("Invalid URL format".to_string()),
        };
        let block = VerificationBlock::from_assessments(vec![
            scored("https://a.org", 0.6),
            failed,
            scored("https://b.org", 1.0),
        ]);
        assert!((block.overall_credibility.unwrap() - 0.8).abs() < 1e-9);
        assert!(block.has_errors());

        let empty = VerificationBlock::from_assessments(Vec::new());
        assert_eq!(empty.overall_credibility, None);
    }
}
