//! Final summary composition: ranked key findings, citation records and an
//! evidence narrative.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::clients::traits::{AdjudicationRequest, Adjudicator};
use crate::config::{DomainScore, SummaryConfig};
use crate::models::{
    CitationRecord, EvidenceItem, FinalSummary, KeyFinding, Relevance, ResearchBlock,
    ValidationBlock, Verdict, VerdictResult,
};
use crate::utils::html::truncate_chars;

const DEFAULT_CITATION_TRUST: f64 = 0.5;
const AUTHORITY_WEIGHT: f64 = 2.0;
const HIGH_RELEVANCE_SLOTS: usize = 2;

pub struct SummaryComposer {
    authority_markers: Vec<String>,
    citation_trust: Vec<DomainScore>,
    max_findings: usize,
    max_finding_chars: usize,
    high_trust_threshold: f64,
    narrator: Option<Arc<dyn Adjudicator>>,
}

impl SummaryComposer {
    pub fn new(config: &SummaryConfig) -> Self {
        Self {
            authority_markers: config.authority_markers.clone(),
            citation_trust: config.citation_trust.clone(),
            max_findings: config.max_findings,
            max_finding_chars: config.max_finding_chars,
            high_trust_threshold: config.high_trust_threshold,
            narrator: None,
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Adjudicator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    /// 2.0 for links mentioning an authority marker, else 1.0
    pub fn source_weight(&self, link: &str) -> f64 {
        if self
            .authority_markers
            .iter()
            .any(|m| !m.is_empty() && link.contains(m.as_str()))
        {
            AUTHORITY_WEIGHT
        } else {
            1.0
        }
    }

    /// Top evidence by source weight. Ties keep search order.
    pub fn key_findings(&self, evidence: &[EvidenceItem]) -> Vec<KeyFinding> {
        let mut ranked: Vec<&EvidenceItem> = evidence.iter().collect();
        ranked.sort_by(|a, b| {
            self.source_weight(&b.link)
                .total_cmp(&self.source_weight(&a.link))
        });

        ranked
            .into_iter()
            .filter(|item| !item.link.is_empty() && !item.snippet.is_empty())
            .take(self.max_findings)
            .enumerate()
            .map(|(i, item)| KeyFinding {
                finding: truncate_chars(&item.snippet, self.max_finding_chars),
                source: item.link.clone(),
                relevance: if i < HIGH_RELEVANCE_SLOTS {
                    Relevance::High
                } else {
                    Relevance::Medium
                },
            })
            .collect()
    }

    /// First table entry contained in the link wins.
    pub fn citation_trust(&self, link: &str) -> f64 {
        self.citation_trust
            .iter()
            .find(|entry| !entry.domain.is_empty() && link.contains(entry.domain.as_str()))
            .map(|entry| entry.score)
            .unwrap_or(DEFAULT_CITATION_TRUST)
    }

    pub fn citations(&self, evidence: &[EvidenceItem]) -> Vec<CitationRecord> {
        evidence
            .iter()
            .filter(|item| !item.link.is_empty())
            .map(|item| {
                let trust_score = self.citation_trust(&item.link);
                CitationRecord {
                    source: item.link.clone(),
                    trust_score,
                    citation_text: format!("Source: {}, Trust Score: {}", item.link, trust_score),
                }
            })
            .collect()
    }

    /// Deterministic narrative used when no narrator is configured or it fails
    pub fn template_narrative(
        &self,
        claim: &str,
        verdict: &VerdictResult,
        validation: Option<&ValidationBlock>,
        citations: &[CitationRecord],
    ) -> String {
        let mut text = format!(
            "Based on our analysis, the claim '{}' appears to be {} with a confidence level of {:.2}. ",
            claim, verdict.verdict, verdict.confidence
        );
        text.push_str(match verdict.verdict {
            Verdict::True => "Multiple reliable sources support this claim. ",
            Verdict::False => "Multiple reliable sources contradict this claim. ",
            Verdict::PartiallyTrue => {
                "The evidence shows this claim contains some truth but also some inaccuracies. "
            }
            Verdict::InsufficientEvidence => {
                "We couldn't find sufficient reliable information to verify this claim. "
            }
        });

        if let Some(validation) = validation {
            if !validation.biases.is_empty() {
                text.push_str(&format!(
                    "We identified {} potential biases in the sources. ",
                    validation.biases.len()
                ));
            }
            if !validation.fallacies.is_empty() {
                text.push_str(&format!(
                    "We found {} logical fallacies in the arguments. ",
                    validation.fallacies.len()
                ));
            }
        }

        let high_trust = citations
            .iter()
            .filter(|c| c.trust_score > self.high_trust_threshold)
            .count();
        text.push_str(&format!(
            "Our analysis is based on {} sources, of which {} are highly reliable.",
            citations.len(),
            high_trust
        ));
        text
    }

    /// Summary without any collaborator calls
    pub fn compose_local(
        &self,
        claim: &str,
        verdict: VerdictResult,
        research: Option<&ResearchBlock>,
        validation: Option<&ValidationBlock>,
    ) -> FinalSummary {
        let evidence = research.map(ResearchBlock::evidence).unwrap_or_default();
        let citations = self.citations(evidence);
        let key_findings = self.key_findings(evidence);
        let evidence_summary = self.template_narrative(claim, &verdict, validation, &citations);
        debug!(
            "summary: {} key findings, {} citations",
            key_findings.len(),
            citations.len()
        );
        FinalSummary {
            verdict: verdict.verdict,
            confidence: verdict.confidence,
            key_findings,
            evidence_summary,
            citations,
        }
    }

    pub async fn compose(
        &self,
        claim: &str,
        verdict: VerdictResult,
        research: Option<&ResearchBlock>,
        validation: Option<&ValidationBlock>,
    ) -> FinalSummary {
        let mut summary = self.compose_local(claim, verdict, research, validation);
        let Some(narrator) = &self.narrator else {
            return summary;
        };

        let request = AdjudicationRequest {
            claim,
            research,
            verification: None,
            validation,
        };
        match narrator.narrate(&request, &verdict).await {
            Ok(text) if !text.trim().is_empty() => {
                summary.evidence_summary = text.trim().to_string();
            }
            Ok(_) => warn!("{} returned a blank narrative; using template", narrator.name()),
            Err(e) => warn!("{} narrative failed: {}; using template", narrator.name(), e),
        }
        summary
    }
}
