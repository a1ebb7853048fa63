//! Verdict determination: weighted lexicon tally plus a fixed decision table,
//! with an optional adjudicator that may override everything except the
//! no-evidence rule.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clients::traits::{AdjudicationRequest, Adjudicator, RawJudgement};
use crate::config::{LexiconConfig, VerdictConfig};
use crate::models::{
    EvidenceItem, ResearchBlock, ValidationBlock, Verdict, VerdictResult, VerificationBlock,
};
use crate::utils::domain::{domain_matches, host_of};

pub const NO_EVIDENCE_CONFIDENCE: f64 = 0.3;
const MISSING_SIGNAL: f64 = 0.5;
const VALIDATION_WEIGHT: f64 = 0.7;
const CREDIBILITY_WEIGHT: f64 = 0.3;
const CLOSE_CALL_MARGIN: f64 = 1.0;

/// Weighted lexicon hits across all evidence snippets
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvidenceTally {
    pub support: f64,
    pub contradict: f64,
    pub mixed: f64,
}

impl EvidenceTally {
    pub fn total(&self) -> f64 {
        self.support + self.contradict + self.mixed
    }
}

pub struct VerdictEngine {
    trusted_domains: Vec<String>,
    trusted_weight: f64,
    threshold: f64,
    support_terms: Vec<String>,
    contradict_terms: Vec<String>,
    mixed_terms: Vec<String>,
    adjudicator: Option<Arc<dyn Adjudicator>>,
}

fn lowered(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl VerdictEngine {
    pub fn new(config: &VerdictConfig, lexicon: &LexiconConfig) -> Self {
        Self {
            trusted_domains: config.trusted_domains.clone(),
            trusted_weight: config.trusted_weight,
            threshold: config.confidence_threshold,
            support_terms: lowered(&lexicon.support_terms),
            contradict_terms: lowered(&lexicon.contradict_terms),
            mixed_terms: lowered(&lexicon.mixed_terms),
            adjudicator: None,
        }
    }

    pub fn with_adjudicator(mut self, adjudicator: Arc<dyn Adjudicator>) -> Self {
        self.adjudicator = Some(adjudicator);
        self
    }

    fn weight_for(&self, link: &str) -> f64 {
        let trusted = host_of(link).is_some_and(|host| {
            self.trusted_domains
                .iter()
                .any(|pattern| domain_matches(&host, pattern))
        });
        if trusted { self.trusted_weight } else { 1.0 }
    }

    /// Each snippet adds its weight to every bucket whose lexicon it hits.
    pub fn tally(&self, evidence: &[EvidenceItem]) -> EvidenceTally {
        let mut tally = EvidenceTally::default();
        for item in evidence {
            let snippet = item.snippet.to_lowercase();
            let weight = self.weight_for(&item.link);
            let hits = |terms: &[String]| terms.iter().any(|t| snippet.contains(t.as_str()));
            if hits(&self.support_terms) {
                tally.support += weight;
            }
            if hits(&self.contradict_terms) {
                tally.contradict += weight;
            }
            if hits(&self.mixed_terms) {
                tally.mixed += weight;
            }
        }
        tally
    }

    /// `0.7 * validation + 0.3 * credibility`, each 0.5 when unavailable
    pub fn adjusted_confidence(
        verification: Option<&VerificationBlock>,
        validation: Option<&ValidationBlock>,
    ) -> f64 {
        let validation = validation
            .and_then(|v| v.confidence)
            .unwrap_or(MISSING_SIGNAL);
        let credibility = verification
            .and_then(|v| v.overall_credibility)
            .unwrap_or(MISSING_SIGNAL);
        (VALIDATION_WEIGHT * validation + CREDIBILITY_WEIGHT * credibility).clamp(0.0, 1.0)
    }

    /// The decision table. Rules are checked in order; the first match wins.
    pub fn decide(&self, tally: EvidenceTally, adjusted: f64) -> VerdictResult {
        let EvidenceTally {
            support,
            contradict,
            mixed,
        } = tally;

        if tally.total() == 0.0 {
            return VerdictResult {
                verdict: Verdict::InsufficientEvidence,
                confidence: NO_EVIDENCE_CONFIDENCE,
            };
        }

        let (verdict, confidence) = if support > contradict + mixed && adjusted >= self.threshold {
            (Verdict::True, adjusted)
        } else if contradict > support + mixed && adjusted >= self.threshold {
            (Verdict::False, adjusted)
        } else if mixed > support + contradict {
            (Verdict::PartiallyTrue, adjusted)
        } else if (support - contradict).abs() <= CLOSE_CALL_MARGIN {
            (Verdict::PartiallyTrue, adjusted)
        } else {
            (Verdict::PartiallyTrue, adjusted.max(0.5))
        };

        VerdictResult {
            verdict,
            confidence,
        }
    }

    /// Heuristic verdict without consulting the adjudicator
    pub fn determine_local(
        &self,
        research: Option<&ResearchBlock>,
        verification: Option<&VerificationBlock>,
        validation: Option<&ValidationBlock>,
    ) -> VerdictResult {
        let evidence = research.map(ResearchBlock::evidence).unwrap_or_default();
        let tally = self.tally(evidence);
        let adjusted = Self::adjusted_confidence(verification, validation);
        let result = self.decide(tally, adjusted);
        debug!(
            "verdict tally: support={:.1} contradict={:.1} mixed={:.1} adjusted={:.3} -> {}",
            tally.support, tally.contradict, tally.mixed, adjusted, result.verdict
        );
        result
    }

    pub async fn determine(
        &self,
        claim: &str,
        research: Option<&ResearchBlock>,
        verification: Option<&VerificationBlock>,
        validation: Option<&ValidationBlock>,
    ) -> VerdictResult {
        let local = self.determine_local(research, verification, validation);
        if local.verdict == Verdict::InsufficientEvidence {
            return local;
        }
        let Some(adjudicator) = &self.adjudicator else {
            return local;
        };

        let request = AdjudicationRequest {
            claim,
            research,
            verification,
            validation,
        };
        match adjudicator.judge(&request).await {
            Ok(raw) => match accept_judgement(&raw) {
                Some(judged) => {
                    info!(
                        "{} adjudicated {} ({:.2}); heuristic said {}",
                        adjudicator.name(),
                        judged.verdict,
                        judged.confidence,
                        local.verdict
                    );
                    judged
                }
                None => {
                    warn!(
                        "{} returned unusable judgement (verdict='{}', confidence={}); keeping heuristic verdict",
                        adjudicator.name(),
                        raw.verdict,
                        raw.confidence
                    );
                    local
                }
            },
            Err(e) => {
                warn!(
                    "{} failed: {}; keeping heuristic verdict",
                    adjudicator.name(),
                    e
                );
                local
            }
        }
    }
}

/// Validate an adjudicator answer. Unknown verdicts and out-of-range
/// confidences are rejected.
pub fn accept_judgement(raw: &RawJudgement) -> Option<VerdictResult> {
    let verdict: Verdict = raw.verdict.parse().ok()?;
    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        return None;
    }
    Some(VerdictResult {
        verdict,
        confidence: raw.confidence,
    })
}
