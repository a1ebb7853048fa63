//! Bias and logical-fallacy detection for the validation stage

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LexiconConfig;
use crate::error::Result;
use crate::models::{
    BiasCategory, BiasTag, EvidenceItem, FallacyCategory, FallacyTag, ResearchBlock,
    ValidationBlock,
};

const BASE_CONFIDENCE: f64 = 0.7;
const BIAS_PENALTY: f64 = 0.1;
const FALLACY_PENALTY: f64 = 0.15;
const SOURCE_BONUS: f64 = 0.1;
const MAX_SOURCE_BONUS: f64 = 0.3;

/// Tags produced for one claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub biases: Vec<BiasTag>,
    pub fallacies: Vec<FallacyTag>,
}

impl Detection {
    pub fn has_bias(&self, category: BiasCategory) -> bool {
        self.biases.iter().any(|b| b.category == category)
    }

    pub fn has_fallacy(&self, category: FallacyCategory) -> bool {
        self.fallacies.iter().any(|f| f.category == category)
    }
}

/// Anything that can tag a claim with biases and fallacies. The lexicon
/// detector is the default; a model-backed classifier can stand in for it.
#[async_trait]
pub trait ArgumentClassifier: Send + Sync {
    async fn classify(&self, claim: &str, evidence: &[EvidenceItem]) -> Result<Detection>;
}

fn contains_any(haystack: &str, terms: &[String]) -> bool {
    terms
        .iter()
        .map(|t| t.to_lowercase())
        .any(|t| !t.is_empty() && haystack.contains(&t))
}

/// Deterministic lexicon checks over the claim and evidence snippets
#[derive(Debug, Clone)]
pub struct BiasFallacyDetector {
    lexicon: LexiconConfig,
    min_sources: usize,
}

impl BiasFallacyDetector {
    pub fn new(lexicon: LexiconConfig, min_sources: usize) -> Self {
        Self {
            lexicon,
            min_sources,
        }
    }

    pub fn detect(&self, claim: &str, evidence: &[EvidenceItem]) -> Detection {
        let claim_text = claim.to_lowercase();
        let mut detection = Detection::default();

        if evidence.len() < self.min_sources {
            detection.biases.push(BiasCategory::ConfirmationBias.into());
        }
        if contains_any(&claim_text, &self.lexicon.authority_terms) {
            detection.biases.push(BiasCategory::AuthorityBias.into());
        }

        // One ad hominem tag no matter how many snippets match.
        if evidence
            .iter()
            .any(|e| contains_any(&e.snippet.to_lowercase(), &self.lexicon.derogatory_terms))
        {
            detection.fallacies.push(FallacyCategory::AdHominem.into());
        }
        if contains_any(&claim_text, &self.lexicon.causal_terms) {
            detection
                .fallacies
                .push(FallacyCategory::PotentialFalseCausality.into());
        }
        if contains_any(&claim_text, &self.lexicon.emotional_terms) {
            detection.fallacies.push(FallacyCategory::AppealToEmotion.into());
        }

        debug!(
            "detector: {} evidence items, {} biases, {} fallacies",
            evidence.len(),
            detection.biases.len(),
            detection.fallacies.len()
        );
        detection
    }
}

impl Default for BiasFallacyDetector {
    fn default() -> Self {
        Self::new(LexiconConfig::default(), 3)
    }
}

#[async_trait]
impl ArgumentClassifier for BiasFallacyDetector {
    async fn classify(&self, claim: &str, evidence: &[EvidenceItem]) -> Result<Detection> {
        Ok(self.detect(claim, evidence))
    }
}

/// `clamp(0.7 - 0.1*biases - 0.15*fallacies + min(0.1*sources, 0.3), 0, 1)`
pub fn validation_confidence(biases: usize, fallacies: usize, sources: usize) -> f64 {
    let bonus = (SOURCE_BONUS * sources as f64).min(MAX_SOURCE_BONUS);
    let raw = BASE_CONFIDENCE - BIAS_PENALTY * biases as f64 - FALLACY_PENALTY * fallacies as f64
        + bonus;
    raw.clamp(0.0, 1.0)
}

pub fn cross_references(sources: &[&str]) -> Vec<String> {
    if sources.len() >= 2 {
        vec![format!("Multiple sources found: {}", sources.len())]
    } else {
        Vec::new()
    }
}

/// Build the validation block from a detection and the research it ran over.
pub fn validation_block(detection: Detection, research: &ResearchBlock) -> ValidationBlock {
    let sources = research.source_urls();
    let confidence =
        validation_confidence(detection.biases.len(), detection.fallacies.len(), sources.len());
    ValidationBlock {
        cross_references: cross_references(&sources),
        biases: detection.biases,
        fallacies: detection.fallacies,
        confidence: Some(confidence),
        degraded: false,
    }
}
