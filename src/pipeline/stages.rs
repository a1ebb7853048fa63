//! The four stage bodies. Each returns its block or an error; isolation and
//! degradation are the orchestrator's job.

use std::collections::HashSet;

use serde_json::json;
use tracing::{debug, warn};

use crate::clients::Collaborators;
use crate::clients::traits::CallStatus;
use crate::config::PipelineConfig;
use crate::credibility::CredibilityScorer;
use crate::detector::validation_block;
use crate::error::Result;
use crate::models::{
    CollaboratorFault, EvidenceItem, FinalSummary, ResearchBlock, ScrapedPage, SourceAssessment,
    ValidationBlock, VerificationBlock,
};
use crate::summary::SummaryComposer;
use crate::verdict::VerdictEngine;

/// Drop repeated (link, snippet) pairs, keeping the first occurrence.
fn dedupe(items: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Prior lookup, source scrape, web search, then persist. Sub-step failures
/// become faults on the block.
pub(crate) async fn research(
    collaborators: &Collaborators,
    pipeline: &PipelineConfig,
    claim: &str,
    source: Option<&str>,
) -> Result<ResearchBlock> {
    let mut block = ResearchBlock::empty();

    if let Some(store) = &collaborators.store {
        match store.query(claim).await {
            Ok(prior) => block.prior_record = prior,
            Err(e) => block.faults.push(CollaboratorFault::new("store", e.to_string())),
        }
    }

    if let Some(url) = source {
        match collaborators.collector.scrape(url).await {
            Ok(outcome) if outcome.status == CallStatus::Success => {
                block.source_content = Some(ScrapedPage {
                    url: outcome.url,
                    content: outcome.content,
                    html: outcome.html,
                    metadata: outcome.metadata,
                });
            }
            Ok(outcome) => block.faults.push(CollaboratorFault::new(
                "scraper",
                outcome.error.unwrap_or_else(|| "scrape failed".to_string()),
            )),
            Err(e) => block.faults.push(CollaboratorFault::new("scraper", e.to_string())),
        }
    }

    let query = format!("{}{}", pipeline.search_prefix, claim);
    match collaborators.collector.search(&query).await {
        Ok(outcome) if outcome.status == CallStatus::Success => {
            block.search_results = dedupe(outcome.organic_results);
        }
        Ok(outcome) => block.faults.push(CollaboratorFault::new(
            "search",
            outcome.error.unwrap_or_else(|| "search failed".to_string()),
        )),
        Err(e) => block.faults.push(CollaboratorFault::new("search", e.to_string())),
    }

    if let Some(store) = &collaborators.store {
        let record = json!({
            "claim": claim,
            "source": source,
            "search_results": &block.search_results,
            "source_content": &block.source_content,
            "collected_at": block.collected_at,
        });
        match store.store(claim, &record).await {
            Ok(true) => {}
            Ok(false) => block
                .faults
                .push(CollaboratorFault::new("store", "research record was not stored")),
            Err(e) => block.faults.push(CollaboratorFault::new("store", e.to_string())),
        }
    }

    debug!(
        "research: {} results, source scraped={}, {} faults",
        block.search_results.len(),
        block.source_content.is_some(),
        block.faults.len()
    );
    Ok(block)
}

/// Score every gathered source. Domain ages are fetched up front, once per
/// domain. A source that cannot be scored is recorded with its error and left
/// out of the mean.
pub(crate) async fn verify(
    scorer: &CredibilityScorer,
    research: Option<&ResearchBlock>,
) -> Result<VerificationBlock> {
    let Some(research) = research else {
        return Ok(VerificationBlock::from_assessments(Vec::new()));
    };

    let mut targets: Vec<(&str, &str)> = research
        .search_results
        .iter()
        .filter(|item| !item.link.is_empty())
        .map(|item| (item.link.as_str(), item.snippet.as_str()))
        .collect();
    if let Some(page) = &research.source_content {
        let content = if page.html.is_empty() {
            &page.content
        } else {
            &page.html
        };
        targets.push((page.url.as_str(), content.as_str()));
    }

    let mut seen = HashSet::new();
    targets.retain(|(url, _)| seen.insert(*url));

    let ages = scorer
        .domain_ages(
            targets
                .iter()
                .filter_map(|(url, _)| CredibilityScorer::lookup_key(url)),
        )
        .await;

    let mut assessments = Vec::with_capacity(targets.len());
    for (url, content) in targets {
        let age_days = CredibilityScorer::lookup_key(url)
            .and_then(|key| ages.get(&key).copied())
            .unwrap_or(0);
        let assessment = match scorer.score_with_age(url, content, age_days) {
            Ok(trust) => SourceAssessment {
                url: url.to_string(),
                trust: Some(trust),
                error: None,
            },
            Err(e) => {
                warn!("could not score {}: {}", url, e);
                SourceAssessment {
                    url: url.to_string(),
                    trust: None,
                    error: Some(e.to_string()),
                }
            }
        };
        assessments.push(assessment);
    }
    Ok(VerificationBlock::from_assessments(assessments))
}

pub(crate) async fn validate(
    collaborators: &Collaborators,
    claim: &str,
    research: Option<&ResearchBlock>,
) -> Result<ValidationBlock> {
    let empty = ResearchBlock::empty();
    let research = research.unwrap_or(&empty);
    let detection = collaborators
        .classifier
        .classify(claim, research.evidence())
        .await?;
    Ok(validation_block(detection, research))
}

pub(crate) async fn summarize(
    engine: &VerdictEngine,
    composer: &SummaryComposer,
    claim: &str,
    research: Option<&ResearchBlock>,
    verification: Option<&VerificationBlock>,
    validation: Option<&ValidationBlock>,
) -> Result<FinalSummary> {
    let verdict = engine
        .determine(claim, research, verification, validation)
        .await;
    Ok(composer.compose(claim, verdict, research, validation).await)
}

/// Summary built without any collaborator, used when the summary stage fails
pub(crate) fn summarize_locally(
    engine: &VerdictEngine,
    composer: &SummaryComposer,
    claim: &str,
    research: Option<&ResearchBlock>,
    verification: Option<&VerificationBlock>,
    validation: Option<&ValidationBlock>,
) -> FinalSummary {
    let verdict = engine.determine_local(research, verification, validation);
    composer.compose_local(claim, verdict, research, validation)
}
