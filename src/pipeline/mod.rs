//! Stage orchestration
//!
//! Research → Verification → Validation → Summary → Done, strictly in order.
//! Every stage runs inside [`isolate`]: errors, panics, timeouts and
//! cancellation all end the stage with a degraded block and an error message,
//! never the run.

mod stages;
pub mod state;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::clients::Collaborators;
use crate::config::Config;
use crate::credibility::CredibilityScorer;
use crate::error::{Result, VeracityError};
use crate::models::{ResearchBlock, ValidationBlock, VerificationBlock};
use crate::summary::SummaryComposer;
use crate::verdict::VerdictEngine;

pub use state::{MessageLog, Phase, PipelineState, StageMessage};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one stage future under cancellation, a deadline and a panic guard.
pub(crate) async fn isolate<T, F>(
    stage: Phase,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let guarded = AssertUnwindSafe(fut).catch_unwind();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(VeracityError::Cancelled {
            operation: format!("{stage} stage"),
        }),
        res = tokio::time::timeout(timeout, guarded) => match res {
            Err(_) => Err(VeracityError::Timeout {
                operation: format!("{stage} stage"),
                timeout_ms: timeout.as_millis() as u64,
            }),
            Ok(Err(payload)) => Err(VeracityError::Internal {
                message: format!("{stage} stage panicked: {}", panic_message(payload.as_ref())),
            }),
            Ok(Ok(result)) => result,
        },
    }
}

/// Deadline for each domain-age lookup within the verification stage
fn lookup_budget(stage_timeout: Duration) -> Duration {
    stage_timeout / 4
}

pub struct StageOrchestrator {
    config: Arc<Config>,
    collaborators: Collaborators,
    scorer: CredibilityScorer,
    engine: VerdictEngine,
    composer: SummaryComposer,
    stage_timeout: Duration,
}

impl StageOrchestrator {
    pub fn new(config: Arc<Config>, collaborators: Collaborators) -> Self {
        let stage_timeout = Duration::from_millis(config.runtime.stage_timeout_ms);
        let scorer = CredibilityScorer::new(&config.credibility, collaborators.inspector.clone())
            .with_lookup_timeout(lookup_budget(stage_timeout));
        let mut engine = VerdictEngine::new(&config.verdict, &config.lexicon);
        let mut composer = SummaryComposer::new(&config.summary);
        if let Some(adjudicator) = &collaborators.adjudicator {
            engine = engine.with_adjudicator(adjudicator.clone());
            composer = composer.with_narrator(adjudicator.clone());
        }
        Self {
            config,
            collaborators,
            scorer,
            engine,
            composer,
            stage_timeout,
        }
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self.scorer = CredibilityScorer::new(
            &self.config.credibility,
            self.collaborators.inspector.clone(),
        )
        .with_lookup_timeout(lookup_budget(timeout));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, claim: &str, source: Option<&str>) -> Result<PipelineState> {
        self.run_with_cancel(claim, source, CancellationToken::new())
            .await
    }

    /// Verify a claim. Only an empty claim is an error; everything else
    /// yields a finished state with a summary.
    pub async fn run_with_cancel(
        &self,
        claim: &str,
        source: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<PipelineState> {
        let claim = claim.trim();
        if claim.is_empty() {
            return Err(VeracityError::input("Claim must be a non-empty string"));
        }
        let source = source
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let state = PipelineState::new(claim, source);
        let span = info_span!("fact_check", request_id = %state.request_id());
        self.drive(state, cancel).instrument(span).await
    }

    async fn drive(
        &self,
        mut state: PipelineState,
        cancel: CancellationToken,
    ) -> Result<PipelineState> {
        let timeout = self.stage_timeout;
        let claim = state.claim().to_string();
        info!("fact check started for claim: {}", claim);

        // Research
        let outcome = isolate(
            Phase::Research,
            timeout,
            &cancel,
            stages::research(
                &self.collaborators,
                &self.config.pipeline,
                &claim,
                state.source(),
            ),
        )
        .await;
        let block = match outcome {
            Ok(block) => {
                for fault in &block.faults {
                    warn!("research {} fault: {}", fault.collaborator, fault.message);
                    state.log_error(
                        "research",
                        format!("{} failed: {}", fault.collaborator, fault.message),
                    );
                }
                let suffix = if block.faults.is_empty() { "" } else { " with some errors" };
                state.log("research", format!("Research completed{suffix}"));
                block
            }
            Err(e) => {
                self.stage_failed(&mut state, "Research", &e);
                ResearchBlock::degraded()
            }
        };
        state.set_research(block)?;
        state.advance();

        // Verification
        let outcome = isolate(
            Phase::Verification,
            timeout,
            &cancel,
            stages::verify(&self.scorer, state.research()),
        )
        .await;
        let block = match outcome {
            Ok(block) => {
                let suffix = if block.has_errors() { " with some errors" } else { "" };
                state.log(
                    "verification",
                    format!("Source verification completed{suffix}"),
                );
                block
            }
            Err(e) => {
                self.stage_failed(&mut state, "Verification", &e);
                VerificationBlock::degraded()
            }
        };
        state.set_verification(block)?;
        state.advance();

        // Validation
        let outcome = isolate(
            Phase::Validation,
            timeout,
            &cancel,
            stages::validate(&self.collaborators, &claim, state.research()),
        )
        .await;
        let block = match outcome {
            Ok(block) => {
                state.log("validation", "Cross-validation and bias analysis completed");
                block
            }
            Err(e) => {
                self.stage_failed(&mut state, "Validation", &e);
                ValidationBlock::degraded()
            }
        };
        state.set_validation(block)?;
        state.advance();

        // Summary
        let outcome = isolate(
            Phase::Summary,
            timeout,
            &cancel,
            stages::summarize(
                &self.engine,
                &self.composer,
                &claim,
                state.research(),
                state.verification(),
                state.validation(),
            ),
        )
        .await;
        let summary = match outcome {
            Ok(summary) => {
                state.log("summary", "Final summary and conclusions generated");
                summary
            }
            Err(e) => {
                self.stage_failed(&mut state, "Summary", &e);
                stages::summarize_locally(
                    &self.engine,
                    &self.composer,
                    &claim,
                    state.research(),
                    state.verification(),
                    state.validation(),
                )
            }
        };
        info!(
            "verdict: {} (confidence {:.2})",
            summary.verdict, summary.confidence
        );
        state.set_summary(summary)?;
        state.advance();

        Ok(state)
    }

    fn stage_failed(&self, state: &mut PipelineState, stage: &str, err: &VeracityError) {
        error!("{} stage failed: {}", stage, err);
        state.log_error(&stage.to_lowercase(), format!("{stage} failed: {err}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn explode() -> Result<()> {
        panic!("lexicon exploded")
    }

    #[tokio::test]
    async fn isolate_converts_panics() {
        let cancel = CancellationToken::new();
        let res = isolate(Phase::Validation, Duration::from_secs(1), &cancel, explode()).await;
        let err = res.unwrap_err();
        assert!(err.to_string().contains("validation stage panicked: lexicon exploded"));
    }

    #[tokio::test]
    async fn isolate_enforces_deadline() {
        let cancel = CancellationToken::new();
        let res: Result<()> = isolate(Phase::Summary, Duration::from_millis(10), &cancel, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            res,
            Err(VeracityError::Timeout { timeout_ms: 10, .. })
        ));
    }

    #[tokio::test]
    async fn isolate_honours_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res: Result<u8> =
            isolate(Phase::Research, Duration::from_secs(1), &cancel, async { Ok(1) }).await;
        assert!(matches!(res, Err(VeracityError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn isolate_passes_results_through() {
        let cancel = CancellationToken::new();
        let res = isolate(Phase::Research, Duration::from_secs(1), &cancel, async {
            Ok::<_, VeracityError>(7)
        })
        .await;
        assert_eq!(res.unwrap(), 7);
    }
}
