//! Per-request pipeline state
//!
//! Stage blocks are write-once; the message log only grows.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, VeracityError};
use crate::models::{FinalSummary, ResearchBlock, ValidationBlock, VerificationBlock};

/// Where a run currently is. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Research,
    Verification,
    Validation,
    Summary,
    Done,
}

impl Phase {
    pub fn agent(&self) -> &'static str {
        match self {
            Phase::Research => "research",
            Phase::Verification => "verification",
            Phase::Validation => "validation",
            Phase::Summary => "summary",
            Phase::Done => "done",
        }
    }

    pub fn next(&self) -> Phase {
        match self {
            Phase::Research => Phase::Verification,
            Phase::Verification => Phase::Validation,
            Phase::Validation => Phase::Summary,
            Phase::Summary | Phase::Done => Phase::Done,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMessage {
    pub agent: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub error: bool,
}

/// Append-only record of what each stage reported
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct MessageLog {
    entries: Vec<StageMessage>,
}

impl MessageLog {
    pub fn append(&mut self, agent: &str, content: impl Into<String>, error: bool) {
        self.entries.push(StageMessage {
            agent: agent.to_string(),
            content: content.into(),
            timestamp: Utc::now(),
            error,
        });
    }

    pub fn entries(&self) -> &[StageMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &StageMessage> {
        self.entries.iter().filter(|m| m.error)
    }

    pub fn has_errors_for(&self, agent: &str) -> bool {
        self.errors().any(|m| m.agent == agent)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineState {
    request_id: Uuid,
    claim: String,
    source: Option<String>,
    phase: Phase,
    research: Option<ResearchBlock>,
    verification: Option<VerificationBlock>,
    validation: Option<ValidationBlock>,
    summary: Option<FinalSummary>,
    messages: MessageLog,
}

fn already_written(block: &str) -> VeracityError {
    VeracityError::Internal {
        message: format!("{block} block already written"),
    }
}

impl PipelineState {
    pub fn new(claim: impl Into<String>, source: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            claim: claim.into(),
            source,
            phase: Phase::Research,
            research: None,
            verification: None,
            validation: None,
            summary: None,
            messages: MessageLog::default(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn research(&self) -> Option<&ResearchBlock> {
        self.research.as_ref()
    }

    pub fn verification(&self) -> Option<&VerificationBlock> {
        self.verification.as_ref()
    }

    pub fn validation(&self) -> Option<&ValidationBlock> {
        self.validation.as_ref()
    }

    pub fn summary(&self) -> Option<&FinalSummary> {
        self.summary.as_ref()
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub(crate) fn log(&mut self, agent: &str, content: impl Into<String>) {
        self.messages.append(agent, content, false);
    }

    pub(crate) fn log_error(&mut self, agent: &str, content: impl Into<String>) {
        self.messages.append(agent, content, true);
    }

    pub(crate) fn advance(&mut self) {
        self.phase = self.phase.next();
    }

    pub(crate) fn set_research(&mut self, block: ResearchBlock) -> Result<()> {
        if self.research.is_some() {
            return Err(already_written("research"));
        }
        self.research = Some(block);
        Ok(())
    }

    pub(crate) fn set_verification(&mut self, block: VerificationBlock) -> Result<()> {
        if self.verification.is_some() {
            return Err(already_written("verification"));
        }
        self.verification = Some(block);
        Ok(())
    }

    pub(crate) fn set_validation(&mut self, block: ValidationBlock) -> Result<()> {
        if self.validation.is_some() {
            return Err(already_written("validation"));
        }
        self.validation = Some(block);
        Ok(())
    }

    pub(crate) fn set_summary(&mut self, summary: FinalSummary) -> Result<()> {
        if self.summary.is_some() {
            return Err(already_written("summary"));
        }
        self.summary = Some(summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_only_move_forward() {
        let mut state = PipelineState::new("claim", None);
        let mut seen = vec![state.phase()];
        while !state.is_done() {
            state.advance();
            seen.push(state.phase());
        }
        assert_eq!(
            seen,
            vec![
                Phase::Research,
                Phase::Verification,
                Phase::Validation,
                Phase::Summary,
                Phase::Done
            ]
        );
        state.advance();
        assert_eq!(state.phase(), Phase::Done);
    }

    #[test]
    fn blocks_are_write_once() {
        let mut state = PipelineState::new("claim", None);
        state.set_research(ResearchBlock::empty()).unwrap();
        let err = state.set_research(ResearchBlock::degraded()).unwrap_err();
        assert!(err.to_string().contains("research block already written"));
        assert!(!state.research().unwrap().degraded);

        state.set_validation(ValidationBlock::degraded()).unwrap();
        assert!(state.set_validation(ValidationBlock::degraded()).is_err());
    }

    #[test]
    fn message_log_appends_in_order() {
        let mut state = PipelineState::new("claim", Some("https://a.org".into()));
        state.log("research", "Research completed");
        state.log_error("verification", "Verification failed: boom");
        let entries = state.messages().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].agent, "research");
        assert!(!entries[0].error);
        assert!(entries[1].error);
        assert!(state.messages().has_errors_for("verification"));
        assert!(!state.messages().has_errors_for("research"));
        assert!(entries[0].timestamp <= entries[1].timestamp);
    }

    #[test]
    fn each_state_gets_its_own_request_id() {
        let a = PipelineState::new("x", None);
        let b = PipelineState::new("x", None);
        assert_ne!(a.request_id(), b.request_id());
    }
}
