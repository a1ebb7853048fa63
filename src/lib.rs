//! Claim verification pipeline
//!
//! A claim flows through research (search and scrape), verification (source
//! credibility), validation (bias and fallacy tags) and summary (verdict,
//! findings, citations). See [`pipeline::StageOrchestrator`].

pub mod clients;
pub mod config;
pub mod credibility;
pub mod detector;
pub mod error;
pub mod http;
pub mod models;
pub mod pipeline;
pub mod summary;
pub mod utils;
pub mod verdict;

pub use config::Config;
pub use error::{Result, VeracityError};
pub use models::{FinalSummary, Verdict, VerdictResult};
pub use pipeline::{PipelineState, StageOrchestrator};
