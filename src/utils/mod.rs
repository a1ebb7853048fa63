//! Utility functions shared across the codebase

pub mod domain;
pub mod html;

// Re-export commonly used utilities
pub use domain::{domain_matches, host_of};
pub use html::{html_to_text, truncate_chars};
