//! Source credibility scoring
//!
//! A trust score starts from a trusted-domain lookup and is raised by domain
//! signals (HTTPS, registration age, table membership) and content signals
//! (citations, length, structure, dates). The sum is clamped to [0,1].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clients::traits::DomainInspector;
use crate::config::{CredibilityConfig, DomainScore};
use crate::models::{ContentModifiers, DomainModifiers, ScoreComponents, TrustScore};
use crate::utils::domain::{domain_matches, registrable_domain};
use crate::utils::html::{decode_entities, strip_scripts};

pub const DEFAULT_BASE_SCORE: f64 = 0.5;
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

static CITE_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(?:cite|blockquote)\b").unwrap());
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]|\(\d{4}\)").unwrap());
static HEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h[1-6]\b").unwrap());
static LIST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(?:ul|ol)\b").unwrap());
static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<table\b").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]+>").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b|\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{1,2},? \d{4}\b",
    )
    .unwrap()
});

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CredibilityError {
    #[error("Invalid URL format: {0}")]
    MalformedUrl(String),
    #[error("Content must be a non-empty string")]
    EmptyContent,
}

/// Structural features of a page or snippet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentAnalysis {
    pub citation_count: usize,
    pub has_headings: bool,
    pub has_lists: bool,
    pub has_tables: bool,
    pub word_count: usize,
    pub date_count: usize,
}

impl ContentAnalysis {
    pub fn is_fully_structured(&self) -> bool {
        self.has_headings && self.has_lists && self.has_tables
    }

    pub fn has_dates(&self) -> bool {
        self.date_count > 0
    }
}

/// Analyze markup or plain text for citation, structure and date signals.
pub fn analyze_content(content: &str) -> ContentAnalysis {
    let markup = strip_scripts(content);
    let text = decode_entities(&TAG_RE.replace_all(&markup, " "));

    let element_citations = CITE_TAG_RE.find_iter(&markup).count();
    let reference_markers = REFERENCE_RE.find_iter(&text).count();

    ContentAnalysis {
        citation_count: element_citations + reference_markers,
        has_headings: HEADING_RE.is_match(&markup),
        has_lists: LIST_RE.is_match(&markup),
        has_tables: TABLE_RE.is_match(&markup),
        word_count: text.split_whitespace().count(),
        date_count: DATE_RE.find_iter(&text).count(),
    }
}

/// Reliability band for a final score; bands are 0.2 wide.
pub fn reliability_band(score: f64) -> &'static str {
    if score >= 0.8 {
        "Highly reliable"
    } else if score >= 0.6 {
        "Generally reliable"
    } else if score >= 0.4 {
        "Moderately reliable"
    } else if score >= 0.2 {
        "Somewhat unreliable"
    } else {
        "Unreliable"
    }
}

fn explain(score: f64, domain: &DomainModifiers, content: &ContentModifiers) -> String {
    let mut positives = Vec::new();
    if domain.uses_https > 0.0 {
        positives.push("uses secure HTTPS connection");
    }
    if domain.trusted_domain > 0.0 {
        positives.push("comes from a trusted domain");
    }
    if domain.domain_age > 0.05 {
        positives.push("has established domain history");
    } else if domain.domain_age > 0.0 {
        positives.push("has some domain history");
    }
    if content.citations > 0.0 {
        positives.push("includes citations and references");
    }
    if content.content_length > 0.05 {
        positives.push("provides comprehensive content");
    } else if content.content_length > 0.0 {
        positives.push("provides some content");
    }
    if content.structure > 0.0 {
        positives.push("well-structured with headings, lists and tables");
    }
    if content.dates_present > 0.0 {
        positives.push("includes dates");
    }

    let mut explanation = format!("Source is {} ({:.2}/1.0). ", reliability_band(score), score);
    if !positives.is_empty() {
        explanation.push_str("Positive factors: ");
        explanation.push_str(&positives.join(", "));
        explanation.push('.');
    }
    explanation.trim_end().to_string()
}

pub struct CredibilityScorer {
    trusted_domains: Vec<DomainScore>,
    inspector: Arc<dyn DomainInspector>,
    lookup_timeout: Duration,
}

impl CredibilityScorer {
    pub fn new(config: &CredibilityConfig, inspector: Arc<dyn DomainInspector>) -> Self {
        Self {
            trusted_domains: config.trusted_domains.clone(),
            inspector,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// Deadline for a single domain-age lookup
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Registrable domain used as the age-lookup key for a URL
    pub fn lookup_key(url: &str) -> Option<String> {
        let parsed = url::Url::parse(url.trim()).ok()?;
        let host = parsed.host_str().filter(|h| !h.is_empty())?.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        Some(registrable_domain(host))
    }

    /// Age of one domain; errors and timeouts read as zero.
    pub async fn age_of(&self, domain: &str) -> u64 {
        match tokio::time::timeout(self.lookup_timeout, self.inspector.age_days(domain)).await {
            Ok(Ok(days)) => days,
            Ok(Err(e)) => {
                debug!("domain age lookup failed for {}: {}", domain, e);
                0
            }
            Err(_) => {
                warn!(
                    "domain age lookup for {} timed out after {}ms",
                    domain,
                    self.lookup_timeout.as_millis()
                );
                0
            }
        }
    }

    /// One concurrent lookup per distinct domain.
    pub async fn domain_ages<I>(&self, domains: I) -> HashMap<String, u64>
    where
        I: IntoIterator<Item = String>,
    {
        let unique: HashSet<String> = domains.into_iter().collect();
        let lookups = unique.into_iter().map(|domain| async move {
            let age = self.age_of(&domain).await;
            (domain, age)
        });
        join_all(lookups).await.into_iter().collect()
    }

    /// Table score for a host, if any entry covers it
    pub fn base_score(&self, host: &str) -> Option<f64> {
        self.trusted_domains
            .iter()
            .find(|entry| domain_matches(host, &entry.domain))
            .map(|entry| entry.score)
    }

    /// Score a source. Domain-age lookup failures degrade the age to zero.
    pub async fn score(&self, url: &str, content: &str) -> Result<TrustScore, CredibilityError> {
        let (host, _) = Self::check_inputs(url, content)?;
        let age_days = self.age_of(&registrable_domain(&host)).await;
        self.score_with_age(url, content, age_days)
    }

    /// Deterministic scoring given a known domain age
    pub fn score_with_age(
        &self,
        url: &str,
        content: &str,
        age_days: u64,
    ) -> Result<TrustScore, CredibilityError> {
        let (host, uses_https) = Self::check_inputs(url, content)?;

        let table_score = self.base_score(&host);
        let base_score = table_score.unwrap_or(DEFAULT_BASE_SCORE);

        // Table membership counts twice: once in the base, once as a modifier.
        let domain_modifiers = DomainModifiers {
            uses_https: if uses_https { 0.1 } else { 0.0 },
            domain_age: (age_days as f64 / 3650.0).min(0.1),
            trusted_domain: if table_score.is_some() { 0.2 } else { 0.0 },
        };

        let analysis = analyze_content(content);
        let content_modifiers = ContentModifiers {
            citations: (analysis.citation_count as f64 * 0.02).min(0.15),
            content_length: (analysis.word_count as f64 / 2000.0).min(0.1),
            structure: if analysis.is_fully_structured() { 0.1 } else { 0.0 },
            dates_present: if analysis.has_dates() { 0.05 } else { 0.0 },
        };

        let raw = base_score + domain_modifiers.sum() + content_modifiers.sum();
        let score = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };

        debug!(
            "credibility: host={}, base={}, domain={:.3}, content={:.3}, final={:.3}",
            host,
            base_score,
            domain_modifiers.sum(),
            content_modifiers.sum(),
            score
        );

        Ok(TrustScore {
            score,
            components: ScoreComponents {
                base_score,
                domain_modifiers,
                content_modifiers,
            },
            explanation: explain(score, &domain_modifiers, &content_modifiers),
        })
    }

    fn check_inputs(url: &str, content: &str) -> Result<(String, bool), CredibilityError> {
        if content.trim().is_empty() {
            return Err(CredibilityError::EmptyContent);
        }
        let parsed =
            url::Url::parse(url.trim()).map_err(|_| CredibilityError::MalformedUrl(url.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CredibilityError::MalformedUrl(url.to_string()))?
            .to_ascii_lowercase();
        let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
        Ok((host, parsed.scheme() == "https"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::traits::NoDomainLookup;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scorer() -> CredibilityScorer {
        CredibilityScorer::new(&CredibilityConfig::default(), Arc::new(NoDomainLookup))
    }

    struct FixedAge(u64);

    #[async_trait]
    impl DomainInspector for FixedAge {
        async fn age_days(&self, _domain: &str) -> anyhow::Result<u64> {
            Ok(self.0)
        }
    }

    #[test]
    fn unknown_http_source_with_plain_text_gets_base_plus_length() {
        let t = scorer()
            .score_with_age("http://blog.example.org/post", "one two three four", 0)
            .unwrap();
        assert_eq!(t.components.base_score, 0.5);
        assert_eq!(t.components.domain_modifiers.sum(), 0.0);
        assert!((t.score - (0.5 + 4.0 / 2000.0)).abs() < 1e-9);
        assert!(t.explanation.starts_with("Source is Moderately reliable"));
    }

    #[test]
    fn trusted_https_source_is_clamped_to_one() {
        let t = scorer()
            .score_with_age("https://www.nature.com/articles/x", "Published 2020-01-15.", 3650)
            .unwrap();
        assert_eq!(t.components.base_score, 0.95);
        assert_eq!(t.components.domain_modifiers.trusted_domain, 0.2);
        assert_eq!(t.components.domain_modifiers.uses_https, 0.1);
        assert!((t.components.domain_modifiers.domain_age - 0.1).abs() < 1e-9);
        assert_eq!(t.components.content_modifiers.dates_present, 0.05);
        assert_eq!(t.score, 1.0);
        assert!(t.explanation.contains("comes from a trusted domain"));
        assert!(t.explanation.starts_with("Source is Highly reliable (1.00/1.0)"));
    }

    #[test]
    fn structure_bonus_needs_headings_lists_and_tables() {
        let partial = "<h1>Title</h1><ul><li>a</li></ul><p>text</p>";
        let full = "<h1>Title</h1><ul><li>a</li></ul><table><tr><td>1</td></tr></table>";
        let s = scorer();
        let a = s.score_with_age("http://x.org", partial, 0).unwrap();
        let b = s.score_with_age("http://x.org", full, 0).unwrap();
        assert_eq!(a.components.content_modifiers.structure, 0.0);
        assert_eq!(b.components.content_modifiers.structure, 0.1);
    }

    #[test]
    fn citation_modifier_is_capped() {
        let refs: String = (1..=20).map(|i| format!("claim [{i}] ")).collect();
        let content = format!("<blockquote>q</blockquote><cite>c</cite> {refs}");
        let analysis = analyze_content(&content);
        assert_eq!(analysis.citation_count, 22);
        let t = scorer().score_with_age("http://x.org", &content, 0).unwrap();
        assert_eq!(t.components.content_modifiers.citations, 0.15);
    }

    #[test]
    fn scripts_do_not_count_as_content() {
        let analysis = analyze_content("<script>var a = '[1] 2020-01-01';</script><p>hello</p>");
        assert_eq!(analysis.citation_count, 0);
        assert_eq!(analysis.date_count, 0);
        assert_eq!(analysis.word_count, 1);
    }

    #[test]
    fn month_name_dates_are_detected() {
        assert!(analyze_content("Updated March 3, 2021 by staff").has_dates());
        assert!(analyze_content("posted 2019/7/4").has_dates());
        assert!(!analyze_content("no dates here").has_dates());
    }

    #[test]
    fn malformed_url_and_empty_content_are_structured_errors() {
        let s = scorer();
        assert_eq!(
            s.score_with_age("reuters.com/article", "text", 0),
            Err(CredibilityError::MalformedUrl("reuters.com/article".into()))
        );
        assert_eq!(
            s.score_with_age("https://reuters.com", "   ", 0),
            Err(CredibilityError::EmptyContent)
        );
    }

    #[test]
    fn score_stays_in_unit_interval() {
        let s = scorer();
        let heavy = format!(
            "<h1>a</h1><ol><li>b</li></ol><table></table>{} 2020-01-01",
            "word [1] ".repeat(5000)
        );
        for url in ["http://a.org", "https://reuters.com/x", "https://sciencemag.org"] {
            for content in ["x", heavy.as_str()] {
                for age in [0, 100, 100_000] {
                    let t = s.score_with_age(url, content, age).unwrap();
                    assert!((0.0..=1.0).contains(&t.score), "{url} -> {}", t.score);
                }
            }
        }
    }

    #[test]
    fn table_domain_never_scores_below_unlisted_domain() {
        let s = scorer();
        for content in ["plain", "<h1>x</h1> 2020-02-02 [1]"] {
            let listed = s.score_with_age("https://nature.com/a", content, 10).unwrap();
            let unlisted = s.score_with_age("https://unlisted.org/a", content, 10).unwrap();
            assert!(listed.score >= unlisted.score);
        }
    }

    #[tokio::test]
    async fn failed_age_lookup_degrades_to_zero() {
        let t = scorer().score("https://example.org", "text").await.unwrap();
        assert_eq!(t.components.domain_modifiers.domain_age, 0.0);
    }

    #[tokio::test]
    async fn age_lookup_feeds_the_age_modifier() {
        let s = CredibilityScorer::new(&CredibilityConfig::default(), Arc::new(FixedAge(73)));
        let t = s.score("https://example.org", "text").await.unwrap();
        assert!((t.components.domain_modifiers.domain_age - 0.02).abs() < 1e-9);
    }

    struct SlowCounting {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl DomainInspector for SlowCounting {
        async fn age_days(&self, _domain: &str) -> anyhow::Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(3650)
        }
    }

    #[test]
    fn lookup_key_is_the_registrable_domain() {
        assert_eq!(
            CredibilityScorer::lookup_key("https://www.nature.com/a").as_deref(),
            Some("nature.com")
        );
        assert_eq!(
            CredibilityScorer::lookup_key("https://news.bbc.com/x").as_deref(),
            Some("bbc.com")
        );
        assert_eq!(CredibilityScorer::lookup_key("not a url"), None);
    }

    #[tokio::test]
    async fn ages_are_looked_up_once_per_domain() {
        let inspector = Arc::new(SlowCounting {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(1),
        });
        let s = CredibilityScorer::new(&CredibilityConfig::default(), inspector.clone());
        let ages = s
            .domain_ages(["nature.com", "nature.com", "bbc.com", "nature.com"].map(String::from))
            .await;
        assert_eq!(ages.len(), 2);
        assert_eq!(ages["nature.com"], 3650);
        assert_eq!(inspector.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn slow_lookup_times_out_to_zero() {
        let inspector = Arc::new(SlowCounting {
            calls: AtomicUsize::new(0),
            delay: Duration::from_secs(10),
        });
        let s = CredibilityScorer::new(&CredibilityConfig::default(), inspector)
            .with_lookup_timeout(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let t = s.score("https://example.org", "text").await.unwrap();
        assert_eq!(t.components.domain_modifiers.domain_age, 0.0);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn bands_are_point_two_wide() {
        assert_eq!(reliability_band(0.95), "Highly reliable");
        assert_eq!(reliability_band(0.8), "Highly reliable");
        assert_eq!(reliability_band(0.6), "Generally reliable");
        assert_eq!(reliability_band(0.45), "Moderately reliable");
        assert_eq!(reliability_band(0.2), "Somewhat unreliable");
        assert_eq!(reliability_band(0.1), "Unreliable");
    }
}
