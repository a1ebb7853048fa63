use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration structure loaded from veracity.toml and environment variables.
///
/// Lexicons and domain tables live here so they can be versioned with the
/// deployment; they are read once at start and shared read-only afterwards.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub credibility: CredibilityConfig,
    #[serde(default)]
    pub lexicon: LexiconConfig,
    #[serde(default)]
    pub verdict: VerdictConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// A domain paired with a trust score in [0,1]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DomainScore {
    pub domain: String,
    pub score: f64,
}

impl DomainScore {
    pub fn new(domain: &str, score: f64) -> Self {
        Self {
            domain: domain.to_string(),
            score,
        }
    }
}

/// Research and validation stage knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub search_prefix: String,
    pub max_results: usize,
    /// Fewer evidence items than this tags the claim with confirmation bias
    pub min_sources: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_prefix: "fact check: ".to_string(),
            max_results: 5,
            min_sources: 3,
        }
    }
}

/// Trusted-domain table for the credibility scorer
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredibilityConfig {
    pub trusted_domains: Vec<DomainScore>,
}

impl Default for CredibilityConfig {
    fn default() -> Self {
        Self {
            trusted_domains: vec![
                DomainScore::new("reuters.com", 0.9),
                DomainScore::new("apnews.com", 0.9),
                DomainScore::new("bbc.com", 0.85),
                DomainScore::new("nature.com", 0.95),
                DomainScore::new("sciencemag.org", 0.95),
            ],
        }
    }
}

/// Keyword lexicons; all matching is case-insensitive substring search
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LexiconConfig {
    pub authority_terms: Vec<String>,
    pub derogatory_terms: Vec<String>,
    pub causal_terms: Vec<String>,
    pub emotional_terms: Vec<String>,
    pub support_terms: Vec<String>,
    pub contradict_terms: Vec<String>,
    pub mixed_terms: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self {
            authority_terms: words(&[
                "expert",
                "official",
                "authority",
                "scientist",
                "professor",
                "doctor",
            ]),
            derogatory_terms: words(&["idiot", "stupid", "incompetent", "fool"]),
            causal_terms: words(&["causes", "because of", "due to", "leads to", "results in"]),
            emotional_terms: words(&["shocking", "outrageous", "terrifying", "heartbreaking"]),
            support_terms: words(&["true", "confirmed", "verified", "proven", "accurate", "correct"]),
            contradict_terms: words(&[
                "false",
                "incorrect",
                "misleading",
                "wrong",
                "inaccurate",
                "debunked",
            ]),
            mixed_terms: words(&["partially", "somewhat", "depends", "context", "nuanced", "mixed"]),
        }
    }
}

/// Evidence weighting for the verdict engine
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerdictConfig {
    pub trusted_domains: Vec<String>,
    pub trusted_weight: f64,
    pub confidence_threshold: f64,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        Self {
            trusted_domains: words(&[
                "reuters.com",
                "apnews.com",
                "bbc.com",
                "nature.com",
                "sciencemag.org",
                "nih.gov",
                "who.int",
                "edu",
            ]),
            trusted_weight: 1.5,
            confidence_threshold: 0.7,
        }
    }
}

/// Ranking and citation tables for the summary composer
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Link substrings that rank a finding above the rest
    pub authority_markers: Vec<String>,
    /// Ordered; the first substring match wins
    pub citation_trust: Vec<DomainScore>,
    pub max_findings: usize,
    pub max_finding_chars: usize,
    pub high_trust_threshold: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            authority_markers: words(&[
                "reuters", "apnews", "bbc", "nature", "science", "nih.gov", "who.int", ".edu",
            ]),
            citation_trust: vec![
                DomainScore::new("reuters.com", 0.9),
                DomainScore::new("apnews.com", 0.9),
                DomainScore::new("bbc.com", 0.85),
                DomainScore::new("nature.com", 0.95),
                DomainScore::new("sciencemag.org", 0.95),
                DomainScore::new("nih.gov", 0.9),
                DomainScore::new("who.int", 0.9),
                DomainScore::new("edu", 0.8),
            ],
            max_findings: 5,
            max_finding_chars: 300,
            high_trust_threshold: 0.7,
        }
    }
}

/// Claim history store selection
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// "memory", "surreal" or "none"
    pub backend: String,
    pub capacity: usize,
    pub database_url: String,
    pub database_ns: String,
    pub database_db: String,
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            capacity: 1024,
            database_url: "127.0.0.1:8000".to_string(),
            database_ns: "veracity".to_string(),
            database_db: "claims".to_string(),
            table: "research_results".to_string(),
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub tavily_api_key: Option<String>,
    pub search_url: String,
    pub search_qps: u32,
    pub adjudicator_api_key: Option<String>,
    pub adjudicator_url: String,
    pub adjudicator_model: String,
    pub adjudicator_enabled: bool,
    pub adjudicator_retries: u32,
    pub rdap_enabled: bool,
    pub rdap_url: String,
    pub request_timeout_ms: u64,
    pub stage_timeout_ms: u64,
    pub http_bind: SocketAddr,
    pub log_level: String,
    pub no_ansi: bool,
    pub database_user: String,
    pub database_pass: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            search_url: "https://api.tavily.com/search".to_string(),
            search_qps: 5,
            adjudicator_api_key: None,
            adjudicator_url: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            adjudicator_model: "llama-3.3-70b-versatile".to_string(),
            adjudicator_enabled: false,
            adjudicator_retries: 3,
            rdap_enabled: true,
            rdap_url: "https://rdap.org/domain".to_string(),
            request_timeout_ms: 15_000,
            stage_timeout_ms: 30_000,
            http_bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            log_level: "veracity=info".to_string(),
            no_ansi: false,
            database_user: "root".to_string(),
            database_pass: "root".to_string(),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let defaults = Self::default();
        let adjudicator_api_key = std::env::var("ADJUDICATOR_API_KEY")
            .ok()
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .filter(|k| !k.trim().is_empty());
        // Adjudication is on whenever a key is present unless explicitly disabled
        let adjudicator_enabled =
            env_flag("VERACITY_ADJUDICATOR").unwrap_or(adjudicator_api_key.is_some());

        Self {
            tavily_api_key: std::env::var("TAVILY_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            search_url: std::env::var("VERACITY_SEARCH_URL").unwrap_or(defaults.search_url),
            search_qps: env_parse("VERACITY_SEARCH_QPS").unwrap_or(defaults.search_qps),
            adjudicator_api_key,
            adjudicator_url: std::env::var("ADJUDICATOR_URL").unwrap_or(defaults.adjudicator_url),
            adjudicator_model: std::env::var("ADJUDICATOR_MODEL")
                .unwrap_or(defaults.adjudicator_model),
            adjudicator_enabled,
            adjudicator_retries: env_parse("ADJUDICATOR_RETRIES")
                .unwrap_or(defaults.adjudicator_retries),
            rdap_enabled: env_flag("VERACITY_RDAP").unwrap_or(defaults.rdap_enabled),
            rdap_url: std::env::var("VERACITY_RDAP_URL").unwrap_or(defaults.rdap_url),
            request_timeout_ms: env_parse("VERACITY_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout_ms),
            stage_timeout_ms: env_parse("VERACITY_STAGE_TIMEOUT_MS")
                .unwrap_or(defaults.stage_timeout_ms),
            http_bind: env_parse("VERACITY_HTTP_BIND").unwrap_or(defaults.http_bind),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            no_ansi: env_flag("VERACITY_NO_ANSI").unwrap_or(false),
            database_user: std::env::var("VERACITY_DB_USER").unwrap_or(defaults.database_user),
            database_pass: std::env::var("VERACITY_DB_PASS").unwrap_or(defaults.database_pass),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses VERACITY_CONFIG or defaults to "veracity.toml".
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("VERACITY_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path =
            std::env::var("VERACITY_CONFIG").unwrap_or_else(|_| "veracity.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        // Env-first overrides for the store
        if let Ok(backend) = std::env::var("VERACITY_STORE") {
            config.store.backend = backend;
        }
        if let Ok(url) = std::env::var("VERACITY_DB_URL") {
            config.store.database_url = url;
        }
        if let Ok(ns) = std::env::var("VERACITY_DB_NS") {
            config.store.database_ns = ns;
        }
        if let Ok(db) = std::env::var("VERACITY_DB_DB") {
            config.store.database_db = db;
        }

        config.runtime = RuntimeConfig::load_from_env();

        if config.runtime.tavily_api_key.is_none() {
            tracing::warn!("TAVILY_API_KEY not set; searches will fail and degrade to no evidence");
        }
        if config.runtime.adjudicator_enabled && config.runtime.adjudicator_api_key.is_none() {
            tracing::warn!("Adjudicator enabled without an API key; disabling it");
            config.runtime.adjudicator_enabled = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing sections keep their defaults.
    pub fn from_toml_str(content: &str) -> crate::error::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let tables = self
            .credibility
            .trusted_domains
            .iter()
            .chain(self.summary.citation_trust.iter());
        for entry in tables {
            if !(0.0..=1.0).contains(&entry.score) {
                anyhow::bail!(
                    "trust score for '{}' must be between 0.0 and 1.0, got {}",
                    entry.domain,
                    entry.score
                );
            }
            if entry.domain.trim().is_empty() {
                anyhow::bail!("domain tables must not contain empty domains");
            }
        }

        let lexicons = [
            ("support_terms", &self.lexicon.support_terms),
            ("contradict_terms", &self.lexicon.contradict_terms),
            ("mixed_terms", &self.lexicon.mixed_terms),
        ];
        for (name, list) in lexicons {
            if list.iter().all(|t| t.trim().is_empty()) {
                anyhow::bail!("lexicon.{} must contain at least one term", name);
            }
        }

        if !(0.0..=1.0).contains(&self.verdict.confidence_threshold) {
            anyhow::bail!("verdict.confidence_threshold must be between 0.0 and 1.0");
        }
        if self.verdict.trusted_weight <= 0.0 {
            anyhow::bail!("verdict.trusted_weight must be > 0");
        }
        if self.summary.max_finding_chars < 4 {
            anyhow::bail!("summary.max_finding_chars must leave room for an ellipsis");
        }
        if self.runtime.stage_timeout_ms == 0 {
            anyhow::bail!("VERACITY_STAGE_TIMEOUT_MS must be > 0");
        }
        match self.store.backend.as_str() {
            "memory" | "surreal" | "none" => {}
            other => anyhow::bail!("unknown store backend '{}'", other),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VeracityError;

    #[test]
    fn defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_sections() {
        let toml_src = r#"
            [credibility]
            trusted_domains = [{ domain = "example.org", score = 0.8 }]

            [verdict]
            trusted_weight = 2.0
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.credibility.trusted_domains.len(), 1);
        assert_eq!(config.verdict.trusted_weight, 2.0);
        assert_eq!(config.verdict.confidence_threshold, 0.7);
        assert_eq!(config.summary.max_findings, 5);
        assert!(config.lexicon.support_terms.contains(&"confirmed".to_string()));
    }

    #[test]
    fn out_of_range_trust_score_is_rejected() {
        let mut config = Config::default();
        config.credibility.trusted_domains.push(DomainScore::new("bad.example", 1.4));
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = Config::from_toml_str("[verdict]\ntrusted_weight = \"heavy\"").unwrap_err();
        assert!(matches!(err, VeracityError::Config { .. }));
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn unknown_store_backend_is_rejected() {
        let mut config = Config::default();
        config.store.backend = "redis".to_string();
        assert!(config.validate().is_err());
    }
}
