pub mod adjudicator;
pub mod rdap;
pub mod scraper;
pub mod store;
pub mod tavily;
pub mod traits;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::detector::{ArgumentClassifier, BiasFallacyDetector};

pub use adjudicator::ChatAdjudicator;
pub use rdap::RdapInspector;
pub use scraper::{HttpScraper, WebCollector};
pub use store::{MemoryStore, SurrealStore};
pub use tavily::TavilySearch;
pub use traits::{
    AdjudicationRequest, Adjudicator, DomainInspector, EvidenceCollector, NoDomainLookup,
    PersistentStore, RawJudgement,
};

/// Every external capability the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub collector: Arc<dyn EvidenceCollector>,
    pub store: Option<Arc<dyn PersistentStore>>,
    pub inspector: Arc<dyn DomainInspector>,
    pub classifier: Arc<dyn ArgumentClassifier>,
    pub adjudicator: Option<Arc<dyn Adjudicator>>,
}

impl Collaborators {
    /// Collaborators with the lexicon classifier, no store, no domain lookups
    /// and no adjudicator.
    pub fn with_collector(config: &Config, collector: Arc<dyn EvidenceCollector>) -> Self {
        Self {
            collector,
            store: None,
            inspector: Arc::new(NoDomainLookup),
            classifier: Arc::new(BiasFallacyDetector::new(
                config.lexicon.clone(),
                config.pipeline.min_sources,
            )),
            adjudicator: None,
        }
    }
}

/// Build the production collaborators from configuration.
pub async fn build_collaborators(config: &Config) -> anyhow::Result<Collaborators> {
    let collector: Arc<dyn EvidenceCollector> = Arc::new(WebCollector::new(config)?);
    let mut collaborators = Collaborators::with_collector(config, collector);

    let memory = || -> Arc<dyn PersistentStore> { Arc::new(MemoryStore::new(config.store.capacity)) };
    collaborators.store = match config.store.backend.as_str() {
        "none" => None,
        "surreal" => match SurrealStore::connect(config).await {
            Ok(store) => Some(Arc::new(store) as Arc<dyn PersistentStore>),
            Err(e) => {
                warn!("SurrealDB unavailable ({:#}); using in-memory claim history", e);
                Some(memory())
            }
        },
        _ => Some(memory()),
    };

    if config.runtime.rdap_enabled {
        collaborators.inspector = Arc::new(RdapInspector::new(
            &config.runtime.rdap_url,
            config.runtime.request_timeout_ms,
        )?);
    }

    if config.runtime.adjudicator_enabled {
        collaborators.adjudicator = Some(Arc::new(ChatAdjudicator::new(config)?));
    }

    info!(
        "collaborators: store={}, rdap={}, adjudicator={}",
        config.store.backend,
        config.runtime.rdap_enabled,
        collaborators.adjudicator.is_some()
    );
    Ok(collaborators)
}
