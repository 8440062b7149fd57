//! Turn orchestration
//!
//! One conversation turn runs the full pipeline sequentially: profile seed
//! (first turn only) -> normalize -> extract -> resolve -> retrieve ->
//! session update. The two external calls are timeout-bounded; their
//! failures degrade the turn and are reported in the response, never thrown
//! at the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::Config;
use crate::context::ContextResolver;
use crate::errors::Result;
use crate::intent::extractor::IntentExtractor;
use crate::intent::{PartialIntent, QueryIntent};
use crate::lexicon::{Lexicon, TaggedToken};
use crate::profile::ProfileBridge;
use crate::search::{HybridRetriever, RankedProduct};
use crate::session::{SessionStore, TurnRecord};

/// Which mandatory stages degraded this turn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegradedMode {
    /// Text understanding was unavailable; keyword fallback was used
    pub extraction: bool,
    /// Similarity service was unavailable; the result set is empty because
    /// retrieval failed, not because nothing matched
    pub retrieval: bool,
}

impl DegradedMode {
    pub fn any(&self) -> bool {
        self.extraction || self.retrieval
    }
}

/// Intermediate pipeline state, for debug/inspection surfaces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnTrace {
    pub normalized_tokens: Vec<TaggedToken>,
    /// Partial intent as extracted, before the merge
    pub partial_intent: PartialIntent,
    /// Whether a profile seed contributed to the prior intent
    pub seeded_from_profile: bool,
    pub query_text: String,
    pub extract_ms: u64,
    pub retrieve_ms: u64,
}

/// One turn's complete outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub resolved_intent: QueryIntent,
    pub results: Vec<RankedProduct>,
    pub trace: TurnTrace,
    pub degraded: DegradedMode,
}

/// The conversational search assistant
pub struct Assistant {
    lexicon: Arc<Lexicon>,
    extractor: IntentExtractor,
    resolver: ContextResolver,
    retriever: HybridRetriever,
    sessions: Arc<dyn SessionStore>,
    profiles: Option<Arc<ProfileBridge>>,
    top_k: usize,
    extract_timeout: Duration,
    retrieve_timeout: Duration,
}

impl Assistant {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lexicon: Arc<Lexicon>,
        extractor: IntentExtractor,
        resolver: ContextResolver,
        retriever: HybridRetriever,
        sessions: Arc<dyn SessionStore>,
        profiles: Option<Arc<ProfileBridge>>,
        config: &Config,
    ) -> Self {
        Self {
            lexicon,
            extractor,
            resolver,
            retriever,
            sessions,
            profiles,
            top_k: config.search.top_k,
            extract_timeout: Duration::from_millis(config.nlu.timeout_ms),
            retrieve_timeout: Duration::from_millis(config.vector.timeout_ms),
        }
    }

    /// Process one conversation turn. Extraction and retrieval failures
    /// degrade the response instead of failing it; only session-store
    /// errors propagate.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        customer_id: Option<&str>,
        utterance: &str,
    ) -> Result<TurnResponse> {
        let mut degraded = DegradedMode::default();

        // Prior state; a fresh session starts from the profile seed
        let snapshot = self.sessions.get(session_id).await;
        let mut seeded_from_profile = false;
        let (prior, last_results) = match snapshot {
            Some(snapshot) => (snapshot.current_intent, snapshot.last_results),
            None => {
                let prior = match (customer_id, &self.profiles) {
                    (Some(customer), Some(bridge)) => match bridge.seed_intent(customer).await {
                        Ok(seed) => {
                            seeded_from_profile = seed != PartialIntent::default();
                            self.resolver.resolve(&QueryIntent::default(), &seed, &[])
                        }
                        Err(e) => {
                            warn!(customer, error = %e, "profile seeding failed, starting cold");
                            QueryIntent::default()
                        }
                    },
                    _ => QueryIntent::default(),
                };
                (prior, Vec::new())
            }
        };

        let normalized_tokens = self.lexicon.normalize(utterance);

        // Extraction, bounded by the NLU timeout; degrade to the pure
        // lexicon on any failure
        let extract_start = Instant::now();
        let partial = match timeout(
            self.extract_timeout,
            self.extractor.extract(utterance, &prior),
        )
        .await
        {
            Ok(Ok(partial)) => partial,
            Ok(Err(e)) => {
                warn!(error = %e, "extraction degraded to keyword fallback");
                degraded.extraction = true;
                self.extractor.keyword_fallback(utterance)
            }
            Err(_) => {
                warn!(timeout_ms = self.extract_timeout.as_millis() as u64, "extraction timed out");
                degraded.extraction = true;
                self.extractor.keyword_fallback(utterance)
            }
        };
        let extract_ms = extract_start.elapsed().as_millis() as u64;

        let resolved = self.resolver.resolve(&prior, &partial, &last_results);
        debug!(intent = %resolved.summary(), "resolved turn intent");

        // Retrieval, bounded by the vector-service timeout; an outage is an
        // explicit empty-and-degraded outcome
        let query_text = HybridRetriever::build_query_text(&resolved);
        let retrieve_start = Instant::now();
        let results = match timeout(
            self.retrieve_timeout,
            self.retriever.retrieve(&resolved, self.top_k),
        )
        .await
        {
            Ok(Ok(results)) => results,
            Ok(Err(e)) => {
                warn!(error = %e, "retrieval failed");
                degraded.retrieval = true;
                Vec::new()
            }
            Err(_) => {
                warn!(timeout_ms = self.retrieve_timeout.as_millis() as u64, "retrieval timed out");
                degraded.retrieval = true;
                Vec::new()
            }
        };
        let retrieve_ms = retrieve_start.elapsed().as_millis() as u64;

        self.sessions
            .append_turn(
                session_id,
                TurnRecord {
                    utterance: utterance.to_string(),
                    resolved_intent: resolved.clone(),
                    results: results.clone(),
                    timestamp: chrono::Utc::now(),
                },
            )
            .await?;

        // Declarative pet facts persist in the background; the turn never
        // waits on the profile store
        if let (Some(customer), Some(bridge)) = (customer_id, &self.profiles) {
            if self.extractor.is_allergy_declaration(utterance) && !partial.exclusions.is_empty() {
                let bridge = Arc::clone(bridge);
                let customer = customer.to_string();
                let pet_type = partial.pet_type.or(resolved.pet_type);
                let allergens = partial.exclusions.clone();
                tokio::spawn(async move {
                    bridge.save_allergies(&customer, pet_type, allergens).await;
                });
            }
        }

        Ok(TurnResponse {
            resolved_intent: resolved,
            results,
            trace: TurnTrace {
                normalized_tokens,
                partial_intent: partial,
                seeded_from_profile,
                query_text,
                extract_ms,
                retrieve_ms,
            },
            degraded,
        })
    }

    /// Forget a conversation entirely
    pub async fn reset_session(&self, session_id: &str) {
        self.sessions.reset(session_id).await;
    }

    /// Results budget per turn
    pub fn top_k(&self) -> usize {
        self.top_k
    }
}
