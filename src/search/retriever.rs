//! Hybrid retriever: over-fetch, post-filter, re-rank
//!
//! Filters are applied deterministically after similarity scoring. Fewer
//! than `top_k` survivors is a valid, reportable outcome: no padding, no
//! silent substitution.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::errors::Result;
use crate::intent::{LifeStage, QueryIntent, SizeCategory};
use crate::search::{Candidate, VectorSearch};

/// A candidate that survived filtering, in final rank order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedProduct {
    pub product_id: String,
    pub score: f32,
    pub snapshot: crate::search::ProductSnapshot,
}

impl From<Candidate> for RankedProduct {
    fn from(c: Candidate) -> Self {
        Self {
            product_id: c.product_id,
            score: c.score,
            snapshot: c.snapshot,
        }
    }
}

/// Hybrid retriever over the external similarity service
pub struct HybridRetriever {
    service: Arc<dyn VectorSearch>,
    config: SearchConfig,
}

impl HybridRetriever {
    pub fn new(service: Arc<dyn VectorSearch>, config: SearchConfig) -> Self {
        Self { service, config }
    }

    /// Retrieve up to `top_k` products matching the intent, ordered by
    /// similarity score descending, ties broken by ascending price.
    pub async fn retrieve(&self, intent: &QueryIntent, top_k: usize) -> Result<Vec<RankedProduct>> {
        let query_text = Self::build_query_text(intent);
        let fetch_limit = top_k.saturating_mul(self.config.overfetch_factor).max(top_k);

        let candidates = self.service.search(&query_text, fetch_limit).await?;

        let mut survivors: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| f64::from(c.score) >= self.config.score_threshold)
            .filter(|c| Self::passes_filters(intent, c))
            .collect();

        // Deterministic order regardless of service tie-break behavior
        survivors.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(
                    a.snapshot
                        .price
                        .partial_cmp(&b.snapshot.price)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
        });

        // Dedupe by product id, keeping the best-ranked occurrence
        let mut seen = HashSet::new();
        survivors.retain(|c| seen.insert(c.product_id.clone()));

        survivors.truncate(top_k);
        Ok(survivors.into_iter().map(RankedProduct::from).collect())
    }

    /// Semantic query string from the intent's positive signal: pet type,
    /// required tags, free-text remainder. Exclusions never appear here;
    /// they are enforced by the hard filters.
    pub fn build_query_text(intent: &QueryIntent) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(pet) = intent.pet_type {
            parts.push(format!("{} food", pet.as_str()));
        }
        for tag in &intent.inclusions {
            parts.push(tag.clone());
        }
        if let Some(stage) = intent.life_stage {
            if stage != LifeStage::All {
                parts.push(stage.as_str().to_string());
            }
        }
        if let Some(query) = &intent.query {
            parts.push(query.clone());
        }
        if parts.is_empty() {
            "pet products".to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Hard metadata filters from the intent, applied after scoring
    fn passes_filters(intent: &QueryIntent, candidate: &Candidate) -> bool {
        let snap = &candidate.snapshot;

        if let Some(pet) = intent.pet_type {
            if snap.target_pet != Some(pet) {
                return false;
            }
        }

        if let Some(min) = intent.price_min {
            if snap.price < min {
                return false;
            }
        }
        if let Some(max) = intent.price_max {
            if snap.price > max {
                return false;
            }
        }

        if let Some(brand) = &intent.brand {
            match &snap.brand {
                Some(b) if b.eq_ignore_ascii_case(brand) => {}
                _ => return false,
            }
        }

        // Exclusion set must not intersect the product's ingredients or tags
        if intent
            .exclusions
            .iter()
            .any(|tag| Self::product_has_tag(snap, tag))
        {
            return false;
        }

        // Every inclusion must be covered by ingredients or dietary tags
        if !intent
            .inclusions
            .iter()
            .all(|tag| Self::product_has_tag(snap, tag))
        {
            return false;
        }

        if let Some(stage) = intent.life_stage {
            if stage != LifeStage::All {
                match snap.life_stage {
                    Some(LifeStage::All) | None => {}
                    Some(s) if s == stage => {}
                    Some(_) => return false,
                }
            }
        }

        if let Some(size) = intent.size_category {
            if size != SizeCategory::All {
                match snap.size_category {
                    Some(SizeCategory::All) | None => {}
                    Some(s) if s == size => {}
                    Some(_) => return false,
                }
            }
        }

        true
    }

    fn product_has_tag(snap: &crate::search::ProductSnapshot, tag: &str) -> bool {
        snap.ingredients.iter().any(|i| i.eq_ignore_ascii_case(tag))
            || snap.dietary_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}
