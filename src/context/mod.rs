//! Conversational context resolution
//!
//! Merges one turn's partial intent into the session's running intent.
//! Scalars override, sets accumulate with newest-polarity-wins, comparative
//! reference turns derive a price bound from the previous result set, and
//! the data-model invariants are enforced as the last step regardless of
//! which path produced a conflict.

use tracing::{debug, error};

use crate::config::ReferenceConfig;
use crate::intent::{PartialIntent, QueryIntent};
use crate::lexicon::ResultReference;
use crate::search::RankedProduct;

/// Context resolver with tunable comparative-price policy
pub struct ContextResolver {
    policy: ReferenceConfig,
}

impl ContextResolver {
    pub fn new(policy: ReferenceConfig) -> Self {
        Self { policy }
    }

    /// Merge a freshly extracted partial intent into the prior resolved
    /// intent. `last_results` is the previous turn's ranked result set,
    /// consulted only for comparative reference turns.
    pub fn resolve(
        &self,
        prior: &QueryIntent,
        partial: &PartialIntent,
        last_results: &[RankedProduct],
    ) -> QueryIntent {
        let mut resolved = prior.clone();

        // Explicit new value overrides; absence keeps prior
        if let Some(pet) = partial.pet_type {
            // Switching species invalidates brand and size assumptions but
            // dietary constraints carry over
            if partial.species_switch && prior.pet_type.is_some() && prior.pet_type != Some(pet) {
                resolved.brand = None;
                resolved.size_category = None;
            }
            resolved.pet_type = Some(pet);
        }

        // Accumulation: new tags add to prior sets; a tag arriving with the
        // opposite polarity wins and evicts the older entry
        for tag in &partial.exclusions {
            resolved.inclusions.remove(tag);
            resolved.exclusions.insert(tag.clone());
        }
        for tag in &partial.inclusions {
            // Skip tags this same turn also excluded; exclusion is the more
            // specific signal
            if partial.exclusions.contains(tag) {
                continue;
            }
            resolved.exclusions.remove(tag);
            resolved.inclusions.insert(tag.clone());
        }

        if let Some(min) = partial.price_min {
            resolved.price_min = Some(min);
            // A fresh lower bound above the old upper bound supersedes it
            if resolved.price_max.is_some_and(|max| max < min) {
                resolved.price_max = None;
            }
        }
        if let Some(max) = partial.price_max {
            resolved.price_max = Some(max);
            if resolved.price_min.is_some_and(|min| min > max) {
                resolved.price_min = None;
            }
        }

        // Comparative reference: derive a bound from the observed prices of
        // the previous result set, unless the turn gave an explicit bound
        match partial.reference {
            Some(ResultReference::Cheaper) if partial.price_max.is_none() => {
                if let Some(floor) = Self::min_price(last_results) {
                    let derived = floor * self.policy.cheaper_factor;
                    debug!(derived, floor, "resolved 'cheaper' to price_max");
                    resolved.price_max = Some(derived);
                    if resolved.price_min.is_some_and(|min| min > derived) {
                        resolved.price_min = None;
                    }
                }
            }
            Some(ResultReference::Pricier) if partial.price_min.is_none() => {
                if let Some(ceiling) = Self::max_price(last_results) {
                    let derived = ceiling * self.policy.pricier_factor;
                    debug!(derived, ceiling, "resolved 'pricier' to price_min");
                    resolved.price_min = Some(derived);
                    if resolved.price_max.is_some_and(|max| max < derived) {
                        resolved.price_max = None;
                    }
                }
            }
            _ => {}
        }

        if let Some(brand) = &partial.brand {
            resolved.brand = Some(brand.clone());
        }
        if let Some(stage) = partial.life_stage {
            resolved.life_stage = Some(stage);
        }
        if let Some(size) = partial.size_category {
            resolved.size_category = Some(size);
        }
        if let Some(query) = &partial.query {
            resolved.query = Some(query.clone());
        }

        // Invariants hold on every output, whichever path produced the
        // conflict. Anything repaired here escaped the policy above and is
        // an internal defect, not a caller error.
        let repairs = resolved.enforce_invariants();
        for repair in repairs {
            error!(%repair, "merge conflict not covered by policy");
        }

        resolved
    }

    fn min_price(results: &[RankedProduct]) -> Option<f64> {
        results
            .iter()
            .map(|r| r.snapshot.price)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    fn max_price(results: &[RankedProduct]) -> Option<f64> {
        results
            .iter()
            .map(|r| r.snapshot.price)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
