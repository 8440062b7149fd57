//! Customer profile bridge
//!
//! Reads a customer's saved pets and preferences from the external
//! relational store and turns them into a seed intent for a new session:
//! known allergies become exclusions, a stored budget becomes a price cap.
//! A profile only seeds; it never overrides explicit in-turn constraints.
//!
//! The save path is a side effect outside the retrieval flow: invoked when
//! a turn declares a durable pet fact, idempotent, fire-and-forget.

pub mod store;

pub use store::SqliteProfileStore;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{AssistantError, Result};
use crate::intent::{PartialIntent, PetType};
use crate::lexicon::Lexicon;

/// Preference key holding a customer's budget ceiling in dollars
pub const PREF_BUDGET_MAX: &str = "budget_max";

/// One saved pet with its allergy tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetProfile {
    pub name: Option<String>,
    pub pet_type: Option<PetType>,
    pub allergies: Vec<String>,
}

/// External relational profile store. Rows are keyed by customer id;
/// preference writes with an existing key overwrite, never append.
pub trait ProfileStore: Send + Sync {
    fn pets(&self, customer_id: &str) -> Result<Vec<PetProfile>>;

    fn preferences(&self, customer_id: &str) -> Result<HashMap<String, String>>;

    /// Record an allergy for the customer's pet of the given species,
    /// creating the pet row if needed. Saving the same allergy twice is a
    /// no-op.
    fn add_pet_allergy(
        &self,
        customer_id: &str,
        pet_type: Option<PetType>,
        allergen: &str,
    ) -> Result<()>;

    fn set_preference(&self, customer_id: &str, key: &str, value: &str) -> Result<()>;
}

/// Bridge from the profile store into the intent pipeline
pub struct ProfileBridge {
    store: Arc<dyn ProfileStore>,
    lexicon: Arc<Lexicon>,
}

impl ProfileBridge {
    pub fn new(store: Arc<dyn ProfileStore>, lexicon: Arc<Lexicon>) -> Self {
        Self { store, lexicon }
    }

    /// Build the seed intent for a new session from the customer's saved
    /// pets and preferences. Allergy tags are re-canonicalized through the
    /// lexicon; anything out of vocabulary is dropped.
    pub async fn seed_intent(&self, customer_id: &str) -> Result<PartialIntent> {
        let store = Arc::clone(&self.store);
        let customer = customer_id.to_string();

        let (pets, preferences) = tokio::task::spawn_blocking(move || {
            let pets = store.pets(&customer)?;
            let preferences = store.preferences(&customer)?;
            Ok::<_, AssistantError>((pets, preferences))
        })
        .await
        .map_err(|e| AssistantError::ProfileWriteFailure(format!("seed task: {}", e)))??;

        let mut seed = PartialIntent::default();
        for pet in &pets {
            for allergen in &pet.allergies {
                if let Some(tag) = self.lexicon.canonical_tag(allergen) {
                    seed.exclusions.insert(tag);
                }
            }
        }

        if let Some(budget) = preferences.get(PREF_BUDGET_MAX) {
            seed.price_max = budget.parse::<f64>().ok().filter(|p| *p > 0.0);
        }

        Ok(seed)
    }

    /// Persist newly declared allergies. Idempotent per allergen; failures
    /// are logged and swallowed so the conversation never blocks on the
    /// profile store.
    pub async fn save_allergies(
        &self,
        customer_id: &str,
        pet_type: Option<PetType>,
        allergens: BTreeSet<String>,
    ) {
        if allergens.is_empty() {
            return;
        }

        let store = Arc::clone(&self.store);
        let customer = customer_id.to_string();

        let outcome = tokio::task::spawn_blocking(move || {
            for allergen in &allergens {
                store.add_pet_allergy(&customer, pet_type, allergen)?;
            }
            Ok::<_, AssistantError>(())
        })
        .await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(customer_id, error = %e, "profile allergy write failed"),
            Err(e) => warn!(customer_id, error = %e, "profile write task failed"),
        }
    }
}
