//! Hybrid retrieval: semantic similarity plus deterministic metadata filters
//!
//! The vector-similarity service is a black box behind the `VectorSearch`
//! trait: query text in, scored candidates with metadata snapshots out. All
//! hard filtering happens here, after similarity scoring, so negative
//! intent ("salmon-free") is enforced exactly rather than semantically.

pub mod embedding;
pub mod qdrant;
pub mod retriever;

pub use retriever::{HybridRetriever, RankedProduct};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::intent::{LifeStage, PetType, SizeCategory};

/// Product metadata snapshot carried alongside each similarity hit.
/// The core never reads the catalog directly; this is all it sees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: f64,
    pub target_pet: Option<PetType>,
    pub ingredients: Vec<String>,
    pub dietary_tags: Vec<String>,
    pub brand: Option<String>,
    pub life_stage: Option<LifeStage>,
    pub size_category: Option<SizeCategory>,
}

/// One similarity hit from the external service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub product_id: String,
    /// Similarity score in the service's bounded range, higher is better
    pub score: f32,
    pub snapshot: ProductSnapshot,
}

/// Vector-similarity capability seam. The service guarantees nothing about
/// tie-break order; deterministic ordering is the retriever's job.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return up to `limit` candidates for the query text, scored by
    /// semantic similarity. Failures surface as `RetrievalUnavailable`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>>;

    /// Whether the service is reachable
    async fn health_check(&self) -> bool;
}
