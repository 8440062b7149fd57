//! Qdrant-backed vector similarity service
//!
//! Embeds query text via the embeddings endpoint and searches one product
//! collection. List-valued metadata (ingredients, dietary tags) is stored
//! comma-joined, matching the catalog indexer.

use async_trait::async_trait;
use qdrant_client::{
    client::{Payload, QdrantClient},
    qdrant::{
        vectors_config::Config, with_payload_selector::SelectorOptions, CreateCollection, Distance,
        PointStruct, SearchPoints, Value as QdrantValue, VectorParams, VectorsConfig,
        WithPayloadSelector,
    },
};
use std::collections::HashMap;

use crate::errors::{AssistantError, Result};
use crate::intent::{LifeStage, PetType, SizeCategory};
use crate::search::embedding::{EmbeddingClient, EMBEDDING_DIM};
use crate::search::{Candidate, ProductSnapshot, VectorSearch};

/// Vector similarity service over a qdrant collection
pub struct QdrantSearch {
    client: QdrantClient,
    embedder: EmbeddingClient,
    collection: String,
}

impl QdrantSearch {
    /// Connect to a qdrant instance
    pub fn new(url: &str, collection: &str, embedder: EmbeddingClient) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("qdrant client: {}", e)))?;

        Ok(Self {
            client,
            embedder,
            collection: collection.to_string(),
        })
    }

    /// Create the product collection if it does not exist yet
    pub async fn ensure_collection(&self) -> Result<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("list collections: {}", e)))?;

        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            self.client
                .create_collection(&CreateCollection {
                    collection_name: self.collection.clone(),
                    vectors_config: Some(VectorsConfig {
                        config: Some(Config::Params(VectorParams {
                            size: EMBEDDING_DIM,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    }),
                    ..Default::default()
                })
                .await
                .map_err(|e| {
                    AssistantError::RetrievalUnavailable(format!("create collection: {}", e))
                })?;
        }

        Ok(())
    }

    /// Upsert one product document with its embedding and metadata payload
    pub async fn upsert(
        &self,
        id: &str,
        document: &str,
        snapshot: &ProductSnapshot,
    ) -> Result<()> {
        let embedding = self.embedder.embed(document).await?;
        let mut payload = snapshot_to_payload(snapshot);
        payload.insert("product_id".to_string(), QdrantValue::from(id));
        let point = PointStruct::new(
            numeric_point_id(id),
            embedding,
            Payload::new_from_hashmap(payload),
        );

        self.client
            .upsert_points_blocking(&self.collection, None, vec![point], None)
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("upsert: {}", e)))?;

        Ok(())
    }

    /// Number of points currently in the collection
    pub async fn count(&self) -> Result<u64> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("collection info: {}", e)))?;

        Ok(info.result.and_then(|r| r.points_count).unwrap_or(0))
    }
}

#[async_trait]
impl VectorSearch for QdrantSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let embedding = self.embedder.embed(query).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: embedding,
                limit: limit as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| AssistantError::RetrievalUnavailable(format!("search: {}", e)))?;

        let candidates = search_result
            .result
            .into_iter()
            .map(|point| {
                let product_id = point
                    .payload
                    .get("product_id")
                    .and_then(value_to_string)
                    .unwrap_or_else(|| point_id_to_string(&point.id));

                Candidate {
                    product_id,
                    score: point.score,
                    snapshot: payload_to_snapshot(&point.payload),
                }
            })
            .collect();

        Ok(candidates)
    }

    async fn health_check(&self) -> bool {
        self.client.list_collections().await.is_ok()
    }
}

/// Build the metadata payload for a product point
fn snapshot_to_payload(snapshot: &ProductSnapshot) -> HashMap<String, QdrantValue> {
    let mut payload = HashMap::new();
    payload.insert("name".to_string(), QdrantValue::from(snapshot.name.clone()));
    payload.insert("price".to_string(), QdrantValue::from(snapshot.price));
    if let Some(pet) = snapshot.target_pet {
        payload.insert("target_pet".to_string(), QdrantValue::from(pet.as_str()));
    }
    payload.insert(
        "ingredients".to_string(),
        QdrantValue::from(snapshot.ingredients.join(",")),
    );
    payload.insert(
        "dietary_tags".to_string(),
        QdrantValue::from(snapshot.dietary_tags.join(",")),
    );
    if let Some(brand) = &snapshot.brand {
        payload.insert("brand".to_string(), QdrantValue::from(brand.clone()));
    }
    if let Some(stage) = snapshot.life_stage {
        payload.insert("life_stage".to_string(), QdrantValue::from(stage.as_str()));
    }
    if let Some(size) = snapshot.size_category {
        payload.insert("size_category".to_string(), QdrantValue::from(size.as_str()));
    }
    payload
}

/// Rebuild a product snapshot from a point payload
fn payload_to_snapshot(payload: &HashMap<String, QdrantValue>) -> ProductSnapshot {
    ProductSnapshot {
        name: payload.get("name").and_then(value_to_string).unwrap_or_default(),
        price: payload.get("price").and_then(value_to_f64).unwrap_or(0.0),
        target_pet: payload
            .get("target_pet")
            .and_then(value_to_string)
            .as_deref()
            .and_then(PetType::parse),
        ingredients: payload
            .get("ingredients")
            .and_then(value_to_string)
            .map(split_list)
            .unwrap_or_default(),
        dietary_tags: payload
            .get("dietary_tags")
            .and_then(value_to_string)
            .map(split_list)
            .unwrap_or_default(),
        brand: payload.get("brand").and_then(value_to_string),
        life_stage: payload
            .get("life_stage")
            .and_then(value_to_string)
            .as_deref()
            .and_then(LifeStage::parse),
        size_category: payload
            .get("size_category")
            .and_then(value_to_string)
            .as_deref()
            .and_then(SizeCategory::parse),
    }
}

fn split_list(joined: String) -> Vec<String> {
    joined
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn value_to_string(value: &QdrantValue) -> Option<String> {
    use qdrant_client::qdrant::value::Kind;
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(s.clone()),
        _ => None,
    })
}

fn value_to_f64(value: &QdrantValue) -> Option<f64> {
    use qdrant_client::qdrant::value::Kind;
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::DoubleValue(f) => Some(*f),
        Kind::IntegerValue(i) => Some(*i as f64),
        _ => None,
    })
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => "unknown".to_string(),
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Stable numeric point id from a catalog id like "prod_042". Catalog ids
/// stay in the payload; qdrant point ids must be numeric or UUID.
fn numeric_point_id(id: &str) -> u64 {
    let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or_else(|_| {
        // Fallback: FNV-1a over the raw id
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in id.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let snapshot = ProductSnapshot {
            name: "Salmon Feast".to_string(),
            price: 24.99,
            target_pet: Some(PetType::Cat),
            ingredients: vec!["salmon".to_string(), "rice".to_string()],
            dietary_tags: vec!["grain-free".to_string()],
            brand: Some("Wellness".to_string()),
            life_stage: Some(LifeStage::Adult),
            size_category: None,
        };

        let payload = snapshot_to_payload(&snapshot);
        let restored = payload_to_snapshot(&payload);

        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list("salmon, rice,,sweet potato".to_string()),
            vec!["salmon", "rice", "sweet potato"]
        );
    }

    #[test]
    fn test_numeric_point_id_from_catalog_id() {
        assert_eq!(numeric_point_id("prod_042"), 42);
        // Ids without digits still get a stable id
        assert_eq!(numeric_point_id("abc"), numeric_point_id("abc"));
        assert_ne!(numeric_point_id("abc"), numeric_point_id("abd"));
    }
}
