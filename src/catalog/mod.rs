//! Product catalog loading and vector-store indexing
//!
//! The catalog is external and read-only to the search core; this module is
//! the ingestion adapter that turns product records into embedded documents
//! with a metadata payload the retriever can filter on.

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{AssistantError, Result};
use crate::intent::{LifeStage, PetType, SizeCategory};
use crate::search::qdrant::QdrantSearch;
use crate::search::ProductSnapshot;

/// One product record as stored in the catalog file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub target_pet: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    pub brand: String,
    pub life_stage: Option<String>,
    pub size_category: Option<String>,
}

impl Product {
    /// The text that gets embedded: name and description carry the semantic
    /// content, tags sharpen it
    pub fn document_text(&self) -> String {
        let mut text = format!("{}. {}", self.name, self.description);
        if !self.dietary_tags.is_empty() {
            text.push_str(&format!(" Tags: {}.", self.dietary_tags.join(", ")));
        }
        text
    }

    /// Metadata snapshot stored alongside the embedding
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            name: self.name.clone(),
            price: self.price,
            target_pet: PetType::parse(&self.target_pet),
            ingredients: self
                .ingredients
                .iter()
                .map(|i| i.trim().to_lowercase())
                .collect(),
            dietary_tags: self
                .dietary_tags
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
            brand: Some(self.brand.clone()).filter(|b| !b.is_empty()),
            life_stage: self.life_stage.as_deref().and_then(LifeStage::parse),
            size_category: self.size_category.as_deref().and_then(SizeCategory::parse),
        }
    }
}

/// Load a product catalog from a JSON array file
pub fn load_catalog(path: &Path) -> Result<Vec<Product>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AssistantError::ConfigError(format!("failed to read catalog {}: {}", path.display(), e))
    })?;

    let products: Vec<Product> = serde_json::from_str(&contents)?;
    Ok(products)
}

/// Index a catalog into the vector collection, with terminal progress
pub async fn index_catalog(
    search: &QdrantSearch,
    products: &[Product],
    show_progress: bool,
) -> Result<usize> {
    search.ensure_collection().await?;

    let bar = if show_progress {
        let bar = ProgressBar::new(products.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let mut indexed = 0;
    for product in products {
        search
            .upsert(&product.id, &product.document_text(), &product.snapshot())
            .await?;
        indexed += 1;
        if let Some(bar) = &bar {
            bar.set_message(product.name.clone());
            bar.inc(1);
        }
    }

    if let Some(bar) = &bar {
        bar.finish_with_message("catalog indexed");
    }

    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_product() -> Product {
        Product {
            id: "prod_001".to_string(),
            name: "Wellness CORE Grain-Free Dog Food".to_string(),
            description: "High-protein dry food with turkey and chicken.".to_string(),
            price: 54.99,
            target_pet: "dog".to_string(),
            ingredients: vec!["Turkey".to_string(), "Chicken".to_string(), " Peas ".to_string()],
            dietary_tags: vec!["grain-free".to_string(), "high-protein".to_string()],
            brand: "Wellness".to_string(),
            life_stage: Some("adult".to_string()),
            size_category: Some("all".to_string()),
        }
    }

    #[test]
    fn test_document_text_includes_tags() {
        let text = sample_product().document_text();
        assert!(text.contains("Wellness CORE"));
        assert!(text.contains("grain-free"));
    }

    #[test]
    fn test_snapshot_normalizes_case_and_whitespace() {
        let snapshot = sample_product().snapshot();
        assert_eq!(snapshot.target_pet, Some(PetType::Dog));
        assert!(snapshot.ingredients.contains(&"turkey".to_string()));
        assert!(snapshot.ingredients.contains(&"peas".to_string()));
        assert_eq!(snapshot.life_stage, Some(LifeStage::Adult));
    }

    #[test]
    fn test_catalog_deserializes_minimal_record() {
        let json = r#"[{
            "id": "prod_002",
            "name": "Goldfish Flakes",
            "description": "Daily flake food.",
            "price": 7.49,
            "target_pet": "fish",
            "brand": "Tetra",
            "life_stage": null,
            "size_category": null
        }]"#;

        let products: Vec<Product> = serde_json::from_str(json).unwrap();
        assert_eq!(products.len(), 1);
        assert!(products[0].ingredients.is_empty());
        assert_eq!(products[0].snapshot().target_pet, Some(PetType::Fish));
    }
}
