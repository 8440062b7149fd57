//! External text-understanding capability
//!
//! The assistant delegates natural-language-to-structure mapping to an
//! external completion service invoked with a fixed field schema, so the
//! service returns values confined to the declared domain vocabulary. The
//! returned structure is *untrusted*: all validation happens in the intent
//! extractor, never here.

pub mod client;

pub use client::NluClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Structured candidate values returned by the service for one utterance.
/// Every field may be absent; enumerated fields arrive as raw strings and
/// must be re-checked against the legal vocabulary downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExtraction {
    /// What the user is looking for, as free text
    pub query: Option<String>,
    pub target_pet: Option<String>,
    /// Positive dietary requirements ("high-protein", "organic")
    #[serde(default)]
    pub dietary_requirements: Vec<String>,
    /// Ingredients to exclude ("salmon-free" -> salmon)
    #[serde(default)]
    pub dietary_exclusions: Vec<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub brand: Option<String>,
    pub life_stage: Option<String>,
    pub size_category: Option<String>,
    /// "cheaper" or "pricier" when the turn only compares against the
    /// previous results
    pub reference: Option<String>,
    /// True when the turn switches species ("what about for cats instead?")
    pub switch_pet: Option<bool>,
}

/// Text-understanding capability seam. Implemented by the HTTP client in
/// production and by deterministic mocks in tests.
#[async_trait]
pub trait TextUnderstanding: Send + Sync {
    /// Map one utterance to structured candidate values, constrained by the
    /// fixed extraction schema. `context` is a compact summary of the prior
    /// resolved intent, so follow-up turns parse in context. Transport
    /// failures and unparsable output surface as `ExtractionUnavailable`.
    async fn extract(&self, utterance: &str, context: Option<&str>) -> Result<RawExtraction>;

    /// Whether the service is reachable
    async fn health_check(&self) -> bool;
}

/// The fixed extraction schema sent with every request. Field names and
/// enumerations mirror the domain vocabulary; the service may not invent
/// values outside it (and is not trusted to comply).
pub fn extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query (what the user is looking for)"
            },
            "target_pet": {
                "type": "string",
                "enum": ["dog", "cat", "bird", "fish", "other"],
                "description": "Type of pet the product is for"
            },
            "dietary_exclusions": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Ingredients to EXCLUDE. From 'salmon-free', 'without chicken', 'no beef'"
            },
            "dietary_requirements": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Positive requirements like 'high-protein', 'organic', 'limited-ingredient'"
            },
            "price_min": { "type": "number", "description": "Minimum price in dollars" },
            "price_max": { "type": "number", "description": "Maximum price in dollars" },
            "brand": { "type": "string", "description": "Specific brand if mentioned" },
            "life_stage": {
                "type": "string",
                "enum": ["puppy", "adult", "senior", "all"]
            },
            "size_category": {
                "type": "string",
                "enum": ["small", "medium", "large", "all"]
            },
            "reference": {
                "type": "string",
                "enum": ["cheaper", "pricier"],
                "description": "Set when the turn only compares against previous results"
            },
            "switch_pet": {
                "type": "boolean",
                "description": "True when the turn switches species with 'instead' or 'switch to'"
            }
        },
        "required": ["query"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_declares_enums() {
        let schema = extraction_schema();
        let pets = &schema["properties"]["target_pet"]["enum"];
        assert!(pets.as_array().unwrap().iter().any(|v| v == "dog"));
        assert!(pets.as_array().unwrap().iter().any(|v| v == "other"));
    }

    #[test]
    fn test_raw_extraction_tolerates_missing_fields() {
        let raw: RawExtraction = serde_json::from_str(r#"{"query": "dog food"}"#).unwrap();
        assert_eq!(raw.query.as_deref(), Some("dog food"));
        assert!(raw.dietary_exclusions.is_empty());
        assert!(raw.target_pet.is_none());
    }

    #[test]
    fn test_raw_extraction_full_payload() {
        let raw: RawExtraction = serde_json::from_str(
            r#"{
                "query": "salmon-free dog food",
                "target_pet": "dog",
                "dietary_exclusions": ["salmon"],
                "price_max": 50.0,
                "reference": null
            }"#,
        )
        .unwrap();
        assert_eq!(raw.target_pet.as_deref(), Some("dog"));
        assert_eq!(raw.dietary_exclusions, vec!["salmon"]);
        assert_eq!(raw.price_max, Some(50.0));
    }
}
