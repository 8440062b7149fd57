//! Intent extraction policy
//!
//! Language understanding is delegated to the external text-understanding
//! capability; everything the capability returns is re-validated here.
//! Values outside the known enumerations or vocabulary are treated as
//! absent, never trusted verbatim. Free-text inclusion/exclusion strings go
//! through the lexicon before they become canonical tags.

use std::sync::Arc;

use crate::errors::Result;
use crate::intent::{LifeStage, PartialIntent, PetType, QueryIntent, SizeCategory};
use crate::lexicon::{Lexicon, Polarity};
use crate::nlu::{RawExtraction, TextUnderstanding};

/// Extraction policy over the untrusted text-understanding capability
pub struct IntentExtractor {
    nlu: Arc<dyn TextUnderstanding>,
    lexicon: Arc<Lexicon>,
}

impl IntentExtractor {
    pub fn new(nlu: Arc<dyn TextUnderstanding>, lexicon: Arc<Lexicon>) -> Self {
        Self { nlu, lexicon }
    }

    /// Extract a partial intent for one turn. The prior resolved intent is
    /// passed to the service as conversation context only; merging is the
    /// resolver's job. Fails with `ExtractionUnavailable` when the service
    /// is down or returns an unparsable structure.
    pub async fn extract(&self, utterance: &str, prior: &QueryIntent) -> Result<PartialIntent> {
        let context = if prior.is_empty() {
            None
        } else {
            Some(prior.summary())
        };

        let raw = self.nlu.extract(utterance, context.as_deref()).await?;
        Ok(self.validate(raw, utterance))
    }

    /// Degraded-mode extraction from the pure lexicon alone. Negation and
    /// synonym handling still work without the service; numeric price
    /// bounds are lost.
    pub fn keyword_fallback(&self, utterance: &str) -> PartialIntent {
        let mut partial = PartialIntent {
            query: Some(utterance.to_string()),
            pet_type: self.lexicon.detect_pet_type(utterance),
            reference: self.lexicon.detect_reference(utterance),
            species_switch: self.lexicon.detect_species_switch(utterance),
            ..Default::default()
        };

        for token in self.lexicon.normalize(utterance) {
            match token.polarity {
                Polarity::Negative => {
                    partial.exclusions.insert(token.tag);
                }
                Polarity::Positive => {
                    partial.inclusions.insert(token.tag);
                }
            }
        }

        partial
    }

    /// Whether the utterance declares a durable pet fact worth persisting
    /// ("my dog is allergic to chicken")
    pub fn is_allergy_declaration(&self, utterance: &str) -> bool {
        self.lexicon.detect_allergy_statement(utterance)
    }

    /// Validate the untrusted extraction into a partial intent confined to
    /// the legal domain vocabulary
    fn validate(&self, raw: RawExtraction, utterance: &str) -> PartialIntent {
        let mut partial = PartialIntent::default();

        partial.pet_type = raw
            .target_pet
            .as_deref()
            .and_then(PetType::parse)
            .or_else(|| self.lexicon.detect_pet_type(utterance));

        // Free-text tag strings pass through the lexicon; the lexicon's
        // polarity wins over the service's bucket ("salmon-free" filed
        // under requirements is still an exclusion)
        for raw_tag in &raw.dietary_exclusions {
            for token in self.lexicon.normalize(raw_tag) {
                partial.exclusions.insert(token.tag);
            }
        }
        for raw_tag in &raw.dietary_requirements {
            for token in self.lexicon.normalize(raw_tag) {
                match token.polarity {
                    Polarity::Negative => partial.exclusions.insert(token.tag),
                    Polarity::Positive => partial.inclusions.insert(token.tag),
                };
            }
        }

        partial.price_min = raw.price_min.filter(|p| p.is_finite() && *p >= 0.0);
        partial.price_max = raw.price_max.filter(|p| p.is_finite() && *p >= 0.0);

        partial.brand = raw
            .brand
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());

        partial.life_stage = raw.life_stage.as_deref().and_then(LifeStage::parse);
        partial.size_category = raw.size_category.as_deref().and_then(SizeCategory::parse);

        partial.reference = match raw.reference.as_deref().map(str::trim) {
            Some("cheaper") => Some(crate::lexicon::ResultReference::Cheaper),
            Some("pricier") => Some(crate::lexicon::ResultReference::Pricier),
            _ => self.lexicon.detect_reference(utterance),
        };

        partial.species_switch = raw.switch_pet.unwrap_or(false)
            || (self.lexicon.detect_species_switch(utterance) && partial.pet_type.is_some());

        // A reference-only turn carries no new positive constraints; the
        // resolver derives a price bound from the last result set instead
        if partial.reference.is_some() && partial.has_no_constraints() {
            partial.query = None;
        } else {
            partial.query = raw
                .query
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .or_else(|| Some(utterance.to_string()));
        }

        partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AssistantError;
    use crate::lexicon::ResultReference;
    use async_trait::async_trait;

    /// Mock that returns a canned extraction, or fails when unset
    struct CannedNlu {
        response: Option<RawExtraction>,
    }

    #[async_trait]
    impl TextUnderstanding for CannedNlu {
        async fn extract(&self, _utterance: &str, _context: Option<&str>) -> Result<RawExtraction> {
            self.response
                .clone()
                .ok_or_else(|| AssistantError::ExtractionUnavailable("service down".to_string()))
        }

        async fn health_check(&self) -> bool {
            self.response.is_some()
        }
    }

    fn extractor(response: Option<RawExtraction>) -> IntentExtractor {
        IntentExtractor::new(Arc::new(CannedNlu { response }), Arc::new(Lexicon::new()))
    }

    #[tokio::test]
    async fn test_extract_validates_pet_type() {
        let raw = RawExtraction {
            query: Some("dragon food".to_string()),
            target_pet: Some("dragon".to_string()),
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("dragon food", &QueryIntent::default())
            .await
            .unwrap();

        // Out-of-enumeration value becomes absent, not passed through
        assert_eq!(partial.pet_type, None);
    }

    #[tokio::test]
    async fn test_extract_canonicalizes_exclusion_strings() {
        let raw = RawExtraction {
            query: Some("salmon-free dog food".to_string()),
            target_pet: Some("dog".to_string()),
            dietary_exclusions: vec!["salmon-free".to_string()],
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("salmon-free dog food", &QueryIntent::default())
            .await
            .unwrap();

        assert!(partial.exclusions.contains("salmon"));
        assert!(!partial.inclusions.contains("salmon"));
    }

    #[tokio::test]
    async fn test_negative_requirement_moves_to_exclusions() {
        let raw = RawExtraction {
            query: Some("grain free".to_string()),
            dietary_requirements: vec!["grain-free".to_string()],
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("grain free food", &QueryIntent::default())
            .await
            .unwrap();

        assert!(partial.exclusions.contains("grain"));
        assert!(partial.inclusions.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tags_dropped() {
        let raw = RawExtraction {
            query: Some("q".to_string()),
            dietary_exclusions: vec!["plutonium".to_string()],
            dietary_requirements: vec!["artisanal".to_string()],
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("q", &QueryIntent::default())
            .await
            .unwrap();

        assert!(partial.exclusions.is_empty());
        assert!(partial.inclusions.is_empty());
    }

    #[tokio::test]
    async fn test_reference_only_turn() {
        let raw = RawExtraction {
            query: Some("cheaper options".to_string()),
            reference: Some("cheaper".to_string()),
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("cheaper options", &QueryIntent::default())
            .await
            .unwrap();

        assert_eq!(partial.reference, Some(ResultReference::Cheaper));
        assert!(partial.has_no_constraints());
        assert_eq!(partial.query, None);
    }

    #[tokio::test]
    async fn test_invalid_reference_value_rejected() {
        let raw = RawExtraction {
            query: Some("dog food".to_string()),
            reference: Some("fancier".to_string()),
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("dog food", &QueryIntent::default())
            .await
            .unwrap();

        assert_eq!(partial.reference, None);
    }

    #[tokio::test]
    async fn test_negative_price_rejected() {
        let raw = RawExtraction {
            query: Some("dog food".to_string()),
            price_max: Some(-5.0),
            ..Default::default()
        };
        let partial = extractor(Some(raw))
            .extract("dog food", &QueryIntent::default())
            .await
            .unwrap();

        assert_eq!(partial.price_max, None);
    }

    #[tokio::test]
    async fn test_extraction_unavailable_propagates() {
        let result = extractor(None)
            .extract("salmon-free dog food", &QueryIntent::default())
            .await;

        assert!(matches!(
            result,
            Err(AssistantError::ExtractionUnavailable(_))
        ));
    }

    #[test]
    fn test_keyword_fallback_handles_negation() {
        let ex = extractor(None);
        let partial = ex.keyword_fallback("salmon-free dog food");

        assert_eq!(partial.pet_type, Some(PetType::Dog));
        assert!(partial.exclusions.contains("salmon"));
        assert!(partial.inclusions.is_empty());
        assert_eq!(partial.query.as_deref(), Some("salmon-free dog food"));
    }

    #[test]
    fn test_keyword_fallback_accumulation_phrase() {
        let ex = extractor(None);
        let partial = ex.keyword_fallback("also without chicken");

        assert!(partial.exclusions.contains("chicken"));
        assert_eq!(partial.pet_type, None);
    }

    #[test]
    fn test_allergy_declaration_detection() {
        let ex = extractor(None);
        assert!(ex.is_allergy_declaration("My dog is allergic to chicken"));
        assert!(!ex.is_allergy_declaration("chicken-free dog food"));
    }
}
