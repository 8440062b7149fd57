//! Structured query intent types
//!
//! `QueryIntent` is the resolved, per-turn value object the retriever
//! consumes. `PartialIntent` is one turn's extraction output: every scalar
//! field is optional, where `None` means "this turn said nothing about this
//! field", distinct from an explicit value. That distinction is what makes
//! merging exhaustive.
//!
//! Invariants enforced on every resolved intent:
//! - inclusions and exclusions are disjoint (newer exclusion wins)
//! - price_min <= price_max when both present (newer bound wins)

pub mod extractor;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::lexicon::ResultReference;

/// Target species for a product query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetType {
    Dog,
    Cat,
    Bird,
    Fish,
    Other,
}

impl PetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dog => "dog",
            Self::Cat => "cat",
            Self::Bird => "bird",
            Self::Fish => "fish",
            Self::Other => "other",
        }
    }

    /// Parse a value returned by the text-understanding service. Anything
    /// outside the legal enumeration is rejected as absent.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "dog" => Some(Self::Dog),
            "cat" => Some(Self::Cat),
            "bird" => Some(Self::Bird),
            "fish" => Some(Self::Fish),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Life stage of the target pet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeStage {
    Puppy,
    Adult,
    Senior,
    All,
}

impl LifeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Puppy => "puppy",
            Self::Adult => "adult",
            Self::Senior => "senior",
            Self::All => "all",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "puppy" | "kitten" => Some(Self::Puppy),
            "adult" => Some(Self::Adult),
            "senior" => Some(Self::Senior),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Size category (mainly meaningful for dogs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
    All,
}

impl SizeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::All => "all",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// Resolved query intent for one conversation turn. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub pet_type: Option<PetType>,
    /// Canonical tags that must be present
    pub inclusions: BTreeSet<String>,
    /// Canonical tags that must be absent
    pub exclusions: BTreeSet<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub brand: Option<String>,
    pub life_stage: Option<LifeStage>,
    pub size_category: Option<SizeCategory>,
    /// Free-text semantic remainder used to build the similarity query
    pub query: Option<String>,
}

impl QueryIntent {
    /// Enforce the data-model invariants, whichever merge path produced the
    /// intent. Returns a description of each repair made, for defect logging.
    pub fn enforce_invariants(&mut self) -> Vec<String> {
        let mut repairs = Vec::new();

        // Exclusion wins: more recent, more specific
        let conflicting: Vec<String> = self
            .inclusions
            .intersection(&self.exclusions)
            .cloned()
            .collect();
        for tag in conflicting {
            self.inclusions.remove(&tag);
            repairs.push(format!("dropped inclusion '{}' conflicting with exclusion", tag));
        }

        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                // The newer bound replaced the older one upstream; if both
                // survive inverted, keep the tighter upper bound
                self.price_min = None;
                repairs.push(format!("dropped price_min {} above price_max {}", min, max));
            }
        }

        repairs
    }

    /// Whether the intent carries any constraint at all
    pub fn is_empty(&self) -> bool {
        self.pet_type.is_none()
            && self.inclusions.is_empty()
            && self.exclusions.is_empty()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.brand.is_none()
            && self.life_stage.is_none()
            && self.size_category.is_none()
            && self.query.is_none()
    }

    /// Compact single-line summary for display and logs
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(pet) = self.pet_type {
            parts.push(format!("pet: {}", pet.as_str()));
        }
        if !self.inclusions.is_empty() {
            parts.push(format!(
                "with: {}",
                self.inclusions.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !self.exclusions.is_empty() {
            parts.push(format!(
                "excluding: {}",
                self.exclusions.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        match (self.price_min, self.price_max) {
            (Some(min), Some(max)) => parts.push(format!("price: ${:.2}-${:.2}", min, max)),
            (Some(min), None) => parts.push(format!("price: over ${:.2}", min)),
            (None, Some(max)) => parts.push(format!("price: under ${:.2}", max)),
            (None, None) => {}
        }
        if let Some(brand) = &self.brand {
            parts.push(format!("brand: {}", brand));
        }
        if let Some(stage) = self.life_stage {
            parts.push(format!("life stage: {}", stage.as_str()));
        }
        if let Some(size) = self.size_category {
            parts.push(format!("size: {}", size.as_str()));
        }
        if parts.is_empty() {
            "no active filters".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// One turn's extraction output. Same shape as `QueryIntent` but every field
/// may be absent; set fields use empty-means-absent since merging is
/// accumulative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialIntent {
    pub pet_type: Option<PetType>,
    pub inclusions: BTreeSet<String>,
    pub exclusions: BTreeSet<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub brand: Option<String>,
    pub life_stage: Option<LifeStage>,
    pub size_category: Option<SizeCategory>,
    pub query: Option<String>,
    /// This turn compares against the previous result set instead of
    /// introducing new constraints
    pub reference: Option<ResultReference>,
    /// "instead"/"switch to" phrasing on the pet type: invalidates brand and
    /// size assumptions while dietary constraints carry over
    pub species_switch: bool,
}

impl PartialIntent {
    /// Whether the turn introduced no constraints beyond a possible reference
    pub fn has_no_constraints(&self) -> bool {
        self.pet_type.is_none()
            && self.inclusions.is_empty()
            && self.exclusions.is_empty()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && self.brand.is_none()
            && self.life_stage.is_none()
            && self.size_category.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pet_type_parse_rejects_unknown() {
        assert_eq!(PetType::parse("dog"), Some(PetType::Dog));
        assert_eq!(PetType::parse("DOG"), Some(PetType::Dog));
        assert_eq!(PetType::parse("dragon"), None);
        assert_eq!(PetType::parse(""), None);
    }

    #[test]
    fn test_life_stage_parse() {
        assert_eq!(LifeStage::parse("puppy"), Some(LifeStage::Puppy));
        assert_eq!(LifeStage::parse("kitten"), Some(LifeStage::Puppy));
        assert_eq!(LifeStage::parse("geriatric"), None);
    }

    #[test]
    fn test_invariant_exclusion_wins() {
        let mut intent = QueryIntent::default();
        intent.inclusions.insert("chicken".to_string());
        intent.exclusions.insert("chicken".to_string());

        let repairs = intent.enforce_invariants();

        assert_eq!(repairs.len(), 1);
        assert!(!intent.inclusions.contains("chicken"));
        assert!(intent.exclusions.contains("chicken"));
    }

    #[test]
    fn test_invariant_price_ordering() {
        let mut intent = QueryIntent {
            price_min: Some(50.0),
            price_max: Some(20.0),
            ..Default::default()
        };

        let repairs = intent.enforce_invariants();

        assert_eq!(repairs.len(), 1);
        assert_eq!(intent.price_min, None);
        assert_eq!(intent.price_max, Some(20.0));
    }

    #[test]
    fn test_invariants_hold_no_repairs() {
        let mut intent = QueryIntent {
            price_min: Some(10.0),
            price_max: Some(20.0),
            ..Default::default()
        };
        intent.inclusions.insert("salmon".to_string());
        intent.exclusions.insert("chicken".to_string());

        assert!(intent.enforce_invariants().is_empty());
    }

    #[test]
    fn test_summary_renders_filters() {
        let mut intent = QueryIntent::default();
        intent.pet_type = Some(PetType::Dog);
        intent.exclusions.insert("salmon".to_string());
        intent.price_max = Some(50.0);

        let summary = intent.summary();
        assert!(summary.contains("dog"));
        assert!(summary.contains("salmon"));
        assert!(summary.contains("under $50.00"));
    }

    #[test]
    fn test_partial_has_no_constraints() {
        let partial = PartialIntent {
            reference: Some(ResultReference::Cheaper),
            query: Some("cheaper options".to_string()),
            ..Default::default()
        };
        assert!(partial.has_no_constraints());
    }
}
