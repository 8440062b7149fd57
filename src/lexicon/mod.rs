//! Domain lexicon and query normalizer
//!
//! Maps raw utterance text to canonical vocabulary tokens tagged with
//! polarity. Pure functions over in-memory tables: same input always yields
//! the same output, no I/O, no external calls.
//!
//! Negation patterns recognized: `X-free`, `X free`, `without X [or Y]`,
//! `no X [and Y]`, `excluding X`, `not X`. Synonym resolution is
//! case-insensitive and punctuation-insensitive (hyphens and spaces
//! interchangeable).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::intent::PetType;

/// Polarity of a recognized concept within an utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    /// Must be present ("with chicken", "high protein")
    Positive,
    /// Must be absent ("salmon-free", "without chicken")
    Negative,
}

/// A canonical vocabulary token extracted from raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub tag: String,
    pub polarity: Polarity,
}

impl TaggedToken {
    pub fn positive(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            polarity: Polarity::Positive,
        }
    }

    pub fn negative(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            polarity: Polarity::Negative,
        }
    }
}

/// Direction of a comparative reference to the previous result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultReference {
    /// "cheaper", "less expensive"
    Cheaper,
    /// "more expensive", "pricier", "premium"
    Pricier,
}

/// Words that open a negation scope for the concepts that follow
const NEGATION_MARKERS: &[&str] = &["without", "no", "excluding", "not"];

/// Conjunctions that extend an open negation scope ("without chicken or beef")
const SCOPE_CONJUNCTIONS: &[&str] = &["or", "and"];

/// Domain lexicon: canonical vocabulary plus many-to-one synonym table
pub struct Lexicon {
    /// normalized phrase -> canonical tag
    synonyms: HashMap<String, String>,
    /// canonical ingredient tokens (filterable against product ingredient lists)
    ingredients: HashSet<String>,
    /// canonical dietary/attribute tags (filterable against product tag sets)
    attributes: HashSet<String>,
    /// pet-type words, including life-stage words that imply a species
    pet_words: HashMap<String, PetType>,
}

impl Lexicon {
    pub fn new() -> Self {
        let mut synonyms = HashMap::new();
        for (phrase, canonical) in [
            ("hypoallergenic", "limited-ingredient"),
            ("limited ingredient", "limited-ingredient"),
            ("high protein", "high-protein"),
            ("protein rich", "high-protein"),
            ("organic", "organic"),
            ("natural", "natural"),
            ("all natural", "natural"),
            ("weight control", "weight-control"),
            ("weight management", "weight-control"),
            ("maize", "corn"),
            ("poultry", "chicken"),
            ("gluten", "wheat"),
            ("lactose", "dairy"),
            ("milk", "dairy"),
        ] {
            synonyms.insert(phrase.to_string(), canonical.to_string());
        }

        let ingredients = [
            "chicken", "beef", "salmon", "fish", "tuna", "lamb", "turkey", "duck",
            "grain", "corn", "wheat", "soy", "rice", "barley", "oat", "pea",
            "potato", "dairy", "egg",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let attributes = [
            "limited-ingredient",
            "high-protein",
            "organic",
            "natural",
            "weight-control",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut pet_words = HashMap::new();
        for (word, pet) in [
            ("dog", PetType::Dog),
            ("dogs", PetType::Dog),
            ("puppy", PetType::Dog),
            ("puppies", PetType::Dog),
            ("cat", PetType::Cat),
            ("cats", PetType::Cat),
            ("kitten", PetType::Cat),
            ("kittens", PetType::Cat),
            ("bird", PetType::Bird),
            ("birds", PetType::Bird),
            ("parrot", PetType::Bird),
            ("fish", PetType::Fish),
            ("goldfish", PetType::Fish),
        ] {
            pet_words.insert(word.to_string(), pet);
        }

        Self {
            synonyms,
            ingredients,
            attributes,
            pet_words,
        }
    }

    /// Normalize raw text into canonical tokens tagged with polarity.
    ///
    /// Unrecognized words are dropped; the raw utterance remains available
    /// to the caller as the semantic query text.
    pub fn normalize(&self, text: &str) -> Vec<TaggedToken> {
        let words = Self::tokenize(text);
        let mut tokens = Vec::new();
        let mut negating = false;

        let mut i = 0;
        while i < words.len() {
            let word = &words[i];

            // "X-free" collapses negation and concept into one token
            if let Some(stem) = word.strip_suffix("-free").filter(|s| !s.is_empty()) {
                if let Some(tag) = self.canonical_tag(stem) {
                    tokens.push(TaggedToken::negative(tag));
                }
                negating = false;
                i += 1;
                continue;
            }

            // Two-word form: "grain free"
            if i + 1 < words.len() && words[i + 1] == "free" {
                if let Some(tag) = self.canonical_tag(word) {
                    tokens.push(TaggedToken::negative(tag));
                    negating = false;
                    i += 2;
                    continue;
                }
            }

            if NEGATION_MARKERS.contains(&word.as_str()) {
                negating = true;
                i += 1;
                continue;
            }

            // Try the longest synonym match first (two words, then one)
            let (tag, consumed) = self.match_phrase(&words, i);
            if let Some(tag) = tag {
                tokens.push(if negating {
                    TaggedToken::negative(tag)
                } else {
                    TaggedToken::positive(tag)
                });
                i += consumed;
                continue;
            }

            // Conjunctions keep an open negation scope alive; anything else
            // that is not a recognized concept closes it
            if !SCOPE_CONJUNCTIONS.contains(&word.as_str()) {
                negating = false;
            }
            i += 1;
        }

        tokens
    }

    /// Resolve a raw word or phrase to its canonical tag, if in vocabulary
    pub fn canonical_tag(&self, raw: &str) -> Option<String> {
        let key = Self::normalize_key(raw);
        if let Some(canonical) = self.synonyms.get(&key) {
            return Some(canonical.clone());
        }
        // Hyphenated canonical forms look up under their space-joined key
        let hyphenated = key.replace(' ', "-");
        if self.ingredients.contains(&key) || self.attributes.contains(&hyphenated) {
            return Some(if self.attributes.contains(&hyphenated) {
                hyphenated
            } else {
                key
            });
        }
        None
    }

    /// Whether a canonical tag belongs to the known vocabulary
    pub fn is_known_tag(&self, tag: &str) -> bool {
        self.ingredients.contains(tag) || self.attributes.contains(tag)
    }

    /// Detect the first pet type mentioned in raw text
    pub fn detect_pet_type(&self, text: &str) -> Option<PetType> {
        Self::tokenize(text)
            .iter()
            .find_map(|w| self.pet_words.get(w).copied())
    }

    /// Detect a comparative reference to the previous result set
    pub fn detect_reference(&self, text: &str) -> Option<ResultReference> {
        let lowered = text.to_lowercase();
        if lowered.contains("cheaper") || lowered.contains("less expensive") {
            Some(ResultReference::Cheaper)
        } else if lowered.contains("more expensive")
            || lowered.contains("pricier")
            || lowered.contains("premium")
        {
            Some(ResultReference::Pricier)
        } else {
            None
        }
    }

    /// Detect "instead"/"switch to" phrasing that invalidates species-bound
    /// assumptions (brand, size) while dietary constraints carry over
    pub fn detect_species_switch(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        lowered.contains("instead") || lowered.contains("switch to")
    }

    /// Detect a declarative allergy statement worth persisting to the
    /// customer profile ("my dog is allergic to chicken")
    pub fn detect_allergy_statement(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        lowered.contains("allergic") || lowered.contains("can't eat") || lowered.contains("cannot eat")
    }

    fn match_phrase(&self, words: &[String], at: usize) -> (Option<String>, usize) {
        if at + 1 < words.len() {
            let bigram = format!("{} {}", words[at], words[at + 1]);
            if let Some(tag) = self.canonical_tag(&bigram) {
                return (Some(tag), 2);
            }
        }
        (self.canonical_tag(&words[at]), 1)
    }

    /// Lowercase, strip punctuation except intra-word hyphens, split on
    /// whitespace
    fn tokenize(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| c.is_whitespace() || (!c.is_alphanumeric() && c != '-' && c != '\''))
            .map(|w| w.trim_matches(|c: char| c == '-' || c == '\''))
            .filter(|w| !w.is_empty())
            .map(|w| w.to_string())
            .collect()
    }

    /// Case- and punctuation-insensitive lookup key: hyphens become spaces
    fn normalize_key(raw: &str) -> String {
        raw.to_lowercase()
            .replace('-', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}
