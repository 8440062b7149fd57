//! Property tests for normalization and merge semantics

use quickcheck::{Arbitrary, Gen};
use quickcheck_macros::quickcheck;

use pawbuddy::config::ReferenceConfig;
use pawbuddy::context::ContextResolver;
use pawbuddy::intent::{PartialIntent, PetType, QueryIntent};
use pawbuddy::lexicon::Lexicon;

const TAG_POOL: &[&str] = &["chicken", "beef", "salmon", "grain", "corn", "dairy", "turkey"];

/// Generator wrapper producing partial intents over a fixed tag pool
#[derive(Debug, Clone)]
struct ArbPartial(PartialIntent);

impl Arbitrary for ArbPartial {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut partial = PartialIntent::default();

        for _ in 0..(usize::arbitrary(g) % 4) {
            let tag = TAG_POOL[usize::arbitrary(g) % TAG_POOL.len()];
            partial.inclusions.insert(tag.to_string());
        }
        for _ in 0..(usize::arbitrary(g) % 4) {
            let tag = TAG_POOL[usize::arbitrary(g) % TAG_POOL.len()];
            partial.exclusions.insert(tag.to_string());
        }

        if bool::arbitrary(g) {
            partial.pet_type = Some(if bool::arbitrary(g) {
                PetType::Dog
            } else {
                PetType::Cat
            });
        }
        if bool::arbitrary(g) {
            partial.price_min = Some(f64::from(u8::arbitrary(g)));
        }
        if bool::arbitrary(g) {
            partial.price_max = Some(f64::from(u8::arbitrary(g)));
        }
        partial.species_switch = bool::arbitrary(g);

        ArbPartial(partial)
    }
}

#[quickcheck]
fn prop_normalization_is_case_insensitive(input: String) -> bool {
    let lexicon = Lexicon::new();
    lexicon.normalize(&input) == lexicon.normalize(&input.to_uppercase())
}

#[quickcheck]
fn prop_normalization_is_deterministic(input: String) -> bool {
    let lexicon = Lexicon::new();
    lexicon.normalize(&input) == lexicon.normalize(&input)
}

#[quickcheck]
fn prop_merge_is_idempotent(partial: ArbPartial) -> bool {
    let resolver = ContextResolver::new(ReferenceConfig::default());

    let once = resolver.resolve(&QueryIntent::default(), &partial.0, &[]);
    let twice = resolver.resolve(&once, &partial.0, &[]);

    once == twice
}

#[quickcheck]
fn prop_resolved_intent_satisfies_invariants(prior: ArbPartial, partial: ArbPartial) -> bool {
    let resolver = ContextResolver::new(ReferenceConfig::default());

    let base = resolver.resolve(&QueryIntent::default(), &prior.0, &[]);
    let resolved = resolver.resolve(&base, &partial.0, &[]);

    let disjoint = resolved.inclusions.intersection(&resolved.exclusions).count() == 0;
    let ordered = match (resolved.price_min, resolved.price_max) {
        (Some(min), Some(max)) => min <= max,
        _ => true,
    };

    disjoint && ordered
}

#[quickcheck]
fn prop_exclusions_only_grow_without_opposing_inclusions(partial: ArbPartial) -> bool {
    let resolver = ContextResolver::new(ReferenceConfig::default());

    let mut prior = QueryIntent::default();
    prior.exclusions.insert("chicken".to_string());

    let resolved = resolver.resolve(&prior, &partial.0, &[]);

    // A prior exclusion survives unless this turn explicitly included the
    // tag (and did not simultaneously exclude it again)
    let flipped = partial.0.inclusions.contains("chicken") && !partial.0.exclusions.contains("chicken");
    if flipped {
        resolved.inclusions.contains("chicken") && !resolved.exclusions.contains("chicken")
    } else {
        resolved.exclusions.contains("chicken")
    }
}
