//! PawBuddy - Conversational Pet-Product Search
//!
//! Turns natural-language pet-product queries into filtered, ranked results
//! across multi-turn conversations.
//!
//! # Architecture
//!
//! - **lexicon**: pure normalizer for negation and synonyms
//! - **intent**: structured intent types + extraction policy over the
//!   external text-understanding capability
//! - **context**: per-session merge and reference resolution
//! - **search**: hybrid retrieval (semantic similarity + hard filters)
//! - **session / profile**: short-term conversation state and durable
//!   customer preferences

pub mod errors;
pub mod config;
pub mod lexicon;
pub mod intent;
pub mod nlu;
pub mod context;
pub mod search;
pub mod catalog;
pub mod session;
pub mod profile;
pub mod assistant;
pub mod cli;
pub mod repl;

// Re-export commonly used types
pub use assistant::{Assistant, DegradedMode, TurnResponse, TurnTrace};
pub use errors::{AssistantError, Result};
pub use intent::{PartialIntent, PetType, QueryIntent};
