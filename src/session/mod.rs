//! Per-conversation session state
//!
//! Owns each conversation's append-only turn history, the current resolved
//! intent, and the most recent ranked result set. The store serializes
//! calls for the same session while calls for different sessions never
//! block one another. The interface is async so a networked key-value store
//! can back it without changing the contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::errors::Result;
use crate::intent::QueryIntent;
use crate::search::RankedProduct;

/// One completed turn: utterance, the intent it resolved to, the results
/// it produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub utterance: String,
    pub resolved_intent: QueryIntent,
    pub results: Vec<RankedProduct>,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of a session's current state, as seen at turn start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_intent: QueryIntent,
    pub last_results: Vec<RankedProduct>,
    pub turn_count: usize,
}

/// Full per-session state, owned by the store
#[derive(Debug, Default)]
struct SessionState {
    history: Vec<TurnRecord>,
    current_intent: QueryIntent,
    last_results: Vec<RankedProduct>,
}

/// Session store contract
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current state for a session; `None` if the session has no turns yet
    async fn get(&self, session_id: &str) -> Option<SessionSnapshot>;

    /// Append a completed turn, advancing the current intent and results
    async fn append_turn(&self, session_id: &str, record: TurnRecord) -> Result<()>;

    /// Full turn history, oldest first
    async fn history(&self, session_id: &str) -> Vec<TurnRecord>;

    /// Drop all state for a session
    async fn reset(&self, session_id: &str);
}

/// In-memory store for a single process. Each session sits behind its own
/// lock, so concurrent turns on different sessions proceed independently;
/// concurrent turns on one session serialize (they are a caller error the
/// store need not reconcile, only order).
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn session(&self, session_id: &str) -> Arc<Mutex<SessionState>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(state) = sessions.get(session_id) {
                return Arc::clone(state);
            }
        }

        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(SessionState::default()))),
        )
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: &str) -> Option<SessionSnapshot> {
        let state = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).cloned()
        }?;

        let state = state.lock().await;
        if state.history.is_empty() {
            return None;
        }

        Some(SessionSnapshot {
            current_intent: state.current_intent.clone(),
            last_results: state.last_results.clone(),
            turn_count: state.history.len(),
        })
    }

    async fn append_turn(&self, session_id: &str, record: TurnRecord) -> Result<()> {
        let state = self.session(session_id).await;
        let mut state = state.lock().await;

        state.current_intent = record.resolved_intent.clone();
        state.last_results = record.results.clone();
        state.history.push(record);
        Ok(())
    }

    async fn history(&self, session_id: &str) -> Vec<TurnRecord> {
        let state = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).cloned()
        };

        match state {
            Some(state) => state.lock().await.history.clone(),
            None => Vec::new(),
        }
    }

    async fn reset(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::PetType;

    fn record(utterance: &str, pet: PetType) -> TurnRecord {
        TurnRecord {
            utterance: utterance.to_string(),
            resolved_intent: QueryIntent {
                pet_type: Some(pet),
                ..Default::default()
            },
            results: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_get_empty_session() {
        let store = InMemorySessionStore::new();
        assert!(store.get("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_append_advances_current_state() {
        let store = InMemorySessionStore::new();

        store.append_turn("s1", record("dog food", PetType::Dog)).await.unwrap();
        store.append_turn("s1", record("for cats instead", PetType::Cat)).await.unwrap();

        let snapshot = store.get("s1").await.unwrap();
        assert_eq!(snapshot.turn_count, 2);
        assert_eq!(snapshot.current_intent.pet_type, Some(PetType::Cat));
    }

    #[tokio::test]
    async fn test_history_is_append_only_ordered() {
        let store = InMemorySessionStore::new();

        store.append_turn("s1", record("first", PetType::Dog)).await.unwrap();
        store.append_turn("s1", record("second", PetType::Dog)).await.unwrap();

        let history = store.history("s1").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].utterance, "first");
        assert_eq!(history[1].utterance, "second");
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = InMemorySessionStore::new();

        store.append_turn("a", record("dog food", PetType::Dog)).await.unwrap();
        store.append_turn("b", record("cat food", PetType::Cat)).await.unwrap();

        assert_eq!(store.get("a").await.unwrap().current_intent.pet_type, Some(PetType::Dog));
        assert_eq!(store.get("b").await.unwrap().current_intent.pet_type, Some(PetType::Cat));
    }

    #[tokio::test]
    async fn test_reset_destroys_session() {
        let store = InMemorySessionStore::new();

        store.append_turn("s1", record("dog food", PetType::Dog)).await.unwrap();
        store.reset("s1").await;

        assert!(store.get("s1").await.is_none());
        assert!(store.history("s1").await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_on_different_sessions() {
        let store = Arc::new(InMemorySessionStore::new());

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let id = format!("session-{}", i);
                for turn in 0..5 {
                    store
                        .append_turn(&id, record(&format!("turn {}", turn), PetType::Dog))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for i in 0..8 {
            let id = format!("session-{}", i);
            assert_eq!(store.get(&id).await.unwrap().turn_count, 5);
        }
    }
}
