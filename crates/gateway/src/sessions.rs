//! In-memory session registry.
//!
//! Each session sits behind its own `tokio::sync::Mutex`; a request holds
//! that lock for the whole turn, so one session handles one request at a
//! time while different sessions proceed independently. The registry itself
//! is only locked long enough to look a session up.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use llamachat_core::{Session, SessionError, Settings};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

pub type SharedSession = Arc<Mutex<Session>>;

struct Slot {
    session: SharedSession,
    last_used: Instant,
}

pub struct SessionStore {
    slots: RwLock<HashMap<String, Slot>>,
    max_sessions: usize,
    settings: Settings,
    greeting: String,
}

impl SessionStore {
    /// `settings` and `greeting` seed every new session.
    pub fn new(max_sessions: usize, settings: Settings, greeting: impl Into<String>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            settings,
            greeting: greeting.into(),
        }
    }

    /// Create a session, evicting the least recently used one when full.
    pub async fn create(&self) -> (String, SharedSession) {
        let session = Session::new(self.settings.clone(), self.greeting.clone());
        let id = session.id.to_string();
        let shared = Arc::new(Mutex::new(session));

        let mut slots = self.slots.write().await;
        while slots.len() >= self.max_sessions {
            let Some(oldest) = slots
                .iter()
                .min_by_key(|(_, s)| s.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            slots.remove(&oldest);
            info!(session = %oldest, "Evicted least recently used session");
        }

        slots.insert(
            id.clone(),
            Slot {
                session: shared.clone(),
                last_used: Instant::now(),
            },
        );
        info!(session = %id, active = slots.len(), "Session created");
        (id, shared)
    }

    /// Look a session up and mark it as used.
    pub async fn get(&self, id: &str) -> Result<SharedSession, SessionError> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        slot.last_used = Instant::now();
        Ok(slot.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llamachat_core::DEFAULT_GREETING;

    fn store(max: usize) -> SessionStore {
        SessionStore::new(max, Settings::default(), DEFAULT_GREETING)
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = store(4);
        let (id, _) = store.create().await;

        let session = store.get(&id).await.unwrap();
        let session = session.lock().await;
        assert_eq!(session.id.to_string(), id);
        assert_eq!(session.log.len(), 1);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let err = store(4).get("nope").await.err().unwrap();
        assert!(matches!(err, SessionError::NotFound(id) if id == "nope"));
    }

    #[tokio::test]
    async fn least_recently_used_is_evicted() {
        let store = store(2);
        let (first, _) = store.create().await;
        let (second, _) = store.create().await;

        // Touch the first so the second becomes the oldest.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.get(&first).await.unwrap();

        let (third, _) = store.create().await;
        assert_eq!(store.len().await, 2);
        assert!(store.get(&first).await.is_ok());
        assert!(store.get(&second).await.is_err());
        assert!(store.get(&third).await.is_ok());
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let store = store(4);
        let (a, _) = store.create().await;
        let (b, _) = store.create().await;

        store.get(&a).await.unwrap().lock().await.questions.push("only in a".into());

        assert!(store.get(&b).await.unwrap().lock().await.questions.is_empty());
    }
}
