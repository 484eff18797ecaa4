use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::models::UserIdentity;

/// A signed-in user's server-side session record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: UserIdentity,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Server-side session storage addressed by opaque tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Start a session and return its token
    async fn create(&self, identity: UserIdentity) -> String;

    /// The live session for `token`; expired sessions count as absent
    async fn get(&self, token: &str) -> Option<Session>;

    /// End the session if it exists
    async fn destroy(&self, token: &str);
}

/// Longest session lifetime the store will grant (one year)
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Process-local session store
pub struct InMemorySessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    /// TTLs above [`MAX_SESSION_TTL_SECONDS`] are capped
    pub fn new(ttl_seconds: u64) -> Self {
        let ttl_seconds = ttl_seconds.min(MAX_SESSION_TTL_SECONDS) as i64;
        Self {
            ttl: Duration::seconds(ttl_seconds),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, identity: UserIdentity) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let created_at = Utc::now();
        let expires_at = created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let session = Session {
            identity,
            created_at,
            expires_at,
        };

        debug!(user_id = session.identity.user_id, "Session started");
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, existing| !existing.is_expired(created_at));
        if sessions.len() < before {
            debug!(evicted = before - sessions.len(), "Expired sessions swept");
        }
        sessions.insert(token.clone(), session);
        token
    }

    async fn get(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return None,
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                Some(_) => {}
            }
        }

        // Expired: evict under the write lock, rechecking in case it was replaced
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(token)
            .is_some_and(|session| session.is_expired(now))
        {
            sessions.remove(token);
            debug!("Expired session evicted");
        }
        None
    }

    async fn destroy(&self, token: &str) {
        if self.sessions.write().await.remove(token).is_some() {
            debug!("Session destroyed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            user_id: 1,
            username: "testuser".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemorySessionStore::new(3600);

        let token = store.create(identity()).await;
        assert_eq!(token.len(), 32);

        let session = store.get(&token).await.unwrap();
        assert_eq!(session.identity, identity());
        assert_eq!(session.expires_at - session.created_at, Duration::seconds(3600));
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = InMemorySessionStore::new(3600);

        let first = store.create(identity()).await;
        let second = store.create(identity()).await;
        assert_ne!(first, second);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let store = InMemorySessionStore::new(3600);
        assert!(store.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_evicted() {
        let store = InMemorySessionStore::new(0);

        let token = store.create(identity()).await;
        assert!(store.get(&token).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_huge_ttl_is_capped() {
        let store = InMemorySessionStore::new(10_000_000_000_000);

        let token = store.create(identity()).await;
        let session = store.get(&token).await.unwrap();
        assert_eq!(
            session.expires_at - session.created_at,
            Duration::seconds(MAX_SESSION_TTL_SECONDS as i64)
        );
    }

    #[tokio::test]
    async fn test_create_sweeps_abandoned_sessions() {
        let store = InMemorySessionStore::new(0);

        for _ in 0..1000 {
            store.create(identity()).await;
        }
        assert!(store.get("someone-else").await.is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_keeps_live_sessions() {
        let store = InMemorySessionStore::new(3600);

        let tokens: Vec<String> = create_sessions(&store, 5).await;
        assert_eq!(store.len().await, 5);
        for token in &tokens {
            assert!(store.get(token).await.is_some());
        }
    }

    async fn create_sessions(store: &InMemorySessionStore, count: usize) -> Vec<String> {
        let mut tokens = Vec::with_capacity(count);
        for _ in 0..count {
            tokens.push(store.create(identity()).await);
        }
        tokens
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let store = InMemorySessionStore::new(3600);

        let token = store.create(identity()).await;
        store.destroy(&token).await;
        store.destroy(&token).await;
        store.destroy("never-existed").await;

        assert!(store.get(&token).await.is_none());
    }
}
