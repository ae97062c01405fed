//! Signed-in session
//!
//! Created at login, cleared at logout, handed explicitly to whatever needs
//! the user's identity. Persisted through the typed store so it survives a
//! reload until its TTL runs out.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::api::dto::AuthResponse;
use crate::models::User;
use crate::storage::{KeyValueStore, StorageKey, StorageResult, TypedStore};

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
    pub signed_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
            signed_in_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Session::new(auth.user, auth.token)
    }
}

/// Reads and writes the persisted session
pub struct SessionStore<'a, S> {
    store: &'a TypedStore<S>,
    ttl: Duration,
}

impl<'a, S: KeyValueStore> SessionStore<'a, S> {
    pub fn new(store: &'a TypedStore<S>) -> Self {
        Self::with_ttl(store, Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_ttl(store: &'a TypedStore<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn login(&self, session: &Session) -> StorageResult<()> {
        self.store
            .put_at(&StorageKey::Session, session, Some(self.ttl), session.signed_in_at)?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(())
    }

    pub fn logout(&self) -> StorageResult<()> {
        self.store.remove(&StorageKey::Session)?;
        tracing::info!("Signed out");
        Ok(())
    }

    pub fn current_at(&self, now: DateTime<Utc>) -> StorageResult<Option<Session>> {
        self.store.get_at(&StorageKey::Session, now)
    }

    pub fn current(&self) -> StorageResult<Option<Session>> {
        self.current_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::storage::MemoryStore;

    fn user() -> User {
        User {
            id: "u1".to_string(),
            name: "Amina".to_string(),
            email: "amina@example.com".to_string(),
            phone: None,
            role: Role::Customer,
        }
    }

    #[test]
    fn test_login_logout() {
        let store = TypedStore::new(MemoryStore::new());
        let sessions = SessionStore::new(&store);
        assert!(sessions.current().unwrap().is_none());

        let session = Session::new(user(), "tok");
        sessions.login(&session).unwrap();
        assert_eq!(sessions.current().unwrap(), Some(session));

        sessions.logout().unwrap();
        assert!(sessions.current().unwrap().is_none());
    }

    #[test]
    fn test_session_expires() {
        let store = TypedStore::new(MemoryStore::new());
        let sessions = SessionStore::with_ttl(&store, Duration::hours(2));

        let session = Session::new(user(), "tok");
        sessions.login(&session).unwrap();

        let later = session.signed_in_at + Duration::hours(3);
        assert!(sessions.current_at(later).unwrap().is_none());
    }

    #[test]
    fn test_from_auth_response() {
        let session: Session = AuthResponse {
            user: user(),
            token: "abc".to_string(),
        }
        .into();
        assert_eq!(session.user_id(), "u1");
        assert_eq!(session.token, "abc");
    }
}
