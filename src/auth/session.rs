//! Session persistence and soft-expiry state.
//!
//! # Responsibilities
//! - Persist the auth record and the soft/hard expiry flags under fixed keys
//! - Broadcast every mutation so all subscribers re-read consistently
//!
//! # Design Decisions
//! - Storage is a trait so hosts can plug in disk- or keychain-backed stores;
//!   the in-memory default covers tests and single-process apps
//! - Reads are eventually consistent across subscribers; the broadcast is a
//!   change notification, not a transaction

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;

/// Storage key for the serialized auth record.
pub const AUTH_RECORD_KEY: &str = "usage.auth.record";
/// Storage key for the soft session-expiry flag.
pub const SOFT_EXPIRED_KEY: &str = "usage.session.soft_expired";
/// Storage key for the hard session-expiry flag (set at sign-out).
pub const HARD_EXPIRED_KEY: &str = "usage.session.expired";

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Key-value storage abstraction for session state.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory storage, the default backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Session mutation broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The soft-expiry flag changed.
    SoftExpiryChanged(bool),
    /// The hard-expiry flag was set.
    HardExpired,
    /// The serialized auth record changed.
    AuthRecordChanged,
}

/// Session store: persistence plus in-process change broadcast.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: Box<dyn SessionStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { storage, events }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::<MemoryStorage>::default())
    }

    /// Subscribe to session mutations.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_soft_expired(&self) -> bool {
        self.storage
            .get(SOFT_EXPIRED_KEY)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Mark the session soft-expired: token likely stale, skip refresh
    /// attempts until sign-in.
    pub fn mark_soft_expired(&self) {
        if !self.is_soft_expired() {
            self.storage.set(SOFT_EXPIRED_KEY, "true");
            tracing::info!("session marked soft-expired");
            let _ = self.events.send(SessionEvent::SoftExpiryChanged(true));
        }
    }

    /// Clear soft-expiry after a successful authenticated call.
    pub fn clear_soft_expired(&self) {
        if self.is_soft_expired() {
            self.storage.remove(SOFT_EXPIRED_KEY);
            let _ = self.events.send(SessionEvent::SoftExpiryChanged(false));
        }
    }

    pub fn mark_hard_expired(&self) {
        self.storage.set(HARD_EXPIRED_KEY, "true");
        let _ = self.events.send(SessionEvent::HardExpired);
    }

    pub fn auth_record(&self) -> Option<String> {
        self.storage.get(AUTH_RECORD_KEY)
    }

    pub fn set_auth_record(&self, record: &str) {
        self.storage.set(AUTH_RECORD_KEY, record);
        let _ = self.events.send(SessionEvent::AuthRecordChanged);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("soft_expired", &self.is_soft_expired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_expiry_round_trip() {
        let store = SessionStore::in_memory();
        assert!(!store.is_soft_expired());
        store.mark_soft_expired();
        assert!(store.is_soft_expired());
        store.clear_soft_expired();
        assert!(!store.is_soft_expired());
    }

    #[tokio::test]
    async fn test_mutations_broadcast() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();
        store.mark_soft_expired();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SoftExpiryChanged(true));
        store.clear_soft_expired();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SoftExpiryChanged(false));
    }

    #[tokio::test]
    async fn test_auth_record_and_hard_expiry_broadcast() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();
        store.set_auth_record(r#"{"access_token":"a.b.c"}"#);
        assert_eq!(store.auth_record().as_deref(), Some(r#"{"access_token":"a.b.c"}"#));
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::AuthRecordChanged);
        store.mark_hard_expired();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::HardExpired);
    }

    #[tokio::test]
    async fn test_redundant_marks_do_not_rebroadcast() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();
        store.mark_soft_expired();
        store.mark_soft_expired();
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::SoftExpiryChanged(true));
        assert!(rx.try_recv().is_err());
    }
}
