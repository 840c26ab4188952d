//! Secure storage for the session credential triple.
//!
//! The store keeps three opaque values under fixed keys: the access
//! token, the refresh token, and the subject id. `KeyringStore` persists
//! them in the OS keychain; `MemoryStore` keeps them in-process for tests
//! and for embedders that manage persistence themselves.
//!
//! Read failures degrade to "absent" so callers probing auth state never
//! fail; write and delete failures surface as `StorageError`.

use std::sync::RwLock;

use keyring::Entry;
use thiserror::Error;
use tracing::warn;

/// Keychain service name scoping all NextFare entries
const SERVICE_NAME: &str = "nextfare";

/// Fixed keychain entry names for the credential triple
const ACCESS_TOKEN_KEY: &str = "access-token";
const REFRESH_TOKEN_KEY: &str = "refresh-token";
const SUBJECT_ID_KEY: &str = "subject-id";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to write credential: {0}")]
    Write(String),

    #[error("Failed to delete credential: {0}")]
    Delete(String),
}

/// Storage contract for the session credential triple.
///
/// Reads degrade to `None` rather than failing; mutation reports failure.
pub trait CredentialStore: Send + Sync {
    /// Persist the full credential triple. The first failed write is
    /// reported; earlier writes are not rolled back.
    fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        subject_id: &str,
    ) -> Result<(), StorageError>;

    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn subject_id(&self) -> Option<String>;

    /// Replace only the access token, keeping the refresh token and
    /// subject id. Used after a refresh exchange.
    fn update_access_token(&self, access_token: &str) -> Result<(), StorageError>;

    /// Remove all three values. Missing entries are not an error, so a
    /// second logout is harmless.
    fn clear(&self) -> Result<(), StorageError>;

    /// Presence check on the access token, not a validity check. An
    /// expired-but-present token still reports authenticated until a
    /// request proves otherwise.
    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

/// Credential store backed by the OS keychain
#[derive(Debug, Default)]
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(key: &str) -> Result<Entry, StorageError> {
        Entry::new(SERVICE_NAME, key).map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    fn read(key: &str) -> Option<String> {
        let entry = match Self::entry(key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "keychain unavailable, treating credential as absent");
                return None;
            }
        };
        match entry.get_password() {
            Ok(value) => Some(value),
            Err(keyring::Error::NoEntry) => None,
            Err(err) => {
                warn!(key, error = %err, "credential read failed, treating as absent");
                None
            }
        }
    }

    fn write(key: &str, value: &str) -> Result<(), StorageError> {
        Self::entry(key)?
            .set_password(value)
            .map_err(|e| StorageError::Write(e.to_string()))
    }

    fn delete(key: &str) -> Result<(), StorageError> {
        match Self::entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(StorageError::Delete(err.to_string())),
        }
    }
}

impl CredentialStore for KeyringStore {
    fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        subject_id: &str,
    ) -> Result<(), StorageError> {
        Self::write(ACCESS_TOKEN_KEY, access_token)?;
        Self::write(REFRESH_TOKEN_KEY, refresh_token)?;
        Self::write(SUBJECT_ID_KEY, subject_id)
    }

    fn access_token(&self) -> Option<String> {
        Self::read(ACCESS_TOKEN_KEY)
    }

    fn refresh_token(&self) -> Option<String> {
        Self::read(REFRESH_TOKEN_KEY)
    }

    fn subject_id(&self) -> Option<String> {
        Self::read(SUBJECT_ID_KEY)
    }

    fn update_access_token(&self, access_token: &str) -> Result<(), StorageError> {
        Self::write(ACCESS_TOKEN_KEY, access_token)
    }

    fn clear(&self) -> Result<(), StorageError> {
        Self::delete(ACCESS_TOKEN_KEY)?;
        Self::delete(REFRESH_TOKEN_KEY)?;
        Self::delete(SUBJECT_ID_KEY)
    }
}

#[derive(Debug, Default, Clone)]
struct StoredCredentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
    subject_id: Option<String>,
}

/// In-process credential store. Nothing is persisted; dropping the store
/// drops the session.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<StoredCredentials>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        subject_id: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StorageError::Unavailable("credential lock poisoned".to_string()))?;
        inner.access_token = Some(access_token.to_string());
        inner.refresh_token = Some(refresh_token.to_string());
        inner.subject_id = Some(subject_id.to_string());
        Ok(())
    }

    fn access_token(&self) -> Option<String> {
        self.inner.read().ok().and_then(|c| c.access_token.clone())
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.read().ok().and_then(|c| c.refresh_token.clone())
    }

    fn subject_id(&self) -> Option<String> {
        self.inner.read().ok().and_then(|c| c.subject_id.clone())
    }

    fn update_access_token(&self, access_token: &str) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StorageError::Unavailable("credential lock poisoned".to_string()))?;
        inner.access_token = Some(access_token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| StorageError::Unavailable("credential lock poisoned".to_string()))?;
        *inner = StoredCredentials::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_round_trips_all_three_values() {
        let store = MemoryStore::new();
        store.save("AT1", "RT1", "U1").expect("save failed");

        assert_eq!(store.access_token().as_deref(), Some("AT1"));
        assert_eq!(store.refresh_token().as_deref(), Some("RT1"));
        assert_eq!(store.subject_id().as_deref(), Some("U1"));
    }

    #[test]
    fn test_is_authenticated_tracks_access_token_presence() {
        let store = MemoryStore::new();
        assert!(!store.is_authenticated());

        store.save("AT1", "RT1", "U1").expect("save failed");
        assert!(store.is_authenticated());

        store.clear().expect("clear failed");
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clear_removes_all_values() {
        let store = MemoryStore::new();
        store.save("AT1", "RT1", "U1").expect("save failed");
        store.clear().expect("clear failed");

        assert!(store.access_token().is_none());
        assert!(store.refresh_token().is_none());
        assert!(store.subject_id().is_none());
    }

    #[test]
    fn test_clear_on_empty_store_is_harmless() {
        let store = MemoryStore::new();
        store.clear().expect("first clear failed");
        store.clear().expect("second clear failed");
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_update_access_token_keeps_other_values() {
        let store = MemoryStore::new();
        store.save("AT1", "RT1", "U1").expect("save failed");
        store.update_access_token("AT2").expect("update failed");

        assert_eq!(store.access_token().as_deref(), Some("AT2"));
        assert_eq!(store.refresh_token().as_deref(), Some("RT1"));
        assert_eq!(store.subject_id().as_deref(), Some("U1"));
    }
}
