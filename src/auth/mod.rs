//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `CredentialStore`: the storage contract for the session credential
//!   triple, with a keyring-backed and an in-memory implementation
//! - `IdentityClient`: password sign-in, sign-up, and the refresh-token
//!   exchange against the identity provider
//! - `Session`: the in-memory session state holder and its lifecycle
//!   operations
//!
//! Tokens are persisted in the OS keychain and refreshed transparently by
//! the API client when the backend rejects one.

pub mod credentials;
pub mod error;
pub mod identity;
pub mod session;

pub use credentials::{CredentialStore, KeyringStore, MemoryStore, StorageError};
pub use error::AuthError;
pub use identity::{IdentityClient, IdentityTokens, RefreshedTokens};
pub use session::{Session, SessionHandle};
