//! NextFare client core - session-aware access to the NextFare backend.
//!
//! This crate contains the non-UI core of the NextFare client:
//!
//! - [`auth`]: credential storage, the identity-provider client, and the
//!   session state holder
//! - [`api`]: the API client with transparent token refresh
//! - [`models`]: profile and event data structures
//! - [`config`]: client configuration
//!
//! The backend uses JWT bearer token authentication. Tokens are obtained
//! from the identity provider at login, persisted in the OS keychain, and
//! refreshed transparently by the request pipeline when the backend
//! rejects one.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{
    AuthError, CredentialStore, IdentityClient, IdentityTokens, KeyringStore, MemoryStore,
    RefreshedTokens, Session, SessionHandle, StorageError,
};
pub use config::ClientConfig;
pub use models::{
    CreateUserRequest, Event, GeoSearchRequest, LastLocation, UpdateLocationRequest, User,
};
