//! Session state holder and lifecycle operations.
//!
//! `SessionHandle` is the cheaply clonable shared state: the current
//! user and a readiness flag. The API client holds a clone so a failed
//! refresh can clear the in-memory user along with the stored
//! credentials. `Session` drives the lifecycle: the startup auth check,
//! login, registration, logout, and profile refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::credentials::CredentialStore;
use crate::auth::identity::IdentityClient;
use crate::config::ClientConfig;
use crate::models::{CreateUserRequest, User};

/// Shared session state: the current user and whether the startup auth
/// check has settled.
#[derive(Clone, Default)]
pub struct SessionHandle {
    inner: Arc<SessionState>,
}

#[derive(Default)]
struct SessionState {
    user: RwLock<Option<User>>,
    ready: AtomicBool,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently authenticated user, if any
    pub async fn user(&self) -> Option<User> {
        self.inner.user.read().await.clone()
    }

    /// True once the startup auth check has settled
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    pub(crate) async fn set_user(&self, user: Option<User>) {
        *self.inner.user.write().await = user;
    }

    pub(crate) async fn clear_user(&self) {
        self.set_user(None).await;
    }

    pub(crate) fn set_ready(&self) {
        self.inner.ready.store(true, Ordering::Release);
    }
}

/// The session: owns the clients and drives login, registration, logout,
/// and the startup auth check.
#[derive(Clone)]
pub struct Session {
    api: ApiClient,
    identity: IdentityClient,
    store: Arc<dyn CredentialStore>,
    handle: SessionHandle,
}

impl Session {
    /// Wire up a session against the given config and credential store
    pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let identity = IdentityClient::new(config)?;
        let handle = SessionHandle::new();
        let api = ApiClient::new(config, Arc::clone(&store), identity.clone(), handle.clone())?;

        Ok(Self {
            api,
            identity,
            store,
            handle,
        })
    }

    /// The API client sharing this session's credentials
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// A clone of the shared state, for callers that only observe
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.handle.user().await
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_ready()
    }

    /// Startup auth check: restore the session from stored credentials if
    /// possible, otherwise settle as unauthenticated. Always leaves the
    /// session ready.
    pub async fn initialize(&self) {
        if self.store.is_authenticated() {
            match self.api.get_profile().await {
                Ok(user) => {
                    info!(uid = %user.uid, "session restored from stored credentials");
                    self.handle.set_user(Some(user)).await;
                }
                Err(err) => {
                    warn!(error = %err, "startup auth check failed, clearing credentials");
                    if let Err(err) = self.store.clear() {
                        warn!(error = %err, "failed to clear credentials");
                    }
                    self.handle.clear_user().await;
                }
            }
        }
        self.handle.set_ready();
    }

    /// Authenticate with the identity provider and load the user profile
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let tokens = self.identity.sign_in(email, password).await?;
        self.store
            .save(&tokens.id_token, &tokens.refresh_token, &tokens.local_id)?;

        let user = self.api.get_profile().await?;
        info!(uid = %user.uid, "logged in");
        self.handle.set_user(Some(user.clone())).await;
        Ok(user)
    }

    /// Create an account with the identity provider and a matching
    /// backend profile
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<User, ApiError> {
        let tokens = self.identity.sign_up(email, password).await?;
        self.store
            .save(&tokens.id_token, &tokens.refresh_token, &tokens.local_id)?;

        let request = CreateUserRequest {
            username: username.to_string(),
            last_location: None,
        };
        let user = self.api.create_or_update_profile(&request).await?;
        info!(uid = %user.uid, "registered");
        self.handle.set_user(Some(user.clone())).await;
        Ok(user)
    }

    /// End the session. Idempotent: logging out while already logged out
    /// succeeds and leaves the session unauthenticated.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.store.clear()?;
        self.handle.clear_user().await;
        debug!("logged out");
        Ok(())
    }

    /// Re-fetch the profile and replace the in-memory user
    pub async fn refresh_user(&self) -> Result<User, ApiError> {
        let user = self.api.get_profile().await?;
        self.handle.set_user(Some(user.clone())).await;
        Ok(user)
    }
}
