//! API client for the NextFare backend.
//!
//! Every request goes through the authenticated pipeline: the current
//! access token is attached as a bearer credential, and a 401 response
//! triggers a refresh-token exchange followed by exactly one retry of
//! the original request. The retry marker lives on the request context,
//! so a 401 on the retried attempt is surfaced rather than refreshed
//! again. The refresh exchange runs under a single-flight guard: when
//! several in-flight requests fail with 401 at once, one exchange is
//! issued and its result is shared.

use std::sync::Arc;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::{CredentialStore, IdentityClient, SessionHandle};
use crate::config::ClientConfig;
use crate::models::{CreateUserRequest, Event, GeoSearchRequest, UpdateLocationRequest, User};

use super::ApiError;

/// Default search radius for nearby events, in miles
const DEFAULT_RADIUS_MILES: f64 = 2.0;

/// One request attempt plus the state the response stage needs to decide
/// whether a 401 may still be retried.
struct RequestContext {
    method: Method,
    url: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    /// Set once the request has been re-dispatched after a refresh. A 401
    /// on a retried request is surfaced, never refreshed again.
    retried: bool,
}

impl RequestContext {
    fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }
}

/// API client for the NextFare backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection
/// pooling, and the shared session pieces are behind Arcs already.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    identity: IdentityClient,
    session: SessionHandle,
    /// Single-flight guard for the refresh exchange
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn CredentialStore>,
        identity: IdentityClient,
        session: SessionHandle,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            store,
            identity,
            session,
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }

    // ===== Profile =====

    /// Fetch the authenticated user's profile
    pub async fn get_profile(&self) -> Result<User, ApiError> {
        self.get("/api/users/profile").await
    }

    /// Create the profile on first registration, or update it
    pub async fn create_or_update_profile(
        &self,
        request: &CreateUserRequest,
    ) -> Result<User, ApiError> {
        self.post("/api/users/profile", request).await
    }

    /// Record the user's last known location. The backend answers with a
    /// plain-text receipt rather than JSON.
    pub async fn update_location(
        &self,
        location: &UpdateLocationRequest,
    ) -> Result<String, ApiError> {
        let mut ctx = RequestContext::new(Method::POST, self.url("/api/users/profile/location"));
        ctx.body = Some(Self::to_body(location)?);

        let response = self.execute(ctx).await?;
        response.text().await.map_err(ApiError::Network)
    }

    // ===== Events =====

    /// Fetch all currently active events
    pub async fn active_events(&self) -> Result<Vec<Event>, ApiError> {
        self.get("/api/events/active").await
    }

    /// Fetch active events within a radius of a point. The radius
    /// defaults to 2 miles when not given.
    pub async fn events_within_radius(
        &self,
        latitude: f64,
        longitude: f64,
        radius_miles: Option<f64>,
    ) -> Result<Vec<Event>, ApiError> {
        let radius = radius_miles.unwrap_or(DEFAULT_RADIUS_MILES);
        let mut ctx = RequestContext::new(Method::GET, self.url("/api/events/within-radius"));
        ctx.query = vec![
            ("lat".to_string(), latitude.to_string()),
            ("lng".to_string(), longitude.to_string()),
            ("radiusInMiles".to_string(), radius.to_string()),
        ];
        self.fetch_json(ctx).await
    }

    /// Fetch active events inside a bounding box.
    /// The backend reads the bounds from a JSON body on a GET request.
    pub async fn events_in_bounds(&self, bounds: &GeoSearchRequest) -> Result<Vec<Event>, ApiError> {
        let mut ctx = RequestContext::new(Method::GET, self.url("/api/events/active-in-bounds"));
        ctx.body = Some(Self::to_body(bounds)?);
        self.fetch_json(ctx).await
    }

    // ===== Pipeline =====

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.fetch_json(RequestContext::new(Method::GET, self.url(path)))
            .await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let mut ctx = RequestContext::new(Method::POST, self.url(path));
        ctx.body = Some(Self::to_body(body)?);
        self.fetch_json(ctx).await
    }

    async fn fetch_json<T: DeserializeOwned>(&self, ctx: RequestContext) -> Result<T, ApiError> {
        let url = ctx.url.clone();
        let response = self.execute(ctx).await?;
        response.json().await.map_err(|err| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, err))
        })
    }

    /// Run one request through the pipeline: attach the current access
    /// token, dispatch, and on a first 401 refresh and re-dispatch once.
    async fn execute(&self, mut ctx: RequestContext) -> Result<reqwest::Response, ApiError> {
        let mut token = self.store.access_token();
        loop {
            let response = self.dispatch(&ctx, token.as_deref()).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !ctx.retried {
                ctx.retried = true;
                debug!(url = %ctx.url, "access token rejected, attempting refresh");
                let refreshed = self.refresh_access_token(token.as_deref()).await?;
                token = Some(refreshed);
                continue;
            }

            return Self::check_response(response).await;
        }
    }

    async fn dispatch(
        &self,
        ctx: &RequestContext,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        debug!(method = %ctx.method, url = %ctx.url, retried = ctx.retried, "dispatching request");

        let mut request = self.client.request(ctx.method.clone(), &ctx.url);
        if !ctx.query.is_empty() {
            request = request.query(&ctx.query);
        }
        if let Some(ref body) = ctx.body {
            request = request.json(body);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(ApiError::Network)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Exchange the refresh token for a new access token, single-flight.
    ///
    /// `stale` is the token the caller's 401 was observed with. A caller
    /// that acquires the gate after another already refreshed sees a
    /// different stored token and reuses it without a second exchange.
    async fn refresh_access_token(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _guard = self.refresh_gate.lock().await;

        if let Some(current) = self.store.access_token() {
            if stale != Some(current.as_str()) {
                debug!("refresh already completed by a concurrent request");
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("access token rejected with no refresh token on hand, logging out");
            self.teardown_session().await;
            return Err(ApiError::Unauthorized);
        };

        match self.identity.exchange_refresh_token(&refresh_token).await {
            Ok(tokens) => {
                self.store.update_access_token(&tokens.id_token)?;
                debug!("access token refreshed");
                Ok(tokens.id_token)
            }
            Err(err) => {
                warn!(error = %err, "refresh exchange failed, logging out");
                self.teardown_session().await;
                Err(ApiError::Auth(err))
            }
        }
    }

    /// Drop the session after an unrecoverable refresh failure: clear
    /// stored credentials (best-effort) and the in-memory user.
    async fn teardown_session(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear credentials during teardown");
        }
        self.session.clear_user().await;
    }

    fn to_body<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body).map_err(|err| {
            ApiError::InvalidResponse(format!("Failed to encode request body: {}", err))
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}
