//! Identity-provider client.
//!
//! Sign-in, sign-up, and the refresh-token exchange all go to the
//! identity provider, not the NextFare backend. The provider
//! authenticates with an API key in the query string and reports failures
//! as `{"error": {"message": "CODE"}}` payloads, which are mapped onto
//! the closed `AuthError` vocabulary.

use anyhow::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::AuthError;
use crate::config::ClientConfig;

/// Minimum password length, enforced before the provider is contacted
const MIN_PASSWORD_LENGTH: usize = 6;

/// Token triple returned by password sign-in and sign-up
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityTokens {
    #[serde(rename = "idToken")]
    pub id_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    #[serde(rename = "localId")]
    pub local_id: String,
}

/// Refresh exchange response. The provider switches to snake_case on
/// this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshedTokens {
    pub id_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
struct PasswordAuthRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'a str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Client for the identity provider.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    sign_in_url: String,
    sign_up_url: String,
    refresh_url: String,
}

impl IdentityClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            sign_in_url: format!(
                "{}/v1/accounts:signInWithPassword?key={}",
                config.identity_base_url, config.api_key
            ),
            sign_up_url: format!(
                "{}/v1/accounts:signUp?key={}",
                config.identity_base_url, config.api_key
            ),
            refresh_url: format!("{}/v1/token?key={}", config.token_base_url, config.api_key),
        })
    }

    /// Authenticate with email and password, returning the token triple
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<IdentityTokens, AuthError> {
        debug!("signing in via identity provider");
        self.password_auth(&self.sign_in_url, email, password).await
    }

    /// Create a new account. Short passwords are rejected before the
    /// provider is contacted.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<IdentityTokens, AuthError> {
        if password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword);
        }
        debug!("creating account via identity provider");
        self.password_auth(&self.sign_up_url, email, password).await
    }

    /// Exchange a refresh token for a new access token
    pub async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, AuthError> {
        debug!("exchanging refresh token");
        let response = self
            .client
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                grant_type: "refresh_token",
                refresh_token,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::parse_response(response).await
    }

    async fn password_auth(
        &self,
        url: &str,
        email: &str,
        password: &str,
    ) -> Result<IdentityTokens, AuthError> {
        let response = self
            .client
            .post(url)
            .json(&PasswordAuthRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::parse_response(response).await
    }

    fn transport_error(err: reqwest::Error) -> AuthError {
        warn!(error = %err, "identity request failed to send");
        AuthError::Network
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
        let status = response.status();
        let body = response.text().await.map_err(Self::transport_error)?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(|err| {
                warn!(error = %err, "unexpected identity response shape");
                AuthError::Unknown
            });
        }

        match serde_json::from_str::<ProviderErrorBody>(&body) {
            Ok(parsed) => Err(AuthError::from_provider_code(&parsed.error.message)),
            Err(_) => {
                warn!(%status, "unrecognized identity error payload");
                Err(AuthError::Unknown)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ClientConfig {
        let mut config = ClientConfig::new("http://unused.invalid", "test-key");
        config.identity_base_url = server.uri();
        config.token_base_url = server.uri();
        config
    }

    #[tokio::test]
    async fn test_sign_in_returns_token_triple() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "email": "user@example.com",
                "password": "hunter22",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "idToken": "AT1",
                "refreshToken": "RT1",
                "localId": "U1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let identity = IdentityClient::new(&config_for(&server)).expect("client build failed");
        let tokens = identity
            .sign_in("user@example.com", "hunter22")
            .await
            .expect("sign in failed");

        assert_eq!(tokens.id_token, "AT1");
        assert_eq!(tokens.refresh_token, "RT1");
        assert_eq!(tokens.local_id, "U1");
    }

    #[tokio::test]
    async fn test_sign_in_maps_provider_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "INVALID_LOGIN_CREDENTIALS"}
            })))
            .mount(&server)
            .await;

        let identity = IdentityClient::new(&config_for(&server)).expect("client build failed");
        let err = identity
            .sign_in("user@example.com", "wrong")
            .await
            .expect_err("expected sign in to fail");

        assert_eq!(err, AuthError::InvalidPassword);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_short_password_without_a_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let identity = IdentityClient::new(&config_for(&server)).expect("client build failed");
        let err = identity
            .sign_up("user@example.com", "abc")
            .await
            .expect_err("expected sign up to fail");

        assert_eq!(err, AuthError::WeakPassword);
    }

    #[tokio::test]
    async fn test_refresh_exchange_parses_snake_case_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .and(body_partial_json(json!({
                "grant_type": "refresh_token",
                "refresh_token": "RT1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id_token": "AT2",
                "refresh_token": "RT2"
            })))
            .mount(&server)
            .await;

        let identity = IdentityClient::new(&config_for(&server)).expect("client build failed");
        let tokens = identity
            .exchange_refresh_token("RT1")
            .await
            .expect("refresh failed");

        assert_eq!(tokens.id_token, "AT2");
        assert_eq!(tokens.refresh_token, "RT2");
    }

    #[tokio::test]
    async fn test_unrecognized_error_payload_maps_to_unknown() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/token"))
            .respond_with(ResponseTemplate::new(500).set_body_string("gateway exploded"))
            .mount(&server)
            .await;

        let identity = IdentityClient::new(&config_for(&server)).expect("client build failed");
        let err = identity
            .exchange_refresh_token("RT1")
            .await
            .expect_err("expected refresh to fail");

        assert_eq!(err, AuthError::Unknown);
    }
}
