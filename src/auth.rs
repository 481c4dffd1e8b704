//! Authentication
//!
//! Tokens are checked (or obtained from a user name and password) when a
//! client is constructed, so bad credentials fail before any search call is
//! made. The check is done by an [`Authenticator`]; [`HttpAuthenticator`]
//! talks to the KBase auth service.

use crate::error::{ClientError, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Default KBase auth service root
pub const DEFAULT_AUTH_URL: &str = "https://kbase.us/services/auth/";

const TOKEN_PATH: &str = "api/V2/token";
const LEGACY_LOGIN_PATH: &str = "api/legacy/KBase/Sessions/Login";

/// A validated auth token and the user it belongs to
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    token: String,
    user_name: String,
}

impl AuthToken {
    pub fn new(token: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user_name: user_name.into(),
        }
    }

    /// Raw token string, as sent in the `Authorization` header
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("token", &"<redacted>")
            .field("user_name", &self.user_name)
            .finish()
    }
}

/// Checks tokens and exchanges credentials for tokens
#[allow(async_fn_in_trait)]
pub trait Authenticator: Send + Sync {
    /// Validate a token, returning it together with its owner
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] if the token is rejected.
    async fn validate_token(&self, token: &str) -> Result<AuthToken>;

    /// Log in with a user name and password
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] if the credentials are rejected.
    async fn login(&self, user: &str, password: &str) -> Result<AuthToken>;
}

/// Authenticator backed by the KBase auth service over HTTP
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: reqwest::Client,
    auth_url: Url,
    insecure_http_allowed: bool,
}

#[derive(Deserialize)]
struct TokenInfo {
    user: String,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    user_id: String,
}

impl HttpAuthenticator {
    /// Create an authenticator for the given auth service root
    ///
    /// `trust_all_certificates` disables certificate verification, matching
    /// the setting of the service client it authenticates for. A zero
    /// timeout means no timeout.
    pub fn new(
        auth_url: Url,
        timeout: Option<Duration>,
        trust_all_certificates: bool,
    ) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(trust_all_certificates);
        if let Some(timeout) = timeout.filter(|t| !t.is_zero()) {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            auth_url: with_trailing_slash(auth_url),
            insecure_http_allowed: false,
        })
    }

    /// Allow sending tokens and passwords to a plain http auth service
    /// (default false)
    pub fn allow_insecure_http(mut self, allowed: bool) -> Self {
        self.insecure_http_allowed = allowed;
        self
    }

    pub fn is_insecure_http_allowed(&self) -> bool {
        self.insecure_http_allowed
    }

    /// Authenticator for [`DEFAULT_AUTH_URL`]
    pub fn kbase() -> Result<Self> {
        Self::new(Url::parse(DEFAULT_AUTH_URL)?, None, false)
    }

    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    /// Endpoint under the auth root, refusing plain http unless allowed
    fn endpoint(&self, path: &str) -> Result<Url> {
        if self.auth_url.scheme() == "http" && !self.insecure_http_allowed {
            return Err(ClientError::Unauthorized(
                "refusing to send credentials to the auth service over insecure http; use https or allow insecure connections"
                    .to_string(),
            ));
        }
        Ok(self.auth_url.join(path)?)
    }
}

/// `Url::join` replaces the last path segment unless the base ends in '/'
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

impl Authenticator for HttpAuthenticator {
    async fn validate_token(&self, token: &str) -> Result<AuthToken> {
        if token.trim().is_empty() {
            return Err(ClientError::Unauthorized("token is empty".to_string()));
        }

        let url = self.endpoint(TOKEN_PATH)?;
        tracing::debug!("Validating auth token against {}", url);

        let response = self
            .client
            .get(url)
            .header("Authorization", token)
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ClientError::Unauthorized("token is not valid".to_string()))
            }
            status if status.is_success() => {
                let info: TokenInfo = response.json().await?;
                tracing::info!("Authenticated as {}", info.user);
                Ok(AuthToken::new(token, info.user))
            }
            status => Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn login(&self, user: &str, password: &str) -> Result<AuthToken> {
        let url = self.endpoint(LEGACY_LOGIN_PATH)?;
        tracing::debug!("Logging in {} via {}", user, url);

        let response = self
            .client
            .post(url)
            .form(&[
                ("user_id", user),
                ("password", password),
                ("fields", "token,user_id"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized(
                format!("login failed for user {user}"),
            )),
            status if status.is_success() => {
                let login: LoginResponse = response.json().await?;
                tracing::info!("Logged in as {}", login.user_id);
                Ok(AuthToken::new(login.token, login.user_id))
            }
            status => Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}
