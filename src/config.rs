// Configuration
//
// `ClientConfig` is everything a `KbBlastClient` needs to reach the service.
// `Config` is the on-disk form used by the `kb-blast` binary: TOML with
// environment variable overrides, loaded from ~/.config/kb-blast/config.toml.

use crate::auth::{AuthToken, Authenticator, DEFAULT_AUTH_URL};
use crate::error::Result;
use crate::rpc::http_transport::HttpTransport;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default kb_blast endpoint
pub const DEFAULT_SERVICE_URL: &str = "https://kbase.us/services/kb_blast";

/// How the client identifies itself to the service
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Anonymous; only methods without an auth requirement will work
    #[default]
    None,

    /// A token to be validated with the auth service
    Token(String),

    /// A user name and password to exchange for a token
    Login { user: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::Login { user, .. } => f
                .debug_struct("Login")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Connection settings for a kb_blast client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service endpoint
    pub url: Url,

    pub credentials: Credentials,

    /// Auth service root used to check credentials
    pub auth_url: Url,

    /// Connection/read timeout; `None` waits forever
    pub timeout: Option<Duration>,

    /// Allow sending a token or password over plain http
    pub insecure_http_allowed: bool,

    /// Accept any TLS certificate, self-signed included
    pub trust_all_certificates: bool,

    /// Stream request bodies in chunks
    pub streaming: bool,

    /// Service version pinned in every call's context
    pub service_version: Option<String>,
}

impl ClientConfig {
    /// Anonymous configuration for the given endpoint
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: Url::parse(url)?,
            credentials: Credentials::None,
            auth_url: Url::parse(DEFAULT_AUTH_URL)?,
            timeout: None,
            insecure_http_allowed: false,
            trust_all_certificates: false,
            streaming: false,
            service_version: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Credentials::Token(token.into());
        self
    }

    pub fn with_login(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials::Login {
            user: user.into(),
            password: password.into(),
        };
        self
    }

    pub fn with_auth_url(mut self, auth_url: &str) -> Result<Self> {
        self.auth_url = Url::parse(auth_url)?;
        Ok(self)
    }

    /// Set the timeout; zero means no timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout.filter(|t| !t.is_zero());
        self
    }

    pub fn allow_insecure_http(mut self, allowed: bool) -> Self {
        self.insecure_http_allowed = allowed;
        self
    }

    pub fn trust_all_certificates(mut self, trust_all: bool) -> Self {
        self.trust_all_certificates = trust_all;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_service_version(mut self, version: Option<String>) -> Self {
        self.service_version = version;
        self
    }

    /// Turn the credentials into a validated token
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`](crate::ClientError::Unauthorized)
    /// if the authenticator rejects the token or the login.
    pub async fn authenticate<A: Authenticator>(
        &self,
        authenticator: &A,
    ) -> Result<Option<AuthToken>> {
        match &self.credentials {
            Credentials::None => Ok(None),
            Credentials::Token(token) => authenticator.validate_token(token).await.map(Some),
            Credentials::Login { user, password } => {
                authenticator.login(user, password).await.map(Some)
            }
        }
    }

    /// Build the HTTP transport described by this configuration
    pub fn transport(&self, token: Option<AuthToken>) -> Result<HttpTransport> {
        let mut transport = HttpTransport::new(self.url.clone())?.with_timeout(self.timeout)?;
        transport.set_insecure_http_connection_allowed(self.insecure_http_allowed);
        transport.set_all_ssl_certificates_trusted(self.trust_all_certificates)?;
        transport.set_streaming_mode_on(self.streaming);
        Ok(match token {
            Some(token) => transport.with_token(token),
            None => transport,
        })
    }
}

/// On-disk configuration for the `kb-blast` binary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Service connection settings
    pub service: ServiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Service connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub url: String,
    pub auth_url: String,
    pub service_version: Option<String>,

    /// Timeout in seconds; absent or 0 means no timeout
    pub timeout_secs: Option<u64>,

    pub insecure_http: bool,
    pub trust_all_certificates: bool,
    pub streaming: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SERVICE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            service_version: None,
            timeout_secs: None,
            insecure_http: false,
            trust_all_certificates: false,
            streaming: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default config directory
    ///
    /// A missing file yields the defaults (with environment overrides).
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration file path
    ///
    /// Returns `~/.config/kb-blast/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("us", "kbase", "kb-blast") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home)
                .join(".config")
                .join("kb-blast")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides
    ///
    /// - KB_BLAST_URL
    /// - KB_AUTH_SERVICE_URL
    /// - KB_BLAST_SERVICE_VERSION
    /// - KB_BLAST_TIMEOUT_SECS
    /// - KB_BLAST_LOG_LEVEL
    /// - KB_BLAST_LOG_FORMAT
    fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup("KB_BLAST_URL") {
            self.service.url = url;
        }
        if let Some(auth_url) = lookup("KB_AUTH_SERVICE_URL") {
            self.service.auth_url = auth_url;
        }
        if let Some(version) = lookup("KB_BLAST_SERVICE_VERSION") {
            self.service.service_version = Some(version).filter(|v| !v.is_empty());
        }
        if let Some(timeout) = lookup("KB_BLAST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.service.timeout_secs = Some(timeout);
            }
        }
        if let Some(level) = lookup("KB_BLAST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("KB_BLAST_LOG_FORMAT") {
            self.logging.format = format;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        Url::parse(&self.service.url)
            .with_context(|| format!("Invalid service url: {}", self.service.url))?;
        Url::parse(&self.service.auth_url)
            .with_context(|| format!("Invalid auth service url: {}", self.service.auth_url))?;

        Ok(())
    }

    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.logging
            .level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }

    /// Client configuration with the given credentials
    pub fn client_config(&self, credentials: Credentials) -> anyhow::Result<ClientConfig> {
        let config = ClientConfig::new(&self.service.url)?
            .with_auth_url(&self.service.auth_url)?
            .with_timeout(self.service.timeout_secs.map(Duration::from_secs))
            .allow_insecure_http(self.service.insecure_http)
            .trust_all_certificates(self.service.trust_all_certificates)
            .with_streaming(self.service.streaming)
            .with_service_version(self.service.service_version.clone());
        Ok(ClientConfig {
            credentials,
            ..config
        })
    }
}
