//! HTTP Transport
//!
//! Sends each JSON-RPC request as one HTTP POST to the service endpoint.
//!
//! # Configuration
//!
//! - **timeout**: connection/read timeout (`None` means no timeout)
//! - **insecure http**: whether a token may be sent over plain `http`
//! - **trust all certificates**: skip TLS certificate verification
//! - **streaming mode**: send the request body as a chunked stream instead
//!   of one buffered body. Many servers do not accept chunked uploads.
//!
//! KBase services answer failed calls with HTTP 500 and a JSON-RPC error
//! body, so a non-success status is only a transport error when the body
//! is not a JSON-RPC error.
//!
//! # Example
//!
//! ```ignore
//! let transport = HttpTransport::new(Url::parse("https://kbase.us/services/kb_blast")?)?
//!     .with_token(token)
//!     .with_timeout(Some(Duration::from_secs(600)))?;
//! let client = KbBlastClient::with_transport(transport);
//! ```

use crate::auth::AuthToken;
use crate::error::{ClientError, Result};
use crate::rpc::protocol::{AuthRule, RpcRequest, RpcResponse};
use crate::rpc::transport::Transport;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

/// Chunk size used for streamed request bodies
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// HTTP transport for KBase services
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Reqwest HTTP client, rebuilt when timeout or TLS trust changes
    client: reqwest::Client,

    /// Service endpoint URL
    url: Url,

    /// Token for authenticated calls
    token: Option<AuthToken>,

    timeout: Option<Duration>,
    insecure_http_allowed: bool,
    trust_all_certificates: bool,
    streaming: bool,
}

impl HttpTransport {
    /// Create an anonymous transport with no timeout and strict TLS
    pub fn new(url: Url) -> Result<Self> {
        Ok(Self {
            client: build_client(None, false)?,
            url,
            token: None,
            timeout: None,
            insecure_http_allowed: false,
            trust_all_certificates: false,
            streaming: false,
        })
    }

    /// Attach a token for authenticated calls
    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Set the timeout (builder form)
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self> {
        self.set_timeout(timeout)?;
        Ok(self)
    }

    /// Set the connection/read timeout
    ///
    /// `None` or a zero duration means no timeout.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        let timeout = timeout.filter(|t| !t.is_zero());
        self.client = build_client(timeout, self.trust_all_certificates)?;
        self.timeout = timeout;
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Allow or refuse sending a token over plain `http`
    pub fn set_insecure_http_connection_allowed(&mut self, allowed: bool) {
        self.insecure_http_allowed = allowed;
    }

    pub fn is_insecure_http_connection_allowed(&self) -> bool {
        self.insecure_http_allowed
    }

    /// Trust all TLS certificates, self-signed ones included
    pub fn set_all_ssl_certificates_trusted(&mut self, trust_all: bool) -> Result<()> {
        self.client = build_client(self.timeout, trust_all)?;
        self.trust_all_certificates = trust_all;
        Ok(())
    }

    pub fn is_all_ssl_certificates_trusted(&self) -> bool {
        self.trust_all_certificates
    }

    pub fn set_streaming_mode_on(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    pub fn is_streaming_mode_on(&self) -> bool {
        self.streaming
    }

    /// Token to send for a method with the given auth rule
    fn token_for(&self, auth: AuthRule) -> Result<Option<&AuthToken>> {
        let token = match (auth, self.token.as_ref()) {
            (AuthRule::None, _) => None,
            (AuthRule::Required, None) => {
                return Err(ClientError::Unauthorized(
                    "RPC method requires authentication but credentials were not provided"
                        .to_string(),
                ));
            }
            (_, token) => token,
        };

        if token.is_some() && self.url.scheme() == "http" && !self.insecure_http_allowed {
            return Err(ClientError::Unauthorized(
                "refusing to send an auth token over insecure http; use https or allow insecure connections"
                    .to_string(),
            ));
        }

        Ok(token)
    }
}

fn build_client(
    timeout: Option<Duration>,
    trust_all_certificates: bool,
) -> Result<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().danger_accept_invalid_certs(trust_all_certificates);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Split a serialized request into stream chunks
fn body_chunks(body: Vec<u8>) -> Vec<Bytes> {
    let body = Bytes::from(body);
    (0..body.len())
        .step_by(STREAM_CHUNK_SIZE)
        .map(|start| body.slice(start..(start + STREAM_CHUNK_SIZE).min(body.len())))
        .collect()
}

fn streaming_body(body: Vec<u8>) -> reqwest::Body {
    let chunks = body_chunks(body)
        .into_iter()
        .map(Ok::<_, std::io::Error>);
    reqwest::Body::wrap_stream(futures::stream::iter(chunks))
}

/// Interpret an HTTP status and body as a JSON-RPC response
fn decode_response(status: StatusCode, body: &str) -> Result<RpcResponse> {
    if status.is_success() {
        return Ok(serde_json::from_str(body)?);
    }

    match serde_json::from_str::<RpcResponse>(body) {
        Ok(response) if response.error.is_some() => Ok(response),
        _ => Err(ClientError::HttpStatus {
            status: status.as_u16(),
            body: body.to_string(),
        }),
    }
}

impl Transport for HttpTransport {
    async fn call(&self, request: &RpcRequest, auth: AuthRule) -> Result<RpcResponse> {
        let token = self.token_for(auth)?;
        let body = serde_json::to_vec(request)?;

        tracing::debug!(
            method = %request.method,
            bytes = body.len(),
            streaming = self.streaming,
            "Sending JSON-RPC request to {}",
            self.url
        );

        let mut http = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            http = http.header(AUTHORIZATION, token.token());
        }
        let http = if self.streaming {
            http.body(streaming_body(body))
        } else {
            http.body(body)
        };

        let http_response = http.send().await?;
        let status = http_response.status();
        let text = http_response.text().await?;

        tracing::debug!(
            method = %request.method,
            status = status.as_u16(),
            bytes = text.len(),
            "Received JSON-RPC response"
        );

        decode_response(status, &text)
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }
}
