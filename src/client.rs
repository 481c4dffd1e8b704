//! kb_blast Client
//!
//! The high-level client: one method per remote operation of the kb_blast
//! service. Each method wraps its input in a one-element argument list,
//! makes exactly one transport call, and unwraps the one-element result.
//!
//! # Usage
//!
//! ```ignore
//! use kb_blast_client::{BlastParams, KbBlastClient};
//!
//! let client = KbBlastClient::with_token("https://kbase.us/services/kb_blast", &token).await?;
//!
//! let params = BlastParams {
//!     workspace_name: Some("my_workspace".into()),
//!     input_one_sequence: Some("ATGACCGGTTACGCA".into()),
//!     input_many_refs: Some(vec!["1234/5/6".into()]),
//!     output_filtered_name: Some("blastn_hits".into()),
//!     ..Default::default()
//! };
//! let output = client.blastn_search(&params, None).await?;
//! println!("report: {:?}", output.report_ref);
//! ```

use crate::auth::{AuthToken, Authenticator, HttpAuthenticator};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::rpc::http_transport::HttpTransport;
use crate::rpc::protocol::{KbBlastMethod, RpcContext, RpcRequest};
use crate::rpc::transport::Transport;
use crate::types::{BlastOutput, BlastParams, StatusInfo};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Client for the kb_blast service
///
/// Generic over the transport so tests can swap in a mock; in normal use
/// `T` is [`HttpTransport`].
///
/// Calls are independent. Nothing is cached and nothing is retried; the
/// only state is the transport's configuration and the pinned service
/// version.
#[derive(Debug, Clone)]
pub struct KbBlastClient<T = HttpTransport>
where
    T: Transport,
{
    transport: T,
    service_version: Option<String>,
}

impl KbBlastClient<HttpTransport> {
    /// Anonymous client for the given endpoint
    ///
    /// Only `status` works without credentials.
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(Url::parse(url)?)?))
    }

    /// Client authenticated with a token
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] if the auth service rejects the
    /// token.
    pub async fn with_token(url: &str, token: &str) -> Result<Self> {
        Self::connect(ClientConfig::new(url)?.with_token(token)).await
    }

    /// Client authenticated with a user name and password
    pub async fn with_credentials(url: &str, user: &str, password: &str) -> Result<Self> {
        Self::connect(ClientConfig::new(url)?.with_login(user, password)).await
    }

    /// Client authenticated with a user name and password against a custom
    /// auth service
    pub async fn with_credentials_and_auth_url(
        url: &str,
        user: &str,
        password: &str,
        auth_url: &str,
    ) -> Result<Self> {
        let config = ClientConfig::new(url)?
            .with_login(user, password)
            .with_auth_url(auth_url)?;
        Self::connect(config).await
    }

    /// Client built from a full configuration
    ///
    /// Credentials are checked with the auth service named in the config.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let authenticator = HttpAuthenticator::new(
            config.auth_url.clone(),
            config.timeout,
            config.trust_all_certificates,
        )?
        .allow_insecure_http(config.insecure_http_allowed);
        Self::connect_with(config, &authenticator).await
    }

    /// Client built from a configuration, checking credentials with the
    /// given authenticator
    pub async fn connect_with<A: Authenticator>(
        config: ClientConfig,
        authenticator: &A,
    ) -> Result<Self> {
        let token = config.authenticate(authenticator).await?;
        let transport = config.transport(token)?;

        tracing::info!(
            "kb_blast client ready for {} ({})",
            config.url,
            transport
                .token()
                .map(|t| t.user_name())
                .unwrap_or("anonymous")
        );

        Ok(Self {
            transport,
            service_version: config.service_version,
        })
    }

    /// Set the connection/read timeout; `None` or zero means no timeout
    pub fn set_connection_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.transport.set_timeout(timeout)
    }

    pub fn is_insecure_http_connection_allowed(&self) -> bool {
        self.transport.is_insecure_http_connection_allowed()
    }

    /// Allow sending the token over plain http (default false)
    pub fn set_insecure_http_connection_allowed(&mut self, allowed: bool) {
        self.transport.set_insecure_http_connection_allowed(allowed);
    }

    pub fn is_all_ssl_certificates_trusted(&self) -> bool {
        self.transport.is_all_ssl_certificates_trusted()
    }

    /// Trust all TLS certificates, self-signed included (default false)
    pub fn set_all_ssl_certificates_trusted(&mut self, trust_all: bool) -> Result<()> {
        self.transport.set_all_ssl_certificates_trusted(trust_all)
    }

    pub fn is_streaming_mode_on(&self) -> bool {
        self.transport.is_streaming_mode_on()
    }

    /// Stream request bodies in chunks instead of buffering them
    ///
    /// Many servers are not compatible with this.
    pub fn set_streaming_mode_on(&mut self, streaming: bool) {
        self.transport.set_streaming_mode_on(streaming);
    }
}

impl<T> KbBlastClient<T>
where
    T: Transport,
{
    /// Create a client over an existing transport
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            service_version: None,
        }
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Token this client sends with authenticated calls
    pub fn token(&self) -> Option<&AuthToken> {
        self.transport.token()
    }

    /// Service endpoint
    pub fn url(&self) -> &Url {
        self.transport.url()
    }

    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    /// Pin (or unpin) the service version sent with subsequent calls
    pub fn set_service_version(&mut self, version: Option<String>) {
        self.service_version = version;
    }

    /// Run a BLASTn search (nucleotide query against nucleotide targets)
    ///
    /// Query may be a SequenceSet, Feature or FeatureSet; targets may be a
    /// SequenceSet, SingleEndLibrary, FeatureSet, Genome or GenomeSet. The
    /// saved hits are a SequenceSet when the targets are a SequenceSet, a
    /// SingleEndLibrary when they are a library, and a FeatureSet otherwise.
    pub async fn blastn_search(
        &self,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        self.search(KbBlastMethod::BlastnSearch, params, context).await
    }

    /// Run a BLASTp search (protein query against protein targets)
    pub async fn blastp_search(
        &self,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        self.search(KbBlastMethod::BlastpSearch, params, context).await
    }

    /// Run a BLASTx search (translated nucleotide query against proteins)
    pub async fn blastx_search(
        &self,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        self.search(KbBlastMethod::BlastxSearch, params, context).await
    }

    /// Run a tBLASTn search (protein query against translated nucleotides)
    pub async fn tblastn_search(
        &self,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        self.search(KbBlastMethod::TblastnSearch, params, context).await
    }

    /// Run a tBLASTx search (translated query against translated targets)
    pub async fn tblastx_search(
        &self,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        self.search(KbBlastMethod::TblastxSearch, params, context).await
    }

    /// Run a PSI-BLAST search seeded from a multiple sequence alignment
    pub async fn psi_blast_msa_start_search(
        &self,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        self.search(KbBlastMethod::PsiBlastMsaStartSearch, params, context).await
    }

    /// Fetch the service status
    pub async fn status(&self, context: Option<&RpcContext>) -> Result<StatusInfo> {
        self.call_single(KbBlastMethod::Status, Vec::new(), context).await
    }

    async fn search(
        &self,
        method: KbBlastMethod,
        params: &BlastParams,
        context: Option<&RpcContext>,
    ) -> Result<BlastOutput> {
        let args = vec![serde_json::to_value(params)?];
        self.call_single(method, args, context).await
    }

    /// Make one call and unwrap its single result value
    async fn call_single<R: DeserializeOwned>(
        &self,
        method: KbBlastMethod,
        args: Vec<Value>,
        context: Option<&RpcContext>,
    ) -> Result<R> {
        let context = RpcContext::for_request(context, self.service_version.as_deref());
        let request = RpcRequest::new(method.as_str(), args, context);

        tracing::debug!(id = %request.id, "Calling {}", method);

        let response = self.transport.call(&request, method.auth_rule()).await?;
        let result = response.into_result()?;

        let value = result.into_iter().next().ok_or_else(|| {
            ClientError::Protocol(format!("{} returned an empty result array", method))
        })?;

        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::protocol::{AuthRule, RpcResponse, ServerError};
    use serde_json::json;
    use std::sync::Mutex;

    // Mock transport recording every request it receives
    struct MockTransport {
        url: Url,
        token: Option<AuthToken>,
        calls: Mutex<Vec<(RpcRequest, AuthRule)>>,
        response: Mutex<Option<RpcResponse>>,
    }

    impl MockTransport {
        fn new() -> Self {
            Self {
                url: Url::parse("https://mock.kbase.test/kb_blast").unwrap(),
                token: Some(AuthToken::new("tok", "alice")),
                calls: Mutex::new(Vec::new()),
                response: Mutex::new(None),
            }
        }

        fn respond_with(self, response: RpcResponse) -> Self {
            *self.response.lock().unwrap() = Some(response);
            self
        }

        fn calls(&self) -> Vec<(RpcRequest, AuthRule)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        async fn call(&self, request: &RpcRequest, auth: AuthRule) -> Result<RpcResponse> {
            self.calls.lock().unwrap().push((request.clone(), auth));
            match self.response.lock().unwrap().take() {
                Some(response) => Ok(response),
                None => Ok(RpcResponse::ok(request.id.clone(), vec![json!({})])),
            }
        }

        fn url(&self) -> &Url {
            &self.url
        }

        fn token(&self) -> Option<&AuthToken> {
            self.token.as_ref()
        }
    }

    fn sample_params() -> BlastParams {
        BlastParams {
            workspace_name: Some("test_ws".to_string()),
            input_one_sequence: Some("ATGCATGCATGC".to_string()),
            input_many_refs: Some(vec!["1/2/3".to_string()]),
            output_filtered_name: Some("hits".to_string()),
            e_value: Some(0.001),
            ..Default::default()
        }
    }

    fn sample_output() -> Value {
        json!({"report_name": "blast_report", "report_ref": "1/9/1"})
    }

    #[tokio::test]
    async fn test_every_search_issues_one_call() {
        let params = sample_params();
        let searches = [
            KbBlastMethod::BlastnSearch,
            KbBlastMethod::BlastpSearch,
            KbBlastMethod::BlastxSearch,
            KbBlastMethod::TblastnSearch,
            KbBlastMethod::TblastxSearch,
            KbBlastMethod::PsiBlastMsaStartSearch,
        ];

        for method in searches {
            let transport =
                MockTransport::new().respond_with(RpcResponse::ok("1", vec![sample_output()]));
            let client = KbBlastClient::with_transport(transport);

            let output = match method {
                KbBlastMethod::BlastnSearch => client.blastn_search(&params, None).await,
                KbBlastMethod::BlastpSearch => client.blastp_search(&params, None).await,
                KbBlastMethod::BlastxSearch => client.blastx_search(&params, None).await,
                KbBlastMethod::TblastnSearch => client.tblastn_search(&params, None).await,
                KbBlastMethod::TblastxSearch => client.tblastx_search(&params, None).await,
                KbBlastMethod::PsiBlastMsaStartSearch => {
                    client.psi_blast_msa_start_search(&params, None).await
                }
                KbBlastMethod::Status => unreachable!(),
            }
            .unwrap();

            assert_eq!(output.report_ref.as_deref(), Some("1/9/1"));

            let calls = client.transport().calls();
            assert_eq!(calls.len(), 1, "{method} made more than one call");
            let (request, auth) = &calls[0];
            assert_eq!(request.method, method.as_str());
            assert_eq!(request.params, vec![serde_json::to_value(&params).unwrap()]);
            assert_eq!(*auth, AuthRule::Required);
        }
    }

    #[tokio::test]
    async fn test_status_sends_no_arguments() {
        let transport = MockTransport::new().respond_with(RpcResponse::ok(
            "1",
            vec![json!({"state": "OK", "version": "1.2.0", "git_commit_hash": "abc"})],
        ));
        let client = KbBlastClient::with_transport(transport);

        let status = client.status(None).await.unwrap();
        assert_eq!(status.get("state"), Some(&json!("OK")));
        assert_eq!(status.len(), 3);

        let calls = client.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.method, "kb_blast.status");
        assert!(calls[0].0.params.is_empty());
        assert_eq!(calls[0].1, AuthRule::Optional);
    }

    #[tokio::test]
    async fn test_service_version_passed_to_transport() {
        let mut client = KbBlastClient::with_transport(MockTransport::new());
        assert!(client.service_version().is_none());

        client.status(None).await.unwrap();
        client.set_service_version(Some("beta".to_string()));
        client.blastp_search(&sample_params(), None).await.unwrap();
        client.set_service_version(None);
        client.status(None).await.unwrap();

        let calls = client.transport().calls();
        assert_eq!(calls[0].0.service_version(), None);
        assert!(calls[0].0.context.is_none());
        assert_eq!(calls[1].0.service_version(), Some("beta"));
        assert_eq!(calls[2].0.service_version(), None);
    }

    #[tokio::test]
    async fn test_caller_context_forwarded() {
        let client = KbBlastClient::with_transport(MockTransport::new());
        let context = RpcContext {
            run_id: Some("run-42".to_string()),
            ..Default::default()
        };

        client
            .tblastx_search(&sample_params(), Some(&context))
            .await
            .unwrap();

        let calls = client.transport().calls();
        assert_eq!(calls[0].0.context.as_ref(), Some(&context));
    }

    #[tokio::test]
    async fn test_response_passes_through_unmodified() {
        let raw = json!({
            "report_name": "blast_report",
            "report_ref": "1/9/1",
            "hit_count": 17,
        });
        let transport = MockTransport::new().respond_with(RpcResponse::ok("1", vec![raw.clone()]));
        let client = KbBlastClient::with_transport(transport);

        let output = client.blastx_search(&sample_params(), None).await.unwrap();
        assert_eq!(serde_json::to_value(&output).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_server_error_surfaces_verbatim() {
        let error = ServerError::with_data(
            "JSONRPCError",
            -32500,
            "input_many_refs is required",
            json!("Traceback ..."),
        );
        let transport = MockTransport::new().respond_with(RpcResponse::err("1", error.clone()));
        let client = KbBlastClient::with_transport(transport);

        let err = client
            .tblastn_search(&sample_params(), None)
            .await
            .unwrap_err();
        match err {
            ClientError::Server(e) => assert_eq!(e, error),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_result_array_is_protocol_error() {
        let transport = MockTransport::new().respond_with(RpcResponse::ok("1", Vec::new()));
        let client = KbBlastClient::with_transport(transport);

        let err = client.blastn_search(&sample_params(), None).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(ref m) if m.contains("BLASTn_Search")));
    }

    #[tokio::test]
    async fn test_only_first_result_used() {
        let transport = MockTransport::new().respond_with(RpcResponse::ok(
            "1",
            vec![sample_output(), json!({"report_name": "second"})],
        ));
        let client = KbBlastClient::with_transport(transport);

        let output = client.blastp_search(&sample_params(), None).await.unwrap();
        assert_eq!(output.report_name.as_deref(), Some("blast_report"));
    }

    #[tokio::test]
    async fn test_mistyped_result_is_json_error() {
        let transport =
            MockTransport::new().respond_with(RpcResponse::ok("1", vec![json!("not a map")]));
        let client = KbBlastClient::with_transport(transport);

        let err = client.status(None).await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }

    #[test]
    fn test_accessors_delegate_to_transport() {
        let client = KbBlastClient::with_transport(MockTransport::new());
        assert_eq!(client.url().as_str(), "https://mock.kbase.test/kb_blast");
        assert_eq!(client.token().unwrap().user_name(), "alice");
    }

    #[test]
    fn test_anonymous_http_client() {
        let mut client = KbBlastClient::new("https://kbase.us/services/kb_blast").unwrap();
        assert!(client.token().is_none());
        assert!(!client.is_streaming_mode_on());

        client.set_streaming_mode_on(true);
        client.set_insecure_http_connection_allowed(true);
        client.set_all_ssl_certificates_trusted(true).unwrap();
        client
            .set_connection_read_timeout(Some(Duration::from_secs(90)))
            .unwrap();

        assert!(client.is_streaming_mode_on());
        assert!(client.is_insecure_http_connection_allowed());
        assert!(client.is_all_ssl_certificates_trusted());
        assert_eq!(client.transport().timeout(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            KbBlastClient::new("kb_blast"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
