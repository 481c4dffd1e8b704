//! KBase JSON-RPC 1.1 Protocol Types
//!
//! KBase services speak a JSON-RPC 1.1 dialect over HTTP POST. Every call
//! carries a positional `params` array and every successful response carries
//! a `result` array, even for methods that return a single value.
//!
//! # Example request
//!
//! ```json
//! {
//!   "version": "1.1",
//!   "method": "kb_blast.BLASTn_Search",
//!   "params": [{"workspace_name": "my_ws", "input_one_sequence": "ACGT"}],
//!   "id": "4177602814239417",
//!   "context": {"service_ver": "release"}
//! }
//! ```
//!
//! # Example error response
//!
//! ```json
//! {
//!   "version": "1.1",
//!   "id": "4177602814239417",
//!   "error": {"name": "JSONRPCError", "code": -32500, "message": "...", "error": "trace"}
//! }
//! ```
//!
//! This layer only (de)serializes messages. Moving them is the transport's job.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC protocol version spoken by KBase services
pub const RPC_VERSION: &str = "1.1";

/// Remote module name all method names are qualified with
pub const SERVICE_NAME: &str = "kb_blast";

/// Context key carrying the pinned service version
pub const SERVICE_VERSION_KEY: &str = "service_ver";

/// A KBase JSON-RPC request message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcRequest {
    /// Protocol version (always "1.1")
    pub version: String,

    /// Fully qualified method name, e.g. `kb_blast.BLASTp_Search`
    pub method: String,

    /// Positional arguments
    pub params: Vec<Value>,

    /// Request identifier (random digits, echoed by the server)
    pub id: String,

    /// Call context, including the pinned service version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RpcContext>,
}

impl RpcRequest {
    /// Create a request with a fresh random identifier
    pub fn new(method: impl Into<String>, params: Vec<Value>, context: Option<RpcContext>) -> Self {
        Self::with_id(random_id(), method, params, context)
    }

    /// Create a request with an explicit identifier
    pub fn with_id(
        id: impl Into<String>,
        method: impl Into<String>,
        params: Vec<Value>,
        context: Option<RpcContext>,
    ) -> Self {
        Self {
            version: RPC_VERSION.to_string(),
            method: method.into(),
            params,
            id: id.into(),
            context,
        }
    }

    /// Service version pinned in the context, if any
    pub fn service_version(&self) -> Option<&str> {
        self.context.as_ref().and_then(RpcContext::service_version)
    }
}

fn random_id() -> String {
    // Same shape the KBase clients use: a long run of decimal digits
    rand::random::<u64>().to_string()
}

/// A KBase JSON-RPC response message
///
/// A response carries either a `result` array or an `error` object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcResponse {
    /// Protocol version echoed by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Request identifier echoed by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Result array (present on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error information (present on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServerError>,
}

impl RpcResponse {
    /// Create a successful response wrapping the given result values
    pub fn ok(id: impl Into<String>, result: Vec<Value>) -> Self {
        Self {
            version: Some(RPC_VERSION.to_string()),
            id: Some(Value::String(id.into())),
            result: Some(Value::Array(result)),
            error: None,
        }
    }

    /// Create an error response
    pub fn err(id: impl Into<String>, error: ServerError) -> Self {
        Self {
            version: Some(RPC_VERSION.to_string()),
            id: Some(Value::String(id.into())),
            result: None,
            error: Some(error),
        }
    }

    /// Check if the response is successful
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    /// Unwrap the result array, or the server error if unsuccessful
    ///
    /// An error object always wins over a result. A missing or `null`
    /// result is reported the way KBase clients report it: as an unknown
    /// server error.
    pub fn into_result(self) -> Result<Vec<Value>> {
        if let Some(error) = self.error {
            return Err(ClientError::Server(error));
        }
        match self.result {
            Some(Value::Array(values)) => Ok(values),
            None | Some(Value::Null) => Err(ClientError::Server(ServerError::unknown())),
            Some(other) => Err(ClientError::Protocol(format!(
                "expected result array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// JSON-RPC error object returned by a KBase service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerError {
    /// Error class name (usually "JSONRPCError")
    #[serde(default = "default_error_name")]
    pub name: String,

    /// Error code
    #[serde(default)]
    pub code: i64,

    /// Human-readable error message
    #[serde(default)]
    pub message: String,

    /// Server-side detail, typically a stack trace
    #[serde(
        rename = "error",
        alias = "data",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data: Option<Value>,
}

fn default_error_name() -> String {
    "JSONRPCError".to_string()
}

impl ServerError {
    /// Create a new error
    pub fn new(name: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an error carrying server-side detail
    pub fn with_data(
        name: impl Into<String>,
        code: i64,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            data: Some(data),
            ..Self::new(name, code, message)
        }
    }

    /// Error reported when a response has neither a result nor an error
    pub fn unknown() -> Self {
        Self::new("Unknown", 0, "An unknown server error occurred")
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {}] {}", self.name, self.code, self.message)
    }
}

impl std::error::Error for ServerError {}

/// Whether a remote method needs an auth token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRule {
    /// The call fails locally if no token is held
    Required,

    /// A held token is sent, but none is needed
    Optional,

    /// No token is sent
    None,
}

/// Remote methods exposed by the kb_blast service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KbBlastMethod {
    BlastnSearch,
    BlastpSearch,
    BlastxSearch,
    TblastnSearch,
    TblastxSearch,
    PsiBlastMsaStartSearch,
    Status,
}

impl KbBlastMethod {
    /// Every method, searches first
    pub const ALL: [KbBlastMethod; 7] = [
        Self::BlastnSearch,
        Self::BlastpSearch,
        Self::BlastxSearch,
        Self::TblastnSearch,
        Self::TblastxSearch,
        Self::PsiBlastMsaStartSearch,
        Self::Status,
    ];

    /// Fully qualified name for the JSON-RPC `method` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlastnSearch => "kb_blast.BLASTn_Search",
            Self::BlastpSearch => "kb_blast.BLASTp_Search",
            Self::BlastxSearch => "kb_blast.BLASTx_Search",
            Self::TblastnSearch => "kb_blast.tBLASTn_Search",
            Self::TblastxSearch => "kb_blast.tBLASTx_Search",
            Self::PsiBlastMsaStartSearch => "kb_blast.psiBLAST_msa_start_Search",
            Self::Status => "kb_blast.status",
        }
    }

    /// Auth requirement of the method
    pub fn auth_rule(&self) -> AuthRule {
        match self {
            Self::Status => AuthRule::Optional,
            _ => AuthRule::Required,
        }
    }
}

impl std::fmt::Display for KbBlastMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Call context forwarded to the service with each request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcContext {
    /// Chain of calls that led to this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_stack: Option<Vec<MethodCall>>,

    /// Identifier of the enclosing run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,

    /// Any other context keys, `service_ver` included
    #[serde(flatten)]
    pub additional_properties: Map<String, Value>,
}

impl RpcContext {
    /// Service version stored in this context
    pub fn service_version(&self) -> Option<&str> {
        self.additional_properties
            .get(SERVICE_VERSION_KEY)
            .and_then(Value::as_str)
    }

    /// Build the context sent with a request
    ///
    /// Returns `None` when there is neither a caller context nor a pinned
    /// version. A pinned version overrides one set by the caller.
    pub fn for_request(caller: Option<&RpcContext>, service_version: Option<&str>) -> Option<Self> {
        if caller.is_none() && service_version.is_none() {
            return None;
        }
        let mut context = caller.cloned().unwrap_or_default();
        if let Some(version) = service_version {
            context.additional_properties.insert(
                SERVICE_VERSION_KEY.to_string(),
                Value::String(version.to_string()),
            );
        }
        Some(context)
    }
}

/// One frame of an [`RpcContext`] call stack
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MethodCall {
    /// Timestamp of the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Fully qualified method name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Job the call ran under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}
