//! JSON-RPC Transport Layer
//!
//! A transport moves one [`RpcRequest`] to the service and brings back its
//! [`RpcResponse`]. It owns the endpoint and the credentials; the client
//! facade only decides which method to call and with what arguments.
//!
//! [`HttpTransport`](crate::rpc::http_transport::HttpTransport) is the
//! production transport. Tests plug in their own implementations.

use crate::auth::AuthToken;
use crate::error::Result;
use crate::rpc::protocol::{AuthRule, RpcRequest, RpcResponse};
use url::Url;

/// Transport trait for KBase JSON-RPC communication
#[allow(async_fn_in_trait)]
pub trait Transport: Send + Sync {
    /// Perform one request/response exchange
    ///
    /// # Arguments
    ///
    /// * `request` - The request to send
    /// * `auth` - Whether the method needs the held token
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing for a method that
    /// requires them, or if the exchange fails at the network or
    /// envelope level. A JSON-RPC error object is *not* an error here: it
    /// comes back inside the response.
    async fn call(&self, request: &RpcRequest, auth: AuthRule) -> Result<RpcResponse>;

    /// Service endpoint
    fn url(&self) -> &Url;

    /// Token sent with authenticated calls
    fn token(&self) -> Option<&AuthToken>;
}
