//! KBase JSON-RPC plumbing
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`protocol`): JSON-RPC 1.1 message types
//! 2. **Transport Layer** (`transport`): the [`Transport`] trait
//! 3. **HTTP Transport** (`http_transport`): reqwest-backed transport
//!
//! The client facade in [`crate::client`] sits on top.

// Protocol layer: JSON-RPC 1.1 message types
pub mod protocol;

// Transport layer: abstraction over how requests reach the service
pub mod transport;

// HTTP transport for KBase services
pub mod http_transport;

pub use http_transport::HttpTransport;
pub use protocol::{
    AuthRule, KbBlastMethod, MethodCall, RpcContext, RpcRequest, RpcResponse, ServerError,
};
pub use transport::Transport;

// Property-based tests module
#[cfg(test)]
mod proptests;
