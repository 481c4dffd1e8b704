//! kb_blast client library
//!
//! Typed access to the KBase `kb_blast` service, which runs BLASTn, BLASTp,
//! BLASTx, tBLASTn, tBLASTx and PSI-BLAST searches server-side. Every
//! method is one JSON-RPC call; see [`KbBlastClient`].

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod rpc;
pub mod types;

pub use auth::{AuthToken, Authenticator, HttpAuthenticator};
pub use client::KbBlastClient;
pub use config::{ClientConfig, Credentials};
pub use error::{ClientError, Result};
pub use rpc::{KbBlastMethod, RpcContext, ServerError, Transport};
pub use types::{BlastOutput, BlastParams, StatusInfo};
