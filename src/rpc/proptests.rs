//! Property-Based Tests for the kb_blast client
//!
//! - **Pass-through**: whatever params a caller hands to a search method
//!   reach the transport unchanged, and whatever the transport returns
//!   reaches the caller unchanged
//! - **Envelope**: any error object wins over a result

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use std::sync::Mutex;
use url::Url;

use crate::auth::AuthToken;
use crate::client::KbBlastClient;
use crate::error::{ClientError, Result};
use crate::rpc::protocol::{AuthRule, RpcRequest, RpcResponse, ServerError};
use crate::rpc::transport::Transport;
use crate::types::BlastParams;

// Echoes a canned result and keeps the last request
struct EchoTransport {
    url: Url,
    result: Value,
    last: Mutex<Option<RpcRequest>>,
}

impl Transport for EchoTransport {
    async fn call(&self, request: &RpcRequest, _auth: AuthRule) -> Result<RpcResponse> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(RpcResponse::ok(request.id.clone(), vec![self.result.clone()]))
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn token(&self) -> Option<&AuthToken> {
        None
    }
}

// Helper: Generate arbitrary JSON scalars
fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ]
}

// Helper: Generate extra schema keys that do not collide with known fields
fn arb_extra() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map("x_[a-z]{1,8}", arb_scalar(), 0..4)
        .prop_map(|m| m.into_iter().collect())
}

fn arb_params() -> impl Strategy<Value = BlastParams> {
    (
        prop::option::of("[a-zA-Z0-9_]{1,16}"),
        prop::option::of("[ACGTN]{0,64}"),
        prop::option::of(prop::collection::vec("[0-9]{1,4}/[0-9]{1,3}/[0-9]{1,2}", 0..4)),
        prop::option::of(0.0f64..100.0),
        prop::option::of(1u32..20),
        arb_extra(),
    )
        .prop_map(
            |(workspace_name, sequence, many_refs, ident, rounds, extra)| BlastParams {
                workspace_name,
                input_one_sequence: sequence,
                input_many_refs: many_refs,
                ident_thresh: ident,
                rounds: rounds.map(serde_json::Number::from),
                additional_properties: extra,
                ..Default::default()
            },
        )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

proptest! {
    /// Params reach the transport exactly as the caller serialized them
    #[test]
    fn prop_params_pass_through(params in arb_params(), version in prop::option::of("[a-z]{1,8}")) {
        let mut client = KbBlastClient::with_transport(EchoTransport {
            url: Url::parse("https://mock.kbase.test/kb_blast").unwrap(),
            result: json!({}),
            last: Mutex::new(None),
        });
        client.set_service_version(version.clone());

        runtime().block_on(client.blastn_search(&params, None)).unwrap();

        let sent = client.transport().last.lock().unwrap().take().unwrap();
        prop_assert_eq!(sent.params.len(), 1);
        prop_assert_eq!(&sent.params[0], &serde_json::to_value(&params).unwrap());
        prop_assert_eq!(sent.service_version(), version.as_deref());

        let decoded: BlastParams = serde_json::from_value(sent.params[0].clone()).unwrap();
        prop_assert_eq!(decoded, params);
    }

    /// Results reach the caller exactly as the transport returned them
    #[test]
    fn prop_status_result_pass_through(extra in arb_extra()) {
        let result = Value::Object(extra.clone());
        let client = KbBlastClient::with_transport(EchoTransport {
            url: Url::parse("https://mock.kbase.test/kb_blast").unwrap(),
            result,
            last: Mutex::new(None),
        });

        let status = runtime().block_on(client.status(None)).unwrap();
        prop_assert_eq!(status, extra);
    }

    /// An error object always wins over a result
    #[test]
    fn prop_error_wins(code in any::<i64>(), message in ".*", result in arb_scalar()) {
        let response = RpcResponse {
            version: None,
            id: None,
            result: Some(Value::Array(vec![result])),
            error: Some(ServerError::new("JSONRPCError", code, message.clone())),
        };
        match response.into_result() {
            Err(ClientError::Server(e)) => {
                prop_assert_eq!(e.code, code);
                prop_assert_eq!(e.message, message);
            }
            other => prop_assert!(false, "unexpected: {:?}", other),
        }
    }
}
