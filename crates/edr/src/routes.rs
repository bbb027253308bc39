// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! HTTP routes served by the runtime.
//!
//! | Method | Path | Body |
//! |---|---|---|
//! | POST | `/trace` | `{"txHash": "0x..."}` |
//! | any | `/debug` | [`DebugRequest`] |
//! | POST | `/hardhat` | [`HardhatRequest`] |
//! | GET | `/health` | none |
//!
//! Bodies are decoded from the raw bytes, whatever the content type says.

use alloy_primitives::{hex, TxHash, B256};
use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    routing::{any, get, post},
    Json, Router,
};
use edr_common::TraceResult;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::{
    chain::Chain, debug::DebugRequest, error::EdrError, hardhat::HardhatRequest, runtime::Edr,
};

/// Body of a `/trace` request
#[derive(Debug, Default, Deserialize)]
struct TraceRequest {
    #[serde(rename = "txHash", default)]
    tx_hash: String,
}

/// Build the router serving `edr`
pub fn router<C: Chain>(edr: Edr<C>) -> Router {
    Router::new()
        .route("/trace", post(handle_trace::<C>).fallback(method_not_allowed))
        .route("/debug", any(handle_debug::<C>))
        .route("/hardhat", post(handle_hardhat::<C>).fallback(method_not_allowed))
        .route("/health", get(handle_health::<C>))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .with_state(edr)
}

/// Convert a hex string into a transaction hash.
///
/// The `0x` prefix is optional, odd-length input gets a leading zero, and the
/// result keeps the rightmost 32 bytes, left-padded with zeros.
pub fn hex_to_hash(input: &str) -> Result<TxHash, EdrError> {
    let digits = input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")).unwrap_or(input);
    if digits.starts_with("0x") || digits.starts_with("0X") {
        return Err(EdrError::InvalidRequest(format!(
            "invalid transaction hash {input:?}: repeated 0x prefix"
        )));
    }

    let bytes = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    }
    .map_err(|err| EdrError::InvalidRequest(format!("invalid transaction hash {input:?}: {err}")))?;

    Ok(B256::left_padding_from(&bytes[bytes.len().saturating_sub(32)..]))
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, EdrError> {
    serde_json::from_slice(body).map_err(|err| EdrError::InvalidRequest(err.to_string()))
}

async fn method_not_allowed() -> EdrError {
    EdrError::MethodNotAllowed
}

async fn handle_trace<C: Chain>(
    State(edr): State<Edr<C>>,
    body: Bytes,
) -> Result<Json<TraceResult>, EdrError> {
    let request: TraceRequest = decode_body(&body).inspect_err(|err| {
        warn!(%err, "Rejected trace request");
    })?;
    let hash = hex_to_hash(&request.tx_hash)?;

    let trace = edr.trace_transaction(hash).await.inspect_err(|err| {
        warn!(%hash, %err, "Trace failed");
    })?;
    Ok(Json(trace))
}

async fn handle_debug<C: Chain>(
    State(edr): State<Edr<C>>,
    method: Method,
    body: Bytes,
) -> Result<Json<TraceResult>, EdrError> {
    let request = if method == Method::POST && !body.is_empty() {
        Some(decode_body::<DebugRequest>(&body)?)
    } else {
        None
    };

    edr.debug(request).await.map(Json)
}

async fn handle_hardhat<C: Chain>(
    State(edr): State<Edr<C>>,
    body: Bytes,
) -> Result<Json<Value>, EdrError> {
    let request: HardhatRequest = decode_body(&body)?;

    let result = match request {
        HardhatRequest::Mine { blocks } => edr.mine(blocks).await,
        HardhatRequest::SetNextBlockTimestamp { timestamp } => {
            edr.set_next_block_timestamp(timestamp).await
        }
    };
    result.inspect_err(|err| warn!(?request, %err, "Hardhat request failed"))?;

    Ok(Json(json!({ "success": true })))
}

async fn handle_health<C: Chain>(State(edr): State<Edr<C>>) -> Json<Value> {
    Json(edr.health().status(edr.settings()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ChainConfig,
        runtime::CloseApp,
        test_utils::{sample_trace, MockChain},
    };
    use alloy_primitives::b256;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(cfg: ChainConfig) -> (Router, Arc<MockChain>) {
        edr_common::logging::ensure_test_logging(None);
        let chain = Arc::new(MockChain::new(cfg.clone()));
        (router(Edr::new(None, CloseApp::noop(), cfg, Arc::clone(&chain))), chain)
    }

    fn tracing_config() -> ChainConfig {
        ChainConfig { port: 8080, tracer_enabled: true, ..Default::default() }
    }

    async fn send(app: Router, method: Method, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::from(body.to_string()))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_hex_to_hash() {
        let full = b256!("0xc403cced1cf53cbeb72475be7271b731f846e91fcbd7b43f120b8bbd60d5473e");

        assert_eq!(
            hex_to_hash("0xc403cced1cf53cbeb72475be7271b731f846e91fcbd7b43f120b8bbd60d5473e")
                .unwrap(),
            full
        );
        assert_eq!(
            hex_to_hash("C403CCED1CF53CBEB72475BE7271B731F846E91FCBD7B43F120B8BBD60D5473E")
                .unwrap(),
            full
        );
        assert_eq!(hex_to_hash("0xabc").unwrap(), TxHash::left_padding_from(&[0x0a, 0xbc]));
        assert_eq!(hex_to_hash("0X01").unwrap(), TxHash::with_last_byte(1));
        assert_eq!(hex_to_hash("").unwrap(), TxHash::ZERO);
        assert_eq!(hex_to_hash("0x").unwrap(), TxHash::ZERO);
    }

    #[test]
    fn test_hex_to_hash_keeps_rightmost_bytes() {
        let long = format!("0xffff{}", "11".repeat(32));
        assert_eq!(hex_to_hash(&long).unwrap(), B256::repeat_byte(0x11));
    }

    #[test]
    fn test_hex_to_hash_rejects_non_hex() {
        let err = hex_to_hash("0xnothex").unwrap_err();
        assert!(matches!(err, EdrError::InvalidRequest(_)));
    }

    #[test]
    fn test_hex_to_hash_rejects_repeated_prefix() {
        for input in ["0x0x01", "0x0x1", "0X0x01", "0x0Xabcd"] {
            assert!(
                matches!(hex_to_hash(input), Err(EdrError::InvalidRequest(_))),
                "{input} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_method_on_debug() {
        let (app, _) = app(tracing_config());

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/debug")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "PUT")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["access-control-allow-methods"], "*");
    }

    #[tokio::test]
    async fn test_debug_transaction_request_not_implemented() {
        let (app, chain) = app(tracing_config());

        let response = send(
            app,
            Method::POST,
            "/debug",
            r#"{"kind":"transaction","txHash":"0x0000000000000000000000000000000000000000000000000000000000000abc"}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(chain.trace_calls(), 0);
    }

    #[tokio::test]
    async fn test_trace_returns_tree() {
        let (app, chain) = app(tracing_config());

        let response = send(app, Method::POST, "/trace", r#"{"txHash":"0xabc"}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        let trace: TraceResult = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(trace, sample_trace());
        assert!(trace.trace_address.is_empty());
        assert_eq!(trace.subtraces.len(), 2);
        assert_eq!(trace.subtraces[0].trace_address, vec![0]);
        assert_eq!(trace.subtraces[1].trace_address, vec![1]);
        assert_eq!(chain.last_hash(), Some(TxHash::left_padding_from(&[0x0a, 0xbc])));
    }

    #[tokio::test]
    async fn test_trace_missing_hash_uses_zero() {
        let (app, chain) = app(tracing_config());

        let response = send(app, Method::POST, "/trace", "{}").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(chain.last_hash(), Some(TxHash::ZERO));
    }

    #[tokio::test]
    async fn test_trace_rejects_other_methods() {
        for method in [Method::GET, Method::PUT, Method::DELETE, Method::PATCH] {
            let (app, chain) = app(tracing_config());

            let response = send(app, method.clone(), "/trace", "").await;

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(body_text(response).await, "Method not allowed");
            assert_eq!(chain.trace_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_trace_rejects_malformed_json() {
        for body in ["", "{", "not json", r#"{"txHash": 12}"#, "[1, 2]"] {
            let (app, chain) = app(tracing_config());

            let response = send(app, Method::POST, "/trace", body).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(chain.trace_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_trace_rejects_invalid_hex() {
        for hash in ["0xzz", "0x0x01", "0x0x1"] {
            let (app, chain) = app(tracing_config());
            let body = json!({ "txHash": hash }).to_string();

            let response = send(app, Method::POST, "/trace", &body).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{hash}");
            assert_eq!(chain.trace_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_trace_disabled() {
        let (app, chain) = app(ChainConfig::default());

        let response = send(app, Method::POST, "/trace", r#"{"txHash":"0x01"}"#).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "tracing not enabled");
        assert_eq!(chain.trace_calls(), 0);
    }

    #[tokio::test]
    async fn test_trace_chain_error_passes_through() {
        let cfg = tracing_config();
        let chain = Arc::new(MockChain::failing(cfg.clone(), "transaction not found"));
        let app = router(Edr::new(None, CloseApp::noop(), cfg, chain));

        let response = send(app, Method::POST, "/trace", r#"{"txHash":"0x01"}"#).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "transaction not found");
    }

    #[tokio::test]
    async fn test_debug_not_implemented() {
        for (method, body) in [
            (Method::GET, ""),
            (Method::POST, ""),
            (Method::POST, r#"{"kind":"block","number":7}"#),
            (Method::PUT, "anything"),
        ] {
            let (app, _) = app(tracing_config());

            let response = send(app, method.clone(), "/debug", body).await;

            assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED, "{method} {body}");
            assert_eq!(body_text(response).await, "not implemented");
        }
    }

    #[tokio::test]
    async fn test_debug_rejects_malformed_post() {
        let (app, _) = app(tracing_config());

        let response = send(app, Method::POST, "/debug", r#"{"kind":"planet"}"#).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_hardhat_mine() {
        let (app, chain) = app(ChainConfig { hardhat_mode: true, ..Default::default() });

        let response = send(app, Method::POST, "/hardhat", r#"{"method":"mine","blocks":2}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"success":true}"#);
        assert_eq!(chain.mine_calls(), 1);
        assert_eq!(chain.last_blocks(), Some(2));
    }

    #[tokio::test]
    async fn test_hardhat_set_timestamp() {
        let (app, chain) = app(ChainConfig { hardhat_mode: true, ..Default::default() });

        let response = send(
            app,
            Method::POST,
            "/hardhat",
            r#"{"method":"setNextBlockTimestamp","timestamp":1700000000}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(chain.timestamp_calls(), 1);
        assert_eq!(chain.last_timestamp(), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_hardhat_mine_defaults_to_one_block() {
        let (app, chain) = app(ChainConfig { hardhat_mode: true, ..Default::default() });

        let response = send(app, Method::POST, "/hardhat", r#"{"method":"mine"}"#).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(chain.last_blocks(), Some(1));
        assert_eq!(chain.last_timestamp(), None);
    }

    #[tokio::test]
    async fn test_hardhat_errors() {
        let (disabled, chain) = app(ChainConfig::default());
        let response =
            send(disabled, Method::POST, "/hardhat", r#"{"method":"mine","blocks":1}"#).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "hardhat mode not enabled");
        assert_eq!(chain.mine_calls(), 0);

        let (enabled, _) = app(ChainConfig { hardhat_mode: true, ..Default::default() });
        let response = send(enabled.clone(), Method::GET, "/hardhat", "").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = send(enabled, Method::POST, "/hardhat", r#"{"method":"reset"}"#).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(tracing_config());

        let response = send(app, Method::GET, "/health", "").await;

        assert_eq!(response.status(), StatusCode::OK);
        let status: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(status["status"], "ok");
        assert_eq!(status["tracer_enabled"], true);
    }
}
