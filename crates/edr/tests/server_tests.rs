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

//! End-to-end tests over a real socket

use std::{sync::Arc, time::Duration};

use edr::{
    test_utils::{local_config, MockChain},
    ChainConfig, CloseApp, Edr, EdrError, TraceResult,
};
use serde_json::{json, Value};

async fn started(cfg: ChainConfig) -> (Edr<MockChain>, Arc<MockChain>, String) {
    started_with(MockChain::new(cfg.clone()), cfg).await
}

#[tokio::test]
async fn test_trace_over_http() {
    let (edr, chain, base) =
        started(ChainConfig { tracer_enabled: true, ..local_config() }).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/trace"))
        .body(r#"{"txHash":"0xabc"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let trace: TraceResult = response.json().await.unwrap();
    assert_eq!(trace.subtraces.len(), chain.trace().subtraces.len());
    assert!(trace.trace_address.is_empty());
    assert_eq!(trace.subtraces[1].trace_address, vec![1]);

    edr.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_gates_over_http() {
    let (edr, chain, base) = started(local_config()).await;
    let client = reqwest::Client::new();

    let response = client.get(format!("{base}/trace")).send().await.unwrap();
    assert_eq!(response.status(), 405);

    let response = client
        .post(format!("{base}/trace"))
        .json(&json!({ "txHash": "0x01" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(response.text().await.unwrap(), "tracing not enabled");

    let response = client
        .post(format!("{base}/hardhat"))
        .json(&json!({ "method": "mine" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    let response = client.get(format!("{base}/debug")).send().await.unwrap();
    assert_eq!(response.status(), 501);

    assert_eq!(chain.trace_calls(), 0);
    assert_eq!(chain.mine_calls(), 0);

    edr.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_health_over_http() {
    let (edr, _, base) = started(local_config()).await;

    let status: Value =
        reqwest::get(format!("{base}/health")).await.unwrap().json().await.unwrap();

    assert_eq!(status["status"], "ok");
    assert_eq!(status["service"], "edr");

    edr.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_requests() {
    let (edr, chain, base) =
        started(ChainConfig { tracer_enabled: true, ..local_config() }).await;
    let client = reqwest::Client::new();

    let requests = (0..16u8).map(|i| {
        let client = client.clone();
        let url = format!("{base}/trace");
        async move {
            client.post(url).json(&json!({ "txHash": format!("0x{i:02x}") })).send().await
        }
    });

    for response in futures::future::join_all(requests).await {
        assert_eq!(response.unwrap().status(), 200);
    }
    assert_eq!(chain.trace_calls(), 16);

    edr.stop(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn test_stop_closes_listener() {
    let (edr, _, base) = started(local_config()).await;

    edr.stop(Duration::from_secs(5)).await.unwrap();

    assert!(reqwest::get(format!("{base}/health")).await.is_err());
    assert!(matches!(edr.stop(Duration::from_secs(5)).await, Err(EdrError::AlreadyStopped)));
    assert!(matches!(edr.start().await, Err(EdrError::AlreadyStopped)));
}

#[tokio::test]
async fn test_bind_conflict_reaches_close_app() {
    let (first, _, _) = started(local_config()).await;
    let port = first.local_addr().await.unwrap().port();

    let cfg = ChainConfig { port, ..local_config() };
    let (close_app, mut fatal) = CloseApp::channel();
    let second = Edr::new(None, close_app, cfg.clone(), Arc::new(MockChain::new(cfg)));

    assert!(matches!(second.start().await, Err(EdrError::Bind { .. })));
    let cause = fatal.recv().await.unwrap();
    assert!(cause.to_string().contains("failed to bind"));

    first.stop(Duration::from_secs(5)).await.unwrap();
}

async fn started_with(
    chain: MockChain,
    cfg: ChainConfig,
) -> (Edr<MockChain>, Arc<MockChain>, String) {
    edr_common::logging::ensure_test_logging(None);
    let chain = Arc::new(chain);
    let edr = Edr::new(None, CloseApp::noop(), cfg, Arc::clone(&chain));
    edr.start().await.unwrap();
    let base = format!("http://{}", edr.local_addr().await.unwrap());
    (edr, chain, base)
}

async fn wait_for_trace_call(chain: &MockChain) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while chain.trace_calls() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_stop_drains_in_flight_request() {
    let cfg = ChainConfig { tracer_enabled: true, ..local_config() };
    let slow = MockChain::new(cfg.clone()).with_delay(Duration::from_millis(500));
    let (edr, chain, base) = started_with(slow, cfg).await;

    let in_flight = tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("{base}/trace"))
            .json(&json!({ "txHash": "0x01" }))
            .send()
            .await
    });
    wait_for_trace_call(&chain).await;

    edr.stop(Duration::from_secs(5)).await.unwrap();

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), 200);
    let trace: TraceResult = response.json().await.unwrap();
    assert_eq!(trace, chain.trace());
    assert!(!edr.is_running().await);
}

#[tokio::test]
async fn test_stop_times_out_on_stuck_request() {
    let cfg = ChainConfig { tracer_enabled: true, ..local_config() };
    let stuck = MockChain::new(cfg.clone()).with_delay(Duration::from_secs(5));
    let (edr, chain, base) = started_with(stuck, cfg).await;

    let in_flight = tokio::spawn(async move {
        reqwest::Client::new()
            .post(format!("{base}/trace"))
            .json(&json!({ "txHash": "0x01" }))
            .send()
            .await
    });
    wait_for_trace_call(&chain).await;

    let deadline = Duration::from_millis(200);
    let started_at = std::time::Instant::now();
    let err = edr.stop(deadline).await.unwrap_err();

    assert!(matches!(err, EdrError::ShutdownTimeout(d) if d == deadline));
    assert!(started_at.elapsed() < Duration::from_secs(2));
    assert!(matches!(edr.stop(deadline).await, Err(EdrError::AlreadyStopped)));
    in_flight.abort();
}
