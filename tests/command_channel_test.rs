//! Command-channel integration tests
//!
//! Exercise the one-shot WebSocket round trip against the mock target
//! endpoint, including the deliberately preserved unordered semantics.

mod common;

use common::MockDevtools;
use std::sync::atomic::Ordering;
use std::time::Duration;
use stealthdriver::cdp::{CdpSession, CommandChannel};
use stealthdriver::Error;

async fn connected_session() -> (MockDevtools, CdpSession) {
    let server = MockDevtools::start().await.unwrap();
    server.state.seed_target("tab-1", "page");

    let session = CdpSession::new(server.debugger_address());
    session.connect().await.unwrap();
    (server, session)
}

#[tokio::test]
async fn test_command_ids_increase_by_one_from_one() {
    let (_server, session) = connected_session().await;

    // The mock echoes the request id back, so the response exposes it
    for expected in 1..=3u64 {
        let response = session
            .send("Page.enable", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(response["id"], expected);
    }
}

#[tokio::test]
async fn test_send_carries_method_and_params() {
    let (_server, session) = connected_session().await;

    let response = session
        .send(
            "Page.navigate",
            serde_json::json!({ "url": "https://example.com" }),
        )
        .await
        .unwrap();

    assert_eq!(response["result"]["method"], "Page.navigate");
}

#[tokio::test]
async fn test_first_frame_wins_even_with_mismatched_id() {
    let (server, session) = connected_session().await;
    server.state.ws_mismatch_id.store(true, Ordering::SeqCst);

    // One-shot semantics: the first frame is returned as-is, with no attempt
    // to correlate its id against the command's own.
    let response = session
        .send("Page.enable", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(response["id"], 999_999);
}

#[tokio::test]
async fn test_malformed_response_is_protocol_error() {
    let (server, session) = connected_session().await;
    server.state.ws_malformed.store(true, Ordering::SeqCst);

    let result = session.send("Page.enable", serde_json::json!({})).await;
    assert!(matches!(result, Err(Error::Protocol(_))));
}

#[tokio::test]
async fn test_send_without_cached_endpoint_is_transport_error() {
    let server = MockDevtools::start().await.unwrap();
    let session = CdpSession::new(server.debugger_address());

    // Never connected or activated: there is no endpoint to dial
    let result = session.send("Page.enable", serde_json::json!({})).await;
    assert!(matches!(result, Err(Error::Transport(_))));
}

#[tokio::test]
async fn test_send_with_timeout_bounds_a_stalled_server() {
    let (server, session) = connected_session().await;
    server.state.ws_stall.store(true, Ordering::SeqCst);

    let result = session
        .send_with_timeout(
            "Page.enable",
            serde_json::json!({}),
            Duration::from_millis(200),
        )
        .await;
    assert!(matches!(result, Err(Error::Timeout(_))));
}

#[tokio::test]
async fn test_ids_keep_increasing_after_failures() {
    let (server, session) = connected_session().await;

    let first = session
        .send("Page.enable", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(first["id"], 1);

    // A failed round trip still consumes its id; ids are never reused
    server.state.ws_malformed.store(true, Ordering::SeqCst);
    let _ = session.send("Page.enable", serde_json::json!({})).await;
    server.state.ws_malformed.store(false, Ordering::SeqCst);

    let third = session
        .send("Page.enable", serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(third["id"], 3);
}
