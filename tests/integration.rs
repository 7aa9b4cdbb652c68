use anyhow::{ensure, Result};
use axum::{body::Body, http::Request};
use geo_attendance::create_router;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

mod common;
use common::{on_campus_submission, spawn_wallet_node, TestServer, CAMPUS, WALLET};

#[tokio::test]
#[serial]
async fn basic_integration_test() {
    // ---
    common::setup_test_env().await;
    let _router = create_router().await.expect("Should be able to create router");
}

#[tokio::test]
#[serial]
async fn health_endpoint_works_without_a_listener() -> Result<()> {
    // ---
    common::setup_test_env().await;
    let app = create_router().await?;

    let response = app
        .oneshot(Request::builder().uri("/health?mode=full").body(Body::empty())?)
        .await?;

    ensure!(response.status() == 200, "unexpected status {}", response.status());
    Ok(())
}

#[tokio::test]
#[serial]
async fn root_endpoint_lists_routes() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);

    let body = response.text().await.expect("Failed to read response body");
    assert!(body.contains("/attendance"));
    assert!(body.contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
#[serial]
async fn subjects_catalog_is_served() -> Result<()> {
    // ---
    let server = TestServer::new().await;

    let body: Value = server.client.get(server.url("/subjects")).send().await?.json().await?;
    let subjects = body["data"].as_array().expect("subjects should be a list");

    assert_eq!(subjects.len(), 12);
    assert_eq!(subjects[0], json!({"value": "math-101", "label": "Calculus I"}));
    Ok(())
}

#[tokio::test]
#[serial]
async fn key_has_date_prefix_and_is_stable() -> Result<()> {
    // ---
    let server = TestServer::new().await;

    let body: Value = server.client.get(server.url("/key")).send().await?.json().await?;
    let value = body["data"]["value"].as_str().unwrap_or_default();
    let issued_on = body["data"]["issuedOn"].as_str().unwrap_or_default();

    assert_eq!(body["data"]["scope"], "session");
    assert_eq!(value.len(), "YYYYMMDD-XXXXX".len());
    assert!(value.starts_with(&issued_on.replace('-', "")));
    assert_eq!(server.current_key().await, value);
    Ok(())
}

#[tokio::test]
#[serial]
async fn full_check_in_flow() -> Result<()> {
    // ---
    let server = TestServer::new().await;
    let key = server.current_key().await;

    let response = server
        .client
        .post(server.url("/attendance"))
        .json(&on_campus_submission(&key))
        .send()
        .await?;
    assert_eq!(response.status(), 201);

    let receipt: Value = response.json().await?;
    let record = &receipt["data"]["record"];
    assert_eq!(record["subject"], "cs-101");
    assert_eq!(record["walletAddress"], WALLET);
    assert_eq!(record["password"], key.as_str());
    assert_eq!(receipt["data"]["subjectLabel"], "Intro to Computer Science");
    let message = receipt["data"]["message"].as_str().unwrap_or_default();
    assert!(message.starts_with("Attendance for Intro to Computer Science at "));
    assert!(message.ends_with(" marked successfully."));

    let id = record["id"].as_str().expect("record should have an id").to_string();

    let log: Value = server.client.get(server.url("/attendance")).send().await?.json().await?;
    let entries = log["data"].as_array().expect("log should be a list");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["id"], id.as_str());
    assert_eq!(entries[0]["subjectLabel"], "Intro to Computer Science");
    assert!(entries[0]["displayTime"].is_string());

    let response = server
        .client
        .delete(server.url(&format!("/attendance/{id}")))
        .send()
        .await?;
    assert_eq!(response.status(), 204);

    let response = server
        .client
        .delete(server.url(&format!("/attendance/{id}")))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
#[serial]
async fn newest_record_is_listed_first() -> Result<()> {
    // ---
    let server = TestServer::new().await;
    let key = server.current_key().await;

    for subject in ["math-101", "ee-201"] {
        let mut body = on_campus_submission(&key);
        body["subject"] = json!(subject);
        let response = server.client.post(server.url("/attendance")).json(&body).send().await?;
        assert_eq!(response.status(), 201);
    }

    let log: Value = server.client.get(server.url("/attendance")).send().await?.json().await?;
    assert_eq!(log["data"][0]["subject"], "ee-201");
    assert_eq!(log["data"][1]["subject"], "math-101");
    Ok(())
}

#[tokio::test]
#[serial]
async fn wrong_key_is_rejected_without_a_record() -> Result<()> {
    // ---
    let server = TestServer::new().await;
    let key = server.current_key().await;

    let response = server
        .client
        .post(server.url("/attendance"))
        .json(&on_campus_submission(&format!(" {key}")))
        .send()
        .await?;
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "KEY_MISMATCH");

    let log: Value = server.client.get(server.url("/attendance")).send().await?.json().await?;
    assert_eq!(log["data"], json!([]));
    Ok(())
}

#[tokio::test]
#[serial]
async fn first_failing_check_is_reported() -> Result<()> {
    // ---
    let server = TestServer::new().await;

    // No wallet, no location, no subject, no key: the wallet check comes first.
    let response = server.client.post(server.url("/attendance")).json(&json!({})).send().await?;
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "WALLET_NOT_FOUND");

    let response = server
        .client
        .post(server.url("/attendance"))
        .json(&json!({"walletAddress": WALLET}))
        .send()
        .await?;
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "LOCATION_MISSING");

    let response = server
        .client
        .post(server.url("/attendance"))
        .json(&json!({
            "walletAddress": WALLET,
            "location": {"error": "permission-denied"}
        }))
        .send()
        .await?;
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "LOCATION_PERMISSION_DENIED");
    Ok(())
}

#[tokio::test]
#[serial]
async fn location_verify_reports_distance() -> Result<()> {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/location/verify"))
        .json(&json!({"location": {"latitude": CAMPUS.0, "longitude": CAMPUS.1}}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["data"]["accepted"], true);
    assert_eq!(body["data"]["distanceKm"], 0.0);
    assert_eq!(body["data"]["latitude"], CAMPUS.0);

    let response = server
        .client
        .post(server.url("/location/verify"))
        .json(&json!({"location": {"latitude": 31.0, "longitude": 78.0}}))
        .send()
        .await?;
    assert_eq!(response.status(), 403);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "OUT_OF_RANGE");
    let error = body["error"].as_str().unwrap_or_default();
    assert!(error.contains("km away"), "unexpected message: {error}");
    Ok(())
}

#[tokio::test]
#[serial]
async fn wallet_connect_without_provider_fails() -> Result<()> {
    // ---
    let server = TestServer::new().await;

    let response = server.client.post(server.url("/wallet/connect")).send().await?;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "WALLET_NOT_FOUND");
    Ok(())
}

#[tokio::test]
#[serial]
async fn connected_wallet_signs_later_check_ins() -> Result<()> {
    // ---
    let accounts = Arc::new(Mutex::new(vec![WALLET.to_string()]));
    let mut config = common::test_config().await;
    config.wallet.rpc_url = Some(spawn_wallet_node(accounts.clone()).await);
    config.wallet.poll_interval = Duration::from_millis(50);
    let server = TestServer::with_config(config).await;

    let response = server.client.post(server.url("/wallet/connect")).send().await?;
    assert_eq!(response.status(), 200);
    let status: Value = response.json().await?;
    assert_eq!(status["data"]["account"], WALLET);
    assert_eq!(status["data"]["chainId"], "0x1");
    assert_eq!(status["data"]["balance"], "1.5000");

    // The connected address is used when the request carries none.
    let key = server.current_key().await;
    let mut body = on_campus_submission(&key);
    body["walletAddress"] = Value::Null;
    let response = server.client.post(server.url("/attendance")).json(&body).send().await?;
    assert_eq!(response.status(), 201);
    let receipt: Value = response.json().await?;
    assert_eq!(receipt["data"]["record"]["walletAddress"], WALLET);

    let response = server.client.post(server.url("/wallet/disconnect")).send().await?;
    assert_eq!(response.status(), 204);

    let status: Value = server.client.get(server.url("/wallet")).send().await?.json().await?;
    assert_eq!(status["data"]["account"], Value::Null);
    Ok(())
}

#[tokio::test]
#[serial]
async fn locked_wallet_has_no_accounts() -> Result<()> {
    // ---
    let accounts = Arc::new(Mutex::new(Vec::new()));
    let mut config = common::test_config().await;
    config.wallet.rpc_url = Some(spawn_wallet_node(accounts).await);
    let server = TestServer::with_config(config).await;

    let response = server.client.post(server.url("/wallet/connect")).send().await?;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await?;
    assert_eq!(body["code"], "WALLET_NO_ACCOUNTS");
    Ok(())
}

#[tokio::test]
#[serial]
async fn optional_wallet_mode_accepts_anonymous_check_ins() -> Result<()> {
    // ---
    let mut config = common::test_config().await;
    config.checkin.require_wallet = false;
    let server = TestServer::with_config(config).await;

    let key = server.current_key().await;
    let mut body = on_campus_submission(&key);
    body["walletAddress"] = Value::Null;

    let response = server.client.post(server.url("/attendance")).json(&body).send().await?;
    assert_eq!(response.status(), 201);
    let receipt: Value = response.json().await?;
    assert!(receipt["data"]["record"]["walletAddress"].is_null());
    Ok(())
}

#[tokio::test]
#[serial]
async fn invalid_routes_return_404() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/nonexistent"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
#[serial]
async fn server_handles_concurrent_requests() {
    // ---
    let server = TestServer::new().await;

    // Make multiple concurrent requests
    let futures = (0..10).map(|_| server.client.get(server.url("/health")).send());

    let responses = futures::future::join_all(futures).await;

    // All requests should succeed
    for response in responses {
        let response = response.expect("Request should succeed");
        assert_eq!(response.status(), 200);
    }
}

#[tokio::test]
#[serial]
async fn server_handles_malformed_json() {
    // ---
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/attendance"))
        .header("content-type", "application/json")
        .body("{ invalid json }")
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_client_error());
}
