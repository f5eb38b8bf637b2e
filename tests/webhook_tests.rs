//! # Webhook Tests
//!
//! The router is served on a loopback socket and called over HTTP. None of
//! these requests reach the conversation, so no Telegram call is made.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::StatusCode;
use teloxide::Bot;

use mileage_bot::access::AccessGuard;
use mileage_bot::fuel::FuelRates;
use mileage_bot::ledger::MemoryLedger;
use mileage_bot::tracker::Tracker;
use mileage_bot::webhook::{router, AppState, HEALTH_RESPONSE, SECRET_TOKEN_HEADER};

async fn spawn_server(secret: Option<&str>) -> Result<SocketAddr> {
    let tracker = Arc::new(Tracker::new(
        Arc::new(MemoryLedger::new()),
        AccessGuard::new(None),
        FuelRates::default(),
        chrono_tz::Europe::Kyiv,
        Duration::from_secs(60),
    ));
    let app = router(AppState {
        bot: Bot::new("123456:TEST"),
        tracker,
        secret: secret.map(str::to_string),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(addr)
}

#[tokio::test]
async fn test_health_check() -> Result<()> {
    let addr = spawn_server(None).await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("http://{addr}/")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await?, HEALTH_RESPONSE);

    let response = client.head(format!("http://{addr}/")).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn test_favicon_has_no_content() -> Result<()> {
    let addr = spawn_server(None).await?;
    let response = reqwest::get(format!("http://{addr}/favicon.ico")).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn test_malformed_update_is_rejected() -> Result<()> {
    let addr = spawn_server(None).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/webhook"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("http://{addr}/webhook"))
        .json(&serde_json::json!({ "hello": "world" }))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_secret_token_is_checked() -> Result<()> {
    let addr = spawn_server(Some("s3cret")).await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("http://{addr}/webhook"))
        .body("{}")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client
        .post(format!("http://{addr}/webhook"))
        .header(SECRET_TOKEN_HEADER, "wrong")
        .body("{}")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Right secret, but the payload is still not an update
    let response = client
        .post(format!("http://{addr}/webhook"))
        .header(SECRET_TOKEN_HEADER, "s3cret")
        .body("{}")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    Ok(())
}
