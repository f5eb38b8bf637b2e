//! # Webhook Module
//!
//! HTTP surface used when the bot runs behind a public URL. Telegram posts
//! updates to `POST /webhook`; `GET /` answers health checks.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::Router;
use teloxide::types::Update;
use teloxide::Bot;
use tracing::{debug, error, warn};

use crate::bot::dispatch_update;
use crate::config::WEBHOOK_PATH;
use crate::tracker::Tracker;

/// Header Telegram sets when the webhook was registered with a secret token
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

pub const HEALTH_RESPONSE: &str = "Bot is running";

#[derive(Clone)]
pub struct AppState {
    pub bot: Bot,
    pub tracker: Arc<Tracker>,
    pub secret: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/favicon.ico", get(no_content))
        .route("/favicon.png", get(no_content))
        .route(WEBHOOK_PATH, post(receive_update))
        .with_state(state)
}

async fn health() -> &'static str {
    HEALTH_RESPONSE
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn receive_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = state.secret.as_deref() {
        let provided = headers
            .get(SECRET_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok());
        if provided != Some(secret) {
            warn!("Rejected webhook call with a missing or wrong secret token");
            return StatusCode::UNAUTHORIZED;
        }
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, bytes = body.len(), "Rejected malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };
    debug!(update_id = update.id.0, "Webhook update received");

    // Handler failures are only logged: any non-2xx status makes Telegram redeliver the update
    if let Err(e) = dispatch_update(state.bot, state.tracker, update).await {
        error!(error = %e, "Failed to handle webhook update");
    }
    StatusCode::OK
}
