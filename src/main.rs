use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mileage_bot::access::AccessGuard;
use mileage_bot::bot;
use mileage_bot::config::{Config, LedgerBackend, LogFormat};
use mileage_bot::ledger::{CachedLedger, Ledger, MemoryLedger, SheetsLedger};
use mileage_bot::tracker::Tracker;
use mileage_bot::webhook::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!("Starting mileage bot");

    let ledger = connect_ledger(&config).await?;
    let tracker = Arc::new(Tracker::new(
        ledger,
        AccessGuard::new(config.owner_id),
        config.rates,
        config.timezone,
        config.session_ttl,
    ));
    info!(
        owner_restricted = config.owner_id.is_some(),
        city = config.rates.city,
        district = config.rates.district,
        highway = config.rates.highway,
        "Tracker initialized"
    );

    let bot = Bot::new(&config.telegram_token);

    match config.webhook_url.clone() {
        Some(url) => run_webhook(bot, tracker, &config, &url).await,
        None => run_polling(bot, tracker).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn connect_ledger(config: &Config) -> Result<Arc<dyn Ledger>> {
    match &config.ledger {
        LedgerBackend::Sheets {
            spreadsheet_id,
            service_account_json,
        } => {
            let sheets = SheetsLedger::connect(spreadsheet_id, service_account_json)
                .await
                .context("Failed to connect to the spreadsheet")?;
            info!(sheet = %sheets.sheet().title, "Spreadsheet ledger connected");
            Ok(Arc::new(CachedLedger::new(sheets, config.ledger_cache)))
        }
        LedgerBackend::Memory => {
            warn!("Using the in-memory ledger; records are lost on restart");
            Ok(Arc::new(MemoryLedger::new()))
        }
    }
}

async fn run_polling(bot: Bot, tracker: Arc<Tracker>) -> Result<()> {
    // A leftover webhook would block getUpdates
    bot.delete_webhook().await?;
    info!("No public URL configured, starting long polling");

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![tracker])
        .default_handler(|upd| async move {
            tracing::debug!(update_id = upd.id.0, "Unhandled update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn run_webhook(bot: Bot, tracker: Arc<Tracker>, config: &Config, url: &str) -> Result<()> {
    let webhook_url = url.parse().with_context(|| format!("Invalid webhook URL: {url}"))?;

    let mut request = bot.set_webhook(webhook_url).drop_pending_updates(true);
    if let Some(secret) = config.webhook_secret.clone() {
        request = request.secret_token(secret);
    }
    request.await.context("Failed to register the webhook")?;
    info!(url, "Webhook registered");

    let app = router(AppState {
        bot: bot.clone(),
        tracker,
        secret: config.webhook_secret.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, removing webhook");
    if let Err(e) = bot.delete_webhook().await {
        warn!(error = %e, "Failed to remove webhook");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
