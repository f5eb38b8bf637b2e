//! Bot module for handling Telegram interactions
//!
//! - `commands`: Maps slash commands and button payloads to tracker actions
//! - `message_handler`: Handles incoming messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages

pub mod callback_handler;
pub mod commands;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::UpdateKind;
use tracing::debug;

use crate::tracker::Tracker;

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

/// Handler tree for long polling; `Arc<Tracker>` must be registered as a dependency
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}

/// Route one update received through the webhook to the same handlers
pub async fn dispatch_update(bot: Bot, tracker: Arc<Tracker>, update: Update) -> Result<()> {
    match update.kind {
        UpdateKind::Message(msg) => message_handler(bot, msg, tracker).await,
        UpdateKind::CallbackQuery(q) => callback_handler(bot, q, tracker).await,
        _ => {
            debug!(update_id = update.id.0, "Ignoring unsupported update kind");
            Ok(())
        }
    }
}
