//! Callback Handler module for processing inline keyboard callback queries

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::tracker::Tracker;

use super::commands::parse_callback;
use super::message_handler::send_text;
use super::ui_builder::render_reply;

/// Handle callback queries from inline keyboards. The reply replaces the text
/// of the message carrying the pressed button; when that message can no
/// longer be edited the reply is sent as a new message.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, tracker: Arc<Tracker>) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    // Stops the client-side loading indicator
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(action) = q.data.as_deref().and_then(parse_callback) else {
        warn!(user_id = %q.from.id, data = ?q.data, "Unknown callback payload");
        return Ok(());
    };

    let language_code = q.from.language_code.as_deref();
    let reply = tracker.handle(q.from.id.0, action).await;
    let (text, keyboard) = render_reply(&reply, language_code);

    let Some(message) = q.message.as_ref() else {
        return send_text(&bot, ChatId::from(q.from.id), text, keyboard).await;
    };
    let chat_id = message.chat().id;

    let mut edit = bot.edit_message_text(chat_id, message.id(), text.clone());
    if let Some(keyboard) = keyboard.clone() {
        edit = edit.reply_markup(keyboard);
    }

    match edit.await {
        Ok(_) => Ok(()),
        Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => {
            warn!(user_id = %q.from.id, error = %e, "Failed to edit message, sending a new one");
            send_text(&bot, chat_id, text, keyboard).await
        }
    }
}
