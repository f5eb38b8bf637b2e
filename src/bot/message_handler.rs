//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::InlineKeyboardMarkup;
use tracing::debug;

use crate::tracker::{Reply, Tracker};

use super::commands::action_for_text;
use super::ui_builder::render_reply;

/// Handle an incoming message. Commands map to their actions, any other text
/// feeds the conversation. Non-text messages count as empty text.
pub async fn message_handler(bot: Bot, msg: Message, tracker: Arc<Tracker>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };
    let language_code = user.language_code.as_deref();
    let text = msg.text().unwrap_or_default();

    debug!(user_id = %user.id, chars = text.len(), "Received message");

    let reply = tracker.handle(user.id.0, action_for_text(text)).await;
    send_reply(&bot, msg.chat.id, &reply, language_code).await
}

/// Render a reply and send it as a new message
pub async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    reply: &Reply,
    language_code: Option<&str>,
) -> Result<()> {
    let (text, keyboard) = render_reply(reply, language_code);
    send_text(bot, chat_id, text, keyboard).await
}

pub(crate) async fn send_text(
    bot: &Bot,
    chat_id: ChatId,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    let request = bot.send_message(chat_id, text);
    match keyboard {
        Some(keyboard) => request.reply_markup(keyboard).await?,
        None => request.await?,
    };
    Ok(())
}
