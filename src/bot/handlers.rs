//! Command, callback, and URL message handlers.

// lazy_regex! uses once_cell internally; patterns are validated at compile time
#![allow(clippy::non_std_lazy_statics)]

use crate::bot::transport::TelegramRelayTransport;
use crate::bot::views;
use crate::bot::DenialCooldown;
use crate::transfer::{relay, Downloader};
use crate::utils::{retry_telegram_operation, truncate_str};
use anyhow::{anyhow, Result};
use lazy_regex::lazy_regex;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, MaybeInaccessibleMessage, ParseMode};
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

/// Matches the first http(s) or www-prefixed token in a message.
pub static URL_REGEX: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r#"(?i)https?://[^\s<>"']+|www\.[^\s<>"']+"#);

/// Supported commands for the bot
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start the bot and show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// Show usage instructions
    #[command(description = "How to use the bot.")]
    Help,
    /// Show information about the bot
    #[command(description = "About this bot.")]
    About,
}

/// Safe extraction of user ID from a message.
/// Returns 0 if the user information is missing.
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

fn get_user_first_name(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map(|u| u.first_name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "there".to_string())
}

/// `/start` handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    info!("User {user_id} initiated /start command.");

    bot.send_message(msg.chat.id, views::start_text(&get_user_first_name(&msg)))
        .parse_mode(ParseMode::Html)
        .reply_markup(views::main_keyboard())
        .await?;
    Ok(())
}

/// `/help` handler
///
/// # Errors
///
/// Returns an error if the help message cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, views::HELP_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_markup(views::back_keyboard())
        .await?;
    Ok(())
}

/// `/about` handler
///
/// # Errors
///
/// Returns an error if the about message cannot be sent.
pub async fn about(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, views::ABOUT_TEXT)
        .parse_mode(ParseMode::Html)
        .reply_markup(views::back_keyboard())
        .await?;
    Ok(())
}

/// Inline keyboard navigation between the start, help, and about screens.
///
/// # Errors
///
/// Returns an error if the menu message cannot be edited or deleted.
pub async fn handle_callback(bot: Bot, q: CallbackQuery) -> Result<()> {
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    // Inaccessible (too old) menu messages cannot be edited anyway
    let Some(MaybeInaccessibleMessage::Regular(menu)) = q.message.as_ref() else {
        return Ok(());
    };
    let (chat_id, msg_id) = (menu.chat.id, menu.id);

    match data {
        views::CALLBACK_HOME => {
            bot.edit_message_text(chat_id, msg_id, views::start_text(&q.from.first_name))
                .parse_mode(ParseMode::Html)
                .reply_markup(views::main_keyboard())
                .await?;
        }
        views::CALLBACK_HELP => {
            bot.edit_message_text(chat_id, msg_id, views::HELP_TEXT)
                .parse_mode(ParseMode::Html)
                .reply_markup(views::back_keyboard())
                .await?;
        }
        views::CALLBACK_ABOUT => {
            bot.edit_message_text(chat_id, msg_id, views::ABOUT_TEXT)
                .parse_mode(ParseMode::Html)
                .reply_markup(views::back_keyboard())
                .await?;
        }
        views::CALLBACK_CLOSE => {
            bot.delete_message(chat_id, msg_id).await?;
        }
        other => warn!(data = other, "Unknown callback data"),
    }
    Ok(())
}

/// URL message handler: creates the status message and spawns the relay.
///
/// The transfer itself runs on its own task so a long download never
/// blocks further updates from the same chat; the semaphore bounds how
/// many transfers run at once.
///
/// # Errors
///
/// Returns an error if the status message cannot be created.
pub async fn handle_url(
    bot: Bot,
    msg: Message,
    downloader: Arc<Downloader>,
    transfers: Arc<tokio::sync::Semaphore>,
) -> Result<()> {
    let text = msg.text().unwrap_or("");
    let Some(url_match) = URL_REGEX.find(text) else {
        return Ok(());
    };
    let url = url_match.as_str().to_string();
    let user_id = get_user_id_safe(&msg);

    info!(
        user_id,
        "Received URL message: '{}'",
        truncate_str(text, 200)
    );

    let status = retry_telegram_operation(|| async {
        bot.send_message(msg.chat.id, relay::STATUS_CHECKING)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| anyhow!("Telegram send error: {e}"))
    })
    .await?;

    let transport = TelegramRelayTransport::new(bot.clone(), msg.chat.id, status.id);
    tokio::spawn(async move {
        let _permit = match transfers.acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                error!("Transfer semaphore closed: {e}");
                return;
            }
        };
        relay::run(&transport, &downloader, &url).await;
    });

    Ok(())
}

/// Fallback for authorized private messages that carry no URL.
///
/// # Errors
///
/// Returns an error if the hint cannot be sent.
pub async fn handle_no_url(bot: Bot, msg: Message) -> Result<()> {
    if msg.text().is_some() {
        bot.send_message(msg.chat.id, views::NO_URL_HINT).await?;
    }
    Ok(())
}

/// Denial handler for users outside the authorization list.
///
/// Responds at most once per cooldown window per user; groups are ignored
/// entirely.
///
/// # Errors
///
/// Returns an error if the denial message cannot be sent.
pub async fn handle_unauthorized(bot: Bot, msg: Message, gate: Arc<DenialCooldown>) -> Result<()> {
    if !msg.chat.is_private() {
        return Ok(());
    }

    let user_id = get_user_id_safe(&msg);
    if gate.try_acquire(user_id).await {
        info!(user_id, "Unauthorized access attempt; sending denial");
        bot.send_message(msg.chat.id, views::ACCESS_DENIED).await?;
    }
    Ok(())
}
