//! Static texts and inline keyboards for the command surface.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Callback data for returning to the start screen.
pub const CALLBACK_HOME: &str = "home";
/// Callback data for the help screen.
pub const CALLBACK_HELP: &str = "help";
/// Callback data for the about screen.
pub const CALLBACK_ABOUT: &str = "about";
/// Callback data for closing the menu message.
pub const CALLBACK_CLOSE: &str = "close";

/// How-to text shown by `/help` and the Help button.
pub const HELP_TEXT: &str = "<b>How to use:</b>\n\n\
    1. Send me a direct download URL.\n\
    2. I'll download the file and upload it here.\n\n\
    <b>Commands:</b>\n\
    /start — Start the bot\n\
    /help — Show this message\n\
    /about — About this bot";

/// About text shown by `/about` and the About button.
pub const ABOUT_TEXT: &str = "<b>URL Courier</b>\n\n\
    Mirrors any direct download link into this chat as a document.\n\n\
    <b>Language:</b> Rust\n\
    <b>Framework:</b> teloxide";

/// Hint for authorized messages that carry no URL.
pub const NO_URL_HINT: &str =
    "Send me a direct download URL and I'll upload it here as a file.\nSee /help.";

/// Denial reply for unauthorized users.
pub const ACCESS_DENIED: &str = "⛔️ Access denied";

/// Greeting shown by `/start` and the Back button.
#[must_use]
pub fn start_text(first_name: &str) -> String {
    format!(
        "👋 <b>Hi {}!</b>\n\n\
         I can upload files to Telegram from any direct URL.\n\n\
         Just send me a link and I'll do the rest.\n\n\
         <b>Supported:</b> direct URLs, redirect URLs",
        html_escape::encode_text(first_name)
    )
}

/// Main menu keyboard shown under the start message.
#[must_use]
pub fn main_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("Help", CALLBACK_HELP),
            InlineKeyboardButton::callback("About", CALLBACK_ABOUT),
        ],
        vec![InlineKeyboardButton::callback("Close", CALLBACK_CLOSE)],
    ])
}

/// Back-navigation keyboard shown under help/about screens.
#[must_use]
pub fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅ Back",
        CALLBACK_HOME,
    )]])
}
