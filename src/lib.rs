#![deny(missing_docs)]
//! URL Courier bot library.
//!
//! Accepts a direct download URL in a private Telegram chat, streams the
//! remote resource to local storage, and re-uploads it to the chat as a
//! document, reporting progress by editing a single status message.

/// Telegram bot layer: handlers, views, and the relay transport.
pub mod bot;
/// Configuration management.
pub mod config;
/// The streaming relay pipeline (download, upload, orchestration).
pub mod transfer;
/// Utility functions.
pub mod utils;
