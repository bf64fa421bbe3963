/// Unauthorized-access flood protection.
pub mod access;
/// Command, callback, and URL message handlers.
pub mod handlers;
/// Telegram implementation of the relay transport.
pub mod transport;
/// Static texts and inline keyboards.
pub mod views;

pub use access::DenialCooldown;
pub use transport::TelegramRelayTransport;
