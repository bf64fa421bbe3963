use dotenvy::dotenv;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tokio::sync::Semaphore;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use url_courier::bot::access::DENIAL_COOLDOWN_SECS;
use url_courier::bot::handlers::{self, get_user_id_safe, Command, URL_REGEX};
use url_courier::bot::DenialCooldown;
use url_courier::config::{Settings, DOWNLOAD_CONNECT_TIMEOUT_SECS, MAX_CONCURRENT_TRANSFERS};
use url_courier::transfer::Downloader;

/// Regex patterns for redacting the bot token from log output
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // We return the original buffer length to satisfy the contract,
        // even if the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting URL Courier bot...");

    let settings = init_settings();
    init_download_dir(&settings);

    let downloader = init_downloader(&settings);

    // The bot client carries uploads of arbitrary size; bound only the
    // connect time, never the whole request.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(DOWNLOAD_CONNECT_TIMEOUT_SECS))
        .build()?;
    let bot = Bot::with_client(settings.telegram_token.clone(), client);

    let transfers = Arc::new(Semaphore::new(MAX_CONCURRENT_TRANSFERS));
    let denial_gate = Arc::new(DenialCooldown::new(DENIAL_COOLDOWN_SECS));

    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![settings, downloader, transfers, denial_gate])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_download_dir(settings: &Settings) {
    if let Err(e) = std::fs::create_dir_all(&settings.download_dir) {
        error!(
            "Failed to create download directory '{}': {}",
            settings.download_dir, e
        );
        std::process::exit(1);
    }
}

fn init_downloader(settings: &Settings) -> Arc<Downloader> {
    match Downloader::new(settings) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            error!("Failed to initialize HTTP client: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery, settings: Arc<Settings>| {
                    settings.is_allowed(q.from.id.0.cast_signed())
                })
                .endpoint(handle_callback),
        )
        .branch(
            Update::filter_message().branch(
                dptree::filter(|msg: Message, settings: Arc<Settings>| {
                    msg.chat.is_private() && settings.is_allowed(get_user_id_safe(&msg))
                })
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    Update::filter_message()
                        .filter(|msg: Message| msg.text().is_some_and(|t| URL_REGEX.is_match(t)))
                        .endpoint(handle_url),
                )
                .branch(Update::filter_message().endpoint(handle_no_url)),
            ),
        )
        .branch(
            // Everyone who fell through the filters above is unauthorized
            Update::filter_message().endpoint(handle_unauthorized),
        )
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg).await,
        Command::Help => handlers::help(bot, msg).await,
        Command::About => handlers::about(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_callback(bot, q).await {
        error!("Callback handler error: {}", e);
    }
    respond(())
}

async fn handle_url(
    bot: Bot,
    msg: Message,
    downloader: Arc<Downloader>,
    transfers: Arc<Semaphore>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_url(bot, msg, downloader, transfers).await {
        error!("URL handler error: {}", e);
    }
    respond(())
}

async fn handle_no_url(bot: Bot, msg: Message) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_no_url(bot, msg).await {
        error!("Hint handler error: {}", e);
    }
    respond(())
}

async fn handle_unauthorized(
    bot: Bot,
    msg: Message,
    gate: Arc<DenialCooldown>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_unauthorized(bot, msg, gate).await {
        error!("Unauthorized handler error: {}", e);
    }
    respond(())
}
