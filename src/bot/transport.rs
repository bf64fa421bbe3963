//! Telegram implementation of the relay transport.
//!
//! Bound to one chat and one status message. Maps Telegram's "message is
//! not modified" to a silent success and `RetryAfter` to
//! [`TransferError::RateLimited`] so the pipeline can apply its own
//! backoff policy.

use crate::transfer::transport::{RelayTransport, UploadCounter};
use crate::transfer::TransferError;
use async_trait::async_trait;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::task::{Context, Poll};
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

/// Relay transport bound to one chat and one status message.
pub struct TelegramRelayTransport {
    bot: Bot,
    chat_id: ChatId,
    status_msg_id: MessageId,
}

impl TelegramRelayTransport {
    /// Create a transport bound to an existing status message.
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId, status_msg_id: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            status_msg_id,
        }
    }
}

fn map_telegram_error(err: RequestError) -> TransferError {
    match err {
        RequestError::RetryAfter(secs) => TransferError::RateLimited(secs.duration()),
        other => TransferError::Telegram(other),
    }
}

#[async_trait]
impl RelayTransport for TelegramRelayTransport {
    async fn update_status(&self, text: &str) -> Result<(), TransferError> {
        match self
            .bot
            .edit_message_text(self.chat_id, self.status_msg_id, text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => Ok(()),
            // The throttle may re-render identical text; that is not an error
            Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(map_telegram_error(e)),
        }
    }

    async fn send_document(
        &self,
        path: &Path,
        caption: &str,
        progress: Option<UploadCounter>,
    ) -> Result<(), TransferError> {
        let document = match progress {
            Some(counter) => {
                let file = File::open(path).await?;
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("file")
                    .to_string();
                InputFile::read(CountingReader::new(file, counter)).file_name(name)
            }
            // The progress-free retry lets teloxide stream the file itself
            None => InputFile::file(path.to_path_buf()),
        };

        self.bot
            .send_document(self.chat_id, document)
            .caption(caption.to_string())
            .parse_mode(ParseMode::Html)
            .await
            .map(|_| ())
            .map_err(map_telegram_error)
    }
}

/// `AsyncRead` wrapper that publishes the number of bytes read so far.
struct CountingReader {
    inner: File,
    counter: UploadCounter,
}

impl CountingReader {
    const fn new(inner: File, counter: UploadCounter) -> Self {
        Self { inner, counter }
    }
}

impl AsyncRead for CountingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let me = self.get_mut();
        let before = buf.filled().len();
        match Pin::new(&mut me.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let read = buf.filled().len() - before;
                me.counter.fetch_add(read as u64, Ordering::Relaxed);
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}
