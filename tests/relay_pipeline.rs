//! End-to-end tests for the relay pipeline.
//!
//! HTTP is served by a mockito server; the chat platform is replaced by a
//! recording transport so status transitions, document deliveries, and the
//! cleanup invariant can be asserted directly.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use url_courier::config::Settings;
use url_courier::transfer::transport::{RelayTransport, UploadCounter};
use url_courier::transfer::{relay, Downloader, ProgressReporter, TransferError};

struct SentDocument {
    caption: String,
    file_existed: bool,
    with_progress: bool,
}

/// Transport double that records everything the pipeline does.
#[derive(Default)]
struct RecordingTransport {
    statuses: Mutex<Vec<String>>,
    documents: Mutex<Vec<SentDocument>>,
    // Errors handed out for the first send attempts, in order
    send_failures: Mutex<Vec<TransferError>>,
    send_attempts: AtomicUsize,
}

impl RecordingTransport {
    fn failing_with(failures: Vec<TransferError>) -> Self {
        Self {
            send_failures: Mutex::new(failures),
            ..Self::default()
        }
    }

    fn statuses(&self) -> Vec<String> {
        self.statuses.lock().expect("statuses lock poisoned").clone()
    }

    fn last_status(&self) -> String {
        self.statuses().last().cloned().unwrap_or_default()
    }

    fn document_count(&self) -> usize {
        self.documents.lock().expect("documents lock poisoned").len()
    }
}

#[async_trait]
impl RelayTransport for RecordingTransport {
    async fn update_status(&self, text: &str) -> Result<(), TransferError> {
        self.statuses
            .lock()
            .expect("statuses lock poisoned")
            .push(text.to_string());
        Ok(())
    }

    async fn send_document(
        &self,
        path: &Path,
        caption: &str,
        progress: Option<UploadCounter>,
    ) -> Result<(), TransferError> {
        self.send_attempts.fetch_add(1, Ordering::Relaxed);

        let mut failures = self.send_failures.lock().expect("failures lock poisoned");
        if !failures.is_empty() {
            return Err(failures.remove(0));
        }
        drop(failures);

        self.documents
            .lock()
            .expect("documents lock poisoned")
            .push(SentDocument {
                caption: caption.to_string(),
                file_existed: path.exists(),
                with_progress: progress.is_some(),
            });
        Ok(())
    }
}

fn test_settings(dir: &TempDir, max_file_size: u64) -> Settings {
    Settings {
        telegram_token: "dummy".to_string(),
        owner_id: None,
        auth_users_str: None,
        download_dir: dir.path().display().to_string(),
        max_file_size,
    }
}

fn staged_entry_count(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path())
        .expect("read staging dir")
        .count()
}

#[tokio::test]
async fn relay_delivers_document_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/file.zip")
        .with_status(200)
        .with_body(vec![0u8; 2048])
        .create_async()
        .await;

    let staging = TempDir::new().expect("create staging dir");
    let downloader =
        Downloader::new(&test_settings(&staging, 2 * 1024 * 1024)).expect("build downloader");
    let transport = RecordingTransport::default();

    // The handler creates the status message with the checking text
    transport
        .update_status(relay::STATUS_CHECKING)
        .await
        .expect("seed status");

    relay::run(&transport, &downloader, &format!("{}/file.zip", server.url())).await;

    let statuses = transport.statuses();
    assert_eq!(statuses[0], relay::STATUS_CHECKING);
    assert_eq!(statuses[1], relay::STATUS_DOWNLOADING);
    assert!(statuses.contains(&relay::STATUS_UPLOADING.to_string()));
    assert_eq!(transport.last_status(), relay::STATUS_DONE);

    let documents = transport.documents.lock().expect("documents lock poisoned");
    assert_eq!(documents.len(), 1);
    assert!(documents[0].caption.contains("file.zip"));
    assert!(documents[0].caption.contains("2.00 KB"));
    assert!(documents[0].file_existed);
    assert!(documents[0].with_progress);
    drop(documents);

    // No staged file survives the transfer
    assert_eq!(staged_entry_count(&staging), 0);
}

#[tokio::test]
async fn declared_size_over_limit_aborts_before_write() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/big.bin")
        .with_status(200)
        .with_body(vec![0u8; 2048])
        .create_async()
        .await;

    let staging = TempDir::new().expect("create staging dir");
    let downloader = Downloader::new(&test_settings(&staging, 1024)).expect("build downloader");
    let transport = RecordingTransport::default();
    let mut progress = ProgressReporter::new();

    let url = format!("{}/big.bin", server.url());
    let err = downloader
        .download(&url, &transport, &mut progress)
        .await
        .expect_err("download must be rejected");

    assert!(matches!(
        err,
        TransferError::SizeLimitExceeded {
            size: 2048,
            limit: 1024
        }
    ));
    // Nothing was staged: the declared length was rejected up front
    assert_eq!(staged_entry_count(&staging), 0);

    relay::run(&transport, &downloader, &url).await;
    let last = transport.last_status();
    assert!(last.contains("File too large (2.00 KB)"));
    assert!(last.contains("1.00 KB"));
    assert_eq!(transport.document_count(), 0);
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/gone.zip")
        .with_status(404)
        .create_async()
        .await;

    let staging = TempDir::new().expect("create staging dir");
    let downloader = Downloader::new(&test_settings(&staging, 1024)).expect("build downloader");
    let transport = RecordingTransport::default();

    relay::run(
        &transport,
        &downloader,
        &format!("{}/gone.zip", server.url()),
    )
    .await;

    assert!(transport.last_status().contains("HTTP 404"));
    assert_eq!(transport.document_count(), 0);
    assert_eq!(staged_entry_count(&staging), 0);
}

#[tokio::test]
async fn running_cap_is_enforced_without_content_length() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/stream.bin")
        .with_status(200)
        .with_chunked_body(|w| w.write_all(&[0u8; 2048]))
        .create_async()
        .await;

    let staging = TempDir::new().expect("create staging dir");
    let downloader = Downloader::new(&test_settings(&staging, 1024)).expect("build downloader");
    let transport = RecordingTransport::default();
    let mut progress = ProgressReporter::new();

    let err = downloader
        .download(
            &format!("{}/stream.bin", server.url()),
            &transport,
            &mut progress,
        )
        .await
        .expect_err("stream must be capped");

    match err {
        TransferError::SizeLimitExceeded { size, limit } => {
            assert!(size > limit);
            assert_eq!(limit, 1024);
        }
        other => panic!("unexpected error: {other}"),
    }
    // The partial file was removed together with its staging directory
    assert_eq!(staged_entry_count(&staging), 0);
}

#[tokio::test]
async fn rate_limited_upload_retries_once_without_progress() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/file.zip")
        .with_status(200)
        .with_body(vec![0u8; 512])
        .create_async()
        .await;

    let staging = TempDir::new().expect("create staging dir");
    let downloader =
        Downloader::new(&test_settings(&staging, 1024 * 1024)).expect("build downloader");
    let transport = RecordingTransport::failing_with(vec![TransferError::RateLimited(
        Duration::from_millis(10),
    )]);

    relay::run(&transport, &downloader, &format!("{}/file.zip", server.url())).await;

    // One failed attempt, one successful retry, one delivered document
    assert_eq!(transport.send_attempts.load(Ordering::Relaxed), 2);
    assert_eq!(transport.document_count(), 1);
    let documents = transport.documents.lock().expect("documents lock poisoned");
    assert!(!documents[0].with_progress);
    drop(documents);

    assert_eq!(transport.last_status(), relay::STATUS_DONE);
    assert_eq!(staged_entry_count(&staging), 0);
}

#[tokio::test]
async fn failed_upload_still_cleans_up() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/file.zip")
        .with_status(200)
        .with_body(vec![0u8; 512])
        .create_async()
        .await;

    let staging = TempDir::new().expect("create staging dir");
    let downloader =
        Downloader::new(&test_settings(&staging, 1024 * 1024)).expect("build downloader");
    let transport = RecordingTransport::failing_with(vec![TransferError::Io(
        std::io::Error::other("upload rejected"),
    )]);

    relay::run(&transport, &downloader, &format!("{}/file.zip", server.url())).await;

    // A non-rate-limit failure is not retried
    assert_eq!(transport.send_attempts.load(Ordering::Relaxed), 1);
    assert_eq!(transport.document_count(), 0);
    assert!(transport.last_status().contains("Something went wrong"));
    assert_eq!(staged_entry_count(&staging), 0);
}
