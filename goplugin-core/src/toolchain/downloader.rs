//! Streaming downloader with progress reporting and URL validation.
//!
//! A download buffers the whole release archive in memory. The body is
//! drained by a single background task that owns the buffer and reports
//! `received / total` on a bounded channel after every chunk. The buffer is
//! handed back through the task's [`JoinHandle`] once the stream ends.

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

use crate::error::{PluginError, Result};

/// Upper bound for the initial buffer reservation.
const MAX_PREALLOCATION: u64 = 256 * 1024 * 1024;

/// Sender half of a progress channel; carries fractions in `[0.0, 1.0]`.
pub type ProgressSender = mpsc::Sender<f64>;

/// Receiver half of a progress channel.
pub type ProgressReceiver = mpsc::Receiver<f64>;

/// Create a progress channel holding at most `capacity` undelivered updates.
pub fn progress_channel(capacity: usize) -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(capacity.max(1))
}

// ============================================================================
// URL Security Validation
// ============================================================================

/// Validates that a URL is safe for downloading.
///
/// Checks:
/// - URL scheme must be HTTPS
/// - Host must be one of `allowed_hosts` or a subdomain of one
pub fn validate_url(url_str: &str, allowed_hosts: &[String]) -> Result<()> {
    let url = Url::parse(url_str)
        .map_err(|e| PluginError::InvalidUrl(format!("{}: {}", url_str, e)))?;

    if url.scheme() != "https" {
        return Err(PluginError::InvalidUrl(format!(
            "URL must use HTTPS: {}",
            url_str
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| PluginError::InvalidUrl(format!("URL must have a host: {}", url_str)))?;

    let is_allowed = allowed_hosts
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{}", domain)));

    if !is_allowed {
        return Err(PluginError::InvalidUrl(format!(
            "Download host not allowed: {}. Allowed: {:?}",
            host, allowed_hosts
        )));
    }

    Ok(())
}

// ============================================================================
// Progress-Tracked Transfer
// ============================================================================

/// In-memory copy of a response body with progress reporting.
#[derive(Debug)]
pub struct Transfer {
    total: u64,
    received: u64,
    content: Vec<u8>,
    progress: ProgressSender,
    receiver_gone: bool,
}

impl Transfer {
    /// Creates a transfer expecting `total` bytes.
    ///
    /// Fails with [`PluginError::MissingContentLength`] when the length is
    /// unknown or zero; there is no indeterminate-progress mode.
    pub fn new(total: Option<u64>, progress: ProgressSender) -> Result<Self> {
        let total = match total {
            Some(total) if total > 0 => total,
            _ => return Err(PluginError::MissingContentLength),
        };

        let capacity = usize::try_from(total.min(MAX_PREALLOCATION)).unwrap_or(0);
        Ok(Self {
            total,
            received: 0,
            content: Vec::with_capacity(capacity),
            progress,
            receiver_gone: false,
        })
    }

    /// Total number of bytes the server announced.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Bytes buffered so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    fn fraction(&self) -> f64 {
        (self.received as f64 / self.total as f64).min(1.0)
    }

    /// Appends `chunk` and reports the new completion fraction.
    ///
    /// Waits for channel capacity before returning, so a consumer that stops
    /// receiving stalls the transfer.
    pub async fn write(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        self.content.extend_from_slice(chunk);
        self.received += chunk.len() as u64;

        if self.receiver_gone {
            return;
        }
        if self.progress.send(self.fraction()).await.is_err() {
            debug!("Progress receiver dropped; continuing without updates");
            self.receiver_gone = true;
        }
    }

    /// Drains `stream` into the buffer and returns the buffered content.
    ///
    /// The progress channel closes when this returns.
    pub async fn run<S, B, E>(mut self, stream: S) -> Result<Vec<u8>>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut stream = std::pin::pin!(stream);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| PluginError::Transfer(Box::new(e)))?;
            self.write(chunk.as_ref()).await;
        }

        debug!(
            "Transfer finished: {} of {} bytes",
            self.received, self.total
        );
        Ok(self.content)
    }
}

// ============================================================================
// Download Function
// ============================================================================

/// Handle to a download running in the background.
#[derive(Debug)]
pub struct PendingDownload {
    pub url: String,
    handle: JoinHandle<Result<Vec<u8>>>,
}

impl PendingDownload {
    /// Wraps a spawned transfer task.
    pub fn from_handle(url: impl Into<String>, handle: JoinHandle<Result<Vec<u8>>>) -> Self {
        Self {
            url: url.into(),
            handle,
        }
    }

    /// Waits for the transfer to finish and takes its buffer.
    pub async fn wait(self) -> Result<Vec<u8>> {
        self.handle.await?
    }
}

/// Issues a GET for `url` and starts buffering the body in the background.
///
/// Returns as soon as the response headers are in; the body is read by a
/// spawned task reporting progress on the returned receiver.
///
/// # Errors
///
/// - [`PluginError::Network`] if the request cannot be sent.
/// - [`PluginError::HttpStatus`] for a non-success status code.
/// - [`PluginError::MissingContentLength`] if the length is unknown or zero.
pub async fn start_download(
    client: &reqwest::Client,
    url: &str,
    progress_capacity: usize,
) -> Result<(ProgressReceiver, PendingDownload)> {
    info!("Downloading {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| PluginError::Network {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(PluginError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown error").to_string(),
        });
    }

    let total_bytes = response.content_length();
    debug!("Content-Length: {:?}", total_bytes);

    let (tx, rx) = progress_channel(progress_capacity);
    let transfer = Transfer::new(total_bytes, tx)?;

    let handle = tokio::spawn(transfer.run(response.bytes_stream()));

    Ok((rx, PendingDownload::from_handle(url, handle)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn allowed() -> Vec<String> {
        vec!["go.dev".to_string(), "dl.google.com".to_string()]
    }

    #[tokio::test]
    async fn test_transfer_reports_each_write() {
        let (tx, mut rx) = progress_channel(1);
        let transfer = Transfer::new(Some(100), tx).unwrap();

        let chunks: Vec<std::result::Result<Vec<u8>, io::Error>> =
            vec![Ok(vec![1u8; 50]), Ok(vec![2u8; 50])];
        let task = tokio::spawn(transfer.run(futures::stream::iter(chunks)));

        let mut updates = Vec::new();
        while let Some(fraction) = rx.recv().await {
            updates.push(fraction);
        }

        let content = task.await.unwrap().unwrap();
        assert_eq!(updates, vec![0.5, 1.0]);
        assert_eq!(content.len(), 100);
        assert_eq!(&content[..50], &[1u8; 50][..]);
        assert_eq!(&content[50..], &[2u8; 50][..]);
    }

    #[tokio::test]
    async fn test_transfer_progress_is_non_decreasing() {
        let (tx, mut rx) = progress_channel(4);
        let transfer = Transfer::new(Some(10), tx).unwrap();

        let chunks: Vec<std::result::Result<&[u8], io::Error>> =
            vec![Ok(&b"abc"[..]), Ok(&b""[..]), Ok(&b"defg"[..]), Ok(&b"hij"[..])];
        let task = tokio::spawn(transfer.run(futures::stream::iter(chunks)));

        let mut updates = Vec::new();
        while let Some(fraction) = rx.recv().await {
            updates.push(fraction);
        }
        task.await.unwrap().unwrap();

        assert_eq!(updates.len(), 3);
        assert!(updates.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(updates.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn test_transfer_clamps_oversized_body() {
        let (tx, mut rx) = progress_channel(2);
        let transfer = Transfer::new(Some(4), tx).unwrap();

        let chunks: Vec<std::result::Result<&[u8], io::Error>> = vec![Ok(&b"abcdef"[..])];
        let content = transfer.run(futures::stream::iter(chunks)).await.unwrap();

        assert_eq!(content.len(), 6);
        assert_eq!(rx.recv().await, Some(1.0));
    }

    #[test]
    fn test_transfer_requires_length() {
        let (tx, _rx) = progress_channel(1);
        assert!(matches!(
            Transfer::new(None, tx.clone()),
            Err(PluginError::MissingContentLength)
        ));
        assert!(matches!(
            Transfer::new(Some(0), tx),
            Err(PluginError::MissingContentLength)
        ));
    }

    #[tokio::test]
    async fn test_transfer_surfaces_stream_error() {
        let (tx, mut rx) = progress_channel(1);
        let transfer = Transfer::new(Some(100), tx).unwrap();

        let chunks: Vec<std::result::Result<Vec<u8>, io::Error>> = vec![
            Ok(vec![0u8; 40]),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer")),
        ];
        let task = tokio::spawn(transfer.run(futures::stream::iter(chunks)));

        assert_eq!(rx.recv().await, Some(0.4));
        assert_eq!(rx.recv().await, None);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, PluginError::Transfer(_)));
        assert!(err.to_string().contains("reset by peer"));
    }

    #[tokio::test]
    async fn test_transfer_continues_without_receiver() {
        let (tx, rx) = progress_channel(1);
        drop(rx);
        let transfer = Transfer::new(Some(6), tx).unwrap();

        let chunks: Vec<std::result::Result<&[u8], io::Error>> = vec![Ok(&b"abc"[..]), Ok(&b"def"[..])];
        let content = transfer.run(futures::stream::iter(chunks)).await.unwrap();
        assert_eq!(content, b"abcdef");
    }

    #[test]
    fn test_transfer_counters() {
        let (tx, _rx) = progress_channel(1);
        let transfer = Transfer::new(Some(42), tx).unwrap();
        assert_eq!(transfer.total(), 42);
        assert_eq!(transfer.received(), 0);
    }

    #[test]
    fn test_validate_url_https_required() {
        assert!(validate_url("http://go.dev/dl/go1.23.3.linux-amd64.tar.gz", &allowed()).is_err());
        assert!(validate_url("https://go.dev/dl/go1.23.3.linux-amd64.tar.gz", &allowed()).is_ok());
    }

    #[test]
    fn test_validate_url_allowed_domains() {
        assert!(validate_url("https://dl.google.com/go/go1.23.3.linux-amd64.tar.gz", &allowed()).is_ok());
        assert!(validate_url("https://mirror.go.dev/file.tar.gz", &allowed()).is_ok());

        assert!(validate_url("https://evil.com/go.tar.gz", &allowed()).is_err());
        assert!(validate_url("https://go.dev.evil.org/go.tar.gz", &allowed()).is_err());
    }

    #[test]
    fn test_validate_url_invalid() {
        assert!(validate_url("not-a-url", &allowed()).is_err());
        assert!(validate_url("", &allowed()).is_err());
        assert!(validate_url("file:///etc/passwd", &allowed()).is_err());
    }
}
