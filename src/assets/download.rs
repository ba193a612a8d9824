//! Remote image download.
//!
//! Fetches http(s) catalog images with retry, using one shared client so
//! preloading dozens of slides does not open dozens of connection pools.

use image::DynamicImage;
use once_cell::sync::Lazy;
use std::time::Duration;
use thiserror::Error;

/// Shared HTTP client for all downloads
///
/// - 30 second timeout
/// - Single idle connection per host
/// - 30 second idle timeout
static HTTP_CLIENT: Lazy<Result<reqwest::Client, reqwest::Error>> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(1)
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
});

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP client unavailable: {0}")]
    ClientError(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    #[error("Image decode failed: {0}")]
    DecodeError(#[from] image::ImageError),

    #[error("Empty URL")]
    EmptyUrl,

    #[error("Download timeout")]
    Timeout,
}

/// Download configuration
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Maximum number of attempts
    pub max_retries: u32,
    /// Base delay between retries (doubled each attempt)
    pub retry_delay: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Download and decode an image using the shared HTTP client
pub async fn download_image(url: &str) -> Result<DynamicImage, DownloadError> {
    download_image_with_config(url, &DownloadConfig::default()).await
}

/// Download and decode an image with custom retry settings
pub async fn download_image_with_config(
    url: &str,
    config: &DownloadConfig,
) -> Result<DynamicImage, DownloadError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(DownloadError::EmptyUrl);
    }

    let client = HTTP_CLIENT
        .as_ref()
        .map_err(|e| DownloadError::ClientError(e.to_string()))?;

    tracing::debug!("Downloading image from: {}", url);

    let bytes = download_with_retry(client, url, config).await?;

    tracing::debug!("Downloaded {} bytes, decoding image...", bytes.len());

    let reader = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DownloadError::DecodeError(image::ImageError::IoError(e)))?;

    Ok(reader.decode()?)
}

/// Delay before `attempt` (0-based), doubling from the base delay
fn backoff_delay(config: &DownloadConfig, attempt: u32) -> Duration {
    if attempt == 0 {
        Duration::ZERO
    } else {
        config.retry_delay * 2u32.pow(attempt - 1)
    }
}

async fn download_with_retry(
    client: &reqwest::Client,
    url: &str,
    config: &DownloadConfig,
) -> Result<bytes::Bytes, DownloadError> {
    let mut last_error = None;

    for attempt in 0..config.max_retries {
        if attempt > 0 {
            let delay = backoff_delay(config, attempt);
            tracing::debug!(
                "Retry attempt {}/{}, waiting {:?}",
                attempt + 1,
                config.max_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }

        match client.get(url).send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    match response.bytes().await {
                        Ok(bytes) => return Ok(bytes),
                        Err(e) => {
                            tracing::warn!("Failed to read response body: {}", e);
                            last_error = Some(DownloadError::RequestError(e));
                        }
                    }
                } else {
                    tracing::warn!("HTTP error: {} for {}", status, url);
                    last_error = Some(DownloadError::HttpError {
                        status: status.as_u16(),
                    });
                }
            }
            Err(e) => {
                tracing::warn!("Request failed: {} for {}", e, url);
                last_error = Some(DownloadError::RequestError(e));
            }
        }
    }

    Err(last_error.unwrap_or(DownloadError::Timeout))
}
