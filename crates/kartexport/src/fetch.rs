//! Image retrieval for map tiles and page furnishings

use futures::future::BoxFuture;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Fetch was cancelled")]
    Cancelled,
}

/// Source of decoded images, addressed by URL.
///
/// Implementations must be cheap to share: the print pipeline fetches tiles
/// concurrently through one `Arc<dyn ImageFetcher>`.
pub trait ImageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DynamicImage, FetchError>>;
}

/// Decode raw bytes returned by a server or read from disk
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, FetchError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Fetches `http(s)://` URLs with `reqwest` and reads everything else from disk
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_remote(&self, url: &str) -> Result<DynamicImage, FetchError> {
        let request_error = |e: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        decode_image(&bytes)
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<DynamicImage, FetchError>> {
        Box::pin(async move {
            if url.starts_with("http://") || url.starts_with("https://") {
                self.fetch_remote(url).await
            } else {
                let path = url.strip_prefix("file://").unwrap_or(url);
                let bytes = tokio::fs::read(path).await?;
                decode_image(&bytes)
            }
        })
    }
}
