// src/fetch/mod.rs
//! Retrieval strategies: plain HTTP, rendered (browser) and image download.

pub mod browser;
pub mod fixture;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::RetrievalError;

pub use browser::{BrowserRuntime, BrowserlessRuntime, RenderPlan};
pub use fixture::FixtureFetcher;

/// Static retrieval. Adapters receive this injected so extraction can be tested offline.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn get_bytes(&self, url: &str, deadline: Instant) -> Result<Vec<u8>, RetrievalError>;

    async fn get_text(&self, url: &str, deadline: Instant) -> Result<String, RetrievalError> {
        let bytes = self.get_bytes(url, deadline).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Time left until `deadline`, or a timeout error if it has already passed.
pub fn remaining(deadline: Instant, url: &str) -> Result<Duration, RetrievalError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(RetrievalError::Timeout {
            url: url.to_string(),
        });
    }
    Ok(left)
}

/// reqwest-backed fetcher shared by all adapters.
#[derive(Clone)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, RetrievalError> {
        let http = reqwest::Client::builder()
            .user_agent("ortodoxa-gudstjanster/0.1 (+schedule aggregator)")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RetrievalError::Network {
                url: String::new(),
                message: format!("building http client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_bytes(&self, url: &str, deadline: Instant) -> Result<Vec<u8>, RetrievalError> {
        let budget = remaining(deadline, url)?;
        let resp = self
            .http
            .get(url)
            .timeout(budget)
            .send()
            .await
            .map_err(|e| RetrievalError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::debug!(url, status = status.as_u16(), "non-success response");
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RetrievalError::from_reqwest(url, e))?;
        Ok(body.to_vec())
    }
}

/// Download raw image bytes for later vision extraction. No decoding happens here.
pub async fn download_image(
    fetcher: &dyn Fetch,
    url: &str,
    deadline: Instant,
) -> Result<Vec<u8>, RetrievalError> {
    let bytes = fetcher.get_bytes(url, deadline).await?;
    if bytes.is_empty() {
        return Err(RetrievalError::EmptyBody {
            url: url.to_string(),
        });
    }
    Ok(bytes)
}

/// Media type sniffed from magic bytes; JPEG unless the PNG signature is present.
pub fn image_media_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

pub fn image_extension(bytes: &[u8]) -> &'static str {
    match image_media_type(bytes) {
        "image/png" => ".png",
        _ => ".jpg",
    }
}

/// Resolve `href` against the page it was found on.
pub fn resolve_url(base: &str, href: &str) -> Result<String, RetrievalError> {
    let base_url = reqwest::Url::parse(base).map_err(|e| RetrievalError::InvalidUrl {
        url: base.to_string(),
        message: e.to_string(),
    })?;
    base_url
        .join(href.trim())
        .map(|u| u.to_string())
        .map_err(|e| RetrievalError::InvalidUrl {
            url: href.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_and_absolute_links() {
        assert_eq!(
            resolve_url("https://gomos.se/en/category/schedule/", "/en/post-1/").unwrap(),
            "https://gomos.se/en/post-1/"
        );
        assert_eq!(
            resolve_url("https://a.se/x/", "https://cdn.b.se/i.jpg").unwrap(),
            "https://cdn.b.se/i.jpg"
        );
        assert!(resolve_url("not a url", "/x").is_err());
    }

    #[test]
    fn sniffs_png_signature() {
        assert_eq!(image_extension(b"\x89PNG\r\n\x1a\nrest"), ".png");
        assert_eq!(image_extension(&[0xFF, 0xD8, 0xFF]), ".jpg");
    }

    #[tokio::test]
    async fn past_deadline_fails_before_io() {
        let f = HttpFetcher::new().unwrap();
        let past = Instant::now() - Duration::from_secs(1);
        let err = f.get_bytes("http://127.0.0.1:9/", past).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Timeout { .. }));
    }
}
