use thiserror::Error;
use url::Url;

use super::TrackingQuery;

/// Upper bound on the status page body. The real page is a few dozen
/// kilobytes; anything bigger is not the page we expect.
const MAX_PAGE_SIZE: u64 = 2 * 1024 * 1024;

/// Errors that can occur while fetching the carrier's status page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, read).
    #[error("Request failed: {0}")]
    Network(reqwest::Error),
    /// HTTP response with non-2xx status code.
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the client's configured timeout.
    #[error("Request timed out")]
    Timeout,
    /// Response advertised a body over the size limit.
    #[error("Response too large")]
    ResponseTooLarge,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    }
}

/// Fetches the tracking status page for one query.
///
/// Issues a single GET to `<base>/<channel>/query/<tracking-id>`; a
/// failed attempt is not retried and responses are never cached. The
/// body is decoded honoring the charset declared in the response
/// `Content-Type`, falling back to UTF-8.
pub async fn fetch_status_page(
    client: &reqwest::Client,
    base_url: &Url,
    query: &TrackingQuery,
) -> Result<String, FetchError> {
    let url = query.page_url(base_url);
    let response = client.get(&url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_PAGE_SIZE {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let body = response.text().await?;
    tracing::debug!(url = %url, bytes = body.len(), "Fetched status page");
    Ok(body)
}
