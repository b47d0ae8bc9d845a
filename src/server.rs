//! HTTP surface: the two routes and the error-to-response mapping.
//!
//! `GET /` answers from a constant; `GET /feed` runs the whole pipeline
//! per request. Requests may be served concurrently, but the only shared
//! values are the resolved [`Config`] and the reqwest client, both
//! read-only.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use thiserror::Error;

use crate::config::Config;
use crate::render::{self, FeedMeta, RenderError};
use crate::track::{self, ExtractError, FetchError, TrackingQuery};

pub const ATOM_CONTENT_TYPE: &str = "application/atom+xml";

/// Shared per-process state: read-only config plus the HTTP client.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    client: reqwest::Client,
}

/// Anything a feed request can fail with. The client sees an opaque 500
/// either way ("carrier is down" and "page layout changed" are not
/// distinguished), but the specific cause is logged at the boundary.
#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Feed request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "tracking feed unavailable\n",
        )
            .into_response()
    }
}

/// Builds the application router around the resolved configuration.
pub fn router(config: Config) -> anyhow::Result<Router> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")?;

    let state = AppState {
        config: Arc::new(config),
        client,
    };

    Ok(Router::new()
        .route("/", get(status))
        .route("/feed", get(feed))
        .with_state(state))
}

/// `GET /`: static informational body; never touches the carrier.
async fn status() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render::status_page(),
    )
}

/// `GET /feed`: fetch, extract, map, render. Everything is scoped to
/// this one request; a second subscriber triggers a second fetch.
async fn feed(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let config = &state.config;
    let query = TrackingQuery::new(&config.channel, &config.tracking_id);

    let page = track::fetch_status_page(&state.client, &config.base_url, &query).await?;
    let rows = track::locate_status_rows(&page)?;
    let steps = track::steps_from_rows(&rows);
    tracing::info!(
        tracking_id = %query.tracking_id,
        rows = rows.len(),
        steps = steps.len(),
        "Rebuilt tracking feed"
    );

    let meta = feed_meta(config, &query, &headers);
    let xml = render::render_feed(&meta, &steps)?;

    Ok(([(header::CONTENT_TYPE, ATOM_CONTENT_TYPE)], xml).into_response())
}

/// Reconstructs the externally visible URLs from the Host header,
/// falling back to the bind address when the client sent none.
fn feed_meta(config: &Config, query: &TrackingQuery, headers: &HeaderMap) -> FeedMeta {
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| config.bind.to_string());
    FeedMeta {
        title: query.feed_title(),
        feed_url: format!("http://{host}/feed"),
        site_url: format!("http://{host}/"),
        page_url: query.page_url(&config.base_url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    fn test_config() -> Config {
        Config::resolve(
            "EB123456789CN".to_string(),
            "apple".to_string(),
            None,
            Some("https://www.ems.com.cn".to_string()),
            FileConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_feed_meta_uses_host_header() {
        let config = test_config();
        let query = TrackingQuery::new(&config.channel, &config.tracking_id);
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "feeds.example.net:8080".parse().unwrap());

        let meta = feed_meta(&config, &query, &headers);
        assert_eq!(meta.feed_url, "http://feeds.example.net:8080/feed");
        assert_eq!(meta.site_url, "http://feeds.example.net:8080/");
        assert_eq!(
            meta.page_url,
            "https://www.ems.com.cn/apple/query/EB123456789CN"
        );
    }

    #[test]
    fn test_feed_meta_falls_back_to_bind_address() {
        let config = test_config();
        let query = TrackingQuery::new(&config.channel, &config.tracking_id);

        let meta = feed_meta(&config, &query, &HeaderMap::new());
        assert_eq!(meta.feed_url, "http://127.0.0.1:5000/feed");
    }

    #[test]
    fn test_router_builds_from_config() {
        assert!(router(test_config()).is_ok());
    }
}
