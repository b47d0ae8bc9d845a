//! The scrape-to-event pipeline for one tracking query.
//!
//! Three stages, each a pure step over the previous one's output:
//!
//! - [`fetcher`] - one HTTP GET for the carrier's status page
//! - [`extractor`] - structural lookup of the status table rows
//! - [`steps`] - raw rows mapped into typed [`TrackingStep`] records
//!
//! Every feed request runs the whole pipeline from scratch; nothing is
//! cached or shared between requests.

mod extractor;
mod fetcher;
mod steps;

pub use extractor::{locate_status_rows, ExtractError, Row};
pub use fetcher::{fetch_status_page, FetchError};
pub use steps::{steps_from_rows, TrackingStep, CARRIER, DATE_FORMAT};

use url::Url;

/// One tracking lookup: which channel to query for which parcel.
///
/// Built fresh per feed request from the process configuration and
/// discarded after rendering; never persisted.
#[derive(Debug, Clone)]
pub struct TrackingQuery {
    /// Carrier/product code segment of the query URL, e.g. `"apple"`.
    pub channel: String,
    /// The parcel identifier being tracked.
    pub tracking_id: String,
}

impl TrackingQuery {
    pub fn new(channel: &str, tracking_id: &str) -> Self {
        Self {
            channel: channel.to_string(),
            tracking_id: tracking_id.to_string(),
        }
    }

    /// The carrier's tracking page URL for this query,
    /// `<base>/<channel>/query/<tracking-id>`.
    pub fn page_url(&self, base_url: &Url) -> String {
        format!(
            "{}/{}/query/{}",
            base_url.as_str().trim_end_matches('/'),
            self.channel,
            self.tracking_id
        )
    }

    /// Display title for the feed, e.g. `EMS - APPLE:EB123456789CN`.
    pub fn feed_title(&self) -> String {
        format!(
            "{} - {}:{}",
            CARRIER,
            self.channel.to_uppercase(),
            self.tracking_id
        )
    }
}
