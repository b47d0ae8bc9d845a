use std::io::{Cursor, Write};

use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;

use crate::track::{TrackingStep, CARRIER};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

/// Errors that can occur while rendering the feed document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A step's date column did not parse; the whole feed request fails
    /// rather than emitting an entry with a fabricated timestamp.
    #[error("Invalid event timestamp {date:?}: {source}")]
    BadTimestamp {
        date: String,
        #[source]
        source: chrono::ParseError,
    },
    /// XML writer failure.
    #[error("Failed to write feed XML: {0}")]
    Write(#[from] std::io::Error),
    /// XML event encoding failure.
    #[error("Failed to encode feed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// The writer produced non-UTF-8 output.
    #[error("Generated feed is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Everything the feed document needs besides the steps themselves.
#[derive(Debug, Clone)]
pub struct FeedMeta {
    /// Feed-level title.
    pub title: String,
    /// Canonical URL of the feed itself (`rel=self`, feed id).
    pub feed_url: String,
    /// Root URL of this service (`rel=alternate` at feed level).
    pub site_url: String,
    /// The carrier's tracking page (`rel=alternate` on every entry).
    pub page_url: String,
}

/// Renders the steps as an Atom 1.0 document, one entry per step.
///
/// Entries keep the input ordering. Entry timestamps come from the step's
/// date column, written as RFC 3339 with the carrier's local time marked
/// UTC. The feed-level `updated` is the newest entry timestamp, or the
/// Unix epoch for a feed with no entries yet. Output is a pure function
/// of its inputs: an unchanged page renders byte-identical XML.
pub fn render_feed(meta: &FeedMeta, steps: &[TrackingStep]) -> Result<String, RenderError> {
    // Resolve all timestamps before writing anything, so a malformed row
    // fails the request instead of truncating the document mid-entry.
    let mut timestamps = Vec::with_capacity(steps.len());
    for step in steps {
        let updated = step.updated().map_err(|source| RenderError::BadTimestamp {
            date: step.date.clone(),
            source,
        })?;
        timestamps.push(updated);
    }
    let feed_updated = timestamps
        .iter()
        .max()
        .copied()
        .unwrap_or(NaiveDateTime::UNIX_EPOCH);

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut feed = BytesStart::new("feed");
    feed.push_attribute(("xmlns", ATOM_NS));
    writer.write_event(Event::Start(feed))?;

    write_text_element(&mut writer, "title", &meta.title)?;
    write_text_element(&mut writer, "id", &meta.feed_url)?;
    write_text_element(&mut writer, "updated", &format_timestamp(feed_updated))?;
    write_link(&mut writer, "self", &meta.feed_url)?;
    write_link(&mut writer, "alternate", &meta.site_url)?;

    for (step, updated) in steps.iter().zip(&timestamps) {
        write_entry(&mut writer, meta, step, *updated)?;
    }

    writer.write_event(Event::End(BytesEnd::new("feed")))?;

    let bytes = writer.into_inner().into_inner();
    Ok(String::from_utf8(bytes)?)
}

fn write_entry<W: Write>(
    writer: &mut Writer<W>,
    meta: &FeedMeta,
    step: &TrackingStep,
    updated: NaiveDateTime,
) -> Result<(), RenderError> {
    writer.write_event(Event::Start(BytesStart::new("entry")))?;

    write_text_element(writer, "title", &step.title())?;
    write_text_element(writer, "id", &format!("urn:sha1:{}", step.id()))?;
    write_link(writer, "alternate", &meta.page_url)?;

    writer.write_event(Event::Start(BytesStart::new("author")))?;
    write_text_element(writer, "name", CARRIER)?;
    writer.write_event(Event::End(BytesEnd::new("author")))?;

    let stamp = format_timestamp(updated);
    write_text_element(writer, "updated", &stamp)?;
    write_text_element(writer, "published", &stamp)?;

    let mut content = BytesStart::new("content");
    content.push_attribute(("type", "text"));
    writer.write_event(Event::Start(content))?;
    writer.write_event(Event::Text(BytesText::new(&entry_content(step))))?;
    writer.write_event(Event::End(BytesEnd::new("content")))?;

    writer.write_event(Event::End(BytesEnd::new("entry")))?;
    Ok(())
}

/// Plain-text entry body: carrier, location, reason, remark.
fn entry_content(step: &TrackingStep) -> String {
    format!(
        "{} - {}\nReason: {}\nRemark: {}",
        CARRIER, step.location, step.reason, step.remark
    )
}

fn format_timestamp(stamp: NaiveDateTime) -> String {
    stamp.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), RenderError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_link<W: Write>(
    writer: &mut Writer<W>,
    rel: &str,
    href: &str,
) -> Result<(), RenderError> {
    let mut link = BytesStart::new("link");
    link.push_attribute(("rel", rel));
    link.push_attribute(("href", href));
    writer.write_event(Event::Empty(link))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn meta() -> FeedMeta {
        FeedMeta {
            title: "EMS - APPLE:EB123456789CN".to_string(),
            feed_url: "http://127.0.0.1:5000/feed".to_string(),
            site_url: "http://127.0.0.1:5000/".to_string(),
            page_url: "https://www.ems.com.cn/apple/query/EB123456789CN".to_string(),
        }
    }

    fn step(date: &str, location: &str, milestone: &str, reason: &str, remark: &str) -> TrackingStep {
        TrackingStep {
            date: date.to_string(),
            location: location.to_string(),
            milestone: milestone.to_string(),
            reason: reason.to_string(),
            remark: remark.to_string(),
        }
    }

    #[test]
    fn test_single_step_renders_expected_entry() {
        let steps = vec![step("2021-05-01 10:00", "Shanghai", "Dispatched", "", "in transit")];
        let xml = render_feed(&meta(), &steps).unwrap();

        assert!(xml.contains("<title>2021-05-01 10:00 Dispatched</title>"));
        assert!(xml.contains("<updated>2021-05-01T10:00:00Z</updated>"));
        assert!(xml.contains("<id>urn:sha1:1adf920e82da8c26a18c2497ad845abed6f9e998</id>"));

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.entries.len(), 1);
        let entry = &feed.entries[0];
        assert_eq!(
            entry.title.as_ref().unwrap().content,
            "2021-05-01 10:00 Dispatched"
        );
        assert_eq!(
            entry.authors.first().map(|a| a.name.as_str()),
            Some("EMS")
        );
        assert!(entry
            .updated
            .unwrap()
            .to_rfc3339()
            .starts_with("2021-05-01T10:00:00"));
    }

    #[test]
    fn test_zero_steps_render_valid_empty_feed() {
        let xml = render_feed(&meta(), &[]).unwrap();

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert!(feed.entries.is_empty());
        assert_eq!(
            feed.title.as_ref().unwrap().content,
            "EMS - APPLE:EB123456789CN"
        );
        // Deterministic placeholder timestamp for an event-less feed.
        assert!(xml.contains("<updated>1970-01-01T00:00:00Z</updated>"));
    }

    #[test]
    fn test_entries_preserve_step_order() {
        let steps = vec![
            step("2021-05-03 17:45", "Guangzhou", "Delivered", "", ""),
            step("2021-05-02 08:30", "Beijing", "Arrived", "", ""),
            step("2021-05-01 10:00", "Shanghai", "Dispatched", "", ""),
        ];
        let xml = render_feed(&meta(), &steps).unwrap();

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        let titles: Vec<&str> = feed
            .entries
            .iter()
            .map(|e| e.title.as_ref().unwrap().content.as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "2021-05-03 17:45 Delivered",
                "2021-05-02 08:30 Arrived",
                "2021-05-01 10:00 Dispatched",
            ]
        );
    }

    #[test]
    fn test_feed_updated_is_newest_entry_timestamp() {
        let steps = vec![
            step("2021-05-01 10:00", "Shanghai", "Dispatched", "", ""),
            step("2021-05-03 17:45", "Guangzhou", "Delivered", "", ""),
        ];
        let xml = render_feed(&meta(), &steps).unwrap();
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert!(feed
            .updated
            .unwrap()
            .to_rfc3339()
            .starts_with("2021-05-03T17:45:00"));
    }

    #[test]
    fn test_entry_content_lists_location_reason_remark() {
        let steps = vec![step("2021-05-01 10:00", "Shanghai", "Dispatched", "customs", "held")];
        let xml = render_feed(&meta(), &steps).unwrap();

        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        let body = feed.entries[0].content.as_ref().unwrap().body.as_ref().unwrap().clone();
        assert!(body.contains("EMS - Shanghai"));
        assert!(body.contains("Reason: customs"));
        assert!(body.contains("Remark: held"));
    }

    #[test]
    fn test_markup_in_cells_is_escaped() {
        let steps = vec![step(
            "2021-05-01 10:00",
            "Shanghai <hub> & port",
            "Dispatched",
            "",
            "",
        )];
        let xml = render_feed(&meta(), &steps).unwrap();
        assert!(xml.contains("Shanghai &lt;hub&gt; &amp; port"));

        // Still well-formed XML after escaping.
        let feed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(feed.entries.len(), 1);
    }

    #[test]
    fn test_malformed_date_fails_rendering() {
        let steps = vec![step("sometime in May", "Shanghai", "Dispatched", "", "")];
        match render_feed(&meta(), &steps).unwrap_err() {
            RenderError::BadTimestamp { date, .. } => assert_eq!(date, "sometime in May"),
            e => panic!("Expected BadTimestamp, got {:?}", e),
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let steps = vec![step("2021-05-01 10:00", "Shanghai", "Dispatched", "", "")];
        assert_eq!(
            render_feed(&meta(), &steps).unwrap(),
            render_feed(&meta(), &steps).unwrap()
        );
    }
}
