/// Static informational body for the root route.
///
/// Rendered without touching the carrier; the root route must answer
/// even when the upstream page is unreachable.
const STATUS_BODY: &str = "\
emsfeed - EMS parcel tracking as an Atom feed

This service watches a single EMS tracking number and republishes its
status history as a syndication feed. Point a feed reader at /feed;
every poll re-reads the carrier's status page, so entries appear as
soon as the carrier logs them.
";

pub fn status_page() -> &'static str {
    STATUS_BODY
}
