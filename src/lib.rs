//! Republishes one EMS parcel's tracking status as an Atom feed.
//!
//! The carrier's status page is an HTML table with no API behind it.
//! Each `/feed` request fetches that page, scrapes the table by
//! structural position, maps its rows to tracking steps, and renders
//! them as Atom. Nothing is cached or persisted between requests.

pub mod config;
pub mod render;
pub mod server;
pub mod track;
