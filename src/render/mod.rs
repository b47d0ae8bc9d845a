//! Output rendering: the Atom document for `/feed` and the plain-text
//! body for `/`.

mod atom;
mod status;

pub use atom::{render_feed, FeedMeta, RenderError};
pub use status::status_page;
