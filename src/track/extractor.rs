use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// One table row: the text of each cell, in cell order.
pub type Row = Vec<String>;

/// Errors that can occur while locating the status table.
///
/// `scraper` (html5ever) parses any string leniently, so a hard parse
/// failure does not happen in practice; what does fail is the structural
/// lookup when the carrier changes the page layout.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A hop of the structural path matched nothing.
    #[error("Status table not found: no {0} in page")]
    StructureNotFound(&'static str),
}

/// Locates the status table and returns its rows as cell texts.
///
/// The page has no semantic markup (no classes or ids on the rows), so
/// the only stable locator is structural position: the element with id
/// `div1`, its first descendant `table`, that table's first `tr`, the
/// row's first `td`, and the `table` nested inside that cell. The rows
/// of the nested table are the tracking events (headers included).
///
/// This lookup is inherently brittle. It lives in this one function so
/// that adapting to a markup change touches one place.
pub fn locate_status_rows(html: &str) -> Result<Vec<Row>, ExtractError> {
    let document = Html::parse_document(html);

    let container_sel = Selector::parse("#div1").expect("static selector");
    let table_sel = Selector::parse("table").expect("static selector");
    let tr_sel = Selector::parse("tr").expect("static selector");
    let td_sel = Selector::parse("td").expect("static selector");

    let container = document
        .select(&container_sel)
        .next()
        .ok_or(ExtractError::StructureNotFound("#div1 container"))?;
    let outer_table = container
        .select(&table_sel)
        .next()
        .ok_or(ExtractError::StructureNotFound("table under #div1"))?;
    let first_row = outer_table
        .select(&tr_sel)
        .next()
        .ok_or(ExtractError::StructureNotFound("row in outer table"))?;
    let cell = first_row
        .select(&td_sel)
        .next()
        .ok_or(ExtractError::StructureNotFound("cell in outer table row"))?;
    let status_table = cell
        .select(&table_sel)
        .next()
        .ok_or(ExtractError::StructureNotFound("nested status table"))?;

    let rows: Vec<Row> = status_table
        .select(&tr_sel)
        .map(|tr| tr.select(&td_sel).map(cell_text).collect())
        .collect();

    tracing::debug!(rows = rows.len(), "Located status table");
    Ok(rows)
}

/// Concatenated text content of a cell, trimmed of surrounding markup
/// whitespace.
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
