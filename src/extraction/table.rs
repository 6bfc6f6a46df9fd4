//! Table reconstruction: headers inferred once, rows keyed positionally.

use super::navigate_and_settle;
use super::page::js_string;
use crate::error::ScrapeError;
use crate::renderer::{NavigationSpec, PageSession};
use crate::types::{normalize_text, TableRow};
use serde::Deserialize;
use tracing::debug;

/// In-page script: locate the table root, pick the header row (first row
/// containing `<th>` cells, else the first row's data cells), and return
/// every remaining row's raw cell text. The header-source row is excluded
/// from the data rows in both cases.
const COLLECT_TABLE_JS: &str = r#"(selector) => {
    const table = document.querySelector(selector);
    if (!table) return { found: false, headers: [], synthesized: false, rows: [] };
    const rows = Array.from(table.querySelectorAll('tr'));
    let headerRow = rows.find((r) => r.querySelector('th')) || null;
    let synthesized = false;
    let headerCells = [];
    if (headerRow) {
        headerCells = Array.from(headerRow.querySelectorAll('th'));
    } else if (rows.length > 0) {
        headerRow = rows[0];
        headerCells = Array.from(headerRow.querySelectorAll('td, th'));
        synthesized = true;
    }
    const cellText = (c) => (c.innerText && c.innerText.trim()) ? c.innerText : (c.textContent || '');
    const headers = headerCells.map(cellText);
    const dataRows = rows
        .filter((r) => r !== headerRow)
        .map((r) => Array.from(r.querySelectorAll('td, th')).map(cellText));
    return { found: true, headers, synthesized, rows: dataRows };
}"#;

#[derive(Debug, Deserialize)]
struct RawTable {
    found: bool,
    headers: Vec<String>,
    synthesized: bool,
    rows: Vec<Vec<String>>,
}

/// Reconstruct a table as keyed records.
///
/// An absent table root is an operation failure (`TableNotFound`), unlike
/// element extraction where zero matches is valid output.
pub async fn extract_table(
    session: &mut dyn PageSession,
    url: &str,
    table_selector: &str,
    nav: &NavigationSpec,
) -> Result<Vec<TableRow>, ScrapeError> {
    navigate_and_settle(session, url, nav).await?;

    let script = format!("({})({})", COLLECT_TABLE_JS, js_string(table_selector));
    let value = session.evaluate(&script).await?;
    let raw: RawTable = serde_json::from_value(value)
        .map_err(|e| ScrapeError::Unexpected(anyhow::anyhow!("malformed table payload: {e}")))?;

    if !raw.found {
        return Err(ScrapeError::TableNotFound {
            selector: table_selector.to_string(),
        });
    }
    if raw.synthesized {
        debug!(
            selector = table_selector,
            "no header cells; synthesized headers from the first row"
        );
    }

    let keys = infer_keys(&raw.headers);
    Ok(raw
        .rows
        .into_iter()
        .map(|cells| build_row(&keys, cells))
        .collect())
}

/// Header text becomes the column key; blank headers get positional names.
fn infer_keys(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| normalize_text(h).unwrap_or_else(|| format!("col_{i}")))
        .collect()
}

/// One data row: shared key set, absent-markers for missing trailing
/// cells, extra cells beyond the header count dropped.
fn build_row(keys: &[String], cells: Vec<String>) -> TableRow {
    let mut row = TableRow::new();
    let mut cells = cells.into_iter();
    for key in keys {
        let value = cells.next().and_then(|c| normalize_text(&c));
        row.insert(key.clone(), value);
    }
    row
}
