//! CSV/JSON export transforms over previously returned `data` payloads.
//!
//! No browser interaction happens here, just data shaping. The CSV layout
//! branches on the payload kind: a flat row array (table result) keeps its
//! column keys; a selector-keyed map (extraction result) flattens to
//! `selector,index,text,attributes`.

use crate::error::ScrapeError;
use crate::types::{ExtractionResult, TableRow};
use serde::{Deserialize, Serialize};

/// A previously returned `data` payload, re-submitted for export.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportData {
    /// Table result: flat array of keyed rows.
    Rows(Vec<TableRow>),
    /// Extraction result: selector-keyed map of element records.
    Extraction(ExtractionResult),
}

pub fn to_csv(data: &ExportData) -> Result<String, ScrapeError> {
    match data {
        ExportData::Extraction(map) => Ok(extraction_to_csv(map)),
        ExportData::Rows(rows) => rows_to_csv(rows),
    }
}

pub fn to_json(data: &ExportData) -> Result<String, ScrapeError> {
    serde_json::to_string_pretty(data)
        .map_err(|e| ScrapeError::Unexpected(anyhow::anyhow!("failed to encode export: {e}")))
}

fn extraction_to_csv(map: &ExtractionResult) -> String {
    let mut lines = vec![csv_line(["selector", "index", "text", "attributes"])];
    for (selector, records) in map.iter() {
        for (index, record) in records.iter().enumerate() {
            let attrs = record
                .attributes
                .as_ref()
                .and_then(|a| serde_json::to_string(a).ok())
                .unwrap_or_default();
            lines.push(csv_line([
                selector.to_string(),
                index.to_string(),
                record.text.clone().unwrap_or_default(),
                attrs,
            ]));
        }
    }
    lines.join("\n") + "\n"
}

fn rows_to_csv(rows: &[TableRow]) -> Result<String, ScrapeError> {
    // Column layout comes from the first row; every row of one table
    // shares the same key set by construction.
    let first = rows
        .first()
        .ok_or_else(|| ScrapeError::Validation("no rows to export".into()))?;
    let keys: Vec<&str> = first.keys().collect();

    let mut lines = vec![csv_line(keys.iter().copied())];
    for row in rows {
        lines.push(csv_line(keys.iter().map(|k| {
            row.get(k)
                .and_then(|cell| cell.as_deref())
                .unwrap_or_default()
        })));
    }
    Ok(lines.join("\n") + "\n")
}

/// Join fields into one CSV line, every field double-quote-escaped.
fn csv_line<I>(fields: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Sanitize a client-supplied filename stem for the download header.
pub fn sanitize_filename(name: Option<&str>) -> String {
    let stem = name.unwrap_or("webunlock-export");
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if cleaned.is_empty() {
        "webunlock-export".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementRecord;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn sample_extraction() -> ExtractionResult {
        let mut map = ExtractionResult::new();
        map.insert(
            "p",
            vec![
                ElementRecord {
                    text: Some("First".into()),
                    attributes: None,
                },
                ElementRecord {
                    text: Some(r#"He said "hi""#.into()),
                    attributes: Some(BTreeMap::from([("class".to_string(), "x".to_string())])),
                },
            ],
        );
        map
    }

    #[test]
    fn extraction_csv_is_header_plus_one_line_per_record() {
        let data = ExportData::Extraction(sample_extraction());
        let csv = to_csv(&data).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], r#""selector","index","text","attributes""#);
        assert_eq!(lines[1], r#""p","0","First","""#);
        // embedded quotes are doubled
        assert_eq!(
            lines[2],
            r#""p","1","He said ""hi""","{""class"":""x""}""#
        );
    }

    #[test]
    fn table_csv_uses_the_row_keys_as_columns() {
        // parsed from text so the column order survives the trip
        let rows: Vec<TableRow> = serde_json::from_str(
            r#"[{"Name":"Ana","Age":"30"},{"Name":"Bo","Age":null}]"#,
        )
        .unwrap();
        let csv = to_csv(&ExportData::Rows(rows)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], r#""Name","Age""#);
        assert_eq!(lines[1], r#""Ana","30""#);
        // absent cells export as empty fields
        assert_eq!(lines[2], r#""Bo","""#);
    }

    #[test]
    fn exporting_an_empty_row_array_is_a_validation_error() {
        let result = to_csv(&ExportData::Rows(Vec::new()));
        assert!(matches!(result, Err(ScrapeError::Validation(_))));
    }

    #[test]
    fn export_data_branches_on_payload_shape() {
        let rows: ExportData = serde_json::from_value(json!([{ "a": "1" }])).unwrap();
        assert!(matches!(rows, ExportData::Rows(_)));

        let map: ExportData =
            serde_json::from_value(json!({ "p": [{ "text": "x", "attributes": null }] }))
                .unwrap();
        assert!(matches!(map, ExportData::Extraction(_)));

        assert!(serde_json::from_value::<ExportData>(json!(42)).is_err());
    }

    #[test]
    fn json_export_round_trips_the_payload() {
        let data = ExportData::Extraction(sample_extraction());
        let encoded = to_json(&data).unwrap();
        let reparsed: ExportData = serde_json::from_str(&encoded).unwrap();
        assert!(matches!(reparsed, ExportData::Extraction(map) if map.len() == 1));
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename(None), "webunlock-export");
        assert_eq!(sanitize_filename(Some("report-2024")), "report-2024");
        assert_eq!(sanitize_filename(Some("../../etc/passwd")), "....etcpasswd");
        assert_eq!(sanitize_filename(Some("\"/\\")), "webunlock-export");
    }
}
