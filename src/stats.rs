//! Summary statistics over extraction output.

use crate::types::{ExtractionResult, TableRow};
use serde::Serialize;

/// Stats for a multi-selector extraction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionStats {
    pub total_selectors: usize,
    pub total_elements: usize,
    /// Wall-clock time of the whole operation in milliseconds, retries
    /// included.
    pub execution_time: u64,
}

impl ExtractionStats {
    pub fn from_result(result: &ExtractionResult, execution_time: u64) -> Self {
        Self {
            total_selectors: result.len(),
            total_elements: result.iter().map(|(_, records)| records.len()).sum(),
            execution_time,
        }
    }
}

/// Stats for a table reconstruction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    pub total_rows: usize,
    pub execution_time: u64,
}

impl TableStats {
    pub fn from_rows(rows: &[TableRow], execution_time: u64) -> Self {
        Self {
            total_rows: rows.len(),
            execution_time,
        }
    }
}

/// Timing-only stats (screenshot capture).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingStats {
    pub execution_time: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementRecord;

    #[test]
    fn extraction_stats_count_selectors_and_elements() {
        let mut result = ExtractionResult::new();
        result.insert(
            "p",
            vec![
                ElementRecord {
                    text: Some("a".into()),
                    attributes: None,
                },
                ElementRecord {
                    text: Some("b".into()),
                    attributes: None,
                },
            ],
        );
        result.insert(".missing", Vec::new());

        let stats = ExtractionStats::from_result(&result, 120);
        assert_eq!(stats.total_selectors, 2);
        assert_eq!(stats.total_elements, 2);
        assert_eq!(stats.execution_time, 120);
    }

    #[test]
    fn stats_use_camel_case_on_the_wire() {
        let stats = TableStats {
            total_rows: 3,
            execution_time: 42,
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalRows"], 3);
        assert_eq!(json["executionTime"], 42);
    }
}
