//! HTTP wire types: request bodies, validation, response shapes.
//!
//! Bodies mirror what the front-end submits; validation turns them into
//! the core's request types or a `Validation` error, which the REST layer
//! maps to HTTP 400.

use crate::error::ScrapeError;
use crate::stats::{ExtractionStats, TableStats, TimingStats};
use crate::types::{ExtractionResult, ScrapeOptions, TableRow};
use serde::{Deserialize, Serialize};

/// `selector`-ish fields arrive as a single string or an array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Body of `POST /scrape`. Both `selector` and `selectors` are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScrapeBody {
    pub url: Option<String>,
    pub selector: Option<String>,
    pub selectors: Option<OneOrMany>,
    pub options: ScrapeOptions,
}

/// A validated extraction request. The selector list may still contain
/// duplicates; the extractor collapses them to one key each.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub url: String,
    pub selectors: Vec<String>,
    pub options: ScrapeOptions,
}

impl ScrapeBody {
    pub fn into_request(self) -> Result<ExtractionRequest, ScrapeError> {
        let url = validate_url(self.url)?;

        let mut selectors: Vec<String> = Vec::new();
        if let Some(one) = self.selector {
            selectors.push(one);
        }
        if let Some(more) = self.selectors {
            selectors.extend(more.into_vec());
        }
        let selectors: Vec<String> = selectors
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if selectors.is_empty() {
            return Err(ScrapeError::Validation(
                "missing required field: selector or selectors".into(),
            ));
        }

        Ok(ExtractionRequest {
            url,
            selectors,
            options: self.options,
        })
    }
}

/// Body of `POST /scrape/table`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableBody {
    pub url: Option<String>,
    pub table_selector: Option<String>,
    pub options: ScrapeOptions,
}

#[derive(Debug, Clone)]
pub struct TableRequest {
    pub url: String,
    pub table_selector: String,
    pub options: ScrapeOptions,
}

impl TableBody {
    pub fn into_request(self) -> Result<TableRequest, ScrapeError> {
        let url = validate_url(self.url)?;
        let table_selector = self
            .table_selector
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ScrapeError::Validation("missing required field: tableSelector".into())
            })?;
        Ok(TableRequest {
            url,
            table_selector,
            options: self.options,
        })
    }
}

/// Body of `POST /screenshot`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScreenshotBody {
    pub url: Option<String>,
    pub options: ScrapeOptions,
}

#[derive(Debug, Clone)]
pub struct ScreenshotRequest {
    pub url: String,
    pub options: ScrapeOptions,
}

impl ScreenshotBody {
    pub fn into_request(self) -> Result<ScreenshotRequest, ScrapeError> {
        Ok(ScreenshotRequest {
            url: validate_url(self.url)?,
            options: self.options,
        })
    }
}

/// Body of `POST /export/csv` and `POST /export/json`: a previously
/// returned `data` payload plus an optional download filename stem.
#[derive(Debug, Deserialize)]
pub struct ExportBody {
    pub data: crate::export::ExportData,
    #[serde(default)]
    pub filename: Option<String>,
}

fn validate_url(url: Option<String>) -> Result<String, ScrapeError> {
    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ScrapeError::Validation("missing required field: url".into()))?;
    let parsed = url::Url::parse(&url)
        .map_err(|e| ScrapeError::Validation(format!("invalid url: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScrapeError::Validation(format!(
            "unsupported url scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(url)
}

// ── Response shapes ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub url: String,
    pub selectors: Vec<String>,
    pub data: ExtractionResult,
    pub stats: ExtractionStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse {
    pub success: bool,
    pub url: String,
    pub table_selector: String,
    pub data: Vec<TableRow>,
    pub stats: TableStats,
}

#[derive(Debug, Serialize)]
pub struct ScreenshotResponse {
    pub success: bool,
    pub url: String,
    /// Inline `data:image/png;base64,...` URL.
    pub screenshot: String,
    pub stats: TimingStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}
