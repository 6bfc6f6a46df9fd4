//! Multi-selector element extraction.

use super::navigate_and_settle;
use crate::error::ScrapeError;
use crate::renderer::{NavigationSpec, PageSession};
use crate::types::{normalize_text, ElementRecord, ExtractionResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Upper bound on waiting for a selector's first match. A miss does not
/// abort the operation: content may exist but satisfy the waiter late, so
/// the query runs regardless.
const SELECTOR_WAIT: Duration = Duration::from_millis(5_000);

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// In-page script: collect raw text and attributes for every match.
///
/// Text priority: rendered text, then full text content, then form value.
/// Attributes: fixed common set plus every `data-*`. Normalization happens
/// on the Rust side.
const COLLECT_ELEMENTS_JS: &str = r#"(selector) => {
    const els = Array.from(document.querySelectorAll(selector));
    return els.map((el) => {
        let text = null;
        if (el.innerText && el.innerText.trim()) text = el.innerText;
        else if (el.textContent && el.textContent.trim()) text = el.textContent;
        else if ('value' in el && el.value != null && String(el.value).trim()) text = String(el.value);
        const attrs = {};
        for (const name of ['href', 'src', 'alt', 'class', 'id', 'title']) {
            const v = el.getAttribute(name);
            if (v !== null) attrs[name] = v;
        }
        for (const a of Array.from(el.attributes)) {
            if (a.name.startsWith('data-')) attrs[a.name] = a.value;
        }
        return { text, attrs };
    });
}"#;

#[derive(Debug, Deserialize)]
struct RawElement {
    text: Option<String>,
    #[serde(default)]
    attrs: BTreeMap<String, String>,
}

/// Extract records for every selector, keyed in first-occurrence order.
///
/// Duplicate selectors collapse to one key. A selector matching nothing
/// yields an empty sequence under its key, never an error; that signal is
/// left to the caller's statistics.
pub async fn extract(
    session: &mut dyn PageSession,
    url: &str,
    selectors: &[String],
    nav: &NavigationSpec,
) -> Result<ExtractionResult, ScrapeError> {
    navigate_and_settle(session, url, nav).await?;

    let mut result = ExtractionResult::new();
    for selector in selectors {
        if result.contains_key(selector) {
            continue;
        }
        wait_for_selector(session, selector).await;
        let records = collect(session, selector).await?;
        result.insert(selector.clone(), records);
    }
    Ok(result)
}

/// Poll until the selector matches at least once, bounded by
/// [`SELECTOR_WAIT`]. Evaluation faults count as "not yet" here; the main
/// query surfaces them.
async fn wait_for_selector(session: &dyn PageSession, selector: &str) {
    let probe = format!("!!document.querySelector({})", js_string(selector));
    let deadline = tokio::time::Instant::now() + SELECTOR_WAIT;
    loop {
        if let Ok(value) = session.evaluate(&probe).await {
            if value.as_bool() == Some(true) {
                return;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            debug!(selector, "selector did not appear within the wait window");
            return;
        }
        tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
    }
}

async fn collect(
    session: &dyn PageSession,
    selector: &str,
) -> Result<Vec<ElementRecord>, ScrapeError> {
    let script = format!("({})({})", COLLECT_ELEMENTS_JS, js_string(selector));
    let value = session.evaluate(&script).await?;
    let raw: Vec<RawElement> = serde_json::from_value(value).map_err(|e| {
        ScrapeError::Unexpected(anyhow::anyhow!("malformed extraction payload: {e}"))
    })?;
    Ok(raw.into_iter().map(into_record).collect())
}

/// Empty text and empty attribute maps become absent-markers.
fn into_record(raw: RawElement) -> ElementRecord {
    ElementRecord {
        text: raw.text.as_deref().and_then(normalize_text),
        attributes: if raw.attrs.is_empty() {
            None
        } else {
            Some(raw.attrs)
        },
    }
}

/// Quote a string for injection into a script argument position.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}
