//! Extraction operations over a live page session.
//!
//! All three operations share one navigation contract: go to the target,
//! gate on the readiness criterion, then allow a short settle delay before
//! touching the DOM. The delay is a pragmatic affordance for JS-rendered
//! pages; there is no hard guarantee all content has settled.

pub mod page;
pub mod screenshot;
pub mod table;

use crate::error::ScrapeError;
use crate::renderer::{NavigationSpec, PageSession};
use std::time::Duration;

/// Grace period after navigation before the DOM is queried.
pub(crate) const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Navigate and let client-side rendering settle.
pub(crate) async fn navigate_and_settle(
    session: &mut dyn PageSession,
    url: &str,
    nav: &NavigationSpec,
) -> Result<(), ScrapeError> {
    session.navigate(url, nav).await?;
    tokio::time::sleep(SETTLE_DELAY).await;
    Ok(())
}
