//! Page screenshot capture.

use super::navigate_and_settle;
use crate::error::ScrapeError;
use crate::renderer::{NavigationSpec, PageSession};
use crate::types::Screenshot;

/// Capture the rendered page as a PNG.
///
/// The viewport is applied at session acquisition; `full_page` extends the
/// capture to the entire scrollable document height. No retry logic lives
/// here; callers compose with the retry orchestrator.
pub async fn capture(
    session: &mut dyn PageSession,
    url: &str,
    full_page: bool,
    nav: &NavigationSpec,
) -> Result<Screenshot, ScrapeError> {
    navigate_and_settle(session, url, nav).await?;
    let data = session.screenshot(full_page).await?;
    Ok(Screenshot { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::FakeSession;
    use crate::types::WaitUntil;

    #[tokio::test(start_paused = true)]
    async fn returns_the_captured_bytes() {
        let mut session = FakeSession::ok(Vec::new());
        session.image = vec![0x89, 0x50, 0x4e, 0x47];
        let shot = capture(
            &mut session,
            "https://example.com",
            false,
            &NavigationSpec {
                timeout_ms: 10_000,
                wait_until: WaitUntil::DomContentLoaded,
            },
        )
        .await
        .unwrap();
        assert_eq!(shot.data, vec![0x89, 0x50, 0x4e, 0x47]);
        assert!(shot.to_data_url().starts_with("data:image/png;base64,"));
    }
}
