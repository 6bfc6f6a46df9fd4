//! Chromium session manager using chromiumoxide.
//!
//! Each session launches its own isolated headless Chromium process, so
//! concurrent requests never share browser state and a corrupt session
//! can be discarded wholesale.

use super::{NavigationSpec, PageSession, Renderer, SessionConfig};
use crate::error::ScrapeError;
use crate::types::WaitUntil;
use anyhow::anyhow;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Poll interval while waiting for `document.readyState` to advance.
const READYSTATE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. WEBUNLOCK_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("WEBUNLOCK_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches one isolated headless Chromium per session.
pub struct ChromiumRenderer {
    chrome_path: PathBuf,
}

impl ChromiumRenderer {
    /// Resolve the Chromium binary. Fails when none is installed.
    pub fn discover() -> Result<Self, ScrapeError> {
        let chrome_path = find_chromium().ok_or_else(|| {
            ScrapeError::Launch(
                "Chromium not found. Install Chrome/Chromium or set WEBUNLOCK_CHROMIUM_PATH."
                    .into(),
            )
        })?;
        debug!(path = %chrome_path.display(), "resolved Chromium binary");
        Ok(Self { chrome_path })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn PageSession>, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(self.chrome_path.clone())
            .arg("--headless=new")
            // non-interactive, container-safe execution
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-zygote")
            .arg("--disable-extensions")
            .arg("--disable-background-networking");
        if let Some(vp) = config.viewport {
            builder = builder.window_size(vp.width, vp.height);
        }
        let browser_config = builder.build().map_err(ScrapeError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                teardown(browser, handler_task).await;
                return Err(ScrapeError::Launch(format!("failed to open page: {e}")));
            }
        };

        if let Some(ua) = &config.user_agent {
            let params = match SetUserAgentOverrideParams::builder().user_agent(ua).build() {
                Ok(params) => params,
                Err(e) => {
                    teardown(browser, handler_task).await;
                    return Err(ScrapeError::Launch(format!("invalid user agent: {e}")));
                }
            };
            if let Err(e) = page.execute(params).await {
                teardown(browser, handler_task).await;
                return Err(ScrapeError::Launch(format!("failed to set user agent: {e}")));
            }
        }

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
        }))
    }
}

/// Best-effort browser teardown; faults are logged, never propagated.
async fn teardown(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!("failed to close browser: {e}");
    }
    let _ = browser.wait().await;
    handler_task.abort();
}

/// A single live Chromium process plus one page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, spec: &NavigationSpec) -> Result<(), ScrapeError> {
        let page = &self.page;
        let wait_until = spec.wait_until;
        let nav = async move {
            page.goto(url)
                .await
                .map_err(|e| ScrapeError::Unexpected(anyhow!("navigation failed: {e}")))?;

            match wait_until {
                WaitUntil::Load => {
                    let _ = page.wait_for_navigation().await;
                }
                WaitUntil::DomContentLoaded => {
                    // goto usually returns past DOM parsing already, so the
                    // first probe tends to succeed immediately.
                    loop {
                        let state = page
                            .evaluate("document.readyState")
                            .await
                            .ok()
                            .and_then(|v| v.into_value::<String>().ok())
                            .unwrap_or_default();
                        if state != "loading" {
                            break;
                        }
                        tokio::time::sleep(READYSTATE_POLL_INTERVAL).await;
                    }
                }
            }
            Ok(())
        };

        match tokio::time::timeout(Duration::from_millis(spec.timeout_ms), nav).await {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms: spec.timeout_ms,
            }),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScrapeError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScrapeError::Unexpected(anyhow!("script evaluation failed: {e}")))?;
        result
            .into_value()
            .map_err(|e| ScrapeError::Unexpected(anyhow!("failed to convert script result: {e:?}")))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, ScrapeError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        self.page
            .screenshot(params)
            .await
            .map_err(|e| ScrapeError::Unexpected(anyhow!("screenshot capture failed: {e}")))
    }

    async fn close(self: Box<Self>) {
        let ChromiumSession {
            mut browser,
            page,
            handler_task,
        } = *self;
        if let Err(e) = page.close().await {
            warn!("failed to close page: {e}");
        }
        if let Err(e) = browser.close().await {
            warn!("failed to close browser: {e}");
        }
        let _ = browser.wait().await;
        handler_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Viewport;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn navigate_and_evaluate_on_data_url() {
        let renderer = ChromiumRenderer::discover().expect("chromium not found");
        let config = SessionConfig {
            user_agent: None,
            viewport: Some(Viewport {
                width: 800,
                height: 600,
            }),
        };
        let mut session = renderer
            .new_session(&config)
            .await
            .expect("failed to open session");

        session
            .navigate(
                "data:text/html,<h1>Hello</h1><p>World</p>",
                &NavigationSpec {
                    timeout_ms: 10_000,
                    wait_until: WaitUntil::DomContentLoaded,
                },
            )
            .await
            .expect("navigation failed");

        let value = session
            .evaluate("document.querySelector('h1').textContent")
            .await
            .expect("evaluation failed");
        assert_eq!(value.as_str(), Some("Hello"));

        let png = session.screenshot(false).await.expect("screenshot failed");
        assert!(!png.is_empty());

        session.close().await;
    }
}
