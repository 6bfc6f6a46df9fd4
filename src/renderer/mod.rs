//! Browser engine abstraction.
//!
//! Defines the `Renderer` and `PageSession` traits that keep the engine
//! opaque to the extraction layer: launch a session, navigate, query the
//! DOM, capture a screenshot. A session is one isolated browser process
//! plus a navigable page, owned exclusively by one attempt of one request.

pub mod chromium;

use crate::error::ScrapeError;
use crate::types::{Viewport, WaitUntil};
use async_trait::async_trait;

/// Session-level configuration applied at acquisition time.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
}

/// How a navigation decides it is complete.
#[derive(Debug, Clone)]
pub struct NavigationSpec {
    pub timeout_ms: u64,
    pub wait_until: WaitUntil,
}

/// A browser engine that can open isolated page sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Acquire a fresh session. Sessions are never shared or reused across
    /// attempts; a failed session is assumed corrupt and torn down.
    async fn new_session(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn PageSession>, ScrapeError>;
}

/// One live page in one isolated browser process.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to `url`, gated on the readiness criterion and bounded by
    /// the navigation timeout.
    async fn navigate(&mut self, url: &str, spec: &NavigationSpec) -> Result<(), ScrapeError>;

    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScrapeError>;

    /// Capture a PNG of the viewport, or the full scrollable document when
    /// `full_page` is set.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, ScrapeError>;

    /// Tear the session down. Teardown faults are logged and swallowed;
    /// they must never mask the outcome of the operation that used the
    /// session, so the signature is infallible.
    async fn close(self: Box<Self>);
}

/// Renderer used when no Chromium binary is available. Every acquisition
/// fails with a launch error; the HTTP surface stays up (health, exports).
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_session(
        &self,
        _config: &SessionConfig,
    ) -> Result<Box<dyn PageSession>, ScrapeError> {
        Err(ScrapeError::Launch("browser engine not available".into()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted renderer and session for orchestration tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    pub(crate) struct FakeSession {
        /// Error returned by the next navigate call, if any.
        pub navigate_error: Option<ScrapeError>,
        /// Whether selector-presence probes report a match.
        pub selector_present: bool,
        /// Values returned by successive non-probe evaluate calls.
        pub payloads: Mutex<VecDeque<serde_json::Value>>,
        /// Bytes returned by screenshot.
        pub image: Vec<u8>,
        closed: Arc<AtomicUsize>,
    }

    impl FakeSession {
        pub fn ok(payloads: Vec<serde_json::Value>) -> Self {
            Self {
                navigate_error: None,
                selector_present: true,
                payloads: Mutex::new(payloads.into()),
                image: Vec::new(),
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn failing_navigation(error: ScrapeError) -> Self {
            Self {
                navigate_error: Some(error),
                ..Self::ok(Vec::new())
            }
        }
    }

    #[async_trait]
    impl PageSession for FakeSession {
        async fn navigate(&mut self, _url: &str, _spec: &NavigationSpec) -> Result<(), ScrapeError> {
            match self.navigate_error.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScrapeError> {
            if script.starts_with("!!document.querySelector") {
                return Ok(serde_json::Value::Bool(self.selector_present));
            }
            self.payloads
                .lock()
                .expect("payload lock")
                .pop_front()
                .ok_or_else(|| {
                    ScrapeError::Unexpected(anyhow::anyhow!("no scripted payload for: {script}"))
                })
        }

        async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>, ScrapeError> {
            Ok(self.image.clone())
        }

        async fn close(self: Box<Self>) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Renderer handing out pre-scripted sessions in order. `Err` entries
    /// simulate launch failures.
    pub(crate) struct FakeRenderer {
        sessions: Mutex<VecDeque<Result<FakeSession, ScrapeError>>>,
        acquired: AtomicUsize,
        closed: Arc<AtomicUsize>,
    }

    impl FakeRenderer {
        pub fn new(sessions: Vec<Result<FakeSession, ScrapeError>>) -> Self {
            let closed = Arc::new(AtomicUsize::new(0));
            let sessions = sessions
                .into_iter()
                .map(|s| {
                    s.map(|mut session| {
                        session.closed = Arc::clone(&closed);
                        session
                    })
                })
                .collect();
            Self {
                sessions: Mutex::new(sessions),
                acquired: AtomicUsize::new(0),
                closed,
            }
        }

        /// Total sessions handed out (including failed launches).
        pub fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }

        /// Total sessions closed by the caller.
        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn new_session(
            &self,
            _config: &SessionConfig,
        ) -> Result<Box<dyn PageSession>, ScrapeError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            match self.sessions.lock().expect("session lock").pop_front() {
                Some(Ok(session)) => Ok(Box::new(session)),
                Some(Err(e)) => Err(e),
                None => Err(ScrapeError::Launch("no scripted sessions remain".into())),
            }
        }
    }
}
