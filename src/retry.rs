//! Retry orchestration: bounded attempts over fresh browser sessions.
//!
//! One logical request moves Idle -> Attempting -> {Success, RetryPending,
//! Exhausted}, expressed as a loop with an owned per-iteration session so
//! no nullable shared handle exists. Sessions are never reused across
//! attempts; a failed session is assumed corrupt and torn down before the
//! backoff.

use crate::error::ScrapeError;
use crate::renderer::{PageSession, Renderer, SessionConfig};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Linear backoff unit: the wait before attempt i+1 is `BACKOFF_UNIT * i`.
const BACKOFF_UNIT: Duration = Duration::from_millis(1000);

/// Run `op` with up to `retries` additional attempts beyond the first.
///
/// Every attempt acquires a fresh session and releases it on every exit
/// path; the operation hands the session back alongside its outcome so
/// teardown cannot be skipped. Success short-circuits remaining attempts,
/// a non-retryable error aborts immediately, and exhaustion reports the
/// error that triggered it.
pub async fn run_with_retry<T, F, Fut>(
    renderer: &dyn Renderer,
    config: &SessionConfig,
    retries: u32,
    mut op: F,
) -> Result<T, ScrapeError>
where
    F: FnMut(Box<dyn PageSession>) -> Fut,
    Fut: Future<Output = (Box<dyn PageSession>, Result<T, ScrapeError>)>,
{
    let mut attempts_made: u32 = 0;
    loop {
        attempts_made += 1;
        debug!(attempt = attempts_made, "starting attempt");

        let outcome = match renderer.new_session(config).await {
            Ok(session) => {
                let (session, outcome) = op(session).await;
                session.close().await;
                outcome
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempts_made > retries {
                    warn!(attempts = attempts_made, error = %e, "retry budget exhausted");
                    return Err(e);
                }
                let delay = BACKOFF_UNIT * attempts_made;
                warn!(
                    attempt = attempts_made,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::testing::{FakeRenderer, FakeSession};
    use crate::renderer::NavigationSpec;
    use crate::types::WaitUntil;

    fn nav_timeout() -> ScrapeError {
        ScrapeError::NavigationTimeout {
            url: "https://example.com".into(),
            timeout_ms: 10,
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let renderer = FakeRenderer::new(vec![Ok(FakeSession::ok(Vec::new()))]);
        let result = run_with_retry(&renderer, &SessionConfig::default(), 3, |session| async move {
            (session, Ok::<_, ScrapeError>(7))
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(renderer.acquired(), 1);
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_bounds_total_attempts_and_every_session_is_released() {
        let renderer = FakeRenderer::new(vec![
            Ok(FakeSession::failing_navigation(nav_timeout())),
            Ok(FakeSession::failing_navigation(nav_timeout())),
            Ok(FakeSession::failing_navigation(nav_timeout())),
        ]);
        let spec = NavigationSpec {
            timeout_ms: 10,
            wait_until: WaitUntil::DomContentLoaded,
        };
        let result: Result<(), _> =
            run_with_retry(&renderer, &SessionConfig::default(), 2, |mut session| {
                let spec = spec.clone();
                async move {
                    let outcome = session.navigate("https://example.com", &spec).await;
                    (session, outcome)
                }
            })
            .await;

        assert!(matches!(result, Err(ScrapeError::NavigationTimeout { .. })));
        // retries = 2 means exactly 3 total session acquisitions
        assert_eq!(renderer.acquired(), 3);
        assert_eq!(renderer.closed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_linear_in_attempts_made() {
        let renderer = FakeRenderer::new(vec![
            Err(ScrapeError::Launch("boom".into())),
            Err(ScrapeError::Launch("boom".into())),
            Ok(FakeSession::ok(Vec::new())),
        ]);
        let start = tokio::time::Instant::now();
        let result = run_with_retry(&renderer, &SessionConfig::default(), 5, |session| async move {
            (session, Ok::<_, ScrapeError>(()))
        })
        .await;

        assert!(result.is_ok());
        // 1000ms after the first failure, 2000ms after the second
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
        assert_eq!(renderer.acquired(), 3);
        // launch failures never produced a session to close
        assert_eq!(renderer.closed(), 1);
    }

    #[tokio::test]
    async fn zero_budget_means_a_single_attempt() {
        let renderer = FakeRenderer::new(vec![Err(ScrapeError::Launch("boom".into()))]);
        let result: Result<(), _> =
            run_with_retry(&renderer, &SessionConfig::default(), 0, |session| async move {
                (session, Ok(()))
            })
            .await;
        assert!(matches!(result, Err(ScrapeError::Launch(_))));
        assert_eq!(renderer.acquired(), 1);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let renderer = FakeRenderer::new(vec![
            Ok(FakeSession::ok(Vec::new())),
            Ok(FakeSession::ok(Vec::new())),
        ]);
        let result: Result<(), _> =
            run_with_retry(&renderer, &SessionConfig::default(), 3, |session| async move {
                (session, Err(ScrapeError::Validation("bad".into())))
            })
            .await;
        assert!(matches!(result, Err(ScrapeError::Validation(_))));
        assert_eq!(renderer.acquired(), 1);
        assert_eq!(renderer.closed(), 1);
    }
}
