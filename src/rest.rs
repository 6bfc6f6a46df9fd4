// Copyright 2026 WebUnlock Contributors
// SPDX-License-Identifier: Apache-2.0

//! HTTP REST API for WebUnlock.
//!
//! Thin request validation and response shaping over the extraction core.
//! Every scraping endpoint funnels through the retry orchestrator; the
//! export endpoints are pure data transforms with no browser interaction.

use crate::error::ScrapeError;
use crate::export;
use crate::extraction;
use crate::protocol::{
    ErrorResponse, ExportBody, ScrapeBody, ScrapeResponse, ScreenshotBody, ScreenshotResponse,
    TableBody, TableResponse,
};
use crate::renderer::{NavigationSpec, Renderer, SessionConfig};
use crate::retry;
use crate::stats::{ExtractionStats, TableStats, TimingStats};
use crate::types::{ExtractionResult, Screenshot, TableRow, DEFAULT_SCREENSHOT_VIEWPORT};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared state passed to the handlers. There is no cache, queue, or
/// session pool; every request drives its own browser sessions.
pub struct AppState {
    pub renderer: Arc<dyn Renderer>,
    pub started_at: Instant,
}

/// Wrapper to assert a future is Send.
///
/// The scrape futures contain only Send types, but the compiler cannot
/// prove it due to higher-ranked lifetime bounds in transitive
/// chromiumoxide types. All concrete data crossing the await points is
/// Send, so the wrapper bypasses the overly-conservative analysis.
struct AssertSend<F>(F);

// SAFETY: The wrapped futures contain only Arc<AppState>, request structs,
// and boxed sessions, all of which are Send. The compiler's refusal stems from
// higher-ranked lifetime bounds in dependency types, not actual non-Send
// data.
unsafe impl<F: std::future::Future> Send for AssertSend<F> {}

impl<F: std::future::Future> std::future::Future for AssertSend<F> {
    type Output = F::Output;
    fn poll(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Self::Output> {
        // SAFETY: plain pin projection of the single field.
        let inner = unsafe { self.map_unchecked_mut(|s| &mut s.0) };
        inner.poll(cx)
    }
}

/// Build the axum Router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/scrape", post(handle_scrape))
        .route("/scrape/table", post(handle_table))
        .route("/screenshot", post(handle_screenshot))
        .route("/export/csv", post(handle_export_csv))
        .route("/export/json", post(handle_export_json))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the given port.
pub async fn start(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("WebUnlock listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "WebUnlock",
        "timestamp": now_timestamp(),
        "uptime_s": state.started_at.elapsed().as_secs(),
    }))
}

async fn handle_scrape(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScrapeBody>,
) -> Response {
    let started = Instant::now();
    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return error_response(&e, 0),
    };
    let url = request.url.clone();

    let outcome = spawn_scrape(Arc::clone(&state), request).await;
    let execution_time = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(data) => {
            let stats = ExtractionStats::from_result(&data, execution_time);
            let selectors = data.keys().map(str::to_string).collect();
            Json(ScrapeResponse {
                success: true,
                url,
                selectors,
                data,
                stats,
            })
            .into_response()
        }
        Err(e) => error_response(&e, execution_time),
    }
}

async fn handle_table(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TableBody>,
) -> Response {
    let started = Instant::now();
    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return error_response(&e, 0),
    };
    let url = request.url.clone();
    let table_selector = request.table_selector.clone();

    let outcome = spawn_table(Arc::clone(&state), request).await;
    let execution_time = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(data) => {
            let stats = TableStats::from_rows(&data, execution_time);
            Json(TableResponse {
                success: true,
                url,
                table_selector,
                data,
                stats,
            })
            .into_response()
        }
        Err(e) => error_response(&e, execution_time),
    }
}

async fn handle_screenshot(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScreenshotBody>,
) -> Response {
    let started = Instant::now();
    let request = match body.into_request() {
        Ok(request) => request,
        Err(e) => return error_response(&e, 0),
    };
    let url = request.url.clone();

    let outcome = spawn_screenshot(Arc::clone(&state), request).await;
    let execution_time = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(shot) => Json(ScreenshotResponse {
            success: true,
            url,
            screenshot: shot.to_data_url(),
            stats: TimingStats { execution_time },
        })
        .into_response(),
        Err(e) => error_response(&e, execution_time),
    }
}

/// Export endpoints parse the raw body themselves: the `data` payload is
/// order-sensitive and a malformed shape must come back as a clean 400.
async fn handle_export_csv(body: Bytes) -> Response {
    let body: ExportBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            return error_response(
                &ScrapeError::Validation(format!("invalid export payload: {e}")),
                0,
            )
        }
    };
    match export::to_csv(&body.data) {
        Ok(csv) => attachment(
            csv,
            "text/csv",
            &export::sanitize_filename(body.filename.as_deref()),
            "csv",
        ),
        Err(e) => error_response(&e, 0),
    }
}

async fn handle_export_json(body: Bytes) -> Response {
    let body: ExportBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            return error_response(
                &ScrapeError::Validation(format!("invalid export payload: {e}")),
                0,
            )
        }
    };
    match export::to_json(&body.data) {
        Ok(json) => attachment(
            json,
            "application/json",
            &export::sanitize_filename(body.filename.as_deref()),
            "json",
        ),
        Err(e) => error_response(&e, 0),
    }
}

// ── Orchestrated operations ─────────────────────────────────────

async fn spawn_scrape(
    state: Arc<AppState>,
    request: crate::protocol::ExtractionRequest,
) -> Result<ExtractionResult, ScrapeError> {
    let fut = AssertSend(async move {
        let config = SessionConfig {
            user_agent: request.options.user_agent.clone(),
            viewport: request.options.viewport,
        };
        let nav = NavigationSpec {
            timeout_ms: request.options.timeout,
            wait_until: request.options.wait_until,
        };
        retry::run_with_retry(
            state.renderer.as_ref(),
            &config,
            request.options.retries,
            |mut session| {
                let url = request.url.clone();
                let selectors = request.selectors.clone();
                let nav = nav.clone();
                async move {
                    let outcome =
                        extraction::page::extract(session.as_mut(), &url, &selectors, &nav).await;
                    (session, outcome)
                }
            },
        )
        .await
    });
    await_task(fut).await
}

async fn spawn_table(
    state: Arc<AppState>,
    request: crate::protocol::TableRequest,
) -> Result<Vec<TableRow>, ScrapeError> {
    let fut = AssertSend(async move {
        let config = SessionConfig {
            user_agent: request.options.user_agent.clone(),
            viewport: request.options.viewport,
        };
        let nav = NavigationSpec {
            timeout_ms: request.options.timeout,
            wait_until: request.options.wait_until,
        };
        retry::run_with_retry(
            state.renderer.as_ref(),
            &config,
            request.options.retries,
            |mut session| {
                let url = request.url.clone();
                let selector = request.table_selector.clone();
                let nav = nav.clone();
                async move {
                    let outcome =
                        extraction::table::extract_table(session.as_mut(), &url, &selector, &nav)
                            .await;
                    (session, outcome)
                }
            },
        )
        .await
    });
    await_task(fut).await
}

async fn spawn_screenshot(
    state: Arc<AppState>,
    request: crate::protocol::ScreenshotRequest,
) -> Result<Screenshot, ScrapeError> {
    let fut = AssertSend(async move {
        let config = SessionConfig {
            user_agent: request.options.user_agent.clone(),
            // distinct from the extractor: capture has a desktop default
            viewport: Some(
                request
                    .options
                    .viewport
                    .unwrap_or(DEFAULT_SCREENSHOT_VIEWPORT),
            ),
        };
        let nav = NavigationSpec {
            timeout_ms: request.options.timeout,
            wait_until: request.options.wait_until,
        };
        let full_page = request.options.full_page;
        retry::run_with_retry(
            state.renderer.as_ref(),
            &config,
            request.options.retries,
            |mut session| {
                let url = request.url.clone();
                let nav = nav.clone();
                async move {
                    let outcome =
                        extraction::screenshot::capture(session.as_mut(), &url, full_page, &nav)
                            .await;
                    (session, outcome)
                }
            },
        )
        .await
    });
    await_task(fut).await
}

/// Run an operation on its own task so a panic inside the browser driver
/// cannot take the connection handler down with it.
async fn await_task<T>(
    fut: AssertSend<impl std::future::Future<Output = Result<T, ScrapeError>> + 'static>,
) -> Result<T, ScrapeError>
where
    T: Send + 'static,
{
    tokio::task::spawn(fut)
        .await
        .unwrap_or_else(|e| Err(ScrapeError::Unexpected(anyhow::anyhow!("task panicked: {e}"))))
}

// ── Helpers ─────────────────────────────────────────────────────

fn error_response(error: &ScrapeError, execution_time: u64) -> Response {
    match error {
        ScrapeError::Validation(_) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                success: false,
                error: error.to_string(),
                execution_time: None,
            }),
        )
            .into_response(),
        _ => {
            error!(%error, "operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    success: false,
                    error: error.to_string(),
                    execution_time: Some(execution_time),
                }),
            )
                .into_response()
        }
    }
}

fn attachment(content: String, content_type: &str, stem: &str, ext: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{stem}.{ext}\""),
            ),
        ],
        content,
    )
        .into_response()
}

/// Seconds since the Unix epoch, for the health timestamp.
fn now_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
