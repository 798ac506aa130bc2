use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::html;
use crate::metrics::Metrics;
use crate::store::DynStore;
use crate::tracker::{ResetOutcome, Tracker, TrackerError, EXPORT_FILENAME};
use crate::types::ProgressState;

/// Application state shared across requests.
///
/// The single mutex serializes every request, so mutations never overlap.
pub struct AppState {
    pub tracker: Mutex<Tracker<DynStore>>,
}

impl AppState {
    pub fn new(tracker: Tracker<DynStore>) -> Arc<Self> {
        Arc::new(Self {
            tracker: Mutex::new(tracker),
        })
    }
}

/// Errors returned by the JSON API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("reset requires confirm=true")]
    ResetNotConfirmed,

    #[error("export failed: {0}")]
    Export(#[source] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Tracker(
                e @ (TrackerError::WeekOutOfRange { .. } | TrackerError::TaskOutOfRange { .. }),
            ) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Tracker(e) => {
                error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            e @ ApiError::ResetNotConfirmed => (StatusCode::CONFLICT, e.to_string()),
            e @ ApiError::Export(_) => {
                error!(error = %e, "Export failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, message).into_response()
    }
}

/// Build the router with all routes
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/state", get(state_handler))
        .route("/api/metrics", get(metrics_handler))
        .route("/api/weeks/{week}/tasks/{task}", post(toggle_task_handler))
        .route("/api/weeks/{week}/toggle", post(toggle_week_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/export", get(export_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the web server on loopback
pub async fn serve(port: u16, tracker: Tracker<DynStore>) -> anyhow::Result<()> {
    let app = router(AppState::new(tracker));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(url = %format!("http://{}", addr), "Server running, press Ctrl+C to stop");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

/// Serve the main HTML page
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let tracker = state.tracker.lock().await;
    let markup = html::render_page(tracker.state(), &tracker.metrics());
    Html(markup.into_string())
}

/// Return the raw progress state as JSON
async fn state_handler(State(state): State<Arc<AppState>>) -> Json<ProgressState> {
    let tracker = state.tracker.lock().await;
    Json(tracker.state().clone())
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Json<Metrics> {
    let tracker = state.tracker.lock().await;
    Json(tracker.metrics())
}

#[derive(Debug, Deserialize)]
struct ToggleTaskBody {
    done: bool,
}

async fn toggle_task_handler(
    State(state): State<Arc<AppState>>,
    Path((week, task)): Path<(usize, usize)>,
    Json(body): Json<ToggleTaskBody>,
) -> Result<Json<Metrics>, ApiError> {
    let mut tracker = state.tracker.lock().await;
    let metrics = tracker.toggle_task(week, task, body.done)?;
    Ok(Json(metrics))
}

async fn toggle_week_handler(
    State(state): State<Arc<AppState>>,
    Path(week): Path<usize>,
) -> Result<Json<Metrics>, ApiError> {
    let mut tracker = state.tracker.lock().await;
    let metrics = tracker.toggle_week(week)?;
    Ok(Json(metrics))
}

#[derive(Debug, Deserialize)]
struct ResetParams {
    #[serde(default)]
    confirm: bool,
}

/// Reset everything; the client must have asked the user and pass `confirm=true`
async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResetParams>,
) -> Result<Json<Metrics>, ApiError> {
    let mut tracker = state.tracker.lock().await;
    match tracker.reset_all(|_| params.confirm)? {
        ResetOutcome::Reset(metrics) => Ok(Json(metrics)),
        ResetOutcome::Declined => Err(ApiError::ResetNotConfirmed),
    }
}

/// Offer the summary as a JSON file download
async fn export_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let summary = state.tracker.lock().await.export_summary();
    let body = summary.to_json().map_err(ApiError::Export)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        body,
    )
        .into_response())
}
