use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use serde::Serialize;
use tracing::{debug, info, warn};

use pm_stream::{handle_ws_stream, SignalWindow, StreamFrame};

use crate::state::app_state::AppState;

#[derive(Serialize)]
pub struct SignalSummary {
    pub id: String,
    pub label: String,
    pub unit: String,
    pub threshold: f64,
    pub samples: usize,
    pub latest: Option<f64>,
    /// Latest value at the signal's display precision
    pub display: Option<String>,
    pub over_threshold: bool,
}

impl From<&SignalWindow> for SignalSummary {
    fn from(window: &SignalWindow) -> Self {
        let latest = window.samples.latest();
        Self {
            id: window.id.clone(),
            label: window.label.clone(),
            unit: window.unit.clone(),
            threshold: window.threshold,
            samples: window.samples.len(),
            latest: latest.map(|s| s.value),
            display: window.format_latest(),
            over_threshold: latest.is_some_and(|s| s.exceeds_threshold()),
        }
    }
}

#[derive(Serialize)]
pub struct StreamStatus {
    pub state: &'static str,
    pub paused: bool,
    pub frame: StreamFrame,
}

/// =======================
/// ROUTER
/// =======================

pub fn stream_routes(state: AppState) -> Router {
    Router::new()
        .route("/signals", get(list_signals))
        .route("/signals/{id}/window", get(signal_window))
        .route("/stream", get(stream_status))
        .route("/stream/pause", post(pause_stream))
        .route("/stream/resume", post(resume_stream))
        .route("/stream/ws", get(ws_stream))
        .with_state(state)
}

/// =======================
/// HANDLERS
/// =======================

async fn list_signals(State(state): State<AppState>) -> impl IntoResponse {
    let frame = state.stream.snapshot();
    let signals: Vec<SignalSummary> = frame.windows.iter().map(SignalSummary::from).collect();
    Json(signals)
}

async fn signal_window(State(state): State<AppState>, Path(signal_id): Path<String>) -> Response {
    let frame = state.stream.snapshot();
    match frame.window(&signal_id) {
        Some(window) => Json(window).into_response(),
        None => {
            debug!("Signal not found: {}", signal_id);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn status_of(state: &AppState) -> StreamStatus {
    StreamStatus {
        state: state.stream.run_state().as_str(),
        paused: state.stream.is_paused(),
        frame: state.stream.snapshot().as_ref().clone(),
    }
}

async fn stream_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(status_of(&state))
}

async fn pause_stream(State(state): State<AppState>) -> impl IntoResponse {
    state.stream.pause();
    Json(status_of(&state))
}

async fn resume_stream(State(state): State<AppState>) -> impl IntoResponse {
    state.stream.resume();
    Json(status_of(&state))
}

async fn ws_stream(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.stream.is_torn_down() {
        warn!("ws requested on a stopped stream");
        return StatusCode::GONE.into_response();
    }

    info!("ws subscriber connected to stream {}", state.stream.id());
    let subscription = state.stream.subscribe();
    ws.on_upgrade(move |socket| handle_ws_stream(socket, subscription))
}
