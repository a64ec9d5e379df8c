use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use crate::client::records::{RecordClient, RecordError};
use crate::models::analysis_model::{AnalysisResult, MockAnalysis, ModelType};
use crate::state::app_state::AppState;

#[derive(Deserialize, Debug)]
pub struct UploadRequest {
    pub user_id: String,
    pub filename: String,
    pub content: String,
}

#[derive(Deserialize, Debug)]
pub struct AnalysisRequest {
    pub user_id: String,
    pub upload_id: Uuid,
    pub model_type: ModelType,
}

#[derive(Serialize)]
pub struct AnalysisResponse {
    pub record: AnalysisResult,
    pub details: MockAnalysis,
}

pub fn analysis_routes(state: AppState) -> Router {
    Router::new()
        .route("/uploads", post(create_upload))
        .route("/uploads/{user_id}", get(list_uploads))
        .route("/analysis", post(run_analysis))
        .route("/analysis/{user_id}", get(list_results))
        .with_state(state)
}

fn record_error_response(e: RecordError) -> Response {
    let status = match &e {
        RecordError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        RecordError::Validation(_) => StatusCode::BAD_REQUEST,
        RecordError::Http(_) | RecordError::Status { .. } => StatusCode::BAD_GATEWAY,
    };
    if status.is_server_error() {
        error!("Record request failed: {}", e);
    }
    (status, Json(json!({ "error": e.to_string() }))).into_response()
}

fn records(state: &AppState) -> Result<&RecordClient, RecordError> {
    state.records.as_ref().ok_or(RecordError::NotConfigured)
}

async fn create_upload(State(state): State<AppState>, Json(request): Json<UploadRequest>) -> Response {
    debug!("Upload {} for user {}", request.filename, request.user_id);

    let client = match records(&state) {
        Ok(c) => c,
        Err(e) => return record_error_response(e),
    };

    match client
        .create_upload(&request.user_id, &request.filename, &request.content)
        .await
    {
        Ok(upload) => (StatusCode::CREATED, Json(upload)).into_response(),
        Err(e) => record_error_response(e),
    }
}

async fn list_uploads(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let client = match records(&state) {
        Ok(c) => c,
        Err(e) => return record_error_response(e),
    };

    match client.list_uploads(&user_id).await {
        Ok(uploads) => Json(uploads).into_response(),
        Err(e) => record_error_response(e),
    }
}

async fn run_analysis(State(state): State<AppState>, Json(request): Json<AnalysisRequest>) -> Response {
    debug!(
        "Analysis {:?} requested for upload {}",
        request.model_type, request.upload_id
    );

    let client = match records(&state) {
        Ok(c) => c,
        Err(e) => return record_error_response(e),
    };

    match client
        .run_analysis(&request.user_id, request.upload_id, request.model_type)
        .await
    {
        Ok(record) => Json(AnalysisResponse {
            record,
            details: request.model_type.mock_result(),
        })
        .into_response(),
        Err(e) => record_error_response(e),
    }
}

async fn list_results(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let client = match records(&state) {
        Ok(c) => c,
        Err(e) => return record_error_response(e),
    };

    match client.list_results(&user_id).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => record_error_response(e),
    }
}
