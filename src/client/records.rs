use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::analysis_model::*;
use crate::models::dashboard_model::RecordStoreConfig;

const UPLOADS_TABLE: &str = "data_uploads";
const RESULTS_TABLE: &str = "analysis_results";
const UPLOADS_BUCKET: &str = "data-uploads";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no record store configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid request: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, RecordError>;

/// Request/response client for upload and analysis records kept in a hosted
/// REST store.
#[derive(Clone)]
pub struct RecordClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl RecordClient {
    pub fn new(config: &RecordStoreConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, UPLOADS_BUCKET, path)
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        error!("Record store error {}: {}", status, body);
        Err(RecordError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn insert<T: Serialize, R: DeserializeOwned>(&self, table: &str, row: &T) -> Result<R> {
        let response = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;

        let mut rows: Vec<R> = Self::check(response).await?.json().await?;
        if rows.is_empty() {
            return Err(RecordError::Status {
                status: 200,
                body: format!("insert into {} returned no rows", table),
            });
        }
        Ok(rows.remove(0))
    }

    async fn list_for_user<R: DeserializeOwned>(&self, table: &str, user_id: &str) -> Result<Vec<R>> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .authed(self.http.get(self.table_url(table)))
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    /// Stores the raw file, then records the upload.
    pub async fn create_upload(&self, user_id: &str, filename: &str, content: &str) -> Result<DataUpload> {
        if user_id.trim().is_empty() {
            return Err(RecordError::Validation("user id is empty".to_string()));
        }
        if !is_safe_path_segment(user_id) {
            return Err(RecordError::Validation(format!("invalid user id {:?}", user_id)));
        }
        if !is_safe_path_segment(filename) {
            return Err(RecordError::Validation(format!("invalid file name {:?}", filename)));
        }
        if !is_csv_name(filename) {
            return Err(RecordError::Validation("Please select a CSV file".to_string()));
        }

        let object_path = format!("{}/{}_{}", user_id, Utc::now().timestamp_millis(), filename);
        debug!("Uploading object {}", object_path);

        let response = self
            .authed(self.http.post(self.object_url(&object_path)))
            .header("Content-Type", "text/csv")
            .body(content.to_string())
            .send()
            .await?;
        Self::check(response).await?;

        let row = NewDataUpload {
            user_id: user_id.to_string(),
            filename: object_path,
            original_filename: filename.to_string(),
            file_size: content.len(),
            status: "uploaded".to_string(),
            rows_count: count_csv_rows(content),
        };
        let upload: DataUpload = self.insert(UPLOADS_TABLE, &row).await?;

        info!("Upload {} stored for user {}", upload.id, user_id);
        Ok(upload)
    }

    pub async fn list_uploads(&self, user_id: &str) -> Result<Vec<DataUpload>> {
        self.list_for_user(UPLOADS_TABLE, user_id).await
    }

    /// Records the canned result for `model_type` against an upload.
    pub async fn run_analysis(&self, user_id: &str, upload_id: Uuid, model_type: ModelType) -> Result<AnalysisResult> {
        let row = NewAnalysisResult::mock(user_id, upload_id, model_type);
        let result: AnalysisResult = self.insert(RESULTS_TABLE, &row).await?;

        info!(
            "Analysis {} ({:?}) stored for upload {}",
            result.id, model_type, upload_id
        );
        Ok(result)
    }

    pub async fn list_results(&self, user_id: &str) -> Result<Vec<AnalysisResult>> {
        self.list_for_user(RESULTS_TABLE, user_id).await
    }
}
