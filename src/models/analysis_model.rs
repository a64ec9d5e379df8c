use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    RandomForest,
    IsolationForest,
}

/// Canned output for each model type. No model is actually run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MockAnalysis {
    pub predictions: Option<Vec<f64>>,
    pub accuracy_score: Option<f64>,
    pub feature_importance: Option<BTreeMap<String, f64>>,
    pub anomalies: Option<Vec<bool>>,
    pub anomaly_score: Option<Vec<f64>>,
    pub outlier_fraction: Option<f64>,
}

impl ModelType {
    pub fn mock_result(self) -> MockAnalysis {
        match self {
            ModelType::RandomForest => MockAnalysis {
                predictions: Some(vec![0.95, 0.87, 0.92, 0.76, 0.89]),
                accuracy_score: Some(0.87),
                feature_importance: Some(BTreeMap::from([
                    ("temperature".to_string(), 0.45),
                    ("vibration".to_string(), 0.32),
                    ("pressure".to_string(), 0.23),
                ])),
                ..Default::default()
            },
            ModelType::IsolationForest => MockAnalysis {
                anomalies: Some(vec![false, false, true, false, false]),
                anomaly_score: Some(vec![-0.1, -0.05, 0.8, -0.03, -0.07]),
                outlier_fraction: Some(0.2),
                ..Default::default()
            },
        }
    }
}

/// Row written to `analysis_results`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAnalysisResult {
    pub user_id: String,
    pub upload_id: Uuid,
    pub model_type: ModelType,
    pub predictions: Option<Vec<f64>>,
    pub anomalies: Option<Vec<bool>>,
    pub accuracy_score: Option<f64>,
}

impl NewAnalysisResult {
    pub fn mock(user_id: &str, upload_id: Uuid, model_type: ModelType) -> Self {
        let result = model_type.mock_result();
        Self {
            user_id: user_id.to_string(),
            upload_id,
            model_type,
            predictions: result.predictions,
            anomalies: result.anomalies,
            accuracy_score: result.accuracy_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub user_id: String,
    pub upload_id: Uuid,
    pub model_type: ModelType,
    pub predictions: Option<Vec<f64>>,
    pub anomalies: Option<Vec<bool>>,
    pub accuracy_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Row written to `data_uploads`.
#[derive(Debug, Clone, Serialize)]
pub struct NewDataUpload {
    pub user_id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_size: usize,
    pub status: String,
    pub rows_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataUpload {
    pub id: Uuid,
    pub user_id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_size: usize,
    pub status: String,
    pub rows_count: usize,
    pub created_at: DateTime<Utc>,
}

pub fn is_csv_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}

/// True when `segment` can be used as one component of a storage object path.
pub fn is_safe_path_segment(segment: &str) -> bool {
    let segment = segment.trim();
    !segment.is_empty()
        && segment != "."
        && !segment.contains("..")
        && !segment.contains(['/', '\\'])
        && !segment.chars().any(char::is_control)
}

/// Data rows in a CSV body: non-blank lines minus the header.
pub fn count_csv_rows(content: &str) -> usize {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .count()
        .saturating_sub(1)
}
