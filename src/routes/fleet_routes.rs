use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use serde::{Deserialize, Serialize};

use crate::models::fleet_model::*;
use crate::state::app_state::AppState;

#[derive(Serialize)]
pub struct EquipmentView<'a> {
    #[serde(flatten)]
    pub equipment: &'a Equipment,
    pub health_band: HealthBand,
    pub tone: Tone,
    pub is_fan: bool,
}

#[derive(Serialize)]
pub struct FanView<'a> {
    #[serde(flatten)]
    pub fan: &'a Fan,
    pub tone: Tone,
}

#[derive(Serialize)]
pub struct AlertView<'a> {
    #[serde(flatten)]
    pub alert: &'a Alert,
    pub tone: Tone,
}

#[derive(Deserialize, Debug)]
pub struct AlertFilter {
    pub min_severity: Option<Severity>,
}

pub fn fleet_routes(state: AppState) -> Router {
    Router::new()
        .route("/equipment", get(list_equipment))
        .route("/fans", get(list_fans))
        .route("/alerts", get(list_alerts))
        .route("/metrics", get(list_metrics))
        .with_state(state)
}

async fn list_equipment(State(state): State<AppState>) -> Response {
    let rows: Vec<EquipmentView> = state
        .fleet
        .equipment
        .iter()
        .map(|equipment| EquipmentView {
            equipment,
            health_band: HealthBand::from_score(equipment.health),
            tone: equipment.status.tone(),
            is_fan: equipment.is_fan(),
        })
        .collect();
    Json(rows).into_response()
}

async fn list_fans(State(state): State<AppState>) -> Response {
    let rows: Vec<FanView> = state
        .fleet
        .fans
        .iter()
        .map(|fan| FanView {
            fan,
            tone: fan.status.tone(),
        })
        .collect();
    Json(rows).into_response()
}

async fn list_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> Response {
    let min = filter.min_severity.unwrap_or(Severity::Low);
    let rows: Vec<AlertView> = state
        .fleet
        .alerts_at_least(min)
        .into_iter()
        .map(|alert| AlertView {
            alert,
            tone: alert.severity.tone(),
        })
        .collect();
    Json(rows).into_response()
}

async fn list_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.fleet.metrics.clone())
}
