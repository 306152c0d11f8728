//! Alert endpoint handlers (operator control plane).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use domain::models::alert::{Alert, AlertResponse, ListAlertsResponse, ResolveAlertRequest};
use persistence::repositories::AlertRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OperatorAuth;

/// Query parameters for listing alerts.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAlertsQuery {
    #[serde(default)]
    pub unresolved_only: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

/// List alerts, newest first.
///
/// GET /api/v1/alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<ListAlertsResponse>, ApiError> {
    let alert_repo = AlertRepository::new(state.pool.clone());
    let entities = alert_repo
        .list(query.unresolved_only, query.limit.clamp(1, 500))
        .await?;

    let alerts: Vec<AlertResponse> = entities
        .into_iter()
        .map(|e| Alert::from(e).into())
        .collect();
    let total = alerts.len();

    Ok(Json(ListAlertsResponse { alerts, total }))
}

/// Acknowledge an alert.
///
/// POST /api/v1/alerts/:alert_id/acknowledge
pub async fn acknowledge_alert(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert_repo = AlertRepository::new(state.pool.clone());
    let alert: Alert = alert_repo
        .acknowledge(alert_id, operator.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?
        .into();

    Ok(Json(alert.into()))
}

/// Resolve an alert.
///
/// POST /api/v1/alerts/:alert_id/resolve
///
/// Resolution re-arms deduplication: the next violation of the same
/// (device, zone, type) produces a fresh alert.
pub async fn resolve_alert(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(alert_id): Path<Uuid>,
    Json(request): Json<ResolveAlertRequest>,
) -> Result<Json<AlertResponse>, ApiError> {
    let alert_repo = AlertRepository::new(state.pool.clone());
    let alert: Alert = alert_repo
        .resolve(alert_id, request.notes.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found".to_string()))?
        .into();

    info!(
        alert_id = %alert_id,
        resolved_by = %operator.user_id,
        alert_type = alert.alert_type.as_str(),
        "Alert resolved"
    );

    Ok(Json(alert.into()))
}
