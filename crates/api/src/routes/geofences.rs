//! Geofence endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::geofence::{
    CheckPointRequest, CheckPointResponse, CreateGeofenceRequest, Geofence, GeofenceResponse,
    ListGeofencesResponse, UpdateGeofenceRequest,
};
use domain::services::geofence::check_zone;
use persistence::repositories::GeofenceRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::OperatorAuth;

fn entity_to_model(
    entity: persistence::entities::GeofenceEntity,
) -> Result<Geofence, ApiError> {
    entity
        .into_model()
        .ok_or_else(|| ApiError::Internal("Malformed geofence row".to_string()))
}

/// Create a new geofence.
///
/// POST /api/v1/geofences
pub async fn create_geofence(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Json(request): Json<CreateGeofenceRequest>,
) -> Result<(StatusCode, Json<GeofenceResponse>), ApiError> {
    request.validate()?;
    request.shape.validate().map_err(|e| {
        ApiError::Validation(e.message.map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
    })?;

    let geofence_repo = GeofenceRepository::new(state.pool.clone());
    let entity = geofence_repo
        .create(
            &request.name,
            request.description.as_deref(),
            &request.shape,
            request.alert_on_exit,
            request.alert_on_enter,
            request.is_active,
            request.department.as_deref(),
            Some(operator.user_id),
        )
        .await?;

    let geofence = entity_to_model(entity)?;

    info!(
        geofence_id = %geofence.id,
        name = %geofence.name,
        fence_type = geofence.shape.kind_str(),
        "Geofence created"
    );

    Ok((StatusCode::CREATED, Json(geofence.into())))
}

/// Query parameters for listing geofences.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListGeofencesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

/// List geofences.
///
/// GET /api/v1/geofences
pub async fn list_geofences(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Query(query): Query<ListGeofencesQuery>,
) -> Result<Json<ListGeofencesResponse>, ApiError> {
    let geofence_repo = GeofenceRepository::new(state.pool.clone());
    let entities = geofence_repo.list(query.include_inactive).await?;

    let geofences: Vec<GeofenceResponse> = entities
        .into_iter()
        .filter_map(|e| e.into_model())
        .map(Into::into)
        .collect();
    let total = geofences.len();

    Ok(Json(ListGeofencesResponse { geofences, total }))
}

/// Get a single geofence by ID.
///
/// GET /api/v1/geofences/:geofence_id
pub async fn get_geofence(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(geofence_id): Path<Uuid>,
) -> Result<Json<GeofenceResponse>, ApiError> {
    let geofence_repo = GeofenceRepository::new(state.pool.clone());
    let entity = geofence_repo
        .find_by_id(geofence_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Geofence not found".to_string()))?;

    Ok(Json(entity_to_model(entity)?.into()))
}

/// Update a geofence (partial update of non-geometry fields).
///
/// PATCH /api/v1/geofences/:geofence_id
pub async fn update_geofence(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Path(geofence_id): Path<Uuid>,
    Json(request): Json<UpdateGeofenceRequest>,
) -> Result<Json<GeofenceResponse>, ApiError> {
    request.validate()?;

    let geofence_repo = GeofenceRepository::new(state.pool.clone());
    let entity = geofence_repo
        .update(
            geofence_id,
            request.name.as_deref(),
            request.description.as_deref(),
            request.alert_on_exit,
            request.alert_on_enter,
            request.is_active,
            request.department.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("Geofence not found".to_string()))?;

    Ok(Json(entity_to_model(entity)?.into()))
}

/// Delete a geofence.
///
/// DELETE /api/v1/geofences/:geofence_id
pub async fn delete_geofence(
    State(state): State<AppState>,
    operator: OperatorAuth,
    Path(geofence_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let geofence_repo = GeofenceRepository::new(state.pool.clone());
    let deleted = geofence_repo.delete(geofence_id).await?;

    if deleted == 0 {
        return Err(ApiError::NotFound("Geofence not found".to_string()));
    }

    info!(
        geofence_id = %geofence_id,
        deleted_by = %operator.user_id,
        "Geofence deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Check whether a point falls inside a geofence.
///
/// POST /api/v1/geofences/check-point
///
/// Exposes the evaluator's single-zone check directly for operator tooling.
pub async fn check_point(
    State(state): State<AppState>,
    _operator: OperatorAuth,
    Json(request): Json<CheckPointRequest>,
) -> Result<Json<CheckPointResponse>, ApiError> {
    request.validate()?;

    let geofence_repo = GeofenceRepository::new(state.pool.clone());
    let entity = geofence_repo
        .find_by_id(request.geofence_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Geofence not found".to_string()))?;

    let geofence = entity_to_model(entity)?;
    let (is_inside, distance_meters) = check_zone(&geofence, request.latitude, request.longitude);

    Ok(Json(CheckPointResponse {
        geofence_id: geofence.id,
        is_inside,
        distance_meters,
    }))
}
