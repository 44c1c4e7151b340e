//! Rutas HTTP de ejecución de recolección

use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthenticatedActor;
use crate::models::bin::Bin;
use crate::models::route::{
    BulkCompleteReport, BulkCompleteRequest, CompletePointRequest, ConfirmRetirementRequest,
    Route, RoutePoint,
};
use crate::services::collection_service::CollectionService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_collection_router() -> Router<AppState> {
    Router::new()
        .route("/points/:id/complete", post(complete_point))
        .route("/points/bulk-complete", post(bulk_complete_points))
        .route("/bins/:id/confirm-retirement", post(confirm_retirement))
        .route("/routes/:id/complete", post(complete_route))
}

async fn complete_point(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<CompletePointRequest>,
) -> Result<Json<RoutePoint>, AppError> {
    request.validate()?;
    let point = CollectionService::new(state.pool.clone())
        .mark_point_completed(
            id,
            actor.user_id,
            request.collected_percent,
            request.notes.as_deref(),
        )
        .await?;
    Ok(Json(point))
}

async fn bulk_complete_points(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(request): Json<BulkCompleteRequest>,
) -> Result<Json<BulkCompleteReport>, AppError> {
    let report = CollectionService::new(state.pool.clone())
        .bulk_complete(request.points, actor.user_id)
        .await?;
    Ok(Json(report))
}

async fn confirm_retirement(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<ConfirmRetirementRequest>,
) -> Result<Json<Bin>, AppError> {
    request.validate()?;
    tracing::info!(actor = %actor.user_id, role = ?actor.role, "Confirmando retiro físico del bote {}", id);
    let bin = CollectionService::new(state.pool.clone())
        .confirm_bin_retirement(id, actor.user_id, request.notes.as_deref())
        .await?;
    Ok(Json(bin))
}

async fn complete_route(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let route = CollectionService::new(state.pool.clone())
        .complete_route(id, actor.user_id)
        .await?;
    Ok(Json(route))
}
