//! Rutas HTTP de botes

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthenticatedActor;
use crate::models::bin::{
    Bin, BinFilters, CreateBinRequest, DeactivateBinRequest, Page, ReassignBinRequest,
    UpdateBinRequest,
};
use crate::models::bin::BinStatusHistoryEntry;
use crate::services::bin_service::BinService;
use crate::services::status_service::StatusService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_bin_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_bin).get(list_bins))
        .route("/hardware/:hardware_id", get(get_bin_by_hardware))
        .route("/:id", get(get_bin).put(update_bin))
        .route("/:id/deactivate", post(deactivate_bin))
        .route("/:id/reactivate", post(reactivate_bin))
        .route("/:id/reassign", post(reassign_bin))
        .route("/:id/history", get(bin_history))
}

async fn create_bin(
    State(state): State<AppState>,
    _actor: AuthenticatedActor,
    Json(request): Json<CreateBinRequest>,
) -> Result<Json<Bin>, AppError> {
    request.validate()?;
    let bin = BinService::new(state.pool.clone()).create(request).await?;
    Ok(Json(bin))
}

async fn get_bin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bin>, AppError> {
    let bin = BinService::new(state.pool.clone()).get_by_id(id).await?;
    Ok(Json(bin))
}

async fn get_bin_by_hardware(
    State(state): State<AppState>,
    Path(hardware_id): Path<String>,
) -> Result<Json<Bin>, AppError> {
    let bin = BinService::new(state.pool.clone())
        .get_by_hardware_id(&hardware_id)
        .await?;
    Ok(Json(bin))
}

async fn list_bins(
    State(state): State<AppState>,
    Query(filters): Query<BinFilters>,
) -> Result<Json<Page<Bin>>, AppError> {
    let page = BinService::new(state.pool.clone()).list(filters).await?;
    Ok(Json(page))
}

async fn update_bin(
    State(state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateBinRequest>,
) -> Result<Json<Bin>, AppError> {
    request.validate()?;
    let bin = BinService::new(state.pool.clone()).update(id, request).await?;
    Ok(Json(bin))
}

async fn deactivate_bin(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<DeactivateBinRequest>,
) -> Result<Json<Bin>, AppError> {
    request.validate()?;
    let bin = BinService::new(state.pool.clone())
        .deactivate(id, &request.reason, Some(actor.user_id))
        .await?;
    Ok(Json(bin))
}

async fn reactivate_bin(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Bin>, AppError> {
    let bin = BinService::new(state.pool.clone())
        .reactivate(id, Some(actor.user_id))
        .await?;
    Ok(Json(bin))
}

async fn reassign_bin(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<ReassignBinRequest>,
) -> Result<Json<Bin>, AppError> {
    request.validate()?;
    let bin = BinService::new(state.pool.clone())
        .reassign(id, request, actor.user_id)
        .await?;
    Ok(Json(bin))
}

async fn bin_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BinStatusHistoryEntry>>, AppError> {
    let entries = StatusService::new(state.pool.clone())
        .get_history(id, 50)
        .await?;
    Ok(Json(entries))
}
