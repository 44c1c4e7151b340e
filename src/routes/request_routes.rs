//! Rutas HTTP de solicitudes

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthenticatedActor;
use crate::models::bin::Page;
use crate::models::enums::RequestType;
use crate::models::request::{
    ApproveRequestRequest, CancelRequestRequest, CompleteRequestRequest, CreateRequestRequest,
    Request, RequestFilters,
};
use crate::services::request_service::RequestService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_request_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_request).get(list_requests))
        .route("/pending", get(pending_requests))
        .route("/:id", get(get_request))
        .route("/:id/approve", post(approve_request))
        .route("/:id/complete", post(complete_request))
        .route("/:id/cancel", post(cancel_request))
}

async fn create_request(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(request): Json<CreateRequestRequest>,
) -> Result<Json<Request>, AppError> {
    request.validate()?;
    let created = RequestService::new(state.pool.clone())
        .create(actor.user_id, request)
        .await?;
    Ok(Json(created))
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Request>, AppError> {
    let found = RequestService::new(state.pool.clone()).get_by_id(id).await?;
    Ok(Json(found))
}

async fn list_requests(
    State(state): State<AppState>,
    Query(filters): Query<RequestFilters>,
) -> Result<Json<Page<Request>>, AppError> {
    let page = RequestService::new(state.pool.clone()).list(filters).await?;
    Ok(Json(page))
}

#[derive(Debug, Default, serde::Deserialize)]
struct PendingQuery {
    request_type: Option<RequestType>,
}

async fn pending_requests(
    State(state): State<AppState>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Page<Request>>, AppError> {
    let page = RequestService::new(state.pool.clone())
        .pending(query.request_type)
        .await?;
    Ok(Json(page))
}

async fn approve_request(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<ApproveRequestRequest>,
) -> Result<Json<Request>, AppError> {
    request.validate()?;
    tracing::info!(actor = %actor.user_id, role = ?actor.role, "Aprobando solicitud {}", id);
    let approved = RequestService::new(state.pool.clone())
        .approve(id, actor.user_id, request.response.as_deref())
        .await?;
    Ok(Json(approved))
}

async fn complete_request(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteRequestRequest>,
) -> Result<Json<Request>, AppError> {
    request.validate()?;
    let completed = RequestService::new(state.pool.clone())
        .complete(id, actor.user_id, request.notes.as_deref())
        .await?;
    Ok(Json(completed))
}

async fn cancel_request(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRequestRequest>,
) -> Result<Json<Request>, AppError> {
    request.validate()?;
    let cancelled = RequestService::new(state.pool.clone())
        .cancel(id, actor.user_id, request.reason.as_deref())
        .await?;
    Ok(Json(cancelled))
}
