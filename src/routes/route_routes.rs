//! Rutas HTTP de rutas de recolección

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::middleware::AuthenticatedActor;
use crate::models::bin::Page;
use crate::models::route::{
    AddPointRequest, AssignRouteRequest, CancelRouteRequest, CreateRouteRequest,
    GenerateRouteRequest, Route, RouteFilters, RoutePoint, RouteWithPoints,
};
use crate::services::route_service::RouteService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_route).get(list_routes))
        .route("/generate", post(generate_route))
        .route("/:id", get(get_route))
        .route("/:id/points", post(add_point))
        .route("/:id/assign", post(assign_route))
        .route("/:id/start", post(start_route))
        .route("/:id/cancel", post(cancel_route))
}

async fn create_route(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(request): Json<CreateRouteRequest>,
) -> Result<Json<Route>, AppError> {
    request.validate()?;
    let route = RouteService::new(state.pool.clone())
        .create(actor.user_id, request)
        .await?;
    Ok(Json(route))
}

async fn generate_route(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Json(request): Json<GenerateRouteRequest>,
) -> Result<Json<RouteWithPoints>, AppError> {
    request.validate()?;
    let route = RouteService::new(state.pool.clone())
        .generate(actor.user_id, request)
        .await?;
    Ok(Json(route))
}

async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RouteWithPoints>, AppError> {
    let route = RouteService::new(state.pool.clone()).get_by_id(id).await?;
    Ok(Json(route))
}

async fn list_routes(
    State(state): State<AppState>,
    Query(filters): Query<RouteFilters>,
) -> Result<Json<Page<Route>>, AppError> {
    let page = RouteService::new(state.pool.clone()).list(filters).await?;
    Ok(Json(page))
}

async fn add_point(
    State(state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<AddPointRequest>,
) -> Result<Json<RoutePoint>, AppError> {
    request.validate()?;
    let point = RouteService::new(state.pool.clone())
        .add_point(id, request)
        .await?;
    Ok(Json(point))
}

async fn assign_route(
    State(state): State<AppState>,
    _actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignRouteRequest>,
) -> Result<Json<Route>, AppError> {
    let route = RouteService::new(state.pool.clone())
        .assign(id, request.collector_id)
        .await?;
    Ok(Json(route))
}

async fn start_route(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Route>, AppError> {
    let route = RouteService::new(state.pool.clone())
        .start(id, actor.user_id)
        .await?;
    Ok(Json(route))
}

async fn cancel_route(
    State(state): State<AppState>,
    actor: AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRouteRequest>,
) -> Result<Json<Route>, AppError> {
    request.validate()?;
    let route = RouteService::new(state.pool.clone())
        .cancel(id, actor.user_id, request.reason.as_deref())
        .await?;
    Ok(Json(route))
}
