//! Rutas HTTP de ingesta de telemetría

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

use crate::models::telemetry::{ReadingAck, SensorReading};
use crate::services::event_service::EventService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_event_router() -> Router<AppState> {
    Router::new().route("/readings", post(receive_reading))
}

/// Las lecturas de sensores se autentican por hardware_id registrado,
/// no por JWT: los dispositivos no portan credenciales de usuario.
async fn receive_reading(
    State(state): State<AppState>,
    Json(reading): Json<SensorReading>,
) -> Result<(StatusCode, Json<ReadingAck>), AppError> {
    let ack = EventService::new(state.pool.clone())
        .receive(&state.event_queue, reading)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ack)))
}
