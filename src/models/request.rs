//! Modelo de Request (solicitud)
//!
//! Solicitudes de instalación, retiro, recolección manual y asistencia.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::{RequestStatus, RequestType};

/// Solicitud principal - mapea a la tabla requests
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Request {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub requester_id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub bin_id: Option<Uuid>,
    pub description: String,
    pub approver_id: Option<Uuid>,
    pub admin_response: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request para crear una nueva solicitud
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequestRequest {
    pub establishment_id: Uuid,
    pub request_type: RequestType,

    /// Requerido cuando request_type = retire
    pub bin_id: Option<Uuid>,

    #[validate(length(min = 3, max = 1000))]
    pub description: String,
}

/// Request para aprobar una solicitud
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ApproveRequestRequest {
    #[validate(length(max = 1000))]
    pub response: Option<String>,
}

/// Request para completar una solicitud
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteRequestRequest {
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// Request para cancelar una solicitud
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelRequestRequest {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

/// Filtros para listado de solicitudes
#[derive(Debug, Default, Deserialize)]
pub struct RequestFilters {
    pub request_type: Option<RequestType>,
    pub status: Option<RequestStatus>,
    pub establishment_id: Option<Uuid>,
    pub requester_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
