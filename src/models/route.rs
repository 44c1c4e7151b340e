//! Modelo de Route (ruta de recolección)
//!
//! Este módulo contiene el struct Route, sus puntos ordenados y las
//! variantes para CRUD operations.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::{GlassType, RouteStatus};

/// Ruta principal - mapea a la tabla routes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Route {
    pub id: Uuid,
    pub sector_id: Uuid,
    pub creator_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: RouteStatus,
    pub assigned_collector_id: Option<Uuid>,
    pub planned_date: Option<NaiveDate>,
    pub total_points: i32,
    pub completed_points: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Punto de visita dentro de una ruta - mapea a la tabla route_points
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RoutePoint {
    pub id: Uuid,
    pub route_id: Uuid,
    pub bin_id: Uuid,
    pub point_order: i32,
    pub completed: bool,
    pub collected_percent: Option<i32>,
    pub notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Ruta con sus puntos ordenados
#[derive(Debug, Serialize)]
pub struct RouteWithPoints {
    #[serde(flatten)]
    pub route: Route,
    pub points: Vec<RoutePoint>,
}

/// Request para crear una ruta manual
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    pub sector_id: Uuid,

    #[validate(length(min = 3, max = 120))]
    pub name: String,

    #[validate(length(max = 500))]
    pub description: Option<String>,

    pub planned_date: Option<NaiveDate>,
}

/// Configuración para generación automática de rutas
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRouteRequest {
    pub sector_id: Uuid,

    /// Umbral mínimo de llenado para incluir un bote (default 60)
    #[validate(range(min = 0, max = 100))]
    pub min_fill_percent: Option<i32>,

    /// Máximo de puntos por ruta (default 50)
    #[validate(range(min = 1, max = 200))]
    pub max_points: Option<i32>,

    pub glass_type: Option<GlassType>,

    #[validate(length(min = 3, max = 120))]
    pub name: Option<String>,

    pub planned_date: Option<NaiveDate>,
}

/// Request para agregar un punto manual a una ruta
#[derive(Debug, Deserialize, Validate)]
pub struct AddPointRequest {
    pub bin_id: Uuid,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Request para asignar una ruta a un recolector
#[derive(Debug, Deserialize)]
pub struct AssignRouteRequest {
    pub collector_id: Uuid,
}

/// Request para cancelar una ruta
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CancelRouteRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

/// Filtros para listado de rutas
#[derive(Debug, Default, Deserialize)]
pub struct RouteFilters {
    pub sector_id: Option<Uuid>,
    pub status: Option<RouteStatus>,
    pub collector_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request para completar un punto de ruta
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompletePointRequest {
    #[validate(range(min = 0, max = 100))]
    pub collected_percent: Option<i32>,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Item de la operación de completado masivo
#[derive(Debug, Deserialize)]
pub struct BulkCompleteItem {
    pub point_id: Uuid,
    pub collected_percent: Option<i32>,
    pub notes: Option<String>,
}

/// Request de completado masivo de puntos
#[derive(Debug, Deserialize)]
pub struct BulkCompleteRequest {
    pub points: Vec<BulkCompleteItem>,
}

/// Resultado por-item del completado masivo
#[derive(Debug, Serialize)]
pub struct BulkCompleteReport {
    pub completed: Vec<RoutePoint>,
    pub errors: Vec<BulkCompleteError>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Error individual dentro de un completado masivo
#[derive(Debug, Serialize)]
pub struct BulkCompleteError {
    pub point_id: Uuid,
    pub error: String,
}

/// Request para confirmar el retiro físico de un bote
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ConfirmRetirementRequest {
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}
