//! Modelo de Bin (bote de reciclaje)
//!
//! Este módulo contiene el struct Bin y sus variantes para CRUD operations.
//! Mapea exactamente al schema PostgreSQL con primary key 'id'.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::{BinStatus, GlassType};

/// Bote principal - mapea a la tabla bins
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bin {
    pub id: Uuid,
    pub hardware_id: String,
    pub sector_id: Uuid,
    pub establishment_id: Option<Uuid>,
    pub capacity_liters: i32,
    pub glass_type: GlassType,
    pub status: BinStatus,
    pub last_fill_percent: i32,
    pub battery_level: Option<i32>,
    pub firmware_version: Option<String>,
    pub last_reading_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub inactivity_reason: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub retired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entrada inmutable del historial de estados - mapea a bin_status_history
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BinStatusHistoryEntry {
    pub id: Uuid,
    pub bin_id: Uuid,
    pub actor_id: Option<Uuid>,
    pub prior_status: BinStatus,
    pub new_status: BinStatus,
    pub fill_percent: i32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Request para registrar un nuevo bote
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBinRequest {
    #[validate(length(min = 3, max = 64))]
    pub hardware_id: String,

    pub sector_id: Uuid,
    pub establishment_id: Option<Uuid>,

    #[validate(range(min = 1, max = 5000))]
    pub capacity_liters: i32,

    pub glass_type: Option<GlassType>,
}

/// Request para actualizar campos mutables de un bote
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBinRequest {
    pub establishment_id: Option<Uuid>,
    pub sector_id: Option<Uuid>,

    #[validate(range(min = 1, max = 5000))]
    pub capacity_liters: Option<i32>,

    pub glass_type: Option<GlassType>,

    #[validate(length(max = 32))]
    pub firmware_version: Option<String>,

    #[validate(length(max = 255))]
    pub inactivity_reason: Option<String>,
}

impl UpdateBinRequest {
    /// Verdadero si la request no toca ningún campo
    pub fn is_empty(&self) -> bool {
        self.establishment_id.is_none()
            && self.sector_id.is_none()
            && self.capacity_liters.is_none()
            && self.glass_type.is_none()
            && self.firmware_version.is_none()
            && self.inactivity_reason.is_none()
    }
}

/// Request para reasignar un bote retirado
#[derive(Debug, Deserialize, Validate)]
pub struct ReassignBinRequest {
    pub establishment_id: Uuid,
    pub sector_id: Uuid,
}

/// Request para desactivar un bote (falla técnica, no retiro normal)
#[derive(Debug, Deserialize, Validate)]
pub struct DeactivateBinRequest {
    #[validate(length(min = 3, max = 255))]
    pub reason: String,
}

/// Filtros para listado de botes
#[derive(Debug, Default, Deserialize)]
pub struct BinFilters {
    pub sector_id: Option<Uuid>,
    pub establishment_id: Option<Uuid>,
    pub status: Option<BinStatus>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Página de resultados con total
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            has_more: total > offset + limit,
            items,
            total,
            limit,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_update_request_is_detected() {
        let req = UpdateBinRequest {
            establishment_id: None,
            sector_id: None,
            capacity_liters: None,
            glass_type: None,
            firmware_version: None,
            inactivity_reason: None,
        };
        assert!(req.is_empty());
    }

    #[test]
    fn page_has_more_flag() {
        let page = Page::new(vec![1, 2, 3], 10, 3, 0);
        assert!(page.has_more);

        let last = Page::new(vec![1], 10, 3, 9);
        assert!(!last.has_more);
    }
}
