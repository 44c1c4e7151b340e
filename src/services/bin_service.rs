//! Servicio de gestión CRUD de botes

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::bin::{Bin, BinFilters, CreateBinRequest, Page, ReassignBinRequest, UpdateBinRequest};
use crate::models::enums::{BinStatus, GlassType};
use crate::services::status_service::StatusService;
use crate::utils::errors::{AppError, AppResult, FieldError};

pub struct BinService {
    pool: PgPool,
}

impl BinService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registrar un nuevo bote. Estado inicial: active, llenado 0.
    pub async fn create(&self, request: CreateBinRequest) -> AppResult<Bin> {
        let mut tx = self.pool.begin().await?;

        // hardware_id debe ser único
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM bins WHERE hardware_id = $1")
                .bind(&request.hardware_id)
                .fetch_optional(&mut *tx)
                .await?;

        if exists.is_some() {
            return Err(AppError::Conflict(format!(
                "Ya existe un bote con hardware_id: {}",
                request.hardware_id
            )));
        }

        Self::ensure_sector_active(&mut tx, request.sector_id).await?;

        if let Some(establishment_id) = request.establishment_id {
            Self::ensure_establishment_active(&mut tx, establishment_id).await?;
        }

        let bin = sqlx::query_as::<_, Bin>(
            r#"
            INSERT INTO bins (
                id, hardware_id, sector_id, establishment_id, capacity_liters,
                glass_type, status, last_fill_percent, is_active,
                installed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, TRUE, NOW(), NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.hardware_id)
        .bind(request.sector_id)
        .bind(request.establishment_id)
        .bind(request.capacity_liters)
        .bind(request.glass_type.unwrap_or(GlassType::Mixed))
        .bind(BinStatus::Active)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(bin)
    }

    /// Obtener bote por ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Bin> {
        sqlx::query_as::<_, Bin>("SELECT * FROM bins WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Bote no encontrado".to_string()))
    }

    /// Obtener bote por hardware_id
    pub async fn get_by_hardware_id(&self, hardware_id: &str) -> AppResult<Bin> {
        sqlx::query_as::<_, Bin>("SELECT * FROM bins WHERE hardware_id = $1")
            .bind(hardware_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Bote no encontrado: {}", hardware_id)))
    }

    /// Listar botes con filtros y paginación. Por defecto solo activos.
    pub async fn list(&self, filters: BinFilters) -> AppResult<Page<Bin>> {
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);
        let offset = filters.offset.unwrap_or(0).max(0);
        let is_active = filters.is_active.unwrap_or(true);

        let bins = sqlx::query_as::<_, Bin>(
            r#"
            SELECT * FROM bins
            WHERE is_active = $1
              AND ($2::uuid IS NULL OR sector_id = $2)
              AND ($3::uuid IS NULL OR establishment_id = $3)
              AND ($4::bin_status IS NULL OR status = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(is_active)
        .bind(filters.sector_id)
        .bind(filters.establishment_id)
        .bind(filters.status)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM bins
            WHERE is_active = $1
              AND ($2::uuid IS NULL OR sector_id = $2)
              AND ($3::uuid IS NULL OR establishment_id = $3)
              AND ($4::bin_status IS NULL OR status = $4)
            "#,
        )
        .bind(is_active)
        .bind(filters.sector_id)
        .bind(filters.establishment_id)
        .bind(filters.status)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(bins, total, limit, offset))
    }

    /// Actualizar campos mutables de un bote
    pub async fn update(&self, id: Uuid, request: UpdateBinRequest) -> AppResult<Bin> {
        if request.is_empty() {
            return Err(AppError::validation("No hay campos para actualizar"));
        }

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Bin>("SELECT * FROM bins WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Bote no encontrado".to_string()))?;

        if let Some(sector_id) = request.sector_id {
            Self::ensure_sector_active(&mut tx, sector_id).await?;
        }
        if let Some(establishment_id) = request.establishment_id {
            Self::ensure_establishment_active(&mut tx, establishment_id).await?;
        }

        let bin = sqlx::query_as::<_, Bin>(
            r#"
            UPDATE bins
            SET
                establishment_id = $2,
                sector_id = $3,
                capacity_liters = $4,
                glass_type = $5,
                firmware_version = $6,
                inactivity_reason = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.establishment_id.or(current.establishment_id))
        .bind(request.sector_id.unwrap_or(current.sector_id))
        .bind(request.capacity_liters.unwrap_or(current.capacity_liters))
        .bind(request.glass_type.unwrap_or(current.glass_type))
        .bind(request.firmware_version.or(current.firmware_version))
        .bind(request.inactivity_reason.or(current.inactivity_reason))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(bin)
    }

    /// Marcar bote como inactivo (falla técnica, no retiro normal).
    /// El flag is_active es independiente de la máquina de estados; se deja
    /// constancia en el historial con el estado repetido.
    pub async fn deactivate(&self, id: Uuid, reason: &str, admin_id: Option<Uuid>) -> AppResult<Bin> {
        let mut tx = self.pool.begin().await?;

        let bin = sqlx::query_as::<_, Bin>(
            r#"
            UPDATE bins
            SET is_active = FALSE, inactivity_reason = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(reason)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Bote no encontrado".to_string()))?;

        StatusService::insert_history(
            &mut tx,
            id,
            admin_id,
            bin.status,
            bin.status,
            bin.last_fill_percent,
            &format!("Bote desactivado: {}", reason),
        )
        .await?;

        tx.commit().await?;
        Ok(bin)
    }

    /// Reactivar un bote desactivado
    pub async fn reactivate(&self, id: Uuid, admin_id: Option<Uuid>) -> AppResult<Bin> {
        let mut tx = self.pool.begin().await?;

        let bin = sqlx::query_as::<_, Bin>(
            r#"
            UPDATE bins
            SET is_active = TRUE, inactivity_reason = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Bote no encontrado".to_string()))?;

        StatusService::insert_history(
            &mut tx,
            id,
            admin_id,
            bin.status,
            bin.status,
            bin.last_fill_percent,
            "Bote reactivado",
        )
        .await?;

        tx.commit().await?;
        Ok(bin)
    }

    /// Reasignar bote retirado a un nuevo establecimiento.
    /// Vuelve a active con llenado 0 y nueva fecha de instalación.
    pub async fn reassign(
        &self,
        id: Uuid,
        request: ReassignBinRequest,
        admin_id: Uuid,
    ) -> AppResult<Bin> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Bin>("SELECT * FROM bins WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Bote no encontrado".to_string()))?;

        if current.status != BinStatus::Retired {
            return Err(AppError::Conflict(format!(
                "Solo se pueden reasignar botes en estado retired. Estado actual: {}",
                current.status
            )));
        }

        Self::ensure_sector_active(&mut tx, request.sector_id).await?;
        Self::ensure_establishment_active(&mut tx, request.establishment_id).await?;

        let bin = sqlx::query_as::<_, Bin>(
            r#"
            UPDATE bins
            SET
                establishment_id = $1,
                sector_id = $2,
                status = $3,
                last_fill_percent = 0,
                installed_at = NOW(),
                retired_at = NULL,
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(request.establishment_id)
        .bind(request.sector_id)
        .bind(BinStatus::Active)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        StatusService::insert_history(
            &mut tx,
            id,
            Some(admin_id),
            BinStatus::Retired,
            BinStatus::Active,
            0,
            &format!("Bote reasignado a establecimiento {}", request.establishment_id),
        )
        .await?;

        tx.commit().await?;
        Ok(bin)
    }

    pub(crate) async fn ensure_sector_active(
        conn: &mut PgConnection,
        sector_id: Uuid,
    ) -> AppResult<()> {
        let sector: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM sectors WHERE id = $1 AND is_active = TRUE")
                .bind(sector_id)
                .fetch_optional(&mut *conn)
                .await?;

        if sector.is_none() {
            return Err(AppError::validation_with(
                "Sector no encontrado o inactivo",
                vec![FieldError::new("sector_id", "sector inexistente o inactivo")],
            ));
        }
        Ok(())
    }

    pub(crate) async fn ensure_establishment_active(
        conn: &mut PgConnection,
        establishment_id: Uuid,
    ) -> AppResult<()> {
        let est: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM establishments WHERE id = $1 AND is_active = TRUE")
                .bind(establishment_id)
                .fetch_optional(&mut *conn)
                .await?;

        if est.is_none() {
            return Err(AppError::validation_with(
                "Establecimiento no encontrado o inactivo",
                vec![FieldError::new(
                    "establishment_id",
                    "establecimiento inexistente o inactivo",
                )],
            ));
        }
        Ok(())
    }
}
