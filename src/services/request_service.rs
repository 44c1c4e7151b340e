//! Servicio de gestión de solicitudes
//!
//! Maneja instalación, retiro, recolección manual y asistencia.
//! Las solicitudes de retiro son las únicas que mueven el estado del bote:
//! aprobar → pending_retirement, cancelar una aprobada → vuelta a active.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::bin::Page;
use crate::models::enums::{BinStatus, RequestStatus, RequestType};
use crate::models::request::{CreateRequestRequest, Request, RequestFilters};
use crate::services::status_service::StatusService;
use crate::utils::errors::{AppError, AppResult, FieldError};

pub struct RequestService {
    pool: PgPool,
}

impl RequestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crear nueva solicitud.
    /// Para retiros, el check de "una sola solicitud activa por bote" y el
    /// insert comparten transacción; dos creaciones concurrentes no pueden
    /// colarse ambas.
    pub async fn create(&self, requester_id: Uuid, request: CreateRequestRequest) -> AppResult<Request> {
        let mut tx = self.pool.begin().await?;

        let est: Option<(bool,)> =
            sqlx::query_as("SELECT is_active FROM establishments WHERE id = $1")
                .bind(request.establishment_id)
                .fetch_optional(&mut *tx)
                .await?;

        match est {
            None => {
                return Err(AppError::NotFound(
                    "Establecimiento no encontrado".to_string(),
                ))
            }
            Some((false,)) => {
                return Err(AppError::validation("El establecimiento está inactivo"))
            }
            Some((true,)) => {}
        }

        if request.request_type == RequestType::Retire {
            let bin_id = request.bin_id.ok_or_else(|| {
                AppError::validation_with(
                    "El bin_id es requerido para solicitudes de retiro",
                    vec![FieldError::new("bin_id", "requerido para tipo retire")],
                )
            })?;

            // Bloquear la fila del bote: serializa creaciones concurrentes
            // de solicitudes de retiro para el mismo bote.
            let bin: Option<(Option<Uuid>, BinStatus)> = sqlx::query_as(
                r#"
                SELECT establishment_id, status FROM bins
                WHERE id = $1 AND is_active = TRUE
                FOR UPDATE
                "#,
            )
            .bind(bin_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (bin_establishment, bin_status) = bin.ok_or_else(|| {
                AppError::NotFound("Bote no encontrado o inactivo".to_string())
            })?;

            if bin_establishment != Some(request.establishment_id) {
                return Err(AppError::Conflict(
                    "El bote no pertenece a este establecimiento".to_string(),
                ));
            }

            if bin_status != BinStatus::Active {
                return Err(AppError::Conflict(format!(
                    "No se puede solicitar retiro de un bote en estado: {}",
                    bin_status
                )));
            }

            let existing: Option<(Uuid,)> = sqlx::query_as(
                r#"
                SELECT id FROM requests
                WHERE bin_id = $1
                  AND request_type = $2
                  AND status IN ($3, $4)
                "#,
            )
            .bind(bin_id)
            .bind(RequestType::Retire)
            .bind(RequestStatus::Pending)
            .bind(RequestStatus::Approved)
            .fetch_optional(&mut *tx)
            .await?;

            if existing.is_some() {
                return Err(AppError::Conflict(
                    "Ya existe una solicitud de retiro activa para este bote".to_string(),
                ));
            }
        }

        let created = sqlx::query_as::<_, Request>(
            r#"
            INSERT INTO requests (
                id, establishment_id, requester_id, request_type, status,
                bin_id, description, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.establishment_id)
        .bind(requester_id)
        .bind(request.request_type)
        .bind(RequestStatus::Pending)
        .bind(request.bin_id)
        .bind(&request.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Aprobar solicitud. Para retiros, la aprobación y el cambio de estado
    /// del bote se confirman o se revierten juntos.
    pub async fn approve(
        &self,
        request_id: Uuid,
        approver_id: Uuid,
        response: Option<&str>,
    ) -> AppResult<Request> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Request>(
            "SELECT * FROM requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Solicitud no encontrada".to_string()))?;

        if current.status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "No se puede aprobar una solicitud en estado: {}",
                current.status
            )));
        }

        let approved = sqlx::query_as::<_, Request>(
            r#"
            UPDATE requests
            SET
                status = $1,
                approver_id = $2,
                admin_response = $3,
                approved_at = NOW(),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(RequestStatus::Approved)
        .bind(approver_id)
        .bind(response)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        if current.request_type == RequestType::Retire {
            if let Some(bin_id) = current.bin_id {
                StatusService::mark_pending_retirement_tx(&mut tx, bin_id, request_id, approver_id)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(approved)
    }

    /// Completar solicitud (solo desde approved)
    pub async fn complete(
        &self,
        request_id: Uuid,
        _actor_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<Request> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Request>(
            "SELECT * FROM requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Solicitud no encontrada".to_string()))?;

        if current.status != RequestStatus::Approved {
            return Err(AppError::Conflict(format!(
                "Solo se pueden completar solicitudes aprobadas. Estado actual: {}",
                current.status
            )));
        }

        let completed = sqlx::query_as::<_, Request>(
            r#"
            UPDATE requests
            SET
                status = $1,
                admin_response = COALESCE($2, admin_response),
                completed_at = NOW(),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(RequestStatus::Completed)
        .bind(notes)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(completed)
    }

    /// Cancelar solicitud desde pending o approved.
    /// Cancelar una solicitud de retiro aprobada revierte el bote de
    /// pending_retirement a active como acción compensatoria, en la misma
    /// transacción y con su entrada de historial.
    pub async fn cancel(
        &self,
        request_id: Uuid,
        actor_id: Uuid,
        reason: Option<&str>,
    ) -> AppResult<Request> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Request>(
            "SELECT * FROM requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Solicitud no encontrada".to_string()))?;

        if current.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "No se puede cancelar una solicitud en estado: {}",
                current.status
            )));
        }

        if current.request_type == RequestType::Retire
            && current.status == RequestStatus::Approved
        {
            if let Some(bin_id) = current.bin_id {
                // Reversión condicional: solo aplica si el bote sigue en
                // pending_retirement; si ya cambió, no se toca.
                let reverted: Option<(i32,)> = sqlx::query_as(
                    r#"
                    UPDATE bins
                    SET status = $1, updated_at = NOW()
                    WHERE id = $2 AND status = $3
                    RETURNING last_fill_percent
                    "#,
                )
                .bind(BinStatus::Active)
                .bind(bin_id)
                .bind(BinStatus::PendingRetirement)
                .fetch_optional(&mut *tx)
                .await?;

                if let Some((fill,)) = reverted {
                    StatusService::insert_history(
                        &mut tx,
                        bin_id,
                        Some(actor_id),
                        BinStatus::PendingRetirement,
                        BinStatus::Active,
                        fill,
                        &format!("Solicitud de retiro cancelada: {}", request_id),
                    )
                    .await?;
                }
            }
        }

        let cancelled = sqlx::query_as::<_, Request>(
            r#"
            UPDATE requests
            SET
                status = $1,
                admin_response = $2,
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(RequestStatus::Cancelled)
        .bind(reason.unwrap_or("Solicitud cancelada"))
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(cancelled)
    }

    /// Obtener solicitud por ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Request> {
        sqlx::query_as::<_, Request>("SELECT * FROM requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Solicitud no encontrada".to_string()))
    }

    /// Listar solicitudes con filtros
    pub async fn list(&self, filters: RequestFilters) -> AppResult<Page<Request>> {
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);
        let offset = filters.offset.unwrap_or(0).max(0);

        let requests = sqlx::query_as::<_, Request>(
            r#"
            SELECT * FROM requests
            WHERE ($1::request_type IS NULL OR request_type = $1)
              AND ($2::request_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR establishment_id = $3)
              AND ($4::uuid IS NULL OR requester_id = $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filters.request_type)
        .bind(filters.status)
        .bind(filters.establishment_id)
        .bind(filters.requester_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM requests
            WHERE ($1::request_type IS NULL OR request_type = $1)
              AND ($2::request_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR establishment_id = $3)
              AND ($4::uuid IS NULL OR requester_id = $4)
            "#,
        )
        .bind(filters.request_type)
        .bind(filters.status)
        .bind(filters.establishment_id)
        .bind(filters.requester_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(requests, total, limit, offset))
    }

    /// Solicitudes pendientes, opcionalmente por tipo
    pub async fn pending(&self, request_type: Option<RequestType>) -> AppResult<Page<Request>> {
        self.list(RequestFilters {
            status: Some(RequestStatus::Pending),
            request_type,
            limit: Some(100),
            ..Default::default()
        })
        .await
    }
}
