//! Servicio de gestión de estados de botes
//!
//! Implementa la máquina de estados: active → pending_retirement → retired.
//! Toda escritura de estado pasa por `change_status_tx`, que bloquea la fila
//! del bote (FOR UPDATE) durante el check-and-update y deja exactamente una
//! entrada inmutable en el historial.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::bin::{Bin, BinStatusHistoryEntry};
use crate::models::enums::{BinStatus, RequestStatus, RequestType};
use crate::utils::errors::{AppError, AppResult};

pub struct StatusService {
    pool: PgPool,
}

impl StatusService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cambiar estado de un bote con validación de transiciones, dentro
    /// de la transacción del caller. La fila del bote queda bloqueada
    /// hasta el commit, evitando que dos transiciones concurrentes lean
    /// el mismo estado previo.
    pub async fn change_status_tx(
        conn: &mut PgConnection,
        bin_id: Uuid,
        new_status: BinStatus,
        actor_id: Option<Uuid>,
        reason: Option<&str>,
    ) -> AppResult<Bin> {
        let bin = sqlx::query_as::<_, Bin>(
            r#"
            SELECT * FROM bins
            WHERE id = $1 AND is_active = TRUE
            FOR UPDATE
            "#,
        )
        .bind(bin_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Bote no encontrado o inactivo".to_string()))?;

        let prior_status = bin.status;

        if !prior_status.can_transition_to(new_status) {
            return Err(AppError::Conflict(format!(
                "Transición de estado no permitida: {} → {}",
                prior_status, new_status
            )));
        }

        let updated = sqlx::query_as::<_, Bin>(
            r#"
            UPDATE bins
            SET
                status = $1,
                updated_at = NOW(),
                retired_at = CASE WHEN $2 THEN NOW() ELSE retired_at END
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(new_status)
        .bind(new_status == BinStatus::Retired)
        .bind(bin_id)
        .fetch_one(&mut *conn)
        .await?;

        Self::insert_history(
            &mut *conn,
            bin_id,
            actor_id,
            prior_status,
            new_status,
            bin.last_fill_percent,
            reason.unwrap_or(new_status.default_reason()),
        )
        .await?;

        Ok(updated)
    }

    /// Registrar una entrada en el historial de estados.
    /// Único punto de escritura de bin_status_history.
    pub async fn insert_history(
        conn: &mut PgConnection,
        bin_id: Uuid,
        actor_id: Option<Uuid>,
        prior_status: BinStatus,
        new_status: BinStatus,
        fill_percent: i32,
        reason: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bin_status_history (
                id, bin_id, actor_id, prior_status, new_status, fill_percent, reason, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(bin_id)
        .bind(actor_id)
        .bind(prior_status)
        .bind(new_status)
        .bind(fill_percent)
        .bind(reason)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Marcar bote como pendiente de retiro.
    /// Solo puede hacerse si existe una solicitud de retiro aprobada.
    pub async fn mark_pending_retirement_tx(
        conn: &mut PgConnection,
        bin_id: Uuid,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<Bin> {
        let row: Option<(RequestStatus,)> = sqlx::query_as(
            r#"
            SELECT status FROM requests
            WHERE id = $1 AND bin_id = $2 AND request_type = $3
            "#,
        )
        .bind(request_id)
        .bind(bin_id)
        .bind(RequestType::Retire)
        .fetch_optional(&mut *conn)
        .await?;

        let status = row
            .ok_or_else(|| {
                AppError::NotFound("Solicitud de retiro no encontrada para este bote".to_string())
            })?
            .0;

        if status != RequestStatus::Approved {
            return Err(AppError::Conflict(
                "La solicitud debe estar aprobada para marcar el bote como pendiente".to_string(),
            ));
        }

        Self::change_status_tx(
            conn,
            bin_id,
            BinStatus::PendingRetirement,
            Some(actor_id),
            Some(&format!("Solicitud de retiro aprobada: {}", request_id)),
        )
        .await
    }

    /// Confirmar recolección física (marca como retirado)
    pub async fn confirm_collection_tx(
        conn: &mut PgConnection,
        bin_id: Uuid,
        collector_id: Uuid,
    ) -> AppResult<Bin> {
        Self::change_status_tx(
            conn,
            bin_id,
            BinStatus::Retired,
            Some(collector_id),
            Some("Recolección física confirmada por recolector"),
        )
        .await
    }

    /// Obtener historial de cambios de estado, más reciente primero
    pub async fn get_history(
        &self,
        bin_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<BinStatusHistoryEntry>> {
        let entries = sqlx::query_as::<_, BinStatusHistoryEntry>(
            r#"
            SELECT * FROM bin_status_history
            WHERE bin_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(bin_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
