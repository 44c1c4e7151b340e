//! Servicio de recolección
//!
//! Maneja la confirmación de recolección física: completado de puntos,
//! completado masivo, confirmación de retiro y cierre de rutas.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::bin::Bin;
use crate::models::enums::{BinStatus, RequestStatus, RequestType, RouteStatus};
use crate::models::route::{
    BulkCompleteError, BulkCompleteItem, BulkCompleteReport, Route, RoutePoint,
};
use crate::services::status_service::StatusService;
use crate::utils::errors::{AppError, AppResult};

/// Punto junto con el contexto de su ruta y bote, para validar completado
#[derive(Debug, sqlx::FromRow)]
struct PointContext {
    bin_id: Uuid,
    completed: bool,
    route_id: Uuid,
    assigned_collector_id: Option<Uuid>,
    route_status: RouteStatus,
    bin_status: BinStatus,
    bin_fill_percent: i32,
}

pub struct CollectionService {
    pool: PgPool,
}

impl CollectionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Marcar punto de ruta como completado.
    /// Si el bote sigue en estado active, su porcentaje vuelve a 0 y se deja
    /// constancia en el historial; la telemetría queda consistente con la
    /// realidad "recién vaciado" sin necesidad de una transición de estado.
    pub async fn mark_point_completed(
        &self,
        point_id: Uuid,
        collector_id: Uuid,
        collected_percent: Option<i32>,
        notes: Option<&str>,
    ) -> AppResult<RoutePoint> {
        let mut tx = self.pool.begin().await?;

        let ctx = sqlx::query_as::<_, PointContext>(
            r#"
            SELECT
                p.bin_id,
                p.completed,
                r.id AS route_id,
                r.assigned_collector_id,
                r.status AS route_status,
                b.status AS bin_status,
                b.last_fill_percent AS bin_fill_percent
            FROM route_points p
            JOIN routes r ON p.route_id = r.id
            JOIN bins b ON p.bin_id = b.id
            WHERE p.id = $1
            FOR UPDATE OF p, r
            "#,
        )
        .bind(point_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Punto de ruta no encontrado".to_string()))?;

        if ctx.assigned_collector_id != Some(collector_id) {
            return Err(AppError::Conflict(
                "Este punto no está asignado a este recolector".to_string(),
            ));
        }

        if ctx.route_status != RouteStatus::InProgress {
            return Err(AppError::Conflict(format!(
                "La ruta debe estar en progreso. Estado actual: {}",
                ctx.route_status
            )));
        }

        if ctx.completed {
            return Err(AppError::Conflict(
                "Este punto ya fue marcado como completado".to_string(),
            ));
        }

        let point = sqlx::query_as::<_, RoutePoint>(
            r#"
            UPDATE route_points
            SET
                completed = TRUE,
                collected_percent = $1,
                notes = COALESCE($2, notes),
                completed_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(collected_percent)
        .bind(notes)
        .bind(point_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE routes SET completed_points = completed_points + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(ctx.route_id)
        .execute(&mut *tx)
        .await?;

        if ctx.bin_status == BinStatus::Active {
            sqlx::query("UPDATE bins SET last_fill_percent = 0, updated_at = NOW() WHERE id = $1")
                .bind(ctx.bin_id)
                .execute(&mut *tx)
                .await?;

            let percent_note = collected_percent
                .map(|p| p.to_string())
                .unwrap_or_else(|| ctx.bin_fill_percent.to_string());

            StatusService::insert_history(
                &mut tx,
                ctx.bin_id,
                Some(collector_id),
                BinStatus::Active,
                BinStatus::Active,
                0,
                &format!(
                    "Bote recolectado en ruta. Porcentaje anterior: {}%",
                    percent_note
                ),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(point)
    }

    /// Marcar múltiples puntos como completados.
    /// Cada punto se procesa en su propia transacción; los fallos
    /// individuales se reportan por item y la operación completa solo
    /// falla cuando todos los items fallaron.
    pub async fn bulk_complete(
        &self,
        items: Vec<BulkCompleteItem>,
        collector_id: Uuid,
    ) -> AppResult<BulkCompleteReport> {
        let total = items.len();
        let mut completed = Vec::new();
        let mut errors = Vec::new();

        for item in items {
            match self
                .mark_point_completed(
                    item.point_id,
                    collector_id,
                    item.collected_percent,
                    item.notes.as_deref(),
                )
                .await
            {
                Ok(point) => completed.push(point),
                Err(err) => errors.push(BulkCompleteError {
                    point_id: item.point_id,
                    error: err.to_string(),
                }),
            }
        }

        build_bulk_report(total, completed, errors)
    }

    /// Confirmar recolección física de un bote pendiente de retiro.
    /// Marca el bote como retirado vía la máquina de estados y completa la
    /// solicitud de retiro aprobada asociada, si existe, en una transacción.
    pub async fn confirm_bin_retirement(
        &self,
        bin_id: Uuid,
        collector_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<Bin> {
        let mut tx = self.pool.begin().await?;

        let current: Option<(BinStatus,)> = sqlx::query_as(
            "SELECT status FROM bins WHERE id = $1 AND is_active = TRUE FOR UPDATE",
        )
        .bind(bin_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (status,) = current
            .ok_or_else(|| AppError::NotFound("Bote no encontrado o inactivo".to_string()))?;

        if status != BinStatus::PendingRetirement {
            return Err(AppError::Conflict(format!(
                "El bote debe estar en estado pending_retirement. Estado actual: {}",
                status
            )));
        }

        let bin = StatusService::confirm_collection_tx(&mut tx, bin_id, collector_id).await?;

        // Completar la solicitud de retiro aprobada asociada, si existe
        sqlx::query(
            r#"
            UPDATE requests
            SET
                status = $1,
                admin_response = $2,
                completed_at = NOW(),
                updated_at = NOW()
            WHERE bin_id = $3
              AND request_type = $4
              AND status = $5
            "#,
        )
        .bind(RequestStatus::Completed)
        .bind(notes.unwrap_or("Recolección física confirmada"))
        .bind(bin_id)
        .bind(RequestType::Retire)
        .bind(RequestStatus::Approved)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(bin)
    }

    /// Completar ruta: requiere in_progress, asignación al recolector y
    /// todos los puntos completados.
    pub async fn complete_route(&self, route_id: Uuid, collector_id: Uuid) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let route = sqlx::query_as::<_, Route>(
            "SELECT * FROM routes WHERE id = $1 AND assigned_collector_id = $2 FOR UPDATE",
        )
        .bind(route_id)
        .bind(collector_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Ruta no encontrada o no asignada a este recolector".to_string())
        })?;

        if route.status != RouteStatus::InProgress {
            return Err(AppError::Conflict(format!(
                "La ruta debe estar en progreso. Estado actual: {}",
                route.status
            )));
        }

        let (total, completed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE completed = TRUE)
            FROM route_points
            WHERE route_id = $1
            "#,
        )
        .bind(route_id)
        .fetch_one(&mut *tx)
        .await?;

        if completed < total {
            return Err(AppError::validation(format!(
                "No todos los puntos están completados. Completados: {}/{}",
                completed, total
            )));
        }

        let finished = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET status = $1, completed_at = NOW(), updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(RouteStatus::Completed)
        .bind(route_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(finished)
    }
}

/// Construir el reporte de completado masivo.
/// Semántica de éxito parcial: Validation solo cuando nada se completó.
pub fn build_bulk_report(
    total: usize,
    completed: Vec<RoutePoint>,
    errors: Vec<BulkCompleteError>,
) -> AppResult<BulkCompleteReport> {
    if total > 0 && completed.is_empty() {
        return Err(AppError::validation(
            "No se pudo completar ningún punto",
        ));
    }

    Ok(BulkCompleteReport {
        succeeded: completed.len(),
        failed: errors.len(),
        total,
        completed,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_error(msg: &str) -> BulkCompleteError {
        BulkCompleteError {
            point_id: Uuid::new_v4(),
            error: msg.to_string(),
        }
    }

    fn fake_point() -> RoutePoint {
        RoutePoint {
            id: Uuid::new_v4(),
            route_id: Uuid::new_v4(),
            bin_id: Uuid::new_v4(),
            point_order: 1,
            completed: true,
            collected_percent: Some(85),
            notes: None,
            completed_at: Some(chrono::Utc::now()),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn bulk_report_tolerates_partial_failure() {
        let report =
            build_bulk_report(2, vec![fake_point()], vec![fake_error("ruta no en progreso")])
                .unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total, 2);
    }

    #[test]
    fn bulk_report_fails_only_when_everything_failed() {
        let err = build_bulk_report(2, Vec::new(), vec![fake_error("a"), fake_error("b")])
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn bulk_report_empty_input_is_ok() {
        let report = build_bulk_report(0, Vec::new(), Vec::new()).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.succeeded, 0);
    }
}
