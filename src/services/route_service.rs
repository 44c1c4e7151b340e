//! Servicio de gestión de rutas de recolección
//!
//! Maneja creación manual, generación automática por umbral de llenado,
//! puntos ordenados, asignación e inicio/cancelación.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::bin::Page;
use crate::models::enums::{BinStatus, GlassType, RouteStatus};
use crate::models::route::{
    AddPointRequest, CreateRouteRequest, GenerateRouteRequest, Route, RouteFilters, RoutePoint,
    RouteWithPoints,
};
use crate::services::bin_service::BinService;
use crate::utils::errors::{AppError, AppResult};

/// Umbral de llenado por defecto para incluir un bote en una ruta generada
pub const DEFAULT_MIN_FILL: i32 = 60;
/// Máximo de puntos por defecto en una ruta generada
pub const DEFAULT_MAX_POINTS: i32 = 50;

/// Fila de la selección de botes elegibles para generación
#[derive(Debug, sqlx::FromRow)]
struct EligibleBin {
    id: Uuid,
    last_fill_percent: i32,
    establishment_name: String,
}

pub struct RouteService {
    pool: PgPool,
}

impl RouteService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crear nueva ruta manual en estado planned, sin puntos
    pub async fn create(&self, creator_id: Uuid, request: CreateRouteRequest) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        BinService::ensure_sector_active(&mut tx, request.sector_id).await?;

        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (
                id, sector_id, creator_id, name, description, status,
                planned_date, total_points, completed_points, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.sector_id)
        .bind(creator_id)
        .bind(&request.name)
        .bind(request.description.as_deref())
        .bind(RouteStatus::Planned)
        .bind(request.planned_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(route)
    }

    /// Generar ruta automáticamente por sector.
    /// Selecciona botes activos con llenado >= umbral, ordenados por llenado
    /// descendente y lectura más antigua primero, con tope de puntos.
    /// Toda la generación es una sola transacción: o la ruta queda completa
    /// con todos sus puntos, o no queda nada.
    pub async fn generate(
        &self,
        creator_id: Uuid,
        request: GenerateRouteRequest,
    ) -> AppResult<RouteWithPoints> {
        let min_fill = request.min_fill_percent.unwrap_or(DEFAULT_MIN_FILL);
        let max_points = request.max_points.unwrap_or(DEFAULT_MAX_POINTS);

        let mut tx = self.pool.begin().await?;

        let sector: Option<(String, String)> =
            sqlx::query_as("SELECT name, code FROM sectors WHERE id = $1 AND is_active = TRUE")
                .bind(request.sector_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (_, sector_code) = sector
            .ok_or_else(|| AppError::NotFound("Sector no encontrado o inactivo".to_string()))?;

        let eligible = sqlx::query_as::<_, EligibleBin>(
            r#"
            SELECT
                b.id,
                b.last_fill_percent,
                e.name AS establishment_name
            FROM bins b
            JOIN establishments e ON b.establishment_id = e.id
            WHERE b.sector_id = $1
              AND b.is_active = TRUE
              AND b.status = $2
              AND b.last_fill_percent >= $3
              AND ($4::glass_type IS NULL OR b.glass_type = $4)
            ORDER BY b.last_fill_percent DESC, b.last_reading_at ASC
            LIMIT $5
            "#,
        )
        .bind(request.sector_id)
        .bind(BinStatus::Active)
        .bind(min_fill)
        .bind(request.glass_type)
        .bind(max_points as i64)
        .fetch_all(&mut *tx)
        .await?;

        if eligible.is_empty() {
            return Err(AppError::validation(
                "No hay botes elegibles para crear ruta en este sector",
            ));
        }

        let name = request.name.unwrap_or_else(|| {
            format!("Ruta {} - {}", sector_code, Utc::now().format("%Y-%m-%d"))
        });

        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (
                id, sector_id, creator_id, name, description, status,
                planned_date, total_points, completed_points, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.sector_id)
        .bind(creator_id)
        .bind(&name)
        .bind(format!(
            "Ruta generada automáticamente con {} puntos",
            eligible.len()
        ))
        .bind(RouteStatus::Planned)
        .bind(
            request
                .planned_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        )
        .bind(eligible.len() as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut points = Vec::with_capacity(eligible.len());
        for (index, bin) in eligible.iter().enumerate() {
            let point = sqlx::query_as::<_, RoutePoint>(
                r#"
                INSERT INTO route_points (
                    id, route_id, bin_id, point_order, completed, notes, created_at
                ) VALUES ($1, $2, $3, $4, FALSE, $5, NOW())
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(route.id)
            .bind(bin.id)
            .bind((index + 1) as i32)
            .bind(format!(
                "{} - {}%",
                bin.establishment_name, bin.last_fill_percent
            ))
            .fetch_one(&mut *tx)
            .await?;

            points.push(point);
        }

        tx.commit().await?;
        Ok(RouteWithPoints { route, points })
    }

    /// Agregar punto manual a una ruta existente.
    /// El orden es max(orden existente) + 1.
    pub async fn add_point(
        &self,
        route_id: Uuid,
        request: AddPointRequest,
    ) -> AppResult<RoutePoint> {
        let mut tx = self.pool.begin().await?;

        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1 FOR UPDATE")
            .bind(route_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Ruta no encontrada".to_string()))?;

        if matches!(route.status, RouteStatus::Completed | RouteStatus::Cancelled) {
            return Err(AppError::Conflict(format!(
                "No se pueden agregar puntos a una ruta {}",
                route.status
            )));
        }

        let bin: Option<(Uuid,)> = sqlx::query_as(
            "SELECT sector_id FROM bins WHERE id = $1 AND is_active = TRUE",
        )
        .bind(request.bin_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (bin_sector,) =
            bin.ok_or_else(|| AppError::NotFound("Bote no encontrado o inactivo".to_string()))?;

        if bin_sector != route.sector_id {
            return Err(AppError::Conflict(
                "El bote no pertenece al sector de la ruta".to_string(),
            ));
        }

        let already: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM route_points WHERE route_id = $1 AND bin_id = $2",
        )
        .bind(route_id)
        .bind(request.bin_id)
        .fetch_optional(&mut *tx)
        .await?;

        if already.is_some() {
            return Err(AppError::Conflict(
                "El bote ya está incluido en esta ruta".to_string(),
            ));
        }

        let (next_order,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(point_order), 0) + 1 FROM route_points WHERE route_id = $1",
        )
        .bind(route_id)
        .fetch_one(&mut *tx)
        .await?;

        let point = sqlx::query_as::<_, RoutePoint>(
            r#"
            INSERT INTO route_points (
                id, route_id, bin_id, point_order, completed, notes, created_at
            ) VALUES ($1, $2, $3, $4, FALSE, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(route_id)
        .bind(request.bin_id)
        .bind(next_order)
        .bind(request.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE routes SET total_points = total_points + 1, updated_at = NOW() WHERE id = $1")
            .bind(route_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(point)
    }

    /// Asignar ruta planificada a un recolector activo
    pub async fn assign(&self, route_id: Uuid, collector_id: Uuid) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1 FOR UPDATE")
            .bind(route_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Ruta no encontrada".to_string()))?;

        if route.status != RouteStatus::Planned {
            return Err(AppError::Conflict(format!(
                "Solo se pueden asignar rutas planificadas. Estado actual: {}",
                route.status
            )));
        }

        let collector: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = $1 AND is_active = TRUE")
                .bind(collector_id)
                .fetch_optional(&mut *tx)
                .await?;

        if collector.is_none() {
            return Err(AppError::NotFound(
                "Recolector no encontrado o inactivo".to_string(),
            ));
        }

        let assigned = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET assigned_collector_id = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(collector_id)
        .bind(RouteStatus::Assigned)
        .bind(route_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(assigned)
    }

    /// Iniciar ruta. El UPDATE condiciona atómicamente estado y asignado:
    /// una request obsoleta o de otro recolector no actualiza ninguna fila
    /// y se rechaza como Conflict.
    pub async fn start(&self, route_id: Uuid, collector_id: Uuid) -> AppResult<Route> {
        let started = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET status = $1, started_at = NOW(), updated_at = NOW()
            WHERE id = $2
              AND assigned_collector_id = $3
              AND status = $4
            RETURNING *
            "#,
        )
        .bind(RouteStatus::InProgress)
        .bind(route_id)
        .bind(collector_id)
        .bind(RouteStatus::Assigned)
        .fetch_optional(&self.pool)
        .await?;

        started.ok_or_else(|| {
            AppError::Conflict(
                "No se puede iniciar la ruta. Verifique estado y asignación".to_string(),
            )
        })
    }

    /// Cancelar ruta (solo desde planned o assigned)
    pub async fn cancel(
        &self,
        route_id: Uuid,
        _actor_id: Uuid,
        reason: Option<&str>,
    ) -> AppResult<Route> {
        let cancelled = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET status = $1, description = COALESCE($2, description), updated_at = NOW()
            WHERE id = $3
              AND status IN ($4, $5)
            RETURNING *
            "#,
        )
        .bind(RouteStatus::Cancelled)
        .bind(reason)
        .bind(route_id)
        .bind(RouteStatus::Planned)
        .bind(RouteStatus::Assigned)
        .fetch_optional(&self.pool)
        .await?;

        cancelled.ok_or_else(|| {
            AppError::Conflict("Solo se pueden cancelar rutas planificadas o asignadas".to_string())
        })
    }

    /// Obtener ruta con sus puntos ordenados
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<RouteWithPoints> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ruta no encontrada".to_string()))?;

        let points = Self::points_of(&self.pool, id).await?;

        Ok(RouteWithPoints { route, points })
    }

    /// Puntos de una ruta en orden de visita
    async fn points_of(
        pool: &PgPool,
        route_id: Uuid,
    ) -> AppResult<Vec<RoutePoint>> {
        let points = sqlx::query_as::<_, RoutePoint>(
            "SELECT * FROM route_points WHERE route_id = $1 ORDER BY point_order ASC",
        )
        .bind(route_id)
        .fetch_all(pool)
        .await?;

        Ok(points)
    }

    /// Listar rutas con filtros
    pub async fn list(&self, filters: RouteFilters) -> AppResult<Page<Route>> {
        let limit = filters.limit.unwrap_or(50).clamp(1, 200);
        let offset = filters.offset.unwrap_or(0).max(0);

        let routes = sqlx::query_as::<_, Route>(
            r#"
            SELECT * FROM routes
            WHERE ($1::uuid IS NULL OR sector_id = $1)
              AND ($2::route_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR assigned_collector_id = $3)
              AND ($4::date IS NULL OR planned_date >= $4)
              AND ($5::date IS NULL OR planned_date <= $5)
            ORDER BY planned_date DESC NULLS LAST, created_at DESC
            LIMIT $6 OFFSET $7
            "#,
        )
        .bind(filters.sector_id)
        .bind(filters.status)
        .bind(filters.collector_id)
        .bind(filters.date_from)
        .bind(filters.date_to)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM routes
            WHERE ($1::uuid IS NULL OR sector_id = $1)
              AND ($2::route_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR assigned_collector_id = $3)
              AND ($4::date IS NULL OR planned_date >= $4)
              AND ($5::date IS NULL OR planned_date <= $5)
            "#,
        )
        .bind(filters.sector_id)
        .bind(filters.status)
        .bind(filters.collector_id)
        .bind(filters.date_from)
        .bind(filters.date_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(Page::new(routes, total, limit, offset))
    }
}

/// Validaciones puras de elegibilidad, compartidas con los tests
pub fn is_eligible_for_route(
    status: BinStatus,
    is_active: bool,
    fill_percent: i32,
    min_fill: i32,
    glass_filter: Option<GlassType>,
    glass_type: GlassType,
) -> bool {
    status == BinStatus::Active
        && is_active
        && fill_percent >= min_fill
        && glass_filter.map_or(true, |g| g == glass_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    #[test]
    fn eligibility_requires_active_status_and_threshold() {
        assert!(is_eligible_for_route(
            BinStatus::Active,
            true,
            60,
            60,
            None,
            GlassType::Mixed
        ));
        assert!(!is_eligible_for_route(
            BinStatus::Active,
            true,
            59,
            60,
            None,
            GlassType::Mixed
        ));
        assert!(!is_eligible_for_route(
            BinStatus::PendingRetirement,
            true,
            95,
            60,
            None,
            GlassType::Mixed
        ));
        assert!(!is_eligible_for_route(
            BinStatus::Active,
            false,
            95,
            60,
            None,
            GlassType::Mixed
        ));
    }

    #[test]
    fn glass_filter_restricts_selection() {
        assert!(is_eligible_for_route(
            BinStatus::Active,
            true,
            80,
            60,
            Some(GlassType::Green),
            GlassType::Green
        ));
        assert!(!is_eligible_for_route(
            BinStatus::Active,
            true,
            80,
            60,
            Some(GlassType::Green),
            GlassType::Amber
        ));
    }

    // Orden de selección: llenado descendente, lectura más antigua primero.
    #[test]
    fn selection_order_matches_generation_query() {
        let t0: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let t1: DateTime<Utc> = "2026-01-02T00:00:00Z".parse().unwrap();

        let mut bins = vec![(70, t1), (85, t0), (85, t1), (95, t0)];
        bins.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        assert_eq!(bins, vec![(95, t0), (85, t0), (85, t1), (70, t1)]);
    }
}
