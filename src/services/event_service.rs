//! Servicio de eventos de sensores
//!
//! Recibe lecturas validadas del transporte de ingesta, las clasifica y las
//! encola; el worker de la cola aplica la actualización sobre el bote.

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::models::enums::{classify_fill_level, BinStatus};
use crate::models::telemetry::{ReadingAck, SensorReading};
use crate::queue::EventQueue;
use crate::services::status_service::StatusService;
use crate::utils::errors::{AppError, AppResult, FieldError};

/// Cambio mínimo de porcentaje que amerita una entrada de historial
const SIGNIFICANT_FILL_DELTA: i32 = 5;

pub struct EventService {
    pool: PgPool,
}

impl EventService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Recibir y validar un evento del hardware, y encolarlo.
    /// El transporte solo debe reportar llenados >= 60%.
    pub async fn receive(
        &self,
        queue: &EventQueue,
        reading: SensorReading,
    ) -> AppResult<ReadingAck> {
        reading.validate()?;

        if reading.fill_percent < 60 {
            return Err(AppError::validation_with(
                "El evento solo debe enviarse cuando el porcentaje es >= 60%",
                vec![FieldError::new("fill_percent", "debe ser al menos 60%")],
            ));
        }

        let bin: Option<(bool,)> =
            sqlx::query_as("SELECT is_active FROM bins WHERE hardware_id = $1")
                .bind(&reading.hardware_id)
                .fetch_optional(&self.pool)
                .await?;

        match bin {
            None => {
                return Err(AppError::validation_with(
                    format!("Bote no registrado: {}", reading.hardware_id),
                    vec![FieldError::new(
                        "hardware_id",
                        "bote no encontrado en el sistema",
                    )],
                ))
            }
            Some((false,)) => {
                return Err(AppError::validation_with(
                    format!("Bote inactivo: {}", reading.hardware_id),
                    vec![FieldError::new(
                        "hardware_id",
                        "el bote está marcado como inactivo",
                    )],
                ))
            }
            Some((true,)) => {}
        }

        let ack = ReadingAck {
            hardware_id: reading.hardware_id.clone(),
            fill_percent: reading.fill_percent,
            classification: classify_fill_level(reading.fill_percent),
            status: "queued",
            message: "Evento recibido y en cola de procesamiento",
        };

        queue.enqueue(reading)?;
        Ok(ack)
    }

    /// Aplicar una lectura al bote correspondiente.
    /// Idempotente ante reentregas: siempre fija el último valor, nunca
    /// acumula. Registra historial solo ante cambios significativos.
    pub async fn apply_reading(pool: &PgPool, reading: &SensorReading) -> AppResult<Uuid> {
        let mut tx = pool.begin().await?;

        let bin: Option<(Uuid, BinStatus, i32)> = sqlx::query_as(
            r#"
            SELECT id, status, last_fill_percent FROM bins
            WHERE hardware_id = $1 AND is_active = TRUE
            FOR UPDATE
            "#,
        )
        .bind(&reading.hardware_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (bin_id, status, prior_fill) = bin.ok_or_else(|| {
            AppError::NotFound(format!("Bote no encontrado: {}", reading.hardware_id))
        })?;

        sqlx::query(
            r#"
            UPDATE bins
            SET
                last_fill_percent = $1,
                last_reading_at = NOW(),
                battery_level = $2,
                glass_type = COALESCE($3, glass_type),
                firmware_version = COALESCE($4, firmware_version),
                updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(reading.fill_percent)
        .bind(reading.battery_level)
        .bind(reading.glass_type)
        .bind(reading.firmware_version.as_deref())
        .bind(bin_id)
        .execute(&mut *tx)
        .await?;

        if is_significant_change(prior_fill, reading.fill_percent) {
            let level = classify_fill_level(reading.fill_percent);
            // El estado no cambia: solo se registra el porcentaje.
            StatusService::insert_history(
                &mut tx,
                bin_id,
                None,
                status,
                status,
                reading.fill_percent,
                &format!("Actualización de sensor: {}", level.label()),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(bin_id)
    }
}

/// Verdadero si la diferencia de porcentaje amerita historial
pub fn is_significant_change(prior: i32, new: i32) -> bool {
    (new - prior).abs() >= SIGNIFICANT_FILL_DELTA
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn significant_change_threshold() {
        assert!(!is_significant_change(60, 64));
        assert!(is_significant_change(60, 65));
        assert!(is_significant_change(70, 60));
        assert!(!is_significant_change(85, 85));
    }
}
