//! Cola de procesamiento asíncrono de eventos de sensores
//!
//! Cola in-process sobre un canal mpsc: el handler de ingesta encola y
//! responde de inmediato; el worker aplica cada lectura con reintentos
//! acotados y backoff exponencial. Aplicar una lectura es idempotente
//! (fija el último valor), así que una reentrega no duplica nada.

use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::telemetry::SensorReading;
use crate::services::event_service::EventService;
use crate::utils::errors::{AppError, AppResult};

/// Política de reintentos de la cola
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Delay antes del reintento número `attempt` (1-indexado):
    /// base * 2^(attempt-1)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Lado productor de la cola de eventos
#[derive(Clone)]
pub struct EventQueue {
    sender: mpsc::UnboundedSender<SensorReading>,
}

impl EventQueue {
    /// Crear la cola y lanzar el worker en background
    pub fn start(pool: PgPool, policy: RetryPolicy) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(pool, receiver, policy));
        (Self { sender }, handle)
    }

    /// Encolar una lectura para procesamiento asíncrono
    pub fn enqueue(&self, reading: SensorReading) -> AppResult<()> {
        self.sender.send(reading).map_err(|_| {
            AppError::Internal("La cola de eventos no está disponible".to_string())
        })
    }
}

/// Loop del worker: procesa lecturas una a una con reintentos
async fn run_worker(
    pool: PgPool,
    mut receiver: mpsc::UnboundedReceiver<SensorReading>,
    policy: RetryPolicy,
) {
    info!("Worker de eventos de sensores iniciado");

    while let Some(reading) = receiver.recv().await {
        process_with_retries(&pool, &reading, policy).await;
    }

    info!("Worker de eventos de sensores terminado");
}

async fn process_with_retries(pool: &PgPool, reading: &SensorReading, policy: RetryPolicy) {
    for attempt in 1..=policy.max_attempts {
        match EventService::apply_reading(pool, reading).await {
            Ok(bin_id) => {
                info!(
                    hardware_id = %reading.hardware_id,
                    %bin_id,
                    fill = reading.fill_percent,
                    "Lectura de sensor aplicada"
                );
                return;
            }
            // Un bote desconocido no se vuelve conocido reintentando
            Err(AppError::NotFound(msg)) => {
                warn!(hardware_id = %reading.hardware_id, "{}", msg);
                return;
            }
            Err(err) if attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    hardware_id = %reading.hardware_id,
                    attempt,
                    ?delay,
                    "Fallo procesando lectura, reintentando: {}",
                    err
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                error!(
                    hardware_id = %reading.hardware_id,
                    attempts = policy.max_attempts,
                    "Lectura descartada tras agotar reintentos: {}",
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_exponential() {
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 2000,
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_saturates_instead_of_overflowing() {
        let policy = RetryPolicy {
            max_attempts: 100,
            base_delay_ms: u64::MAX,
        };
        // no panic
        let _ = policy.delay_for_attempt(80);
    }
}
