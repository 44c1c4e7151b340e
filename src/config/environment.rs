//! Configuración de variables de entorno

use std::env;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub port: u16,
    pub host: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    /// Intentos máximos por lectura de telemetría antes de descartar
    pub event_max_attempts: u32,
    /// Delay base (ms) del backoff exponencial de la cola de eventos
    pub event_backoff_base_ms: u64,
    /// Retención de telemetría en el document store, en días
    pub telemetry_retention_days: u32,
}

impl EnvironmentConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expiration: env::var("JWT_EXPIRATION")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .expect("JWT_EXPIRATION must be a valid number"),
            event_max_attempts: env::var("EVENT_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .expect("EVENT_MAX_ATTEMPTS must be a valid number"),
            event_backoff_base_ms: env::var("EVENT_BACKOFF_BASE_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .expect("EVENT_BACKOFF_BASE_MS must be a valid number"),
            telemetry_retention_days: env::var("TELEMETRY_RETENTION_DAYS")
                .unwrap_or_else(|_| "365".to_string())
                .parse()
                .expect("TELEMETRY_RETENTION_DAYS must be a valid number"),
        }
    }
}
