//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use sqlx::PgPool;

use crate::config::EnvironmentConfig;
use crate::queue::EventQueue;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub event_queue: EventQueue,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig, event_queue: EventQueue) -> Self {
        Self {
            pool,
            config,
            event_queue,
        }
    }
}
