//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod bin;
pub mod enums;
pub mod request;
pub mod route;
pub mod telemetry;
