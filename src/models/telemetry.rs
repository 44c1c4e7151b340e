//! Modelo de lecturas de telemetría
//!
//! El transporte de ingesta valida y entrega lecturas de sensores; aquí se
//! define la forma de la lectura y el acuse de encolado.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{FillLevel, GlassType};

/// Lectura de sensor entregada por el colaborador de ingesta
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SensorReading {
    #[validate(length(min = 3, max = 64))]
    pub hardware_id: String,

    #[validate(range(min = 0, max = 100))]
    pub fill_percent: i32,

    #[validate(range(min = 0, max = 100))]
    pub battery_level: Option<i32>,

    pub temperature: Option<f64>,
    pub glass_type: Option<GlassType>,

    #[validate(length(max = 32))]
    pub firmware_version: Option<String>,

    pub timestamp: Option<DateTime<Utc>>,
}

/// Acuse devuelto al transporte cuando la lectura queda encolada
#[derive(Debug, Serialize)]
pub struct ReadingAck {
    pub hardware_id: String,
    pub fill_percent: i32,
    pub classification: FillLevel,
    pub status: &'static str,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(fill: i32) -> SensorReading {
        SensorReading {
            hardware_id: "GLS-SENSOR-001".to_string(),
            fill_percent: fill,
            battery_level: Some(80),
            temperature: Some(21.5),
            glass_type: None,
            firmware_version: Some("2.1.0".to_string()),
            timestamp: None,
        }
    }

    #[test]
    fn test_reading_valida_pasa() {
        assert!(reading(75).validate().is_ok());
    }

    #[test]
    fn test_fill_percent_fuera_de_rango_rechazado() {
        assert!(reading(101).validate().is_err());
        assert!(reading(-1).validate().is_err());
    }

    #[test]
    fn test_battery_fuera_de_rango_rechazado() {
        let mut r = reading(75);
        r.battery_level = Some(150);
        assert!(r.validate().is_err());
    }

    #[test]
    fn test_hardware_id_corto_rechazado() {
        let mut r = reading(75);
        r.hardware_id = "ab".to_string();
        assert!(r.validate().is_err());
    }
}
