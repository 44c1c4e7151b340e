//! Enumeraciones del sistema
//!
//! Deben coincidir exactamente con los tipos ENUM de PostgreSQL.
//! La validación de transiciones vive aquí como función canónica única,
//! reutilizada por todos los call sites.

use serde::{Deserialize, Serialize};
use sqlx::Type;
use std::fmt;

/// Rol de usuario - mapea al ENUM user_role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    RouteManager,
    EstablishmentOwner,
    Collector,
}

/// Estado del bote - mapea al ENUM bin_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "bin_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BinStatus {
    Active,
    PendingRetirement,
    Retired,
}

impl BinStatus {
    /// Transiciones legales de la máquina de estados:
    ///
    /// | desde              | hacia                       |
    /// |--------------------|-----------------------------|
    /// | active             | pending_retirement          |
    /// | pending_retirement | retired, active             |
    /// | retired            | active (solo reasignación)  |
    pub fn can_transition_to(self, new: BinStatus) -> bool {
        use BinStatus::*;
        matches!(
            (self, new),
            (Active, PendingRetirement)
                | (PendingRetirement, Retired)
                | (PendingRetirement, Active)
                | (Retired, Active)
        )
    }

    /// Motivo por defecto al entrar a cada estado
    pub fn default_reason(self) -> &'static str {
        match self {
            BinStatus::Active => "Bote activado",
            BinStatus::PendingRetirement => "Solicitud de retiro aprobada",
            BinStatus::Retired => "Recolección física confirmada",
        }
    }
}

impl fmt::Display for BinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinStatus::Active => "active",
            BinStatus::PendingRetirement => "pending_retirement",
            BinStatus::Retired => "retired",
        };
        write!(f, "{}", s)
    }
}

/// Tipo de vidrio - mapea al ENUM glass_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "glass_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GlassType {
    Clear,
    Green,
    Amber,
    Mixed,
}

/// Tipo de solicitud - mapea al ENUM request_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "request_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Install,
    Retire,
    ManualCollection,
    Assistance,
}

/// Estado de solicitud - mapea al ENUM request_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// completed y cancelled son terminales
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Estado de la ruta - mapea al ENUM route_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "route_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteStatus::Planned => "planned",
            RouteStatus::Assigned => "assigned",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
            RouteStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Clasificación del nivel de llenado reportado por el sensor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FillLevel {
    Normal,
    Pending,
    Critical,
}

impl FillLevel {
    pub fn label(self) -> &'static str {
        match self {
            FillLevel::Normal => "Normal",
            FillLevel::Pending => "Pendiente de recolección",
            FillLevel::Critical => "Crítico",
        }
    }
}

/// Clasificar el nivel de llenado según el porcentaje (0-100)
pub fn classify_fill_level(percent: i32) -> FillLevel {
    if percent >= 80 {
        FillLevel::Critical
    } else if percent >= 60 {
        FillLevel::Pending
    } else {
        FillLevel::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_exhaustive() {
        use BinStatus::*;
        let all = [Active, PendingRetirement, Retired];
        let legal = [
            (Active, PendingRetirement),
            (PendingRetirement, Retired),
            (PendingRetirement, Active),
            (Retired, Active),
        ];

        for from in all {
            for to in all {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transición {} → {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn self_transitions_are_illegal() {
        for status in [
            BinStatus::Active,
            BinStatus::PendingRetirement,
            BinStatus::Retired,
        ] {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn fill_classification_bounds() {
        assert_eq!(classify_fill_level(0), FillLevel::Normal);
        assert_eq!(classify_fill_level(59), FillLevel::Normal);
        assert_eq!(classify_fill_level(60), FillLevel::Pending);
        assert_eq!(classify_fill_level(79), FillLevel::Pending);
        assert_eq!(classify_fill_level(80), FillLevel::Critical);
        assert_eq!(classify_fill_level(100), FillLevel::Critical);
    }

    #[test]
    fn terminal_request_states() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
    }
}
