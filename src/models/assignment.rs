//! Modelo de Assignment
//! 
//! Este módulo contiene el struct Assignment que vincula un vehículo con
//! un conductor bajo un rol durante un periodo abierto o acotado.
//! Los nombres de campo persistidos (camelCase) se conservan por
//! compatibilidad de migración con los documentos existentes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::activity::compute_is_active;

/// Rol del conductor dentro de la asignación
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentRole {
    Primary,
    Secondary,
    Temp,
    Substitute,
}

impl AssignmentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentRole::Primary => "PRIMARY",
            AssignmentRole::Secondary => "SECONDARY",
            AssignmentRole::Temp => "TEMP",
            AssignmentRole::Substitute => "SUBSTITUTE",
        }
    }
}

impl Default for AssignmentRole {
    fn default() -> Self {
        AssignmentRole::Primary
    }
}

impl std::fmt::Display for AssignmentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentRole {
    type Err = String;

    /// Valores no reconocidos se rechazan, nunca se aceptan en silencio
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PRIMARY" => Ok(AssignmentRole::Primary),
            "SECONDARY" => Ok(AssignmentRole::Secondary),
            "TEMP" => Ok(AssignmentRole::Temp),
            "SUBSTITUTE" => Ok(AssignmentRole::Substitute),
            other => Err(format!("Unknown assignment role: {}", other)),
        }
    }
}

/// Tipo descriptivo de la asignación; no participa en ninguna invariante
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentType {
    Operation,
    Rental,
    Maintenance,
    Delivery,
    Other,
}

impl AssignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::Operation => "OPERATION",
            AssignmentType::Rental => "RENTAL",
            AssignmentType::Maintenance => "MAINTENANCE",
            AssignmentType::Delivery => "DELIVERY",
            AssignmentType::Other => "OTHER",
        }
    }
}

impl Default for AssignmentType {
    fn default() -> Self {
        AssignmentType::Operation
    }
}

impl std::fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asignación vehículo-conductor
/// 
/// `is_active` se deriva en cada escritura a partir de `end_date` y el
/// instante de esa escritura; ningún proceso lo recalcula después, por lo
/// que significa "no desactivada explícitamente" y no "activa ahora mismo".
/// Para la lectura derivada en tiempo real está `is_active_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: Uuid,
    pub group_id: String,
    pub vehicle_id: String,
    pub driver_id: String,
    pub role: AssignmentRole,
    pub assignment_type: AssignmentType,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_mileage: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_mileage: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_fuel_level: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_fuel_level: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_by_profile_id: String,
    pub enabled: bool,
}

impl Assignment {
    /// Actividad derivada en tiempo de lectura: habilitada y sin fecha de
    /// fin vencida a `now`. No consulta ni modifica el flag almacenado.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.enabled && compute_is_active(self.end_date, now)
    }
}
