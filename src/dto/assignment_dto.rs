//! DTOs de asignaciones
//! 
//! Requests y responses de la API de asignaciones. El request de
//! actualización no declara los campos inmutables (groupId, vehicleId,
//! driverId, createdByProfileId): cualquier intento de cambiarlos se
//! descarta en la deserialización.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

use crate::models::assignment::{Assignment, AssignmentRole, AssignmentType};
use crate::repositories::assignment_repository::AssignmentPatch;
use crate::utils::errors::{validation_error, AppError};
use crate::utils::validation::validate_non_negative;

/// Distinguir "campo ausente" (None) de "campo presente con null"
/// (Some(None)) al deserializar parches
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

// Request para crear una asignación
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub group_id: String,

    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub vehicle_id: String,

    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub driver_id: String,

    pub start_date: DateTime<Utc>,

    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub role: AssignmentRole,

    #[serde(default)]
    pub assignment_type: AssignmentType,

    #[serde(default)]
    pub start_mileage: Option<Decimal>,

    #[serde(default)]
    pub start_fuel_level: Option<Decimal>,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,

    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub created_by_profile_id: String,

    // Nombres de presentación para el evento de auditoría; los aporta el
    // llamador y no se persisten en el documento
    #[serde(default)]
    pub vehicle_name: Option<String>,

    #[serde(default)]
    pub driver_name: Option<String>,
}

impl CreateAssignmentRequest {
    /// Validación completa antes de cualquier acceso al almacén
    pub fn validate_payload(&self) -> Result<(), AppError> {
        self.validate()?;

        if let Some(mileage) = self.start_mileage {
            validate_non_negative(mileage)
                .map_err(|_| validation_error("startMileage", "must be non-negative"))?;
        }
        if let Some(fuel) = self.start_fuel_level {
            validate_non_negative(fuel)
                .map_err(|_| validation_error("startFuelLevel", "must be non-negative"))?;
        }

        Ok(())
    }
}

// Request para actualizar una asignación; solo campos mutables
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    #[serde(default)]
    pub role: Option<AssignmentRole>,

    #[serde(default)]
    pub assignment_type: Option<AssignmentType>,

    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<DateTime<Utc>>>,

    #[serde(default)]
    pub start_mileage: Option<Decimal>,

    #[serde(default)]
    pub end_mileage: Option<Decimal>,

    #[serde(default)]
    pub start_fuel_level: Option<Decimal>,

    #[serde(default)]
    pub end_fuel_level: Option<Decimal>,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateAssignmentRequest {
    /// Validación completa antes de cualquier acceso al almacén
    pub fn validate_payload(&self) -> Result<(), AppError> {
        self.validate()?;

        for (field, value) in [
            ("startMileage", self.start_mileage),
            ("endMileage", self.end_mileage),
            ("startFuelLevel", self.start_fuel_level),
            ("endFuelLevel", self.end_fuel_level),
        ] {
            if let Some(v) = value {
                validate_non_negative(v)
                    .map_err(|_| validation_error(field, "must be non-negative"))?;
            }
        }

        Ok(())
    }

    /// Parche a nivel de documento con los campos presentes
    pub fn to_patch(&self) -> AssignmentPatch {
        AssignmentPatch {
            role: self.role,
            assignment_type: self.assignment_type,
            start_date: self.start_date,
            end_date: self.end_date,
            start_mileage: self.start_mileage,
            end_mileage: self.end_mileage,
            start_fuel_level: self.start_fuel_level,
            end_fuel_level: self.end_fuel_level,
            notes: self.notes.clone(),
            is_active: None,
            enabled: None,
        }
    }

    /// Nombres (persistidos) de los campos presentes en el parche; la
    /// auditoría de actualizaciones registra nombres, nunca valores
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.role.is_some() {
            fields.push("role");
        }
        if self.assignment_type.is_some() {
            fields.push("assignmentType");
        }
        if self.start_date.is_some() {
            fields.push("startDate");
        }
        if self.end_date.is_some() {
            fields.push("endDate");
        }
        if self.start_mileage.is_some() {
            fields.push("startMileage");
        }
        if self.end_mileage.is_some() {
            fields.push("endMileage");
        }
        if self.start_fuel_level.is_some() {
            fields.push("startFuelLevel");
        }
        if self.end_fuel_level.is_some() {
            fields.push("endFuelLevel");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        fields
    }
}

// Request para finalizar una asignación
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndAssignmentRequest {
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub end_mileage: Option<Decimal>,

    #[serde(default)]
    pub end_fuel_level: Option<Decimal>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl EndAssignmentRequest {
    /// Validación completa antes de cualquier acceso al almacén
    pub fn validate_payload(&self) -> Result<(), AppError> {
        if let Some(mileage) = self.end_mileage {
            validate_non_negative(mileage)
                .map_err(|_| validation_error("endMileage", "must be non-negative"))?;
        }
        if let Some(fuel) = self.end_fuel_level {
            validate_non_negative(fuel)
                .map_err(|_| validation_error("endFuelLevel", "must be non-negative"))?;
        }
        Ok(())
    }
}

// Parámetros de listado
#[derive(Debug, Default, Deserialize)]
pub struct AssignmentListQuery {
    #[serde(default)]
    pub active_only: bool,
    pub limit: Option<i64>,
}

// Response de asignación
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: String,
    pub group_id: String,
    pub vehicle_id: String,
    pub driver_id: String,
    pub role: AssignmentRole,
    pub assignment_type: AssignmentType,
    pub start_date: String,
    pub end_date: Option<String>,
    pub is_active: bool,
    pub start_mileage: Option<Decimal>,
    pub end_mileage: Option<Decimal>,
    pub start_fuel_level: Option<Decimal>,
    pub end_fuel_level: Option<Decimal>,
    pub notes: Option<String>,
    pub created_by_profile_id: String,
    pub enabled: bool,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id.to_string(),
            group_id: assignment.group_id,
            vehicle_id: assignment.vehicle_id,
            driver_id: assignment.driver_id,
            role: assignment.role,
            assignment_type: assignment.assignment_type,
            start_date: assignment.start_date.to_rfc3339(),
            end_date: assignment.end_date.map(|d| d.to_rfc3339()),
            is_active: assignment.is_active,
            start_mileage: assignment.start_mileage,
            end_mileage: assignment.end_mileage,
            start_fuel_level: assignment.start_fuel_level,
            end_fuel_level: assignment.end_fuel_level,
            notes: assignment.notes,
            created_by_profile_id: assignment.created_by_profile_id,
            enabled: assignment.enabled,
        }
    }
}
