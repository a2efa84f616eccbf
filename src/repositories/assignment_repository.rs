//! Repositorio de asignaciones
//! 
//! Adaptador de almacenamiento a nivel de documento: create/read/update por
//! id más listado filtrado. El almacén no ofrece transacciones
//! multi-documento, así que cada operación es una única sentencia; la
//! consistencia entre registros se mantiene por protocolo en los servicios.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::assignment::{Assignment, AssignmentRole, AssignmentType};
use crate::utils::errors::{not_found_error, AppError};

/// Filtros de listado soportados por el almacén: igualdad sobre
/// identificadores y rol, igualdad booleana y límite de resultados.
/// El listado siempre se ordena por `startDate` descendente.
#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub group_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub role: Option<AssignmentRole>,
    pub is_active: Option<bool>,
    pub enabled: Option<bool>,
    pub limit: Option<i64>,
}

/// Parche a nivel de documento: solo los campos presentes se escriben.
/// `end_date` distingue "no tocar" (None) de "poner a nulo" (Some(None)).
#[derive(Debug, Clone, Default)]
pub struct AssignmentPatch {
    pub role: Option<AssignmentRole>,
    pub assignment_type: Option<AssignmentType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
    pub start_mileage: Option<Decimal>,
    pub end_mileage: Option<Decimal>,
    pub start_fuel_level: Option<Decimal>,
    pub end_fuel_level: Option<Decimal>,
    pub notes: Option<String>,
    pub enabled: Option<bool>,
}

impl AssignmentPatch {
    /// Representación JSON del parche con los nombres de campo persistidos
    pub fn to_document(&self) -> serde_json::Map<String, Value> {
        let mut doc = serde_json::Map::new();
        if let Some(role) = self.role {
            doc.insert("role".to_string(), json!(role));
        }
        if let Some(assignment_type) = self.assignment_type {
            doc.insert("assignmentType".to_string(), json!(assignment_type));
        }
        if let Some(start_date) = self.start_date {
            doc.insert("startDate".to_string(), json!(start_date));
        }
        if let Some(end_date) = self.end_date {
            doc.insert("endDate".to_string(), json!(end_date));
        }
        if let Some(is_active) = self.is_active {
            doc.insert("isActive".to_string(), json!(is_active));
        }
        if let Some(start_mileage) = self.start_mileage {
            doc.insert("startMileage".to_string(), json!(start_mileage));
        }
        if let Some(end_mileage) = self.end_mileage {
            doc.insert("endMileage".to_string(), json!(end_mileage));
        }
        if let Some(start_fuel_level) = self.start_fuel_level {
            doc.insert("startFuelLevel".to_string(), json!(start_fuel_level));
        }
        if let Some(end_fuel_level) = self.end_fuel_level {
            doc.insert("endFuelLevel".to_string(), json!(end_fuel_level));
        }
        if let Some(notes) = &self.notes {
            doc.insert("notes".to_string(), json!(notes));
        }
        if let Some(enabled) = self.enabled {
            doc.insert("enabled".to_string(), json!(enabled));
        }
        doc
    }

    /// Aplicar el parche sobre una asignación en memoria
    pub fn apply(&self, assignment: &mut Assignment) {
        if let Some(role) = self.role {
            assignment.role = role;
        }
        if let Some(assignment_type) = self.assignment_type {
            assignment.assignment_type = assignment_type;
        }
        if let Some(start_date) = self.start_date {
            assignment.start_date = start_date;
        }
        if let Some(end_date) = self.end_date {
            assignment.end_date = end_date;
        }
        if let Some(is_active) = self.is_active {
            assignment.is_active = is_active;
        }
        if let Some(start_mileage) = self.start_mileage {
            assignment.start_mileage = Some(start_mileage);
        }
        if let Some(end_mileage) = self.end_mileage {
            assignment.end_mileage = Some(end_mileage);
        }
        if let Some(start_fuel_level) = self.start_fuel_level {
            assignment.start_fuel_level = Some(start_fuel_level);
        }
        if let Some(end_fuel_level) = self.end_fuel_level {
            assignment.end_fuel_level = Some(end_fuel_level);
        }
        if let Some(notes) = &self.notes {
            assignment.notes = Some(notes.clone());
        }
        if let Some(enabled) = self.enabled {
            assignment.enabled = enabled;
        }
    }
}

/// Contrato del adaptador de almacenamiento de asignaciones
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Crear el documento de una asignación nueva
    async fn create(&self, assignment: &Assignment) -> Result<Assignment, AppError>;

    /// Buscar una asignación por id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Assignment>, AppError>;

    /// Actualizar campos presentes del parche; falla con NotFound si el id no existe
    async fn update(&self, id: Uuid, patch: &AssignmentPatch) -> Result<Assignment, AppError>;

    /// Listado filtrado, ordenado por `startDate` descendente
    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, AppError>;
}

/// Implementación PostgreSQL: documentos JSONB con una sentencia por
/// operación, sin transacciones.
pub struct PgAssignmentRepository {
    pool: PgPool,
}

impl PgAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(doc: Value) -> Result<Assignment, AppError> {
        serde_json::from_value(doc)
            .map_err(|e| AppError::Internal(format!("Invalid assignment document: {}", e)))
    }
}

#[async_trait]
impl AssignmentRepository for PgAssignmentRepository {
    async fn create(&self, assignment: &Assignment) -> Result<Assignment, AppError> {
        let doc = serde_json::to_value(assignment)
            .map_err(|e| AppError::Internal(format!("Error encoding assignment: {}", e)))?;

        sqlx::query("INSERT INTO vehicle_driver_assignments (id, doc) VALUES ($1, $2)")
            .bind(assignment.id)
            .bind(doc)
            .execute(&self.pool)
            .await?;

        Ok(assignment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Assignment>, AppError> {
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM vehicle_driver_assignments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        doc.map(Self::decode).transpose()
    }

    async fn update(&self, id: Uuid, patch: &AssignmentPatch) -> Result<Assignment, AppError> {
        let merge = Value::Object(patch.to_document());

        let doc: Option<Value> = sqlx::query_scalar(
            r#"
            UPDATE vehicle_driver_assignments
            SET doc = doc || $2
            WHERE id = $1
            RETURNING doc
            "#,
        )
        .bind(id)
        .bind(merge)
        .fetch_optional(&self.pool)
        .await?;

        match doc {
            Some(doc) => Self::decode(doc),
            None => Err(not_found_error("Assignment", &id.to_string())),
        }
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, AppError> {
        let docs: Vec<Value> = sqlx::query_scalar(
            r#"
            SELECT doc FROM vehicle_driver_assignments
            WHERE ($1::text IS NULL OR doc->>'groupId' = $1)
              AND ($2::text IS NULL OR doc->>'vehicleId' = $2)
              AND ($3::text IS NULL OR doc->>'driverId' = $3)
              AND ($4::text IS NULL OR doc->>'role' = $4)
              AND ($5::boolean IS NULL OR (doc->>'isActive')::boolean = $5)
              AND ($6::boolean IS NULL OR (doc->>'enabled')::boolean = $6)
            ORDER BY (doc->>'startDate')::timestamptz DESC
            LIMIT $7
            "#,
        )
        .bind(&filter.group_id)
        .bind(&filter.vehicle_id)
        .bind(&filter.driver_id)
        .bind(filter.role.map(|r| r.as_str()))
        .bind(filter.is_active)
        .bind(filter.enabled)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await?;

        docs.into_iter().map(Self::decode).collect()
    }
}
