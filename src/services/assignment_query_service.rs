//! Servicio de consultas de asignaciones
//! 
//! Capa de solo lectura usada por la UI y por la admisión de nuevas
//! asignaciones activas. Todas las consultas excluyen registros
//! deshabilitados y nunca mutan estado.

use std::sync::Arc;

use crate::models::assignment::{Assignment, AssignmentRole};
use crate::repositories::assignment_repository::{AssignmentFilter, AssignmentRepository};
use crate::utils::errors::AppError;

#[derive(Clone)]
pub struct AssignmentQueryService {
    repository: Arc<dyn AssignmentRepository>,
}

impl AssignmentQueryService {
    pub fn new(repository: Arc<dyn AssignmentRepository>) -> Self {
        Self { repository }
    }

    /// Historial de asignaciones de un vehículo, más recientes primero
    pub async fn list_by_vehicle(
        &self,
        vehicle_id: &str,
        active_only: bool,
    ) -> Result<Vec<Assignment>, AppError> {
        let filter = AssignmentFilter {
            vehicle_id: Some(vehicle_id.to_string()),
            enabled: Some(true),
            is_active: active_only.then_some(true),
            ..Default::default()
        };
        self.repository.list(&filter).await
    }

    /// Historial de asignaciones de un conductor, más recientes primero
    pub async fn list_by_driver(
        &self,
        driver_id: &str,
        active_only: bool,
    ) -> Result<Vec<Assignment>, AppError> {
        let filter = AssignmentFilter {
            driver_id: Some(driver_id.to_string()),
            enabled: Some(true),
            is_active: active_only.then_some(true),
            ..Default::default()
        };
        self.repository.list(&filter).await
    }

    /// Asignaciones de un grupo, con límite opcional de resultados
    pub async fn list_by_group(
        &self,
        group_id: &str,
        active_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<Assignment>, AppError> {
        let filter = AssignmentFilter {
            group_id: Some(group_id.to_string()),
            enabled: Some(true),
            is_active: active_only.then_some(true),
            limit,
            ..Default::default()
        };
        self.repository.list(&filter).await
    }

    /// Asignación PRIMARY activa de un vehículo, si existe (a lo sumo una)
    pub async fn get_active_primary_for_vehicle(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<Assignment>, AppError> {
        let filter = AssignmentFilter {
            vehicle_id: Some(vehicle_id.to_string()),
            role: Some(AssignmentRole::Primary),
            is_active: Some(true),
            enabled: Some(true),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.repository.list(&filter).await?.into_iter().next())
    }

    /// Asignación activa de un conductor para un rol, si existe (a lo sumo una)
    pub async fn get_active_for_driver_role(
        &self,
        driver_id: &str,
        role: AssignmentRole,
    ) -> Result<Option<Assignment>, AppError> {
        let filter = AssignmentFilter {
            driver_id: Some(driver_id.to_string()),
            role: Some(role),
            is_active: Some(true),
            enabled: Some(true),
            limit: Some(1),
            ..Default::default()
        };
        Ok(self.repository.list(&filter).await?.into_iter().next())
    }

    /// ¿Tiene el vehículo un conductor PRIMARY activo?
    pub async fn has_active_primary_for_vehicle(&self, vehicle_id: &str) -> Result<bool, AppError> {
        Ok(self.get_active_primary_for_vehicle(vehicle_id).await?.is_some())
    }

    /// ¿Tiene el conductor una asignación PRIMARY activa?
    pub async fn has_active_primary_for_driver(&self, driver_id: &str) -> Result<bool, AppError> {
        Ok(self
            .get_active_for_driver_role(driver_id, AssignmentRole::Primary)
            .await?
            .is_some())
    }
}
