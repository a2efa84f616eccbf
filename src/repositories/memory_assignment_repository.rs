//! Repositorio de asignaciones en memoria
//! 
//! Implementación del mismo contrato sobre un HashMap compartido; se usa en
//! tests y en arranques efímeros sin base de datos.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::repositories::assignment_repository::{
    AssignmentFilter, AssignmentPatch, AssignmentRepository,
};
use crate::utils::errors::{not_found_error, AppError};

#[derive(Clone, Default)]
pub struct MemoryAssignmentRepository {
    documents: Arc<RwLock<HashMap<Uuid, Assignment>>>,
}

impl MemoryAssignmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(assignment: &Assignment, filter: &AssignmentFilter) -> bool {
        if let Some(group_id) = &filter.group_id {
            if &assignment.group_id != group_id {
                return false;
            }
        }
        if let Some(vehicle_id) = &filter.vehicle_id {
            if &assignment.vehicle_id != vehicle_id {
                return false;
            }
        }
        if let Some(driver_id) = &filter.driver_id {
            if &assignment.driver_id != driver_id {
                return false;
            }
        }
        if let Some(role) = filter.role {
            if assignment.role != role {
                return false;
            }
        }
        if let Some(is_active) = filter.is_active {
            if assignment.is_active != is_active {
                return false;
            }
        }
        if let Some(enabled) = filter.enabled {
            if assignment.enabled != enabled {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl AssignmentRepository for MemoryAssignmentRepository {
    async fn create(&self, assignment: &Assignment) -> Result<Assignment, AppError> {
        let mut documents = self.documents.write().await;
        documents.insert(assignment.id, assignment.clone());
        Ok(assignment.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Assignment>, AppError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).cloned())
    }

    async fn update(&self, id: Uuid, patch: &AssignmentPatch) -> Result<Assignment, AppError> {
        let mut documents = self.documents.write().await;
        let assignment = documents
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Assignment", &id.to_string()))?;

        patch.apply(assignment);
        Ok(assignment.clone())
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, AppError> {
        let documents = self.documents.read().await;
        let mut results: Vec<Assignment> = documents
            .values()
            .filter(|a| Self::matches(a, filter))
            .cloned()
            .collect();

        results.sort_by(|a, b| b.start_date.cmp(&a.start_date));

        if let Some(limit) = filter.limit {
            results.truncate(limit.max(0) as usize);
        }

        Ok(results)
    }
}
