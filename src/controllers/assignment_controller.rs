//! Controller de asignaciones
//! 
//! Orquesta los requests HTTP hacia el servicio de ciclo de vida y
//! convierte los resultados a DTOs de respuesta.

use std::sync::Arc;

use uuid::Uuid;

use crate::dto::assignment_dto::{
    AssignmentListQuery, AssignmentResponse, CreateAssignmentRequest, EndAssignmentRequest,
    UpdateAssignmentRequest,
};
use crate::dto::common::ApiResponse;
use crate::models::assignment::AssignmentRole;
use crate::repositories::assignment_repository::AssignmentRepository;
use crate::services::assignment_service::AssignmentService;
use crate::services::audit_service::AuditService;
use crate::utils::clock::SystemClock;
use crate::utils::errors::{bad_request_error, AppResult};

pub struct AssignmentController {
    service: AssignmentService,
}

impl AssignmentController {
    pub fn new(repository: Arc<dyn AssignmentRepository>, audit: AuditService) -> Self {
        Self {
            service: AssignmentService::new(repository, audit, Arc::new(SystemClock)),
        }
    }

    pub async fn create(
        &self,
        request: CreateAssignmentRequest,
    ) -> AppResult<ApiResponse<AssignmentResponse>> {
        let assignment = self.service.create_assignment(request).await?;

        Ok(ApiResponse::success_with_message(
            assignment.into(),
            "Asignación creada exitosamente".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<AssignmentResponse> {
        let assignment = self.service.get_assignment(id).await?;
        Ok(assignment.into())
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateAssignmentRequest,
        actor_profile_id: &str,
    ) -> AppResult<ApiResponse<AssignmentResponse>> {
        let assignment = self
            .service
            .update_assignment(id, request, actor_profile_id)
            .await?;

        Ok(ApiResponse::success_with_message(
            assignment.into(),
            "Asignación actualizada exitosamente".to_string(),
        ))
    }

    pub async fn end(
        &self,
        id: Uuid,
        request: EndAssignmentRequest,
        actor_profile_id: &str,
    ) -> AppResult<ApiResponse<AssignmentResponse>> {
        let assignment = self
            .service
            .end_assignment(id, request, actor_profile_id)
            .await?;

        Ok(ApiResponse::success_with_message(
            assignment.into(),
            "Asignación finalizada exitosamente".to_string(),
        ))
    }

    pub async fn delete(&self, id: Uuid, actor_profile_id: &str) -> AppResult<()> {
        self.service.delete_assignment(id, actor_profile_id).await?;
        Ok(())
    }

    pub async fn list_by_vehicle(
        &self,
        vehicle_id: &str,
        query: AssignmentListQuery,
    ) -> AppResult<Vec<AssignmentResponse>> {
        let assignments = self
            .service
            .queries()
            .list_by_vehicle(vehicle_id, query.active_only)
            .await?;
        Ok(assignments.into_iter().map(Into::into).collect())
    }

    pub async fn list_by_driver(
        &self,
        driver_id: &str,
        query: AssignmentListQuery,
    ) -> AppResult<Vec<AssignmentResponse>> {
        let assignments = self
            .service
            .queries()
            .list_by_driver(driver_id, query.active_only)
            .await?;
        Ok(assignments.into_iter().map(Into::into).collect())
    }

    pub async fn list_by_group(
        &self,
        group_id: &str,
        query: AssignmentListQuery,
    ) -> AppResult<Vec<AssignmentResponse>> {
        let assignments = self
            .service
            .queries()
            .list_by_group(group_id, query.active_only, query.limit)
            .await?;
        Ok(assignments.into_iter().map(Into::into).collect())
    }

    pub async fn get_active_primary(
        &self,
        vehicle_id: &str,
    ) -> AppResult<Option<AssignmentResponse>> {
        let assignment = self
            .service
            .queries()
            .get_active_primary_for_vehicle(vehicle_id)
            .await?;
        Ok(assignment.map(Into::into))
    }

    pub async fn deactivate_vehicle_primary(
        &self,
        vehicle_id: &str,
        actor_profile_id: &str,
    ) -> AppResult<Option<AssignmentResponse>> {
        let ended = self
            .service
            .deactivate_vehicle_primary_assignment(vehicle_id, actor_profile_id)
            .await?;
        Ok(ended.map(Into::into))
    }

    pub async fn deactivate_driver_role(
        &self,
        driver_id: &str,
        role: &str,
        actor_profile_id: &str,
    ) -> AppResult<Option<AssignmentResponse>> {
        let role: AssignmentRole = role
            .parse()
            .map_err(|e: String| bad_request_error(&e))?;

        let ended = self
            .service
            .deactivate_driver_assignment_by_role(driver_id, role, actor_profile_id)
            .await?;
        Ok(ended.map(Into::into))
    }
}
