//! Servicio de desactivación
//! 
//! Finaliza asignaciones activas: como primitiva administrativa y como
//! guardia de admisión que elimina los registros que violarían la unicidad
//! de activo antes de admitir una asignación activa nueva.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::dto::assignment_dto::EndAssignmentRequest;
use crate::models::assignment::{Assignment, AssignmentRole};
use crate::repositories::assignment_repository::{AssignmentPatch, AssignmentRepository};
use crate::services::assignment_query_service::AssignmentQueryService;
use crate::services::audit_service::{AuditAction, AuditEvent, AuditService};
use crate::utils::clock::Clock;
use crate::utils::errors::AppError;

#[derive(Clone)]
pub struct DeactivationService {
    repository: Arc<dyn AssignmentRepository>,
    queries: AssignmentQueryService,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

impl DeactivationService {
    pub fn new(
        repository: Arc<dyn AssignmentRepository>,
        queries: AssignmentQueryService,
        audit: AuditService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            queries,
            audit,
            clock,
        }
    }

    /// Finalizar una asignación: fija `endDate` (por defecto ahora), fuerza
    /// `isActive = false` incondicionalmente y fusiona las lecturas de
    /// entrega si vienen. Emite el evento de auditoría correspondiente.
    pub async fn end_record(
        &self,
        assignment: &Assignment,
        end: &EndAssignmentRequest,
        actor_profile_id: &str,
    ) -> Result<Assignment, AppError> {
        let end_date = end.end_date.unwrap_or_else(|| self.clock.now());

        let patch = AssignmentPatch {
            end_date: Some(Some(end_date)),
            is_active: Some(false),
            end_mileage: end.end_mileage,
            end_fuel_level: end.end_fuel_level,
            notes: end.notes.clone(),
            ..Default::default()
        };

        let updated = self.repository.update(assignment.id, &patch).await?;

        info!(
            "Asignación {} finalizada (vehículo {}, conductor {}, rol {})",
            assignment.id, assignment.vehicle_id, assignment.driver_id, assignment.role
        );

        self.audit.emit(AuditEvent {
            group_id: assignment.group_id.clone(),
            actor_id: actor_profile_id.to_string(),
            action: AuditAction::AssignmentEnd,
            entity_type: "assignment".to_string(),
            entity_id: assignment.id.to_string(),
            entity_name: format!("{} → {}", assignment.vehicle_id, assignment.driver_id),
            details: json!({
                "vehicleId": assignment.vehicle_id,
                "driverId": assignment.driver_id,
                "role": assignment.role,
                "endDate": end_date,
            }),
        });

        Ok(updated)
    }

    /// Guardia de admisión para una asignación nueva que nacerá activa:
    /// finaliza el PRIMARY activo del vehículo (si el rol es PRIMARY) y la
    /// asignación activa del conductor para ese rol, en ese orden.
    /// 
    /// Protocolo secuencial de lectura-luego-escritura sin bloqueo: dos
    /// llamadas concurrentes sobre el mismo vehículo o el mismo par
    /// (conductor, rol) pueden pasar ambas la búsqueda antes de que ninguna
    /// escriba y dejar dos registros activos simultáneos.
    pub async fn end_conflicting_active(
        &self,
        vehicle_id: &str,
        driver_id: &str,
        role: AssignmentRole,
        will_be_active: bool,
        actor_profile_id: &str,
    ) -> Result<(), AppError> {
        // Un registro que nace ya finalizado no desplaza a nadie
        if !will_be_active {
            return Ok(());
        }

        if role == AssignmentRole::Primary {
            if let Some(current) = self.queries.get_active_primary_for_vehicle(vehicle_id).await? {
                info!(
                    "Vehículo {} ya tiene PRIMARY activo ({}); se finaliza",
                    vehicle_id, current.id
                );
                self.end_record(&current, &EndAssignmentRequest::default(), actor_profile_id)
                    .await?;
            }
        }

        if let Some(current) = self.queries.get_active_for_driver_role(driver_id, role).await? {
            info!(
                "Conductor {} ya tiene rol {} activo ({}); se finaliza",
                driver_id, role, current.id
            );
            self.end_record(&current, &EndAssignmentRequest::default(), actor_profile_id)
                .await?;
        }

        Ok(())
    }
}
