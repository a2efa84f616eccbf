//! Servicio de ciclo de vida de asignaciones
//! 
//! Componente público del subsistema: crear, actualizar, finalizar y
//! borrar lógicamente asignaciones, orquestando la guardia de unicidad y
//! el cálculo de actividad, y emitiendo auditoría fire-and-forget.
//! 
//! Si el almacén falla en mitad de una operación el error se propaga tal
//! cual y no se deshacen las escrituras compensatorias ya confirmadas; el
//! llamador debe re-consultar el estado en vez de asumir que no pasó nada.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::dto::assignment_dto::{
    CreateAssignmentRequest, EndAssignmentRequest, UpdateAssignmentRequest,
};
use crate::models::assignment::{Assignment, AssignmentRole};
use crate::repositories::assignment_repository::{AssignmentPatch, AssignmentRepository};
use crate::services::activity::compute_is_active;
use crate::services::assignment_query_service::AssignmentQueryService;
use crate::services::audit_service::{AuditAction, AuditEvent, AuditService};
use crate::services::deactivation_service::DeactivationService;
use crate::utils::clock::Clock;
use crate::utils::errors::{not_found_error, AppError};

#[derive(Clone)]
pub struct AssignmentService {
    repository: Arc<dyn AssignmentRepository>,
    queries: AssignmentQueryService,
    deactivation: DeactivationService,
    audit: AuditService,
    clock: Arc<dyn Clock>,
}

impl AssignmentService {
    pub fn new(
        repository: Arc<dyn AssignmentRepository>,
        audit: AuditService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queries = AssignmentQueryService::new(repository.clone());
        let deactivation = DeactivationService::new(
            repository.clone(),
            queries.clone(),
            audit.clone(),
            clock.clone(),
        );
        Self {
            repository,
            queries,
            deactivation,
            audit,
            clock,
        }
    }

    /// Capa de consultas de solo lectura
    pub fn queries(&self) -> &AssignmentQueryService {
        &self.queries
    }

    /// Buscar una asignación por id
    pub async fn get_assignment(&self, id: Uuid) -> Result<Assignment, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Assignment", &id.to_string()))
    }

    /// Crear una asignación nueva
    /// 
    /// Deriva `isActive` del instante actual, finaliza antes los registros
    /// que violarían la unicidad de activo (hasta dos) y persiste el
    /// documento con referencias a vehículo y conductor para la búsqueda
    /// bidireccional.
    pub async fn create_assignment(
        &self,
        request: CreateAssignmentRequest,
    ) -> Result<Assignment, AppError> {
        // Validar antes de tocar el almacén
        request.validate_payload()?;

        let now = self.clock.now();
        let will_be_active = compute_is_active(request.end_date, now);

        self.deactivation
            .end_conflicting_active(
                &request.vehicle_id,
                &request.driver_id,
                request.role,
                will_be_active,
                &request.created_by_profile_id,
            )
            .await?;

        let assignment = Assignment {
            id: Uuid::new_v4(),
            group_id: request.group_id.clone(),
            vehicle_id: request.vehicle_id.clone(),
            driver_id: request.driver_id.clone(),
            role: request.role,
            assignment_type: request.assignment_type,
            start_date: request.start_date,
            end_date: request.end_date,
            is_active: will_be_active,
            start_mileage: request.start_mileage,
            end_mileage: None,
            start_fuel_level: request.start_fuel_level,
            end_fuel_level: None,
            notes: request.notes.clone(),
            created_by_profile_id: request.created_by_profile_id.clone(),
            enabled: true,
        };

        let created = self.repository.create(&assignment).await?;

        info!(
            "Asignación {} creada: vehículo {} / conductor {} (rol {}, activa: {})",
            created.id, created.vehicle_id, created.driver_id, created.role, created.is_active
        );

        let vehicle_name = request
            .vehicle_name
            .unwrap_or_else(|| request.vehicle_id.clone());
        let driver_name = request
            .driver_name
            .unwrap_or_else(|| request.driver_id.clone());

        self.audit.emit(AuditEvent {
            group_id: created.group_id.clone(),
            actor_id: created.created_by_profile_id.clone(),
            action: AuditAction::AssignmentCreate,
            entity_type: "assignment".to_string(),
            entity_id: created.id.to_string(),
            entity_name: format!("{} → {}", vehicle_name, driver_name),
            details: json!({
                "vehicleName": vehicle_name,
                "driverName": driver_name,
                "role": created.role,
                "assignmentType": created.assignment_type,
            }),
        });

        Ok(created)
    }

    /// Actualizar los campos mutables de una asignación
    /// 
    /// Los campos inmutables no forman parte del tipo de parche. Si el
    /// parche trae `endDate` se recalcula `isActive`; la actualización no
    /// vuelve a ejecutar la guardia de unicidad, así que reabrir o cambiar
    /// de rol un registro no desactiva en cascada a otros.
    pub async fn update_assignment(
        &self,
        id: Uuid,
        request: UpdateAssignmentRequest,
        actor_profile_id: &str,
    ) -> Result<Assignment, AppError> {
        request.validate_payload()?;

        let existing = self.get_assignment(id).await?;

        let mut patch = request.to_patch();
        if let Some(end_date) = request.end_date {
            patch.is_active = Some(compute_is_active(end_date, self.clock.now()));
        }

        let updated = self.repository.update(id, &patch).await?;

        let mut changed_fields = request.changed_fields();
        if patch.is_active.is_some() {
            changed_fields.push("isActive");
        }

        info!(
            "Asignación {} actualizada: {}",
            id,
            changed_fields.join(", ")
        );

        // La auditoría de actualizaciones registra nombres de campo, nunca valores
        self.audit.emit(AuditEvent {
            group_id: existing.group_id.clone(),
            actor_id: actor_profile_id.to_string(),
            action: AuditAction::AssignmentUpdate,
            entity_type: "assignment".to_string(),
            entity_id: id.to_string(),
            entity_name: format!("{} → {}", existing.vehicle_id, existing.driver_id),
            details: json!({ "changedFields": changed_fields }),
        });

        Ok(updated)
    }

    /// Finalizar una asignación
    pub async fn end_assignment(
        &self,
        id: Uuid,
        request: EndAssignmentRequest,
        actor_profile_id: &str,
    ) -> Result<Assignment, AppError> {
        request.validate_payload()?;

        let existing = self.get_assignment(id).await?;
        self.deactivation
            .end_record(&existing, &request, actor_profile_id)
            .await
    }

    /// Borrado lógico: deshabilita el registro y lo saca de todas las
    /// consultas de estado activo. El histórico nunca se elimina físicamente
    /// y no hay operación inversa.
    pub async fn delete_assignment(
        &self,
        id: Uuid,
        actor_profile_id: &str,
    ) -> Result<Assignment, AppError> {
        let existing = self.get_assignment(id).await?;

        let patch = AssignmentPatch {
            enabled: Some(false),
            is_active: Some(false),
            ..Default::default()
        };
        let deleted = self.repository.update(id, &patch).await?;

        info!("Asignación {} deshabilitada (borrado lógico)", id);

        self.audit.emit(AuditEvent {
            group_id: existing.group_id.clone(),
            actor_id: actor_profile_id.to_string(),
            action: AuditAction::AssignmentDelete,
            entity_type: "assignment".to_string(),
            entity_id: id.to_string(),
            entity_name: format!("{} → {}", existing.vehicle_id, existing.driver_id),
            details: json!({
                "vehicleId": existing.vehicle_id,
                "driverId": existing.driver_id,
            }),
        });

        Ok(deleted)
    }

    /// Finalizar el PRIMARY activo de un vehículo, si existe
    pub async fn deactivate_vehicle_primary_assignment(
        &self,
        vehicle_id: &str,
        actor_profile_id: &str,
    ) -> Result<Option<Assignment>, AppError> {
        match self.queries.get_active_primary_for_vehicle(vehicle_id).await? {
            Some(current) => {
                let ended = self
                    .deactivation
                    .end_record(&current, &EndAssignmentRequest::default(), actor_profile_id)
                    .await?;
                Ok(Some(ended))
            }
            None => Ok(None),
        }
    }

    /// Finalizar la asignación activa de un conductor para un rol, si existe
    pub async fn deactivate_driver_assignment_by_role(
        &self,
        driver_id: &str,
        role: AssignmentRole,
        actor_profile_id: &str,
    ) -> Result<Option<Assignment>, AppError> {
        match self.queries.get_active_for_driver_role(driver_id, role).await? {
            Some(current) => {
                let ended = self
                    .deactivation
                    .end_record(&current, &EndAssignmentRequest::default(), actor_profile_id)
                    .await?;
                Ok(Some(ended))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assignment::AssignmentType;
    use crate::repositories::memory_assignment_repository::MemoryAssignmentRepository;
    use crate::utils::clock::FixedClock;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;
    use tokio::sync::mpsc;

    struct TestContext {
        service: AssignmentService,
        clock: Arc<FixedClock>,
        audit_rx: mpsc::UnboundedReceiver<AuditEvent>,
    }

    fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    fn setup(now: DateTime<Utc>) -> TestContext {
        let repository: Arc<dyn AssignmentRepository> =
            Arc::new(MemoryAssignmentRepository::new());
        let (audit, audit_rx) = AuditService::for_tests();
        let clock = Arc::new(FixedClock::new(now));
        let service = AssignmentService::new(repository, audit, clock.clone());
        TestContext {
            service,
            clock,
            audit_rx,
        }
    }

    fn create_request(
        vehicle_id: &str,
        driver_id: &str,
        role: AssignmentRole,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
    ) -> CreateAssignmentRequest {
        CreateAssignmentRequest {
            group_id: "G1".to_string(),
            vehicle_id: vehicle_id.to_string(),
            driver_id: driver_id.to_string(),
            start_date,
            end_date,
            role,
            assignment_type: AssignmentType::Operation,
            start_mileage: None,
            start_fuel_level: None,
            notes: None,
            created_by_profile_id: "P1".to_string(),
            vehicle_name: None,
            driver_name: None,
        }
    }

    async fn active_primary_count(service: &AssignmentService, vehicle_id: &str) -> usize {
        service
            .queries()
            .list_by_vehicle(vehicle_id, true)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.role == AssignmentRole::Primary)
            .count()
    }

    async fn active_role_count(
        service: &AssignmentService,
        driver_id: &str,
        role: AssignmentRole,
    ) -> usize {
        service
            .queries()
            .list_by_driver(driver_id, true)
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.role == role)
            .count()
    }

    // Un PRIMARY nuevo desplaza al PRIMARY activo del vehículo
    #[tokio::test]
    async fn test_new_primary_displaces_previous_for_vehicle() {
        let ctx = setup(date(2024, 2, 1));

        let first = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();
        assert!(first.is_active);

        let second = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D2",
                AssignmentRole::Primary,
                date(2024, 2, 1),
                None,
            ))
            .await
            .unwrap();
        assert!(second.is_active);

        let displaced = ctx.service.get_assignment(first.id).await.unwrap();
        assert!(!displaced.is_active);
        // El fin del desplazado queda sellado con el "ahora" de la segunda creación
        assert_eq!(displaced.end_date, Some(date(2024, 2, 1)));

        assert_eq!(active_primary_count(&ctx.service, "V1").await, 1);
    }

    // Crear con fecha de fin ya vencida nace inactiva
    #[tokio::test]
    async fn test_create_with_past_end_date_is_born_inactive() {
        let ctx = setup(date(2024, 2, 1));

        let assignment = ctx
            .service
            .create_assignment(create_request(
                "V2",
                "D1",
                AssignmentRole::Secondary,
                date(2024, 1, 1),
                Some(date(2024, 1, 10)),
            ))
            .await
            .unwrap();

        assert!(!assignment.is_active);
        assert!(assignment.enabled);
    }

    // Un registro que nace inactivo no desplaza al activo existente
    #[tokio::test]
    async fn test_inactive_creation_skips_enforcement() {
        let ctx = setup(date(2024, 2, 1));

        let active = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Secondary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        ctx.service
            .create_assignment(create_request(
                "V9",
                "D1",
                AssignmentRole::Secondary,
                date(2024, 1, 1),
                Some(date(2024, 1, 10)),
            ))
            .await
            .unwrap();

        let untouched = ctx.service.get_assignment(active.id).await.unwrap();
        assert!(untouched.is_active);
        assert!(untouched.end_date.is_none());
    }

    // Finalizar fija endDate, fuerza isActive=false y fusiona las lecturas
    #[tokio::test]
    async fn test_end_assignment_merges_handover_readings() {
        let ctx = setup(date(2024, 2, 1));

        let created = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        let ended = ctx
            .service
            .end_assignment(
                created.id,
                EndAssignmentRequest {
                    end_date: Some(date(2024, 3, 1)),
                    end_mileage: Some(Decimal::from(50000)),
                    end_fuel_level: None,
                    notes: None,
                },
                "P1",
            )
            .await
            .unwrap();

        assert_eq!(ended.end_date, Some(date(2024, 3, 1)));
        // isActive se fuerza a false aunque la fecha de fin esté en el futuro
        assert!(!ended.is_active);
        assert_eq!(ended.end_mileage, Some(Decimal::from(50000)));
        assert_eq!(ended.vehicle_id, created.vehicle_id);
        assert_eq!(ended.start_date, created.start_date);
        assert_eq!(ended.notes, None);
    }

    // Finalizar dos veces converge al mismo estado terminal
    #[tokio::test]
    async fn test_end_assignment_is_idempotent_in_effect() {
        let ctx = setup(date(2024, 2, 1));

        let created = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        let request = EndAssignmentRequest {
            end_date: Some(date(2024, 3, 1)),
            ..Default::default()
        };
        let first = ctx
            .service
            .end_assignment(created.id, request.clone(), "P1")
            .await
            .unwrap();
        let second = ctx
            .service
            .end_assignment(created.id, request, "P1")
            .await
            .unwrap();

        assert_eq!(first.end_date, second.end_date);
        assert!(!second.is_active);
    }

    // Los campos inmutables sobreviven a parches hostiles
    #[tokio::test]
    async fn test_update_cannot_change_immutable_fields() {
        let ctx = setup(date(2024, 2, 1));

        let created = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        // El parche llega del exterior con un vehicleId que debe descartarse
        let request: UpdateAssignmentRequest = serde_json::from_value(serde_json::json!({
            "vehicleId": "V9",
            "driverId": "D9",
            "groupId": "G9",
            "createdByProfileId": "P9",
            "notes": "entrega en el turno de noche"
        }))
        .unwrap();

        let updated = ctx
            .service
            .update_assignment(created.id, request, "P1")
            .await
            .unwrap();

        assert_eq!(updated.vehicle_id, "V1");
        assert_eq!(updated.driver_id, "D1");
        assert_eq!(updated.group_id, "G1");
        assert_eq!(updated.created_by_profile_id, "P1");
        assert_eq!(updated.notes.as_deref(), Some("entrega en el turno de noche"));
    }

    // El rol activo de un conductor es único aunque cambie el vehículo
    #[tokio::test]
    async fn test_driver_role_unique_across_vehicles() {
        let ctx = setup(date(2024, 2, 1));

        let first = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        let second = ctx
            .service
            .create_assignment(create_request(
                "V2",
                "D1",
                AssignmentRole::Primary,
                date(2024, 2, 1),
                None,
            ))
            .await
            .unwrap();

        let displaced = ctx.service.get_assignment(first.id).await.unwrap();
        assert!(!displaced.is_active);
        assert!(second.is_active);
        assert_eq!(
            active_role_count(&ctx.service, "D1", AssignmentRole::Primary).await,
            1
        );
        assert!(ctx
            .service
            .queries()
            .has_active_primary_for_driver("D1")
            .await
            .unwrap());
    }

    // Roles distintos del mismo conductor no se desplazan entre sí
    #[tokio::test]
    async fn test_different_roles_for_same_driver_coexist() {
        let ctx = setup(date(2024, 2, 1));

        ctx.service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();
        ctx.service
            .create_assignment(create_request(
                "V2",
                "D1",
                AssignmentRole::Temp,
                date(2024, 1, 5),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(
            active_role_count(&ctx.service, "D1", AssignmentRole::Primary).await,
            1
        );
        assert_eq!(
            active_role_count(&ctx.service, "D1", AssignmentRole::Temp).await,
            1
        );
    }

    // La unicidad de activos se mantiene tras una secuencia mixta de operaciones
    #[tokio::test]
    async fn test_uniqueness_holds_after_mixed_sequence() {
        let ctx = setup(date(2024, 2, 1));

        let a = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();
        assert!(active_primary_count(&ctx.service, "V1").await <= 1);

        ctx.service
            .create_assignment(create_request(
                "V1",
                "D2",
                AssignmentRole::Primary,
                date(2024, 1, 10),
                None,
            ))
            .await
            .unwrap();
        assert!(active_primary_count(&ctx.service, "V1").await <= 1);

        ctx.service
            .end_assignment(a.id, EndAssignmentRequest::default(), "P1")
            .await
            .unwrap();
        assert!(active_primary_count(&ctx.service, "V1").await <= 1);

        let c = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D3",
                AssignmentRole::Primary,
                date(2024, 1, 20),
                None,
            ))
            .await
            .unwrap();
        assert!(active_primary_count(&ctx.service, "V1").await <= 1);

        ctx.service.delete_assignment(c.id, "P1").await.unwrap();
        assert_eq!(active_primary_count(&ctx.service, "V1").await, 0);

        for driver in ["D1", "D2", "D3"] {
            assert!(active_role_count(&ctx.service, driver, AssignmentRole::Primary).await <= 1);
        }
    }

    // El flag se deriva del instante de la escritura, no se recalcula después
    #[tokio::test]
    async fn test_activity_derived_at_write_time_only() {
        let ctx = setup(date(2024, 1, 1));

        let created = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                Some(date(2024, 1, 15)),
            ))
            .await
            .unwrap();
        assert!(created.is_active);

        // El plazo vence sin que nadie escriba: el flag almacenado no cambia
        ctx.clock.set(date(2024, 2, 1));
        let stale = ctx.service.get_assignment(created.id).await.unwrap();
        assert!(stale.is_active);
        assert!(!stale.is_active_at(date(2024, 2, 1)));

        // Una escritura que no toca endDate tampoco recalcula el flag
        let updated = ctx
            .service
            .update_assignment(
                created.id,
                serde_json::from_value(serde_json::json!({ "notes": "pendiente de revisión" }))
                    .unwrap(),
                "P1",
            )
            .await
            .unwrap();
        assert!(updated.is_active);

        // Tocar endDate sí recalcula con el reloj actual
        let recomputed = ctx
            .service
            .update_assignment(
                created.id,
                serde_json::from_value(serde_json::json!({ "endDate": "2024-01-15T00:00:00Z" }))
                    .unwrap(),
                "P1",
            )
            .await
            .unwrap();
        assert!(!recomputed.is_active);

        // Y quitar endDate reabre el registro
        let reopened = ctx
            .service
            .update_assignment(
                created.id,
                serde_json::from_value(serde_json::json!({ "endDate": null })).unwrap(),
                "P1",
            )
            .await
            .unwrap();
        assert!(reopened.is_active);
        assert!(reopened.end_date.is_none());
    }

    // La actualización no vuelve a ejecutar la guardia de unicidad
    #[tokio::test]
    async fn test_update_does_not_cascade_deactivation() {
        let ctx = setup(date(2024, 2, 1));

        let first = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();
        ctx.service
            .end_assignment(first.id, EndAssignmentRequest::default(), "P1")
            .await
            .unwrap();

        let second = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D2",
                AssignmentRole::Primary,
                date(2024, 2, 1),
                None,
            ))
            .await
            .unwrap();

        // Reabrir el primero por actualización deja dos activos: límite
        // de alcance deliberado, la guardia solo corre en la creación
        ctx.service
            .update_assignment(
                first.id,
                serde_json::from_value(serde_json::json!({ "endDate": null })).unwrap(),
                "P1",
            )
            .await
            .unwrap();

        assert!(ctx.service.get_assignment(first.id).await.unwrap().is_active);
        assert!(ctx.service.get_assignment(second.id).await.unwrap().is_active);
        assert_eq!(active_primary_count(&ctx.service, "V1").await, 2);
    }

    // El borrado lógico es idempotente y terminal
    #[tokio::test]
    async fn test_soft_delete_is_idempotent_and_excludes_from_queries() {
        let ctx = setup(date(2024, 2, 1));

        let created = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        let first = ctx.service.delete_assignment(created.id, "P1").await.unwrap();
        assert!(!first.enabled);
        assert!(!first.is_active);

        let second = ctx.service.delete_assignment(created.id, "P1").await.unwrap();
        assert_eq!(first, second);

        // Fuera de todas las consultas, incluso del histórico
        assert!(ctx
            .service
            .queries()
            .list_by_vehicle("V1", false)
            .await
            .unwrap()
            .is_empty());
        assert!(!ctx
            .service
            .queries()
            .has_active_primary_for_vehicle("V1")
            .await
            .unwrap());
    }

    // La validación rechaza antes de cualquier acceso al almacén
    #[tokio::test]
    async fn test_validation_rejects_before_any_store_access() {
        let ctx = setup(date(2024, 2, 1));

        let mut request = create_request(
            "V1",
            "D1",
            AssignmentRole::Primary,
            date(2024, 1, 1),
            None,
        );
        request.vehicle_id = "   ".to_string();

        let result = ctx.service.create_assignment(request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        // Nada llegó al almacén
        assert!(ctx
            .service
            .queries()
            .list_by_driver("D1", false)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_operations_on_missing_id_return_not_found() {
        let ctx = setup(date(2024, 2, 1));
        let missing = Uuid::new_v4();

        assert!(matches!(
            ctx.service.get_assignment(missing).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ctx.service
                .update_assignment(missing, UpdateAssignmentRequest::default(), "P1")
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ctx.service
                .end_assignment(missing, EndAssignmentRequest::default(), "P1")
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ctx.service.delete_assignment(missing, "P1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_administrative_deactivation_entry_points() {
        let ctx = setup(date(2024, 2, 1));

        assert!(ctx
            .service
            .deactivate_vehicle_primary_assignment("V1", "P1")
            .await
            .unwrap()
            .is_none());

        let created = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D1",
                AssignmentRole::Primary,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        let ended = ctx
            .service
            .deactivate_vehicle_primary_assignment("V1", "P1")
            .await
            .unwrap()
            .expect("debe finalizar el PRIMARY activo");
        assert_eq!(ended.id, created.id);
        assert!(!ended.is_active);

        let temp = ctx
            .service
            .create_assignment(create_request(
                "V2",
                "D2",
                AssignmentRole::Temp,
                date(2024, 1, 1),
                None,
            ))
            .await
            .unwrap();

        let ended = ctx
            .service
            .deactivate_driver_assignment_by_role("D2", AssignmentRole::Temp, "P1")
            .await
            .unwrap()
            .expect("debe finalizar el rol activo del conductor");
        assert_eq!(ended.id, temp.id);
        assert!(!ended.is_active);
    }

    // La auditoría acompaña cada operación, incluidas las finalizaciones
    // compensatorias, y las actualizaciones solo registran nombres de campo
    #[tokio::test]
    async fn test_audit_events_for_lifecycle_operations() {
        let mut ctx = setup(date(2024, 2, 1));

        let mut request = create_request(
            "V1",
            "D1",
            AssignmentRole::Primary,
            date(2024, 1, 1),
            None,
        );
        request.vehicle_name = Some("AB-123-CD".to_string());
        request.driver_name = Some("Juan Pérez".to_string());
        let first = ctx.service.create_assignment(request).await.unwrap();

        let event = ctx.audit_rx.try_recv().unwrap();
        assert_eq!(event.action, AuditAction::AssignmentCreate);
        assert_eq!(event.entity_id, first.id.to_string());
        assert_eq!(event.entity_name, "AB-123-CD → Juan Pérez");
        assert_eq!(event.details["role"], "PRIMARY");

        // La segunda creación desplaza a la primera: fin + creación
        let second = ctx
            .service
            .create_assignment(create_request(
                "V1",
                "D2",
                AssignmentRole::Primary,
                date(2024, 2, 1),
                None,
            ))
            .await
            .unwrap();

        let end_event = ctx.audit_rx.try_recv().unwrap();
        assert_eq!(end_event.action, AuditAction::AssignmentEnd);
        assert_eq!(end_event.entity_id, first.id.to_string());

        let create_event = ctx.audit_rx.try_recv().unwrap();
        assert_eq!(create_event.action, AuditAction::AssignmentCreate);
        assert_eq!(create_event.entity_id, second.id.to_string());

        // Actualización: nombres de campo, sin valores
        ctx.service
            .update_assignment(
                second.id,
                serde_json::from_value(serde_json::json!({ "notes": "secreto" })).unwrap(),
                "P1",
            )
            .await
            .unwrap();
        let update_event = ctx.audit_rx.try_recv().unwrap();
        assert_eq!(update_event.action, AuditAction::AssignmentUpdate);
        assert_eq!(
            update_event.details,
            serde_json::json!({ "changedFields": ["notes"] })
        );

        ctx.service.delete_assignment(second.id, "P1").await.unwrap();
        let delete_event = ctx.audit_rx.try_recv().unwrap();
        assert_eq!(delete_event.action, AuditAction::AssignmentDelete);
    }
}
