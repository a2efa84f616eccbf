//! Shared application state
//! 
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::assignment_repository::{AssignmentRepository, PgAssignmentRepository};
use crate::services::audit_service::{AuditService, PgAuditSink};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: EnvironmentConfig,
    pub repository: Arc<dyn AssignmentRepository>,
    pub audit: AuditService,
}

impl AppState {
    pub fn new(pool: PgPool, config: EnvironmentConfig) -> Self {
        let repository: Arc<dyn AssignmentRepository> =
            Arc::new(PgAssignmentRepository::new(pool.clone()));
        let audit = AuditService::new(Arc::new(PgAuditSink::new(pool.clone())));

        Self {
            pool,
            config,
            repository,
            audit,
        }
    }
}
