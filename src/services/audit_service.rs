//! Servicio de auditoría
//! 
//! Emisión de eventos de auditoría tipo fire-and-forget: el servicio de
//! ciclo de vida nunca espera, reintenta ni falla por culpa del sink. Los
//! eventos viajan por un canal sin límite y un worker los entrega; los
//! fallos de entrega se registran y se descartan.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

/// Acción auditable sobre una asignación
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    AssignmentCreate,
    AssignmentUpdate,
    AssignmentEnd,
    AssignmentDelete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::AssignmentCreate => "assignment.create",
            AuditAction::AssignmentUpdate => "assignment.update",
            AuditAction::AssignmentEnd => "assignment.end",
            AuditAction::AssignmentDelete => "assignment.delete",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evento de auditoría tal como lo acepta el sink externo
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub group_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub entity_name: String,
    pub details: serde_json::Value,
}

/// Sink de auditoría; colaborador externo del subsistema
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_event(&self, event: &AuditEvent) -> anyhow::Result<()>;
}

/// Sink que persiste los eventos en la tabla audit_logs
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record_event(&self, event: &AuditEvent) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, group_id, actor_id, action, entity_type, entity_id, entity_name, details, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&event.group_id)
        .bind(&event.actor_id)
        .bind(event.action.as_str())
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.entity_name)
        .bind(&event.details)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Despachador de eventos hacia el sink
#[derive(Clone)]
pub struct AuditService {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditService {
    /// Arrancar el worker que drena el canal hacia el sink
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<AuditEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.record_event(&event).await {
                    warn!(
                        "No se pudo entregar el evento de auditoría {} para {}: {}",
                        event.action, event.entity_id, e
                    );
                }
            }
        });

        Self { tx }
    }

    /// Despachador sin worker; el receptor queda en manos del test
    #[cfg(test)]
    pub(crate) fn for_tests() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel::<AuditEvent>();
        (Self { tx }, rx)
    }

    /// Emitir un evento sin esperar su entrega; nunca falla
    pub fn emit(&self, event: AuditEvent) {
        if self.tx.send(event).is_err() {
            warn!("Canal de auditoría cerrado; evento descartado");
        }
    }
}
