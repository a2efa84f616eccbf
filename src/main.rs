mod config;
mod controllers;
mod database;
mod dto;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod state;
mod utils;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};

use config::environment::EnvironmentConfig;
use database::{create_pool, run_migrations};
use middleware::cors::{cors_middleware, cors_middleware_with_origins};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚚 Fleet Assignment - Asignaciones vehículo-conductor");
    info!("=====================================================");

    let config = EnvironmentConfig::default();

    // Inicializar base de datos
    let pool = match create_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    if let Err(e) = run_migrations(&pool).await {
        error!("❌ Error preparando el esquema: {}", e);
        return Err(anyhow::anyhow!("Error de esquema: {}", e));
    }
    info!("✅ Esquema del almacén de asignaciones listo");

    let app_state = AppState::new(pool, config.clone());

    // CORS permisivo solo en desarrollo
    let cors = if config.is_development() {
        cors_middleware()
    } else {
        cors_middleware_with_origins(config.cors_origins.clone())
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/assignments", routes::create_assignment_router())
        .layer(cors)
        .with_state(app_state);

    let addr: SocketAddr = config.server_url().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET    /health - Health check");
    info!("🚗 Endpoints de asignaciones:");
    info!("   POST   /api/assignments - Crear asignación");
    info!("   GET    /api/assignments/:id - Obtener asignación");
    info!("   PUT    /api/assignments/:id - Actualizar asignación");
    info!("   POST   /api/assignments/:id/end - Finalizar asignación");
    info!("   DELETE /api/assignments/:id - Borrado lógico");
    info!("   GET    /api/assignments/vehicle/:id - Historial por vehículo");
    info!("   GET    /api/assignments/vehicle/:id/active-primary - PRIMARY activo");
    info!("   POST   /api/assignments/vehicle/:id/deactivate-primary - Finalizar PRIMARY");
    info!("   GET    /api/assignments/driver/:id - Historial por conductor");
    info!("   POST   /api/assignments/driver/:id/roles/:role/deactivate - Finalizar rol");
    info!("   GET    /api/assignments/group/:id - Asignaciones por grupo");

    // Iniciar servidor en background
    let server_handle = tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                error!("❌ Error del servidor: {}", e);
                e
            })
    });

    // Esperar a que el servidor termine
    if let Err(e) = server_handle.await? {
        error!("❌ Servidor terminó con error: {}", e);
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Endpoint de health check
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "service": "fleet-assignment",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
