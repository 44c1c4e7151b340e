mod config;
mod database;
mod middleware;
mod models;
mod queue;
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
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use config::EnvironmentConfig;
use database::create_pool;
use middleware::cors_middleware;
use queue::{EventQueue, RetryPolicy};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("♻️  Glass Collection - Coordinación de recolección de vidrio");
    info!("============================================================");

    let env_config = EnvironmentConfig::from_env();

    // Inicializar base de datos
    let pool = match create_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };
    info!("✅ PostgreSQL conectado exitosamente");

    // Iniciar worker de telemetría
    let retry_policy = RetryPolicy {
        max_attempts: env_config.event_max_attempts,
        base_delay_ms: env_config.event_backoff_base_ms,
    };
    let (event_queue, _worker_handle) = EventQueue::start(pool.clone(), retry_policy);
    info!("✅ Cola de eventos de telemetría iniciada");

    let addr: SocketAddr = format!("{}:{}", env_config.host, env_config.port).parse()?;

    let app_state = AppState::new(pool, env_config, event_queue);

    let app = Router::new()
        .route("/health", get(health_endpoint))
        .nest("/api/bins", routes::bin_routes::create_bin_router())
        .nest("/api/requests", routes::request_routes::create_request_router())
        .nest("/api/routes", routes::route_routes::create_route_router())
        .nest(
            "/api/collection",
            routes::collection_routes::create_collection_router(),
        )
        .nest("/api/events", routes::event_routes::create_event_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_middleware())
        .with_state(app_state);

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🗑️  Endpoints - Bins:");
    info!("   POST /api/bins - Registrar bote");
    info!("   GET  /api/bins - Listar botes");
    info!("   GET  /api/bins/:id - Obtener bote");
    info!("   GET  /api/bins/hardware/:hardware_id - Obtener bote por sensor");
    info!("   PUT  /api/bins/:id - Actualizar bote");
    info!("   POST /api/bins/:id/deactivate - Desactivar bote");
    info!("   POST /api/bins/:id/reactivate - Reactivar bote");
    info!("   POST /api/bins/:id/reassign - Reasignar bote retirado");
    info!("   GET  /api/bins/:id/history - Historial de estados");
    info!("📋 Endpoints - Requests:");
    info!("   POST /api/requests - Crear solicitud");
    info!("   GET  /api/requests - Listar solicitudes");
    info!("   GET  /api/requests/pending - Solicitudes pendientes");
    info!("   GET  /api/requests/:id - Obtener solicitud");
    info!("   POST /api/requests/:id/approve - Aprobar solicitud");
    info!("   POST /api/requests/:id/complete - Completar solicitud");
    info!("   POST /api/requests/:id/cancel - Cancelar solicitud");
    info!("🚛 Endpoints - Routes:");
    info!("   POST /api/routes - Crear ruta manual");
    info!("   POST /api/routes/generate - Generar ruta automática");
    info!("   GET  /api/routes - Listar rutas");
    info!("   GET  /api/routes/:id - Obtener ruta con puntos");
    info!("   POST /api/routes/:id/points - Agregar punto");
    info!("   POST /api/routes/:id/assign - Asignar recolector");
    info!("   POST /api/routes/:id/start - Iniciar ruta");
    info!("   POST /api/routes/:id/cancel - Cancelar ruta");
    info!("🧤 Endpoints - Collection:");
    info!("   POST /api/collection/points/:id/complete - Completar punto");
    info!("   POST /api/collection/points/bulk-complete - Completado masivo");
    info!("   POST /api/collection/bins/:id/confirm-retirement - Confirmar retiro");
    info!("   POST /api/collection/routes/:id/complete - Completar ruta");
    info!("📡 Endpoints - Telemetry:");
    info!("   POST /api/events/readings - Ingesta de lecturas de sensores");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check simple
async fn health_endpoint() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "glass_collection",
        "timestamp": chrono::Utc::now().to_rfc3339(),
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
