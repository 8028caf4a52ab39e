//! Reasoning API server entry point.
//!
//! Bootstraps configuration, the database pool, tenant config resolver,
//! runtime config cache, and the two HTTP collaborator clients, then
//! starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use reasoning_api::{
    config::CollaboratorConfig, create_api_router, init_tracer, shutdown_tracer, ApiConfig,
    ApiError, ApiResult, AppState, AuthConfig, TelemetryConfig,
};
use reasoning_core::ReasoningConfig;
use reasoning_storage::{
    build_pool, HttpDataServiceClient, HttpGraphToolAgent, ReasoningRepository, RuntimeConfigCache,
    TenantConfigResolver,
};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let reasoning_config = ReasoningConfig::from_env().map_err(ApiError::from)?;
    let collaborators = CollaboratorConfig::from_env().map_err(ApiError::from)?;
    let api_config = ApiConfig::from_env();
    let auth_config = AuthConfig::from_env();

    let pool = build_pool(&reasoning_config.db).map_err(ApiError::from)?;
    let repo = ReasoningRepository::new(pool);
    let runtime_config = Arc::new(RuntimeConfigCache::load(repo.clone()).await.map_err(ApiError::from)?);
    let tenant_config = Arc::new(TenantConfigResolver::new(
        repo.clone(),
        reasoning_config.secret_cipher_key.clone(),
    ));
    let graph_tools = Arc::new(
        HttpGraphToolAgent::new(
            collaborators.graph_tools_base_url.clone(),
            collaborators.graph_tools_api_key.clone(),
            collaborators.graph_tools_timeout_ms,
        )
        .map_err(ApiError::from)?,
    );
    let data_client = Arc::new(
        HttpDataServiceClient::new(
            collaborators.data_service_base_url.clone(),
            collaborators.data_service_api_key.clone(),
            collaborators.data_service_timeout_ms,
        )
        .map_err(ApiError::from)?,
    );

    let state = AppState {
        repo,
        runtime_config,
        tenant_config,
        graph_tools,
        data_client,
        reasoning_config: Arc::new(reasoning_config),
        api_config: Arc::new(api_config),
        auth_config: Arc::new(auth_config),
        start_time: std::time::Instant::now(),
    };

    let app = create_api_router(state);

    let addr = resolve_bind_addr()?;
    tracing::info!(%addr, "starting reasoning API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::bad_request(format!("failed to bind {addr}: {e}")))?;

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    );
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::bad_request(format!("server error: {e}")))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    shutdown_tracer();
    Ok(())
}

fn resolve_bind_addr() -> ApiResult<SocketAddr> {
    let host = std::env::var("REASONING_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port_str = std::env::var("PORT")
        .ok()
        .or_else(|| std::env::var("REASONING_API_PORT").ok())
        .unwrap_or_else(|| "3000".to_string());
    let port = port_str
        .parse::<u16>()
        .map_err(|_| ApiError::bad_request(format!("invalid port value: {port_str}")))?;

    let addr = format!("{host}:{port}");
    addr.parse::<SocketAddr>()
        .map_err(|e| ApiError::bad_request(format!("invalid bind address {addr}: {e}")))
}
