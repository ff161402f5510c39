//! Gamemaster API server entry point.

use std::sync::Arc;

use gamemaster_api::config::ApiConfig;
use gamemaster_api::error::AppError;
use gamemaster_api::state::AppState;
use gamemaster_api::{app, telemetry};
use gamemaster_clients::{
    ClientConfig, HttpLlmService, HttpRuleService, HttpScenarioService, HttpStateService,
};
use gamemaster_core::clock::SystemClock;
use gamemaster_play_log::PgPlayLogRepository;
use gamemaster_turn::application::engine::GameEngine;
use gamemaster_turn::application::pipeline::ServicePorts;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let telemetry = telemetry::init()?;
    let config = ApiConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let engine = GameEngine::new(
        service_ports(&config.clients)?,
        Arc::new(PgPlayLogRepository::new(pool)),
        Arc::new(SystemClock),
        config.engine.clone(),
    );
    let app = app(AppState::new(Arc::new(engine)));

    let addr = config.listen_addr();
    tracing::info!(%addr, "starting gamemaster API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app).await;

    telemetry.shutdown();
    served.map_err(AppError::from)
}

fn service_ports(config: &ClientConfig) -> Result<ServicePorts, AppError> {
    let client_error = |e: gamemaster_core::error::GmError| AppError::Config(e.to_string());
    Ok(ServicePorts {
        rule: Arc::new(HttpRuleService::new(config).map_err(client_error)?),
        scenario: Arc::new(HttpScenarioService::new(config).map_err(client_error)?),
        state: Arc::new(HttpStateService::new(config).map_err(client_error)?),
        llm: Arc::new(HttpLlmService::new(config).map_err(client_error)?),
    })
}
