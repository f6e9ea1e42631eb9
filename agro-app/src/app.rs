use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use agro_core::calculations::survey::DIAGNOSTIC_KEY_PREFIX;
use agro_core::calculations::{EngineConfig, RoiEngine, SimulationSummary};
use agro_core::db::{DbConfig, RepositoryRegistry, diagnostic_limit};
use agro_core::{
    AgroRepository, DiagnosticResponse, SimulationInput, SimulationResult, load_reference_data,
};
use agro_data::ReferenceDatasetLoader;
use agro_db_sqlite::SqliteRepositoryFactory;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::http::{AppState, build_router};

/// Registry with every storage backend compiled into the binary.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Opens the configured backend with schema and seed data in place.
pub async fn open_repository(config: &DbConfig) -> Result<Arc<dyn AgroRepository>> {
    debug!("connecting to {} backend", config.backend);
    let repo = build_registry()
        .create(config)
        .await
        .with_context(|| format!("cannot open {} database '{}'", config.backend, config.connection_string))?;
    Ok(Arc::from(repo))
}

/// One estimate together with its rounded summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub result: SimulationResult,
    pub summary: SimulationSummary,
}

/// Runs an estimate against the stored reference data.
///
/// When `reference_file` is given its dataset replaces the stored one.
pub async fn run_simulation(
    repo: &dyn AgroRepository,
    engine_config: &EngineConfig,
    input: &SimulationInput,
    reference_file: Option<&Path>,
) -> Result<SimulationReport> {
    let mut reference = load_reference_data(repo)
        .await
        .context("cannot load reference data")?;

    if let Some(path) = reference_file {
        let file = File::open(path)
            .with_context(|| format!("cannot open reference dataset '{}'", path.display()))?;
        let dataset = ReferenceDatasetLoader::parse(BufReader::new(file))
            .with_context(|| format!("invalid reference dataset '{}'", path.display()))?;
        info!(path = %path.display(), crops = dataset.len(), "reference dataset loaded");
        reference = reference.with_dataset(dataset);
    }

    let engine = RoiEngine::new(engine_config, &reference)?;
    let result = engine.simulate(input)?;
    let summary = SimulationSummary::from_result(&result);
    Ok(SimulationReport { result, summary })
}

/// Stored diagnostic responses, newest first.
pub async fn list_diagnostics(
    repo: &dyn AgroRepository,
    limit: Option<usize>,
) -> Result<Vec<DiagnosticResponse>> {
    let items = repo
        .list_diagnostics(DIAGNOSTIC_KEY_PREFIX, diagnostic_limit(limit))
        .await
        .context("cannot list diagnostics")?;
    Ok(items)
}

/// Serves the HTTP surface until Ctrl-C.
pub async fn serve(
    bind: SocketAddr,
    state: AppState,
) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("cannot bind {bind}"))?;
    info!("agro-roi listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    info!("agro-roi stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
