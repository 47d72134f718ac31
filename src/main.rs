mod cli;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use hearth_core::meals::DishCatalog;
use hearth_engine::{create_default_registry, AgentRoster, CommandEngineFactory};
use hearth_session::SessionManager;
use hearth_store::{Database, FileSnapshotStore, MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
use hearth_telemetry::TelemetryConfig;

use crate::cli::{Cli, StateBackend};

fn open_store(cli: &Cli) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    Ok(match cli.state_backend {
        StateBackend::File => Arc::new(FileSnapshotStore::new(&cli.state_dir)),
        StateBackend::Memory => Arc::new(MemorySnapshotStore::new()),
        StateBackend::Sqlite => {
            let path = cli.state_dir.join("sessions.db");
            let db = Database::open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            Arc::new(SqliteSnapshotStore::new(db))
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    telemetry.log_level = hearth_telemetry::parse_level(&cli.log_level)
        .with_context(|| format!("unknown log level {:?}", cli.log_level))?;
    telemetry.json = cli.log_json;
    hearth_telemetry::init_telemetry(&telemetry);

    let catalog = match &cli.dish_catalog {
        Some(path) => DishCatalog::from_path(path)
            .with_context(|| format!("loading dish catalog {}", path.display()))?,
        None => DishCatalog::builtin(),
    };
    tracing::info!(dishes = catalog.len(), "dish catalog loaded");

    let tools = Arc::new(create_default_registry(Arc::new(catalog)));
    let engines = Arc::new(CommandEngineFactory::new(tools, AgentRoster::default()));
    let store = open_store(&cli)?;
    let manager = Arc::new(SessionManager::new(store, engines));

    let config = hearth_server::ServerConfig {
        bind: cli.bind.clone(),
        port: cli.port,
        ..Default::default()
    };
    let handle = hearth_server::start(config, manager)
        .await
        .context("starting server")?;
    tracing::info!(port = handle.port, "hearth ready");

    tokio::select! {
        _ = handle.wait() => tracing::warn!("server task ended"),
        res = tokio::signal::ctrl_c() => {
            res.context("listening for ctrl+c")?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
