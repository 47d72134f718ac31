use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StateBackend {
    File,
    Memory,
    Sqlite,
}

/// Home automation agent server: lights and meal planning over websockets.
#[derive(Debug, Parser)]
#[command(name = "hearth", version)]
pub struct Cli {
    #[arg(long, env = "HEARTH_PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "HEARTH_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// Where session snapshots are kept.
    #[arg(long, env = "HEARTH_STATE_BACKEND", value_enum, default_value_t = StateBackend::File)]
    pub state_backend: StateBackend,

    #[arg(long, env = "HEARTH_STATE_DIR", default_value = "./.app_web_state")]
    pub state_dir: PathBuf,

    /// JSON dish catalog replacing the built-in one.
    #[arg(long, env = "HEARTH_DISH_CATALOG")]
    pub dish_catalog: Option<PathBuf>,

    #[arg(long, env = "HEARTH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "HEARTH_LOG_JSON")]
    pub log_json: bool,
}
