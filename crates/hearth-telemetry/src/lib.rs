use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variables carrying per-plugin log levels, and the modules
/// each one controls.
pub const PLUGIN_LEVEL_VARS: &[(&str, &[&str])] = &[
    (
        "MEAL_PLUGIN_LOG_LEVEL",
        &["hearth_core::meals", "hearth_engine::tools::meals"],
    ),
    (
        "LIGHTS_PLUGIN_LOG_LEVEL",
        &["hearth_core::lights", "hearth_engine::tools::lights"],
    ),
    (
        "AGENT_LOG_LEVEL",
        &["hearth_engine::command", "hearth_engine::scripted", "hearth_session"],
    ),
];

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG env var.
    pub log_level: Level,
    /// Per-module level overrides (e.g. "hearth_store" => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Default config plus the plugin level variables from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Apply plugin level variables read through `lookup`. Unparseable
    /// values are ignored.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        for (var, modules) in PLUGIN_LEVEL_VARS {
            let Some(level) = lookup(var).as_deref().and_then(parse_level) else {
                continue;
            };
            for module in *modules {
                self.set_module_level(module, level);
            }
        }
        self
    }

    pub fn set_module_level(&mut self, module: &str, level: Level) {
        if let Some(entry) = self.module_levels.iter_mut().find(|(m, _)| m == module) {
            entry.1 = level;
        } else {
            self.module_levels.push((module.to_string(), level));
        }
    }

    /// `EnvFilter` directives equivalent to this config.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter
    }
}

/// Accepts tracing level names plus the `WARNING`/`CRITICAL` spellings.
pub fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        "critical" | "fatal" => Some(Level::ERROR),
        other => other.parse().ok(),
    }
}

/// Initialize the global subscriber. Call once at startup; later calls are
/// no-ops that return false.
pub fn init_telemetry(config: &TelemetryConfig) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let fmt_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_filter_is_info() {
        assert_eq!(TelemetryConfig::default().filter_directives(), "info");
    }

    #[test]
    fn plugin_vars_map_to_modules() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MEAL_PLUGIN_LOG_LEVEL", "DEBUG"),
            ("LIGHTS_PLUGIN_LOG_LEVEL", "WARNING"),
        ]);
        let config = TelemetryConfig::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(
            config.filter_directives(),
            "info,hearth_core::meals=debug,hearth_engine::tools::meals=debug,\
             hearth_core::lights=warn,hearth_engine::tools::lights=warn"
        );
    }

    #[test]
    fn bad_levels_are_ignored() {
        let config = TelemetryConfig::default().with_env(|k| {
            (k == "AGENT_LOG_LEVEL").then(|| "loud".to_string())
        });
        assert!(config.module_levels.is_empty());
    }

    #[test]
    fn set_module_level_replaces() {
        let mut config = TelemetryConfig::default();
        config.set_module_level("hearth_store", Level::DEBUG);
        config.set_module_level("hearth_store", Level::TRACE);
        assert_eq!(config.module_levels, vec![("hearth_store".to_string(), Level::TRACE)]);
    }

    #[test]
    fn level_spellings() {
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("CRITICAL"), Some(Level::ERROR));
        assert_eq!(parse_level(" info "), Some(Level::INFO));
        assert_eq!(parse_level("nope"), None);
    }

    #[test]
    fn second_init_is_noop() {
        let config = TelemetryConfig::default();
        let _ = init_telemetry(&config);
        assert!(!init_telemetry(&config));
    }
}
