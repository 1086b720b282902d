use crate::error::ConfigError;
use config::builder::DefaultState;
use config::ConfigBuilder;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;
pub mod telemetry;

// Re-export the core types to provide a clean public API.
pub use settings::{
    DatabaseSettings, LoggingSettings, RollupSettings, ServerOverrides, ServerSettings, Settings,
};
pub use telemetry::init_tracing;

/// Name of the optional configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "finboard";

/// Prefix of the environment variables that override file settings,
/// e.g. `FINBOARD__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "FINBOARD";

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080_i64)?
        .set_default("server.body_limit_bytes", 1024_i64 * 1024)?
        .set_default("database.max_connections", 10_i64)?
        .set_default("database.acquire_timeout_secs", 5_i64)?
        .set_default("rollup.interval", "5s")?
        .set_default("logging.filter", "finboard=info,web_server=info,database=info,tower_http=info")?
        .set_default("logging.file_prefix", "finboard.log")?)
}

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, the file at `path`
/// (or an optional `finboard.toml` in the working directory), then
/// `FINBOARD__*` environment variables. A `.env` file is read first.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();

    let builder = with_defaults()?;
    let builder = match path {
        Some(path) => builder.add_source(config::File::from(path)),
        None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
    };

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    settings.validate()?;
    Ok(settings)
}
