//! Engine configuration loaded from a TOML file.
//!
//! Every key is optional; omitted keys keep the built-in value. Nested
//! tables (`[digitization]`, `[scenario]`) must be given whole.
//!
//! ```toml
//! scale_hectares = 50
//! scale_gain = 0.12
//! scale_cap = 1.15
//!
//! [scenario]
//! conservative = 0.75
//! realistic = 1.0
//! optimistic = 1.25
//!
//! [[investment_tiers]]
//! max_hectares = 100
//! amount = 2000000
//!
//! [[investment_tiers]]
//! amount = 8000000
//! ```

use std::path::{Path, PathBuf};

use agro_core::calculations::{ConfigurationError, EngineConfig};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read engine config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid engine config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("engine config rejected: {0}")]
    Invalid(#[from] ConfigurationError),
}

/// Parses and validates an engine table from TOML text.
pub fn parse_engine_config(text: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Loads the engine table from `path`, or the built-in table when no path
/// is given.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    let Some(path) = path else {
        debug!("using built-in engine config");
        return Ok(EngineConfig::default());
    };

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_engine_config(&text)?;
    info!(path = %path.display(), tiers = config.investment_tiers.len(), "engine config loaded");
    Ok(config)
}
