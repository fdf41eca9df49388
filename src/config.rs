// Run settings: defaults < optional TOML file < BOOKVIEW_* env < CLI flags.
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_LEVELS: usize = 5;
pub const DEFAULT_INPUT: &str = "input.stream";
pub const DEFAULT_OUTPUT: &str = "output.log";
pub const DEFAULT_LOG_FILTER: &str = "info";
pub const ENV_PREFIX: &str = "BOOKVIEW";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings")]
    Load(#[from] config::ConfigError),

    #[error("levels must be at least 1")]
    InvalidLevels,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Price levels tracked and printed per side.
    pub levels: usize,
    pub input: PathBuf,
    pub output: PathBuf,
    pub log_filter: String,
}

/// Values given on the command line; `None` leaves the lower layers in effect.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub levels: Option<usize>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl Settings {
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, ConfigError> {
        Self::load_from(file, Environment::with_prefix(ENV_PREFIX), overrides)
    }

    fn load_from(
        file: Option<&Path>,
        env: Environment,
        overrides: &Overrides,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("levels", DEFAULT_LEVELS as u64)?
            .set_default("input", DEFAULT_INPUT)?
            .set_default("output", DEFAULT_OUTPUT)?
            .set_default("log_filter", DEFAULT_LOG_FILTER)?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        builder = builder
            .add_source(env)
            .set_override_option("levels", overrides.levels.map(|n| n as u64))?
            .set_override_option("input", overrides.input.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("output", overrides.output.as_ref().map(|p| p.display().to_string()))?
            .set_override_option("log_filter", overrides.log_filter.clone())?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        if settings.levels == 0 {
            return Err(ConfigError::InvalidLevels);
        }
        Ok(settings)
    }
}
