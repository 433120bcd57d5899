//! Configuration loader with environment variable support

use super::{tokens_from_env, Config};
use crate::error::Result;
use config::{Environment, File};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    Ok(cfg)
}

/// Load configuration from a TOML file with environment variable overrides
///
/// Scalar keys are overridden with `KNOWLEDGE_RETRIEVAL__<SECTION>__<KEY>`, e.g.
/// `KNOWLEDGE_RETRIEVAL__SERVER__PORT=9090`. API tokens come from the comma separated
/// `KNOWLEDGE_API_TOKENS` variable and are appended to the tokens in the file.
pub fn load_config_with_env<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = config::Config::builder()
        .add_source(File::from(path.as_ref()))
        .add_source(
            Environment::with_prefix("KNOWLEDGE_RETRIEVAL")
                .separator("__")
                .try_parsing(true)
        )
        .build()?;

    let mut cfg: Config = config.try_deserialize()?;
    cfg.auth.api_tokens.extend(tokens_from_env());
    Ok(cfg)
}
