pub mod kv_console_encoder;

use std::path::PathBuf;

use anyhow::Context;
use log::{debug, info};
use log4rs::{
    Config,
    config::{Deserializers, RawConfig},
};

use crate::logging::kv_console_encoder::KvConsoleEncoderDeserializer;

/// Environment variable naming an external log4rs file.
pub const LOG_CONFIG_ENV: &str = "TESLAREST_LOG_CONFIG";
const DEFAULT_LOG_CONFIG_FILE: &str = "log4rs.yml";
const EMBEDDED_LOG_CONFIG: &str = include_str!("../../resources/default_log4rs.yml");

/// Number of leading token characters kept by [`mask_token`].
const TOKEN_PREFIX_LEN: usize = 10;

/// Initializes logging from `log4rs.yml` in the working directory (or the
/// file named by `TESLAREST_LOG_CONFIG`), falling back to embedded defaults.
pub fn init_logging() -> anyhow::Result<()> {
    let deserializers = deserializers();

    let external = std::env::var(LOG_CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_CONFIG_FILE));

    if external.exists() {
        log4rs::init_file(&external, deserializers)
            .with_context(|| format!("Failed to load log configuration {}", external.display()))?;
        info!(path:% = external.display(); "Logging initialized from external configuration");
        return Ok(());
    }

    let config = embedded_config(&deserializers)?;
    log4rs::init_config(config).context("Failed to initialize logging")?;

    debug!("Logging initialized from embedded defaults");
    Ok(())
}

fn deserializers() -> Deserializers {
    let mut deserializers = Deserializers::default();
    deserializers.insert("kv_console", KvConsoleEncoderDeserializer);
    deserializers
}

fn embedded_config(deserializers: &Deserializers) -> anyhow::Result<Config> {
    let raw_config: RawConfig =
        serde_yaml::from_str(EMBEDDED_LOG_CONFIG).context("Embedded logging configuration is invalid YAML")?;

    let (appenders, errors) = raw_config.appenders_lossy(deserializers);
    if !errors.is_empty() {
        anyhow::bail!("Errors parsing embedded appenders: {:?}", errors);
    }

    Config::builder()
        .appenders(appenders)
        .loggers(raw_config.loggers())
        .build(raw_config.root())
        .context("Failed to build logging config")
}

/// Truncates a credential for logging: the first ten characters followed
/// by `...`. Anything that short is hidden entirely.
pub fn mask_token(token: &str) -> String {
    match token.char_indices().nth(TOKEN_PREFIX_LEN) {
        Some((cut, _)) => format!("{}...", &token[..cut]),
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_token_keeps_prefix() {
        assert_eq!(mask_token("eyJhbGciOiJSUzI1NiIs"), "eyJhbGciOi...");
    }

    #[test]
    fn mask_token_hides_short_values() {
        assert_eq!(mask_token(""), "***");
        assert_eq!(mask_token("0123456789"), "***");
        assert_eq!(mask_token("0123456789a"), "0123456789...");
    }

    #[test]
    fn embedded_config_builds() {
        let config = embedded_config(&deserializers()).unwrap();
        assert!(config.appenders().iter().any(|a| a.name() == "console"));
        assert!(config.loggers().iter().any(|l| l.name() == "audit"));
    }
}
