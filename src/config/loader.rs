use std::{fs, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use config::{Config, Environment};
use log::info;

pub fn get_default_config() -> &'static str {
    include_str!("../../resources/default_config.toml")
}

/// Loads `path` (creating it from the embedded defaults when missing) and
/// layers `TESLA_*` environment variables on top.
pub fn load_configuration(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sources = get_default_config();
        write_config_to(path, sources).context("Could not create default config")?;
        info!(path:% = path.display(); "Created new configuration file");
    }

    let filename = path.to_str().context("Invalid config file path")?;

    Config::builder()
        .add_source(config::File::with_name(filename))
        .add_source(
            Environment::with_prefix("TESLA")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .context("Could not build config")
}

pub fn write_config_to(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create parent directories")?;
    };

    let mut file = File::create(path).context("Failed to create config file")?;
    file.write_all(source.as_bytes())
        .context("Failed to write config content")?;
    file.write_all(b"\n").context("Failed to write newline")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn creates_default_file_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = load_configuration(&path).unwrap();
        assert!(path.exists());

        let config = ClientConfig::from_config(&cfg).unwrap();
        assert_eq!(config.max_wake_attempts, 10);
        assert_eq!(config.wake_poll_interval_ms, 10_000);
        assert_eq!(config.client_id, "ownerapi");
        assert!(config.vehicle_id.is_empty());
    }

    #[test]
    #[serial]
    fn file_values_and_environment_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_config_to(&path, "vehicle_id = \"1234\"\nmax_wake_attempts = 3\n").unwrap();

        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::set_var("TESLA_REFRESH_TOKEN", "from-env");
            std::env::set_var("TESLA_WAKE_POLL_INTERVAL_MS", "250");
        }
        let cfg = load_configuration(&path);
        unsafe {
            std::env::remove_var("TESLA_REFRESH_TOKEN");
            std::env::remove_var("TESLA_WAKE_POLL_INTERVAL_MS");
        }

        let config = ClientConfig::from_config(&cfg.unwrap()).unwrap();
        assert_eq!(config.vehicle_id, "1234");
        assert_eq!(config.refresh_token, "from-env");
        assert_eq!(config.max_wake_attempts, 3);
        assert_eq!(config.wake_poll_interval_ms, 250);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    #[serial]
    fn string_values_from_environment_are_kept_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_config_to(&path, "").unwrap();

        // SAFETY: tests touching the environment are serialized.
        unsafe {
            std::env::set_var("TESLA_VEHICLE_ID", "0042");
            std::env::set_var("TESLA_REFRESH_TOKEN", "1e5");
        }
        let cfg = load_configuration(&path);
        unsafe {
            std::env::remove_var("TESLA_VEHICLE_ID");
            std::env::remove_var("TESLA_REFRESH_TOKEN");
        }

        let config = ClientConfig::from_config(&cfg.unwrap()).unwrap();
        assert_eq!(config.vehicle_id, "0042");
        assert_eq!(config.refresh_token, "1e5");
    }
}
