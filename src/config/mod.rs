//! Configuration loading
//!
//! Reads an optional JSON5 file, then applies `ROBOGATE_*` environment
//! overrides. Command-line flags are applied last by the binary.

pub mod types;

pub use types::{Config, ConnectionConfig, DeviceConfig, RobotConfig};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Load configuration from `path` (if any) plus the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    apply_env(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

pub fn parse_config(text: &str) -> Result<Config, String> {
    json5::from_str(text).map_err(|e| e.to_string())
}

/// Apply environment overrides. Environment takes precedence over the file.
pub fn apply_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
    if let Some(host) = get("ROBOGATE_HOST") {
        config.host = Some(host);
    }
    if let Some(port) = get("ROBOGATE_PORT") {
        config.port = Some(port);
    }
    if let Some(cert) = get("ROBOGATE_CERT") {
        config.cert = Some(PathBuf::from(cert));
    }
    if let Some(key) = get("ROBOGATE_KEY") {
        config.key = Some(PathBuf::from(key));
    }
    if let Some(username) = get("ROBOGATE_USERNAME") {
        config.username = Some(username);
    }
    if let Some(password) = get("ROBOGATE_PASSWORD") {
        config.password = Some(password);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_parse_json5() {
        let cfg = parse_config(
            r#"{
                // trailing commas and comments are fine
                port: "8080",
                debug: true,
                commandTimeoutMs: 250,
                robots: [
                    { name: "rover", devices: [{ name: "led", driver: "Led", connection: "loop" }], },
                ],
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.port.as_deref(), Some("8080"));
        assert!(cfg.debug);
        assert_eq!(cfg.command_timeout_ms, Some(250));
        assert_eq!(cfg.robots[0].devices[0].driver, "Led");
        assert!(cfg.robots[0].connections.is_empty());
    }

    #[test]
    fn test_parse_error() {
        assert!(parse_config("{ port: ").is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut cfg = parse_config(r#"{ host: "10.0.0.1", port: "1234", username: "file" }"#).unwrap();
        let env: HashMap<&str, &str> = [
            ("ROBOGATE_PORT", "4321"),
            ("ROBOGATE_PASSWORD", "from-env"),
            ("ROBOGATE_HOST", ""),
        ]
        .into_iter()
        .collect();
        apply_env(&mut cfg, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.port.as_deref(), Some("4321"));
        assert_eq!(cfg.host.as_deref(), Some("10.0.0.1"));
        assert_eq!(cfg.credentials(), Some(("file", "from-env")));
    }

    #[test]
    fn test_read_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("robogate.json5");
        std::fs::write(&path, r#"{ debug: true }"#).unwrap();
        assert!(read_config_file(&path).unwrap().debug);

        let missing = read_config_file(&dir.path().join("missing.json5"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
