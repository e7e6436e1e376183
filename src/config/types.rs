//! Typed configuration structures
//!
//! The on-disk configuration file (JSON5, camelCase keys) and its mapping
//! onto [`ApiConfig`] and a declarative loopback fleet.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::command::{command_fn, CommandArgs};
use crate::graph::memory::{MemoryConnection, MemoryDevice, MemoryFleet, MemoryRobot};
use crate::server::http::{ApiConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Bind host; empty binds all interfaces
    pub host: Option<String>,

    /// Listen port
    pub port: Option<String>,

    /// TLS certificate path (PEM)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert: Option<PathBuf>,

    /// TLS key path (PEM)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,

    /// Basic-Auth user name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Basic-Auth password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Log every routed request
    pub debug: bool,

    /// Bound on a single command invocation in milliseconds; 0 disables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_timeout_ms: Option<u64>,

    /// Directory of static assets served for unrouted GET paths
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets_dir: Option<PathBuf>,

    /// "json" or "plaintext"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<String>,

    /// Robots exposed by the gateway
    pub robots: Vec<RobotConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotConfig {
    pub name: String,
    pub connections: Vec<ConnectionConfig>,
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionConfig {
    pub name: String,
    pub adaptor: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    pub name: String,
    pub driver: String,
    pub connection: String,
}

impl Config {
    /// Basic-Auth credentials, when both halves are non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// True when a username or password was given but [`Config::credentials`]
    /// cannot use it, leaving Basic-Auth off.
    pub fn credentials_incomplete(&self) -> bool {
        self.credentials().is_none() && (self.username.is_some() || self.password.is_some())
    }

    pub fn api_config(&self) -> ApiConfig {
        let command_timeout = match self.command_timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => ApiConfig::default().command_timeout,
        };
        ApiConfig {
            host: self.host.clone().unwrap_or_default(),
            port: self
                .port
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PORT.to_string()),
            cert: self.cert.clone(),
            key: self.key.clone(),
            command_timeout,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Materialise the configured robots as an in-memory loopback fleet.
    ///
    /// Devices expose `echo`, which returns its argument bag; the fleet
    /// exposes `robots`, which lists robot names.
    pub fn build_fleet(&self) -> Arc<MemoryFleet> {
        let fleet = Arc::new(MemoryFleet::new());
        for robot_cfg in &self.robots {
            let robot = MemoryRobot::new(&robot_cfg.name);
            for conn in &robot_cfg.connections {
                robot.add_connection(MemoryConnection::new(&conn.name, &conn.adaptor));
            }
            for dev in &robot_cfg.devices {
                let echo = command_fn(|args: &CommandArgs| Value::Object(args.clone()));
                robot.add_device(
                    MemoryDevice::new(&dev.name, &dev.driver, &dev.connection)
                        .with_command("echo", echo),
                );
            }
            fleet.add_robot(robot);
        }

        let weak = Arc::downgrade(&fleet);
        fleet.add_command(
            "robots",
            command_fn(move |_: &CommandArgs| {
                weak.upgrade()
                    .map(|fleet| fleet.robot_names())
                    .unwrap_or_default()
            }),
        );
        fleet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Device, Fleet, Robot};
    use serde_json::json;

    #[test]
    fn test_api_config_defaults() {
        let api = Config::default().api_config();
        assert_eq!(api, ApiConfig::default());
    }

    #[test]
    fn test_command_timeout_mapping() {
        let cfg = Config {
            command_timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(cfg.api_config().command_timeout, None);
        let cfg = Config {
            command_timeout_ms: Some(1500),
            ..Default::default()
        };
        assert_eq!(
            cfg.api_config().command_timeout,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_credentials_require_both_halves() {
        let mut cfg = Config {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        assert!(cfg.credentials().is_none());
        cfg.password = Some(String::new());
        assert!(cfg.credentials().is_none());
        cfg.password = Some("pw".to_string());
        assert_eq!(cfg.credentials(), Some(("admin", "pw")));
    }

    #[test]
    fn test_credentials_incomplete() {
        assert!(!Config::default().credentials_incomplete());

        let mut cfg = Config {
            username: Some("admin".to_string()),
            ..Default::default()
        };
        assert!(cfg.credentials_incomplete());
        cfg.password = Some(String::new());
        assert!(cfg.credentials_incomplete());
        cfg.password = Some("pw".to_string());
        assert!(!cfg.credentials_incomplete());

        let cfg = Config {
            password: Some("pw".to_string()),
            ..Default::default()
        };
        assert!(cfg.credentials_incomplete());
    }

    #[test]
    fn test_build_fleet() {
        let cfg = Config {
            robots: vec![RobotConfig {
                name: "rover".to_string(),
                connections: vec![ConnectionConfig {
                    name: "loop".to_string(),
                    adaptor: "Loopback".to_string(),
                }],
                devices: vec![DeviceConfig {
                    name: "led".to_string(),
                    driver: "Led".to_string(),
                    connection: "loop".to_string(),
                }],
            }],
            ..Default::default()
        };
        let fleet = cfg.build_fleet();
        let robots = fleet.command("robots").unwrap();
        assert_eq!(robots.invoke(&CommandArgs::new()), json!(["rover"]));

        let led = fleet.robot("rover").unwrap().device("led").unwrap();
        let mut args = CommandArgs::new();
        args.insert("on".to_string(), json!(true));
        assert_eq!(led.command("echo").unwrap().invoke(&args), json!({"on": true}));
    }
}
