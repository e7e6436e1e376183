//! Command-line interface.
//!
//! Flags override the config file and `ROBOGATE_*` environment variables.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Introspectable HTTP command gateway for robots, devices and connections.
#[derive(Parser, Debug, Default)]
#[command(
    name = "robogate",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("ROBOGATE_GIT_HASH"), ")")
)]
pub struct Cli {
    /// JSON5 configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind (default: all interfaces).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (default: 3000).
    #[arg(short, long)]
    pub port: Option<String>,

    /// TLS certificate (PEM). TLS is enabled when both --cert and --key are set.
    #[arg(long)]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM).
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Basic-Auth user name.
    #[arg(long)]
    pub username: Option<String>,

    /// Basic-Auth password.
    #[arg(long)]
    pub password: Option<String>,

    /// Log every routed request.
    #[arg(long)]
    pub debug: bool,

    /// Bound on a single command invocation in milliseconds (0 disables).
    #[arg(long)]
    pub command_timeout_ms: Option<u64>,

    /// Directory of static assets.
    #[arg(long)]
    pub assets_dir: Option<PathBuf>,

    /// Log format: plaintext or json.
    #[arg(long)]
    pub log_format: Option<String>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host = Some(host.clone());
        }
        if let Some(port) = &self.port {
            config.port = Some(port.clone());
        }
        if let Some(cert) = &self.cert {
            config.cert = Some(cert.clone());
        }
        if let Some(key) = &self.key {
            config.key = Some(key.clone());
        }
        if let Some(username) = &self.username {
            config.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if self.debug {
            config.debug = true;
        }
        if let Some(ms) = self.command_timeout_ms {
            config.command_timeout_ms = Some(ms);
        }
        if let Some(dir) = &self.assets_dir {
            config.assets_dir = Some(dir.clone());
        }
        if let Some(format) = &self.log_format {
            config.log_format = Some(format.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from([
            "robogate",
            "--port",
            "8080",
            "--username",
            "admin",
            "--password",
            "pw",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.port.as_deref(), Some("8080"));
        assert!(cli.debug);
        assert!(cli.cert.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = Config {
            port: Some("1111".to_string()),
            host: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        let cli = Cli::try_parse_from(["robogate", "-p", "2222", "--command-timeout-ms", "0"]).unwrap();
        cli.apply(&mut config);
        assert_eq!(config.port.as_deref(), Some("2222"));
        assert_eq!(config.host.as_deref(), Some("10.0.0.1"));
        assert_eq!(config.command_timeout_ms, Some(0));
        assert!(!config.debug);
    }
}
