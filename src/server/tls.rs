//! TLS configuration
//!
//! The listener negotiates TLS only when both a certificate and a key path are
//! configured. Certificates are PEM files loaded through axum-server's rustls
//! integration.

use axum_server::tls_rustls::RustlsConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during TLS configuration
#[derive(Error, Debug)]
pub enum TlsError {
    #[error("Certificate file not found: {0}")]
    CertificateNotFound(PathBuf),

    #[error("Private key file not found: {0}")]
    KeyNotFound(PathBuf),

    #[error("Failed to load certificate/key pair: {0}")]
    Load(#[source] std::io::Error),
}

/// Certificate and key paths for an encrypted listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the private key file (PEM format)
    pub key_path: PathBuf,
}

impl TlsConfig {
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// TLS settings when both paths are present and non-empty, `None` otherwise.
    pub fn from_paths(cert: Option<&Path>, key: Option<&Path>) -> Option<Self> {
        match (cert, key) {
            (Some(cert), Some(key))
                if !cert.as_os_str().is_empty() && !key.as_os_str().is_empty() =>
            {
                Some(Self::new(cert, key))
            }
            _ => None,
        }
    }

    /// Check that both files exist.
    pub fn validate(&self) -> Result<(), TlsError> {
        if !self.cert_path.is_file() {
            return Err(TlsError::CertificateNotFound(self.cert_path.clone()));
        }
        if !self.key_path.is_file() {
            return Err(TlsError::KeyNotFound(self.key_path.clone()));
        }
        Ok(())
    }

    /// Load the certificate chain and key into a rustls server config.
    pub async fn load(&self) -> Result<RustlsConfig, TlsError> {
        self.validate()?;
        let config = RustlsConfig::from_pem_file(&self.cert_path, &self.key_path)
            .await
            .map_err(TlsError::Load)?;
        info!(
            cert = %self.cert_path.display(),
            key = %self.key_path.display(),
            "TLS configuration loaded"
        );
        Ok(config)
    }
}

/// Warn once that the API is served without encryption.
pub fn warn_insecure() {
    warn!("API using insecure connection. We recommend using an SSL certificate.");
}
