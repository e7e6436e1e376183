//! Static asset collections
//!
//! Backs the lowest-priority routes: any GET path the API routes do not claim
//! is looked up here by its name relative to `/`.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset {0} not found")]
    NotFound(String),

    #[error("Asset {name} could not be read: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only lookup of asset bytes by relative path.
pub trait AssetSource: Send + Sync {
    fn asset(&self, name: &str) -> Result<Cow<'static, [u8]>, AssetError>;
}

/// Assets compiled into the binary as a static table.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets {
    entries: &'static [(&'static str, &'static [u8])],
}

impl EmbeddedAssets {
    pub const fn new(entries: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { entries }
    }

    pub const fn empty() -> Self {
        Self { entries: &[] }
    }
}

impl AssetSource for EmbeddedAssets {
    fn asset(&self, name: &str) -> Result<Cow<'static, [u8]>, AssetError> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
            .ok_or_else(|| AssetError::NotFound(name.to_string()))
    }
}

/// Assets served from a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve `name` below the root, refusing anything that could escape it.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if name.is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl AssetSource for DirAssets {
    fn asset(&self, name: &str) -> Result<Cow<'static, [u8]>, AssetError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        if !path.is_file() {
            return Err(AssetError::NotFound(name.to_string()));
        }
        std::fs::read(&path)
            .map(Cow::Owned)
            .map_err(|source| AssetError::Read {
                name: name.to_string(),
                source,
            })
    }
}

/// Content type inferred from the asset extension, if any is known.
pub fn content_type(name: &str) -> Option<&'static str> {
    match Path::new(name).extension().and_then(|ext| ext.to_str()) {
        Some("js") => Some("text/javascript; charset=utf-8"),
        Some("css") => Some("text/css; charset=utf-8"),
        _ => None,
    }
}
