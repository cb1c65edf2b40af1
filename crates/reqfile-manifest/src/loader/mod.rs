//! Loading manifests from disk.

use camino::{Utf8Path, Utf8PathBuf};
use reqfile_core::error::ReqError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::entry::Manifest;
use crate::parse::parse_manifest;
use crate::ManifestResult;

const UTF8_BOM: &str = "\u{feff}";

/// Read and parse the manifest at `path`
pub async fn load_from_file(path: &Utf8Path) -> ManifestResult<Manifest> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ReqError::io(format!("Failed to read {}", path), e))?;

    let content = String::from_utf8(bytes).map_err(|e| {
        ReqError::io(
            format!("Failed to read {}", path),
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(&content);

    debug!(path = %path, bytes = content.len(), "loaded manifest");
    parse_manifest(content, path)
}

/// Manifests already loaded during one resolution, keyed by path
#[derive(Debug, Default)]
pub struct ManifestCache {
    manifests: HashMap<Utf8PathBuf, Arc<Manifest>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached manifest or load it from disk
    pub async fn get_or_load(&mut self, path: &Utf8Path) -> ManifestResult<Arc<Manifest>> {
        if let Some(manifest) = self.manifests.get(path) {
            return Ok(Arc::clone(manifest));
        }

        let manifest = Arc::new(load_from_file(path).await?);
        self.manifests.insert(path.to_path_buf(), Arc::clone(&manifest));
        Ok(manifest)
    }

    /// Cached manifest without touching the disk
    pub fn get(&self, path: &Utf8Path) -> Option<Arc<Manifest>> {
        self.manifests.get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}
