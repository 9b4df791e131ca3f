//! Download fallback.
//!
//! Always available: the document is written to the downloads directory
//! through a transient reference, then opened for viewing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{DeliveryStrategy, Handoff, Outcome};
use crate::error::{Error, Result};
use crate::objects::ObjectUrls;

/// Writes documents to a downloads directory.
#[derive(Debug, Clone)]
pub struct DownloadLink {
    downloads_dir: PathBuf,
    viewer: Option<String>,
    urls: Arc<ObjectUrls>,
}

impl DownloadLink {
    /// Create the fallback strategy.
    ///
    /// `viewer` is a program invoked with the saved path to show it inline.
    #[must_use]
    pub fn new(downloads_dir: PathBuf, viewer: Option<String>, urls: Arc<ObjectUrls>) -> Self {
        Self {
            downloads_dir,
            viewer,
            urls,
        }
    }

    fn open_inline(&self, path: &Path) {
        let Some(viewer) = self.viewer.as_deref() else {
            info!("Report available at {}", path.display());
            return;
        };

        let mut parts = viewer.split_whitespace();
        let Some(program) = parts.next() else {
            return;
        };
        match tokio::process::Command::new(program)
            .args(parts)
            .arg(path)
            .spawn()
        {
            Ok(_child) => debug!("Opened {} with {}", path.display(), program),
            Err(e) => warn!("Could not open {} with {}: {}", path.display(), program, e),
        }
    }
}

#[async_trait::async_trait]
impl DeliveryStrategy for DownloadLink {
    fn name(&self) -> &'static str {
        "download-link"
    }

    async fn attempt(&self, handoff: &Handoff) -> Result<Outcome> {
        let reference = self.urls.create(handoff.blob.clone())?;
        let blob = self
            .urls
            .fetch(&reference)?
            .ok_or_else(|| Error::internal(format!("{reference} vanished before download")))?;

        tokio::fs::create_dir_all(&self.downloads_dir)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: self.downloads_dir.clone(),
                source,
            })?;
        let path = unique_path(&self.downloads_dir, blob.filename());
        let written = tokio::fs::write(&path, blob.bytes()).await;
        self.urls.revoke(&reference)?;
        written.map_err(|e| Error::delivery(self.name(), format!("{}: {e}", path.display())))?;

        self.open_inline(&path);
        Ok(Outcome::Delivered)
    }
}

/// First free path for `filename` in `dir`, adding ` (n)` before the
/// extension when the name is taken.
#[must_use]
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(filename);
    let stem = name
        .file_stem()
        .map_or_else(|| filename.to_string(), |s| s.to_string_lossy().into_owned());
    let extension = name
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| dir.join(format!("{stem} ({n}){extension}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
