//! Offline asset cache.
//!
//! A fixed list of relative asset paths is copied eagerly into a versioned
//! cache directory named `apsad-r4-<version>`, so the application keeps
//! working without network access. Installing is all-or-nothing: the assets
//! are gathered in a staging directory that only replaces the live cache
//! once every asset was read. Activating a version deletes every cache
//! with another version.

use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::CACHE_PREFIX;
use crate::error::{Error, Result};

/// Assets every installed cache holds.
pub const PRECACHE_ASSETS: &[&str] = &[
    "index.html",
    "offline.html",
    "report.css",
    "icons/firecheck.svg",
];

const INDEX_FILE: &str = "index.json";
const FILES_DIR: &str = "files";

/// One cached asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Relative asset path.
    pub path: String,
    /// Size in bytes.
    pub size: u64,
    /// BLAKE3 hash of the content.
    pub blake3: String,
}

/// Contents of an installed cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheIndex {
    /// Cache name, including the version.
    pub name: String,
    /// When the cache was installed.
    pub installed_at: DateTime<Utc>,
    /// Cached assets in manifest order.
    pub entries: Vec<CacheEntry>,
}

/// Where a looked-up asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Served from the installed cache.
    Cache,
    /// Read from the asset root because the cache had no copy.
    Origin,
}

/// A versioned cache of static assets.
#[derive(Debug, Clone)]
pub struct AssetCache {
    cache_dir: PathBuf,
    name: String,
    assets: Vec<String>,
}

impl AssetCache {
    /// Create a cache handle for [`PRECACHE_ASSETS`].
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            name: name.into(),
            assets: PRECACHE_ASSETS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the asset list.
    #[must_use]
    pub fn with_assets(mut self, assets: Vec<String>) -> Self {
        self.assets = assets;
        self
    }

    /// Name of this cache.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory of this cache version.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.cache_dir.join(&self.name)
    }

    /// Copy every asset from `asset_root` into the cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetMissing`] if any asset cannot be read; the
    /// previously installed cache, if any, is left untouched.
    pub async fn install(&self, asset_root: &Path) -> Result<CacheIndex> {
        let staging = self
            .cache_dir
            .join(format!(".{}.staging.{}", self.name, std::process::id()));
        if tokio::fs::try_exists(&staging).await? {
            tokio::fs::remove_dir_all(&staging).await?;
        }

        match self.stage(asset_root, &staging).await {
            Ok(index) => {
                let live = self.path();
                if tokio::fs::try_exists(&live).await? {
                    tokio::fs::remove_dir_all(&live).await?;
                }
                tokio::fs::rename(&staging, &live).await?;
                info!("Installed {} assets into {}", index.entries.len(), self.name);
                Ok(index)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                    debug!("Could not remove {}: {}", staging.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    async fn stage(&self, asset_root: &Path, staging: &Path) -> Result<CacheIndex> {
        let files = staging.join(FILES_DIR);
        tokio::fs::create_dir_all(&files)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: files.clone(),
                source,
            })?;

        let mut entries = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let relative = relative_asset_path(asset)?;
            let bytes = tokio::fs::read(asset_root.join(&relative))
                .await
                .map_err(|source| Error::AssetMissing {
                    path: asset.clone(),
                    source,
                })?;

            let target = files.join(&relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, &bytes).await?;
            debug!("Cached {} ({} bytes)", asset, bytes.len());

            entries.push(CacheEntry {
                path: asset.clone(),
                size: bytes.len() as u64,
                blake3: blake3::hash(&bytes).to_hex().to_string(),
            });
        }

        let index = CacheIndex {
            name: self.name.clone(),
            installed_at: Utc::now(),
            entries,
        };
        tokio::fs::write(
            staging.join(INDEX_FILE),
            serde_json::to_vec_pretty(&index)?,
        )
        .await?;
        Ok(index)
    }

    /// Delete every cache whose version differs from this one.
    ///
    /// Returns the names of the deleted caches.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache directory cannot be listed or a stale
    /// cache cannot be removed.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(removed),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{CACHE_PREFIX}-");
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || name == self.name {
                continue;
            }
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            tokio::fs::remove_dir_all(entry.path()).await?;
            info!("Removed stale cache {}", name);
            removed.push(name);
        }
        removed.sort();
        Ok(removed)
    }

    /// Read an asset, preferring the cached copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssetMissing`] if neither the cache nor `asset_root`
    /// holds the asset.
    pub async fn lookup(&self, asset: &str, asset_root: &Path) -> Result<(Vec<u8>, Source)> {
        let relative = relative_asset_path(asset)?;
        let cached = self.path().join(FILES_DIR).join(&relative);
        match tokio::fs::read(&cached).await {
            Ok(bytes) => return Ok((bytes, Source::Cache)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Cached copy of {} unreadable: {}", asset, e),
        }

        let bytes = tokio::fs::read(asset_root.join(&relative))
            .await
            .map_err(|source| Error::AssetMissing {
                path: asset.to_string(),
                source,
            })?;
        Ok((bytes, Source::Origin))
    }

    /// Index of the installed cache, if this version is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the index exists but cannot be read.
    pub async fn index(&self) -> Result<Option<CacheIndex>> {
        match tokio::fs::read(self.path().join(INDEX_FILE)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Validate a manifest path: relative, without `..` or root components.
fn relative_asset_path(asset: &str) -> Result<PathBuf> {
    let path = Path::new(asset);
    let valid = !asset.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if valid {
        Ok(path.to_path_buf())
    } else {
        Err(Error::AssetMissing {
            path: asset.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a relative asset path"),
        })
    }
}
