//! Native share sheet.

use std::path::PathBuf;

use tracing::{debug, warn};

use super::{unique_path, DeliveryStrategy, Handoff, Outcome};
use crate::error::{Error, Result};

/// Shares a document through an external share command.
///
/// The command receives the staged file path, the title and the
/// description as its last three arguments. A non-zero exit status means
/// the user dismissed the sheet. The staged file is removed once the
/// command exits.
#[derive(Debug, Clone)]
pub struct ShareSheet {
    command: Option<String>,
    staging_dir: PathBuf,
}

impl ShareSheet {
    /// Create a share sheet; `None` means sharing is not available.
    #[must_use]
    pub fn new(command: Option<String>, staging_dir: PathBuf) -> Self {
        Self {
            command,
            staging_dir,
        }
    }
}

#[async_trait::async_trait]
impl DeliveryStrategy for ShareSheet {
    fn name(&self) -> &'static str {
        "share-sheet"
    }

    async fn attempt(&self, handoff: &Handoff) -> Result<Outcome> {
        let Some(command) = self.command.as_deref() else {
            return Ok(Outcome::Unsupported);
        };
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(Outcome::Unsupported);
        };

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(|source| Error::DirectoryCreate {
                path: self.staging_dir.clone(),
                source,
            })?;
        let staged = unique_path(&self.staging_dir, handoff.blob.filename());
        tokio::fs::write(&staged, handoff.blob.bytes()).await?;

        let status = tokio::process::Command::new(program)
            .args(parts)
            .arg(&staged)
            .arg(&handoff.title)
            .arg(&handoff.description)
            .status()
            .await;
        if let Err(e) = tokio::fs::remove_file(&staged).await {
            warn!("Could not remove staged file {}: {}", staged.display(), e);
        }
        let status =
            status.map_err(|e| Error::delivery(self.name(), format!("{program}: {e}")))?;

        if status.success() {
            Ok(Outcome::Delivered)
        } else {
            debug!("Share sheet dismissed ({})", status);
            Ok(Outcome::Declined)
        }
    }
}
