//! Native save dialog.

use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::{DeliveryStrategy, Handoff, Outcome};
use crate::error::{Error, Result};

/// A dialog asking the user where to save a file.
#[async_trait::async_trait]
pub trait SavePrompt: Send + Sync + fmt::Debug {
    /// Ask for a destination. `None` means the user cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the dialog itself could not be shown.
    async fn choose(&self, suggested_name: &str) -> Result<Option<PathBuf>>;
}

/// Save dialog on an interactive terminal.
///
/// An empty answer cancels. A directory answer saves under the suggested
/// name inside it.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

#[async_trait::async_trait]
impl SavePrompt for TerminalPrompt {
    async fn choose(&self, suggested_name: &str) -> Result<Option<PathBuf>> {
        let suggested = suggested_name.to_string();
        let answer = tokio::task::spawn_blocking(move || -> std::io::Result<String> {
            let mut stderr = std::io::stderr();
            write!(stderr, "Save report as [{suggested}] (empty to cancel): ")?;
            stderr.flush()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await
        .map_err(|e| Error::internal(format!("save prompt task failed: {e}")))??;

        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(answer);
        if path.is_dir() {
            return Ok(Some(path.join(suggested_name)));
        }
        Ok(Some(path))
    }
}

/// Saves through a [`SavePrompt`] when the environment has one.
#[derive(Debug)]
pub struct SavePicker {
    prompt: Option<Box<dyn SavePrompt>>,
}

impl SavePicker {
    /// Create a picker; `None` means no save dialog exists here.
    #[must_use]
    pub fn new(prompt: Option<Box<dyn SavePrompt>>) -> Self {
        Self { prompt }
    }
}

#[async_trait::async_trait]
impl DeliveryStrategy for SavePicker {
    fn name(&self) -> &'static str {
        "save-picker"
    }

    async fn attempt(&self, handoff: &Handoff) -> Result<Outcome> {
        let Some(prompt) = &self.prompt else {
            return Ok(Outcome::Unsupported);
        };

        let Some(path) = prompt.choose(handoff.blob.filename()).await? else {
            debug!("Save dialog cancelled");
            return Ok(Outcome::Declined);
        };

        let write = async {
            let mut file = tokio::fs::File::create(&path).await?;
            file.write_all(handoff.blob.bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<(), std::io::Error>(())
        };
        write
            .await
            .map_err(|e| Error::delivery(self.name(), format!("{}: {e}", path.display())))?;

        info!("Saved report to {}", path.display());
        Ok(Outcome::Delivered)
    }
}
