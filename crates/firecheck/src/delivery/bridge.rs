//! Host-native message bridge.
//!
//! When the application runs inside a native host, documents are forwarded
//! as one JSON message per line to the host's endpoint. The host never
//! answers.

use std::path::PathBuf;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{DeliveryStrategy, Handoff, Outcome};
use crate::error::{Error, Result};

/// Message sent to the host.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveFileMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    filename: &'a str,
    mime_type: &'a str,
    content: String,
}

/// Forwards documents to a native host.
#[derive(Debug, Clone)]
pub struct MessageBridge {
    endpoint: Option<PathBuf>,
}

impl MessageBridge {
    /// Create a bridge; `None` means no host is present.
    #[must_use]
    pub fn new(endpoint: Option<PathBuf>) -> Self {
        Self { endpoint }
    }
}

#[async_trait::async_trait]
impl DeliveryStrategy for MessageBridge {
    fn name(&self) -> &'static str {
        "message-bridge"
    }

    async fn attempt(&self, handoff: &Handoff) -> Result<Outcome> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(Outcome::Unsupported);
        };

        let message = SaveFileMessage {
            kind: "saveFile",
            filename: handoff.blob.filename(),
            mime_type: handoff.blob.mime_type(),
            content: handoff.blob.text().await,
        };
        let mut line = serde_json::to_string(&message)?;
        line.push('\n');

        let send = async {
            let mut host = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(endpoint)
                .await?;
            host.write_all(line.as_bytes()).await?;
            host.flush().await?;
            Ok::<(), std::io::Error>(())
        };
        send.await
            .map_err(|e| Error::delivery(self.name(), format!("{}: {e}", endpoint.display())))?;

        debug!("Forwarded {} to {}", handoff.blob.filename(), endpoint.display());
        Ok(Outcome::Delivered)
    }
}
