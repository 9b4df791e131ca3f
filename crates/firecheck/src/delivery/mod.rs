//! Handing generated reports over to the user.
//!
//! Each way of getting a document out of the application is a
//! [`DeliveryStrategy`]. A [`Dispatcher`] holds strategies in priority order
//! and tries them until one delivers the document or the user declines.
//! Strategies whose capability is missing in the current environment answer
//! [`Outcome::Unsupported`] and the next one is tried.
//!
//! Two chains are used:
//!
//! - saving: [`SavePicker`], then [`MessageBridge`], then [`DownloadLink`]
//! - sharing: [`ShareSheet`], then [`DownloadLink`]
//!
//! Sharing never reports failure; see [`share`].

mod bridge;
mod download;
mod picker;
mod share;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::objects::ObjectUrls;
use crate::report::DocumentBlob;

pub use bridge::MessageBridge;
pub use download::{unique_path, DownloadLink};
pub use picker::{SavePicker, SavePrompt, TerminalPrompt};
pub use share::ShareSheet;

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The document reached the user.
    Delivered,
    /// The user dismissed the dialog. Not an error.
    Declined,
    /// The capability is not available here.
    Unsupported,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "delivered"),
            Self::Declined => write!(f, "declined"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// A document ready to be handed over.
#[derive(Debug, Clone)]
pub struct Handoff {
    /// The document payload.
    pub blob: Arc<DocumentBlob>,
    /// Title shown by share dialogs.
    pub title: String,
    /// Description shown by share dialogs.
    pub description: String,
}

impl Handoff {
    /// Bundle a blob with its share title and description.
    #[must_use]
    pub fn new(blob: DocumentBlob, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            blob: Arc::new(blob),
            title: title.into(),
            description: description.into(),
        }
    }

    /// Bundle a blob that is already shared, e.g. registered in [`ObjectUrls`].
    #[must_use]
    pub fn shared(
        blob: Arc<DocumentBlob>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            blob,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// One mechanism for getting a document to the user.
#[async_trait::async_trait]
pub trait DeliveryStrategy: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Try to deliver the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the capability exists but using it failed.
    async fn attempt(&self, handoff: &Handoff) -> Result<Outcome>;
}

/// Strategies tried in priority order.
#[derive(Debug, Default)]
pub struct Dispatcher {
    strategies: Vec<Box<dyn DeliveryStrategy>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy with lower priority than those already added.
    #[must_use]
    pub fn with(mut self, strategy: impl DeliveryStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Names of the strategies in priority order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy until one delivers or the user declines.
    ///
    /// # Errors
    ///
    /// Propagates the first strategy error; later strategies are not tried.
    pub async fn deliver(&self, handoff: &Handoff) -> Result<Outcome> {
        for strategy in &self.strategies {
            match strategy.attempt(handoff).await? {
                Outcome::Unsupported => {
                    debug!("Delivery via {} unsupported", strategy.name());
                }
                outcome => {
                    info!(
                        "Delivery of {} via {}: {}",
                        handoff.blob.filename(),
                        strategy.name(),
                        outcome
                    );
                    return Ok(outcome);
                }
            }
        }
        Ok(Outcome::Unsupported)
    }
}

/// Share a document, swallowing every failure.
///
/// Errors are logged and reported as [`Outcome::Declined`].
pub async fn share(dispatcher: &Dispatcher, handoff: &Handoff) -> Outcome {
    match dispatcher.deliver(handoff).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Sharing {} failed: {}", handoff.blob.filename(), e);
            Outcome::Declined
        }
    }
}

/// Build the save chain for this environment.
///
/// `prompt` is the native save dialog, when one exists.
#[must_use]
pub fn save_chain(
    config: &Config,
    prompt: Option<Box<dyn SavePrompt>>,
    urls: Arc<ObjectUrls>,
) -> Dispatcher {
    Dispatcher::new()
        .with(SavePicker::new(prompt))
        .with(MessageBridge::new(config.delivery.bridge_endpoint.clone()))
        .with(download_link(config, urls))
}

/// Build the share chain for this environment.
#[must_use]
pub fn share_chain(config: &Config, urls: Arc<ObjectUrls>) -> Dispatcher {
    Dispatcher::new()
        .with(ShareSheet::new(
            config.delivery.share_command.clone(),
            config.share_staging_dir(),
        ))
        .with(download_link(config, urls))
}

fn download_link(config: &Config, urls: Arc<ObjectUrls>) -> DownloadLink {
    DownloadLink::new(
        config.downloads_dir(),
        config.delivery.viewer_command.clone(),
        urls,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Fixed {
        name: &'static str,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl DeliveryStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _handoff: &Handoff) -> Result<Outcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.outcome)
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait::async_trait]
    impl DeliveryStrategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn attempt(&self, _handoff: &Handoff) -> Result<Outcome> {
            Err(Error::delivery("failing", "boom"))
        }
    }

    fn fixed(name: &'static str, outcome: Outcome) -> (Fixed, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Fixed {
                name,
                outcome,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn handoff() -> Handoff {
        Handoff::new(
            DocumentBlob::new(b"<p>ok</p>".to_vec(), "text/html", "r.html"),
            "Rapport",
            "Inspection APSAD R4",
        )
    }

    #[tokio::test]
    async fn test_first_supported_strategy_wins() {
        let (a, a_calls) = fixed("a", Outcome::Unsupported);
        let (b, b_calls) = fixed("b", Outcome::Delivered);
        let (c, c_calls) = fixed("c", Outcome::Delivered);
        let dispatcher = Dispatcher::new().with(a).with(b).with(c);

        assert_eq!(dispatcher.deliver(&handoff()).await.unwrap(), Outcome::Delivered);
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_declined_stops_the_chain() {
        let (a, _) = fixed("a", Outcome::Declined);
        let (b, b_calls) = fixed("b", Outcome::Delivered);
        let dispatcher = Dispatcher::new().with(a).with(b);

        assert_eq!(dispatcher.deliver(&handoff()).await.unwrap(), Outcome::Declined);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_unsupported() {
        let (a, _) = fixed("a", Outcome::Unsupported);
        let dispatcher = Dispatcher::new().with(a);
        assert_eq!(
            dispatcher.deliver(&handoff()).await.unwrap(),
            Outcome::Unsupported
        );
        assert_eq!(
            Dispatcher::new().deliver(&handoff()).await.unwrap(),
            Outcome::Unsupported
        );
    }

    #[tokio::test]
    async fn test_deliver_propagates_errors() {
        let dispatcher = Dispatcher::new().with(Failing);
        assert!(dispatcher.deliver(&handoff()).await.is_err());
    }

    #[tokio::test]
    async fn test_share_swallows_errors() {
        let (b, b_calls) = fixed("b", Outcome::Delivered);
        let dispatcher = Dispatcher::new().with(Failing).with(b);

        assert_eq!(share(&dispatcher, &handoff()).await, Outcome::Declined);
        assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_chain_order() {
        let config = Config::default();
        let urls = Arc::new(ObjectUrls::new());
        assert_eq!(
            save_chain(&config, None, urls.clone()).names(),
            vec!["save-picker", "message-bridge", "download-link"]
        );
        assert_eq!(
            share_chain(&config, urls).names(),
            vec!["share-sheet", "download-link"]
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Delivered.to_string(), "delivered");
        assert_eq!(Outcome::Declined.to_string(), "declined");
        assert_eq!(Outcome::Unsupported.to_string(), "unsupported");
    }
}
