//! End-to-end handling of a completed inspection.
//!
//! The order is fixed: compose the report, turn it into a blob, persist the
//! record, then hand the blob over. A record is kept even when the hand-over
//! fails or is declined.

use std::sync::Arc;

use tracing::{debug, info};

use crate::delivery::{self, Dispatcher, Handoff, Outcome};
use crate::error::Result;
use crate::inspection::{InspectionInput, InspectionRecord};
use crate::objects::{DocumentRef, ObjectUrls};
use crate::report::{self, Document, DocumentBlob, IdMinter};
use crate::storage::InspectionStore;

/// Description attached to shared reports.
const SHARE_DESCRIPTION: &str = "Rapport d'inspection APSAD R4";

/// Title used when the inspection has none.
const UNTITLED: &str = "Inspection";

/// Which rendering of the report to hand over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// The HTML document.
    #[default]
    Html,
    /// The HTML with markup stripped.
    PlainText,
}

impl ReportFormat {
    /// Convert a composed document into a blob of this format.
    #[must_use]
    pub fn blob(self, document: &Document) -> DocumentBlob {
        match self {
            Self::Html => report::to_blob(document),
            Self::PlainText => report::to_plain_text_blob(document),
        }
    }
}

/// How the report reaches the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Handover {
    /// Save chain; failures are returned.
    #[default]
    Save,
    /// Share chain; failures are logged and reported as declined.
    Share,
}

/// What happened to a completed inspection.
#[derive(Debug, Clone)]
pub struct Completed {
    /// Id of the stored record.
    pub id: i64,
    /// Handle to the report for the rest of this process.
    pub document: DocumentRef,
    /// The blob handed over.
    pub blob: Arc<DocumentBlob>,
    /// Result of the hand-over.
    pub outcome: Outcome,
}

/// Compose, persist and hand over a completed inspection.
///
/// # Errors
///
/// Returns an error if the record cannot be stored, in which case nothing is
/// handed over, or if a save strategy fails after the record was stored.
pub async fn complete_inspection(
    input: InspectionInput,
    store: &mut InspectionStore<'_>,
    minter: &mut IdMinter,
    urls: &ObjectUrls,
    dispatcher: &Dispatcher,
    format: ReportFormat,
    handover: Handover,
) -> Result<Completed> {
    let document = report::compose(&input, minter)?;
    let blob = Arc::new(format.blob(&document));
    let reference = urls.create(blob.clone())?;

    let record = InspectionRecord::new(document.id, document.generated_at, input)
        .with_document(reference.clone());
    if let Err(e) = store.append(record) {
        urls.revoke(&reference)?;
        return Err(e);
    }
    debug!("Inspection {} stored as {}", document.id, reference);

    let outcome = hand_over(dispatcher, &document, blob.clone(), handover).await?;
    info!("Inspection {} {}", document.id, outcome);
    Ok(Completed {
        id: document.id,
        document: reference,
        blob,
        outcome,
    })
}

/// Re-render a stored record exactly as it was composed.
///
/// Records loaded from storage carry no document, so the report is rebuilt
/// from the stored data with the record's own id and date.
#[must_use]
pub fn render_record(record: &InspectionRecord) -> Document {
    report::compose_at(&record.data, record.id, record.date)
}

/// Hand over the report of a stored record.
///
/// # Errors
///
/// Returns an error if a save strategy fails.
pub async fn deliver_record(
    record: &InspectionRecord,
    dispatcher: &Dispatcher,
    format: ReportFormat,
    handover: Handover,
) -> Result<Outcome> {
    let document = render_record(record);
    let blob = Arc::new(format.blob(&document));
    hand_over(dispatcher, &document, blob, handover).await
}

async fn hand_over(
    dispatcher: &Dispatcher,
    document: &Document,
    blob: Arc<DocumentBlob>,
    handover: Handover,
) -> Result<Outcome> {
    let title = if document.title.is_empty() {
        UNTITLED
    } else {
        document.title.as_str()
    };
    let handoff = Handoff::shared(blob, title, SHARE_DESCRIPTION);
    match handover {
        Handover::Save => dispatcher.deliver(&handoff).await,
        Handover::Share => Ok(delivery::share(dispatcher, &handoff).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryStrategy;
    use crate::error::Error;
    use crate::inspection::{ChecklistItem, Section};
    use crate::storage::{LocalStorage, DEFAULT_QUOTA_BYTES};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<(String, String, String)>>>,
    }

    #[async_trait::async_trait]
    impl DeliveryStrategy for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        async fn attempt(&self, handoff: &Handoff) -> Result<Outcome> {
            self.seen.lock().unwrap().push((
                handoff.blob.filename().to_string(),
                handoff.blob.mime_type().to_string(),
                handoff.title.clone(),
            ));
            Ok(Outcome::Delivered)
        }
    }

    #[derive(Debug)]
    struct Broken;

    #[async_trait::async_trait]
    impl DeliveryStrategy for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }

        async fn attempt(&self, _handoff: &Handoff) -> Result<Outcome> {
            Err(Error::delivery("broken", "disk full"))
        }
    }

    fn input() -> InspectionInput {
        InspectionInput::new(
            "Atelier",
            vec![Section::new(
                "Extincteurs",
                vec![ChecklistItem::new("Extincteur visible", "ok")],
            )],
        )
    }

    #[tokio::test]
    async fn test_complete_inspection_stores_then_delivers() {
        let storage = LocalStorage::open_in_memory(DEFAULT_QUOTA_BYTES).unwrap();
        let mut store = InspectionStore::load(&storage).unwrap();
        let mut minter = IdMinter::new();
        let urls = ObjectUrls::new();
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let dispatcher = Dispatcher::new().with(recorder);

        let completed = complete_inspection(
            input(),
            &mut store,
            &mut minter,
            &urls,
            &dispatcher,
            ReportFormat::Html,
            Handover::Save,
        )
        .await
        .unwrap();

        assert_eq!(completed.outcome, Outcome::Delivered);
        let record = store.find(completed.id).unwrap();
        assert_eq!(record.title(), "Atelier");
        assert_eq!(record.document.as_ref(), Some(&completed.document));
        assert!(urls.fetch(&completed.document).unwrap().is_some());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, format!("inspection-{}.html", completed.id));
        assert_eq!(seen[0].1, report::blob::HTML_MIME);
        assert_eq!(seen[0].2, "Atelier");
    }

    #[tokio::test]
    async fn test_plain_text_format() {
        let storage = LocalStorage::open_in_memory(DEFAULT_QUOTA_BYTES).unwrap();
        let mut store = InspectionStore::load(&storage).unwrap();
        let dispatcher = Dispatcher::new().with(Recorder::default());

        let completed = complete_inspection(
            input(),
            &mut store,
            &mut IdMinter::new(),
            &ObjectUrls::new(),
            &dispatcher,
            ReportFormat::PlainText,
            Handover::Save,
        )
        .await
        .unwrap();

        assert_eq!(completed.blob.mime_type(), report::blob::TEXT_MIME);
        let text = completed.blob.text().await;
        assert!(text.contains("Extincteur visible: ✅ Conforme"));
    }

    #[tokio::test]
    async fn test_quota_failure_hands_nothing_over() {
        let storage = LocalStorage::open_in_memory(64).unwrap();
        let mut store = InspectionStore::load(&storage).unwrap();
        let urls = ObjectUrls::new();
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let dispatcher = Dispatcher::new().with(recorder);

        let err = complete_inspection(
            input(),
            &mut store,
            &mut IdMinter::new(),
            &urls,
            &dispatcher,
            ReportFormat::Html,
            Handover::Save,
        )
        .await
        .unwrap_err();

        assert!(err.is_quota_exceeded());
        assert!(store.is_empty());
        assert!(urls.is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_failure_keeps_record() {
        let storage = LocalStorage::open_in_memory(DEFAULT_QUOTA_BYTES).unwrap();
        let mut store = InspectionStore::load(&storage).unwrap();
        let dispatcher = Dispatcher::new().with(Broken);

        let result = complete_inspection(
            input(),
            &mut store,
            &mut IdMinter::new(),
            &ObjectUrls::new(),
            &dispatcher,
            ReportFormat::Html,
            Handover::Save,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_share_failure_is_declined() {
        let storage = LocalStorage::open_in_memory(DEFAULT_QUOTA_BYTES).unwrap();
        let mut store = InspectionStore::load(&storage).unwrap();
        let dispatcher = Dispatcher::new().with(Broken);

        let completed = complete_inspection(
            input(),
            &mut store,
            &mut IdMinter::new(),
            &ObjectUrls::new(),
            &dispatcher,
            ReportFormat::Html,
            Handover::Share,
        )
        .await
        .unwrap();

        assert_eq!(completed.outcome, Outcome::Declined);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_render_record_matches_original() {
        let storage = LocalStorage::open_in_memory(DEFAULT_QUOTA_BYTES).unwrap();
        let mut store = InspectionStore::load(&storage).unwrap();
        let urls = ObjectUrls::new();
        let dispatcher = Dispatcher::new().with(Recorder::default());

        let completed = complete_inspection(
            input(),
            &mut store,
            &mut IdMinter::new(),
            &urls,
            &dispatcher,
            ReportFormat::Html,
            Handover::Save,
        )
        .await
        .unwrap();
        drop(store);

        let reloaded = InspectionStore::load(&storage).unwrap();
        let record = reloaded.find(completed.id).unwrap();
        assert!(record.document.is_none());

        let rendered = render_record(record);
        assert_eq!(rendered.markup.as_bytes(), completed.blob.bytes());
    }

    #[tokio::test]
    async fn test_deliver_record_untitled() {
        let record = InspectionRecord::new(1, chrono::Utc::now(), InspectionInput::default());
        let recorder = Recorder::default();
        let seen = recorder.seen.clone();
        let dispatcher = Dispatcher::new().with(recorder);

        let outcome = deliver_record(&record, &dispatcher, ReportFormat::Html, Handover::Share)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Delivered);
        assert_eq!(seen.lock().unwrap()[0].2, UNTITLED);
    }
}
