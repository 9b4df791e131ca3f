//! Inspection history kept in local storage.
//!
//! The whole history is one JSON array under [`INSPECTIONS_KEY`]. It is read
//! once when the store is loaded and rewritten in full after every append.
//! Entries that fail to parse are moved under [`QUARANTINE_KEY`] instead of
//! taking the rest of the history down with them.

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::inspection::InspectionRecord;
use crate::objects::DocumentRef;

use super::LocalStorage;

/// Storage key holding the inspection history.
pub const INSPECTIONS_KEY: &str = "inspections";

/// Storage key holding entries that could not be read back.
pub const QUARANTINE_KEY: &str = "inspections.quarantine";

/// The inspection history.
///
/// Construct one per process with [`InspectionStore::load`] and pass it to
/// whatever needs to read or extend the history.
#[derive(Debug)]
pub struct InspectionStore<'s> {
    storage: &'s LocalStorage,
    records: Vec<InspectionRecord>,
}

impl<'s> InspectionStore<'s> {
    /// Load the history from storage.
    ///
    /// Absent or unreadable history yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error only if the storage itself cannot be read.
    pub fn load(storage: &'s LocalStorage) -> Result<Self> {
        let records = match storage.get_item(INSPECTIONS_KEY)? {
            None => Vec::new(),
            Some(raw) => Self::parse(storage, &raw),
        };
        debug!("Loaded {} inspections", records.len());
        Ok(Self { storage, records })
    }

    fn parse(storage: &LocalStorage, raw: &str) -> Vec<InspectionRecord> {
        let entries = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(entries)) => entries,
            _ => {
                warn!("Stored inspection history is unreadable, starting empty");
                // Clear the key first so the same text is never quarantined twice.
                if let Err(e) = storage.remove_item(INSPECTIONS_KEY) {
                    warn!("Could not clear inspection history: {}", e);
                }
                quarantine(storage, vec![Value::String(raw.to_string())]);
                return Vec::new();
            }
        };

        let mut records: Vec<InspectionRecord> = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();
        for entry in entries {
            match serde_json::from_value::<InspectionRecord>(entry.clone()) {
                Ok(record) if records.iter().all(|r| r.id != record.id) => records.push(record),
                Ok(record) => {
                    warn!("Duplicate inspection id {} in storage", record.id);
                    rejected.push(entry);
                }
                Err(e) => {
                    warn!("Malformed inspection entry: {}", e);
                    rejected.push(entry);
                }
            }
        }

        if !rejected.is_empty() {
            // Rewrite before quarantining: the shorter history frees quota.
            match serde_json::to_string(&records) {
                Ok(text) => {
                    if let Err(e) = storage.set_item(INSPECTIONS_KEY, &text) {
                        warn!("Could not rewrite inspection history: {}", e);
                    }
                }
                Err(e) => warn!("Could not serialize inspection history: {}", e),
            }
            quarantine(storage, rejected);
        }
        records
    }

    /// Append a record and persist the whole history.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateRecord`] if the id is taken, and
    /// propagates storage failures such as [`Error::QuotaExceeded`]. On any
    /// error the record is not kept in memory either.
    pub fn append(&mut self, record: InspectionRecord) -> Result<()> {
        if self.find(record.id).is_some() {
            return Err(Error::DuplicateRecord(record.id));
        }

        let id = record.id;
        self.records.push(record);
        if let Err(e) = self.persist() {
            self.records.pop();
            return Err(e);
        }
        info!("Saved inspection {}", id);
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let text = serde_json::to_string(&self.records)?;
        self.storage.set_item(INSPECTIONS_KEY, &text)
    }

    /// Find a record by id.
    #[must_use]
    pub fn find(&self, id: i64) -> Option<&InspectionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// All records in insertion order.
    #[must_use]
    pub fn list(&self) -> &[InspectionRecord] {
        &self.records
    }

    /// Point a record at a document generated in this process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordNotFound`] if no record has this id.
    pub fn attach_document(&mut self, id: i64, document: DocumentRef) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(Error::RecordNotFound(id))?;
        record.document = Some(document);
        Ok(())
    }

    /// Highest id in the history, for seeding an id minter.
    #[must_use]
    pub fn last_id(&self) -> Option<i64> {
        self.records.iter().map(|record| record.id).max()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Add entries to the quarantine list. Failures are logged and ignored.
fn quarantine(storage: &LocalStorage, entries: Vec<Value>) {
    let mut held = match storage.get_item(QUARANTINE_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(held)) => held,
            _ => Vec::new(),
        },
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Could not read quarantine: {}", e);
            return;
        }
    };

    let now = Utc::now().to_rfc3339();
    let count = entries.len();
    held.extend(
        entries
            .into_iter()
            .map(|entry| json!({ "quarantined_at": now, "entry": entry })),
    );

    let result = serde_json::to_string(&held)
        .map_err(Error::from)
        .and_then(|text| storage.set_item(QUARANTINE_KEY, &text));
    match result {
        Ok(()) => warn!("Quarantined {} inspection entries", count),
        Err(e) => warn!("Could not quarantine {} entries: {}", count, e),
    }
}
