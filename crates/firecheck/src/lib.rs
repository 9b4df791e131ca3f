//! `firecheck` - Offline APSAD R4 fire-safety inspections
//!
//! This library composes inspection reports, keeps the inspection history in
//! on-device storage, gates pages behind a local session and hands reports
//! over to the user through whichever delivery mechanism the environment
//! supports.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod checklist;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod inspection;
pub mod logging;
pub mod objects;
pub mod precache;
pub mod report;
pub mod session;
pub mod storage;
pub mod workflow;

pub use config::Config;
pub use delivery::{Dispatcher, Outcome};
pub use error::{Error, Result};
pub use inspection::{ChecklistItem, InspectionInput, InspectionRecord, Section, Status};
pub use logging::init_logging;
pub use objects::{DocumentRef, ObjectUrls};
pub use report::{compose, Document, DocumentBlob, IdMinter};
pub use storage::{InspectionStore, LocalStorage, StorageStats};
