//! Core inspection types for firecheck.
//!
//! An inspection is a titled list of sections, each holding checklist items
//! answered `ok` or `ko`. Input comes from whoever filled in the checklist
//! and is never validated: missing fields simply become empty.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::objects::DocumentRef;

/// Answer recorded for one checklist item.
///
/// Anything other than `ok` or `ko` is kept verbatim as `Unrecognized` so a
/// record round-trips exactly; it renders as non-conforming. `null` and
/// non-string values are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Status {
    /// The item conforms.
    Ok,
    /// The item does not conform.
    Ko,
    /// Some other value found in the input.
    Unrecognized(String),
}

impl Status {
    /// Whether this answer counts as conforming.
    #[must_use]
    pub fn is_conforming(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl Default for Status {
    /// A missing answer is an empty, unrecognized one.
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ok" => Self::Ok,
            "ko" => Self::Ko,
            _ => Self::Unrecognized(value),
        }
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(value) => Self::from(value),
            Value::Null => Self::default(),
            other => Self::Unrecognized(other.to_string()),
        })
    }
}

/// Read an explicit `null` as the field's empty value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => "ok".to_string(),
            Status::Ko => "ko".to_string(),
            Status::Unrecognized(value) => value,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Ko => write!(f, "ko"),
            Self::Unrecognized(value) => write!(f, "{value}"),
        }
    }
}

/// One question of the checklist and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecklistItem {
    /// The question asked.
    #[serde(deserialize_with = "null_as_default")]
    pub question: String,
    /// The recorded answer.
    pub status: Status,
    /// Free-form remark from the inspector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ChecklistItem {
    /// Create an item without a comment.
    #[must_use]
    pub fn new(question: impl Into<String>, status: impl Into<Status>) -> Self {
        Self {
            question: question.into(),
            status: status.into(),
            comment: None,
        }
    }

    /// Attach a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A titled group of checklist items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    /// Section heading.
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Items in display order.
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<ChecklistItem>,
}

impl Section {
    /// Create a section from its title and items.
    #[must_use]
    pub fn new(title: impl Into<String>, items: Vec<ChecklistItem>) -> Self {
        Self {
            title: title.into(),
            items,
        }
    }
}

/// The filled-in checklist for one inspection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionInput {
    /// Inspection title, usually the site name.
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    /// Sections in display order.
    #[serde(deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
}

impl InspectionInput {
    /// Create an inspection from its title and sections.
    #[must_use]
    pub fn new(title: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            title: title.into(),
            sections,
        }
    }

    /// Iterate over every item, section by section.
    pub fn items(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.sections.iter().flat_map(|section| section.items.iter())
    }

    /// Count conforming and non-conforming answers.
    #[must_use]
    pub fn summary(&self) -> Summary {
        let (conforming, non_conforming) = self.items().fold((0, 0), |(ok, ko), item| {
            if item.status.is_conforming() {
                (ok + 1, ko)
            } else {
                (ok, ko + 1)
            }
        });
        Summary {
            conforming,
            non_conforming,
        }
    }
}

/// Tally of answers in an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Summary {
    /// Items answered `ok`.
    pub conforming: usize,
    /// Every other item.
    pub non_conforming: usize,
}

impl Summary {
    /// Total number of items.
    #[must_use]
    pub fn total(&self) -> usize {
        self.conforming + self.non_conforming
    }
}

/// A completed inspection as kept in the history.
///
/// `document` points at the report generated in this process; it is never
/// persisted and is `None` for records loaded from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionRecord {
    /// Creation timestamp in milliseconds, unique within the store.
    pub id: i64,
    /// When the inspection was completed.
    pub date: DateTime<Utc>,
    /// The checklist as filled in.
    pub data: InspectionInput,
    /// Handle to the generated document, valid for this process only.
    #[serde(skip)]
    pub document: Option<DocumentRef>,
    /// Whether the record was created on this device.
    #[serde(default = "default_local")]
    pub local: bool,
}

fn default_local() -> bool {
    true
}

impl InspectionRecord {
    /// Create a local record.
    #[must_use]
    pub fn new(id: i64, date: DateTime<Utc>, data: InspectionInput) -> Self {
        Self {
            id,
            date,
            data,
            document: None,
            local: true,
        }
    }

    /// Attach the handle of the document generated for this record.
    #[must_use]
    pub fn with_document(mut self, document: DocumentRef) -> Self {
        self.document = Some(document);
        self
    }

    /// The inspection title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.data.title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InspectionInput {
        InspectionInput::new(
            "Entrepôt Nord",
            vec![
                Section::new(
                    "Extincteurs",
                    vec![
                        ChecklistItem::new("Extincteur visible", "ok"),
                        ChecklistItem::new("Plombage intact", "ko").with_comment("scellé cassé"),
                    ],
                ),
                Section::new("Signalisation", vec![ChecklistItem::new("Panneau", "n/a")]),
            ],
        )
    }

    #[test]
    fn test_status_from_string() {
        assert_eq!(Status::from("ok"), Status::Ok);
        assert_eq!(Status::from("ko"), Status::Ko);
        assert_eq!(
            Status::from("OK"),
            Status::Unrecognized("OK".to_string())
        );
    }

    #[test]
    fn test_status_is_conforming() {
        assert!(Status::Ok.is_conforming());
        assert!(!Status::Ko.is_conforming());
        assert!(!Status::Unrecognized("maybe".to_string()).is_conforming());
    }

    #[test]
    fn test_status_serde_keeps_unknown_values() {
        let item: ChecklistItem =
            serde_json::from_str(r#"{"question":"q","status":"partiel"}"#).unwrap();
        assert_eq!(item.status, Status::Unrecognized("partiel".to_string()));

        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains(r#""status":"partiel""#));
    }

    #[test]
    fn test_null_fields_default_to_empty() {
        let input: InspectionInput = serde_json::from_str(
            r#"{"title":null,"sections":[{"title":null,"items":[{"question":null,"status":null,"comment":null}]},{"items":null}]}"#,
        )
        .unwrap();
        assert_eq!(input.title, "");
        assert_eq!(input.sections[0].title, "");
        let item = &input.sections[0].items[0];
        assert_eq!(item.question, "");
        assert_eq!(item.status, Status::default());
        assert!(item.comment.is_none());
        assert!(input.sections[1].items.is_empty());
    }

    #[test]
    fn test_non_string_status_is_unrecognized() {
        let item: ChecklistItem =
            serde_json::from_str(r#"{"question":"Pression","status":1}"#).unwrap();
        assert_eq!(item.status, Status::Unrecognized("1".to_string()));
        assert!(!item.status.is_conforming());

        let item: ChecklistItem =
            serde_json::from_str(r#"{"question":"Pression","status":true}"#).unwrap();
        assert_eq!(item.status, Status::Unrecognized("true".to_string()));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let input: InspectionInput =
            serde_json::from_str(r#"{"sections":[{"items":[{}]}]}"#).unwrap();
        assert_eq!(input.title, "");
        assert_eq!(input.sections[0].title, "");
        let item = &input.sections[0].items[0];
        assert_eq!(item.question, "");
        assert_eq!(item.status, Status::Unrecognized(String::new()));
        assert!(!item.status.is_conforming());
        assert!(item.comment.is_none());
    }

    #[test]
    fn test_items_in_order() {
        let input = sample();
        let questions: Vec<_> = input.items().map(|i| i.question.as_str()).collect();
        assert_eq!(
            questions,
            vec!["Extincteur visible", "Plombage intact", "Panneau"]
        );
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.conforming, 1);
        assert_eq!(summary.non_conforming, 2);
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_record_serialization_skips_document() {
        let record = InspectionRecord::new(1_700_000_000_000, Utc::now(), sample())
            .with_document(DocumentRef::new("blob:firecheck/1"));

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("blob:firecheck"));

        let restored: InspectionRecord = serde_json::from_str(&json).unwrap();
        assert!(restored.document.is_none());
        assert_eq!(restored.data, record.data);
        assert_eq!(restored.id, record.id);
        assert!(restored.local);
    }
}
