//! Conversion of composed reports into transferable binary objects.

use std::sync::OnceLock;

use regex::Regex;

use super::Document;

/// MIME type of the HTML report.
pub const HTML_MIME: &str = "text/html; charset=utf-8";

/// MIME type of the plain-text rendering.
pub const TEXT_MIME: &str = "text/plain; charset=utf-8";

/// Bytes plus the metadata needed to hand them to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentBlob {
    bytes: Vec<u8>,
    mime_type: String,
    filename: String,
}

impl DocumentBlob {
    /// Create a blob from raw bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }

    /// The payload.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Suggested filename.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Payload size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Decode the payload as text, replacing invalid UTF-8.
    pub async fn text(&self) -> String {
        let bytes = self.bytes.clone();
        tokio::task::spawn_blocking(move || String::from_utf8_lossy(&bytes).into_owned())
            .await
            .unwrap_or_default()
    }
}

/// Wrap the report markup untouched, labelled as HTML.
#[must_use]
pub fn to_blob(document: &Document) -> DocumentBlob {
    DocumentBlob::new(
        document.markup.clone().into_bytes(),
        HTML_MIME,
        format!("{}.html", document.file_stem()),
    )
}

/// Strip the markup and wrap the remaining text, labelled as plain text.
#[must_use]
pub fn to_plain_text_blob(document: &Document) -> DocumentBlob {
    DocumentBlob::new(
        strip_markup(&document.markup).into_bytes(),
        TEXT_MIME,
        format!("{}.txt", document.file_stem()),
    )
}

/// Remove tags and the document head, decode entities, drop blank lines.
#[must_use]
pub fn strip_markup(markup: &str) -> String {
    static HEAD: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();

    let head = HEAD.get_or_init(|| Regex::new(r"(?is)<head>.*?</head>").expect("valid regex"));
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    let without_head = head.replace_all(markup, "");
    let text = tag.replace_all(&without_head, "");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(decode_entities)
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(line: &str) -> String {
    line.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::{ChecklistItem, InspectionInput, Section};
    use crate::report::compose_at;
    use chrono::Utc;

    fn document() -> Document {
        let input = InspectionInput::new(
            "Dépôt & Co",
            vec![Section::new(
                "Extincteurs",
                vec![ChecklistItem::new("Extincteur visible", "ok").with_comment("RAS")],
            )],
        );
        compose_at(&input, 1_700_000_000_000, Utc::now())
    }

    #[test]
    fn test_to_blob_keeps_markup() {
        let doc = document();
        let blob = to_blob(&doc);
        assert_eq!(blob.bytes(), doc.markup.as_bytes());
        assert_eq!(blob.mime_type(), HTML_MIME);
        assert_eq!(blob.filename(), "inspection-1700000000000.html");
        assert_eq!(blob.len(), doc.markup.len());
    }

    #[test]
    fn test_plain_text_blob() {
        let blob = to_plain_text_blob(&document());
        let text = String::from_utf8(blob.bytes().to_vec()).unwrap();

        assert_eq!(blob.mime_type(), TEXT_MIME);
        assert_eq!(blob.filename(), "inspection-1700000000000.txt");
        assert!(!text.contains('<'));
        assert!(!text.contains("font-family"));
        assert!(text.starts_with("Dépôt & Co"));
        assert!(text.contains("Extincteurs\nExtincteur visible: ✅ Conforme\nCommentaire : RAS"));
    }

    #[test]
    fn test_strip_markup_decodes_entities_once() {
        assert_eq!(strip_markup("<p>&amp;lt;</p>"), "&lt;");
        assert_eq!(strip_markup("<p>a &lt; b</p>"), "a < b");
    }

    #[tokio::test]
    async fn test_text_decoding_is_lossy() {
        let blob = DocumentBlob::new(vec![b'o', b'k', 0xff], TEXT_MIME, "x.txt");
        assert_eq!(blob.text().await, "ok\u{fffd}");
    }

    #[test]
    fn test_empty_blob() {
        let blob = DocumentBlob::new(Vec::new(), TEXT_MIME, "empty.txt");
        assert!(blob.is_empty());
    }
}
