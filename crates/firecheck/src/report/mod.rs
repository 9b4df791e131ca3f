//! Report generation for completed inspections.
//!
//! [`compose`] turns an [`InspectionInput`] into a single self-contained HTML
//! document; [`blob`] converts that document into a transferable
//! [`DocumentBlob`]. Composition never fails: empty fields render as empty
//! text and unknown statuses render as non-conforming.

pub mod blob;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::inspection::{ChecklistItem, InspectionInput, Status};

pub use blob::{to_blob, to_plain_text_blob, DocumentBlob};

/// Marker rendered for a conforming item.
pub const CONFORMING_MARKER: &str = "✅ Conforme";

/// Marker rendered for every other item.
pub const NON_CONFORMING_MARKER: &str = "❌ Non conforme";

/// Date format used in report headers.
const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Conformity marker for an answer.
#[must_use]
pub fn marker(status: &Status) -> &'static str {
    if status.is_conforming() {
        CONFORMING_MARKER
    } else {
        NON_CONFORMING_MARKER
    }
}

/// Mints record ids from the wall clock.
///
/// Ids are millisecond timestamps; two mints within the same millisecond
/// yield consecutive values instead of a collision.
#[derive(Debug, Clone, Default)]
pub struct IdMinter {
    last: i64,
}

impl IdMinter {
    /// Create a minter with no history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minter that never returns an id at or below `last`.
    #[must_use]
    pub fn starting_after(last: i64) -> Self {
        Self { last }
    }

    /// Mint an id for the given instant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdsExhausted`] once the last id is `i64::MAX`.
    pub fn mint_at(&mut self, now: DateTime<Utc>) -> Result<i64> {
        let next = self
            .last
            .checked_add(1)
            .ok_or(Error::IdsExhausted { last: self.last })?;
        let id = now.timestamp_millis().max(next);
        self.last = id;
        Ok(id)
    }

    /// Mint an id for the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdsExhausted`] once the last id is `i64::MAX`.
    pub fn mint(&mut self) -> Result<i64> {
        self.mint_at(Utc::now())
    }
}

/// A composed inspection report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Id shared with the inspection record.
    pub id: i64,
    /// Report title.
    pub title: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// The full HTML markup.
    pub markup: String,
    /// BLAKE3 hash of the markup.
    pub content_hash: String,
}

impl Document {
    /// Suggested file stem for saving this report.
    #[must_use]
    pub fn file_stem(&self) -> String {
        format!("inspection-{}", self.id)
    }
}

/// Compose a report for `input`, minting a fresh id.
///
/// # Errors
///
/// Returns an error if no id can be minted.
pub fn compose(input: &InspectionInput, minter: &mut IdMinter) -> Result<Document> {
    let now = Utc::now();
    let id = minter.mint_at(now)?;
    Ok(compose_at(input, id, now))
}

/// Compose a report with an explicit id and generation time.
#[must_use]
pub fn compose_at(input: &InspectionInput, id: i64, generated_at: DateTime<Utc>) -> Document {
    let markup = render_html(input, generated_at);
    let content_hash = blake3::hash(markup.as_bytes()).to_hex().to_string();
    Document {
        id,
        title: input.title.clone(),
        generated_at,
        markup,
        content_hash,
    }
}

fn render_html(input: &InspectionInput, generated_at: DateTime<Utc>) -> String {
    let title = escape_html(&input.title);
    let summary = input.summary();
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    html.push_str(&format!(
        "<p class=\"meta\">Date : {}</p>\n",
        generated_at.format(DATE_FORMAT)
    ));
    html.push_str(&format!(
        "<p class=\"meta\">{} conforme(s) / {} non conforme(s)</p>\n",
        summary.conforming, summary.non_conforming
    ));
    html.push_str("</header>\n");

    for section in &input.sections {
        html.push_str("<section>\n");
        html.push_str(&format!("<h2>{}</h2>\n<ul>\n", escape_html(&section.title)));
        for item in &section.items {
            render_item(&mut html, item);
        }
        html.push_str("</ul>\n</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_item(html: &mut String, item: &ChecklistItem) {
    let class = if item.status.is_conforming() { "ok" } else { "ko" };
    html.push_str(&format!(
        "<li class=\"item {class}\">{}: {}</li>\n",
        escape_html(&item.question),
        marker(&item.status)
    ));
    if let Some(comment) = item.comment.as_deref().filter(|c| !c.is_empty()) {
        html.push_str(&format!(
            "<p class=\"comment\">Commentaire : {}</p>\n",
            escape_html(comment)
        ));
    }
}

/// Escape text for interpolation into HTML.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Stylesheet embedded in every report, also served from the asset cache.
const CSS: &str = include_str!("../../assets/report.css");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::Section;
    use chrono::TimeZone;

    fn input() -> InspectionInput {
        InspectionInput::new(
            "Site <A>",
            vec![
                Section::new(
                    "Extincteurs",
                    vec![
                        ChecklistItem::new("Extincteur visible", "ok"),
                        ChecklistItem::new("Pression correcte", "ko").with_comment("à recharger"),
                    ],
                ),
                Section::new(
                    "RIA",
                    vec![ChecklistItem::new("Robinet accessible", "peut-être")],
                ),
            ],
        )
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_marker() {
        assert_eq!(marker(&Status::Ok), CONFORMING_MARKER);
        assert_eq!(marker(&Status::Ko), NON_CONFORMING_MARKER);
        assert_eq!(
            marker(&Status::Unrecognized("weird".to_string())),
            NON_CONFORMING_MARKER
        );
        assert_eq!(marker(&Status::default()), NON_CONFORMING_MARKER);
    }

    #[test]
    fn test_one_line_per_item_in_order() {
        let doc = compose_at(&input(), 1, at());
        let lines: Vec<&str> = doc
            .markup
            .lines()
            .filter(|l| l.starts_with("<li class=\"item"))
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("Extincteur visible: ✅ Conforme"));
        assert!(lines[1].contains("Pression correcte: ❌ Non conforme"));
        assert!(lines[2].contains("Robinet accessible: ❌ Non conforme"));
    }

    #[test]
    fn test_sections_precede_their_items() {
        let doc = compose_at(&input(), 1, at());
        let extincteurs = doc.markup.find("<h2>Extincteurs</h2>").unwrap();
        let ria = doc.markup.find("<h2>RIA</h2>").unwrap();
        let visible = doc.markup.find("Extincteur visible").unwrap();
        let robinet = doc.markup.find("Robinet accessible").unwrap();
        assert!(extincteurs < visible);
        assert!(visible < ria);
        assert!(ria < robinet);
    }

    #[test]
    fn test_comment_line() {
        let doc = compose_at(&input(), 1, at());
        assert!(doc
            .markup
            .contains("<p class=\"comment\">Commentaire : à recharger</p>"));
        assert_eq!(doc.markup.matches("class=\"comment\"").count(), 1);
    }

    #[test]
    fn test_header_title_and_date() {
        let doc = compose_at(&input(), 1, at());
        assert!(doc.markup.contains("<h1>Site &lt;A&gt;</h1>"));
        assert!(doc.markup.contains("Date : 14/03/2026 09:30"));
        assert!(doc.markup.contains("1 conforme(s) / 2 non conforme(s)"));
        assert_eq!(doc.title, "Site <A>");
    }

    #[test]
    fn test_empty_input_renders() {
        let doc = compose_at(&InspectionInput::default(), 5, at());
        assert!(doc.markup.contains("<h1></h1>"));
        assert!(!doc.markup.contains("<li"));
    }

    #[test]
    fn test_content_hash_tracks_markup() {
        let a = compose_at(&input(), 1, at());
        let b = compose_at(&input(), 2, at());
        assert_eq!(a.content_hash, b.content_hash);

        let c = compose_at(&InspectionInput::default(), 1, at());
        assert_ne!(a.content_hash, c.content_hash);
    }

    #[test]
    fn test_id_minter_is_monotonic() {
        let mut minter = IdMinter::new();
        let first = minter.mint_at(at()).unwrap();
        let second = minter.mint_at(at()).unwrap();
        assert_eq!(first, at().timestamp_millis());
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_id_minter_starting_after() {
        let future = at().timestamp_millis() + 10_000;
        let mut minter = IdMinter::starting_after(future);
        assert_eq!(minter.mint_at(at()).unwrap(), future + 1);
    }

    #[test]
    fn test_id_minter_exhausted() {
        let mut minter = IdMinter::starting_after(i64::MAX);
        let err = minter.mint().unwrap_err();
        assert!(matches!(err, Error::IdsExhausted { last: i64::MAX }));
        assert!(compose(&input(), &mut minter).is_err());

        let mut minter = IdMinter::starting_after(i64::MAX - 1);
        assert_eq!(minter.mint_at(at()).unwrap(), i64::MAX);
        assert!(minter.mint_at(at()).is_err());
    }

    #[test]
    fn test_compose_mints_id() {
        let mut minter = IdMinter::new();
        let a = compose(&input(), &mut minter).unwrap();
        let b = compose(&input(), &mut minter).unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.file_stem(), format!("inspection-{}", a.id));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("\"x\" 'y'"), "&quot;x&quot; &#x27;y&#x27;");
    }
}
