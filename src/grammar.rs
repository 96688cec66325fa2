//! Marker grammar: locating progress and structured-payload markers in raw
//! message text.
//!
//! Both markers are single-line start tokens that may appear anywhere in
//! prose. Offsets returned here are byte offsets into the scanned text and
//! always fall on character boundaries.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading token of the structured-payload marker. The payload begins at the
/// first `{` that follows it.
pub const STRUCTURE_MARKER_KEYWORD: &str = "[INTERACTIVE_STRUCTURE:";

/// Exact phrase the service appends after a step's narrative to mark it
/// finished.
pub const STEP_DONE_SENTINEL: &str = "ধাপ সম্পন্ন";

static STEP_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[STEP:\s*([^\]]*)\]").expect("step marker pattern is valid"));

/// One `[STEP: <name>]` occurrence. `start..end` spans the whole marker
/// including brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepMarker {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Returns every progress marker in `text`, left to right.
///
/// `<name>` is any text not containing `]`; surrounding whitespace is
/// trimmed.
#[must_use]
pub fn find_step_markers(text: &str) -> Vec<StepMarker> {
    STEP_MARKER
        .captures_iter(text)
        .map(|captures| {
            let whole = captures.get(0).expect("capture 0 is the whole match");
            let name = captures
                .get(1)
                .map(|name| name.as_str().trim().to_string())
                .unwrap_or_default();

            StepMarker {
                name,
                start: whole.start(),
                end: whole.end(),
            }
        })
        .collect()
}

/// Location of the first structured-payload marker in a message.
///
/// `Pending` means the marker keyword has streamed in but the opening `{` has
/// not — callers must distinguish "no structure" from "structure not yet
/// available" to hide trailing marker text from prose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructureMarker<'a> {
    Pending { start: usize },
    Found { start: usize, payload: &'a str },
}

impl StructureMarker<'_> {
    /// Byte offset of the marker keyword; prose processing truncates here.
    #[must_use]
    pub fn start(&self) -> usize {
        match self {
            Self::Pending { start } | Self::Found { start, .. } => *start,
        }
    }
}

/// Finds the first structured-payload marker in `text`.
///
/// The payload substring runs from the first `{` after the keyword to the
/// last `]` at or after that `{` (exclusive), or to the end of text when no
/// closing `]` has arrived yet. Taking the last `]` rather than the first
/// tolerates `]` inside the payload's own arrays; the tag terminator is
/// expected to be the final `]` of the message.
#[must_use]
pub fn find_structure_marker(text: &str) -> Option<StructureMarker<'_>> {
    let start = text.find(STRUCTURE_MARKER_KEYWORD)?;
    let keyword_end = start + STRUCTURE_MARKER_KEYWORD.len();

    let payload_start = match text[keyword_end..].find('{') {
        Some(offset) => keyword_end + offset,
        None => return Some(StructureMarker::Pending { start }),
    };

    let payload = match text[payload_start..].rfind(']') {
        Some(offset) => &text[payload_start..payload_start + offset],
        None => &text[payload_start..],
    };

    Some(StructureMarker::Found { start, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_markers_are_returned_in_order_with_spans() {
        let text = "[STEP: PLANNING]\nthinking\n[STEP: ANALYSIS]done";

        let markers = find_step_markers(text);

        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].name, "PLANNING");
        assert_eq!(markers[0].start, 0);
        assert_eq!(&text[markers[0].start..markers[0].end], "[STEP: PLANNING]");
        assert_eq!(markers[1].name, "ANALYSIS");
        assert!(markers[0].end < markers[1].start);
    }

    #[test]
    fn step_marker_name_is_free_text_without_closing_bracket() {
        let markers = find_step_markers("[STEP:   ডেটা সংগ্রহ  ]");

        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "ডেটা সংগ্রহ");
    }

    #[test]
    fn text_without_markers_yields_nothing() {
        assert!(find_step_markers("plain prose with [brackets]").is_empty());
        assert!(find_structure_marker("plain prose").is_none());
    }

    #[test]
    fn structure_marker_without_brace_is_pending() {
        let text = "intro [INTERACTIVE_STRUCTURE:";

        assert_eq!(
            find_structure_marker(text),
            Some(StructureMarker::Pending { start: 6 })
        );
    }

    #[test]
    fn structure_payload_runs_to_last_closing_bracket() {
        let text = r#"[INTERACTIVE_STRUCTURE: {"title":"t","categories":[{"options":["a","b"]}]}]"#;

        let Some(StructureMarker::Found { payload, .. }) = find_structure_marker(text) else {
            panic!("structure marker must be found");
        };

        assert_eq!(
            payload,
            r#"{"title":"t","categories":[{"options":["a","b"]}]}"#
        );
    }

    #[test]
    fn unterminated_payload_runs_to_end_of_text() {
        let text = r#"[STEP: PLANNING] [INTERACTIVE_STRUCTURE: {"title":"আপনার"#;

        let Some(StructureMarker::Found { payload, .. }) = find_structure_marker(text) else {
            panic!("structure marker must be found");
        };

        // The `]` of the earlier step marker sits before the payload and must
        // not terminate it.
        assert_eq!(payload, r#"{"title":"আপনার"#);
    }

    #[test]
    fn only_the_first_structure_marker_is_reported() {
        let text = "[INTERACTIVE_STRUCTURE: {}] trailing [INTERACTIVE_STRUCTURE: {}]";

        assert_eq!(find_structure_marker(text).map(|marker| marker.start()), Some(0));
    }
}
