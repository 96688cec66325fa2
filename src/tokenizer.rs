//! Tokenization of one message's accumulated content into steps, an optional
//! interactive structure, and clean prose.

use crate::grammar::{self, StepMarker, StructureMarker, STEP_DONE_SENTINEL};
use crate::repair::{self, InteractiveStructure};
use crate::steps::{derive_step_states, Step};

/// Derived view of one message. Never persisted; recomputed from the raw
/// content on every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedMessage {
    pub steps: Vec<Step>,
    pub structure: Option<InteractiveStructure>,
    pub prose: String,
}

impl ParsedMessage {
    /// True when nothing displayable has arrived yet (placeholder state).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.structure.is_none() && self.prose.is_empty()
    }
}

/// Tokenizes the full raw content of one message.
///
/// `streaming` is true only for the message currently receiving fragments.
/// Once the structure marker appears — even before its payload is decodable —
/// everything from the marker start onward is withheld from prose.
#[must_use]
pub fn parse_message(content: &str, streaming: bool) -> ParsedMessage {
    let structure_marker = grammar::find_structure_marker(content);

    let structure = match &structure_marker {
        Some(StructureMarker::Found { payload, .. }) => repair::decode_structure(payload),
        _ => None,
    };

    let markers = grammar::find_step_markers(content);
    let steps = derive_step_states(&markers, content, streaming, structure.is_some());

    let prose_end = structure_marker
        .as_ref()
        .map_or(content.len(), StructureMarker::start);
    let prose = build_prose(&content[..prose_end], &markers);

    ParsedMessage {
        steps,
        structure,
        prose,
    }
}

fn build_prose(text: &str, markers: &[StepMarker]) -> String {
    let mut prose = String::with_capacity(text.len());
    let mut cursor = 0;

    for marker in markers {
        if marker.start >= text.len() {
            break;
        }
        prose.push_str(&text[cursor..marker.start]);
        cursor = marker.end.min(text.len());
    }
    prose.push_str(&text[cursor..]);

    prose.replace(STEP_DONE_SENTINEL, "").trim().to_string()
}
