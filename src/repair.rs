//! Best-effort decoding of a possibly-truncated structure payload.
//!
//! While the message is still streaming, the payload is expected to be
//! undecodable most of the time; `None` is the routine answer, not a fault.
//! The caller simply retries on the next content change.

use serde::{Deserialize, Serialize};

/// Interactive question form carried by the structured-payload marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveStructure {
    pub title: String,
    pub categories: Vec<Category>,
}

/// One question category: a prompt, its preset options, and whether a
/// free-form answer is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub options: Vec<String>,
    pub allow_other: bool,
}

/// Decodes `payload` into a validated [`InteractiveStructure`].
///
/// Strict decode first; on failure the unmatched `{` and `[` counts are
/// closed out (braces before brackets) and the decode retried once. The
/// balance scan is a plain character count and is not aware of string
/// quoting: a quoted value containing literal `{`, `}`, `[` or `]` can defeat
/// the repair. That limitation is inherited deliberately — see the crate
/// tests pinning it.
///
/// Typed decoding doubles as shape validation: a payload that parses as
/// generic JSON but not as the expected shape is also `None`, because later
/// fragments may still complete it.
#[must_use]
pub fn decode_structure(payload: &str) -> Option<InteractiveStructure> {
    if let Ok(structure) = serde_json::from_str(payload) {
        return Some(structure);
    }

    serde_json::from_str(&close_unbalanced_delimiters(payload)).ok()
}

fn close_unbalanced_delimiters(payload: &str) -> String {
    let mut open_braces = 0usize;
    let mut close_braces = 0usize;
    let mut open_brackets = 0usize;
    let mut close_brackets = 0usize;

    for ch in payload.chars() {
        match ch {
            '{' => open_braces += 1,
            '}' => close_braces += 1,
            '[' => open_brackets += 1,
            ']' => close_brackets += 1,
            _ => {}
        }
    }

    let brace_deficit = open_braces.saturating_sub(close_braces);
    let bracket_deficit = open_brackets.saturating_sub(close_brackets);

    let mut repaired = String::with_capacity(payload.len() + brace_deficit + bracket_deficit);
    repaired.push_str(payload);
    for _ in 0..brace_deficit {
        repaired.push('}');
    }
    for _ in 0..bracket_deficit {
        repaired.push(']');
    }

    repaired
}
