//! Streaming marker-protocol interpreter for model-authored chat transcripts.
//!
//! A generation service is instructed to embed two inline control markers in
//! otherwise free-form prose:
//!
//! - `[STEP: <name>]` — a progress marker naming a phase of the response.
//! - `[INTERACTIVE_STRUCTURE: <payload>]` — at most one per message,
//!   introducing a JSON object that describes an interactive question form.
//!
//! Because the transcript arrives token-by-token, both markers routinely show
//! up truncated. This crate re-tokenizes the full accumulated content of one
//! message on every change: it separates prose from markers, best-effort
//! repairs an incomplete structure payload, and derives a completion flag for
//! each progress marker. Everything here is a pure function of
//! `(content, is_streaming)` — no caching, no I/O.

pub mod grammar;
pub mod repair;
pub mod steps;
pub mod tokenizer;

pub use grammar::{
    find_step_markers, find_structure_marker, StepMarker, StructureMarker, STEP_DONE_SENTINEL,
    STRUCTURE_MARKER_KEYWORD,
};
pub use repair::{decode_structure, Category, InteractiveStructure};
pub use steps::{derive_step_states, Step};
pub use tokenizer::{parse_message, ParsedMessage};
