//! Completion-state derivation for progress markers.

use crate::grammar::{StepMarker, STEP_DONE_SENTINEL};

/// A named response phase and whether it has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub done: bool,
}

/// Derives a completion flag for each marker.
///
/// The span checked for the completion sentinel runs from a marker's start to
/// the next marker's start (or end of content). Rules, in order:
///
/// - every marker before the last is done — a later marker's presence proves
///   it finished;
/// - the last marker is done when the sentinel appears in its span;
/// - a message that is no longer streaming has every step done, sentinel or
///   not;
/// - while streaming, if a decoded structure exists and the last marker names
///   the planning phase, that step is held open even when the sentinel
///   matched — the question form must actually become usable downstream
///   before planning counts as finished.
///
/// `markers` must be ordered as found in `content`.
#[must_use]
pub fn derive_step_states(
    markers: &[StepMarker],
    content: &str,
    streaming: bool,
    has_structure: bool,
) -> Vec<Step> {
    let count = markers.len();

    markers
        .iter()
        .enumerate()
        .map(|(index, marker)| {
            let last = index + 1 == count;
            let span_end = markers
                .get(index + 1)
                .map_or(content.len(), |next| next.start);
            let span = &content[marker.start..span_end];

            let done = if !streaming {
                true
            } else if last && has_structure && is_planning_step(&marker.name) {
                false
            } else {
                !last || span.contains(STEP_DONE_SENTINEL)
            };

            Step {
                name: marker.name.clone(),
                done,
            }
        })
        .collect()
}

fn is_planning_step(name: &str) -> bool {
    name.to_uppercase().contains("PLANNING")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::find_step_markers;

    fn derive(content: &str, streaming: bool, has_structure: bool) -> Vec<Step> {
        derive_step_states(&find_step_markers(content), content, streaming, has_structure)
    }

    #[test]
    fn earlier_markers_are_done_because_a_later_marker_follows() {
        let steps = derive("[STEP: A] one [STEP: B] two [STEP: C] three", true, false);

        assert_eq!(
            steps.iter().map(|step| step.done).collect::<Vec<_>>(),
            vec![true, true, false]
        );
    }

    #[test]
    fn last_marker_finishes_on_the_sentinel_phrase() {
        let content = format!("[STEP: A] narrative {STEP_DONE_SENTINEL}");

        let steps = derive(&content, true, false);

        assert_eq!(steps, vec![Step { name: "A".to_string(), done: true }]);
    }

    #[test]
    fn sentinel_in_an_earlier_span_does_not_finish_the_last_marker() {
        let content = format!("[STEP: A] {STEP_DONE_SENTINEL} [STEP: B] working");

        let steps = derive(&content, true, false);

        assert_eq!(
            steps.iter().map(|step| step.done).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[test]
    fn finished_message_marks_every_step_done() {
        let steps = derive("[STEP: A] one [STEP: B] two [STEP: C] unfinished", false, false);

        assert!(steps.iter().all(|step| step.done));
    }

    #[test]
    fn planning_step_is_held_open_while_structure_is_present() {
        let content = format!("[STEP: PLANNING] {STEP_DONE_SENTINEL}");

        let steps = derive(&content, true, true);

        assert_eq!(steps.len(), 1);
        assert!(!steps[0].done, "planning stays open until the form is usable");
    }

    #[test]
    fn planning_hold_applies_to_the_last_step_only() {
        let content = "[STEP: PLANNING] done [STEP: BUILD] working";

        let steps = derive(content, true, true);

        assert!(steps[0].done, "an earlier planning step is proven done");
        assert!(!steps[1].done);
    }

    #[test]
    fn planning_hold_does_not_apply_once_streaming_ends() {
        let steps = derive("[STEP: PLANNING] pending", false, true);

        assert_eq!(steps, vec![Step { name: "PLANNING".to_string(), done: true }]);
    }
}
