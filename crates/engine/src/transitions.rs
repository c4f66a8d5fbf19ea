//! Stage transition predicates.
//!
//! Progression is strictly forward, one stage at a time. Submissions may
//! target the current stage or revisit an earlier one, never a later one.

use ddrgate_core::{Session, Stage};

/// A transition is valid only from a stage to its immediate successor.
pub fn is_valid_transition(from: Stage, to: Stage) -> bool {
    from.next() == Some(to)
}

/// The stage after `stage`, or `None` at the last stage.
pub fn next_stage(stage: Stage) -> Option<Stage> {
    stage.next()
}

/// Artifacts may be submitted to the current stage or any earlier one.
pub fn can_submit_to_stage(session: &Session, stage: Stage) -> bool {
    stage.position() <= session.stage.position()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn session_at(stage: Stage) -> Session {
        let mut session = Session::new(
            "s",
            "meta",
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        );
        session.stage = stage;
        session
    }

    #[test]
    fn only_adjacent_forward_moves_are_valid() {
        assert!(is_valid_transition(Stage::Framing, Stage::Inputs));
        assert!(is_valid_transition(Stage::Rules, Stage::SimulationFinalization));
        assert!(!is_valid_transition(Stage::Framing, Stage::Outputs));
        assert!(!is_valid_transition(Stage::Inputs, Stage::Framing));
        assert!(!is_valid_transition(Stage::Inputs, Stage::Inputs));
    }

    #[test]
    fn every_valid_transition_advances_one_position() {
        for from in Stage::ALL {
            for to in Stage::ALL {
                if is_valid_transition(from, to) {
                    assert_eq!(to.position(), from.position() + 1);
                }
            }
        }
    }

    #[test]
    fn last_stage_has_no_successor() {
        assert_eq!(next_stage(Stage::SimulationFinalization), None);
        assert_eq!(next_stage(Stage::Policies), Some(Stage::Rules));
    }

    #[test]
    fn submission_allowed_at_or_before_pointer() {
        let session = session_at(Stage::Outputs);
        assert!(can_submit_to_stage(&session, Stage::Framing));
        assert!(can_submit_to_stage(&session, Stage::Outputs));
        assert!(!can_submit_to_stage(&session, Stage::Policies));
    }
}
