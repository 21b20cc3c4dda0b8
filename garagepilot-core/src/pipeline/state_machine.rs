use std::fmt;

use crate::error::{ShopError, ShopResult};
use crate::models::{AppointmentState, WorkOrderState};

/// Trait for the transition tables of a record lifecycle.
///
/// Staying in the current state is always allowed and is a no-op.
pub trait Transition {
    type State: Copy + PartialEq + fmt::Display;

    /// Entity name reported in `InvalidTransition` errors.
    const ENTITY: &'static str;

    /// Whether `from -> to` is a legal edge (`from != to`).
    fn allowed(from: Self::State, to: Self::State) -> bool;

    /// State of a freshly created record.
    fn initial_state() -> Self::State;

    fn check(from: Self::State, to: Self::State) -> ShopResult<()> {
        if from == to || Self::allowed(from, to) {
            Ok(())
        } else {
            Err(ShopError::InvalidTransition {
                entity: Self::ENTITY,
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

/// Appointment edges reachable through a plain edit:
/// - Waiting -> Cancelled
/// - Cancelled -> Waiting (reopen)
///
/// Waiting -> Accepted only happens through mechanic assignment, and an
/// accepted appointment can no longer change state by edit.
pub struct AppointmentTransitions;

impl AppointmentTransitions {
    /// States from which a mechanic may be (re)assigned.
    pub fn assignable(state: AppointmentState) -> bool {
        matches!(state, AppointmentState::Waiting | AppointmentState::Accepted)
    }
}

impl Transition for AppointmentTransitions {
    type State = AppointmentState;

    const ENTITY: &'static str = "appointment";

    fn allowed(from: AppointmentState, to: AppointmentState) -> bool {
        use AppointmentState::*;
        match (from, to) {
            (Waiting, Cancelled) | (Cancelled, Waiting) => true,
            (Waiting, Accepted) => false,
            (Accepted, _) => false,
            (Cancelled, Accepted) => false,
            (Waiting, Waiting) | (Cancelled, Cancelled) => true,
        }
    }

    fn initial_state() -> AppointmentState {
        AppointmentState::Waiting
    }
}

/// Work order edges. Every state can reach every other one: a finished or
/// cancelled job can be reopened to InProgress, and a pending job can be
/// closed directly.
pub struct WorkOrderTransitions;

impl Transition for WorkOrderTransitions {
    type State = WorkOrderState;

    const ENTITY: &'static str = "work order";

    fn allowed(from: WorkOrderState, to: WorkOrderState) -> bool {
        use WorkOrderState::*;
        match (from, to) {
            (Pending, InProgress | Finished | Cancelled) => true,
            (InProgress, Pending | Finished | Cancelled) => true,
            (Finished, Pending | InProgress | Cancelled) => true,
            (Cancelled, Pending | InProgress | Finished) => true,
            _ => from == to,
        }
    }

    fn initial_state() -> WorkOrderState {
        WorkOrderState::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waiting_can_be_cancelled_and_reopened() {
        assert!(AppointmentTransitions::check(AppointmentState::Waiting, AppointmentState::Cancelled).is_ok());
        assert!(AppointmentTransitions::check(AppointmentState::Cancelled, AppointmentState::Waiting).is_ok());
    }

    #[test]
    fn test_accepted_is_locked_against_edits() {
        let err = AppointmentTransitions::check(AppointmentState::Accepted, AppointmentState::Cancelled)
            .unwrap_err();
        assert!(matches!(err, ShopError::InvalidTransition { entity: "appointment", .. }));
        assert!(AppointmentTransitions::check(AppointmentState::Accepted, AppointmentState::Accepted).is_ok());
    }

    #[test]
    fn test_acceptance_requires_assignment() {
        assert!(AppointmentTransitions::check(AppointmentState::Waiting, AppointmentState::Accepted).is_err());
        assert!(AppointmentTransitions::assignable(AppointmentState::Waiting));
        assert!(!AppointmentTransitions::assignable(AppointmentState::Cancelled));
    }

    #[test]
    fn test_work_order_table_is_permissive() {
        use WorkOrderState::*;
        let all = [Pending, InProgress, Finished, Cancelled];
        for from in all {
            for to in all {
                assert!(WorkOrderTransitions::check(from, to).is_ok(), "{} -> {}", from, to);
            }
        }
        assert_eq!(WorkOrderTransitions::initial_state(), Pending);
    }
}
