//! Reservation status state machine (C1).
//!
//! A pure mapping `transitions : Status → set<Status>`. The matrix here is
//! the authoritative source (spec §3); nothing else in the crate is allowed
//! to invent a transition that is not represented here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Just created locally; not yet sent on-request or confirmed.
    Pending,
    /// Submitted to the supplier and awaiting their decision.
    OnRequest,
    /// Supplier has confirmed the booking.
    Confirmed,
    /// Rental period has started.
    InProgress,
    /// Rental period has ended normally.
    Completed,
    /// Customer never picked up the vehicle. Terminal.
    NoShow,
    /// Cancelled by the external cancellation service. Terminal.
    Cancelled,
    /// Reserved for future use; never reached by the coordinator today.
    Failed,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::OnRequest => "ON_REQUEST",
            Self::Confirmed => "CONFIRMED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::NoShow => "NO_SHOW",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// Whether `to` is a legal transition from `from`.
#[must_use]
pub fn can_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
    allowed_from(from).contains(&to)
}

/// The set of statuses reachable from `from` in one step.
#[must_use]
pub fn allowed_from(from: ReservationStatus) -> &'static [ReservationStatus] {
    use ReservationStatus::{Cancelled, Completed, Confirmed, Failed, InProgress, NoShow, OnRequest, Pending};
    match from {
        Pending => &[OnRequest, Confirmed],
        OnRequest => &[Confirmed, Pending],
        Confirmed => &[InProgress, NoShow],
        InProgress => &[Completed],
        Completed | NoShow | Cancelled | Failed => &[],
    }
}

/// Whether `status` has no outgoing transitions.
#[must_use]
pub fn is_terminal(status: ReservationStatus) -> bool {
    allowed_from(status).is_empty()
}

/// A short, audit-log-friendly description of a transition, for the
/// supplier-request / audit trail's free-text field.
#[must_use]
pub fn describe(from: ReservationStatus, to: ReservationStatus) -> String {
    use ReservationStatus::{Cancelled, Completed, Confirmed, InProgress, NoShow, OnRequest, Pending};
    match (from, to) {
        (Pending, OnRequest) => "Reservation submitted to supplier for on-request confirmation".into(),
        (Pending, Confirmed) => "Supplier confirmed the reservation immediately".into(),
        (OnRequest, Confirmed) => "Supplier confirmed a previously on-request reservation".into(),
        (OnRequest, Pending) => "Supplier confirmation retry loop reset to pending".into(),
        (Confirmed, InProgress) => "Vehicle picked up, rental period started".into(),
        (Confirmed, NoShow) => "Customer did not pick up the vehicle".into(),
        (InProgress, Completed) => "Vehicle returned, rental period completed".into(),
        _ => format!("Transition from {from} to {to}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReservationStatus::{Cancelled, Completed, Confirmed, Failed, InProgress, NoShow, OnRequest, Pending};

    #[test]
    fn matrix_matches_spec() {
        assert!(can_transition(Pending, OnRequest));
        assert!(can_transition(Pending, Confirmed));
        assert!(!can_transition(Pending, InProgress));

        assert!(can_transition(OnRequest, Confirmed));
        assert!(can_transition(OnRequest, Pending));
        assert!(!can_transition(OnRequest, Completed));

        assert!(can_transition(Confirmed, InProgress));
        assert!(can_transition(Confirmed, NoShow));
        assert!(!can_transition(Confirmed, Completed));

        assert!(can_transition(InProgress, Completed));
        assert!(!can_transition(InProgress, NoShow));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        for s in [Completed, NoShow, Cancelled, Failed] {
            assert!(is_terminal(s));
            assert!(allowed_from(s).is_empty());
        }
    }

    #[test]
    fn non_terminal_states_have_transitions() {
        for s in [Pending, OnRequest, Confirmed, InProgress] {
            assert!(!is_terminal(s));
        }
    }

    #[test]
    fn describe_is_non_empty_for_every_legal_edge() {
        for from in [Pending, OnRequest, Confirmed, InProgress] {
            for &to in allowed_from(from) {
                assert!(!describe(from, to).is_empty());
            }
        }
    }

    #[test]
    fn display_matches_wire_format() {
        assert_eq!(Confirmed.to_string(), "CONFIRMED");
        assert_eq!(NoShow.to_string(), "NO_SHOW");
    }
}
