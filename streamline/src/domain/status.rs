use std::{fmt, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// Lifecycle state of an activity, and of the allocation derived from it.
///
/// ```text
/// Pending ──► Approved ──► Accepted ──► Not Started ──► PDApproved ──► On-Going ──► Completed
///    │           │                           │
///    ├► Rejected ◄┘                          └► PDRejected
///    └► Cancelled
/// ```
///
/// Statuses the server reports that are not part of this table are kept
/// verbatim in [`ActivityStatus::Unknown`] and cannot transition anywhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum ActivityStatus {
    Pending,
    Approved,
    Rejected,
    Accepted,
    NotStarted,
    OnGoing,
    Completed,
    Cancelled,
    PdApproved,
    PdRejected,
    Unknown(String),
}

impl ActivityStatus {
    pub const KNOWN: [ActivityStatus; 10] = [
        ActivityStatus::Pending,
        ActivityStatus::Approved,
        ActivityStatus::Rejected,
        ActivityStatus::Accepted,
        ActivityStatus::NotStarted,
        ActivityStatus::OnGoing,
        ActivityStatus::Completed,
        ActivityStatus::Cancelled,
        ActivityStatus::PdApproved,
        ActivityStatus::PdRejected,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ActivityStatus::Pending => "Pending",
            ActivityStatus::Approved => "Approved",
            ActivityStatus::Rejected => "Rejected",
            ActivityStatus::Accepted => "Accepted",
            ActivityStatus::NotStarted => "Not Started",
            ActivityStatus::OnGoing => "On-Going",
            ActivityStatus::Completed => "Completed",
            ActivityStatus::Cancelled => "Cancelled",
            ActivityStatus::PdApproved => "PDApproved",
            ActivityStatus::PdRejected => "PDRejected",
            ActivityStatus::Unknown(raw) => raw,
        }
    }

    /// States reachable from `self` in one step.
    pub fn next_states(&self) -> &'static [ActivityStatus] {
        const FROM_PENDING: &[ActivityStatus] = &[
            ActivityStatus::Approved,
            ActivityStatus::Rejected,
            ActivityStatus::Cancelled,
        ];
        const FROM_APPROVED: &[ActivityStatus] =
            &[ActivityStatus::Accepted, ActivityStatus::Rejected];
        const FROM_ACCEPTED: &[ActivityStatus] = &[ActivityStatus::NotStarted];
        const FROM_NOT_STARTED: &[ActivityStatus] =
            &[ActivityStatus::PdApproved, ActivityStatus::PdRejected];
        const FROM_PD_APPROVED: &[ActivityStatus] = &[ActivityStatus::OnGoing];
        const FROM_ON_GOING: &[ActivityStatus] = &[ActivityStatus::Completed];

        match self {
            ActivityStatus::Pending => FROM_PENDING,
            ActivityStatus::Approved => FROM_APPROVED,
            ActivityStatus::Accepted => FROM_ACCEPTED,
            ActivityStatus::NotStarted => FROM_NOT_STARTED,
            ActivityStatus::PdApproved => FROM_PD_APPROVED,
            ActivityStatus::OnGoing => FROM_ON_GOING,
            ActivityStatus::Rejected
            | ActivityStatus::PdRejected
            | ActivityStatus::Completed
            | ActivityStatus::Cancelled
            | ActivityStatus::Unknown(_) => &[],
        }
    }

    pub fn can_transition_to(&self, next: &ActivityStatus) -> bool {
        self.next_states().contains(next)
    }

    /// Checks a requested transition, returning the target on success.
    pub fn transition(&self, next: ActivityStatus) -> Result<ActivityStatus, TransitionError> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(TransitionError {
                from: self.clone(),
                to: next,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_states().is_empty()
    }

    /// Waiting for the Provincial Director's decision.
    pub fn is_pending_decision(&self) -> bool {
        *self == ActivityStatus::NotStarted
    }

    /// Already decided by the Provincial Director.
    pub fn is_decided(&self) -> bool {
        matches!(self, ActivityStatus::PdApproved | ActivityStatus::PdRejected)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known = Self::KNOWN.iter().find(|status| status.as_str() == s);
        Ok(known
            .cloned()
            .unwrap_or_else(|| ActivityStatus::Unknown(s.to_string())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: ActivityStatus,
    pub to: ActivityStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_round_trip_through_display() {
        for status in ActivityStatus::KNOWN {
            let parsed: ActivityStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(ActivityStatus::NotStarted.as_str(), "Not Started");
        assert_eq!(ActivityStatus::OnGoing.as_str(), "On-Going");
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status: ActivityStatus = "FinalApproved".parse().unwrap();
        assert_eq!(status, ActivityStatus::Unknown("FinalApproved".to_string()));
        assert_eq!(status.to_string(), "FinalApproved");
        assert!(status.is_terminal());
    }

    #[test]
    fn serde_uses_display_strings() {
        let json = serde_json::to_string(&ActivityStatus::PdApproved).unwrap();
        assert_eq!(json, "\"PDApproved\"");

        let parsed: ActivityStatus = serde_json::from_str("\"Not Started\"").unwrap();
        assert_eq!(parsed, ActivityStatus::NotStarted);
    }

    #[test]
    fn director_decisions_only_from_not_started() {
        use ActivityStatus::*;
        assert!(NotStarted.can_transition_to(&PdApproved));
        assert!(NotStarted.can_transition_to(&PdRejected));
        assert!(!Accepted.can_transition_to(&PdApproved));
        assert!(!PdApproved.can_transition_to(&PdRejected));
    }

    #[test]
    fn transition_rejects_illegal_moves() {
        let err = ActivityStatus::Completed
            .transition(ActivityStatus::Pending)
            .unwrap_err();
        assert_eq!(err.from, ActivityStatus::Completed);
        assert_eq!(err.to.to_string(), "Pending");

        assert_eq!(
            ActivityStatus::Pending.transition(ActivityStatus::Approved),
            Ok(ActivityStatus::Approved)
        );
    }

    #[test]
    fn terminal_states() {
        use ActivityStatus::*;
        for status in [Rejected, PdRejected, Completed, Cancelled] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
        assert!(!Accepted.is_terminal());
    }
}
