//! Payment session lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Status of a payment session.
///
/// `Pending` is initial. `Paid`, `Failed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    InProgress,
    Paid,
    Failed,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::InProgress => "in-progress",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, InProgress)
                | (Pending, Failed)
                | (Pending, Expired)
                | (InProgress, Paid)
                | (InProgress, Failed)
                | (InProgress, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![InProgress, Failed, Expired],
            InProgress => vec![Paid, Failed, Expired],
            Paid | Failed | Expired => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "in-progress" => Ok(PaymentStatus::InProgress),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PaymentStatus; 5] = [
        PaymentStatus::Pending,
        PaymentStatus::InProgress,
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Expired,
    ];

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::InProgress.is_terminal());
    }

    #[test]
    fn nothing_leaves_a_terminal_state() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(&to), "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn paid_requires_in_progress() {
        assert!(!PaymentStatus::Pending.can_transition_to(&PaymentStatus::Paid));
        assert!(PaymentStatus::InProgress.can_transition_to(&PaymentStatus::Paid));
    }

    #[test]
    fn serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        for status in ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("done".parse::<PaymentStatus>().is_err());
    }
}
