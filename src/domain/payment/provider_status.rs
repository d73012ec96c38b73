//! Provider-agnostic status vocabulary.
//!
//! Every provider adapter maps its own statuses into `NormalizedStatus`
//! through an exhaustive table; values outside the table are errors.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::PaymentStatus;

/// Payment status as reported by a provider, after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizedStatus {
    Created,
    InProgress,
    /// Payer approved but funds not captured yet. Non-terminal.
    Approved,
    Success,
    Failed,
    Cancelled,
}

impl NormalizedStatus {
    /// Session status this provider status settles into, if any.
    ///
    /// `None` means the session stays where it is.
    pub fn settles_to(&self) -> Option<PaymentStatus> {
        match self {
            NormalizedStatus::Success => Some(PaymentStatus::Paid),
            NormalizedStatus::Failed | NormalizedStatus::Cancelled => Some(PaymentStatus::Failed),
            NormalizedStatus::Created
            | NormalizedStatus::InProgress
            | NormalizedStatus::Approved => None,
        }
    }

    /// Value echoed back to the caller in the redirect's `status` parameter.
    pub fn redirect_status(&self) -> &'static str {
        match self.settles_to() {
            Some(PaymentStatus::Paid) => "paid",
            Some(_) => "failed",
            None => "in-progress",
        }
    }
}

impl fmt::Display for NormalizedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NormalizedStatus::Created => "created",
            NormalizedStatus::InProgress => "in-progress",
            NormalizedStatus::Approved => "approved",
            NormalizedStatus::Success => "success",
            NormalizedStatus::Failed => "failed",
            NormalizedStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_mapping() {
        assert_eq!(NormalizedStatus::Success.settles_to(), Some(PaymentStatus::Paid));
        assert_eq!(NormalizedStatus::Failed.settles_to(), Some(PaymentStatus::Failed));
        assert_eq!(NormalizedStatus::Cancelled.settles_to(), Some(PaymentStatus::Failed));
        assert_eq!(NormalizedStatus::Created.settles_to(), None);
        assert_eq!(NormalizedStatus::InProgress.settles_to(), None);
        assert_eq!(NormalizedStatus::Approved.settles_to(), None);
    }

    #[test]
    fn redirect_status_values() {
        assert_eq!(NormalizedStatus::Success.redirect_status(), "paid");
        assert_eq!(NormalizedStatus::Cancelled.redirect_status(), "failed");
        assert_eq!(NormalizedStatus::Approved.redirect_status(), "in-progress");
    }
}
