use std::fmt;

use serde::{Deserialize, Serialize};

/// Workflow status of a stored calculation.
///
/// ```text
/// DRAFT ──> CALCULATED ──> VERIFIED ──> APPROVED
///   │           │             │
///   └───────────┴─────────────┴──────> REJECTED
/// ```
///
/// APPROVED and REJECTED are terminal. Recomputation after an input edit is
/// the only way back to CALCULATED and is handled by the lifecycle, not by
/// [`CalculationStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationStatus {
    #[default]
    Draft,
    Calculated,
    Verified,
    Approved,
    Rejected,
}

impl CalculationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Calculated => "CALCULATED",
            Self::Verified => "VERIFIED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "CALCULATED" => Some(Self::Calculated),
            "VERIFIED" => Some(Self::Verified),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Statuses only an elevated role may request.
    pub fn requires_elevation(&self) -> bool {
        matches!(self, Self::Verified | Self::Approved | Self::Rejected)
    }

    /// Whether a caller may move a record from `self` to `next` by a status
    /// change alone.
    pub fn can_transition_to(
        &self,
        next: CalculationStatus,
    ) -> bool {
        use CalculationStatus::*;

        match (self, next) {
            (Calculated, Verified) | (Verified, Approved) => true,
            (Draft | Calculated | Verified, Rejected) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CalculationStatus {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
