//! Item session states and the small values derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of an item session.
///
/// ```text
/// NOT_SELECTED ─► INITIAL ─► INTERACTING ⇄ SUSPENDED
///                                │   ▲          │
///                                ▼   │          ▼
///                          MODAL_FEEDBACK ──► CLOSED ─► REVIEW / SOLUTION
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentItemSessionState {
    #[default]
    NotSelected,
    Initial,
    Interacting,
    Suspended,
    ModalFeedback,
    Closed,
    Review,
    Solution,
}

impl AssessmentItemSessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotSelected => "NOT_SELECTED",
            Self::Initial => "INITIAL",
            Self::Interacting => "INTERACTING",
            Self::Suspended => "SUSPENDED",
            Self::ModalFeedback => "MODAL_FEEDBACK",
            Self::Closed => "CLOSED",
            Self::Review => "REVIEW",
            Self::Solution => "SOLUTION",
        }
    }
}

impl fmt::Display for AssessmentItemSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of the built-in `completionStatus` outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    #[default]
    NotAttempted,
    Unknown,
    Completed,
    Incomplete,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAttempted => "not_attempted",
            Self::Unknown => "unknown",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
        }
    }

    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "not_attempted" => Some(Self::NotAttempted),
            "unknown" => Some(Self::Unknown),
            "completed" => Some(Self::Completed),
            "incomplete" => Some(Self::Incomplete),
            _ => None,
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempts left on an item session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainingAttempts {
    /// No fixed limit: unlimited attempts, or an adaptive item still running.
    Unlimited,
    Count(u32),
}

impl RemainingAttempts {
    /// Legacy integer form: -1 for unlimited.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Unlimited => -1,
            Self::Count(n) => i32::try_from(*n).unwrap_or(i32::MAX),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Count(0))
    }
}
