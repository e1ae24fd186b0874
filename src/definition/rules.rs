//! Rules and policies attached to definition nodes.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An opaque rule expression. Only the [`RuleEvaluator`](crate::evaluator::RuleEvaluator)
/// knows how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(String);

impl Expression {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn source(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a branch rule sends the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BranchTarget {
    ExitTest,
    ExitTestPart,
    ExitSection,
    /// An item reference (optionally `ID.N`), section or test part identifier.
    Identifier(String),
}

impl From<String> for BranchTarget {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "EXIT_TEST" => BranchTarget::ExitTest,
            "EXIT_TESTPART" => BranchTarget::ExitTestPart,
            "EXIT_SECTION" => BranchTarget::ExitSection,
            _ => BranchTarget::Identifier(raw),
        }
    }
}

impl From<&str> for BranchTarget {
    fn from(raw: &str) -> Self {
        BranchTarget::from(raw.to_string())
    }
}

impl From<BranchTarget> for String {
    fn from(target: BranchTarget) -> Self {
        target.to_string()
    }
}

impl fmt::Display for BranchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchTarget::ExitTest => f.write_str("EXIT_TEST"),
            BranchTarget::ExitTestPart => f.write_str("EXIT_TESTPART"),
            BranchTarget::ExitSection => f.write_str("EXIT_SECTION"),
            BranchTarget::Identifier(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BranchRule {
    pub expression: Expression,
    pub target: BranchTarget,
}

impl BranchRule {
    pub fn new(expression: impl Into<String>, target: impl Into<BranchTarget>) -> Self {
        Self {
            expression: Expression::new(expression),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreCondition {
    pub expression: Expression,
}

impl PreCondition {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: Expression::new(expression),
        }
    }
}

/// Section selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub select: usize,
    #[serde(default)]
    pub with_replacement: bool,
}

/// Section ordering rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Ordering {
    #[serde(default)]
    pub shuffle: bool,
}

/// Attempt policy of an item, section or test part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSessionControl {
    /// 0 means unlimited.
    pub max_attempts: u32,
    pub show_feedback: bool,
    pub allow_review: bool,
    pub show_solution: bool,
    pub allow_comment: bool,
    pub allow_skipping: bool,
    pub validate_responses: bool,
}

impl Default for ItemSessionControl {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            show_feedback: false,
            allow_review: true,
            show_solution: false,
            allow_comment: false,
            allow_skipping: true,
            validate_responses: false,
        }
    }
}

/// Time limits of a scope. A zero duration means "not set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TimeLimits {
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub min_time: Option<Duration>,
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_time: Option<Duration>,
    #[serde(default)]
    pub allow_late_submission: bool,
}

impl TimeLimits {
    pub fn with_max_time(max_time: Duration) -> Self {
        Self {
            max_time: Some(max_time),
            ..Self::default()
        }
    }

    pub fn with_min_time(min_time: Duration) -> Self {
        Self {
            min_time: Some(min_time),
            ..Self::default()
        }
    }

    pub fn max_time(&self) -> Option<Duration> {
        self.max_time.filter(|d| !d.is_zero())
    }

    pub fn min_time(&self) -> Option<Duration> {
        self.min_time.filter(|d| !d.is_zero())
    }

    pub fn has_max_time(&self) -> bool {
        self.max_time().is_some()
    }

    pub fn has_min_time(&self) -> bool {
        self.min_time().is_some()
    }
}

/// Response or template processing: an ordered list of opaque rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Processing {
    pub rules: Vec<Expression>,
}

impl Processing {
    pub fn new<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: rules.into_iter().map(Expression::new).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_target_parsing() {
        assert_eq!(BranchTarget::from("EXIT_TEST"), BranchTarget::ExitTest);
        assert_eq!(BranchTarget::from("EXIT_TESTPART"), BranchTarget::ExitTestPart);
        assert_eq!(BranchTarget::from("EXIT_SECTION"), BranchTarget::ExitSection);
        assert_eq!(
            BranchTarget::from("Q01.2"),
            BranchTarget::Identifier("Q01.2".to_string())
        );
        let json = serde_json::to_string(&BranchRule::new("true", "EXIT_TESTPART")).unwrap();
        assert_eq!(json, r#"{"expression":"true","target":"EXIT_TESTPART"}"#);
    }

    #[test]
    fn test_zero_time_limits_are_unset() {
        let limits = TimeLimits {
            min_time: Some(Duration::ZERO),
            max_time: Some(Duration::from_secs(30)),
            allow_late_submission: false,
        };
        assert!(!limits.has_min_time());
        assert!(limits.has_max_time());
    }

    #[test]
    fn test_time_limits_humantime() {
        let limits: TimeLimits =
            serde_json::from_str(r#"{"max_time": "1m 30s", "allow_late_submission": true}"#)
                .unwrap();
        assert_eq!(limits.max_time(), Some(Duration::from_secs(90)));
        assert!(limits.allow_late_submission);
    }

    #[test]
    fn test_item_session_control_defaults() {
        let control: ItemSessionControl = serde_json::from_str("{}").unwrap();
        assert_eq!(control.max_attempts, 1);
        assert!(control.allow_skipping);
        assert!(!control.validate_responses);
    }
}
