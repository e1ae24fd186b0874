//! Enumerations shared by the definition model and the runtime.

use serde::{Deserialize, Serialize};

/// How the candidate may move between items of a test part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NavigationMode {
    #[default]
    Linear,
    Nonlinear,
}

/// When responses of a test part are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    #[default]
    Individual,
    Simultaneous,
}

/// Whether a matching modal feedback is shown or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShowHide {
    #[default]
    Show,
    Hide,
}

/// The kind of node a runtime object was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    AssessmentTest,
    TestPart,
    AssessmentSection,
    AssessmentItemRef,
}
