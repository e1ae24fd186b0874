//! Scope-resolved policies: which node an item session control or a time
//! limit was inherited from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::definition::{ItemSessionControl, ScopeKind, TimeLimits};

/// A node of the definition tree, named by kind and identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub identifier: String,
}

impl Scope {
    pub fn new(kind: ScopeKind, identifier: impl Into<String>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn test(identifier: impl Into<String>) -> Self {
        Self::new(ScopeKind::AssessmentTest, identifier)
    }

    pub fn test_part(identifier: impl Into<String>) -> Self {
        Self::new(ScopeKind::TestPart, identifier)
    }

    pub fn section(identifier: impl Into<String>) -> Self {
        Self::new(ScopeKind::AssessmentSection, identifier)
    }

    pub fn item(identifier: impl Into<String>) -> Self {
        Self::new(ScopeKind::AssessmentItemRef, identifier)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.kind, self.identifier)
    }
}

/// The item session control in force for a route item, and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteItemSessionControl {
    pub control: ItemSessionControl,
    pub owner: Scope,
}

impl RouteItemSessionControl {
    pub fn new(control: ItemSessionControl, owner: Scope) -> Self {
        Self { control, owner }
    }

    pub fn control(&self) -> &ItemSessionControl {
        &self.control
    }

    pub fn owner(&self) -> &Scope {
        &self.owner
    }
}

/// Time limits of one scope enclosing a route item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTimeLimits {
    pub time_limits: TimeLimits,
    pub owner: Scope,
}

impl RouteTimeLimits {
    pub fn new(time_limits: TimeLimits, owner: Scope) -> Self {
        Self { time_limits, owner }
    }
}
