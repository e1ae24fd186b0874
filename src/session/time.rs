//! TimeConstraint - remaining time at one scope, recomputed on demand.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::definition::{NavigationMode, TimeLimits};
use crate::route::Scope;

/// Elapsed time at a scope checked against that scope's limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeConstraint {
    pub source: Scope,
    pub time_limits: Option<TimeLimits>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub navigation_mode: NavigationMode,
    pub consider_min_time: bool,
}

impl TimeConstraint {
    pub fn new(
        source: Scope,
        time_limits: Option<TimeLimits>,
        duration: Duration,
        navigation_mode: NavigationMode,
        consider_min_time: bool,
    ) -> Self {
        Self {
            source,
            time_limits,
            duration,
            navigation_mode,
            consider_min_time,
        }
    }

    /// Time left before the maximum, floored at zero. `None` without a
    /// maximum.
    pub fn maximum_remaining_time(&self) -> Option<Duration> {
        self.time_limits
            .as_ref()
            .and_then(TimeLimits::max_time)
            .map(|max| max.saturating_sub(self.duration))
    }

    /// Time left before the minimum is satisfied, floored at zero. `None`
    /// when no minimum applies; minimums only apply in linear navigation.
    pub fn minimum_remaining_time(&self) -> Option<Duration> {
        if !self.applies_min_time() {
            return None;
        }
        self.time_limits
            .as_ref()
            .and_then(TimeLimits::min_time)
            .map(|min| min.saturating_sub(self.duration))
    }

    pub fn max_time_respected(&self) -> bool {
        self.maximum_remaining_time().map_or(true, |left| !left.is_zero())
    }

    pub fn min_time_respected(&self) -> bool {
        self.minimum_remaining_time().map_or(true, |left| left.is_zero())
    }

    pub fn allows_late_submission(&self) -> bool {
        self.time_limits
            .as_ref()
            .map_or(false, |tl| tl.allow_late_submission)
    }

    fn applies_min_time(&self) -> bool {
        self.consider_min_time && self.navigation_mode == NavigationMode::Linear
    }
}
