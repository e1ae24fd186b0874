//! RouteItem - one presentation slot of a route.

use std::fmt;
use std::sync::Arc;

use crate::definition::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, BranchRule, NavigationMode,
    PreCondition, SubmissionMode, TestPart,
};

use super::control::{RouteItemSessionControl, RouteTimeLimits, Scope};

/// An (item, section path, test part, test) tuple.
///
/// Everything is fixed at construction except the occurrence number, which
/// the owning [`Route`](super::Route) assigns on insertion, and the rules the
/// route builder attaches on behalf of enclosing sections.
#[derive(Clone)]
pub struct RouteItem {
    item_ref: Arc<AssessmentItemRef>,
    sections: Vec<Arc<AssessmentSection>>,
    test_part: Arc<TestPart>,
    test: Arc<AssessmentTest>,
    occurrence: usize,
    branch_rules: Vec<BranchRule>,
    pre_conditions: Vec<PreCondition>,
}

impl RouteItem {
    /// `sections` is the enclosing section path, outermost first.
    pub fn new(
        item_ref: Arc<AssessmentItemRef>,
        sections: Vec<Arc<AssessmentSection>>,
        test_part: Arc<TestPart>,
        test: Arc<AssessmentTest>,
    ) -> Self {
        let branch_rules = item_ref.branch_rules.clone();
        let pre_conditions = item_ref.pre_conditions.clone();
        Self {
            item_ref,
            sections,
            test_part,
            test,
            occurrence: 0,
            branch_rules,
            pre_conditions,
        }
    }

    pub fn item_ref(&self) -> &Arc<AssessmentItemRef> {
        &self.item_ref
    }

    pub fn identifier(&self) -> &str {
        &self.item_ref.identifier
    }

    /// Enclosing sections, outermost first.
    pub fn sections(&self) -> &[Arc<AssessmentSection>] {
        &self.sections
    }

    pub fn innermost_section(&self) -> Option<&Arc<AssessmentSection>> {
        self.sections.last()
    }

    pub fn is_in_section(&self, identifier: &str) -> bool {
        self.sections.iter().any(|s| s.identifier == identifier)
    }

    pub fn test_part(&self) -> &Arc<TestPart> {
        &self.test_part
    }

    pub fn test(&self) -> &Arc<AssessmentTest> {
        &self.test
    }

    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    pub(crate) fn set_occurrence(&mut self, occurrence: usize) {
        self.occurrence = occurrence;
    }

    /// Branch rules carried by this slot: the item's own, then any attached
    /// by enclosing sections (innermost first).
    pub fn branch_rules(&self) -> &[BranchRule] {
        &self.branch_rules
    }

    /// Preconditions carried by this slot: the item's own, then any attached
    /// by enclosing sections (innermost first).
    pub fn pre_conditions(&self) -> &[PreCondition] {
        &self.pre_conditions
    }

    pub(crate) fn add_branch_rules(&mut self, rules: &[BranchRule]) {
        self.branch_rules.extend_from_slice(rules);
    }

    pub(crate) fn add_pre_conditions(&mut self, conditions: &[PreCondition]) {
        self.pre_conditions.extend_from_slice(conditions);
    }

    pub fn navigation_mode(&self) -> NavigationMode {
        self.test_part.navigation_mode
    }

    pub fn submission_mode(&self) -> SubmissionMode {
        self.test_part.submission_mode
    }

    pub fn is_adaptive(&self) -> bool {
        self.item_ref.adaptive
    }

    /// `Q01`, or `Q01.2` for the second occurrence when `with_sequence` is set.
    pub fn sequence_identifier(&self, with_sequence: bool) -> String {
        if with_sequence {
            format!("{}.{}", self.identifier(), self.occurrence + 1)
        } else {
            self.identifier().to_string()
        }
    }

    /// Nearest item session control: the item's, then sections from the
    /// innermost outward, then the test part's.
    pub fn item_session_control(&self) -> Option<RouteItemSessionControl> {
        if let Some(ref control) = self.item_ref.item_session_control {
            return Some(RouteItemSessionControl::new(
                control.clone(),
                Scope::item(&self.item_ref.identifier),
            ));
        }

        for section in self.sections.iter().rev() {
            if let Some(ref control) = section.item_session_control {
                return Some(RouteItemSessionControl::new(
                    control.clone(),
                    Scope::section(&section.identifier),
                ));
            }
        }

        self.test_part.item_session_control.as_ref().map(|control| {
            RouteItemSessionControl::new(
                control.clone(),
                Scope::test_part(&self.test_part.identifier),
            )
        })
    }

    /// Time limits in force, from the test scope inward.
    pub fn time_limits(&self, include_item: bool) -> Vec<RouteTimeLimits> {
        let mut limits = Vec::new();

        if let Some(ref tl) = self.test.time_limits {
            limits.push(RouteTimeLimits::new(tl.clone(), Scope::test(&self.test.identifier)));
        }
        if let Some(ref tl) = self.test_part.time_limits {
            limits.push(RouteTimeLimits::new(
                tl.clone(),
                Scope::test_part(&self.test_part.identifier),
            ));
        }
        for section in &self.sections {
            if let Some(ref tl) = section.time_limits {
                limits.push(RouteTimeLimits::new(
                    tl.clone(),
                    Scope::section(&section.identifier),
                ));
            }
        }
        if include_item {
            if let Some(ref tl) = self.item_ref.time_limits {
                limits.push(RouteTimeLimits::new(
                    tl.clone(),
                    Scope::item(&self.item_ref.identifier),
                ));
            }
        }

        limits
    }
}

impl fmt::Debug for RouteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteItem")
            .field("item", &self.item_ref.identifier)
            .field("occurrence", &self.occurrence)
            .field(
                "sections",
                &self
                    .sections
                    .iter()
                    .map(|s| s.identifier.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("test_part", &self.test_part.identifier)
            .finish()
    }
}
