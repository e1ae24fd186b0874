//! Assessment test definitions.
//!
//! The tree a delivery starts from:
//! ```text
//! AssessmentTest
//!   └─ TestPart (navigation / submission mode)
//!        └─ AssessmentSection (selection, ordering, visibility)
//!             ├─ AssessmentSection ...
//!             └─ AssessmentItemRef
//! ```
//! Nodes are shared through `Arc` so route items can point back into the
//! tree without copying it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::Result;
use crate::variables::VariableDeclaration;

pub mod enums;
pub mod item;
pub mod rules;

pub use enums::{NavigationMode, ScopeKind, ShowHide, SubmissionMode};
pub use item::{
    AssessmentItemRef, ModalFeedbackRule, ResponseValidityConstraint, ShuffleChoice, Shuffling,
};
pub use rules::{
    BranchRule, BranchTarget, Expression, ItemSessionControl, Ordering, PreCondition, Processing,
    Selection, TimeLimits,
};

/// Child of a section: a nested section or an item reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionPart {
    Section(Arc<AssessmentSection>),
    Item(Arc<AssessmentItemRef>),
}

impl SectionPart {
    pub fn identifier(&self) -> &str {
        match self {
            SectionPart::Section(s) => &s.identifier,
            SectionPart::Item(i) => &i.identifier,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSection {
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub keep_together: bool,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering: Option<Ordering>,
    #[serde(default)]
    pub pre_conditions: Vec<PreCondition>,
    #[serde(default)]
    pub branch_rules: Vec<BranchRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_session_control: Option<ItemSessionControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limits: Option<TimeLimits>,
    #[serde(default)]
    pub children: Vec<SectionPart>,
}

impl AssessmentSection {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: String::new(),
            visible: true,
            keep_together: true,
            fixed: false,
            required: false,
            selection: None,
            ordering: None,
            pre_conditions: Vec::new(),
            branch_rules: Vec::new(),
            item_session_control: None,
            time_limits: None,
            children: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: AssessmentItemRef) -> Self {
        self.children.push(SectionPart::Item(Arc::new(item)));
        self
    }

    pub fn with_items<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = AssessmentItemRef>,
    {
        self.children
            .extend(items.into_iter().map(|i| SectionPart::Item(Arc::new(i))));
        self
    }

    pub fn with_section(mut self, section: AssessmentSection) -> Self {
        self.children.push(SectionPart::Section(Arc::new(section)));
        self
    }

    pub fn with_selection(mut self, select: usize, with_replacement: bool) -> Self {
        self.selection = Some(Selection {
            select,
            with_replacement,
        });
        self
    }

    pub fn shuffled(mut self) -> Self {
        self.ordering = Some(Ordering { shuffle: true });
        self
    }

    pub fn invisible(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn keep_together(mut self, keep_together: bool) -> Self {
        self.keep_together = keep_together;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_branch_rule(mut self, rule: BranchRule) -> Self {
        self.branch_rules.push(rule);
        self
    }

    pub fn with_pre_condition(mut self, condition: PreCondition) -> Self {
        self.pre_conditions.push(condition);
        self
    }

    pub fn with_item_session_control(mut self, control: ItemSessionControl) -> Self {
        self.item_session_control = Some(control);
        self
    }

    pub fn with_time_limits(mut self, limits: TimeLimits) -> Self {
        self.time_limits = Some(limits);
        self
    }

    pub fn is_shuffled(&self) -> bool {
        self.ordering.map_or(false, |o| o.shuffle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestPart {
    pub identifier: String,
    #[serde(default)]
    pub navigation_mode: NavigationMode,
    #[serde(default)]
    pub submission_mode: SubmissionMode,
    #[serde(default)]
    pub pre_conditions: Vec<PreCondition>,
    #[serde(default)]
    pub branch_rules: Vec<BranchRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_session_control: Option<ItemSessionControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limits: Option<TimeLimits>,
    #[serde(default)]
    pub sections: Vec<Arc<AssessmentSection>>,
}

impl TestPart {
    pub fn new(
        identifier: impl Into<String>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            navigation_mode,
            submission_mode,
            pre_conditions: Vec::new(),
            branch_rules: Vec::new(),
            item_session_control: None,
            time_limits: None,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: AssessmentSection) -> Self {
        self.sections.push(Arc::new(section));
        self
    }

    pub fn with_branch_rule(mut self, rule: BranchRule) -> Self {
        self.branch_rules.push(rule);
        self
    }

    pub fn with_pre_condition(mut self, condition: PreCondition) -> Self {
        self.pre_conditions.push(condition);
        self
    }

    pub fn with_item_session_control(mut self, control: ItemSessionControl) -> Self {
        self.item_session_control = Some(control);
        self
    }

    pub fn with_time_limits(mut self, limits: TimeLimits) -> Self {
        self.time_limits = Some(limits);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentTest {
    pub identifier: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limits: Option<TimeLimits>,
    /// Test-level outcome declarations.
    #[serde(default)]
    pub outcomes: Vec<VariableDeclaration>,
    #[serde(default)]
    pub test_parts: Vec<Arc<TestPart>>,
}

impl AssessmentTest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: String::new(),
            time_limits: None,
            outcomes: Vec::new(),
            test_parts: Vec::new(),
        }
    }

    pub fn with_test_part(mut self, part: TestPart) -> Self {
        self.test_parts.push(Arc::new(part));
        self
    }

    pub fn with_time_limits(mut self, limits: TimeLimits) -> Self {
        self.time_limits = Some(limits);
        self
    }

    pub fn with_outcome(mut self, declaration: VariableDeclaration) -> Self {
        self.outcomes.push(declaration);
        self
    }

    /// Parse a test definition document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}
