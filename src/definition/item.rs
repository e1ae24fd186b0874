//! Item references: everything the runtime needs to know about one item.

use serde::{Deserialize, Serialize};

use super::enums::ShowHide;
use super::rules::{BranchRule, ItemSessionControl, PreCondition, Processing, TimeLimits};
use crate::variables::VariableDeclaration;

/// Modal feedback shown after an attempt when its outcome matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalFeedbackRule {
    pub outcome_identifier: String,
    pub identifier: String,
    #[serde(default)]
    pub show_hide: ShowHide,
}

impl ModalFeedbackRule {
    pub fn new(
        outcome_identifier: impl Into<String>,
        identifier: impl Into<String>,
        show_hide: ShowHide,
    ) -> Self {
        Self {
            outcome_identifier: outcome_identifier.into(),
            identifier: identifier.into(),
            show_hide,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleChoice {
    pub identifier: String,
    #[serde(default)]
    pub fixed: bool,
}

/// A shufflable interaction and its choices in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shuffling {
    pub response_identifier: String,
    pub choices: Vec<ShuffleChoice>,
}

impl Shuffling {
    pub fn new<I, S>(response_identifier: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            response_identifier: response_identifier.into(),
            choices: choices
                .into_iter()
                .map(|(identifier, fixed)| ShuffleChoice {
                    identifier: identifier.into(),
                    fixed,
                })
                .collect(),
        }
    }
}

/// Cardinality bounds and pattern for one response variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseValidityConstraint {
    pub response_identifier: String,
    #[serde(default)]
    pub min_constraint: u32,
    /// 0 means unbounded.
    #[serde(default)]
    pub max_constraint: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_mask: Option<String>,
}

impl ResponseValidityConstraint {
    pub fn new(
        response_identifier: impl Into<String>,
        min_constraint: u32,
        max_constraint: u32,
    ) -> Self {
        Self {
            response_identifier: response_identifier.into(),
            min_constraint,
            max_constraint,
            pattern_mask: None,
        }
    }

    pub fn with_pattern_mask(mut self, pattern: impl Into<String>) -> Self {
        self.pattern_mask = Some(pattern.into());
        self
    }
}

/// Reference to an item, extended with the item's runtime definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentItemRef {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub adaptive: bool,
    #[serde(default)]
    pub time_dependent: bool,
    #[serde(default)]
    pub pre_conditions: Vec<PreCondition>,
    #[serde(default)]
    pub branch_rules: Vec<BranchRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_session_control: Option<ItemSessionControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limits: Option<TimeLimits>,
    #[serde(default)]
    pub variables: Vec<VariableDeclaration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_processing: Option<Processing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_processing: Option<Processing>,
    #[serde(default)]
    pub modal_feedback_rules: Vec<ModalFeedbackRule>,
    #[serde(default)]
    pub shufflings: Vec<Shuffling>,
    #[serde(default)]
    pub response_validity_constraints: Vec<ResponseValidityConstraint>,
    /// Response identifiers bound to end-attempt interactions.
    #[serde(default)]
    pub end_attempt_identifiers: Vec<String>,
}

impl AssessmentItemRef {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            href: None,
            categories: Vec::new(),
            fixed: false,
            required: false,
            adaptive: false,
            time_dependent: false,
            pre_conditions: Vec::new(),
            branch_rules: Vec::new(),
            item_session_control: None,
            time_limits: None,
            variables: Vec::new(),
            response_processing: None,
            template_processing: None,
            modal_feedback_rules: Vec::new(),
            shufflings: Vec::new(),
            response_validity_constraints: Vec::new(),
            end_attempt_identifiers: Vec::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn adaptive(mut self) -> Self {
        self.adaptive = true;
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

    pub fn with_variable(mut self, declaration: VariableDeclaration) -> Self {
        self.variables.push(declaration);
        self
    }

    pub fn with_response_processing(mut self, processing: Processing) -> Self {
        self.response_processing = Some(processing);
        self
    }

    pub fn with_template_processing(mut self, processing: Processing) -> Self {
        self.template_processing = Some(processing);
        self
    }

    pub fn with_modal_feedback(mut self, rule: ModalFeedbackRule) -> Self {
        self.modal_feedback_rules.push(rule);
        self
    }

    pub fn with_shuffling(mut self, shuffling: Shuffling) -> Self {
        self.shufflings.push(shuffling);
        self
    }

    pub fn with_validity_constraint(mut self, constraint: ResponseValidityConstraint) -> Self {
        self.response_validity_constraints.push(constraint);
        self
    }

    pub fn with_end_attempt(mut self, response_identifier: impl Into<String>) -> Self {
        self.end_attempt_identifiers.push(response_identifier.into());
        self
    }

    pub fn has_response_processing(&self) -> bool {
        self.response_processing
            .as_ref()
            .map_or(false, |p| !p.is_empty())
    }
}
