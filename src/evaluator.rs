//! Rule evaluation seam.
//!
//! The engine never interprets expressions itself. Branch rules,
//! preconditions, response processing and template processing are handed to
//! a host-provided [`RuleEvaluator`].

use thiserror::Error;

use crate::definition::{Expression, Processing};
use crate::variables::VariableStore;

/// Failure reported by a rule evaluator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("malformed expression '{expression}': {reason}")]
    Malformed { expression: String, reason: String },

    #[error("expression '{expression}' did not produce a boolean")]
    NotBoolean { expression: String },

    #[error("processing failed: {0}")]
    Processing(String),
}

/// Expression engine collaborator.
pub trait RuleEvaluator {
    /// Statically decide an expression. `Some` only when the expression is
    /// provably independent of any variable state.
    fn evaluate_pure(&self, expression: &Expression) -> Result<Option<bool>, EvaluationError>;

    /// Evaluate an expression against the current variable state.
    fn evaluate(
        &self,
        expression: &Expression,
        variables: &VariableStore,
    ) -> Result<bool, EvaluationError>;

    /// Run response processing, reading responses and writing outcomes.
    fn run_response_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError>;

    /// Run template processing, writing template variables and defaults.
    fn run_template_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError>;
}

impl<T: RuleEvaluator + ?Sized> RuleEvaluator for &T {
    fn evaluate_pure(&self, expression: &Expression) -> Result<Option<bool>, EvaluationError> {
        (**self).evaluate_pure(expression)
    }

    fn evaluate(
        &self,
        expression: &Expression,
        variables: &VariableStore,
    ) -> Result<bool, EvaluationError> {
        (**self).evaluate(expression, variables)
    }

    fn run_response_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError> {
        (**self).run_response_processing(processing, variables)
    }

    fn run_template_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError> {
        (**self).run_template_processing(processing, variables)
    }
}

/// Evaluate a list of rule expressions in order and report whether all hold.
pub(crate) fn all_hold<'a, E, I>(
    evaluator: &E,
    expressions: I,
    variables: &VariableStore,
) -> Result<bool, EvaluationError>
where
    E: RuleEvaluator + ?Sized,
    I: IntoIterator<Item = &'a Expression>,
{
    for expression in expressions {
        if !evaluator.evaluate(expression, variables)? {
            return Ok(false);
        }
    }
    Ok(true)
}
