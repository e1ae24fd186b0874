//! Fixtures shared by unit tests.

use std::sync::Arc;

use crate::definition::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, Expression, NavigationMode, Processing,
    SubmissionMode, TestPart,
};
use crate::evaluator::{EvaluationError, RuleEvaluator};
use crate::route::RouteItem;
use crate::session::COMPLETION_STATUS;
use crate::variables::{
    BaseType, Cardinality, Scalar, Value, VariableDeclaration, VariableKind, VariableStore,
};

/// Understands a handful of literal forms:
/// - `true` / `false` are static
/// - `NAME` / `!NAME` read a boolean variable
/// - processing rules `match_correct VAR`, `complete`, `feedback VAR ID`,
///   `template VAR N`, `fail`
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LiteralEvaluator;

impl RuleEvaluator for LiteralEvaluator {
    fn evaluate_pure(&self, expression: &Expression) -> Result<Option<bool>, EvaluationError> {
        Ok(match expression.source().trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        })
    }

    fn evaluate(
        &self,
        expression: &Expression,
        variables: &VariableStore,
    ) -> Result<bool, EvaluationError> {
        if let Some(value) = self.evaluate_pure(expression)? {
            return Ok(value);
        }
        let source = expression.source().trim();
        let (negated, name) = match source.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, source),
        };
        let variable = variables.get(name).ok_or_else(|| EvaluationError::Malformed {
            expression: source.to_string(),
            reason: format!("unknown variable {}", name),
        })?;
        match variable.value {
            Some(Value::Single(Scalar::Boolean(b))) => Ok(b != negated),
            None => Ok(negated),
            _ => Err(EvaluationError::NotBoolean {
                expression: source.to_string(),
            }),
        }
    }

    fn run_response_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError> {
        processing
            .rules
            .iter()
            .try_for_each(|rule| apply_rule(rule.source(), variables))
    }

    fn run_template_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError> {
        self.run_response_processing(processing, variables)
    }
}

fn apply_rule(rule: &str, variables: &mut VariableStore) -> Result<(), EvaluationError> {
    let words: Vec<&str> = rule.split_whitespace().collect();
    match words.as_slice() {
        ["match_correct", target] => {
            let correct = responses_correct(variables);
            let value = match variables.get(target).map(|v| v.declaration.base_type) {
                Some(BaseType::Boolean) => Value::boolean(correct),
                Some(BaseType::Integer) => Value::integer(i64::from(correct)),
                _ => Value::float(if correct { 1.0 } else { 0.0 }),
            };
            assign(variables, target, value)
        }
        ["complete"] => assign(variables, COMPLETION_STATUS, Value::identifier("completed")),
        ["feedback", outcome, identifier] => {
            assign(variables, outcome, Value::identifier(*identifier))
        }
        ["template", target, n] => {
            let n: i64 = n.parse().map_err(|_| EvaluationError::Malformed {
                expression: rule.to_string(),
                reason: "not an integer".to_string(),
            })?;
            assign(variables, target, Value::integer(n))
        }
        ["fail"] => Err(EvaluationError::Processing("rule failed".to_string())),
        _ => Err(EvaluationError::Malformed {
            expression: rule.to_string(),
            reason: "unknown rule".to_string(),
        }),
    }
}

fn assign(
    variables: &mut VariableStore,
    identifier: &str,
    value: Value,
) -> Result<(), EvaluationError> {
    variables
        .set(identifier, Some(value))
        .map_err(|e| EvaluationError::Processing(e.to_string()))
}

fn responses_correct(variables: &VariableStore) -> bool {
    let mut checked = false;
    for (_, variable) in variables.iter() {
        if variable.declaration.kind != VariableKind::Response {
            continue;
        }
        if let Some(ref correct) = variable.declaration.correct_response {
            checked = true;
            if !variable.value.as_ref().map_or(false, |v| v.qti_eq(correct)) {
                return false;
            }
        }
    }
    checked
}

/// Single-choice item: `RESPONSE` (correct `ChoiceA`), `SCORE`, `PASSED`.
pub(crate) fn choice_item(identifier: &str) -> AssessmentItemRef {
    AssessmentItemRef::new(identifier)
        .with_variable(
            VariableDeclaration::response("RESPONSE", Cardinality::Single, BaseType::Identifier)
                .with_correct_response(Value::identifier("ChoiceA")),
        )
        .with_variable(
            VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                .with_default(Value::float(0.0)),
        )
        .with_variable(
            VariableDeclaration::outcome("PASSED", Cardinality::Single, BaseType::Boolean)
                .with_default(Value::boolean(false)),
        )
        .with_response_processing(Processing::new(["match_correct SCORE", "match_correct PASSED"]))
}

/// One linear part, one section, the given items.
pub(crate) fn linear_test(items: Vec<AssessmentItemRef>) -> Arc<AssessmentTest> {
    Arc::new(AssessmentTest::new("T01").with_test_part(
        TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
            .with_section(AssessmentSection::new("S01").with_items(items)),
    ))
}

pub(crate) fn route_item(identifier: &str) -> RouteItem {
    route_item_from(AssessmentItemRef::new(identifier))
}

pub(crate) fn route_item_from(item_ref: AssessmentItemRef) -> RouteItem {
    RouteItem::new(
        Arc::new(item_ref),
        vec![Arc::new(AssessmentSection::new("S01"))],
        Arc::new(TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)),
        Arc::new(AssessmentTest::new("T01")),
    )
}
