//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use qti_delivery::definition::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, Expression, NavigationMode, Processing,
    SubmissionMode, TestPart,
};
use qti_delivery::evaluator::{EvaluationError, RuleEvaluator};
use qti_delivery::variables::{
    BaseType, Cardinality, Responses, Scalar, Value, VariableDeclaration, VariableKind,
    VariableStore,
};

/// `true`/`false` are static; anything else names a boolean variable.
/// Processing only knows `score VAR`: 1.0 when every response matches its
/// correct response.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariableEvaluator;

impl RuleEvaluator for VariableEvaluator {
    fn evaluate_pure(&self, expression: &Expression) -> Result<Option<bool>, EvaluationError> {
        Ok(match expression.source() {
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
        match variables.value(expression.source()) {
            Some(Value::Single(Scalar::Boolean(b))) => Ok(*b),
            Some(Value::Single(Scalar::Float(f))) => Ok(*f > 0.0),
            None => Ok(false),
            Some(_) => Err(EvaluationError::NotBoolean {
                expression: expression.source().to_string(),
            }),
        }
    }

    fn run_response_processing(
        &self,
        processing: &Processing,
        variables: &mut VariableStore,
    ) -> Result<(), EvaluationError> {
        for rule in &processing.rules {
            let Some(target) = rule.source().strip_prefix("score ") else {
                return Err(EvaluationError::Malformed {
                    expression: rule.source().to_string(),
                    reason: "unknown rule".to_string(),
                });
            };
            let correct = variables.iter().all(|(_, v)| {
                v.declaration.kind != VariableKind::Response
                    || v.declaration.correct_response.as_ref().map_or(true, |c| {
                        v.value.as_ref().map_or(false, |value| value.qti_eq(c))
                    })
            });
            variables
                .set(target, Some(Value::float(if correct { 1.0 } else { 0.0 })))
                .map_err(|e| EvaluationError::Processing(e.to_string()))?;
        }
        Ok(())
    }

    fn run_template_processing(
        &self,
        _processing: &Processing,
        _variables: &mut VariableStore,
    ) -> Result<(), EvaluationError> {
        Ok(())
    }
}

/// Choice item with `RESPONSE` (correct `ChoiceA`) and a float `SCORE`.
pub fn choice_item(identifier: &str) -> AssessmentItemRef {
    AssessmentItemRef::new(identifier)
        .with_variable(
            VariableDeclaration::response("RESPONSE", Cardinality::Single, BaseType::Identifier)
                .with_correct_response(Value::identifier("ChoiceA")),
        )
        .with_variable(
            VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                .with_default(Value::float(0.0)),
        )
        .with_response_processing(Processing::new(["score SCORE"]))
}

pub fn answer(choice: &str) -> Responses {
    Responses::from([("RESPONSE".to_string(), Some(Value::identifier(choice)))])
}

pub fn items(prefix: &str, count: usize) -> Vec<AssessmentItemRef> {
    (1..=count).map(|i| choice_item(&format!("{}{}", prefix, i))).collect()
}

pub fn single_part_test(
    mode: NavigationMode,
    submission: SubmissionMode,
    section: AssessmentSection,
) -> Arc<AssessmentTest> {
    Arc::new(
        AssessmentTest::new("T01")
            .with_test_part(TestPart::new("P01", mode, submission).with_section(section)),
    )
}
