//! Session integration tests - drives test sessions end to end with a mocked
//! rule evaluator and checks when processing happens.

mod common;

use std::time::Duration;

use chrono::Utc;
use mockall::mock;
use pretty_assertions::assert_eq;

use common::{answer, choice_item, items, single_part_test, VariableEvaluator};
use qti_delivery::definition::{
    AssessmentSection, Expression, ItemSessionControl, NavigationMode, Processing, SubmissionMode,
    TimeLimits,
};
use qti_delivery::evaluator::{EvaluationError, RuleEvaluator};
use qti_delivery::session::{
    AssessmentItemSessionState, AssessmentTestSessionState, CompletionStatus, SessionManager,
};
use qti_delivery::types::{AttemptErrorKind, DeliveryConfig};
use qti_delivery::variables::{Value, VariableStore};

mock! {
    pub Evaluator {}

    impl RuleEvaluator for Evaluator {
        fn evaluate_pure(&self, expression: &Expression) -> Result<Option<bool>, EvaluationError>;
        fn evaluate(
            &self,
            expression: &Expression,
            variables: &VariableStore,
        ) -> Result<bool, EvaluationError>;
        fn run_response_processing(
            &self,
            processing: &Processing,
            variables: &mut VariableStore,
        ) -> Result<(), EvaluationError>;
        fn run_template_processing(
            &self,
            processing: &Processing,
            variables: &mut VariableStore,
        ) -> Result<(), EvaluationError>;
    }
}

fn scoring_mock(expected_runs: usize) -> MockEvaluator {
    let mut evaluator = MockEvaluator::new();
    evaluator.expect_evaluate_pure().returning(|_| Ok(None));
    evaluator.expect_evaluate().returning(|_, _| Ok(true));
    evaluator.expect_run_template_processing().returning(|_, _| Ok(()));
    evaluator
        .expect_run_response_processing()
        .times(expected_runs)
        .returning(|_, variables| {
            variables
                .set("SCORE", Some(Value::float(1.0)))
                .map_err(|e| EvaluationError::Processing(e.to_string()))
        });
    evaluator
}

#[test]
fn test_individual_part_processes_every_attempt() {
    let test = single_part_test(
        NavigationMode::Linear,
        SubmissionMode::Individual,
        AssessmentSection::new("S1").with_items(items("Q", 2)),
    );
    let mut session = SessionManager::default()
        .create_test_session(test, scoring_mock(2))
        .unwrap();
    session.begin_test_session().unwrap();

    for _ in 0..2 {
        session.begin_attempt().unwrap();
        session.end_attempt(answer("ChoiceA")).unwrap();
        let item = session.current_item_session().unwrap();
        assert_eq!(item.state(), AssessmentItemSessionState::Closed);
        assert!(item.variables().equals("SCORE", &Value::float(1.0)));
        session.move_next().unwrap();
    }

    assert_eq!(session.state(), AssessmentTestSessionState::Closed);
}

#[test]
fn test_simultaneous_part_defers_processing_to_part_end() {
    let test = single_part_test(
        NavigationMode::Nonlinear,
        SubmissionMode::Simultaneous,
        AssessmentSection::new("S1").with_item(choice_item("Q1")),
    );
    let mut session = SessionManager::default()
        .create_test_session(test, scoring_mock(1))
        .unwrap();
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session.end_attempt(answer("ChoiceB")).unwrap();
    assert_eq!(
        session.current_item_session().unwrap().state(),
        AssessmentItemSessionState::Suspended
    );

    session.end_test_session().unwrap();
    let item = session.item_sessions().get("Q1", 0).unwrap();
    assert_eq!(item.state(), AssessmentItemSessionState::Closed);
    assert!(item.variables().equals("SCORE", &Value::float(1.0)));
}

#[test]
fn test_nonlinear_revisit_resumes_suspended_item() {
    let test = single_part_test(
        NavigationMode::Nonlinear,
        SubmissionMode::Individual,
        AssessmentSection::new("S1")
            .with_item_session_control(ItemSessionControl {
                max_attempts: 0,
                ..ItemSessionControl::default()
            })
            .with_items(items("Q", 3)),
    );
    let mut session = SessionManager::default()
        .create_test_session(test, VariableEvaluator)
        .unwrap();
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session.jump_to(2).unwrap();
    assert_eq!(
        session.item_sessions().get("Q1", 0).unwrap().state(),
        AssessmentItemSessionState::Suspended
    );

    session.jump_to(0).unwrap();
    let q1 = session.current_item_session().unwrap();
    assert_eq!(q1.state(), AssessmentItemSessionState::Interacting);
    assert_eq!(q1.num_attempts(), 1);

    session.end_attempt(answer("ChoiceA")).unwrap();
    let q1 = session.current_item_session().unwrap();
    assert_eq!(q1.state(), AssessmentItemSessionState::Suspended);
    assert_eq!(q1.completion_status(), CompletionStatus::Completed);
}

#[test]
fn test_item_time_limit_closes_session() {
    let test = single_part_test(
        NavigationMode::Linear,
        SubmissionMode::Individual,
        AssessmentSection::new("S1").with_item(
            choice_item("Q1").with_time_limits(TimeLimits::with_max_time(Duration::from_secs(30))),
        ),
    );
    let mut session = SessionManager::default()
        .create_test_session(test, VariableEvaluator)
        .unwrap();
    session.begin_test_session().unwrap();

    let t0 = Utc::now();
    session.set_time(t0).unwrap();
    session.begin_attempt().unwrap();
    session.set_time(t0 + chrono::Duration::seconds(45)).unwrap();

    let item = session.current_item_session().unwrap();
    assert!(item.max_time_reached());
    assert_eq!(item.state(), AssessmentItemSessionState::Closed);

    let err = session.end_attempt(answer("ChoiceA")).unwrap_err();
    assert_eq!(err.attempt_kind(), Some(AttemptErrorKind::DurationOverflow));
}

#[test]
fn test_seeded_delivery_is_reproducible() {
    let config = DeliveryConfig {
        shuffle_seed: Some(11),
        ..DeliveryConfig::default()
    };
    let build = || {
        let test = single_part_test(
            NavigationMode::Linear,
            SubmissionMode::Individual,
            AssessmentSection::new("S1")
                .with_items(items("Q", 6))
                .with_selection(4, false)
                .shuffled(),
        );
        SessionManager::new(config.clone())
            .create_test_session(test, VariableEvaluator)
            .unwrap()
    };

    let a = build();
    let b = build();
    assert_eq!(a.route().identifier_sequence(false), b.route().identifier_sequence(false));
    assert_eq!(a.route().len(), 4);
}
