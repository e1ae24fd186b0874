//! Route integration tests - builds routes from test definitions through the
//! public API and checks linearization and branching analysis.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use common::{choice_item, items, VariableEvaluator};
use qti_delivery::definition::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, BranchRule, NavigationMode, PreCondition,
    SubmissionMode, TestPart,
};
use qti_delivery::route::{Route, RouteBuilder};
use qti_delivery::types::AuthoringErrorKind;

fn two_section_test() -> Arc<AssessmentTest> {
    Arc::new(
        AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(AssessmentSection::new("S1").with_items(items("A", 3)))
                .with_section(
                    AssessmentSection::new("S2")
                        .with_items(items("B", 4))
                        .with_selection(2, false),
                ),
        ),
    )
}

fn sequences(routes: &[Route]) -> Vec<Vec<String>> {
    routes.iter().map(|r| r.identifier_sequence(false)).collect()
}

#[test]
fn test_selection_limits_route_length() {
    let route = RouteBuilder::seeded(3).build(&two_section_test()).unwrap();

    assert_eq!(route.len(), 5);
    assert_eq!(
        route.identifier_sequence(false)[..3],
        ["A1".to_string(), "A2".to_string(), "A3".to_string()]
    );
    assert_eq!(route.positions_of_section("S2").len(), 2);
    for item in route.route_items_by_section("S2").unwrap() {
        assert!(item.identifier().starts_with('B'));
    }
    assert_eq!(route.test_part_identifiers(), ["P01".to_string()]);
}

#[test]
fn test_multi_part_route_boundaries() {
    let test = Arc::new(
        AssessmentTest::new("T01")
            .with_test_part(
                TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                    .with_section(AssessmentSection::new("S1").with_items(items("A", 2))),
            )
            .with_test_part(
                TestPart::new("P02", NavigationMode::Nonlinear, SubmissionMode::Simultaneous)
                    .with_section(AssessmentSection::new("S2").with_items(items("B", 2))),
            ),
    );
    let mut route = RouteBuilder::seeded(0).build(&test).unwrap();

    assert!(route.is_first_of_test_part());
    route.next();
    assert!(route.is_last_of_test_part());
    route.next();
    assert!(route.is_first_of_test_part());
    assert!(route.is_in_test_part("P02"));
    assert_eq!(
        route.current().map(|i| i.submission_mode()),
        Some(SubmissionMode::Simultaneous)
    );
    route.next();
    assert!(route.is_last());
    route.next();
    assert!(!route.valid());
}

#[test]
fn test_branch_analysis_across_sections() {
    let test = Arc::new(
        AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(
                    AssessmentSection::new("S1")
                        .with_item(
                            choice_item("Q1").with_branch_rule(BranchRule::new("Q1.PASSED", "S3")),
                        )
                        .with_item(choice_item("Q2")),
                )
                .with_section(AssessmentSection::new("S2").with_item(choice_item("Q3")))
                .with_section(
                    AssessmentSection::new("S3")
                        .with_item(choice_item("Q4").with_pre_condition(PreCondition::new("false")))
                        .with_item(choice_item("Q5")),
                ),
        ),
    );
    let route = RouteBuilder::seeded(0).build(&test).unwrap();

    let routes = route.possible_routes(&VariableEvaluator).unwrap();
    assert_eq!(
        sequences(&routes),
        vec![
            vec!["Q1".to_string(), "Q2".into(), "Q3".into(), "Q5".into()],
            vec!["Q1".to_string(), "Q5".into()],
        ]
    );
    let shortest = route.shortest_routes(&VariableEvaluator, false).unwrap();
    assert_eq!(shortest.len(), 1);
    assert_eq!(shortest[0].len(), 2);
}

#[test]
fn test_branch_to_earlier_item_is_rejected() {
    let test = Arc::new(
        AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual).with_section(
                AssessmentSection::new("S1")
                    .with_item(AssessmentItemRef::new("Q1"))
                    .with_item(
                        AssessmentItemRef::new("Q2")
                            .with_branch_rule(BranchRule::new("true", "Q1")),
                    ),
            ),
        ),
    );
    let route = RouteBuilder::seeded(0).build(&test).unwrap();
    let err = route.possible_routes(&VariableEvaluator).unwrap_err();
    assert_eq!(err.authoring_kind(), Some(AuthoringErrorKind::BackwardBranching));
}

#[test]
fn test_route_serves_category_subsets() {
    let test = Arc::new(
        AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Nonlinear, SubmissionMode::Individual)
                .with_section(
                    AssessmentSection::new("S1")
                        .with_item(AssessmentItemRef::new("Q1").with_categories(["math"]))
                        .with_item(AssessmentItemRef::new("Q2").with_categories(["math", "hard"]))
                        .with_item(AssessmentItemRef::new("Q3").with_categories(["reading"])),
                ),
        ),
    );
    let route = RouteBuilder::seeded(0).build(&test).unwrap();

    assert_eq!(route.categories(), vec!["hard", "math", "reading"]);
    let easy_math: Vec<String> = route
        .item_refs_subset(Some("S1"), &["math"], &["hard"])
        .iter()
        .map(|i| i.identifier.clone())
        .collect();
    assert_eq!(easy_math, vec!["Q1".to_string()]);
}

fn shuffled_test(total: usize, select: usize, with_replacement: bool) -> Arc<AssessmentTest> {
    Arc::new(
        AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Nonlinear, SubmissionMode::Individual)
                .with_section(
                    AssessmentSection::new("S1")
                        .with_items((0..total).map(|i| AssessmentItemRef::new(format!("Q{}", i))))
                        .with_selection(select, with_replacement)
                        .shuffled(),
                ),
        ),
    )
}

proptest! {
    #[test]
    fn test_occurrences_number_repeated_refs(
        seed in any::<u64>(),
        total in 1usize..6,
        extra in 0usize..6,
    ) {
        let route = RouteBuilder::seeded(seed)
            .build(&shuffled_test(total, total + extra, true))
            .unwrap();
        prop_assert_eq!(route.len(), total + extra);

        let mut seen: HashMap<String, usize> = HashMap::new();
        for item in route.iter() {
            let count = seen.entry(item.identifier().to_string()).or_default();
            prop_assert_eq!(item.occurrence(), *count);
            *count += 1;
        }
        for (identifier, count) in &seen {
            prop_assert_eq!(route.occurrence_count(identifier), *count);
        }
    }

    #[test]
    fn test_same_seed_same_route(seed in any::<u64>(), total in 2usize..8) {
        let test = shuffled_test(total, total / 2 + 1, false);
        let a = RouteBuilder::seeded(seed).build(&test).unwrap();
        let b = RouteBuilder::seeded(seed).build(&test).unwrap();
        prop_assert_eq!(a.identifier_sequence(true), b.identifier_sequence(true));
        prop_assert_eq!(a.len(), total / 2 + 1);
    }
}
