//! RouteBuilder - flattens an assessment test into a [`Route`].
//!
//! Each top-level section is walked with an explicit stack. A section is
//! visited twice: on entry its children are scheduled, on exit the routes
//! they produced are popped, selected, ordered and merged into one route
//! that stands for the section in its parent.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::definition::{AssessmentSection, AssessmentTest, SectionPart, TestPart};
use crate::types::{Error, Result};

use super::ordering::Orderer;
use super::selection::Selector;
use super::{Route, RouteItem, SelectableRoute};

enum Frame {
    Enter(SectionPart, Vec<Arc<AssessmentSection>>),
    Exit(Arc<AssessmentSection>),
}

/// Builds routes using its own random source for selection and shuffling.
#[derive(Debug)]
pub struct RouteBuilder<R = StdRng> {
    rng: R,
}

impl RouteBuilder<StdRng> {
    /// Deterministic builder: the same seed always yields the same route.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<R: Rng> RouteBuilder<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Flatten every test part of `test`, in document order.
    pub fn build(&mut self, test: &Arc<AssessmentTest>) -> Result<Route> {
        let mut route = Route::new();

        for part in &test.test_parts {
            let mut part_route = Route::new();
            for section in &part.sections {
                let section_route = self.build_section(test, part, section)?;
                part_route.append(section_route);
            }
            tracing::debug!(
                "test_part_routed: test_part={}, items={}",
                part.identifier,
                part_route.len()
            );
            route.append(part_route);
        }

        tracing::debug!(
            "route_built: test={}, items={}, test_parts={}",
            test.identifier,
            route.len(),
            test.test_parts.len()
        );
        Ok(route)
    }

    fn build_section(
        &mut self,
        test: &Arc<AssessmentTest>,
        part: &Arc<TestPart>,
        section: &Arc<AssessmentSection>,
    ) -> Result<Route> {
        let mut stack = vec![Frame::Enter(SectionPart::Section(Arc::clone(section)), Vec::new())];
        let mut results: Vec<SelectableRoute> = Vec::new();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Enter(SectionPart::Item(item_ref), path) => {
                    let item = RouteItem::new(item_ref, path, Arc::clone(part), Arc::clone(test));
                    results.push(SelectableRoute::from_item(item));
                }
                Frame::Enter(SectionPart::Section(current), path) => {
                    let mut child_path = path;
                    child_path.push(Arc::clone(&current));
                    stack.push(Frame::Exit(Arc::clone(&current)));
                    for child in current.children.iter().rev() {
                        stack.push(Frame::Enter(child.clone(), child_path.clone()));
                    }
                }
                Frame::Exit(current) => {
                    let count = current.children.len();
                    let children = results.split_off(results.len() - count);
                    let merged = self.merge_children(&current, children)?;
                    results.push(merged);
                }
            }
        }

        results
            .pop()
            .map(SelectableRoute::into_route)
            .ok_or_else(|| {
                Error::selection(format!("section '{}' produced no route", section.identifier))
            })
    }

    /// Select, order and concatenate a section's child routes, then attach
    /// the section's branch rules to its last item and its preconditions to
    /// its first.
    fn merge_children(
        &mut self,
        section: &Arc<AssessmentSection>,
        children: Vec<SelectableRoute>,
    ) -> Result<SelectableRoute> {
        let selected = Selector::new(section).select(children, &mut self.rng)?;
        let ordered = Orderer::new(section).order(selected, &mut self.rng);

        let mut route = Route::new();
        for child in ordered {
            route.append(child.into_route());
        }

        if let Some(last) = route.last_mut() {
            last.add_branch_rules(&section.branch_rules);
        }
        if let Some(first) = route.first_mut() {
            first.add_pre_conditions(&section.pre_conditions);
        }

        Ok(SelectableRoute::new(
            route,
            section.fixed,
            section.required,
            section.visible,
            section.keep_together,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{
        AssessmentItemRef, BranchRule, NavigationMode, PreCondition, SubmissionMode,
    };
    use pretty_assertions::assert_eq;

    fn items(ids: &[&str]) -> Vec<AssessmentItemRef> {
        ids.iter().map(|id| AssessmentItemRef::new(*id)).collect()
    }

    #[test]
    fn test_document_order_without_selection() {
        let test = Arc::new(
            AssessmentTest::new("T01")
                .with_test_part(
                    TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                        .with_section(
                            AssessmentSection::new("S01")
                                .with_item(AssessmentItemRef::new("Q01"))
                                .with_section(
                                    AssessmentSection::new("S02")
                                        .with_items(items(&["Q02", "Q03"])),
                                )
                                .with_item(AssessmentItemRef::new("Q04")),
                        ),
                )
                .with_test_part(
                    TestPart::new("P02", NavigationMode::Nonlinear, SubmissionMode::Simultaneous)
                        .with_section(AssessmentSection::new("S03").with_items(items(&["Q05"]))),
                ),
        );

        let route = RouteBuilder::seeded(1).build(&test).unwrap();
        assert_eq!(
            route.identifier_sequence(false),
            vec!["Q01", "Q02", "Q03", "Q04", "Q05"]
        );

        let q02 = &route.route_items()[1];
        let path: Vec<&str> = q02.sections().iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(path, vec!["S01", "S02"]);
        assert_eq!(route.route_items()[4].test_part().identifier, "P02");
    }

    #[test]
    fn test_section_rules_attach_to_boundary_items() {
        let test = Arc::new(AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual).with_section(
                AssessmentSection::new("S01")
                    .with_items(items(&["Q01", "Q02", "Q03"]))
                    .with_branch_rule(BranchRule::new("true", "EXIT_TEST"))
                    .with_pre_condition(PreCondition::new("false")),
            ),
        ));

        let route = RouteBuilder::seeded(1).build(&test).unwrap();
        let items = route.route_items();
        assert_eq!(items[0].pre_conditions().len(), 1);
        assert!(items[0].branch_rules().is_empty());
        assert!(items[1].pre_conditions().is_empty());
        assert_eq!(items[2].branch_rules().len(), 1);
    }

    #[test]
    fn test_empty_section_yields_empty_route() {
        let test = Arc::new(AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(
                    AssessmentSection::new("S01")
                        .with_branch_rule(BranchRule::new("true", "EXIT_TEST")),
                ),
        ));
        let route = RouteBuilder::seeded(1).build(&test).unwrap();
        assert!(route.is_empty());
    }

    #[test]
    fn test_same_seed_same_route() {
        let section = AssessmentSection::new("S01")
            .with_items(items(&["Q01", "Q02", "Q03", "Q04", "Q05", "Q06"]))
            .with_selection(4, false)
            .shuffled();
        let test = Arc::new(AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(section),
        ));

        let a = RouteBuilder::seeded(42).build(&test).unwrap();
        let b = RouteBuilder::seeded(42).build(&test).unwrap();
        assert_eq!(a.identifier_sequence(true), b.identifier_sequence(true));
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_selection_with_replacement_numbers_occurrences() {
        let section = AssessmentSection::new("S01")
            .with_items(items(&["Q01"]))
            .with_selection(3, true);
        let test = Arc::new(AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(section),
        ));

        let route = RouteBuilder::seeded(5).build(&test).unwrap();
        assert_eq!(route.identifier_sequence(true), vec!["Q01.1", "Q01.2", "Q01.3"]);
    }

    #[test]
    fn test_selection_error_propagates() {
        let section = AssessmentSection::new("S01")
            .with_items(items(&["Q01"]))
            .with_selection(2, false);
        let test = Arc::new(AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(section),
        ));
        assert!(matches!(
            RouteBuilder::seeded(5).build(&test),
            Err(Error::Selection(_))
        ));
    }
}
