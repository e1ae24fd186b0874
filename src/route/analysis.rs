//! Static route analysis: enumerate every route a candidate could take.
//!
//! Rules that a [`RuleEvaluator`] can decide statically are applied
//! directly; anything else forks the candidate set. Routes are handled as
//! lists of base-route positions and only materialised at the end.
//!
//! Three passes:
//! 1. preconditions remove never-reachable scopes and fork on conditional ones
//! 2. branch rules fork on conditional branches and validate targets
//! 3. always-true branches prune what they skip

use std::collections::HashSet;

use crate::definition::{BranchRule, BranchTarget, PreCondition};
use crate::evaluator::RuleEvaluator;
use crate::types::{AuthoringErrorKind, Error, Result};

use super::Route;

type Candidate = Vec<usize>;

enum Reachability {
    Always,
    Never,
    Conditional,
}

impl Route {
    /// Every distinct route reachable under some assignment of the
    /// non-static rules.
    pub fn possible_routes<E: RuleEvaluator + ?Sized>(&self, evaluator: &E) -> Result<Vec<Route>> {
        let candidates = self.possible_candidates(evaluator)?;
        Ok(self.materialise(&candidates))
    }

    /// Possible routes of minimal length. With `from_current`, only routes
    /// through the current position count, measured from there.
    pub fn shortest_routes<E: RuleEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        from_current: bool,
    ) -> Result<Vec<Route>> {
        let candidates = self.candidates_from(evaluator, from_current)?;
        let Some(min) = candidates.iter().map(Vec::len).min() else {
            return Ok(Vec::new());
        };
        let shortest: Vec<Candidate> = candidates.into_iter().filter(|c| c.len() == min).collect();
        Ok(self.materialise(&shortest))
    }

    /// Possible routes of maximal length. With `from_current`, only routes
    /// through the current position count, measured from there.
    pub fn longest_routes<E: RuleEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        from_current: bool,
    ) -> Result<Vec<Route>> {
        let candidates = self.candidates_from(evaluator, from_current)?;
        let Some(max) = candidates.iter().map(Vec::len).max() else {
            return Ok(Vec::new());
        };
        let longest: Vec<Candidate> = candidates.into_iter().filter(|c| c.len() == max).collect();
        Ok(self.materialise(&longest))
    }

    /// Where control goes when `target` fires from the item at `source`.
    /// `None` means the end of the route.
    ///
    /// Named targets must lie strictly after the source.
    pub fn branch_successor(&self, source: usize, target: &BranchTarget) -> Result<Option<usize>> {
        let item = self.get_route_item_at(source)?;

        let successor = match target {
            BranchTarget::ExitTest => None,
            BranchTarget::ExitTestPart => {
                let part = &item.test_part().identifier;
                self.test_part_identifiers()
                    .iter()
                    .skip_while(|p| *p != part)
                    .nth(1)
                    .and_then(|next| self.positions_of_test_part(next).first().copied())
            }
            BranchTarget::ExitSection => {
                let last = item
                    .innermost_section()
                    .and_then(|s| self.positions_of_section(&s.identifier).last().copied())
                    .unwrap_or(source);
                Some(last + 1).filter(|&next| next < self.len())
            }
            BranchTarget::Identifier(identifier) => {
                let index = self
                    .resolve_item_ref(identifier)
                    .or_else(|| self.positions_of_section(identifier).first().copied())
                    .or_else(|| self.positions_of_test_part(identifier).first().copied())
                    .ok_or_else(|| {
                        Error::authoring(
                            AuthoringErrorKind::UnknownTarget,
                            format!(
                                "branch rule of '{}' targets unknown '{}'",
                                item.identifier(),
                                identifier
                            ),
                        )
                    })?;

                if index == source {
                    return Err(Error::authoring(
                        AuthoringErrorKind::RecursiveBranching,
                        format!("'{}' branches to itself", item.identifier()),
                    ));
                }
                if index < source {
                    return Err(Error::authoring(
                        AuthoringErrorKind::BackwardBranching,
                        format!(
                            "'{}' branches backward to '{}'",
                            item.identifier(),
                            identifier
                        ),
                    ));
                }
                Some(index)
            }
        };

        Ok(successor)
    }

    fn candidates_from<E: RuleEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        from_current: bool,
    ) -> Result<Vec<Candidate>> {
        let candidates = self.possible_candidates(evaluator)?;
        if !from_current {
            return Ok(candidates);
        }

        let current = self.position();
        let suffixes = candidates
            .into_iter()
            .filter_map(|c| c.iter().position(|&i| i == current).map(|p| c[p..].to_vec()))
            .collect();
        Ok(dedup(suffixes))
    }

    fn possible_candidates<E: RuleEvaluator + ?Sized>(
        &self,
        evaluator: &E,
    ) -> Result<Vec<Candidate>> {
        let base: Candidate = (0..self.len()).collect();
        let (candidates, unreachable) = self.apply_pre_conditions(evaluator, vec![base])?;
        let (candidates, always) = self.apply_branch_rules(evaluator, candidates, &unreachable)?;
        let candidates = dedup(prune(candidates, &always));

        tracing::debug!(
            "routes_analysed: base_len={}, possible={}",
            self.len(),
            candidates.len()
        );
        Ok(candidates)
    }

    fn materialise(&self, candidates: &[Candidate]) -> Vec<Route> {
        candidates.iter().map(|c| self.sub_route(c)).collect()
    }

    /// Scopes gated by preconditions: test parts, sections, then items.
    fn pre_condition_scopes(&self) -> Vec<(&[PreCondition], Vec<usize>)> {
        let mut scopes = Vec::new();

        for part in self.test_part_identifiers() {
            let positions = self.positions_of_test_part(part);
            if let Some(&first) = positions.first() {
                let conditions = self.route_items()[first].test_part().pre_conditions.as_slice();
                scopes.push((conditions, positions.to_vec()));
            }
        }

        let mut seen = HashSet::new();
        for item in self.route_items() {
            for section in item.sections() {
                if seen.insert(section.identifier.as_str()) {
                    scopes.push((
                        section.pre_conditions.as_slice(),
                        self.positions_of_section(&section.identifier).to_vec(),
                    ));
                }
            }
        }

        for (index, item) in self.route_items().iter().enumerate() {
            scopes.push((item.item_ref().pre_conditions.as_slice(), vec![index]));
        }

        scopes
    }

    fn apply_pre_conditions<E: RuleEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        mut candidates: Vec<Candidate>,
    ) -> Result<(Vec<Candidate>, HashSet<usize>)> {
        let mut unreachable = HashSet::new();
        let mut conditional = Vec::new();

        for (conditions, positions) in self.pre_condition_scopes() {
            match classify(evaluator, conditions)? {
                Reachability::Always => {}
                Reachability::Never => unreachable.extend(positions),
                Reachability::Conditional => conditional.push(positions),
            }
        }

        for positions in conditional {
            let scope: HashSet<usize> = positions
                .into_iter()
                .filter(|p| !unreachable.contains(p))
                .collect();
            if scope.is_empty() {
                continue;
            }
            let mut forked = Vec::with_capacity(candidates.len() * 2);
            for candidate in candidates {
                if candidate.iter().any(|p| scope.contains(p)) {
                    let without: Candidate =
                        candidate.iter().copied().filter(|p| !scope.contains(p)).collect();
                    forked.push(candidate);
                    forked.push(without);
                } else {
                    forked.push(candidate);
                }
            }
            candidates = forked;
        }

        for candidate in &mut candidates {
            candidate.retain(|p| !unreachable.contains(p));
        }

        Ok((dedup(candidates), unreachable))
    }

    /// Branch rules leaving `position`: those the slot carries, plus the test
    /// part's when it closes the part.
    fn analysed_branch_rules(&self, position: usize) -> Vec<&BranchRule> {
        let item = &self.route_items()[position];
        let mut rules: Vec<&BranchRule> = item.branch_rules().iter().collect();
        if self.is_last_of_test_part_at(position) {
            rules.extend(item.test_part().branch_rules.iter());
        }
        rules
    }

    fn apply_branch_rules<E: RuleEvaluator + ?Sized>(
        &self,
        evaluator: &E,
        mut candidates: Vec<Candidate>,
        unreachable: &HashSet<usize>,
    ) -> Result<(Vec<Candidate>, Vec<(usize, Option<usize>)>)> {
        let mut always = Vec::new();

        for source in 0..self.len() {
            if unreachable.contains(&source) {
                continue;
            }

            for rule in self.analysed_branch_rules(source) {
                let successor = self.branch_successor(source, &rule.target)?;

                match evaluator.evaluate_pure(&rule.expression)? {
                    Some(false) => continue,
                    Some(true) => {
                        always.push((source, successor));
                        break;
                    }
                    None => {
                        let mut forks = Vec::new();
                        for candidate in &candidates {
                            if let Some(at) = candidate.iter().position(|&p| p == source) {
                                let mut fork = candidate[..=at].to_vec();
                                if let Some(next) = successor {
                                    let rest = candidate[at + 1..].iter().copied();
                                    fork.extend(rest.filter(|&p| p >= next));
                                }
                                forks.push(fork);
                            }
                        }
                        candidates.extend(forks);
                    }
                }
            }
        }

        Ok((candidates, always))
    }
}

/// A scope is statically settled only when every precondition is pure: any
/// false one rules it out, otherwise it is always presented. A single
/// variable-dependent precondition keeps the scope conditional.
fn classify<E: RuleEvaluator + ?Sized>(
    evaluator: &E,
    conditions: &[PreCondition],
) -> Result<Reachability> {
    let mut any_false = false;
    for condition in conditions {
        match evaluator.evaluate_pure(&condition.expression)? {
            Some(false) => any_false = true,
            Some(true) => {}
            None => return Ok(Reachability::Conditional),
        }
    }
    Ok(if any_false {
        Reachability::Never
    } else {
        Reachability::Always
    })
}

/// Drop what always-true branches skip over.
fn prune(mut candidates: Vec<Candidate>, always: &[(usize, Option<usize>)]) -> Vec<Candidate> {
    for &(source, successor) in always {
        for candidate in &mut candidates {
            let mut skipping = false;
            candidate.retain(|&p| {
                if p == source {
                    skipping = true;
                    return true;
                }
                if !skipping {
                    return true;
                }
                match successor {
                    Some(next) if p >= next => {
                        skipping = false;
                        true
                    }
                    _ => false,
                }
            });
        }
    }
    candidates
}

fn dedup(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{
        AssessmentItemRef, AssessmentSection, AssessmentTest, NavigationMode, SubmissionMode,
        TestPart,
    };
    use crate::route::RouteBuilder;
    use crate::testutil::{linear_test, LiteralEvaluator};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn sequences(routes: &[Route]) -> Vec<Vec<String>> {
        let mut out: Vec<Vec<String>> =
            routes.iter().map(|r| r.identifier_sequence(false)).collect();
        out.sort();
        out
    }

    fn build(items: Vec<AssessmentItemRef>) -> Route {
        RouteBuilder::seeded(1).build(&linear_test(items)).unwrap()
    }

    #[test]
    fn test_no_rules_single_route() {
        let route = build(vec![AssessmentItemRef::new("Q01"), AssessmentItemRef::new("Q02")]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(sequences(&routes), vec![vec!["Q01", "Q02"]]);
    }

    #[test]
    fn test_conditional_branch_forks() {
        let route = build(vec![
            AssessmentItemRef::new("Q01").with_branch_rule(BranchRule::new("flag", "Q03")),
            AssessmentItemRef::new("Q02"),
            AssessmentItemRef::new("Q03"),
        ]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(
            sequences(&routes),
            vec![vec!["Q01", "Q02", "Q03"], vec!["Q01", "Q03"]]
        );

        let shortest = route.shortest_routes(&LiteralEvaluator, false).unwrap();
        assert_eq!(sequences(&shortest), vec![vec!["Q01", "Q03"]]);
        let longest = route.longest_routes(&LiteralEvaluator, false).unwrap();
        assert_eq!(sequences(&longest), vec![vec!["Q01", "Q02", "Q03"]]);
    }

    #[test]
    fn test_always_true_branch_prunes() {
        let route = build(vec![
            AssessmentItemRef::new("Q01").with_branch_rule(BranchRule::new("true", "Q03")),
            AssessmentItemRef::new("Q02"),
            AssessmentItemRef::new("Q03"),
        ]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(sequences(&routes), vec![vec!["Q01", "Q03"]]);
    }

    #[test]
    fn test_always_false_branch_ignored() {
        let route = build(vec![
            AssessmentItemRef::new("Q01").with_branch_rule(BranchRule::new("false", "Q03")),
            AssessmentItemRef::new("Q02"),
            AssessmentItemRef::new("Q03"),
        ]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(sequences(&routes), vec![vec!["Q01", "Q02", "Q03"]]);
    }

    #[test]
    fn test_exit_test_branch() {
        let route = build(vec![
            AssessmentItemRef::new("Q01").with_branch_rule(BranchRule::new("true", "EXIT_TEST")),
            AssessmentItemRef::new("Q02"),
        ]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(sequences(&routes), vec![vec!["Q01"]]);
    }

    #[test]
    fn test_recursive_and_backward_branching_rejected() {
        let route = build(vec![
            AssessmentItemRef::new("Q01"),
            AssessmentItemRef::new("Q02").with_branch_rule(BranchRule::new("flag", "Q02")),
        ]);
        let err = route.possible_routes(&LiteralEvaluator).unwrap_err();
        assert_eq!(err.authoring_kind(), Some(AuthoringErrorKind::RecursiveBranching));

        let route = build(vec![
            AssessmentItemRef::new("Q01"),
            AssessmentItemRef::new("Q02").with_branch_rule(BranchRule::new("flag", "Q01")),
        ]);
        let err = route.possible_routes(&LiteralEvaluator).unwrap_err();
        assert_eq!(err.authoring_kind(), Some(AuthoringErrorKind::BackwardBranching));

        let route = build(vec![
            AssessmentItemRef::new("Q01").with_branch_rule(BranchRule::new("flag", "NOPE")),
        ]);
        let err = route.possible_routes(&LiteralEvaluator).unwrap_err();
        assert_eq!(err.authoring_kind(), Some(AuthoringErrorKind::UnknownTarget));
    }

    #[test]
    fn test_pre_conditions() {
        let route = build(vec![
            AssessmentItemRef::new("Q01"),
            AssessmentItemRef::new("Q02").with_pre_condition(PreCondition::new("false")),
            AssessmentItemRef::new("Q03").with_pre_condition(PreCondition::new("flag")),
        ]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(sequences(&routes), vec![vec!["Q01"], vec!["Q01", "Q03"]]);
    }

    #[test]
    fn test_variable_pre_condition_keeps_scope_conditional() {
        let route = build(vec![
            AssessmentItemRef::new("Q01"),
            AssessmentItemRef::new("Q02")
                .with_pre_condition(PreCondition::new("false"))
                .with_pre_condition(PreCondition::new("flag")),
            AssessmentItemRef::new("Q03"),
        ]);
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(
            sequences(&routes),
            vec![vec!["Q01", "Q02", "Q03"], vec!["Q01", "Q03"]]
        );
    }

    #[test]
    fn test_section_pre_condition_removes_whole_section() {
        let test = Arc::new(AssessmentTest::new("T01").with_test_part(
            TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                .with_section(
                    AssessmentSection::new("S01").with_item(AssessmentItemRef::new("Q01")),
                )
                .with_section(
                    AssessmentSection::new("S02")
                        .with_pre_condition(PreCondition::new("flag"))
                        .with_items(vec![
                            AssessmentItemRef::new("Q02"),
                            AssessmentItemRef::new("Q03"),
                        ]),
                ),
        ));
        let route = RouteBuilder::seeded(1).build(&test).unwrap();
        let routes = route.possible_routes(&LiteralEvaluator).unwrap();
        assert_eq!(sequences(&routes), vec![vec!["Q01"], vec!["Q01", "Q02", "Q03"]]);
    }

    #[test]
    fn test_from_current_keeps_suffix() {
        let mut route = build(vec![
            AssessmentItemRef::new("Q01"),
            AssessmentItemRef::new("Q02").with_branch_rule(BranchRule::new("flag", "Q04")),
            AssessmentItemRef::new("Q03"),
            AssessmentItemRef::new("Q04"),
        ]);
        route.set_position(1).unwrap();
        let shortest = route.shortest_routes(&LiteralEvaluator, true).unwrap();
        assert_eq!(sequences(&shortest), vec![vec!["Q02", "Q04"]]);
        let longest = route.longest_routes(&LiteralEvaluator, true).unwrap();
        assert_eq!(sequences(&longest), vec![vec!["Q02", "Q03", "Q04"]]);
    }

    #[test]
    fn test_exit_section_and_exit_test_part_successors() {
        let test = Arc::new(
            AssessmentTest::new("T01")
                .with_test_part(
                    TestPart::new("P01", NavigationMode::Linear, SubmissionMode::Individual)
                        .with_section(AssessmentSection::new("S01").with_items(vec![
                            AssessmentItemRef::new("Q01"),
                            AssessmentItemRef::new("Q02"),
                        ]))
                        .with_section(
                            AssessmentSection::new("S02").with_item(AssessmentItemRef::new("Q03")),
                        ),
                )
                .with_test_part(
                    TestPart::new("P02", NavigationMode::Linear, SubmissionMode::Individual)
                        .with_section(
                            AssessmentSection::new("S03").with_item(AssessmentItemRef::new("Q04")),
                        ),
                ),
        );
        let route = RouteBuilder::seeded(1).build(&test).unwrap();
        assert_eq!(route.branch_successor(0, &BranchTarget::ExitSection).unwrap(), Some(2));
        assert_eq!(route.branch_successor(0, &BranchTarget::ExitTestPart).unwrap(), Some(3));
        assert_eq!(route.branch_successor(3, &BranchTarget::ExitTestPart).unwrap(), None);
        assert_eq!(route.branch_successor(3, &BranchTarget::ExitSection).unwrap(), None);
        assert_eq!(route.branch_successor(0, &BranchTarget::ExitTest).unwrap(), None);
    }
}
