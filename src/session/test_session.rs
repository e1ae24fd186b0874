//! AssessmentTestSession - drives a candidate through a route.
//!
//! Owns the route, the item session store and the test-level outcomes.
//! Item sessions are created lazily on first visit unless the delivery
//! configuration asks for all of them up front.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::definition::{
    AssessmentTest, BranchRule, BranchTarget, NavigationMode, PreCondition, SubmissionMode,
    TestPart, TimeLimits,
};
use crate::evaluator::{all_hold, RuleEvaluator};
use crate::route::{Route, RouteBuilder, RouteItem, Scope};
use crate::types::{AttemptErrorKind, Error, Result, TestSessionId};
use crate::variables::{Responses, Value, VariableStore};

use super::item_session::AssessmentItemSession;
use super::manager::SessionManager;
use super::state::AssessmentItemSessionState;
use super::store::AssessmentItemSessionStore;
use super::time::TimeConstraint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentTestSessionState {
    #[default]
    Initial,
    Interacting,
    Closed,
}

/// A place the candidate may jump to.
#[derive(Debug, Clone)]
pub struct Jump {
    pub position: usize,
    pub route_item: RouteItem,
    pub state: AssessmentItemSessionState,
}

pub struct AssessmentTestSession<E> {
    id: TestSessionId,
    test: Arc<AssessmentTest>,
    route: Route,
    store: AssessmentItemSessionStore,
    manager: SessionManager,
    evaluator: E,
    state: AssessmentTestSessionState,
    outcomes: VariableStore,
    durations: HashMap<Scope, Duration>,
    time_reference: Option<DateTime<Utc>>,
    path: Vec<usize>,
    rng: StdRng,
}

impl<E> fmt::Debug for AssessmentTestSession<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentTestSession")
            .field("id", &self.id)
            .field("test", &self.test.identifier)
            .field("state", &self.state)
            .field("position", &self.route.position())
            .field("item_sessions", &self.store.len())
            .finish_non_exhaustive()
    }
}

impl<E: RuleEvaluator> AssessmentTestSession<E> {
    pub fn new(manager: SessionManager, test: Arc<AssessmentTest>, evaluator: E) -> Result<Self> {
        let mut rng = manager.rng();
        let route = RouteBuilder::with_rng(&mut rng).build(&test)?;

        let mut outcomes = VariableStore::new();
        for declaration in &test.outcomes {
            outcomes.declare(declaration.clone());
        }

        Ok(Self {
            id: TestSessionId::new(),
            test,
            route,
            store: AssessmentItemSessionStore::new(),
            manager,
            evaluator,
            state: AssessmentTestSessionState::Initial,
            outcomes,
            durations: HashMap::new(),
            time_reference: None,
            path: Vec::new(),
            rng,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> &TestSessionId {
        &self.id
    }

    pub fn test(&self) -> &Arc<AssessmentTest> {
        &self.test
    }

    pub fn state(&self) -> AssessmentTestSessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == AssessmentTestSessionState::Interacting
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn item_sessions(&self) -> &AssessmentItemSessionStore {
        &self.store
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn outcomes(&self) -> &VariableStore {
        &self.outcomes
    }

    pub fn set_outcome(&mut self, identifier: &str, value: Option<Value>) -> Result<()> {
        self.outcomes.set(identifier, value)
    }

    /// Positions visited so far, when path tracking is on.
    pub fn visited_path(&self) -> &[usize] {
        &self.path
    }

    pub fn current_route_item(&self) -> Option<&RouteItem> {
        self.route.current()
    }

    pub fn current_item_session(&self) -> Option<&AssessmentItemSession> {
        let item = self.route.current()?;
        self.store.get(item.identifier(), item.occurrence()).ok()
    }

    /// Elapsed candidate time at a test, test part or section scope.
    pub fn scope_duration(&self, scope: &Scope) -> Duration {
        self.durations.get(scope).copied().unwrap_or_default()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn begin_test_session(&mut self) -> Result<()> {
        if self.state != AssessmentTestSessionState::Initial {
            return Err(Error::state_violation(format!(
                "test session {} already begun",
                self.id
            )));
        }

        for identifier in self.test.outcomes.iter().map(|d| d.identifier.clone()) {
            self.outcomes.reset_to_default(&identifier)?;
        }
        if self.manager.config().initialize_all_items {
            for position in 0..self.route.len() {
                self.ensure_item_session(position)?;
            }
        }

        self.state = AssessmentTestSessionState::Interacting;
        self.route.rewind();

        tracing::info!(
            "test_session_begun: session={}, test={}, items={}",
            self.id,
            self.test.identifier,
            self.route.len()
        );

        self.skip_ineligible()?;
        self.enter_current()
    }

    /// Close every item session. Deferred responses of the current test
    /// part are processed first.
    pub fn end_test_session(&mut self) -> Result<()> {
        if self.state == AssessmentTestSessionState::Closed {
            return Ok(());
        }
        if let Some(part) = self.route.current().map(|item| Arc::clone(item.test_part())) {
            self.close_test_part(&part)?;
        }
        for session in self.store.iter_mut() {
            if session.state() != AssessmentItemSessionState::Closed {
                session.end_item_session()?;
            }
        }
        self.state = AssessmentTestSessionState::Closed;
        tracing::info!("test_session_closed: session={}", self.id);
        Ok(())
    }

    // =========================================================================
    // Attempts
    // =========================================================================

    pub fn begin_attempt(&mut self) -> Result<()> {
        self.require_running()?;
        self.check_time_limits()?;
        let (identifier, occurrence) = self.current_key()?;
        self.store.get_mut(&identifier, occurrence)?.begin_attempt()
    }

    /// End the current attempt. In SIMULTANEOUS test parts the responses
    /// are stored and processed when the part ends.
    pub fn end_attempt(&mut self, responses: Responses) -> Result<()> {
        self.require_running()?;
        let (identifier, occurrence) = self.current_key()?;
        let run_processing = self
            .route
            .current()
            .map_or(true, |item| item.submission_mode() == SubmissionMode::Individual);

        let session = self.store.get_mut(&identifier, occurrence)?;
        session.end_attempt(&self.evaluator, Some(responses), run_processing, false)
    }

    pub fn suspend(&mut self, responses: Option<Responses>) -> Result<()> {
        self.require_running()?;
        let (identifier, occurrence) = self.current_key()?;
        self.store.get_mut(&identifier, occurrence)?.suspend(responses)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Move forward, following the first branch rule that holds and skipping
    /// items whose preconditions fail.
    pub fn move_next(&mut self) -> Result<()> {
        self.require_running()?;
        let (from, from_part, linear) = {
            let item = self.current_item()?;
            (
                self.route.position(),
                Arc::clone(item.test_part()),
                item.navigation_mode() == NavigationMode::Linear,
            )
        };

        self.leave_current()?;

        let branched = if linear || self.manager.config().force_branching {
            self.follow_branch_rules(from)?
        } else {
            false
        };
        if !branched {
            self.route.next();
        }

        self.skip_ineligible()?;

        let left_part = self
            .route
            .current()
            .map_or(true, |item| item.test_part().identifier != from_part.identifier);
        if left_part {
            self.close_test_part(&from_part)?;
        }

        if self.manager.config().path_tracking {
            self.path.push(from);
        }
        self.enter_current()
    }

    /// Move to the previous item (or the previously visited one with path
    /// tracking). Nonlinear test parts only, never across test parts.
    pub fn move_back(&mut self) -> Result<()> {
        self.require_running()?;
        let item = self.current_item()?;
        if item.navigation_mode() == NavigationMode::Linear {
            return Err(Error::state_violation(format!(
                "cannot move back in linear test part '{}'",
                item.test_part().identifier
            )));
        }
        let part = item.test_part().identifier.clone();

        let target = if self.manager.config().path_tracking {
            self.path.last().copied()
        } else {
            self.route.position().checked_sub(1)
        };
        let target = target
            .filter(|&t| self.same_part(t, &part))
            .ok_or_else(|| Error::state_violation("no previous item in this test part"))?;

        self.leave_current()?;
        if self.manager.config().path_tracking {
            self.path.pop();
        }
        self.route.set_position(target)?;
        self.enter_current()
    }

    /// Jump to one of [`possible_jumps`](Self::possible_jumps).
    pub fn jump_to(&mut self, position: usize) -> Result<()> {
        self.require_running()?;
        if !self.possible_jumps().iter().any(|jump| jump.position == position) {
            return Err(Error::state_violation(format!(
                "jump to position {} is not allowed",
                position
            )));
        }

        let from = self.route.position();
        self.leave_current()?;
        self.route.set_position(position)?;
        if self.manager.config().path_tracking {
            self.path.push(from);
        }
        tracing::debug!("jumped: from={}, to={}", from, position);
        self.enter_current()
    }

    /// Items of the current test part the candidate may jump to. Empty in
    /// linear test parts unless jumps are always allowed.
    pub fn possible_jumps(&self) -> Vec<Jump> {
        if !self.is_running() {
            return Vec::new();
        }
        let Some(item) = self.route.current() else {
            return Vec::new();
        };
        if item.navigation_mode() == NavigationMode::Linear
            && !self.manager.config().always_allow_jumps
        {
            return Vec::new();
        }

        self.route
            .positions_of_test_part(&item.test_part().identifier)
            .iter()
            .map(|&position| {
                let route_item = &self.route.route_items()[position];
                let state = self
                    .store
                    .get(route_item.identifier(), route_item.occurrence())
                    .map_or(AssessmentItemSessionState::NotSelected, |s| s.state());
                Jump {
                    position,
                    route_item: route_item.clone(),
                    state,
                }
            })
            .collect()
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Advance the clock: elapsed time is added to the test, test part and
    /// section scopes of the current item, then forwarded to its session.
    pub fn set_time(&mut self, now: DateTime<Utc>) -> Result<()> {
        if let (Some(previous), true) = (self.time_reference, self.is_running()) {
            let elapsed = (now - previous).to_std().unwrap_or_default();
            let scopes: Vec<Scope> = self
                .route
                .current()
                .map(|item| self.enclosing_scopes(item).into_iter().map(|(s, _)| s).collect())
                .unwrap_or_default();
            for scope in scopes {
                *self.durations.entry(scope).or_default() += elapsed;
            }
        }
        self.time_reference = Some(now);

        if let Ok((identifier, occurrence)) = self.current_key() {
            if let Ok(session) = self.store.get_mut(&identifier, occurrence) {
                session.set_time(now)?;
            }
        }
        Ok(())
    }

    /// One constraint per scope of the current item, test scope first.
    pub fn time_constraints(&self) -> Vec<TimeConstraint> {
        let Some(item) = self.route.current() else {
            return Vec::new();
        };
        let mode = item.navigation_mode();
        let consider_min_time = self.manager.config().consider_min_time;

        let mut constraints: Vec<TimeConstraint> = self
            .enclosing_scopes(item)
            .into_iter()
            .map(|(scope, limits)| {
                let duration = self.scope_duration(&scope);
                TimeConstraint::new(scope, limits, duration, mode, consider_min_time)
            })
            .collect();

        let session = self.store.get(item.identifier(), item.occurrence()).ok();
        constraints.push(TimeConstraint::new(
            Scope::item(item.identifier()),
            item.item_ref().time_limits.clone(),
            session.map_or(Duration::ZERO, AssessmentItemSession::duration),
            mode,
            consider_min_time,
        ));
        constraints
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Test outcomes plus every item session's variables as `ITEM.VAR`,
    /// or `ITEM.N.VAR` for the N-th occurrence (N > 1).
    pub fn variable_snapshot(&self) -> VariableStore {
        let mut snapshot = self.outcomes.clone();
        for (identifier, occurrence, session) in self.store.iter() {
            let prefix = if occurrence == 0 {
                identifier.to_string()
            } else {
                format!("{}.{}", identifier, occurrence + 1)
            };
            snapshot.extend_prefixed(&prefix, session.variables());
        }
        snapshot
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_running(&self) -> Result<()> {
        if !self.is_running() {
            return Err(Error::state_violation(format!(
                "test session {} is not running (state {:?})",
                self.id, self.state
            )));
        }
        Ok(())
    }

    fn current_item(&self) -> Result<&RouteItem> {
        self.route
            .current()
            .ok_or_else(|| Error::state_violation("route is exhausted"))
    }

    fn current_key(&self) -> Result<(String, usize)> {
        self.current_item()
            .map(|item| (item.identifier().to_string(), item.occurrence()))
    }

    fn same_part(&self, position: usize, part: &str) -> bool {
        self.route
            .get_route_item_at(position)
            .map_or(false, |item| item.test_part().identifier == part)
    }

    fn enclosing_scopes(&self, item: &RouteItem) -> Vec<(Scope, Option<TimeLimits>)> {
        let mut scopes = vec![
            (Scope::test(&self.test.identifier), self.test.time_limits.clone()),
            (
                Scope::test_part(&item.test_part().identifier),
                item.test_part().time_limits.clone(),
            ),
        ];
        scopes.extend(
            item.sections()
                .iter()
                .map(|s| (Scope::section(&s.identifier), s.time_limits.clone())),
        );
        scopes
    }

    /// Reject new attempts once a test, test part or section ran out of time.
    fn check_time_limits(&self) -> Result<()> {
        let item_scope = Scope::item(self.current_item()?.identifier());
        for constraint in self.time_constraints() {
            if constraint.source == item_scope {
                continue;
            }
            if !constraint.max_time_respected() && !constraint.allows_late_submission() {
                tracing::warn!(
                    "attempt_rejected: session={}, scope={}, kind={}",
                    self.id,
                    constraint.source,
                    AttemptErrorKind::DurationOverflow
                );
                return Err(Error::attempt_rejected(
                    AttemptErrorKind::DurationOverflow,
                    format!("maximum time of {} exceeded", constraint.source),
                ));
            }
        }
        Ok(())
    }

    fn ensure_item_session(&mut self, position: usize) -> Result<()> {
        let item = self.route.get_route_item_at(position)?;
        if self.store.has(item.identifier(), item.occurrence()) {
            return Ok(());
        }
        let occurrence = item.occurrence();
        let mut session = self.manager.create_item_session(item, &mut self.rng);
        session.begin_item_session(&self.evaluator)?;
        self.store.add(session, occurrence);
        Ok(())
    }

    fn enter_current(&mut self) -> Result<()> {
        if !self.route.valid() {
            return self.end_test_session();
        }

        let position = self.route.position();
        self.ensure_item_session(position)?;
        let (identifier, occurrence) = self.current_key()?;
        let session = self.store.get_mut(&identifier, occurrence)?;

        if let Some(now) = self.time_reference {
            session.set_time(now)?;
        }
        if session.state() == AssessmentItemSessionState::Suspended {
            session.begin_candidate_session()?;
        }

        tracing::debug!(
            "item_entered: session={}, position={}, item={}",
            self.id,
            position,
            identifier
        );
        Ok(())
    }

    fn leave_current(&mut self) -> Result<()> {
        let Ok((identifier, occurrence)) = self.current_key() else {
            return Ok(());
        };
        let Ok(session) = self.store.get_mut(&identifier, occurrence) else {
            return Ok(());
        };
        match session.state() {
            AssessmentItemSessionState::Interacting => session.end_candidate_session(),
            AssessmentItemSessionState::ModalFeedback => session.suspend(None),
            _ => Ok(()),
        }
    }

    fn follow_branch_rules(&mut self, from: usize) -> Result<bool> {
        let rules: Vec<BranchRule> = self.route.effective_branch_rules(from)?.to_vec();
        if rules.is_empty() {
            return Ok(false);
        }

        let snapshot = self.variable_snapshot();
        for rule in &rules {
            if !self.evaluator.evaluate(&rule.expression, &snapshot)? {
                continue;
            }
            match &rule.target {
                BranchTarget::Identifier(identifier) => self.route.branch(identifier)?,
                target => {
                    let next = self.route.branch_successor(from, target)?;
                    let len = self.route.len();
                    self.route.set_position(next.unwrap_or(len))?;
                }
            }
            tracing::debug!(
                "branch_taken: session={}, from={}, target={}",
                self.id,
                from,
                rule.target
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn conditions_hold(
        &self,
        conditions: &[PreCondition],
        snapshot: &VariableStore,
    ) -> Result<bool> {
        if conditions.is_empty() {
            return Ok(true);
        }
        Ok(all_hold(
            &self.evaluator,
            conditions.iter().map(|c| &c.expression),
            snapshot,
        )?)
    }

    /// Where delivery resumes when a precondition gating `position` fails:
    /// past the whole test part or section it opens, or past the item.
    /// `None` when every gate holds.
    fn gated_until(&self, position: usize) -> Result<Option<usize>> {
        let item = self.route.get_route_item_at(position)?;
        let snapshot = self.variable_snapshot();
        let past = |positions: &[usize]| positions.last().map_or(position, |&last| last) + 1;

        let part = item.test_part();
        if self.route.is_first_of_test_part_at(position)
            && !self.conditions_hold(&part.pre_conditions, &snapshot)?
        {
            return Ok(Some(past(self.route.positions_of_test_part(&part.identifier))));
        }
        for section in item.sections() {
            if self.route.is_first_of_section(position, &section.identifier)
                && !self.conditions_hold(&section.pre_conditions, &snapshot)?
            {
                return Ok(Some(past(self.route.positions_of_section(&section.identifier))));
            }
        }
        if !self.conditions_hold(&item.item_ref().pre_conditions, &snapshot)? {
            return Ok(Some(position + 1));
        }
        Ok(None)
    }

    fn skip_ineligible(&mut self) -> Result<()> {
        let force = self.manager.config().force_preconditions;
        while let Some(item) = self.route.current() {
            if item.navigation_mode() != NavigationMode::Linear && !force {
                break;
            }
            let position = self.route.position();
            let Some(resume) = self.gated_until(position)? else {
                break;
            };
            tracing::debug!(
                "items_skipped: session={}, from={}, to={}",
                self.id,
                position,
                resume
            );
            self.route.set_position(resume)?;
        }
        Ok(())
    }

    /// Run deferred processing of a SIMULTANEOUS part, then close the
    /// part's item sessions.
    fn close_test_part(&mut self, part: &Arc<TestPart>) -> Result<()> {
        let deferred = part.submission_mode == SubmissionMode::Simultaneous;
        let positions = self.route.positions_of_test_part(&part.identifier).to_vec();

        for position in positions {
            let item = &self.route.route_items()[position];
            let Ok(session) = self.store.get_mut(item.identifier(), item.occurrence()) else {
                continue;
            };
            let pending = deferred
                && session.num_attempts() > 0
                && matches!(
                    session.state(),
                    AssessmentItemSessionState::Suspended | AssessmentItemSessionState::Interacting
                );
            if pending {
                session.end_attempt(&self.evaluator, None, true, true)?;
            }
            if session.state() != AssessmentItemSessionState::Closed {
                session.end_item_session()?;
            }
        }

        tracing::info!(
            "test_part_closed: session={}, test_part={}, deferred={}",
            self.id,
            part.identifier,
            deferred
        );
        Ok(())
    }
}
