//! AssessmentItemSession - the per-item attempt state machine.
//!
//! Guards run before any mutation, so a rejected call leaves counters and
//! variables as they were. Responses are staged on a copy of the variable
//! store, processed there, and only committed once validation, skipping
//! checks and response processing have all succeeded.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::definition::{
    AssessmentItemRef, ItemSessionControl, NavigationMode, ShowHide, SubmissionMode, TimeLimits,
};
use crate::evaluator::RuleEvaluator;
use crate::types::{AttemptErrorKind, Error, Result};
use crate::variables::{
    BaseType, Cardinality, Responses, Scalar, Value, VariableDeclaration, VariableKind,
    VariableStore,
};

use super::shuffling::ShufflingState;
use super::state::{AssessmentItemSessionState, CompletionStatus, RemainingAttempts};

pub const NUM_ATTEMPTS: &str = "numAttempts";
pub const DURATION: &str = "duration";
pub const COMPLETION_STATUS: &str = "completionStatus";

const BUILT_INS: [&str; 3] = [NUM_ATTEMPTS, DURATION, COMPLETION_STATUS];

fn is_built_in(identifier: &str) -> bool {
    BUILT_INS.contains(&identifier)
}

/// Runtime state of one item presentation.
#[derive(Debug, Clone)]
pub struct AssessmentItemSession {
    item_ref: Arc<AssessmentItemRef>,
    variables: VariableStore,
    state: AssessmentItemSessionState,
    navigation_mode: NavigationMode,
    submission_mode: SubmissionMode,
    control: ItemSessionControl,
    time_limits: Option<TimeLimits>,
    attempting: bool,
    shuffling_states: Vec<ShufflingState>,
    time_reference: Option<DateTime<Utc>>,
    auto_template_processing: bool,
    consider_min_time: bool,
}

impl AssessmentItemSession {
    /// New session in `NOT_SELECTED`, shuffle orders drawn from the thread RNG.
    pub fn new(
        item_ref: Arc<AssessmentItemRef>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
    ) -> Self {
        Self::with_rng(item_ref, navigation_mode, submission_mode, &mut rand::rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(
        item_ref: Arc<AssessmentItemRef>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
        rng: &mut R,
    ) -> Self {
        let mut variables = VariableStore::new();
        variables.declare(
            VariableDeclaration::response(NUM_ATTEMPTS, Cardinality::Single, BaseType::Integer)
                .with_default(Value::integer(0)),
        );
        variables.declare(
            VariableDeclaration::response(DURATION, Cardinality::Single, BaseType::Duration)
                .with_default(Value::duration(Duration::ZERO)),
        );
        variables.declare(
            VariableDeclaration::outcome(
                COMPLETION_STATUS,
                Cardinality::Single,
                BaseType::Identifier,
            )
            .with_default(Value::identifier(CompletionStatus::NotAttempted.as_str())),
        );
        for declaration in &item_ref.variables {
            if !is_built_in(&declaration.identifier) {
                variables.declare(declaration.clone());
            }
        }

        let shuffling_states = item_ref
            .shufflings
            .iter()
            .map(|s| ShufflingState::generate(s, rng))
            .collect();

        let control = item_ref.item_session_control.clone().unwrap_or_default();
        let time_limits = item_ref.time_limits.clone();

        Self {
            item_ref,
            variables,
            state: AssessmentItemSessionState::NotSelected,
            navigation_mode,
            submission_mode,
            control,
            time_limits,
            attempting: false,
            shuffling_states,
            time_reference: None,
            auto_template_processing: true,
            consider_min_time: true,
        }
    }

    /// Override the item session control, e.g. with one inherited from a section.
    pub fn with_item_session_control(mut self, control: ItemSessionControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_time_limits(mut self, time_limits: Option<TimeLimits>) -> Self {
        self.time_limits = time_limits;
        self
    }

    pub fn with_auto_template_processing(mut self, enabled: bool) -> Self {
        self.auto_template_processing = enabled;
        self
    }

    pub fn with_consider_min_time(mut self, enabled: bool) -> Self {
        self.consider_min_time = enabled;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn item_ref(&self) -> &Arc<AssessmentItemRef> {
        &self.item_ref
    }

    pub fn identifier(&self) -> &str {
        &self.item_ref.identifier
    }

    pub fn state(&self) -> AssessmentItemSessionState {
        self.state
    }

    pub fn is_attempting(&self) -> bool {
        self.attempting
    }

    pub fn navigation_mode(&self) -> NavigationMode {
        self.navigation_mode
    }

    pub fn submission_mode(&self) -> SubmissionMode {
        self.submission_mode
    }

    pub fn item_session_control(&self) -> &ItemSessionControl {
        &self.control
    }

    pub fn time_limits(&self) -> Option<&TimeLimits> {
        self.time_limits.as_ref()
    }

    pub fn shuffling_states(&self) -> &[ShufflingState] {
        &self.shuffling_states
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn time_reference(&self) -> Option<DateTime<Utc>> {
        self.time_reference
    }

    /// Set a single variable outside of an attempt, e.g. when restoring.
    pub fn set_variable(&mut self, identifier: &str, value: Option<Value>) -> Result<()> {
        self.variables.set(identifier, value)
    }

    pub fn num_attempts(&self) -> u32 {
        match self.variables.value(NUM_ATTEMPTS) {
            Some(Value::Single(Scalar::Integer(n))) => u32::try_from(*n).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn duration(&self) -> Duration {
        match self.variables.value(DURATION) {
            Some(Value::Single(Scalar::Duration(d))) => *d,
            _ => Duration::ZERO,
        }
    }

    pub fn completion_status(&self) -> CompletionStatus {
        self.variables
            .value(COMPLETION_STATUS)
            .and_then(|v| v.scalars().first())
            .and_then(Scalar::as_str)
            .and_then(CompletionStatus::from_identifier)
            .unwrap_or_default()
    }

    pub fn is_adaptive(&self) -> bool {
        self.item_ref.adaptive
    }

    /// Attempt limit in force. SIMULTANEOUS submission allows a single attempt.
    pub fn max_attempts(&self) -> u32 {
        match self.submission_mode {
            SubmissionMode::Simultaneous => 1,
            SubmissionMode::Individual => self.control.max_attempts,
        }
    }

    pub fn max_time_reached(&self) -> bool {
        self.max_time().map_or(false, |max| self.duration() >= max)
    }

    /// Time left before the item's maximum time, floored at zero.
    pub fn remaining_time(&self) -> Option<Duration> {
        self.max_time().map(|max| max.saturating_sub(self.duration()))
    }

    pub fn remaining_attempts(&self) -> RemainingAttempts {
        let completed = self.completion_status() == CompletionStatus::Completed;
        if self.is_adaptive() {
            return if completed {
                RemainingAttempts::Count(0)
            } else {
                RemainingAttempts::Unlimited
            };
        }

        let max = self.max_attempts();
        if max == 0 {
            RemainingAttempts::Unlimited
        } else if self.max_time_reached() {
            RemainingAttempts::Count(0)
        } else {
            RemainingAttempts::Count(max.saturating_sub(self.num_attempts()))
        }
    }

    /// Whether any response differs from its default.
    pub fn is_responded(&self) -> bool {
        if self.state == AssessmentItemSessionState::NotSelected {
            return false;
        }
        responded(&self.variables)
    }

    /// Whether every response with a declared correct response matches it.
    /// False before the first attempt or when nothing declares one.
    pub fn is_correct(&self) -> bool {
        if matches!(
            self.state,
            AssessmentItemSessionState::NotSelected | AssessmentItemSessionState::Initial
        ) {
            return false;
        }

        let mut checked = false;
        for (_, variable) in self.variables.iter() {
            if variable.declaration.kind != VariableKind::Response {
                continue;
            }
            let Some(ref correct) = variable.declaration.correct_response else {
                continue;
            };
            checked = true;
            let matches = variable.value.as_ref().map_or(false, |v| v.qti_eq(correct));
            if !matches {
                return false;
            }
        }
        checked
    }

    /// Whether a modal feedback should be presented for the current outcomes.
    pub fn must_show_feedback(&self) -> bool {
        if self.submission_mode == SubmissionMode::Simultaneous {
            return false;
        }
        if self.remaining_attempts().is_exhausted() && !self.control.show_feedback {
            return false;
        }

        self.item_ref.modal_feedback_rules.iter().any(|rule| {
            let needle = Scalar::Identifier(rule.identifier.clone());
            let matched = match self.variables.value(&rule.outcome_identifier) {
                Some(Value::Single(scalar)) => *scalar == needle,
                Some(container) => container.contains(&needle),
                None => false,
            };
            match rule.show_hide {
                ShowHide::Show => matched,
                ShowHide::Hide => !matched,
            }
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Make the session eligible: NULL every variable, apply template
    /// defaults, run template processing, then apply outcome defaults.
    pub fn begin_item_session<E: RuleEvaluator + ?Sized>(&mut self, evaluator: &E) -> Result<()> {
        if !matches!(
            self.state,
            AssessmentItemSessionState::NotSelected | AssessmentItemSessionState::Initial
        ) {
            return Err(Error::state_violation(format!(
                "cannot begin item session '{}' in state {}",
                self.identifier(),
                self.state
            )));
        }

        for identifier in self.user_identifiers(None) {
            self.variables.set(&identifier, None)?;
        }
        for identifier in self.user_identifiers(Some(VariableKind::Template)) {
            self.variables.reset_to_default(&identifier)?;
        }

        if self.auto_template_processing {
            if let Some(ref processing) = self.item_ref.template_processing {
                if !processing.is_empty() {
                    evaluator.run_template_processing(processing, &mut self.variables)?;
                }
            }
        }

        reset_outcomes(&mut self.variables)?;
        self.set_num_attempts(0)?;
        self.set_duration(Duration::ZERO)?;
        self.set_completion_status(CompletionStatus::NotAttempted)?;
        self.state = AssessmentItemSessionState::Initial;
        self.attempting = false;

        tracing::debug!("item_session_begun: item={}", self.identifier());
        Ok(())
    }

    /// Open a new attempt.
    pub fn begin_attempt(&mut self) -> Result<()> {
        match self.state {
            AssessmentItemSessionState::NotSelected
            | AssessmentItemSessionState::Review
            | AssessmentItemSessionState::Solution => {
                return Err(Error::state_violation(format!(
                    "cannot begin an attempt on '{}' in state {}",
                    self.identifier(),
                    self.state
                )));
            }
            AssessmentItemSessionState::Interacting if self.attempting => {
                return Err(Error::state_violation(format!(
                    "an attempt on '{}' is already open",
                    self.identifier()
                )));
            }
            AssessmentItemSessionState::Closed => self.check_reopenable()?,
            _ => {}
        }

        // A SIMULTANEOUS attempt stays open until the test part ends.
        if self.submission_mode == SubmissionMode::Simultaneous
            && self.num_attempts() > 0
            && self.state != AssessmentItemSessionState::Closed
        {
            self.state = AssessmentItemSessionState::Interacting;
            self.attempting = true;
            tracing::debug!("attempt_resumed: item={}", self.identifier());
            return Ok(());
        }

        if self.num_attempts() == 0 {
            for identifier in self.user_identifiers(Some(VariableKind::Response)) {
                self.variables.reset_to_default(&identifier)?;
            }
            self.set_duration(Duration::ZERO)?;
            self.set_completion_status(CompletionStatus::Unknown)?;
        }

        for identifier in &self.item_ref.end_attempt_identifiers {
            if self.variables.has(identifier) {
                self.variables.set(identifier, Some(Value::boolean(false)))?;
            }
        }

        let attempt = self.num_attempts() + 1;
        self.set_num_attempts(attempt)?;
        self.state = AssessmentItemSessionState::Interacting;
        self.attempting = true;

        tracing::debug!("attempt_begun: item={}, attempt={}", self.identifier(), attempt);
        Ok(())
    }

    /// Close the current attempt, optionally merging responses and running
    /// response processing.
    ///
    /// In SIMULTANEOUS submission, a call with `run_processing == false`
    /// stores responses only; processing happens when the test part ends.
    pub fn end_attempt<E: RuleEvaluator + ?Sized>(
        &mut self,
        evaluator: &E,
        responses: Option<Responses>,
        run_processing: bool,
        force_late: bool,
    ) -> Result<()> {
        match self.state {
            AssessmentItemSessionState::Interacting
            | AssessmentItemSessionState::Suspended
            | AssessmentItemSessionState::ModalFeedback => {}
            AssessmentItemSessionState::Closed if self.max_time_reached() => {
                let late_allowed = self
                    .time_limits
                    .as_ref()
                    .map_or(false, |tl| tl.allow_late_submission);
                if !late_allowed && !force_late {
                    return Err(self.reject(
                        AttemptErrorKind::DurationOverflow,
                        format!("maximum time of '{}' exceeded", self.identifier()),
                    ));
                }
            }
            _ => {
                return Err(Error::state_violation(format!(
                    "cannot end an attempt on '{}' in state {}",
                    self.identifier(),
                    self.state
                )));
            }
        }

        if self.state == AssessmentItemSessionState::Interacting && !self.min_time_respected() {
            self.state = AssessmentItemSessionState::Suspended;
            return Err(self.reject(
                AttemptErrorKind::DurationUnderflow,
                format!("minimum time of '{}' not reached", self.identifier()),
            ));
        }

        let mut staged = match responses {
            Some(responses) => self.stage_responses(responses)?,
            None => self.variables.clone(),
        };

        let externally_scored = staged.iter().any(|(_, v)| {
            v.declaration.kind == VariableKind::Outcome && v.declaration.external_scored.is_some()
        });
        let deferred = self.submission_mode == SubmissionMode::Simultaneous && !run_processing;
        let processed = run_processing && !externally_scored;

        if processed {
            if !self.is_adaptive() {
                reset_outcomes(&mut staged)?;
            }
            if let Some(ref processing) = self.item_ref.response_processing {
                if !processing.is_empty() {
                    evaluator.run_response_processing(processing, &mut staged)?;
                }
            }
        }
        self.variables = staged;

        let feedback = processed && self.must_show_feedback();
        self.settle_after_processing(feedback, deferred)?;

        if self.state != AssessmentItemSessionState::Closed {
            self.attempting = false;
            self.state = if feedback {
                AssessmentItemSessionState::ModalFeedback
            } else {
                AssessmentItemSessionState::Suspended
            };
        }

        tracing::debug!(
            "attempt_ended: item={}, attempt={}, processed={}, state={}",
            self.identifier(),
            self.num_attempts(),
            processed,
            self.state
        );
        Ok(())
    }

    /// Pause the session. From MODAL_FEEDBACK the session closes instead if
    /// no attempt is left.
    pub fn suspend(&mut self, responses: Option<Responses>) -> Result<()> {
        match self.state {
            AssessmentItemSessionState::ModalFeedback => {
                self.settle_after_processing(false, false)?;
                if self.state != AssessmentItemSessionState::Closed {
                    self.state = AssessmentItemSessionState::Suspended;
                }
            }
            AssessmentItemSessionState::Interacting => {
                if let Some(responses) = responses {
                    let staged = self.merge_responses(self.variables.clone(), responses)?;
                    self.variables = staged;
                }
                self.state = AssessmentItemSessionState::Suspended;
            }
            _ => {
                return Err(Error::state_violation(format!(
                    "cannot suspend '{}' in state {}",
                    self.identifier(),
                    self.state
                )));
            }
        }
        tracing::debug!("item_session_suspended: item={}", self.identifier());
        Ok(())
    }

    /// The candidate comes back to a suspended item.
    pub fn begin_candidate_session(&mut self) -> Result<()> {
        if self.state != AssessmentItemSessionState::Suspended {
            return Err(Error::state_violation(format!(
                "cannot resume '{}' in state {}",
                self.identifier(),
                self.state
            )));
        }
        self.state = AssessmentItemSessionState::Interacting;
        Ok(())
    }

    /// The candidate leaves an item mid-interaction. The attempt stays open
    /// and nothing is processed.
    pub fn end_candidate_session(&mut self) -> Result<()> {
        if self.state != AssessmentItemSessionState::Interacting {
            return Err(Error::state_violation(format!(
                "cannot leave '{}' in state {}",
                self.identifier(),
                self.state
            )));
        }
        self.state = AssessmentItemSessionState::Suspended;
        Ok(())
    }

    pub fn end_item_session(&mut self) -> Result<()> {
        if self.state == AssessmentItemSessionState::Interacting {
            self.suspend(None)?;
        }
        self.state = AssessmentItemSessionState::Closed;
        self.attempting = false;
        tracing::debug!("item_session_closed: item={}", self.identifier());
        Ok(())
    }

    /// Enter review of a closed session.
    pub fn review(&mut self) -> Result<()> {
        if self.state != AssessmentItemSessionState::Closed || !self.control.allow_review {
            return Err(Error::state_violation(format!(
                "review of '{}' is not allowed in state {}",
                self.identifier(),
                self.state
            )));
        }
        self.state = AssessmentItemSessionState::Review;
        Ok(())
    }

    /// Show the solution of a closed session.
    pub fn show_solution(&mut self) -> Result<()> {
        if self.state != AssessmentItemSessionState::Closed || !self.control.show_solution {
            return Err(Error::state_violation(format!(
                "solution of '{}' is not available in state {}",
                self.identifier(),
                self.state
            )));
        }
        self.state = AssessmentItemSessionState::Solution;
        Ok(())
    }

    /// Advance the session clock. Only time spent INTERACTING counts; reaching
    /// the maximum clamps the duration and closes the session.
    pub fn set_time(&mut self, now: DateTime<Utc>) -> Result<()> {
        if let Some(previous) = self.time_reference {
            if self.state == AssessmentItemSessionState::Interacting {
                let elapsed = (now - previous).to_std().unwrap_or_default();
                let mut duration = self.duration() + elapsed;

                if let Some(max) = self.max_time() {
                    if duration >= max {
                        duration = max;
                        self.set_duration(duration)?;
                        tracing::info!(
                            "item_time_exhausted: item={}, max_time={:?}",
                            self.identifier(),
                            max
                        );
                        self.end_item_session()?;
                        self.time_reference = Some(now);
                        return Ok(());
                    }
                }
                self.set_duration(duration)?;
            }
        }
        self.time_reference = Some(now);
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn max_time(&self) -> Option<Duration> {
        self.time_limits.as_ref().and_then(TimeLimits::max_time)
    }

    fn min_time_respected(&self) -> bool {
        if !self.consider_min_time || self.navigation_mode != NavigationMode::Linear {
            return true;
        }
        self.time_limits
            .as_ref()
            .and_then(TimeLimits::min_time)
            .map_or(true, |min| self.duration() >= min)
    }

    fn check_reopenable(&self) -> Result<()> {
        if self.max_time_reached() {
            return Err(self.reject(
                AttemptErrorKind::DurationOverflow,
                format!("maximum time of '{}' exceeded", self.identifier()),
            ));
        }
        if self.is_adaptive() && self.completion_status() == CompletionStatus::Completed {
            return Err(self.reject(
                AttemptErrorKind::AttemptsOverflow,
                format!("adaptive item '{}' is completed", self.identifier()),
            ));
        }
        let attempts = self.num_attempts();
        match self.submission_mode {
            SubmissionMode::Simultaneous if attempts > 0 => Err(self.reject(
                AttemptErrorKind::AttemptsOverflow,
                format!("'{}' already has its simultaneous attempt", self.identifier()),
            )),
            SubmissionMode::Individual
                if !self.is_adaptive()
                    && self.max_attempts() != 0
                    && attempts >= self.max_attempts() =>
            {
                Err(self.reject(
                    AttemptErrorKind::AttemptsOverflow,
                    format!(
                        "'{}' used {} of {} attempts",
                        self.identifier(),
                        attempts,
                        self.max_attempts()
                    ),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Close the session or mark completion once an attempt is done.
    fn settle_after_processing(&mut self, feedback: bool, deferred: bool) -> Result<()> {
        if self.is_adaptive() {
            if self.submission_mode == SubmissionMode::Individual
                && self.completion_status() == CompletionStatus::Completed
                && !feedback
            {
                self.end_item_session()?;
            }
            return Ok(());
        }

        if self.remaining_attempts().is_exhausted() {
            if !feedback && !deferred {
                self.end_item_session()?;
            }
            self.set_completion_status(CompletionStatus::Completed)?;
        } else if !deferred {
            self.set_completion_status(CompletionStatus::Completed)?;
        }
        Ok(())
    }

    /// Validate and merge responses on a copy of the store.
    fn stage_responses(&self, responses: Responses) -> Result<VariableStore> {
        let staged = self.merge_responses(self.variables.clone(), responses)?;

        if self.control.validate_responses {
            self.validate(&staged)?;
        }

        let has_responses = !self.user_identifiers(Some(VariableKind::Response)).is_empty();
        if !self.control.allow_skipping && has_responses && !responded(&staged) {
            return Err(self.reject(
                AttemptErrorKind::SkippingForbidden,
                format!("skipping '{}' is not allowed", self.identifier()),
            ));
        }

        Ok(staged)
    }

    fn merge_responses(
        &self,
        mut store: VariableStore,
        responses: Responses,
    ) -> Result<VariableStore> {
        for (identifier, value) in responses {
            if is_built_in(&identifier) {
                continue;
            }
            let is_response = store
                .get(&identifier)
                .map_or(false, |v| v.declaration.kind == VariableKind::Response);
            if !is_response {
                return Err(self.reject(
                    AttemptErrorKind::InvalidResponse,
                    format!("'{}' is not a response of '{}'", identifier, self.identifier()),
                ));
            }
            store.set(&identifier, value).map_err(|e| {
                self.reject(AttemptErrorKind::InvalidResponse, e.to_string())
            })?;
        }
        Ok(store)
    }

    fn validate(&self, store: &VariableStore) -> Result<()> {
        for constraint in &self.item_ref.response_validity_constraints {
            let identifier = &constraint.response_identifier;
            let size = u32::try_from(store.size(identifier)).unwrap_or(u32::MAX);

            if size < constraint.min_constraint
                || (constraint.max_constraint != 0 && size > constraint.max_constraint)
            {
                return Err(self.reject(
                    AttemptErrorKind::InvalidResponse,
                    format!(
                        "'{}' has {} values, expected {}..{}",
                        identifier, size, constraint.min_constraint, constraint.max_constraint
                    ),
                ));
            }

            let (Some(mask), Some(value)) = (&constraint.pattern_mask, store.value(identifier))
            else {
                continue;
            };
            let pattern = regex_lite::Regex::new(&format!("^(?:{})$", mask)).map_err(|e| {
                self.reject(
                    AttemptErrorKind::InvalidResponse,
                    format!("invalid pattern mask for '{}': {}", identifier, e),
                )
            })?;
            let mismatch = value.scalars().iter().any(|scalar| match scalar {
                Scalar::String(s) => !pattern.is_match(s),
                _ => false,
            });
            if mismatch {
                return Err(self.reject(
                    AttemptErrorKind::InvalidResponse,
                    format!("'{}' does not match its pattern mask", identifier),
                ));
            }
        }
        Ok(())
    }

    fn reject(&self, kind: AttemptErrorKind, message: String) -> Error {
        tracing::warn!(
            "attempt_rejected: item={}, kind={}, reason={}",
            self.identifier(),
            kind,
            message
        );
        Error::attempt_rejected(kind, message)
    }

    /// Declared identifiers excluding built-ins, optionally of one kind.
    fn user_identifiers(&self, kind: Option<VariableKind>) -> Vec<String> {
        self.variables
            .iter()
            .filter(|(id, v)| !is_built_in(id) && kind.map_or(true, |k| v.declaration.kind == k))
            .map(|(id, _)| id.to_string())
            .collect()
    }


    fn set_num_attempts(&mut self, attempts: u32) -> Result<()> {
        self.variables
            .set(NUM_ATTEMPTS, Some(Value::integer(i64::from(attempts))))
    }

    fn set_duration(&mut self, duration: Duration) -> Result<()> {
        self.variables.set(DURATION, Some(Value::duration(duration)))
    }

    fn set_completion_status(&mut self, status: CompletionStatus) -> Result<()> {
        self.variables
            .set(COMPLETION_STATUS, Some(Value::identifier(status.as_str())))
    }
}

/// Whether any non-built-in response is set to something other than its default.
fn responded(store: &VariableStore) -> bool {
    store.iter().any(|(identifier, variable)| {
        variable.declaration.kind == VariableKind::Response
            && !is_built_in(identifier)
            && !variable.is_null()
            && !variable.is_default()
    })
}

fn reset_outcomes(store: &mut VariableStore) -> Result<()> {
    let outcomes: Vec<String> = store
        .iter()
        .filter(|(identifier, v)| {
            !is_built_in(identifier) && v.declaration.kind == VariableKind::Outcome
        })
        .map(|(identifier, _)| identifier.to_string())
        .collect();
    for identifier in outcomes {
        store.reset_to_default(&identifier)?;
    }
    Ok(())
}
