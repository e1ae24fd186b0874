//! AssessmentItemSessionStore - item sessions keyed by item reference and
//! occurrence.

use std::collections::BTreeMap;

use crate::types::{Error, Result};

use super::item_session::AssessmentItemSession;

#[derive(Debug, Clone, Default)]
pub struct AssessmentItemSessionStore {
    sessions: BTreeMap<String, BTreeMap<usize, AssessmentItemSession>>,
}

impl AssessmentItemSessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a session for `occurrence` of its item, replacing any previous one.
    pub fn add(&mut self, session: AssessmentItemSession, occurrence: usize) {
        self.sessions
            .entry(session.identifier().to_string())
            .or_default()
            .insert(occurrence, session);
    }

    pub fn has(&self, item_ref: &str, occurrence: usize) -> bool {
        self.sessions
            .get(item_ref)
            .map_or(false, |by_occurrence| by_occurrence.contains_key(&occurrence))
    }

    pub fn get(&self, item_ref: &str, occurrence: usize) -> Result<&AssessmentItemSession> {
        self.sessions
            .get(item_ref)
            .and_then(|by_occurrence| by_occurrence.get(&occurrence))
            .ok_or_else(|| missing(item_ref, occurrence))
    }

    pub fn get_mut(
        &mut self,
        item_ref: &str,
        occurrence: usize,
    ) -> Result<&mut AssessmentItemSession> {
        self.sessions
            .get_mut(item_ref)
            .and_then(|by_occurrence| by_occurrence.get_mut(&occurrence))
            .ok_or_else(|| missing(item_ref, occurrence))
    }

    pub fn has_multiple_occurrences(&self, item_ref: &str) -> bool {
        self.sessions
            .get(item_ref)
            .map_or(false, |by_occurrence| by_occurrence.len() > 1)
    }

    /// Sessions of one item reference, by occurrence.
    pub fn get_all_for_item_ref(&self, item_ref: &str) -> Result<Vec<&AssessmentItemSession>> {
        self.sessions
            .get(item_ref)
            .map(|by_occurrence| by_occurrence.values().collect())
            .ok_or_else(|| Error::not_found(format!("no item session for '{}'", item_ref)))
    }

    pub fn get_all(&self) -> Vec<&AssessmentItemSession> {
        self.sessions.values().flat_map(BTreeMap::values).collect()
    }

    /// `(item identifier, occurrence, session)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &AssessmentItemSession)> {
        self.sessions.iter().flat_map(|(identifier, by_occurrence)| {
            by_occurrence
                .iter()
                .map(move |(occurrence, session)| (identifier.as_str(), *occurrence, session))
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut AssessmentItemSession> {
        self.sessions.values_mut().flat_map(BTreeMap::values_mut)
    }

    pub fn len(&self) -> usize {
        self.sessions.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn missing(item_ref: &str, occurrence: usize) -> Error {
    Error::not_found(format!(
        "no item session for '{}' occurrence {}",
        item_ref, occurrence
    ))
}
