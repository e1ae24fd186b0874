//! Route - the flattened, navigable sequence of item presentations.
//!
//! A route is built once per test session by the [`RouteBuilder`] and then
//! navigated. Only the cursor moves afterwards; the lookup indexes are
//! maintained incrementally as items are appended and never rebuilt.
//!
//! ```text
//!   position ─┐
//!             ▼
//!   [Q01.1][Q02.1][Q03.1][Q01.2] ... one-past-the-end
//!    └─ S01 ──────┘└─ S02 ──────┘
//!    └──────────── P01 ──────────┘
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::definition::{AssessmentItemRef, BranchRule, PreCondition};
use crate::types::{AuthoringErrorKind, Error, Result};

pub mod analysis;
pub mod builder;
pub mod control;
pub mod item;
pub mod ordering;
pub mod selectable;
pub mod selection;

pub use builder::RouteBuilder;
pub use control::{RouteItemSessionControl, RouteTimeLimits, Scope};
pub use item::RouteItem;
pub use ordering::Orderer;
pub use selectable::{SelectableRoute, SelectableRouteCollection};
pub use selection::Selector;

/// Ordered route items plus a cursor.
///
/// Invariants:
/// - `position` is a valid index or `len()` (one past the end).
/// - every item's occurrence is its 0-based rank among items sharing the
///   same item reference, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Route {
    items: Vec<RouteItem>,
    position: usize,
    occurrences: HashMap<String, usize>,
    by_item: HashMap<String, Vec<usize>>,
    by_section: HashMap<String, Vec<usize>>,
    by_test_part: HashMap<String, Vec<usize>>,
    by_category: BTreeMap<String, Vec<String>>,
    test_parts: Vec<String>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Append a route item, assigning its occurrence number.
    pub fn add_route_item(&mut self, mut item: RouteItem) {
        let index = self.items.len();
        let identifier = item.identifier().to_string();

        let count = self.occurrences.entry(identifier.clone()).or_insert(0);
        item.set_occurrence(*count);
        *count += 1;

        self.by_item.entry(identifier.clone()).or_default().push(index);

        for section in item.sections() {
            self.by_section
                .entry(section.identifier.clone())
                .or_default()
                .push(index);
        }

        let part = item.test_part().identifier.clone();
        if !self.by_test_part.contains_key(&part) {
            self.test_parts.push(part.clone());
        }
        self.by_test_part.entry(part).or_default().push(index);

        for category in &item.item_ref().categories {
            let items = self.by_category.entry(category.clone()).or_default();
            if !items.contains(&identifier) {
                items.push(identifier.clone());
            }
        }

        self.items.push(item);
    }

    /// Append every item of `other`, renumbering occurrences for this route.
    pub fn append(&mut self, other: Route) {
        for item in other.items {
            self.add_route_item(item);
        }
    }

    /// A new route made of the items at `indices`, in that order.
    pub fn sub_route(&self, indices: &[usize]) -> Route {
        let mut route = Route::new();
        for &index in indices {
            if let Some(item) = self.items.get(index) {
                route.add_route_item(item.clone());
            }
        }
        route
    }

    pub(crate) fn into_items(self) -> Vec<RouteItem> {
        self.items
    }

    pub(crate) fn first_mut(&mut self) -> Option<&mut RouteItem> {
        self.items.first_mut()
    }

    pub(crate) fn last_mut(&mut self) -> Option<&mut RouteItem> {
        self.items.last_mut()
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor. `len()` is accepted and means "route exhausted".
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.items.len() {
            return Err(Error::not_found(format!(
                "route position {} out of bounds (len={})",
                position,
                self.items.len()
            )));
        }
        self.position = position;
        Ok(())
    }

    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Whether the cursor points at a route item.
    pub fn valid(&self) -> bool {
        self.position < self.items.len()
    }

    pub fn current(&self) -> Option<&RouteItem> {
        self.items.get(self.position)
    }

    /// Advance the cursor; stays one-past-the-end once reached.
    pub fn next(&mut self) {
        if self.position < self.items.len() {
            self.position += 1;
        }
    }

    pub fn previous(&mut self) -> Result<()> {
        if self.position == 0 {
            return Err(Error::state_violation(
                "cannot move back from the first route item",
            ));
        }
        self.position -= 1;
        Ok(())
    }

    pub fn is_first(&self) -> bool {
        self.valid() && self.position == 0
    }

    pub fn is_last(&self) -> bool {
        self.valid() && self.position + 1 == self.items.len()
    }

    pub fn is_first_of_test_part(&self) -> bool {
        self.valid() && self.is_first_of_test_part_at(self.position)
    }

    pub fn is_last_of_test_part(&self) -> bool {
        self.valid() && self.is_last_of_test_part_at(self.position)
    }

    /// Whether the current item belongs to the given test part.
    pub fn is_in_test_part(&self, test_part: &str) -> bool {
        self.current()
            .map_or(false, |item| item.test_part().identifier == test_part)
    }

    /// Peek at the item after the cursor.
    pub fn get_next(&self) -> Option<&RouteItem> {
        self.items.get(self.position + 1)
    }

    /// Peek at the item before the cursor.
    pub fn get_previous(&self) -> Option<&RouteItem> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.items.get(index))
    }

    pub fn get_route_item_at(&self, position: usize) -> Result<&RouteItem> {
        self.items.get(position).ok_or_else(|| {
            Error::not_found(format!(
                "no route item at position {} (len={})",
                position,
                self.items.len()
            ))
        })
    }

    pub fn first_route_item(&self) -> Option<&RouteItem> {
        self.items.first()
    }

    pub fn last_route_item(&self) -> Option<&RouteItem> {
        self.items.last()
    }

    pub fn route_items(&self) -> &[RouteItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RouteItem> {
        self.items.iter()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn occurrence_count(&self, item_ref: &str) -> usize {
        self.occurrences.get(item_ref).copied().unwrap_or(0)
    }

    /// Test part identifiers in route order.
    pub fn test_part_identifiers(&self) -> &[String] {
        &self.test_parts
    }

    /// Categories used by the route's items, sorted.
    pub fn categories(&self) -> Vec<&str> {
        self.by_category.keys().map(String::as_str).collect()
    }

    pub fn route_items_by_test_part(&self, test_part: &str) -> Result<Vec<&RouteItem>> {
        self.collect_indexed(&self.by_test_part, test_part, "test part")
    }

    pub fn route_items_by_section(&self, section: &str) -> Result<Vec<&RouteItem>> {
        self.collect_indexed(&self.by_section, section, "section")
    }

    pub fn route_items_by_item_ref(&self, item_ref: &str) -> Result<Vec<&RouteItem>> {
        self.collect_indexed(&self.by_item, item_ref, "item reference")
    }

    /// Route positions of an item reference's occurrences.
    pub fn positions_of_item_ref(&self, item_ref: &str) -> &[usize] {
        self.by_item.get(item_ref).map_or(&[], Vec::as_slice)
    }

    /// Route positions of a section's items.
    pub fn positions_of_section(&self, section: &str) -> &[usize] {
        self.by_section.get(section).map_or(&[], Vec::as_slice)
    }

    /// Route positions of a test part's items.
    pub fn positions_of_test_part(&self, test_part: &str) -> &[usize] {
        self.by_test_part.get(test_part).map_or(&[], Vec::as_slice)
    }

    /// Distinct item references, in route order.
    pub fn item_refs(&self) -> Vec<Arc<AssessmentItemRef>> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter(|item| seen.insert(item.identifier().to_string()))
            .map(|item| Arc::clone(item.item_ref()))
            .collect()
    }

    pub fn item_refs_by_category(&self, category: &str) -> Vec<Arc<AssessmentItemRef>> {
        let Some(identifiers) = self.by_category.get(category) else {
            return Vec::new();
        };
        identifiers
            .iter()
            .filter_map(|id| self.by_item.get(id).and_then(|idx| idx.first()))
            .map(|&index| Arc::clone(self.items[index].item_ref()))
            .collect()
    }

    /// Distinct item references, optionally restricted to a section, keeping
    /// only items in at least one included category (when any are given) and
    /// in none of the excluded ones.
    pub fn item_refs_subset(
        &self,
        section: Option<&str>,
        include_categories: &[&str],
        exclude_categories: &[&str],
    ) -> Vec<Arc<AssessmentItemRef>> {
        self.item_refs()
            .into_iter()
            .filter(|item| {
                section.map_or(true, |s| {
                    self.positions_of_item_ref(&item.identifier)
                        .iter()
                        .any(|&index| self.items[index].is_in_section(s))
                })
            })
            .filter(|item| {
                include_categories.is_empty()
                    || item
                        .categories
                        .iter()
                        .any(|c| include_categories.contains(&c.as_str()))
            })
            .filter(|item| {
                !item
                    .categories
                    .iter()
                    .any(|c| exclude_categories.contains(&c.as_str()))
            })
            .collect()
    }

    /// `["Q01", "Q02", ...]`, or `["Q01.1", "Q02.1", "Q01.2", ...]` with
    /// sequence numbers.
    pub fn identifier_sequence(&self, with_sequence: bool) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.sequence_identifier(with_sequence))
            .collect()
    }

    fn collect_indexed(
        &self,
        index: &HashMap<String, Vec<usize>>,
        key: &str,
        what: &str,
    ) -> Result<Vec<&RouteItem>> {
        index
            .get(key)
            .map(|positions| positions.iter().map(|&i| &self.items[i]).collect())
            .ok_or_else(|| Error::not_found(format!("unknown {} '{}' in route", what, key)))
    }

    // =========================================================================
    // Scope boundaries
    // =========================================================================

    pub fn is_first_of_test_part_at(&self, position: usize) -> bool {
        self.items.get(position).map_or(false, |item| {
            self.positions_of_test_part(&item.test_part().identifier)
                .first()
                == Some(&position)
        })
    }

    pub fn is_last_of_test_part_at(&self, position: usize) -> bool {
        self.items.get(position).map_or(false, |item| {
            self.positions_of_test_part(&item.test_part().identifier)
                .last()
                == Some(&position)
        })
    }

    pub fn is_first_of_section(&self, position: usize, section: &str) -> bool {
        self.positions_of_section(section).first() == Some(&position)
    }

    pub fn is_last_of_section(&self, position: usize, section: &str) -> bool {
        self.positions_of_section(section).last() == Some(&position)
    }

    /// Branch rules eligible to fire when leaving the item at `position`.
    ///
    /// The item's own rules come first. Failing those, a section's rules
    /// apply only when the item closes that section, walking outward while
    /// each section is also the closing part of its parent. The test part's
    /// rules apply only to the very last item of the part.
    pub fn effective_branch_rules(&self, position: usize) -> Result<&[BranchRule]> {
        let item = self.get_route_item_at(position)?;

        if !item.item_ref().branch_rules.is_empty() {
            return Ok(&item.item_ref().branch_rules);
        }

        for section in item.sections().iter().rev() {
            if !self.is_last_of_section(position, &section.identifier) {
                return Ok(&[]);
            }
            if !section.branch_rules.is_empty() {
                return Ok(&section.branch_rules);
            }
        }

        if self.is_last_of_test_part_at(position) {
            return Ok(&item.test_part().branch_rules);
        }

        Ok(&[])
    }

    /// Preconditions gating the item at `position`: the test part's when the
    /// item opens the part, each section's (outermost first) when it opens
    /// that section, then the item's own.
    pub fn effective_pre_conditions(&self, position: usize) -> Result<Vec<&PreCondition>> {
        let item = self.get_route_item_at(position)?;
        let mut conditions = Vec::new();

        if self.is_first_of_test_part_at(position) {
            conditions.extend(item.test_part().pre_conditions.iter());
        }
        for section in item.sections() {
            if self.is_first_of_section(position, &section.identifier) {
                conditions.extend(section.pre_conditions.iter());
            }
        }
        conditions.extend(item.item_ref().pre_conditions.iter());

        Ok(conditions)
    }

    // =========================================================================
    // Branching
    // =========================================================================

    /// Resolve an item reference identifier, optionally suffixed with a
    /// 1-based occurrence (`Q01.2`), to a route position.
    pub fn resolve_item_ref(&self, identifier: &str) -> Option<usize> {
        if let Some(positions) = self.by_item.get(identifier) {
            return positions.first().copied();
        }
        let (base, suffix) = identifier.rsplit_once('.')?;
        let occurrence: usize = suffix.parse().ok()?;
        if occurrence == 0 {
            return None;
        }
        self.by_item
            .get(base)
            .and_then(|positions| positions.get(occurrence - 1))
            .copied()
    }

    /// Move the cursor to a named target.
    ///
    /// Item and section targets must lie in the current test part; a test
    /// part target must be a different test part.
    pub fn branch(&mut self, identifier: &str) -> Result<()> {
        let current_part = self
            .current()
            .map(|item| item.test_part().identifier.clone())
            .ok_or_else(|| Error::state_violation("cannot branch from an exhausted route"))?;

        let target = if let Some(position) = self.resolve_item_ref(identifier) {
            if self.items[position].test_part().identifier != current_part {
                return Err(Error::authoring(
                    AuthoringErrorKind::InvalidTarget,
                    format!(
                        "item '{}' is outside the current test part '{}'",
                        identifier, current_part
                    ),
                ));
            }
            position
        } else if let Some(&position) = self.positions_of_section(identifier).first() {
            if self.items[position].test_part().identifier != current_part {
                return Err(Error::authoring(
                    AuthoringErrorKind::InvalidTarget,
                    format!(
                        "section '{}' is outside the current test part '{}'",
                        identifier, current_part
                    ),
                ));
            }
            position
        } else if let Some(&position) = self.positions_of_test_part(identifier).first() {
            if identifier == current_part {
                return Err(Error::authoring(
                    AuthoringErrorKind::InvalidTarget,
                    format!("cannot branch to the current test part '{}'", identifier),
                ));
            }
            position
        } else {
            return Err(Error::authoring(
                AuthoringErrorKind::UnknownTarget,
                format!("unknown branch target '{}'", identifier),
            ));
        };

        tracing::debug!(
            "route_branched: target={}, from={}, to={}",
            identifier,
            self.position,
            target
        );
        self.position = target;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Route {
    type Item = &'a RouteItem;
    type IntoIter = std::slice::Iter<'a, RouteItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
