//! Section ordering: shuffle unfixed children in place.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::definition::AssessmentSection;

use super::{SelectableRoute, SelectableRouteCollection};

/// Applies a section's ordering rule to its selected child routes.
#[derive(Debug)]
pub struct Orderer<'a> {
    section: &'a AssessmentSection,
}

impl<'a> Orderer<'a> {
    pub fn new(section: &'a AssessmentSection) -> Self {
        Self { section }
    }

    /// Shuffle when the section asks for it. Fixed children keep their
    /// slot; invisible children without keep-together are shuffled item by
    /// item among their siblings.
    pub fn order<R: Rng + ?Sized>(
        &self,
        children: SelectableRouteCollection,
        rng: &mut R,
    ) -> SelectableRouteCollection {
        if !self.section.is_shuffled() {
            return children;
        }

        let mut units: SelectableRouteCollection = Vec::with_capacity(children.len());
        for child in children {
            if child.dissolves_on_shuffle() {
                units.extend(
                    child
                        .into_route()
                        .into_items()
                        .into_iter()
                        .map(SelectableRoute::from_item),
                );
            } else {
                units.push(child);
            }
        }

        let slots: Vec<usize> = units
            .iter()
            .enumerate()
            .filter(|(_, unit)| !unit.is_fixed())
            .map(|(index, _)| index)
            .collect();
        let mut movable: Vec<SelectableRoute> =
            slots.iter().map(|&index| units[index].clone()).collect();
        movable.shuffle(rng);

        for (slot, unit) in slots.into_iter().zip(movable) {
            units[slot] = unit;
        }

        tracing::debug!(
            "section_shuffled: section={}, units={}",
            self.section.identifier,
            units.len()
        );
        units
    }
}
