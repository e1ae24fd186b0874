//! Section selection: pick N children, honouring `required`.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::definition::AssessmentSection;
use crate::types::{Error, Result};

use super::SelectableRouteCollection;

/// Applies a section's selection rule to its child routes.
#[derive(Debug)]
pub struct Selector<'a> {
    section: &'a AssessmentSection,
}

impl<'a> Selector<'a> {
    pub fn new(section: &'a AssessmentSection) -> Self {
        Self { section }
    }

    /// Select children. The result keeps document order; with replacement a
    /// child may appear several times.
    pub fn select<R: Rng + ?Sized>(
        &self,
        children: SelectableRouteCollection,
        rng: &mut R,
    ) -> Result<SelectableRouteCollection> {
        let Some(selection) = self.section.selection else {
            return Ok(children);
        };

        let wanted = selection.select;
        let available = children.len();
        let required: Vec<usize> = children
            .iter()
            .enumerate()
            .filter(|(_, child)| child.is_required())
            .map(|(index, _)| index)
            .collect();

        if required.len() > wanted {
            return Err(Error::selection(format!(
                "section '{}' selects {} children but {} are required",
                self.section.identifier,
                wanted,
                required.len()
            )));
        }

        let mut picks = required;
        if selection.with_replacement {
            if available == 0 && wanted > 0 {
                return Err(Error::selection(format!(
                    "section '{}' selects {} children from none",
                    self.section.identifier, wanted
                )));
            }
            while picks.len() < wanted {
                picks.push(rng.random_range(0..available));
            }
        } else {
            if wanted > available {
                return Err(Error::selection(format!(
                    "section '{}' selects {} children without replacement but has {}",
                    self.section.identifier, wanted, available
                )));
            }
            let mut pool: Vec<usize> = (0..available).filter(|i| !picks.contains(i)).collect();
            pool.shuffle(rng);
            let missing = wanted - picks.len();
            picks.extend(pool.into_iter().take(missing));
        }
        picks.sort_unstable();

        tracing::debug!(
            "section_selected: section={}, select={}, of={}",
            self.section.identifier,
            wanted,
            available
        );

        Ok(picks.into_iter().map(|index| children[index].clone()).collect())
    }
}
