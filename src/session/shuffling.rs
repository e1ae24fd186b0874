//! Per-session shuffle order of a shufflable interaction.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::definition::Shuffling;

/// Presentation order of one interaction's choices, drawn once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShufflingState {
    pub response_identifier: String,
    order: Vec<String>,
}

impl ShufflingState {
    /// Draw an order. Fixed choices stay in their declared slot.
    pub fn generate<R: Rng + ?Sized>(shuffling: &Shuffling, rng: &mut R) -> Self {
        let mut order: Vec<String> =
            shuffling.choices.iter().map(|c| c.identifier.clone()).collect();

        let slots: Vec<usize> = shuffling
            .choices
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.fixed)
            .map(|(i, _)| i)
            .collect();
        let mut loose: Vec<String> = slots.iter().map(|&i| order[i].clone()).collect();
        loose.shuffle(rng);
        for (slot, identifier) in slots.into_iter().zip(loose) {
            order[slot] = identifier;
        }

        Self {
            response_identifier: shuffling.response_identifier.clone(),
            order,
        }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn identifier_at(&self, position: usize) -> Option<&str> {
        self.order.get(position).map(String::as_str)
    }

    pub fn position_of(&self, identifier: &str) -> Option<usize> {
        self.order.iter().position(|c| c == identifier)
    }
}
