//! SessionManager - creates routes and sessions according to the delivery
//! configuration.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::definition::AssessmentTest;
use crate::evaluator::RuleEvaluator;
use crate::route::{Route, RouteBuilder, RouteItem};
use crate::types::{DeliveryConfig, Result};

use super::item_session::AssessmentItemSession;
use super::test_session::AssessmentTestSession;

#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    config: DeliveryConfig,
}

impl SessionManager {
    pub fn new(config: DeliveryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Random source for selection, ordering and choice shuffling; seeded
    /// when the configuration pins a seed.
    pub fn rng(&self) -> StdRng {
        match self.config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    pub fn create_route(&self, test: &Arc<AssessmentTest>) -> Result<Route> {
        RouteBuilder::with_rng(self.rng()).build(test)
    }

    /// A `NOT_SELECTED` item session for a route item, carrying the item
    /// session control inherited from the nearest scope.
    pub fn create_item_session<R: Rng + ?Sized>(
        &self,
        route_item: &RouteItem,
        rng: &mut R,
    ) -> AssessmentItemSession {
        let control = route_item
            .item_session_control()
            .map(|inherited| inherited.control)
            .unwrap_or_default();

        AssessmentItemSession::with_rng(
            Arc::clone(route_item.item_ref()),
            route_item.navigation_mode(),
            route_item.submission_mode(),
            rng,
        )
        .with_item_session_control(control)
        .with_time_limits(route_item.item_ref().time_limits.clone())
        .with_auto_template_processing(self.config.auto_template_processing)
        .with_consider_min_time(self.config.consider_min_time)
    }

    pub fn create_test_session<E: RuleEvaluator>(
        &self,
        test: Arc<AssessmentTest>,
        evaluator: E,
    ) -> Result<AssessmentTestSession<E>> {
        AssessmentTestSession::new(self.clone(), test, evaluator)
    }
}
