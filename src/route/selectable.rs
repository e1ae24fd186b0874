//! SelectableRoute - a child route as seen by its parent section's
//! selection and ordering.

use super::{Route, RouteItem};

/// A route carrying the flags selection and ordering act on.
#[derive(Debug, Clone)]
pub struct SelectableRoute {
    route: Route,
    fixed: bool,
    required: bool,
    visible: bool,
    keep_together: bool,
}

/// Children of one section, in document order until ordering runs.
pub type SelectableRouteCollection = Vec<SelectableRoute>;

impl SelectableRoute {
    pub fn new(
        route: Route,
        fixed: bool,
        required: bool,
        visible: bool,
        keep_together: bool,
    ) -> Self {
        Self {
            route,
            fixed,
            required,
            visible,
            keep_together,
        }
    }

    /// Single-item route; flags come from the item reference.
    pub fn from_item(item: RouteItem) -> Self {
        let fixed = item.item_ref().fixed;
        let required = item.item_ref().required;
        let mut route = Route::new();
        route.add_route_item(item);
        Self::new(route, fixed, required, true, true)
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn into_route(self) -> Route {
        self.route
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn keeps_together(&self) -> bool {
        self.keep_together
    }

    /// Invisible children that don't keep together dissolve into their
    /// items when the parent shuffles.
    pub fn dissolves_on_shuffle(&self) -> bool {
        !self.visible && !self.keep_together
    }
}
