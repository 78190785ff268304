//! Page-wide view state shared by every view.

use serde::Serialize;

use crate::graph::filter::{toggle, GraphFilter};
use crate::graph::ring::toggle_category;

/// Page-wide view state shared by every view.
///
/// Views read it in `update`; only the bridge mutates it, in response to user
/// input. Each setter reports whether anything changed so callers can skip
/// redundant redraws.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppState {
    /// The circular graph finished loading (primary or fallback data).
    pub graph_ready: bool,
    /// Normalized ingredient key, `None` for the default era view.
    pub active_ingredient: Option<String>,
    /// Selected graph node indices, in click order.
    pub selected_nodes: Vec<usize>,
    /// Selected category ring segment.
    pub ring_selection: Option<String>,
    pub map_category: Option<String>,
    pub reduced_motion: bool,
    pub tutorial_shown: bool,
}

impl AppState {
    pub fn new(reduced_motion: bool) -> Self {
        Self {
            reduced_motion,
            ..Default::default()
        }
    }

    pub fn graph_filter(&self) -> GraphFilter {
        GraphFilter::from_ingredient(self.active_ingredient.as_deref())
    }

    /// Switch the ingredient filter. A new filter clears node and ring
    /// selections, since they may no longer be visible.
    pub fn set_ingredient(&mut self, ingredient: Option<&str>) -> bool {
        let key = match GraphFilter::from_ingredient(ingredient) {
            GraphFilter::Ingredient(key) => Some(key),
            _ => None,
        };
        if key == self.active_ingredient {
            return false;
        }
        log::debug!("ingredient filter: {:?}", key);
        self.active_ingredient = key;
        self.selected_nodes.clear();
        self.ring_selection = None;
        true
    }

    /// Select a node, or deselect it when clicked again.
    pub fn toggle_node(&mut self, node: usize) -> bool {
        toggle(&mut self.selected_nodes, node)
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = !self.selected_nodes.is_empty() || self.ring_selection.is_some();
        self.selected_nodes.clear();
        self.ring_selection = None;
        changed
    }

    pub fn toggle_ring_category(&mut self, id: &str) {
        toggle_category(&mut self.ring_selection, id);
    }

    pub fn set_map_category(&mut self, category: &str) -> bool {
        if self.map_category.as_deref() == Some(category) {
            return false;
        }
        self.map_category = Some(category.to_string());
        true
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) -> bool {
        let changed = self.reduced_motion != reduced;
        self.reduced_motion = reduced;
        changed
    }

    /// Record that the tutorial overlay was shown. Returns true only the first time.
    pub fn mark_tutorial_shown(&mut self) -> bool {
        !std::mem::replace(&mut self.tutorial_shown, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::filter::PREHISPANIC_ERA;

    #[test]
    fn default_filter_is_the_prehispanic_era() {
        let state = AppState::default();
        assert_eq!(state.graph_filter(), GraphFilter::Era(PREHISPANIC_ERA.to_string()));
    }

    #[test]
    fn setting_the_same_ingredient_is_idempotent() {
        let mut state = AppState::default();
        assert!(state.set_ingredient(Some("maiz")));
        let once = state.clone();
        assert!(!state.set_ingredient(Some("MAÍZ")));
        assert_eq!(state, once);
        assert_eq!(state.active_ingredient.as_deref(), Some("MAÍZ"));
    }

    #[test]
    fn new_filter_clears_selection() {
        let mut state = AppState::default();
        state.toggle_node(4);
        state.toggle_ring_category("Moles");
        state.set_ingredient(Some("chile"));
        assert!(state.selected_nodes.is_empty());
        assert_eq!(state.ring_selection, None);

        state.toggle_node(2);
        assert!(!state.set_ingredient(Some("CHILE")));
        assert_eq!(state.selected_nodes, vec![2], "unchanged filter keeps selection");
        assert!(state.set_ingredient(Some("")));
        assert_eq!(state.active_ingredient, None);
    }

    #[test]
    fn tutorial_flag_fires_once() {
        let mut state = AppState::default();
        assert!(state.mark_tutorial_shown());
        assert!(!state.mark_tutorial_shown());
    }

    #[test]
    fn map_category_and_motion_report_changes() {
        let mut state = AppState::new(true);
        assert!(state.reduced_motion);
        assert!(!state.set_reduced_motion(true));
        assert!(state.set_map_category("Carnes y Mariscos"));
        assert!(!state.set_map_category("Carnes y Mariscos"));
        assert!(!state.clear_selection());
    }
}
