use serde::Serialize;

use cocina_engine::data::{counts, fallback};
use cocina_engine::graph::ring::{categories_of, category_color, category_opacities, RingSegment};
use cocina_engine::map::connections::{legend_thresholds, OriginMarker, StateTotal, TOP_ROUTES};
use cocina_engine::{
    apply_filter, opacities, AppState, CategoryCount, CategoryRing, ChartConfig, Dataset,
    GraphData, GraphLink, GraphNode, GraphView, NodeLevel, PipeTable, RouteMap, View, ViewError,
    Viewport,
};

use crate::runner::ChartRunner;

pub const CULTURAL_CHART: &str = "cultural-radial-chart";
pub const NETWORK: &str = "network";
pub const CONNECTION_MAP: &str = "filtered-connection-map";

/// Ingredients with a per-state chart, in page order.
pub const STATE_CHART_INGREDIENTS: [&str; 5] = ["MAIZ", "FRIJOL", "CHILE", "CALABAZA", "CACAO"];

pub fn state_chart_container(ingredient: &str) -> String {
    format!("{}-estados-radial-chart", ingredient.to_lowercase())
}

/// Every visualization the page hosts.
pub enum PageView {
    Cultures(CultureChart),
    Graph(GraphPanel),
    States(StateChart),
    Map(MapPanel),
}

impl View for PageView {
    fn name(&self) -> &str {
        match self {
            Self::Cultures(_) => "cultural-chart",
            Self::Graph(_) => "circular-graph",
            Self::States(v) => &v.name,
            Self::Map(_) => "connection-map",
        }
    }

    fn container(&self) -> &str {
        match self {
            Self::Cultures(_) => CULTURAL_CHART,
            Self::Graph(_) => NETWORK,
            Self::States(v) => &v.container,
            Self::Map(_) => CONNECTION_MAP,
        }
    }

    fn init(&mut self, state: &mut AppState) -> Result<(), ViewError> {
        match self {
            Self::Cultures(v) => v.init(state),
            Self::Graph(v) => v.init(state),
            Self::States(v) => v.init(),
            Self::Map(v) => v.init(state),
        }
    }

    fn update(&mut self, state: &AppState) {
        match self {
            Self::Cultures(v) => v.update(state),
            Self::Graph(v) => v.update(state),
            Self::States(_) | Self::Map(_) => {}
        }
    }
}

/// Load order: the aperitivo charts first, the map after them.
pub fn page_views(
    config: ChartConfig,
    viewport: Viewport,
    dishes_csv: &str,
    graph_csv: &str,
    routes_csv: &str,
) -> Vec<Vec<PageView>> {
    let mut aperitivo = vec![
        PageView::Graph(GraphPanel::new(graph_csv)),
        PageView::Cultures(CultureChart::new(config, viewport, dishes_csv)),
    ];
    aperitivo.extend(
        STATE_CHART_INGREDIENTS
            .iter()
            .map(|ingredient| PageView::States(StateChart::new(ingredient, dishes_csv))),
    );
    vec![aperitivo, vec![PageView::Map(MapPanel::new(routes_csv))]]
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| {
        log::error!("serialization failed: {err}");
        "null".to_string()
    })
}

// ---- Cultural packing chart ----

pub struct CultureChart {
    config: ChartConfig,
    viewport: Viewport,
    csv: String,
    runner: Option<ChartRunner>,
}

impl CultureChart {
    fn new(config: ChartConfig, viewport: Viewport, csv: &str) -> Self {
        Self { config, viewport, csv: csv.to_string(), runner: None }
    }

    fn init(&mut self, state: &AppState) -> Result<(), ViewError> {
        let parsed = PipeTable::parse(&self.csv).and_then(|t| counts::culture_counts(&t));
        let counts = Dataset::or_fallback(parsed, "cultural chart", fallback::culture_counts);
        let runner = ChartRunner::new(self.config.clone(), counts, self.viewport, state.reduced_motion)?;
        self.runner = Some(runner);
        self.csv.clear();
        Ok(())
    }

    fn update(&mut self, state: &AppState) {
        if let Some(runner) = &mut self.runner {
            if let Err(err) = runner.set_reduced_motion(state.reduced_motion) {
                log::error!("cultural chart: {err}");
            }
        }
    }

    pub fn runner_mut(&mut self) -> Option<&mut ChartRunner> {
        self.runner.as_mut()
    }
}

// ---- Dishes per state for one ingredient ----

#[derive(Serialize)]
struct StateCounts<'a> {
    ingredient: &'a str,
    states: &'a [CategoryCount],
    notice: Option<&'static str>,
}

pub struct StateChart {
    name: String,
    container: String,
    ingredient: String,
    csv: String,
    counts: Option<Dataset<Vec<CategoryCount>>>,
}

impl StateChart {
    fn new(ingredient: &str, csv: &str) -> Self {
        let lower = ingredient.to_lowercase();
        Self {
            name: format!("{lower}-states"),
            container: state_chart_container(ingredient),
            ingredient: ingredient.to_string(),
            csv: csv.to_string(),
            counts: None,
        }
    }

    fn init(&mut self) -> Result<(), ViewError> {
        let parsed = PipeTable::parse(&self.csv).and_then(|t| counts::dishes_by_state(&t, &self.ingredient));
        let ingredient = self.ingredient.clone();
        let counts = Dataset::or_fallback(parsed, &self.name, || fallback::dishes_by_state(&ingredient));
        log::debug!("{}: {} states", self.name, counts.value.len());
        self.counts = Some(counts);
        self.csv.clear();
        Ok(())
    }

    pub fn ingredient(&self) -> &str {
        &self.ingredient
    }

    pub fn to_json(&self) -> String {
        match &self.counts {
            Some(c) => to_json(&StateCounts {
                ingredient: &self.ingredient,
                states: &c.value,
                notice: c.notice(),
            }),
            None => "null".to_string(),
        }
    }
}

// ---- Circular graph and category ring ----

#[derive(Serialize)]
struct GraphJson<'a> {
    nodes: &'a [GraphNode],
    links: &'a [GraphLink],
    notice: Option<&'static str>,
}

#[derive(Serialize)]
struct RingJson<'a> {
    segments: Vec<SegmentJson<'a>>,
    total: u32,
}

#[derive(Serialize)]
struct NodeCategory {
    id: &'static str,
    color: &'static str,
}

#[derive(Serialize)]
struct SegmentJson<'a> {
    #[serde(flatten)]
    segment: &'a RingSegment,
    opacity: f32,
}

pub struct GraphPanel {
    csv: String,
    graph: Dataset<GraphData>,
    view: Option<GraphView>,
}

impl GraphPanel {
    fn new(csv: &str) -> Self {
        Self {
            csv: csv.to_string(),
            graph: Dataset::fallback(GraphData::default()),
            view: None,
        }
    }

    fn init(&mut self, state: &mut AppState) -> Result<(), ViewError> {
        self.graph = Dataset::or_fallback(GraphData::from_csv(&self.csv), "circular graph", GraphData::fallback);
        if self.graph.value.is_empty() {
            log::warn!("circular graph: no usable rows, using embedded data");
            self.graph = Dataset::fallback(GraphData::fallback());
        }
        self.csv.clear();
        self.view = Some(apply_filter(&self.graph.value, &state.graph_filter()));
        state.graph_ready = true;
        Ok(())
    }

    fn update(&mut self, state: &AppState) {
        let filter = state.graph_filter();
        if self.view.as_ref().is_some_and(|v| v.filter == filter) {
            return;
        }
        let view = apply_filter(&self.graph.value, &filter);
        log::debug!("graph filter {:?}: {} nodes ({:?})", filter, view.nodes.len(), view.mode);
        self.view = Some(view);
    }

    pub fn graph(&self) -> &GraphData {
        &self.graph.value
    }

    pub fn graph_json(&self) -> String {
        to_json(&GraphJson {
            nodes: self.graph.value.nodes(),
            links: self.graph.value.links(),
            notice: self.graph.notice(),
        })
    }

    pub fn view_json(&self) -> String {
        match &self.view {
            Some(view) => to_json(view),
            None => "null".to_string(),
        }
    }

    /// Node and link opacities under the current selection. A selected ring
    /// segment takes precedence over node selection.
    pub fn opacities_json(&self, state: &AppState) -> String {
        let Some(view) = &self.view else { return "null".to_string() };
        let graph = &self.graph.value;
        if let Some(id) = state.ring_selection.as_deref() {
            let ring = self.ring(state);
            if let Some(segment) = ring.segment(id) {
                return to_json(&category_opacities(graph, view, segment));
            }
        }
        to_json(&opacities(graph, view, &state.selected_nodes))
    }

    /// Ring over the selected origins, or over the whole view when no origin
    /// is selected.
    fn ring(&self, state: &AppState) -> CategoryRing {
        let graph = &self.graph.value;
        let origins: Vec<usize> = state
            .selected_nodes
            .iter()
            .copied()
            .filter(|&n| graph.level(n) == Some(NodeLevel::Origin))
            .collect();
        match &self.view {
            _ if !origins.is_empty() => CategoryRing::for_origins(graph, &origins),
            Some(view) => CategoryRing::for_view(graph, view),
            None => CategoryRing::default(),
        }
    }

    /// Ring categories to light up while a node is hovered.
    pub fn categories_for_node(&self, index: usize) -> String {
        let categories: Vec<NodeCategory> = categories_of(&self.graph.value, index)
            .into_iter()
            .map(|id| NodeCategory { id, color: category_color(id) })
            .collect();
        to_json(&categories)
    }

    pub fn ring_json(&self, state: &AppState) -> String {
        let ring = self.ring(state);
        let selected = state.ring_selection.as_deref();
        to_json(&RingJson {
            segments: ring
                .segments
                .iter()
                .map(|segment| SegmentJson {
                    segment,
                    opacity: ring.segment_opacity(selected, &segment.id),
                })
                .collect(),
            total: ring.total,
        })
    }
}

// ---- Connection map ----

#[derive(Serialize)]
struct MapJson<'a> {
    category: &'a str,
    categories: Vec<&'a str>,
    connections: Vec<cocina_engine::Connection>,
    top_routes: Vec<cocina_engine::TopRoute>,
    state_totals: Vec<StateTotal>,
    legend: [u32; 4],
    markers: Vec<OriginMarker>,
    notice: Option<&'static str>,
}

pub struct MapPanel {
    csv: String,
    routes: Dataset<RouteMap>,
}

impl MapPanel {
    fn new(csv: &str) -> Self {
        Self {
            csv: csv.to_string(),
            routes: Dataset::fallback(RouteMap::default()),
        }
    }

    fn init(&mut self, state: &mut AppState) -> Result<(), ViewError> {
        self.routes = Dataset::or_fallback(RouteMap::from_csv(&self.csv), "connection map", RouteMap::fallback);
        if self.routes.value.is_empty() {
            log::warn!("connection map: no usable routes, using embedded data");
            self.routes = Dataset::fallback(RouteMap::fallback());
        }
        self.csv.clear();
        if state.map_category.is_none() {
            if let Some(first) = self.routes.value.categories().first() {
                state.set_map_category(first);
            }
        }
        Ok(())
    }

    pub fn to_json(&self, state: &AppState) -> String {
        let map = &self.routes.value;
        let category = state.map_category.as_deref().unwrap_or_default();
        let state_totals = map.state_totals(category);
        let max = state_totals.iter().map(|t| t.ingredients).max().unwrap_or(0);
        to_json(&MapJson {
            category,
            categories: map.categories(),
            connections: map.filter(category),
            top_routes: map.top_routes(category, TOP_ROUTES),
            legend: legend_thresholds(max),
            state_totals,
            markers: map.origin_markers(category),
            notice: self.routes.notice(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cocina_engine::Loader;

    fn loader() -> (Loader<PageView>, AppState) {
        let groups = page_views(ChartConfig::default(), Viewport::new(800.0, 400.0), "", "", "");
        (Loader::new(groups), AppState::new(true))
    }

    #[test]
    fn empty_sources_fall_back() {
        let (mut l, mut state) = loader();
        for id in [NETWORK, CULTURAL_CHART, CONNECTION_MAP] {
            l.container_ready(id, &mut state);
        }
        assert!(!l.is_finished(), "state charts still pending");
        for ingredient in STATE_CHART_INGREDIENTS {
            l.container_ready(&state_chart_container(ingredient), &mut state);
        }
        assert!(l.is_finished());
        assert!(state.graph_ready);
        assert!(state.map_category.is_some());

        let charted: Vec<String> = l
            .views_mut()
            .filter_map(|v| match v {
                PageView::States(s) => Some(s.ingredient().to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(charted, STATE_CHART_INGREDIENTS);

        for view in l.views_mut() {
            match view {
                PageView::Graph(g) => {
                    assert!(!g.graph().is_empty());
                    assert!(g.graph_json().contains("Datos de demostración"));
                }
                PageView::Cultures(c) => {
                    let runner = c.runner_mut().unwrap();
                    assert!(runner.notice().is_some());
                    assert!(runner.circle_count() > 0);
                }
                PageView::States(s) => assert!(s.to_json().contains(s.ingredient())),
                PageView::Map(m) => {
                    let json: serde_json::Value = serde_json::from_str(&m.to_json(&state)).unwrap();
                    assert_eq!(json["category"], "Carnes y Mariscos");
                    assert_eq!(json["state_totals"][0]["state"], "Veracruz");
                    assert_eq!(json["legend"], serde_json::json!([1, 2, 5, 10]));
                    assert_eq!(json["markers"][0]["name"], "España");
                    assert_eq!(json["markers"][0]["ingredients"], 18);
                }
            }
        }
    }

    #[test]
    fn graph_follows_the_ingredient_filter() {
        let (mut l, mut state) = loader();
        l.container_ready(NETWORK, &mut state);
        state.set_ingredient(Some("maiz"));
        l.update(&state);
        let Some(PageView::Graph(g)) = l.views_mut().next() else { panic!("graph view missing") };
        assert!(g.view_json().contains("MAÍZ"));
        assert!(g.opacities_json(&state).starts_with("{\"nodes\""));
        assert!(g.ring_json(&state).contains("segments"));
    }

    #[test]
    fn node_hover_lists_its_ring_categories() {
        let (mut l, mut state) = loader();
        l.container_ready(NETWORK, &mut state);
        let Some(PageView::Graph(g)) = l.views_mut().next() else { panic!("graph view missing") };

        let azteca = g.graph().find(NodeLevel::Origin, "Azteca").unwrap();
        let json: serde_json::Value = serde_json::from_str(&g.categories_for_node(azteca)).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "id": "Antojitos", "color": "#D2691E" },
                { "id": "Sopas", "color": "#BC8F8F" },
            ])
        );

        let tamales = g.graph().find(NodeLevel::Dish, "Tamales-Maya").unwrap();
        assert!(g.categories_for_node(tamales).contains("\"Tamales\""));
        assert_eq!(g.categories_for_node(usize::MAX), "[]");
    }
}
