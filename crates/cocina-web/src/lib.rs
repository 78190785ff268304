//! Browser bridge: one `thread_local!` app holding the shared state and the
//! view loader, driven by the page's scroll observers and animation frame.

pub mod runner;
pub mod views;

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use cocina_engine::{AppState, ChartConfig, InputEvent, LoadEvent, Loader, Viewport};

pub use runner::ChartRunner;
use views::{page_views, GraphPanel, MapPanel, PageView, StateChart};

pub struct App {
    state: AppState,
    loader: Loader<PageView>,
}

impl App {
    pub fn new(config: ChartConfig, viewport: Viewport, reduced_motion: bool, sources: [&str; 3]) -> Self {
        let [dishes, graph, routes] = sources;
        Self {
            state: AppState::new(reduced_motion),
            loader: Loader::new(page_views(config, viewport, dishes, graph, routes)),
        }
    }

    fn chart(&mut self) -> Option<&mut ChartRunner> {
        self.loader.views_mut().find_map(|v| match v {
            PageView::Cultures(c) => c.runner_mut(),
            _ => None,
        })
    }

    fn graph(&mut self) -> Option<&mut GraphPanel> {
        self.loader.views_mut().find_map(|v| match v {
            PageView::Graph(g) => Some(g),
            _ => None,
        })
    }

    fn map(&mut self) -> Option<&mut MapPanel> {
        self.loader.views_mut().find_map(|v| match v {
            PageView::Map(m) => Some(m),
            _ => None,
        })
    }

    fn states(&mut self, ingredient: &str) -> Option<&mut StateChart> {
        self.loader.views_mut().find_map(|v| match v {
            PageView::States(s) if s.ingredient().eq_ignore_ascii_case(ingredient) => Some(s),
            _ => None,
        })
    }

    /// Push the state to the views after a change.
    fn changed(&mut self, changed: bool) -> bool {
        if changed {
            self.loader.update(&self.state);
        }
        changed
    }

    fn load_events(&mut self) -> String {
        events_json(&self.loader.drain_events())
    }
}

fn events_json(events: &[LoadEvent]) -> String {
    serde_json::to_string(events).unwrap_or_else(|err| {
        log::error!("load events serialization failed: {err}");
        "[]".to_string()
    })
}

thread_local! {
    static APP: RefCell<Option<App>> = const { RefCell::new(None) };
}

fn with_app<R>(f: impl FnOnce(&mut App) -> R) -> Option<R> {
    APP.with(|cell| {
        let mut borrow = cell.borrow_mut();
        match borrow.as_mut() {
            Some(app) => Some(f(app)),
            None => {
                log::warn!("cocina: not initialized, call init() first");
                None
            }
        }
    })
}

fn with_chart<R>(f: impl FnOnce(&mut ChartRunner) -> R) -> Option<R> {
    with_app(|app| app.chart().map(f)).flatten()
}

// ---- Lifecycle ----

/// Set up logging and the view loader. CSV sources the page failed to fetch
/// are passed as empty strings and replaced by embedded data.
#[wasm_bindgen]
pub fn init(
    config_json: &str,
    width: f32,
    height: f32,
    reduced_motion: bool,
    dishes_csv: &str,
    graph_csv: &str,
    routes_csv: &str,
) {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = if config_json.trim().is_empty() {
        ChartConfig::default()
    } else {
        ChartConfig::from_json(config_json).unwrap_or_else(|err| {
            log::warn!("chart config rejected ({err}), using defaults");
            ChartConfig::default()
        })
    };
    let app = App::new(
        config,
        Viewport::new(width, height),
        reduced_motion,
        [dishes_csv, graph_csv, routes_csv],
    );
    APP.with(|cell| *cell.borrow_mut() = Some(app));
    log::info!("cocina: initialized");
}

/// A view container entered the DOM. Returns the load events as JSON.
#[wasm_bindgen]
pub fn container_ready(id: &str) -> String {
    with_app(|app| {
        app.loader.container_ready(id, &mut app.state);
        app.load_events()
    })
    .unwrap_or_else(|| "[]".to_string())
}

/// Every section is in place; views still waiting are skipped.
#[wasm_bindgen]
pub fn finish_loading() -> String {
    with_app(|app| {
        app.loader.finish(&mut app.state);
        app.load_events()
    })
    .unwrap_or_else(|| "[]".to_string())
}

#[wasm_bindgen]
pub fn app_state_json() -> String {
    with_app(|app| serde_json::to_string(&app.state).unwrap_or_default()).unwrap_or_default()
}

#[wasm_bindgen]
pub fn set_reduced_motion(reduced: bool) -> bool {
    with_app(|app| {
        let changed = app.state.set_reduced_motion(reduced);
        app.changed(changed)
    })
    .unwrap_or(false)
}

/// True only on the first call, so the page shows the tutorial once.
#[wasm_bindgen]
pub fn mark_tutorial_shown() -> bool {
    with_app(|app| app.state.mark_tutorial_shown()).unwrap_or(false)
}

// ---- Packing chart ----

#[wasm_bindgen]
pub fn chart_tick(dt: f32) {
    with_chart(|r| r.tick(dt));
}

#[wasm_bindgen]
pub fn chart_resize(width: f32, height: f32) {
    with_chart(|r| r.push_input(InputEvent::Resize { width, height }));
}

#[wasm_bindgen]
pub fn chart_pointer_move(x: f32, y: f32) {
    with_chart(|r| r.push_input(InputEvent::PointerMove { x, y }));
}

#[wasm_bindgen]
pub fn chart_pointer_down(x: f32, y: f32) {
    with_chart(|r| r.push_input(InputEvent::PointerDown { x, y }));
}

#[wasm_bindgen]
pub fn chart_pointer_leave() {
    with_chart(|r| r.push_input(InputEvent::PointerLeave));
}

#[wasm_bindgen]
pub fn chart_header() -> js_sys::Float32Array {
    with_chart(|r| js_sys::Float32Array::from(r.header()))
        .unwrap_or_else(|| js_sys::Float32Array::new_with_length(0))
}

#[wasm_bindgen]
pub fn chart_labels() -> String {
    with_chart(|r| r.labels_json()).unwrap_or_else(|| "[]".to_string())
}

/// `{"label": .., "count": ..}` for the hovered bar, or `null`.
#[wasm_bindgen]
pub fn chart_tooltip() -> String {
    with_chart(|r| {
        r.hovered()
            .map(|(label, count)| serde_json::json!({ "label": label, "count": count }).to_string())
    })
    .flatten()
    .unwrap_or_else(|| "null".to_string())
}

#[wasm_bindgen]
pub fn chart_notice() -> Option<String> {
    with_chart(|r| r.notice().map(str::to_string)).flatten()
}

#[wasm_bindgen]
pub fn get_circles_ptr() -> *const f32 {
    with_chart(|r| r.circles_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_circle_count() -> u32 {
    with_chart(|r| r.circle_count()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_events_ptr() -> *const f32 {
    with_chart(|r| r.events_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_event_count() -> u32 {
    with_chart(|r| r.event_count()).unwrap_or(0)
}

#[cfg(feature = "vectors")]
#[wasm_bindgen]
pub fn get_ground_ptr() -> *const f32 {
    with_chart(|r| r.ground_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_ground_vertex_count() -> u32 {
    with_chart(|r| r.ground_vertex_count() as u32).unwrap_or(0)
}

// ---- Capacity accessors ----

#[wasm_bindgen]
pub fn get_max_circles() -> u32 {
    with_chart(|r| r.layout().max_circles as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_max_ground_vertices() -> u32 {
    with_chart(|r| r.layout().max_ground_vertices as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_max_events() -> u32 {
    with_chart(|r| r.layout().max_events as u32).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_buffer_total_floats() -> u32 {
    with_chart(|r| r.layout().buffer_total_floats as u32).unwrap_or(0)
}

// ---- Circular graph and category ring ----

#[wasm_bindgen]
pub fn graph_json() -> String {
    with_app(|app| app.graph().map(|g| g.graph_json())).flatten().unwrap_or_else(|| "null".to_string())
}

#[wasm_bindgen]
pub fn graph_view_json() -> String {
    with_app(|app| app.graph().map(|g| g.view_json())).flatten().unwrap_or_else(|| "null".to_string())
}

/// Switch the ingredient filter; an empty key restores the era view.
#[wasm_bindgen]
pub fn graph_set_ingredient(key: &str) -> bool {
    with_app(|app| {
        let changed = app.state.set_ingredient(Some(key));
        app.changed(changed)
    })
    .unwrap_or(false)
}

/// Toggle a node in the selection. Returns whether it is selected afterwards.
#[wasm_bindgen]
pub fn graph_toggle_node(index: usize) -> bool {
    with_app(|app| {
        let selected = app.state.toggle_node(index);
        app.changed(true);
        selected
    })
    .unwrap_or(false)
}

#[wasm_bindgen]
pub fn graph_clear_selection() -> bool {
    with_app(|app| {
        let changed = app.state.clear_selection();
        app.changed(changed)
    })
    .unwrap_or(false)
}

#[wasm_bindgen]
pub fn graph_opacities() -> String {
    with_app(|app| {
        let state = app.state.clone();
        app.graph().map(|g| g.opacities_json(&state))
    })
    .flatten()
    .unwrap_or_else(|| "null".to_string())
}

#[wasm_bindgen]
pub fn ring_json() -> String {
    with_app(|app| {
        let state = app.state.clone();
        app.graph().map(|g| g.ring_json(&state))
    })
    .flatten()
    .unwrap_or_else(|| "null".to_string())
}

/// Categories of the hovered node as `[{"id", "color"}]`, for the ring to
/// highlight.
#[wasm_bindgen]
pub fn ring_categories_for_node(index: usize) -> String {
    with_app(|app| app.graph().map(|g| g.categories_for_node(index)))
        .flatten()
        .unwrap_or_else(|| "[]".to_string())
}

#[wasm_bindgen]
pub fn ring_toggle(id: &str) {
    with_app(|app| {
        app.state.toggle_ring_category(id);
        app.changed(true);
    });
}

// ---- Dishes per state ----

#[wasm_bindgen]
pub fn states_json(ingredient: &str) -> String {
    with_app(|app| app.states(ingredient).map(|s| s.to_json()))
        .flatten()
        .unwrap_or_else(|| "null".to_string())
}

// ---- Connection map ----

#[wasm_bindgen]
pub fn map_set_category(category: &str) -> String {
    with_app(|app| {
        let changed = app.state.set_map_category(category);
        app.changed(changed);
        let state = app.state.clone();
        app.map().map(|m| m.to_json(&state))
    })
    .flatten()
    .unwrap_or_else(|| "null".to_string())
}

#[wasm_bindgen]
pub fn map_json() -> String {
    with_app(|app| {
        let state = app.state.clone();
        app.map().map(|m| m.to_json(&state))
    })
    .flatten()
    .unwrap_or_else(|| "null".to_string())
}
