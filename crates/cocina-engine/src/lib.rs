pub mod api;
pub mod core;
pub mod data;
pub mod graph;
pub mod map;
pub mod renderer;
pub mod systems;
pub mod bridge;
pub mod input;

// Re-export key types at crate root for convenience
pub use api::app::AppState;
pub use api::config::{ChartConfig, ConfigError, DeviceClass, PackingConfig};
pub use api::loader::{LoadEvent, Loader, View, ViewError, ViewStatus};
pub use api::types::{BarId, ChartEvent};
pub use core::bar::{Bar, BarBounds, BarPhase, Particle};
pub use core::chart::{ChartError, PackingChart, Viewport};
pub use core::palette::{Color, Palette};
pub use core::time::{Debounce, FixedTimestep};
pub use data::counts::CategoryCount;
pub use data::table::PipeTable;
pub use data::{DataError, DataSource, Dataset, FALLBACK_NOTICE};
pub use graph::filter::{apply_filter, highlight, opacities, GraphFilter, GraphView, Highlight};
pub use graph::model::{GraphData, GraphLink, GraphNode, NodeLevel};
pub use graph::ring::CategoryRing;
pub use map::connections::{Connection, RouteMap, TopRoute};
pub use renderer::circle::{CircleBuffer, CircleInstance};
pub use input::queue::{InputEvent, InputQueue};
pub use bridge::protocol::ProtocolLayout;
pub use systems::render::{BarLabel, build_circle_buffer};

#[cfg(feature = "vectors")]
pub use systems::vector::{VectorState, VectorVertex, VectorColor};
#[cfg(feature = "vectors")]
pub use systems::ground::draw_ground;
