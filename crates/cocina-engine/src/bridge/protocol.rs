/// Shared buffer layout read by the page's canvas layer.
///
/// Layout (all values f32):
/// ```text
/// [Header: 16 floats]
/// [Circles: max_circles × 8 floats]
/// [Ground: max_ground_vertices × 6 floats]
/// [Events: max_events × 4 floats]
/// ```
///
/// Capacities are written into the header once; JS derives the section
/// offsets from them.

use crate::api::config::ChartConfig;

pub const HEADER_FLOATS: usize = 16;

pub const HEADER_PROTOCOL_VERSION: usize = 0;
pub const HEADER_FRAME_COUNTER: usize = 1;
pub const HEADER_MAX_CIRCLES: usize = 2;
pub const HEADER_CIRCLE_COUNT: usize = 3;
pub const HEADER_MAX_GROUND_VERTICES: usize = 4;
pub const HEADER_GROUND_VERTEX_COUNT: usize = 5;
pub const HEADER_MAX_EVENTS: usize = 6;
pub const HEADER_EVENT_COUNT: usize = 7;
pub const HEADER_WIDTH: usize = 8;
pub const HEADER_HEIGHT: usize = 9;
/// 1.0 once every bar is done.
pub const HEADER_SETTLED: usize = 10;
/// Index of the hovered bar, or -1.
pub const HEADER_HOVERED_BAR: usize = 11;

pub const PROTOCOL_VERSION: f32 = 1.0;

/// x, y, radius, r, g, b, alpha, bar.
pub const CIRCLE_FLOATS: usize = 8;
/// x, y, r, g, b, a.
pub const GROUND_VERTEX_FLOATS: usize = 6;
/// kind, a, b, c.
pub const EVENT_FLOATS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolLayout {
    pub max_circles: usize,
    pub max_ground_vertices: usize,
    pub max_events: usize,

    pub circle_data_floats: usize,
    pub ground_data_floats: usize,
    pub event_data_floats: usize,

    pub circle_data_offset: usize,
    pub ground_data_offset: usize,
    pub event_data_offset: usize,

    pub buffer_total_floats: usize,
    pub buffer_total_bytes: usize,
}

impl ProtocolLayout {
    pub fn new(max_circles: usize, max_ground_vertices: usize, max_events: usize) -> Self {
        let circle_data_floats = max_circles * CIRCLE_FLOATS;
        let ground_data_floats = max_ground_vertices * GROUND_VERTEX_FLOATS;
        let event_data_floats = max_events * EVENT_FLOATS;

        let circle_data_offset = HEADER_FLOATS;
        let ground_data_offset = circle_data_offset + circle_data_floats;
        let event_data_offset = ground_data_offset + ground_data_floats;
        let buffer_total_floats = event_data_offset + event_data_floats;

        Self {
            max_circles,
            max_ground_vertices,
            max_events,
            circle_data_floats,
            ground_data_floats,
            event_data_floats,
            circle_data_offset,
            ground_data_offset,
            event_data_offset,
            buffer_total_floats,
            buffer_total_bytes: buffer_total_floats * 4,
        }
    }

    pub fn from_config(config: &ChartConfig) -> Self {
        Self::new(config.max_circles, config.max_ground_vertices, config.max_events)
    }

    /// Header with the capacities and protocol version filled in; counts zero.
    pub fn header(&self) -> [f32; HEADER_FLOATS] {
        let mut header = [0.0; HEADER_FLOATS];
        header[HEADER_PROTOCOL_VERSION] = PROTOCOL_VERSION;
        header[HEADER_MAX_CIRCLES] = self.max_circles as f32;
        header[HEADER_MAX_GROUND_VERTICES] = self.max_ground_vertices as f32;
        header[HEADER_MAX_EVENTS] = self.max_events as f32;
        header[HEADER_HOVERED_BAR] = -1.0;
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::circle::CircleInstance;
    use crate::api::types::ChartEvent;

    #[test]
    fn wire_sizes_match_the_structs() {
        assert_eq!(CIRCLE_FLOATS, CircleInstance::FLOATS);
        assert_eq!(EVENT_FLOATS, ChartEvent::FLOATS);
    }

    #[test]
    fn from_default_config() {
        let layout = ProtocolLayout::from_config(&ChartConfig::default());
        assert_eq!(layout.max_circles, 4096);
        assert_eq!(layout.circle_data_offset, HEADER_FLOATS);
        assert_eq!(layout.ground_data_offset, HEADER_FLOATS + 4096 * 8);
        assert_eq!(layout.event_data_offset, HEADER_FLOATS + 4096 * 8 + 4096 * 6);
        assert_eq!(layout.buffer_total_floats, layout.event_data_offset + 64 * 4);
        assert_eq!(layout.buffer_total_bytes, layout.buffer_total_floats * 4);
    }

    #[test]
    fn offsets_are_contiguous() {
        let layout = ProtocolLayout::new(10, 20, 3);
        assert_eq!(layout.ground_data_offset, layout.circle_data_offset + layout.circle_data_floats);
        assert_eq!(layout.event_data_offset, layout.ground_data_offset + layout.ground_data_floats);
        assert_eq!(layout.buffer_total_floats, HEADER_FLOATS + 80 + 120 + 12);
    }

    #[test]
    fn header_carries_capacities() {
        let header = ProtocolLayout::new(10, 20, 3).header();
        assert_eq!(header[HEADER_PROTOCOL_VERSION], PROTOCOL_VERSION);
        assert_eq!(header[HEADER_MAX_GROUND_VERTICES], 20.0);
        assert_eq!(header[HEADER_CIRCLE_COUNT], 0.0);
        assert_eq!(header[HEADER_HOVERED_BAR], -1.0);
    }
}
