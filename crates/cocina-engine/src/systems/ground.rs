//! Soil band and baseline drawn under the bars.

use glam::Vec2;

use crate::core::chart::PackingChart;
use crate::core::palette::SOIL;
use crate::systems::vector::{VectorColor, VectorState};

pub const BASELINE_WIDTH: f32 = 2.0;

/// Draw a soil band under each bar and one baseline along the floor.
pub fn draw_ground(chart: &PackingChart, vectors: &mut VectorState) {
    vectors.clear();

    let bars = chart.bars();
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return;
    };

    let floor_y = first.bounds().floor_y;
    let depth = (chart.viewport().height - floor_y).min(chart.config().ground_height);
    let soil = VectorColor::from(SOIL);
    for bar in bars {
        let b = bar.bounds();
        vectors.fill_rect(Vec2::new(b.x, floor_y), b.width(), depth, soil.with_alpha(0.85));
    }

    let edge = VectorColor::from(SOIL.shade(-0.35));
    vectors.stroke_polyline(
        &[Vec2::new(first.bounds().x, floor_y), Vec2::new(last.bounds().x2, floor_y)],
        BASELINE_WIDTH,
        edge,
    );

    if vectors.dropped() > 0 {
        log::warn!("ground vertex buffer full, dropped {} shapes", vectors.dropped());
    }
}
