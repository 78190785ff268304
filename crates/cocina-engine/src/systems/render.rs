use serde::Serialize;

use crate::api::types::BarId;
use crate::core::chart::PackingChart;
use crate::renderer::circle::{CircleBuffer, CircleInstance};

/// Alpha of bars other than the hovered one.
pub const DIMMED_ALPHA: f32 = 0.45;

/// Gap between the top of a pile and its count label.
const COUNT_LABEL_OFFSET: f32 = 10.0;

/// Fill the circle buffer from every bar of the chart.
///
/// With a hovered bar, the others are drawn at [`DIMMED_ALPHA`]. Particles
/// past the buffer capacity are dropped with a single warning.
pub fn build_circle_buffer(chart: &PackingChart, hovered: Option<BarId>, buffer: &mut CircleBuffer) {
    buffer.clear();

    let mut dropped = 0usize;
    for bar in chart.bars() {
        let alpha = match hovered {
            Some(id) if id != bar.id => DIMMED_ALPHA,
            _ => 1.0,
        };
        for p in bar.particles() {
            if !buffer.push(CircleInstance::from_particle(p, bar.id.0, alpha)) {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        log::warn!(
            "circle buffer full ({}), dropped {} particles",
            buffer.capacity(),
            dropped
        );
    }
}

/// Text drawn around a bar by the canvas layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarLabel {
    pub bar: u32,
    pub name: String,
    /// Center of the bar.
    pub x: f32,
    /// Baseline of the name, inside the ground band.
    pub y: f32,
    /// Particle count, once the bar is done.
    pub count: Option<u32>,
    /// Baseline of the count, just above the pile.
    pub count_y: f32,
}

pub fn bar_labels(chart: &PackingChart) -> Vec<BarLabel> {
    let ground = chart.config().ground_height;
    chart
        .bars()
        .iter()
        .map(|bar| {
            let bounds = bar.bounds();
            BarLabel {
                bar: bar.id.0,
                name: bar.label.clone(),
                x: bounds.center_x(),
                y: bounds.floor_y + ground * 0.5,
                count: bar.is_done().then(|| bar.particles().len() as u32),
                count_y: bar.stack_top() - COUNT_LABEL_OFFSET,
            }
        })
        .collect()
}

pub fn labels_json(chart: &PackingChart) -> Result<String, serde_json::Error> {
    serde_json::to_string(&bar_labels(chart))
}
