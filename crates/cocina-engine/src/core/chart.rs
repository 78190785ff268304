//! A row of particle-pile bars sharing one canvas.
//!
//! The chart owns the category counts it was built from so that a resize can
//! tear every bar down and rebuild from scratch.

use thiserror::Error;

use crate::api::config::{ConfigError, DeviceClass, PackingConfig};
use crate::api::types::{BarId, ChartEvent};
use crate::core::bar::{Bar, BarBounds, BarSpec};
use crate::core::palette::Palette;
use crate::core::spatial::GridError;
use crate::data::counts::CategoryCount;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Canvas size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }
}

pub struct PackingChart {
    config: PackingConfig,
    counts: Vec<CategoryCount>,
    viewport: Viewport,
    device: DeviceClass,
    reduced_motion: bool,
    bars: Vec<Bar>,
    events: Vec<ChartEvent>,
    all_settled: bool,
    frame: u64,
}

impl PackingChart {
    pub fn new(
        config: PackingConfig,
        counts: Vec<CategoryCount>,
        viewport: Viewport,
        reduced_motion: bool,
    ) -> Result<Self, ChartError> {
        config.validate()?;
        let mut chart = Self {
            config,
            counts,
            viewport,
            device: DeviceClass::from_viewport_width(viewport.width),
            reduced_motion,
            bars: Vec::new(),
            events: Vec::new(),
            all_settled: false,
            frame: 0,
        };
        chart.build()?;
        Ok(chart)
    }

    fn build(&mut self) -> Result<(), GridError> {
        self.device = DeviceClass::from_viewport_width(self.viewport.width);
        self.bars.clear();
        self.all_settled = false;
        self.frame = 0;

        let radius = self.config.radius_for(self.device);
        let spawn = self.config.spawn_per_frame(self.device);
        for (i, bounds) in self.layout().into_iter().enumerate() {
            let count = &self.counts[i];
            let spec = BarSpec {
                id: BarId(i as u32),
                label: count.label.clone(),
                target: count.count.min(self.config.max_particles_per_bar),
                palette: Palette::for_bar(i),
                bounds,
            };
            let mut bar = Bar::new(spec, radius, spawn, self.config.seed)?;
            if self.reduced_motion {
                bar.place_grid();
            }
            self.bars.push(bar);
        }

        log::info!(
            "packing chart built: {} bars, {:?}, {}x{}, reduced motion {}",
            self.bars.len(),
            self.device,
            self.viewport.width,
            self.viewport.height,
            self.reduced_motion
        );

        if self.reduced_motion {
            for bar in &self.bars {
                self.events.push(ChartEvent::bar_settled(bar.id, bar.particles().len()));
            }
            self.mark_all_settled();
        }
        Ok(())
    }

    /// Split the width into equal columns separated by `bar_gap`.
    fn layout(&self) -> Vec<BarBounds> {
        let n = self.counts.len();
        if n == 0 {
            return Vec::new();
        }
        let gap = self.config.bar_gap;
        let bar_width = ((self.viewport.width - gap * (n as f32 + 1.0)) / n as f32).max(0.0);
        let floor_y = (self.viewport.height - self.config.ground_height).max(0.0);
        (0..n)
            .map(|i| {
                let x = gap + i as f32 * (bar_width + gap);
                BarBounds { x, x2: x + bar_width, floor_y }
            })
            .collect()
    }

    /// Advance every bar by one frame.
    pub fn tick(&mut self) {
        if self.all_settled {
            return;
        }
        self.frame += 1;
        for bar in &mut self.bars {
            if bar.step(&self.config) {
                self.events.push(ChartEvent::bar_settled(bar.id, bar.particles().len()));
            }
        }
        if self.bars.iter().all(Bar::is_done) {
            self.mark_all_settled();
        }
    }

    fn mark_all_settled(&mut self) {
        if self.all_settled {
            return;
        }
        self.all_settled = true;
        self.events.push(ChartEvent::all_settled(self.bars.len()));
        log::info!("packing chart settled after {} frames", self.frame);
    }

    /// Tear down and rebuild for a new canvas size.
    pub fn resize(&mut self, viewport: Viewport) -> Result<(), ChartError> {
        self.viewport = viewport;
        self.build()?;
        self.events.push(ChartEvent::rebuilt(viewport.width, viewport.height));
        Ok(())
    }

    /// Switch between the animated and the static grid layout. Rebuilds.
    pub fn set_reduced_motion(&mut self, reduced: bool) -> Result<(), ChartError> {
        if self.reduced_motion == reduced {
            return Ok(());
        }
        self.reduced_motion = reduced;
        self.build()?;
        Ok(())
    }

    /// Replace the counts (e.g. primary data arrived after the fallback). Rebuilds.
    pub fn set_counts(&mut self, counts: Vec<CategoryCount>) -> Result<(), ChartError> {
        self.counts = counts;
        self.build()?;
        Ok(())
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn bar(&self, id: BarId) -> Option<&Bar> {
        self.bars.get(id.0 as usize)
    }

    pub fn counts(&self) -> &[CategoryCount] {
        &self.counts
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn config(&self) -> &PackingConfig {
        &self.config
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    pub fn is_settled(&self) -> bool {
        self.all_settled
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Bar whose column contains the point, for hover tooltips.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&Bar> {
        self.bars.iter().find(|bar| bar.contains_point(x, y))
    }

    pub fn events(&self) -> &[ChartEvent] {
        &self.events
    }

    /// Clear per-frame events. Called by the runner at the start of a frame.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    pub fn total_particles(&self) -> usize {
        self.bars.iter().map(|b| b.particles().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts() -> Vec<CategoryCount> {
        vec![
            CategoryCount::new("Olmeca", 4),
            CategoryCount::new("Maya", 11),
            CategoryCount::new("Mexica", 17),
        ]
    }

    fn settle(chart: &mut PackingChart) {
        for _ in 0..5_000 {
            if chart.is_settled() {
                return;
            }
            chart.tick();
        }
        panic!("chart did not settle");
    }

    #[test]
    fn bars_split_the_width() {
        let chart = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(1000.0, 600.0),
            false,
        )
        .unwrap();
        let bars = chart.bars();
        assert_eq!(bars.len(), 3);
        for pair in bars.windows(2) {
            assert!(pair[0].bounds().x2 < pair[1].bounds().x);
        }
        let last = bars[2].bounds();
        assert!(last.x2 <= 1000.0);
        assert_eq!(last.floor_y, 600.0 - PackingConfig::default().ground_height);
    }

    #[test]
    fn every_bar_reaches_its_target() {
        let mut chart = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(900.0, 500.0),
            false,
        )
        .unwrap();
        settle(&mut chart);
        for (bar, count) in chart.bars().iter().zip(counts()) {
            assert!(bar.is_done());
            assert_eq!(bar.particles().len() as u32, count.count);
            assert!(!bar.has_overlap());
        }
    }

    #[test]
    fn settle_events_fire_once() {
        let mut chart = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(900.0, 500.0),
            false,
        )
        .unwrap();
        let mut settled = 0;
        let mut all = 0;
        for _ in 0..5_000 {
            chart.clear_events();
            chart.tick();
            for e in chart.events() {
                if e.kind == ChartEvent::BAR_SETTLED {
                    settled += 1;
                } else if e.kind == ChartEvent::ALL_SETTLED {
                    all += 1;
                }
            }
        }
        assert_eq!(settled, 3);
        assert_eq!(all, 1);
    }

    #[test]
    fn reduced_motion_is_settled_immediately() {
        let chart = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(900.0, 500.0),
            true,
        )
        .unwrap();
        assert!(chart.is_settled());
        assert_eq!(chart.total_particles(), 4 + 11 + 17);
    }

    #[test]
    fn reduced_motion_matches_physics_counts() {
        let mut physics = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(700.0, 500.0),
            false,
        )
        .unwrap();
        settle(&mut physics);
        let grid = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(700.0, 500.0),
            true,
        )
        .unwrap();
        let a: Vec<usize> = physics.bars().iter().map(|b| b.particles().len()).collect();
        let b: Vec<usize> = grid.bars().iter().map(|b| b.particles().len()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn resize_rebuilds_from_scratch() {
        let mut chart = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(1200.0, 600.0),
            false,
        )
        .unwrap();
        settle(&mut chart);
        chart.resize(Viewport::new(500.0, 400.0)).unwrap();
        assert!(!chart.is_settled());
        assert_eq!(chart.total_particles(), 0);
        assert_eq!(chart.device(), DeviceClass::Mobile);
        assert!(chart.events().iter().any(|e| e.kind == ChartEvent::REBUILT));
        settle(&mut chart);
        assert_eq!(chart.total_particles(), 32);
    }

    #[test]
    fn targets_are_clamped() {
        let config = PackingConfig {
            max_particles_per_bar: 5,
            ..Default::default()
        };
        let chart = PackingChart::new(
            config,
            vec![CategoryCount::new("Mexica", 50)],
            Viewport::new(400.0, 400.0),
            true,
        )
        .unwrap();
        assert_eq!(chart.bars()[0].target(), 5);
        assert_eq!(chart.total_particles(), 5);
    }

    #[test]
    fn hit_test_finds_column() {
        let chart = PackingChart::new(
            PackingConfig::default(),
            counts(),
            Viewport::new(900.0, 500.0),
            true,
        )
        .unwrap();
        let b = chart.bars()[1].bounds();
        let hit = chart.hit_test(b.center_x(), b.floor_y - 5.0).unwrap();
        assert_eq!(hit.label, "Maya");
        assert!(chart.hit_test(b.center_x(), b.floor_y + 10.0).is_none());
        assert!(chart.hit_test(1.0, 10.0).is_none(), "gap before first bar");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PackingConfig {
            radius: -1.0,
            ..Default::default()
        };
        assert!(PackingChart::new(config, counts(), Viewport::new(100.0, 100.0), false).is_err());
    }

    #[test]
    fn empty_counts_settle_on_first_tick() {
        let mut chart = PackingChart::new(
            PackingConfig::default(),
            Vec::new(),
            Viewport::new(100.0, 100.0),
            false,
        )
        .unwrap();
        chart.tick();
        assert!(chart.is_settled());
    }
}
