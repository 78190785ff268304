use cocina_engine::bridge::protocol::{
    HEADER_CIRCLE_COUNT, HEADER_EVENT_COUNT, HEADER_FLOATS, HEADER_FRAME_COUNTER,
    HEADER_GROUND_VERTEX_COUNT, HEADER_HEIGHT, HEADER_HOVERED_BAR, HEADER_SETTLED, HEADER_WIDTH,
};
use cocina_engine::systems::render::{build_circle_buffer, labels_json};
use cocina_engine::{
    BarId, CategoryCount, ChartConfig, ChartError, ChartEvent, CircleBuffer, DataSource, Dataset,
    Debounce, FixedTimestep, FALLBACK_NOTICE, InputEvent, InputQueue, PackingChart, ProtocolLayout, Viewport,
};
#[cfg(feature = "vectors")]
use cocina_engine::{draw_ground, VectorState};

/// Drives one packing chart from the page's animation frame.
///
/// JS pushes pointer and resize input, calls `tick` with the frame delta, then
/// reads the circle, ground and event buffers through raw pointers.
pub struct ChartRunner {
    config: ChartConfig,
    layout: ProtocolLayout,
    chart: PackingChart,
    source: DataSource,
    timestep: FixedTimestep,
    resize: Debounce<Viewport>,
    input: InputQueue,
    hovered: Option<BarId>,
    circles: CircleBuffer,
    #[cfg(feature = "vectors")]
    ground: VectorState,
    ground_dirty: bool,
    events: Vec<ChartEvent>,
    header: [f32; HEADER_FLOATS],
    frame: u64,
}

impl ChartRunner {
    pub fn new(
        config: ChartConfig,
        counts: Dataset<Vec<CategoryCount>>,
        viewport: Viewport,
        reduced_motion: bool,
    ) -> Result<Self, ChartError> {
        let layout = ProtocolLayout::from_config(&config);
        let source = counts.source;
        let chart = PackingChart::new(config.packing.clone(), counts.value, viewport, reduced_motion)?;
        let mut runner = Self {
            timestep: FixedTimestep::new(config.fixed_dt),
            resize: Debounce::new(config.resize_debounce),
            input: InputQueue::new(),
            hovered: None,
            circles: CircleBuffer::with_capacity(config.max_circles),
            #[cfg(feature = "vectors")]
            ground: VectorState::with_capacity(config.max_ground_vertices),
            ground_dirty: true,
            events: Vec::with_capacity(config.max_events),
            header: layout.header(),
            frame: 0,
            source,
            chart,
            layout,
            config,
        };
        runner.collect_events();
        runner.rebuild_buffers();
        Ok(runner)
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Run one animation frame.
    pub fn tick(&mut self, dt: f32) {
        self.events.clear();
        self.frame += 1;

        for event in self.input.drain() {
            match event {
                InputEvent::PointerMove { x, y } | InputEvent::PointerDown { x, y } => {
                    self.hovered = self.chart.hit_test(x, y).map(|bar| bar.id);
                }
                InputEvent::PointerLeave => self.hovered = None,
                InputEvent::Resize { width, height } => {
                    self.resize.trigger(Viewport::new(width, height));
                }
            }
        }

        if let Some(viewport) = self.resize.advance(dt) {
            self.apply_resize(viewport);
        }

        let steps = self.timestep.accumulate(dt);
        for _ in 0..steps {
            self.chart.tick();
        }

        self.collect_events();
        self.rebuild_buffers();
    }

    fn apply_resize(&mut self, viewport: Viewport) {
        if viewport == self.chart.viewport() {
            return;
        }
        match self.chart.resize(viewport) {
            Ok(()) => {
                self.hovered = None;
                self.timestep.reset();
                self.ground_dirty = true;
            }
            Err(err) => log::error!("chart resize failed: {err}"),
        }
    }

    fn collect_events(&mut self) {
        let room = self.config.max_events.saturating_sub(self.events.len());
        let pending = self.chart.events();
        if pending.len() > room {
            log::warn!("chart event buffer full, dropped {} events", pending.len() - room);
        }
        self.events.extend(pending.iter().take(room).copied());
        self.chart.clear_events();
    }

    fn rebuild_buffers(&mut self) {
        build_circle_buffer(&self.chart, self.hovered, &mut self.circles);

        #[cfg(feature = "vectors")]
        {
            if self.ground_dirty {
                draw_ground(&self.chart, &mut self.ground);
            }
        }
        self.ground_dirty = false;

        let viewport = self.chart.viewport();
        self.header[HEADER_FRAME_COUNTER] = self.frame as f32;
        self.header[HEADER_CIRCLE_COUNT] = self.circles.instance_count() as f32;
        self.header[HEADER_GROUND_VERTEX_COUNT] = self.ground_vertex_count() as f32;
        self.header[HEADER_EVENT_COUNT] = self.events.len() as f32;
        self.header[HEADER_WIDTH] = viewport.width;
        self.header[HEADER_HEIGHT] = viewport.height;
        self.header[HEADER_SETTLED] = if self.chart.is_settled() { 1.0 } else { 0.0 };
        self.header[HEADER_HOVERED_BAR] = self.hovered.map_or(-1.0, |id| id.0 as f32);
    }

    /// Replace the counts, e.g. when the primary data arrives late.
    pub fn set_counts(&mut self, counts: Dataset<Vec<CategoryCount>>) -> Result<(), ChartError> {
        self.source = counts.source;
        self.chart.set_counts(counts.value)?;
        self.after_rebuild();
        Ok(())
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) -> Result<(), ChartError> {
        if self.chart.reduced_motion() == reduced {
            return Ok(());
        }
        self.chart.set_reduced_motion(reduced)?;
        self.after_rebuild();
        Ok(())
    }

    fn after_rebuild(&mut self) {
        self.hovered = None;
        self.ground_dirty = true;
        self.collect_events();
        self.rebuild_buffers();
    }

    pub fn chart(&self) -> &PackingChart {
        &self.chart
    }

    pub fn notice(&self) -> Option<&'static str> {
        (self.source == DataSource::Fallback).then_some(FALLBACK_NOTICE)
    }

    pub fn labels_json(&self) -> String {
        labels_json(&self.chart).unwrap_or_else(|err| {
            log::error!("labels serialization failed: {err}");
            "[]".to_string()
        })
    }

    /// Label of the hovered bar and its count, for the tooltip.
    pub fn hovered(&self) -> Option<(&str, u32)> {
        let bar = self.chart.bar(self.hovered?)?;
        Some((bar.label.as_str(), bar.target()))
    }

    // ---- Pointer accessors ----

    pub fn header(&self) -> &[f32] {
        &self.header
    }

    pub fn circles_ptr(&self) -> *const f32 {
        self.circles.instances_ptr()
    }

    pub fn circle_count(&self) -> u32 {
        self.circles.instance_count() as u32
    }

    #[cfg(feature = "vectors")]
    pub fn ground_ptr(&self) -> *const f32 {
        self.ground.buffer_ptr()
    }

    #[cfg(feature = "vectors")]
    pub fn ground_vertex_count(&self) -> usize {
        self.ground.vertex_count()
    }

    #[cfg(not(feature = "vectors"))]
    pub fn ground_vertex_count(&self) -> usize {
        0
    }

    pub fn events_ptr(&self) -> *const f32 {
        self.events.as_ptr() as *const f32
    }

    pub fn event_count(&self) -> u32 {
        self.events.len() as u32
    }

    // ---- Capacity accessors ----

    pub fn layout(&self) -> &ProtocolLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(reduced_motion: bool) -> ChartRunner {
        let counts = Dataset::primary(vec![
            CategoryCount::new("Olmeca", 3),
            CategoryCount::new("Maya", 6),
        ]);
        ChartRunner::new(ChartConfig::default(), counts, Viewport::new(800.0, 400.0), reduced_motion).unwrap()
    }

    #[test]
    fn reduced_motion_is_ready_on_construction() {
        let r = runner(true);
        assert_eq!(r.circle_count(), 9);
        assert_eq!(r.header()[HEADER_SETTLED], 1.0);
        // Two bar events plus the chart event.
        assert_eq!(r.event_count(), 3);
        assert_eq!(r.notice(), None);
    }

    #[test]
    fn ticking_runs_until_settled() {
        let mut r = runner(false);
        let mut settled = false;
        for _ in 0..3000 {
            r.tick(1.0 / 60.0);
            if r.chart().is_settled() {
                settled = true;
                break;
            }
        }
        assert!(settled);
        assert_eq!(r.circle_count(), 9);
    }

    #[test]
    fn pointer_hover_and_leave() {
        let mut r = runner(true);
        let bar = r.chart().bars()[1].bounds();
        r.push_input(InputEvent::PointerMove { x: bar.center_x(), y: bar.floor_y - 1.0 });
        r.tick(0.0);
        assert_eq!(r.hovered(), Some(("Maya", 6)));
        assert_eq!(r.header()[HEADER_HOVERED_BAR], 1.0);

        r.push_input(InputEvent::PointerLeave);
        r.tick(0.0);
        assert_eq!(r.hovered(), None);
    }

    #[test]
    fn resize_waits_for_the_debounce() {
        let mut r = runner(true);
        r.push_input(InputEvent::Resize { width: 400.0, height: 300.0 });
        r.tick(0.1);
        assert_eq!(r.chart().viewport(), Viewport::new(800.0, 400.0));
        r.tick(0.2);
        assert_eq!(r.chart().viewport(), Viewport::new(400.0, 300.0));
        assert_eq!(r.header()[HEADER_WIDTH], 400.0);
    }

    #[test]
    fn fallback_counts_carry_the_notice() {
        let mut r = runner(true);
        r.set_counts(Dataset::fallback(vec![CategoryCount::new("Mexica", 2)])).unwrap();
        assert_eq!(r.notice(), Some(cocina_engine::FALLBACK_NOTICE));
        assert_eq!(r.circle_count(), 2);
    }
}
