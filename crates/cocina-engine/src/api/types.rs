use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Index of a bar within its chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BarId(pub u32);

/// A chart event read by JavaScript from a flat f32 buffer.
/// `kind` identifies the event, `a/b/c` carry the payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ChartEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl ChartEvent {
    pub const FLOATS: usize = 4;

    /// A bar finished settling. `a` = bar index, `b` = particle count.
    pub const BAR_SETTLED: f32 = 1.0;
    /// Every bar of the chart is done. `a` = bar count.
    pub const ALL_SETTLED: f32 = 2.0;
    /// The chart was rebuilt. `a` = width, `b` = height.
    pub const REBUILT: f32 = 3.0;

    pub fn bar_settled(id: BarId, count: usize) -> Self {
        Self {
            kind: Self::BAR_SETTLED,
            a: id.0 as f32,
            b: count as f32,
            c: 0.0,
        }
    }

    pub fn all_settled(bars: usize) -> Self {
        Self {
            kind: Self::ALL_SETTLED,
            a: bars as f32,
            ..Default::default()
        }
    }

    pub fn rebuilt(width: f32, height: f32) -> Self {
        Self {
            kind: Self::REBUILT,
            a: width,
            b: height,
            c: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_is_four_floats() {
        assert_eq!(std::mem::size_of::<ChartEvent>(), ChartEvent::FLOATS * 4);
    }

    #[test]
    fn constructors_fill_payload() {
        let e = ChartEvent::bar_settled(BarId(3), 12);
        assert_eq!(e.kind, ChartEvent::BAR_SETTLED);
        assert_eq!((e.a, e.b), (3.0, 12.0));
        assert_eq!(ChartEvent::all_settled(5).a, 5.0);
    }
}
