/// Fixed timestep accumulator.
/// Keeps the pile simulation at a constant rate whatever the display refresh rate.
pub struct FixedTimestep {
    dt: f32,
    accumulator: f32,
}

/// Most steps taken for a single frame, so a backgrounded tab does not
/// replay seconds of physics at once.
pub const MAX_STEPS_PER_FRAME: u32 = 10;

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            accumulator: 0.0,
        }
    }

    /// Add frame time to the accumulator. Returns the number of fixed steps to run.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        self.accumulator += frame_dt.max(0.0);
        self.accumulator = self.accumulator.min(self.dt * MAX_STEPS_PER_FRAME as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Trailing-edge debounce driven by frame time.
///
/// Each `trigger` restarts the countdown and replaces the pending value; the
/// value is released by `advance` once `delay` seconds pass without a trigger.
pub struct Debounce<T> {
    delay: f32,
    remaining: f32,
    pending: Option<T>,
}

impl<T> Debounce<T> {
    pub fn new(delay: f32) -> Self {
        Self {
            delay,
            remaining: 0.0,
            pending: None,
        }
    }

    pub fn trigger(&mut self, value: T) {
        self.pending = Some(value);
        self.remaining = self.delay;
    }

    pub fn advance(&mut self, dt: f32) -> Option<T> {
        self.pending.as_ref()?;
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_step_exact() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(1.0 / 60.0), 1);
    }

    #[test]
    fn accumulates_partial() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(0.008), 0);
        assert_eq!(ts.accumulate(0.010), 1);
    }

    #[test]
    fn caps_at_ten_steps() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(3.0), MAX_STEPS_PER_FRAME);
    }

    #[test]
    fn negative_frame_time_is_ignored() {
        let mut ts = FixedTimestep::new(1.0 / 60.0);
        assert_eq!(ts.accumulate(-1.0), 0);
        assert_eq!(ts.accumulate(1.0 / 60.0), 1, "negative time left no debt");
    }

    #[test]
    fn debounce_releases_last_value_after_quiet_period() {
        let mut d = Debounce::new(0.25);
        d.trigger((800.0, 600.0));
        assert_eq!(d.advance(0.1), None);
        d.trigger((640.0, 480.0));
        assert_eq!(d.advance(0.2), None, "second trigger restarted the delay");
        assert_eq!(d.advance(0.1), Some((640.0, 480.0)));
        assert!(!d.is_pending());
        assert_eq!(d.advance(1.0), None);
    }
}
