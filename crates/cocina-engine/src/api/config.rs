use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Viewport width below which the chart uses the mobile profile.
pub const MOBILE_BREAKPOINT: f32 = 768.0;

/// Coarse device profile. Picks the spawn rate and particle radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub fn from_viewport_width(width: f32) -> Self {
        if width < MOBILE_BREAKPOINT {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }
}

/// Tuning for the particle-pile simulation.
///
/// All quantities are per simulation frame in canvas pixels, y growing downward.
/// Missing JSON fields fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// Particle radius on desktop.
    pub radius: f32,
    /// Radius multiplier applied on mobile.
    pub mobile_radius_scale: f32,
    /// Downward acceleration added to vy each frame.
    pub gravity: f32,
    /// Velocity retention per frame (1.0 = no damping).
    pub damping: f32,
    /// Speed cap, keeps fast particles from tunnelling through the pile.
    pub max_speed: f32,
    /// Bounce coefficient for walls, floor and particle contacts.
    pub restitution: f32,
    /// Extra factor on side-wall bounces.
    pub wall_friction: f32,
    /// Horizontal velocity retention on floor contact.
    pub floor_friction: f32,
    /// Pairwise relaxation passes per frame.
    pub relaxation_passes: u32,
    /// Mean displacement (px) under which a frame counts as calm.
    pub settle_threshold: f32,
    /// Consecutive calm frames needed to finish settling.
    pub settle_frames: u32,
    /// Hard cap on settling frames.
    pub max_settle_frames: u32,
    /// Sweeps of the final overlap resolution before the stacking fallback.
    pub final_sweeps: u32,
    pub spawn_per_frame_desktop: u32,
    pub spawn_per_frame_mobile: u32,
    /// Horizontal gap between neighbouring bars.
    pub bar_gap: f32,
    /// Height of the ground band below the floor line.
    pub ground_height: f32,
    /// Upper bound on particles in one bar; larger counts are clamped.
    pub max_particles_per_bar: u32,
    pub seed: u64,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            radius: 12.0,
            mobile_radius_scale: 0.75,
            gravity: 0.4,
            damping: 0.985,
            max_speed: 8.0,
            restitution: 0.25,
            wall_friction: 0.8,
            floor_friction: 0.85,
            relaxation_passes: 4,
            settle_threshold: 0.02,
            settle_frames: 20,
            max_settle_frames: 600,
            final_sweeps: 64,
            spawn_per_frame_desktop: 3,
            spawn_per_frame_mobile: 2,
            bar_gap: 16.0,
            ground_height: 40.0,
            max_particles_per_bar: 400,
            seed: 42,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse packing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid packing config: {0}")]
    Invalid(&'static str),
}

impl PackingConfig {
    /// Parse and validate a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(ConfigError::Invalid("radius must be positive"));
        }
        if !(self.mobile_radius_scale > 0.0 && self.mobile_radius_scale <= 1.0) {
            return Err(ConfigError::Invalid("mobile_radius_scale must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Invalid("restitution must be in [0, 1]"));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::Invalid("damping must be in (0, 1]"));
        }
        if self.max_speed <= 0.0 {
            return Err(ConfigError::Invalid("max_speed must be positive"));
        }
        if self.relaxation_passes == 0 {
            return Err(ConfigError::Invalid("relaxation_passes must be at least 1"));
        }
        if self.settle_frames == 0 {
            return Err(ConfigError::Invalid("settle_frames must be at least 1"));
        }
        if self.spawn_per_frame_desktop == 0 || self.spawn_per_frame_mobile == 0 {
            return Err(ConfigError::Invalid("spawn rate must be at least 1"));
        }
        Ok(())
    }

    pub fn spawn_per_frame(&self, device: DeviceClass) -> u32 {
        match device {
            DeviceClass::Desktop => self.spawn_per_frame_desktop,
            DeviceClass::Mobile => self.spawn_per_frame_mobile,
        }
    }

    pub fn radius_for(&self, device: DeviceClass) -> f32 {
        match device {
            DeviceClass::Desktop => self.radius,
            DeviceClass::Mobile => self.radius * self.mobile_radius_scale,
        }
    }
}

/// Frame loop and buffer capacities for a chart runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Fixed simulation step in seconds (default: 1/60).
    pub fixed_dt: f32,
    /// Maximum circles in the instance buffer (default: 4096).
    pub max_circles: usize,
    /// Maximum ground decoration vertices (default: 4096).
    pub max_ground_vertices: usize,
    /// Maximum chart events per frame (default: 64).
    pub max_events: usize,
    /// Quiet period before a resize rebuilds the chart, in seconds.
    pub resize_debounce: f32,
    pub packing: PackingConfig,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_circles: 4096,
            max_ground_vertices: 4096,
            max_events: 64,
            resize_debounce: 0.25,
            packing: PackingConfig::default(),
        }
    }
}

impl ChartConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_dt.is_finite() && self.fixed_dt > 0.0) {
            return Err(ConfigError::Invalid("fixed_dt must be positive"));
        }
        if self.resize_debounce < 0.0 {
            return Err(ConfigError::Invalid("resize_debounce must not be negative"));
        }
        self.packing.validate()
    }
}
