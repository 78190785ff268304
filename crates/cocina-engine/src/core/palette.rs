use serde::{Deserialize, Serialize};

/// RGB color, components in 0.0 - 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    /// Blend toward white (`amount` > 0) or black (`amount` < 0).
    pub fn shade(self, amount: f32) -> Self {
        let amount = amount.clamp(-1.0, 1.0);
        let target = if amount >= 0.0 { 1.0 } else { 0.0 };
        let t = amount.abs();
        Self {
            r: self.r + (target - self.r) * t,
            g: self.g + (target - self.g) * t,
            b: self.b + (target - self.b) * t,
        }
    }
}

macro_rules! rgb8 {
    ($r:expr, $g:expr, $b:expr) => {
        Color {
            r: $r as f32 / 255.0,
            g: $g as f32 / 255.0,
            b: $b as f32 / 255.0,
        }
    };
}

/// Codex-inspired bar colors, cycled per bar.
pub const PREHISPANIC: [Color; 6] = [
    rgb8!(0x9B, 0x22, 0x26), // carmine
    rgb8!(0xBB, 0x4D, 0x00), // clay orange
    rgb8!(0xAE, 0x7C, 0x34), // ochre
    rgb8!(0x5F, 0x5F, 0x41), // jade olive
    rgb8!(0x28, 0x66, 0x6E), // turquoise
    rgb8!(0x07, 0x3B, 0x4C), // mural blue
];

/// Brick orange used for the particles themselves on the cultural chart.
pub const BRICK: Color = rgb8!(0xC0, 0x3E, 0x1D);

/// Soil tone for the ground band.
pub const SOIL: Color = rgb8!(0x83, 0x57, 0x2B);

/// Per-bar set of particle colors.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        if colors.is_empty() {
            return Self { colors: vec![BRICK] };
        }
        Self { colors }
    }

    /// A base color with a lighter and a darker variant.
    pub fn shades_of(base: Color) -> Self {
        Self::new(vec![base, base.shade(0.18), base.shade(-0.15)])
    }

    /// Palette for the bar at `index`, cycling through [`PREHISPANIC`].
    pub fn for_bar(index: usize) -> Self {
        Self::shades_of(PREHISPANIC[index % PREHISPANIC.len()])
    }

    pub fn base(&self) -> Color {
        self.colors[0]
    }

    /// Color for the n-th particle of a bar.
    pub fn pick(&self, n: usize) -> Color {
        self.colors[n % self.colors.len()]
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
