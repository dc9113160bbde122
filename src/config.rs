use bon::Builder;
use std::f64::consts::PI;

use crate::GaugeError;

/// Color representation for gauge elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn as_tuple(self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }

    /// Parse a `#RRGGBB` (or bare `RRGGBB`) hex triplet.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 {
            return None;
        }
        let value = u32::from_str_radix(hex, 16).ok()?;
        Some(Self::new(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }
}

/// Default gradient palette, sweeping red through amber to green. Four
/// stops produce three blended arc segments across the dial.
pub const DEFAULT_PALETTE: [Color; 4] = [
    Color::new(0xBF, 0x3D, 0x5E),
    Color::new(0xF9, 0x5F, 0x53),
    Color::new(0xFF, 0xD2, 0x55),
    Color::new(0x7C, 0xE4, 0x90),
];

/// Static description of a dial's appearance. One spec can be shared by any
/// number of gauge instances; per-instance values live in `GaugeState`.
#[derive(Debug, Clone, Builder)]
pub struct GaugeSpec {
    // Dial geometry
    #[builder(default = PI / 180.0)]
    pub degree_unit: f64,
    #[builder(default = 6)]
    pub line_count: usize,

    // Tick styling
    #[builder(default = Color::new(0x54, 0x56, 0x67))]
    pub line_color: Color,
    #[builder(default = 1.0)]
    pub line_stroke_small: f32,
    #[builder(default = 3.0)]
    pub line_stroke_large: f32,
    #[builder(default = 9.0)]
    pub tick_size_small: f64,
    #[builder(default = 18.0)]
    pub tick_size_large: f64,

    // Gradient arc
    #[builder(default = DEFAULT_PALETTE.to_vec())]
    pub palette: Vec<Color>,
    #[builder(default = 20.0)]
    pub gradient_thickness: f64,

    // Labels
    #[builder(default = Color::new(0x8E, 0x91, 0xA1))]
    pub label_color: Color,
    #[builder(default = 13.0)]
    pub label_font_size: f32,

    // Window configuration
    #[builder(default = "Gauge".to_string())]
    pub title: String,
    #[builder(default = 400)]
    pub window_width: usize,
    #[builder(default = 300)]
    pub window_height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,
    #[builder(default = Color::new(0xFF, 0xFF, 0xFF))]
    pub background_color: Color,

    // Font configuration
    #[builder(default = include_bytes!("DejaVuSans-Bold.ttf"))]
    pub font_data: &'static [u8],
}

impl Default for GaugeSpec {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GaugeSpec {
    /// Check the constraints the painters divide by. Called once up front;
    /// painting itself cannot fail after this passes.
    pub fn validate(&self) -> Result<(), GaugeError> {
        if self.line_count == 0 {
            return Err(GaugeError::InvalidSpec(
                "line_count must be at least 1".into(),
            ));
        }
        if self.palette.len() < 3 {
            return Err(GaugeError::InvalidSpec(format!(
                "gradient palette needs at least 3 colors, got {}",
                self.palette.len()
            )));
        }
        // A repeated stop would collapse one segment's gradient to a flat
        // band; the last stop wraps back toward the first.
        for i in 0..self.palette.len() {
            let next = (i + 1) % self.palette.len();
            if self.palette[i] == self.palette[next] {
                return Err(GaugeError::InvalidSpec(format!(
                    "palette stops {i} and {next} are identical"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(Color::from_hex("#BF3D5E"), Some(Color::new(0xBF, 0x3D, 0x5E)));
        assert_eq!(Color::from_hex("7CE490"), Some(Color::new(0x7C, 0xE4, 0x90)));
        assert_eq!(Color::from_hex("#000000"), Some(Color::new(0, 0, 0)));
    }

    #[test]
    fn rejects_malformed_hex() {
        assert_eq!(Color::from_hex(""), None);
        assert_eq!(Color::from_hex("#BF3D5"), None);
        assert_eq!(Color::from_hex("#BF3D5EAA"), None);
        assert_eq!(Color::from_hex("#GG0011"), None);
    }

    #[test]
    fn default_spec_validates() {
        assert!(GaugeSpec::default().validate().is_ok());
    }

    #[test]
    fn zero_line_count_is_rejected() {
        let spec = GaugeSpec::builder().line_count(0).build();
        assert!(matches!(spec.validate(), Err(GaugeError::InvalidSpec(_))));
    }

    #[test]
    fn short_palette_is_rejected() {
        let spec = GaugeSpec::builder()
            .palette(vec![Color::new(0, 0, 0), Color::new(255, 255, 255)])
            .build();
        assert!(matches!(spec.validate(), Err(GaugeError::InvalidSpec(_))));
    }

    #[test]
    fn repeated_palette_stop_is_rejected() {
        let c = Color::new(0x10, 0x20, 0x30);
        let spec = GaugeSpec::builder()
            .palette(vec![c, c, Color::new(0xFF, 0xFF, 0xFF)])
            .build();
        assert!(matches!(spec.validate(), Err(GaugeError::InvalidSpec(_))));
    }

    #[test]
    fn default_palette_stops_all_differ() {
        for i in 0..DEFAULT_PALETTE.len() {
            let next = (i + 1) % DEFAULT_PALETTE.len();
            assert_ne!(DEFAULT_PALETTE[i], DEFAULT_PALETTE[next]);
        }
    }
}
