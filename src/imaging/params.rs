//! Parameter types for the compose and export stages.
//!
//! Each type clamps on construction so out-of-range values coming from config
//! files or command-line flags can never reach the pixel code.
//!
//! - [`Quality`]: lossy encoding quality (1–100). JPEG export always uses [`Quality::MAX`].
//! - [`Brightness`]: brightness offset on the −100..=100 slider scale.
//! - [`CopyCount`]: number of photos on the sheet (1–40, default 8).
//! - [`parse_hex_color`] / [`format_hex_color`]: `#rrggbb` background colors.

use image::Rgba;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::MAX
    }
}

/// Brightness offset on the slider scale, −100..=100.
///
/// Maps to a per-channel delta of `offset × 2.55`, so ±100 spans the full
/// 0–255 channel range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Brightness(i32);

impl Brightness {
    pub const MIN: i32 = -100;
    pub const MAX: i32 = 100;

    pub fn new(value: i32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    pub fn is_neutral(self) -> bool {
        self.0 == 0
    }

    /// Channel delta in 0–255 units.
    pub fn channel_delta(self) -> f32 {
        // Integer multiply first: ±10, ±50 and ±100 stay exact in f32
        (self.0 * 255) as f32 / 100.0
    }
}

/// Number of copies placed on the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyCount(u32);

impl CopyCount {
    pub const MIN: u32 = 1;
    pub const MAX: u32 = 40;

    pub fn new(value: u32) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for CopyCount {
    fn default() -> Self {
        Self(8)
    }
}

/// Parse a `#rrggbb` (or `rrggbb`) color into an opaque pixel.
pub fn parse_hex_color(value: &str) -> Result<Rgba<u8>, String> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("invalid color '{value}' (expected #rrggbb)"));
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// Format an opaque pixel as lowercase `#rrggbb`.
pub fn format_hex_color(color: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
        assert_eq!(Quality::default(), Quality::MAX);
    }

    #[test]
    fn brightness_clamps_and_maps_to_channel_delta() {
        assert_eq!(Brightness::new(250).value(), 100);
        assert_eq!(Brightness::new(-101).value(), -100);
        assert_eq!(Brightness::new(100).channel_delta(), 255.0);
        assert_eq!(Brightness::new(-100).channel_delta(), -255.0);
        assert!(Brightness::default().is_neutral());
    }

    #[test]
    fn copy_count_defaults_to_eight_and_clamps() {
        assert_eq!(CopyCount::default().value(), 8);
        assert_eq!(CopyCount::new(0).value(), 1);
        assert_eq!(CopyCount::new(41).value(), 40);
    }

    #[test]
    fn hex_color_parses_with_and_without_hash() {
        assert_eq!(parse_hex_color("#00aaff").unwrap(), Rgba([0, 170, 255, 255]));
        assert_eq!(parse_hex_color("FFFFFF").unwrap(), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn hex_color_rejects_garbage() {
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gg0000").is_err());
        assert!(parse_hex_color("").is_err());
    }

    #[test]
    fn hex_color_formats_lowercase() {
        assert_eq!(format_hex_color(Rgba([0, 170, 255, 255])), "#00aaff");
    }
}
