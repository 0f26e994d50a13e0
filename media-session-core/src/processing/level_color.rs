/// Tri-stop color ramp for level meters (presentation only).
///
/// `0.0` → green, `0.5` → yellow, `1.0` → red, linear in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const GREEN: Rgb = Rgb::new(0x22, 0xc5, 0x5e);
pub const YELLOW: Rgb = Rgb::new(0xea, 0xb3, 0x08);
pub const RED: Rgb = Rgb::new(0xef, 0x44, 0x44);

/// Color for a normalized level. Out-of-range input is clamped.
pub fn level_color(level: f32) -> Rgb {
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
    if level <= 0.5 {
        lerp(GREEN, YELLOW, level * 2.0)
    } else {
        lerp(YELLOW, RED, (level - 0.5) * 2.0)
    }
}

fn lerp(from: Rgb, to: Rgb, t: f32) -> Rgb {
    let channel = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Rgb {
        r: channel(from.r, to.r),
        g: channel(from.g, to.g),
        b: channel(from.b, to.b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_are_exact() {
        assert_eq!(level_color(0.0), GREEN);
        assert_eq!(level_color(0.5), YELLOW);
        assert_eq!(level_color(1.0), RED);
    }

    #[test]
    fn clamps_out_of_range() {
        assert_eq!(level_color(-3.0), GREEN);
        assert_eq!(level_color(7.0), RED);
        assert_eq!(level_color(f32::NAN), GREEN);
    }

    #[test]
    fn interpolates_between_stops() {
        let quarter = level_color(0.25);
        assert_eq!(quarter.r, ((0x22 as f32 + 0xea as f32) / 2.0).round() as u8);
        assert!(quarter.g > YELLOW.g.min(GREEN.g));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(RED.to_hex(), "#ef4444");
    }
}
