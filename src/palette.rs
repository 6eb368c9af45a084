// Colors and continuous color scales used by the dashboard charts

use plotters::style::RGBColor;

pub const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
pub const ROYAL_BLUE: RGBColor = RGBColor(65, 105, 225);
pub const ORANGE: RGBColor = RGBColor(255, 165, 0);
pub const LINE_BLUE: RGBColor = RGBColor(0, 0, 255);

/// Piecewise-linear gradient between evenly spaced color stops
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    stops: &'static [(u8, u8, u8)],
}

pub const VIRIDIS: ColorScale = ColorScale {
    stops: &[
        (68, 1, 84),
        (59, 82, 139),
        (33, 145, 140),
        (94, 201, 98),
        (253, 231, 37),
    ],
};

pub const YL_GN_BU: ColorScale = ColorScale {
    stops: &[
        (255, 255, 217),
        (199, 233, 180),
        (65, 182, 196),
        (34, 94, 168),
        (8, 29, 88),
    ],
};

pub const COOLWARM: ColorScale = ColorScale {
    stops: &[
        (59, 76, 192),
        (141, 176, 254),
        (221, 221, 221),
        (244, 154, 123),
        (180, 4, 38),
    ],
};

impl ColorScale {
    /// Color at position `t` in [0, 1]; out-of-range input is clamped
    pub fn at(&self, t: f64) -> RGBColor {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let segments = self.stops.len() - 1;
        let pos = t * segments as f64;
        let idx = (pos.floor() as usize).min(segments - 1);
        let frac = pos - idx as f64;

        let (r0, g0, b0) = self.stops[idx];
        let (r1, g1, b1) = self.stops[idx + 1];
        RGBColor(
            lerp(r0, r1, frac),
            lerp(g0, g1, frac),
            lerp(b0, b1, frac),
        )
    }

    /// Color for `value` on the domain `min..=max`
    pub fn map(&self, value: f64, min: f64, max: f64) -> RGBColor {
        if max > min {
            self.at((value - min) / (max - min))
        } else {
            self.at(0.5)
        }
    }
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}

/// Black or white, whichever reads better on `background`
pub fn contrast_text(background: RGBColor) -> RGBColor {
    let RGBColor(r, g, b) = background;
    let luma = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    if luma > 140.0 {
        RGBColor(0, 0, 0)
    } else {
        RGBColor(255, 255, 255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_endpoints() {
        assert_eq!(VIRIDIS.at(0.0), RGBColor(68, 1, 84));
        assert_eq!(VIRIDIS.at(1.0), RGBColor(253, 231, 37));
    }

    #[test]
    fn test_scale_clamps() {
        assert_eq!(COOLWARM.at(-3.0), COOLWARM.at(0.0));
        assert_eq!(COOLWARM.at(7.0), COOLWARM.at(1.0));
        assert_eq!(COOLWARM.at(f64::NAN), COOLWARM.at(0.0));
    }

    #[test]
    fn test_scale_midpoint() {
        assert_eq!(COOLWARM.map(0.0, -1.0, 1.0), RGBColor(221, 221, 221));
    }

    #[test]
    fn test_map_degenerate_domain() {
        assert_eq!(YL_GN_BU.map(5.0, 5.0, 5.0), YL_GN_BU.at(0.5));
    }

    #[test]
    fn test_contrast_text() {
        assert_eq!(contrast_text(RGBColor(255, 255, 217)), RGBColor(0, 0, 0));
        assert_eq!(contrast_text(RGBColor(8, 29, 88)), RGBColor(255, 255, 255));
    }
}
