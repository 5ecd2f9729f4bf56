// Colour-space helpers: controller RGB/Kelvin in, bridge xy/mirek out, and
// hex strings back for status echo. All functions are pure.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions,
    clippy::float_cmp
)]

use loxhue_api::models::Xy;

/// Colour temperature range the controller's tunable-white blocks emit.
pub const CONTROLLER_MIREK_MIN: u16 = 153;
pub const CONTROLLER_MIREK_MAX: u16 = 370;

/// Fallback range for lights that do not report a mirek schema.
pub const HUE_MIREK_MIN: u16 = 153;
pub const HUE_MIREK_MAX: u16 = 500;

/// Linear map of `v` from `[in_lo, in_hi]` to `[out_lo, out_hi]`.
pub fn map_range(v: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    (v - in_lo) * (out_hi - out_lo) / (in_hi - in_lo) + out_lo
}

/// Kelvin to mirek. Anything below 2000 K pins to the warm end (500).
pub fn kelvin_to_mirek(kelvin: u32) -> u16 {
    if kelvin < 2000 {
        return 500;
    }
    (1_000_000.0 / f64::from(kelvin)).round() as u16
}

/// Controller RGB (each 0..=100) to CIE xy, wide-gamut D65, 4 decimals.
pub fn rgb_to_xy(r: u8, g: u8, b: u8) -> Xy {
    let gamma = |c: u8| {
        let c = f64::from(c) / 100.0;
        if c > 0.04045 {
            ((c + 0.055) / 1.055).powf(2.4)
        } else {
            c / 12.92
        }
    };
    let (red, green, blue) = (gamma(r), gamma(g), gamma(b));

    let x = red * 0.664_511 + green * 0.154_324 + blue * 0.162_028;
    let y = red * 0.283_881 + green * 0.729_798 + blue * 0.065_885;
    let z = red * 0.000_088 + green * 0.077_053 + blue * 0.950_255;

    let sum = x + y + z;
    if sum == 0.0 {
        return Xy { x: 0.0, y: 0.0 };
    }
    Xy {
        x: round4(x / sum),
        y: round4(y / sum),
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Approximate an RGB colour on a white-only fixture: the red/blue ratio
/// picks a point between the light's coolest and warmest mirek.
pub fn rgb_to_mirek_fallback(r: u8, _g: u8, b: u8, min: u16, max: u16) -> u16 {
    let (lo, hi) = (f64::from(min), f64::from(max));
    let (red, blue) = (f64::from(r), f64::from(b));
    if red + blue == 0.0 {
        return ((lo + hi) / 2.0).round() as u16;
    }
    let warmth = red / (red + blue);
    (lo + warmth * (hi - lo)).round() as u16
}

fn rgb_to_hex(r: f64, g: f64, b: f64) -> String {
    let c = |v: f64| v.clamp(0.0, 255.0).round() as u8;
    format!("#{:02x}{:02x}{:02x}", c(r), c(g), c(b))
}

/// CIE xy (at full brightness) to `#rrggbb`.
pub fn xy_to_hex(x: f64, y: f64) -> String {
    if y == 0.0 {
        return "#000000".into();
    }
    let z = 1.0 - x - y;
    let big_y = 1.0;
    let big_x = (big_y / y) * x;
    let big_z = (big_y / y) * z;

    let r = big_x * 1.656_492 - big_y * 0.354_851 - big_z * 0.255_038;
    let g = -big_x * 0.707_196 + big_y * 1.655_397 + big_z * 0.036_152;
    let b = big_x * 0.051_713 - big_y * 0.121_364 + big_z * 1.011_530;

    let gamma = |c: f64| {
        if c <= 0.003_130_8 {
            12.92 * c
        } else {
            1.055 * c.powf(1.0 / 2.4) - 0.055
        }
    };
    rgb_to_hex(gamma(r) * 255.0, gamma(g) * 255.0, gamma(b) * 255.0)
}

/// Black-body approximation of a mirek value as `#rrggbb`.
pub fn mirek_to_hex(mirek: u16) -> String {
    if mirek == 0 {
        return "#ffffff".into();
    }
    let temp = 1_000_000.0 / f64::from(mirek) / 100.0;
    let (r, g, b) = if temp <= 66.0 {
        let g = 99.470_802_586_1 * temp.ln() - 161.119_568_166_1;
        let b = if temp <= 19.0 {
            0.0
        } else {
            138.517_731_223_1 * (temp - 10.0).ln() - 305.044_792_730_7
        };
        (255.0, g, b)
    } else {
        (
            329.698_727_446 * (temp - 60.0).powf(-0.133_204_759_2),
            288.122_169_528_3 * (temp - 60.0).powf(-0.075_514_849_2),
            255.0,
        )
    };
    rgb_to_hex(r, g, b)
}

/// Bridge light-level reading (10000·log10(lux) + 1) to lux.
pub fn light_level_to_lux(level: f64) -> f64 {
    10_f64.powf((level - 1.0) / 10_000.0).round()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn kelvin_to_mirek_rounds_and_floors() {
        assert_eq!(kelvin_to_mirek(6500), 154);
        assert_eq!(kelvin_to_mirek(2700), 370);
        assert_eq!(kelvin_to_mirek(1999), 500);
    }

    #[test]
    fn map_range_is_linear() {
        assert!((map_range(5.0, 0.0, 10.0, 100.0, 200.0) - 150.0).abs() < f64::EPSILON);
        assert!((map_range(153.0, 153.0, 370.0, 153.0, 454.0) - 153.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rgb_to_xy_primaries() {
        let red = rgb_to_xy(100, 0, 0);
        assert!((red.x - 0.7006).abs() < 1e-4, "red.x = {}", red.x);
        assert!((red.y - 0.2993).abs() < 1e-4, "red.y = {}", red.y);
        assert_eq!(rgb_to_xy(0, 0, 0), Xy { x: 0.0, y: 0.0 });
    }

    #[test]
    fn warmth_fallback_spans_range() {
        assert_eq!(rgb_to_mirek_fallback(100, 0, 0, 153, 454), 454);
        assert_eq!(rgb_to_mirek_fallback(0, 0, 100, 153, 454), 153);
        assert_eq!(rgb_to_mirek_fallback(0, 100, 0, 153, 453), 303);
    }

    #[test]
    fn hex_outputs_are_well_formed() {
        for hex in [xy_to_hex(0.3227, 0.329), mirek_to_hex(153), mirek_to_hex(500)] {
            assert_eq!(hex.len(), 7);
            assert!(hex.starts_with('#'));
        }
        assert_eq!(mirek_to_hex(500).get(..3), Some("#ff"));
        assert_eq!(mirek_to_hex(100).get(5..), Some("ff"));
    }

    #[test]
    fn lux_conversion() {
        assert!((light_level_to_lux(1.0) - 1.0).abs() < f64::EPSILON);
        assert!((light_level_to_lux(20001.0) - 100.0).abs() < f64::EPSILON);
    }
}
