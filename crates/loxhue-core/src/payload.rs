// ── Value codes → light payloads ──
//
// Controllers send a single number per command. The grammar:
//
//   0                 off
//   1                 on
//   2..=100           on at that brightness
//   20BBBKKKK...      (9+ digits) brightness BBB + colour temperature in K
//   BBBGGGRRR         (up to 9 digits) packed blue/green/red, each 0..=100
//
// A `20...` string shorter than nine digits is packed colour, never white.
// The numeric grammar is checked first, so `20` alone is brightness 20 and
// any packed value that reads as 0..=100 is off, on or a brightness: full
// red `000000100` is brightness 100. Pure red needs a non-zero green or a
// clamped red (`000000999`).

use std::fmt;

use loxhue_api::models::{
    ColorUpdate, DimmingUpdate, Dynamics, LightUpdate, MirekUpdate, OnState,
};

use crate::color::{
    CONTROLLER_MIREK_MAX, CONTROLLER_MIREK_MIN, kelvin_to_mirek, map_range, rgb_to_mirek_fallback,
    rgb_to_xy,
};
use crate::error::CoreError;
use crate::model::Capability;

const MAX_DIGITS: usize = 12;
const PACKED_MAX: u64 = 999_999_999;

/// A decoded controller value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCode {
    Off,
    On,
    Brightness(u8),
    White { brightness: u8, kelvin: u32 },
    Packed { red: u8, green: u8, blue: u8 },
}

impl fmt::Display for ValueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::On => f.write_str("on"),
            Self::Brightness(b) => write!(f, "brightness {b}"),
            Self::White { brightness, kelvin } => write!(f, "white {brightness}% {kelvin}K"),
            Self::Packed { red, green, blue } => write!(f, "rgb {red}/{green}/{blue}"),
        }
    }
}

fn invalid(raw: &str, reason: &str) -> CoreError {
    CoreError::InvalidValue {
        value: raw.to_owned(),
        reason: reason.to_owned(),
    }
}

fn clamp_percent(v: u64) -> u8 {
    u8::try_from(v.min(100)).unwrap_or(100)
}

impl ValueCode {
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.is_empty() || raw.len() > MAX_DIGITS || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(raw, "expected 1 to 12 decimal digits"));
        }
        let n: u64 = raw
            .parse()
            .map_err(|_| invalid(raw, "not a number"))?;

        match n {
            0 => return Ok(Self::Off),
            1 => return Ok(Self::On),
            2..=100 => return Ok(Self::Brightness(clamp_percent(n))),
            _ => {}
        }

        if raw.len() >= 9 && raw.starts_with("20") {
            let brightness: u64 = raw
                .get(2..5)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| invalid(raw, "malformed brightness"))?;
            let kelvin: u32 = raw
                .get(5..)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| invalid(raw, "malformed colour temperature"))?;
            return Ok(Self::White {
                brightness: clamp_percent(brightness),
                kelvin,
            });
        }

        if n > PACKED_MAX {
            return Err(invalid(raw, "too long for a packed colour"));
        }
        Ok(Self::Packed {
            blue: clamp_percent(n / 1_000_000),
            green: clamp_percent((n % 1_000_000) / 1000),
            red: clamp_percent(n % 1000),
        })
    }
}

/// Transition handling for one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Configured default, in milliseconds.
    pub default_ms: u32,
    /// Caller override; wins over every other rule.
    pub forced_ms: Option<u32>,
}

impl Transition {
    pub fn new(default_ms: u32) -> Self {
        Self {
            default_ms,
            forced_ms: None,
        }
    }

    pub fn forced(default_ms: u32, forced_ms: u32) -> Self {
        Self {
            default_ms,
            forced_ms: Some(forced_ms),
        }
    }
}

/// Build the write body for `code` on a light with `capability`.
///
/// Unknown lights (`None`) are assumed to render colour.
pub fn build_payload(
    code: ValueCode,
    capability: Option<&Capability>,
    transition: Transition,
) -> LightUpdate {
    let on = |on: bool| Some(OnState { on });
    let dim = |brightness: u8| Some(DimmingUpdate { brightness });

    let mut update = match code {
        ValueCode::Off
        | ValueCode::White { brightness: 0, .. }
        | ValueCode::Packed {
            red: 0,
            green: 0,
            blue: 0,
        } => LightUpdate::off(),
        ValueCode::On => LightUpdate {
            on: on(true),
            ..LightUpdate::default()
        },
        ValueCode::Brightness(b) => LightUpdate {
            on: on(true),
            dimming: dim(b),
            ..LightUpdate::default()
        },
        ValueCode::White { brightness, kelvin } => LightUpdate {
            on: on(true),
            dimming: dim(brightness),
            color_temperature: Some(MirekUpdate {
                mirek: scale_mirek(kelvin_to_mirek(kelvin), capability),
            }),
            ..LightUpdate::default()
        },
        ValueCode::Packed { red, green, blue } => {
            let brightness = red.max(green).max(blue);
            let mut update = LightUpdate {
                on: on(true),
                dimming: dim(brightness),
                ..LightUpdate::default()
            };
            match capability {
                Some(c) if !c.supports_color && c.supports_color_temperature => {
                    let mirek = rgb_to_mirek_fallback(red, green, blue, c.mirek_min, c.mirek_max);
                    tracing::debug!(red, green, blue, mirek, "rgb rendered as white");
                    update.color_temperature = Some(MirekUpdate { mirek });
                }
                Some(c) if !c.supports_color => {}
                _ => {
                    update.color = Some(ColorUpdate {
                        xy: rgb_to_xy(red, green, blue),
                    });
                }
            }
            update
        }
    };

    let duration = match transition.forced_ms {
        Some(ms) => ms,
        None if update.is_switch_only() => 0,
        None => transition.default_ms,
    };
    if duration > 0 {
        update.dynamics = Some(Dynamics { duration });
    }
    update
}

/// Map a controller mirek (153..=370) into the light's own range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn scale_mirek(mirek: u16, capability: Option<&Capability>) -> u16 {
    let Some(c) = capability else {
        return mirek;
    };
    let scaled = map_range(
        f64::from(mirek),
        f64::from(CONTROLLER_MIREK_MIN),
        f64::from(CONTROLLER_MIREK_MAX),
        f64::from(c.mirek_min),
        f64::from(c.mirek_max),
    )
    .round();
    (scaled.max(0.0) as u16).clamp(c.mirek_min, c.mirek_max.max(c.mirek_min))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn ambiance() -> Capability {
        Capability {
            supports_color: false,
            supports_color_temperature: true,
            mirek_min: 153,
            mirek_max: 454,
        }
    }

    fn body(raw: &str, capability: Option<&Capability>) -> serde_json::Value {
        let code = ValueCode::parse(raw).unwrap();
        serde_json::to_value(build_payload(code, capability, Transition::new(400))).unwrap()
    }

    #[test]
    fn grammar() {
        assert_eq!(ValueCode::parse("0").unwrap(), ValueCode::Off);
        assert_eq!(ValueCode::parse("1").unwrap(), ValueCode::On);
        assert_eq!(ValueCode::parse("100").unwrap(), ValueCode::Brightness(100));
        assert_eq!(ValueCode::parse("20").unwrap(), ValueCode::Brightness(20));
        assert_eq!(
            ValueCode::parse("200030006500").unwrap(),
            ValueCode::White {
                brightness: 3,
                kelvin: 6500
            }
        );
        assert_eq!(
            ValueCode::parse("201002700").unwrap(),
            ValueCode::White {
                brightness: 100,
                kelvin: 2700
            }
        );
        // Short `20...` strings are packed colour.
        assert_eq!(
            ValueCode::parse("20050").unwrap(),
            ValueCode::Packed {
                red: 50,
                green: 20,
                blue: 0
            }
        );
        assert_eq!(
            ValueCode::parse("100000000").unwrap(),
            ValueCode::Packed {
                red: 0,
                green: 0,
                blue: 100
            }
        );
        assert_eq!(
            ValueCode::parse("999").unwrap(),
            ValueCode::Packed {
                red: 100,
                green: 0,
                blue: 0
            }
        );
    }

    #[test]
    fn small_packed_values_read_as_brightness() {
        assert_eq!(ValueCode::parse("000000100").unwrap(), ValueCode::Brightness(100));
        assert_eq!(ValueCode::parse("000000001").unwrap(), ValueCode::On);
        assert_eq!(ValueCode::parse("000000000").unwrap(), ValueCode::Off);
        assert!(body("000000100", None).get("color").is_none());
        assert_eq!(
            ValueCode::parse("000001100").unwrap(),
            ValueCode::Packed {
                red: 100,
                green: 1,
                blue: 0
            }
        );
    }

    #[test]
    fn rejects_malformed_values() {
        for raw in ["", "-1", "abc", "1.5", "1000000000", "1234567890123"] {
            assert!(
                matches!(ValueCode::parse(raw), Err(CoreError::InvalidValue { .. })),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn off_and_on_are_instant() {
        assert_eq!(body("0", None), json!({ "on": { "on": false } }));
        assert_eq!(body("1", None), json!({ "on": { "on": true } }));
    }

    #[test]
    fn brightness_uses_default_transition() {
        assert_eq!(
            body("55", None),
            json!({
                "on": { "on": true },
                "dimming": { "brightness": 55 },
                "dynamics": { "duration": 400 }
            })
        );
    }

    #[test]
    fn white_scales_into_light_range() {
        let caps = ambiance();
        assert_eq!(
            body("200030006500", Some(&caps)),
            json!({
                "on": { "on": true },
                "dimming": { "brightness": 3 },
                "color_temperature": { "mirek": 154 },
                "dynamics": { "duration": 400 }
            })
        );
        // 2700 K is the controller's warm end, so it lands on the light's.
        let warm = body("201002700", Some(&caps));
        assert_eq!(warm["color_temperature"]["mirek"], json!(454));
        // Unknown lights get the unscaled value.
        let raw = body("201002700", None);
        assert_eq!(raw["color_temperature"]["mirek"], json!(370));
        // Zero brightness switches off.
        assert_eq!(body("200006500", Some(&caps))["on"], json!({ "on": false }));
    }

    #[test]
    fn packed_colour_by_capability() {
        let colour = body("000001100", None);
        assert_eq!(colour["dimming"]["brightness"], json!(100));
        assert!(colour["color"]["xy"]["x"].as_f64().unwrap() > 0.6);

        let white = body("000001100", Some(&ambiance()));
        assert_eq!(white["color_temperature"]["mirek"], json!(454));
        assert!(white.get("color").is_none());

        let plain = Capability {
            supports_color: false,
            supports_color_temperature: false,
            mirek_min: 153,
            mirek_max: 500,
        };
        assert_eq!(
            body("050050050", Some(&plain)),
            json!({
                "on": { "on": true },
                "dimming": { "brightness": 50 },
                "dynamics": { "duration": 400 }
            })
        );
    }

    #[test]
    fn forced_transition_wins() {
        let update = build_payload(ValueCode::Brightness(40), None, Transition::forced(400, 0));
        assert!(update.dynamics.is_none());

        let update = build_payload(ValueCode::On, None, Transition::forced(400, 1500));
        assert_eq!(update.dynamics, Some(Dynamics { duration: 1500 }));
    }
}
