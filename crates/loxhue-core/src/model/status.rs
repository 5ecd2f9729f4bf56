// ── Status attributes and values ──

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A reportable attribute. Renders as the datagram suffix (`hue.desk.bri`).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Attribute {
    On,
    Bri,
    Hex,
    Motion,
    Temp,
    Lux,
    Bat,
    Button,
    Rotary,
}

impl Attribute {
    /// Momentary signals: every occurrence is forwarded, even repeats.
    pub fn is_event(self) -> bool {
        matches!(self, Self::Button | Self::Rotary)
    }
}

/// A cached attribute value.
///
/// Numbers compare by value, so `55` and `55.0` are the same reading and
/// print identically (`55`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for StatusValue {
    fn from(v: bool) -> Self {
        Self::Number(if v { 1.0 } else { 0.0 })
    }
}

impl From<f64> for StatusValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<u8> for StatusValue {
    fn from(v: u8) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for StatusValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for StatusValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_without_trailing_zero() {
        assert_eq!(StatusValue::from(55_u8).to_string(), "55");
        assert_eq!(StatusValue::from(54.33).to_string(), "54.33");
        assert_eq!(StatusValue::from(true).to_string(), "1");
        assert_eq!(StatusValue::from("short_release").to_string(), "short_release");
    }

    #[test]
    fn event_attributes() {
        assert!(Attribute::Button.is_event());
        assert!(Attribute::Rotary.is_event());
        assert!(!Attribute::Bri.is_event());
        assert_eq!(Attribute::Bat.to_string(), "bat");
    }
}
