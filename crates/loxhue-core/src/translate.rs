// Bridge state → controller attributes.

use loxhue_api::models::{EventData, Light};

use crate::color::{light_level_to_lux, mirek_to_hex, xy_to_hex};
use crate::model::{Attribute, StatusValue};

/// Button events worth reporting; the rest (`initial_press`, `repeat`, ...)
/// would flood the controller.
const REPORTED_BUTTON_EVENTS: [&str; 2] = ["short_release", "long_press"];

/// Every attribute one changed resource reports, in a fixed order.
pub fn translate_event(data: &EventData) -> Vec<(Attribute, StatusValue)> {
    let mut out = Vec::new();

    if let Some(motion) = data.motion.and_then(|m| m.motion) {
        out.push((Attribute::Motion, motion.into()));
    }
    if let Some(temp) = data.temperature.and_then(|t| t.temperature) {
        out.push((Attribute::Temp, temp.into()));
    }
    if let Some(level) = data.light.and_then(|l| l.light_level) {
        out.push((Attribute::Lux, light_level_to_lux(level).into()));
    }
    if let Some(on) = data.on {
        out.push((Attribute::On, on.on.into()));
    }
    if let Some(dimming) = data.dimming {
        out.push((Attribute::Bri, dimming.brightness.into()));
    }
    if let Some(event) = data.button.as_ref().and_then(|b| b.last_event.as_deref()) {
        if REPORTED_BUTTON_EVENTS.contains(&event) {
            out.push((Attribute::Button, event.into()));
        } else {
            tracing::trace!(id = %data.id, event, "ignoring button event");
        }
    }
    if let Some(battery) = data.power_state.and_then(|p| p.battery_level) {
        out.push((Attribute::Bat, battery.into()));
    }
    if let Some(rotation) = data.relative_rotary.as_ref().and_then(|r| r.rotation()) {
        let direction = if rotation.direction == "clock_wise" {
            "cw"
        } else {
            "ccw"
        };
        out.push((Attribute::Rotary, direction.into()));
    }
    if let Some(color) = data.color {
        out.push((Attribute::Hex, xy_to_hex(color.xy.x, color.xy.y).into()));
    }
    if let Some(mirek) = data.color_temperature.and_then(|ct| ct.mirek) {
        out.push((Attribute::Hex, mirek_to_hex(mirek).into()));
    }

    out
}

/// Initial-sync view of a light: on, brightness, and one colour.
pub fn translate_light(light: &Light) -> Vec<(Attribute, StatusValue)> {
    let mut out = Vec::new();
    if let Some(on) = light.on {
        out.push((Attribute::On, on.on.into()));
    }
    if let Some(dimming) = light.dimming {
        out.push((Attribute::Bri, dimming.brightness.into()));
    }
    let hex = light
        .color
        .map(|c| xy_to_hex(c.xy.x, c.xy.y))
        .or_else(|| {
            light
                .color_temperature
                .and_then(|ct| ct.mirek)
                .map(mirek_to_hex)
        });
    if let Some(hex) = hex {
        out.push((Attribute::Hex, hex.into()));
    }
    out
}
