use tabled::Tabled;

use loxhue_core::{Bridge, DeviceDiagnostic, SceneSummary, Target};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

// ── Targets ─────────────────────────────────────────────────────────

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "UUID")]
    uuid: String,
    #[tabled(rename = "Color")]
    color: String,
    #[tabled(rename = "Mirek")]
    mirek: String,
}

fn target_row(t: &Target) -> TargetRow {
    let caps = t.capabilities.as_ref();
    TargetRow {
        name: t.name.clone(),
        kind: t.kind.to_string(),
        uuid: t.uuid.clone(),
        color: caps.map_or_else(String::new, |c| {
            match (c.supports_color, c.supports_color_temperature) {
                (true, _) => "rgb".into(),
                (false, true) => "white".into(),
                (false, false) => "dim".into(),
            }
        }),
        mirek: caps
            .filter(|c| c.supports_color_temperature)
            .map_or_else(String::new, |c| format!("{}-{}", c.mirek_min, c.mirek_max)),
    }
}

pub async fn targets(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let targets = bridge.list_targets().await?;
    let out = output::render_list(global.output, &targets, target_row)?;
    output::print_output(&out);
    Ok(())
}

// ── Scenes ──────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SceneRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Lights")]
    lights: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "UUID")]
    uuid: String,
}

fn scene_row(s: &SceneSummary) -> SceneRow {
    SceneRow {
        name: s.name.clone(),
        group: output::opt(s.group.as_ref().map(|g| format!("{} ({})", g.name, g.kind))),
        lights: s
            .lights
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        speed: output::opt(s.speed.map(|v| format!("{v:.2}"))),
        uuid: s.uuid.clone(),
    }
}

pub async fn scenes(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let scenes = bridge.list_scenes().await?;
    let out = output::render_list(global.output, &scenes, scene_row)?;
    output::print_output(&out);
    Ok(())
}

// ── Diagnostics ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct DiagnosticRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Last Seen")]
    last_seen: String,
}

fn diagnostic_row(d: &DeviceDiagnostic, color: bool) -> DiagnosticRow {
    DiagnosticRow {
        name: d.name.clone(),
        class: d.class.to_string(),
        model: d.model.clone(),
        status: output::status_cell(&d.status, color),
        battery: output::battery_cell(d.battery, color),
        mac: output::opt(d.mac.as_deref()),
        last_seen: output::opt(d.last_seen.as_deref()),
    }
}

pub async fn diagnostics(bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let devices = bridge.diagnostics().await?;
    let color = output::should_color();
    let out = output::render_list(global.output, &devices, |d| diagnostic_row(d, color))?;
    output::print_output(&out);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use loxhue_core::{Capability, DeviceClass, TargetKind};

    use super::*;

    #[test]
    fn target_row_summarises_capabilities() {
        let target = Target {
            uuid: "l1".into(),
            name: "Desk".into(),
            kind: TargetKind::Light,
            capabilities: Some(Capability {
                supports_color: false,
                supports_color_temperature: true,
                mirek_min: 153,
                mirek_max: 454,
            }),
        };
        let row = target_row(&target);
        assert_eq!(row.kind, "light");
        assert_eq!(row.color, "white");
        assert_eq!(row.mirek, "153-454");
    }

    #[test]
    fn diagnostic_row_fills_missing_cells() {
        let device = DeviceDiagnostic {
            name: "Hall sensor".into(),
            model: "SML001".into(),
            class: DeviceClass::Sensor,
            status: "disconnected".into(),
            mac: None,
            battery: Some(12),
            last_seen: None,
        };
        let row = diagnostic_row(&device, false);
        assert_eq!(row.class, "sensor");
        assert_eq!(row.battery, "12%");
        assert_eq!(row.mac, "-");
    }
}
