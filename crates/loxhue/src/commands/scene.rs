use serde::Serialize;

use loxhue_core::{Bridge, SceneAction};

use crate::cli::{GlobalOpts, SceneActionArg, SceneArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct SceneResult<'a> {
    scene: &'a str,
    action: String,
    lights: usize,
}

pub async fn handle(args: &SceneArgs, bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    let action = match args.action {
        SceneActionArg::On => SceneAction::On,
        SceneActionArg::Off => SceneAction::Off,
    };
    let lights = bridge.submit_scene_activation(&args.id, action).await?;
    bridge.wait_idle().await;

    let result = SceneResult {
        scene: &args.id,
        action: action.to_string(),
        lights,
    };
    let out = output::render_single(global.output, &result, |r| match action {
        SceneAction::On => format!("scene {} activated", r.scene),
        SceneAction::Off => format!("scene {} off ({} lights)", r.scene, r.lights),
    })?;
    output::print_output(&out);
    Ok(())
}
