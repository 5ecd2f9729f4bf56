use tracing::warn;

use loxhue_core::{Bridge, CommandOutcome, ValueCode};

use crate::cli::{GlobalOpts, SendArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &SendArgs, bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    // Colour payloads depend on what the fixture supports.
    if matches!(
        ValueCode::parse(&args.value),
        Ok(ValueCode::White { .. } | ValueCode::Packed { .. })
    ) {
        if let Err(e) = bridge.refresh_catalog().await {
            warn!(error = %e, "catalog unavailable, assuming colour support");
        }
    }

    let outcome = bridge.submit_command_with_transition(&args.name, &args.value, args.transition)?;
    bridge.wait_idle().await;

    let failed = bridge.stats().dispatch.failed;
    if failed > 0 {
        return Err(CliError::BridgeError {
            status: "-".into(),
            message: format!("{failed} write(s) failed, rerun with -v for details"),
        });
    }

    let out = output::render_single(global.output, &outcome, describe)?;
    output::print_output(&out);
    Ok(())
}

fn describe(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Dispatched { target_id, kind } => format!("sent to {kind} {target_id}"),
        CommandOutcome::Sequence { targets } => format!("sent to {targets} targets"),
        CommandOutcome::Recorded => "name is not mapped; recorded as detected".into(),
    }
}
