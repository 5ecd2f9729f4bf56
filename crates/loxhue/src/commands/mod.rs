//! Subcommand handlers.

pub mod inventory;
pub mod run;
pub mod scene;
pub mod send;

use tracing::{debug, warn};

use loxhue_core::{Bridge, Category};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Load configuration and build a bridge handle. Nothing is contacted yet.
pub async fn connect(global: &GlobalOpts) -> Result<Bridge, CliError> {
    let cfg = loxhue_config::load_config(global.config.as_deref())?;
    let (mapping, warnings) = loxhue_config::validate_mapping(&cfg.mapping);
    for warning in &warnings {
        warn!(category = %Category::System, "{warning}");
    }
    let config = loxhue_config::to_bridge_config(&cfg)?;
    debug!(
        host = %config.host,
        controller = ?config.controller,
        mapped = mapping.len(),
        "configuration loaded"
    );
    Ok(Bridge::new(config, mapping).await?)
}

pub async fn dispatch(cmd: Command, bridge: &Bridge, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, bridge).await,
        Command::Send(args) => send::handle(&args, bridge, global).await,
        Command::Scene(args) => scene::handle(&args, bridge, global).await,
        Command::Targets => inventory::targets(bridge, global).await,
        Command::Scenes => inventory::scenes(bridge, global).await,
        Command::Diagnostics => inventory::diagnostics(bridge, global).await,
        Command::Completions(_) => Err(CliError::Internal(
            "completions are generated without a bridge".into(),
        )),
    }
}
