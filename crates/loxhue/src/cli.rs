//! Clap derive structures for the `loxhue` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// loxhue -- Hue bridge ↔ UDP controller bridge
#[derive(Debug, Parser)]
#[command(
    name = "loxhue",
    version,
    about = "Drive Philips Hue lights from a UDP home-automation controller",
    long_about = "Forwards controller commands to a Hue bridge (rate limited and \
        coalesced per light) and reports bridge events back to the controller \
        as UDP datagrams.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "LOXHUE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Log format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge: stream events to the controller until Ctrl-C
    Run(RunArgs),

    /// Send one controller command (name + value code) and wait for it
    Send(SendArgs),

    /// Activate or deactivate a scene
    Scene(SceneArgs),

    /// List lights, groups, sensors and buttons that can be mapped
    #[command(alias = "t")]
    Targets,

    /// List scenes with their lights and room
    Scenes,

    /// Per-device connectivity and battery report
    #[command(alias = "diag")]
    Diagnostics,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Seconds between health log lines (0 disables)
    #[arg(long, default_value = "60")]
    pub health_interval: u64,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Mapped controller name, or `all`
    pub name: String,

    /// Value code: 0, 1, 2-100, 20BBBKKKK, or BBBGGGRRR
    pub value: String,

    /// Transition override in milliseconds
    #[arg(long, short = 't')]
    pub transition: Option<u32>,
}

#[derive(Debug, Args)]
pub struct SceneArgs {
    /// Scene UUID
    pub id: String,

    /// `on` recalls the scene, `off` switches its lights off
    pub action: SceneActionArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SceneActionArg {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
