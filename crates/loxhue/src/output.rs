//! Output formatting: table or JSON, selected by `--output`.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Color only on an interactive stdout without `NO_COLOR`.
pub fn should_color() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Render a list either as a table of `R` rows or as the serialized data.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(Table::new(rows).with(Style::rounded()).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

pub fn print_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Cell helpers ────────────────────────────────────────────────────

pub fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

/// Connectivity status, colored when `color` is set.
pub fn status_cell(status: &str, color: bool) -> String {
    if !color {
        return status.to_owned();
    }
    match status {
        "connected" => status.green().to_string(),
        "connectivity_issue" => status.yellow().to_string(),
        "disconnected" => status.red().to_string(),
        _ => status.dimmed().to_string(),
    }
}

pub fn battery_cell(battery: Option<u8>, color: bool) -> String {
    match battery {
        Some(b) if color && b <= 20 => format!("{b}%").red().to_string(),
        Some(b) => format!("{b}%"),
        None => "-".into(),
    }
}
