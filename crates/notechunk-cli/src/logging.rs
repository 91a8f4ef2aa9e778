//! Logging initialization and color control.

use anyhow::Result;
use colored::control as color_control;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;
use crate::output::OutputFormat;

/// Initialize the tracing subscriber from the global flags.
///
/// Logs go to stderr. Machine-readable output drops to errors only unless
/// `--verbose` was given, and disables color.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let machine_output = cli.command.format().is_some_and(OutputFormat::is_machine);

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet || machine_output {
        Level::ERROR
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let env_no_color = std::env::var("NO_COLOR").ok().is_some();
    if env_no_color || machine_output {
        color_control::set_override(false);
    }
    Ok(())
}
