//! Command-line interface for auditing city transit networks.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod error;
mod validate;

pub use error::CliError;
pub use validate::{AuditRun, ValidateConfig, audit_cities, write_reports};

use validate::ValidateArgs;

const ARG_CITIES: &str = "cities";
const ARG_ELEMENTS_DIR: &str = "elements-dir";
const ARG_CITY: &str = "city";
const ARG_OVERGROUND: &str = "overground";
const ARG_OUTPUT: &str = "output";
const ENV_CITIES: &str = "TRANSIT_AUDIT_CMDS_VALIDATE_CITIES";
const ENV_ELEMENTS_DIR: &str = "TRANSIT_AUDIT_CMDS_VALIDATE_ELEMENTS_DIR";

/// Run the CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments, configuration or inputs are invalid,
/// or when reports cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Validate(args) => validate::run_validate(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "transit-audit",
    about = "Validate public transport networks against reference counts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Audit every selected city and emit one report per city.
    Validate(ValidateArgs),
}

#[cfg(test)]
mod tests;
