//! Error types emitted by the transit audit CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use transit_audit_data::{CityTableError, ElementLoadError};

/// Errors emitted by the transit audit CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input file does not exist or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input directory does not exist or is not a directory.
    #[error("{field} path {path:?} does not exist or is not a directory")]
    MissingSourceDirectory {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// The city reference table could not be read.
    #[error(transparent)]
    CityTable(Box<CityTableError>),
    /// An element snapshot could not be loaded.
    #[error(transparent)]
    ElementLoad(Box<ElementLoadError>),
    /// Serialising the reports failed.
    #[error("failed to serialise reports: {0}")]
    SerialiseReports(#[source] serde_json::Error),
    /// Creating the output file failed.
    #[error("failed to create output file {path:?}: {source}")]
    CreateOutput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the reports failed.
    #[error("failed to write reports: {0}")]
    WriteReports(#[source] std::io::Error),
}

impl From<CityTableError> for CliError {
    fn from(err: CityTableError) -> Self {
        Self::CityTable(Box::new(err))
    }
}

impl From<ElementLoadError> for CliError {
    fn from(err: ElementLoadError) -> Self {
        Self::ElementLoad(Box::new(err))
    }
}
