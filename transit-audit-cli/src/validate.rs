//! Validate command implementation.

use std::io::{self, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use transit_audit_core::{Element, EntranceUsage, TransportCategory, ValidationReport, audit};
use transit_audit_data::fs::{create_file, is_dir, is_file};
use transit_audit_data::{ElementLoadError, load_elements_json, load_elements_pbf, read_city_table};

use crate::{
    ARG_CITIES, ARG_CITY, ARG_ELEMENTS_DIR, ARG_OUTPUT, ARG_OVERGROUND, CliError, ENV_CITIES,
    ENV_ELEMENTS_DIR,
};

/// CLI arguments for the `validate` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Read the city reference table, load each city's element \
                 snapshot from the elements directory and reconcile the \
                 network found there with the expected counts. Paths can \
                 come from CLI flags, configuration files, or environment \
                 variables.",
    about = "Audit cities against the reference table"
)]
#[ortho_config(prefix = "TRANSIT_AUDIT")]
pub(crate) struct ValidateArgs {
    /// Path to the CSV city reference table.
    #[arg(long = ARG_CITIES, value_name = "path")]
    #[serde(default)]
    pub(crate) cities: Option<Utf8PathBuf>,
    /// Directory holding `<city id>.json` or `<city id>.osm.pbf` snapshots.
    #[arg(long = ARG_ELEMENTS_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) elements_dir: Option<Utf8PathBuf>,
    /// Audit only the city with this name.
    #[arg(long = ARG_CITY, value_name = "name")]
    #[serde(default)]
    pub(crate) city: Option<String>,
    /// Audit overground modes instead of rapid transit.
    #[arg(long = ARG_OVERGROUND)]
    #[serde(default)]
    pub(crate) overground: bool,
    /// Write the JSON reports here instead of stdout.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl ValidateArgs {
    pub(crate) fn into_config(self) -> Result<ValidateConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ValidateConfig::try_from(merged)
    }
}

/// Resolved `validate` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateConfig {
    /// Path to the CSV city reference table.
    pub cities: Utf8PathBuf,
    /// Directory holding element snapshots.
    pub elements_dir: Utf8PathBuf,
    /// Restrict the run to one city name.
    pub city: Option<String>,
    /// Which transport family to audit.
    pub category: TransportCategory,
    /// Report destination; stdout when absent.
    pub output: Option<Utf8PathBuf>,
}

impl ValidateConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        if !is_file(&self.cities) {
            return Err(CliError::MissingSourceFile {
                field: ARG_CITIES,
                path: self.cities.clone(),
            });
        }
        if !is_dir(&self.elements_dir) {
            return Err(CliError::MissingSourceDirectory {
                field: ARG_ELEMENTS_DIR,
                path: self.elements_dir.clone(),
            });
        }
        Ok(())
    }

    fn selects(&self, name: &str) -> bool {
        self.city.as_deref().is_none_or(|wanted| wanted == name)
    }
}

impl TryFrom<ValidateArgs> for ValidateConfig {
    type Error = CliError;

    fn try_from(args: ValidateArgs) -> Result<Self, Self::Error> {
        let cities = args.cities.ok_or(CliError::MissingArgument {
            field: ARG_CITIES,
            env: ENV_CITIES,
        })?;
        let elements_dir = args.elements_dir.ok_or(CliError::MissingArgument {
            field: ARG_ELEMENTS_DIR,
            env: ENV_ELEMENTS_DIR,
        })?;
        let category = if args.overground {
            TransportCategory::Overground
        } else {
            TransportCategory::Rapid
        };
        Ok(Self {
            cities,
            elements_dir,
            city: args.city,
            category,
            output: args.output,
        })
    }
}

/// An element snapshot found for a city.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Snapshot {
    Json(Utf8PathBuf),
    Pbf(Utf8PathBuf),
}

impl Snapshot {
    /// Find `<id>.json`, falling back to `<id>.osm.pbf`.
    pub(crate) fn locate(dir: &Utf8Path, id: u64) -> Option<Self> {
        let json = dir.join(format!("{id}.json"));
        if is_file(&json) {
            return Some(Self::Json(json));
        }
        let pbf = dir.join(format!("{id}.osm.pbf"));
        is_file(&pbf).then_some(Self::Pbf(pbf))
    }

    fn load(&self) -> Result<Vec<Element>, ElementLoadError> {
        match self {
            Self::Json(path) => load_elements_json(path),
            Self::Pbf(path) => load_elements_pbf(path),
        }
    }
}

/// Outcome of auditing every selected city.
#[derive(Debug, Default)]
pub struct AuditRun {
    /// One report per audited city, in table order.
    pub reports: Vec<ValidationReport>,
    /// Entrances used by stations in any audited city.
    pub entrances: EntranceUsage,
    /// Cities skipped for lack of a snapshot.
    pub skipped: Vec<String>,
}

/// Audit every city the configuration selects.
///
/// Cities without a snapshot are skipped with a warning.
///
/// # Errors
/// Returns [`CliError`] when the table or a snapshot cannot be read.
pub fn audit_cities(config: &ValidateConfig) -> Result<AuditRun, CliError> {
    let records = read_city_table(&config.cities, config.category)?;
    let mut run = AuditRun::default();
    for record in records
        .into_iter()
        .filter(|record| config.selects(&record.meta.name))
    {
        let name = record.meta.name.clone();
        let Some(snapshot) = Snapshot::locate(&config.elements_dir, record.meta.id) else {
            warn!(
                "no element snapshot for {name} (id {}) in {}",
                record.meta.id, config.elements_dir
            );
            run.skipped.push(name);
            continue;
        };
        let elements = snapshot.load()?;
        let (report, entrances) = audit(record, elements);
        info!(
            "{name}: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
        run.entrances.merge(entrances);
        run.reports.push(report);
    }
    if let Some(wanted) = &config.city
        && run.reports.is_empty()
        && run.skipped.is_empty()
    {
        warn!("no city named {wanted} in {}", config.cities);
    }
    Ok(run)
}

/// Write reports as a pretty-printed JSON array followed by a newline.
///
/// # Errors
/// Returns [`CliError`] when serialisation or writing fails.
pub fn write_reports(writer: &mut dyn Write, reports: &[ValidationReport]) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(reports).map_err(CliError::SerialiseReports)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteReports)?;
    writer.write_all(b"\n").map_err(CliError::WriteReports)?;
    writer.flush().map_err(CliError::WriteReports)
}

pub(crate) fn resolve_validate_config(args: ValidateArgs) -> Result<ValidateConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

pub(crate) fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let config = resolve_validate_config(args)?;
    let run = audit_cities(&config)?;
    match &config.output {
        Some(path) => {
            let file = create_file(path).map_err(|source| CliError::CreateOutput {
                path: path.clone(),
                source,
            })?;
            write_reports(&mut BufWriter::new(file), &run.reports)?;
        }
        None => write_reports(&mut io::stdout().lock(), &run.reports)?,
    }
    let failed = run.reports.iter().filter(|report| !report.is_good()).count();
    info!(
        "audited {} cities ({failed} failed, {} skipped); {} entrances used by stations",
        run.reports.len(),
        run.skipped.len(),
        run.entrances.len()
    );
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ValidateConfig, CliError> {
    let merged = ValidateArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ValidateConfig::try_from(merged)
}
