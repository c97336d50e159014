//! Per-city validation report.
//!
//! Field names follow the reference table so reports can be compared with it
//! directly: `subwayl_*` and `lightrl_*` for rapid transit, `busl_*`,
//! `trolleybusl_*`, `traml_*` and `otherl_*` for overground transit.

use serde::{Deserialize, Serialize};

use crate::city::{CityMeta, ExpectedCounts};
use crate::diagnostics::Diagnostics;
use crate::validate::FoundCounts;

/// Expected and found line counts, shaped by transport category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineReport {
    /// Rapid-transit counts.
    Rapid {
        /// Expected subway lines.
        subwayl_expected: u32,
        /// Expected light rail lines.
        lightrl_expected: u32,
        /// Subway lines found.
        subwayl_found: usize,
        /// Light rail lines found.
        lightrl_found: usize,
        /// Expected stations.
        stations_expected: u32,
        /// Expected interchanges.
        transfers_expected: u32,
    },
    /// Overground counts. Stations and interchanges are never expected.
    Overground {
        /// Always zero.
        stations_expected: u32,
        /// Always zero.
        transfers_expected: u32,
        /// Expected bus lines.
        busl_expected: u32,
        /// Expected trolleybus lines.
        trolleybusl_expected: u32,
        /// Expected tram lines.
        traml_expected: u32,
        /// Expected lines of other modes.
        otherl_expected: u32,
        /// Bus lines found.
        busl_found: usize,
        /// Trolleybus lines found.
        trolleybusl_found: usize,
        /// Tram lines found.
        traml_found: usize,
        /// Lines of other modes found.
        otherl_found: usize,
    },
}

/// Outcome of validating one city.
///
/// Diagnostics are rendered to text here and nowhere earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// City name.
    pub name: String,
    /// Country name.
    pub country: String,
    /// Continent name.
    pub continent: String,
    /// Stations found on lines.
    pub stations_found: usize,
    /// Interchanges found.
    pub transfers_found: usize,
    /// Entrances neither in a stop area nor used by a station.
    pub unused_entrances: usize,
    /// Distinct networks.
    pub networks: usize,
    /// Category-specific line counts.
    #[serde(flatten)]
    pub lines: LineReport,
    /// Rendered warnings.
    pub warnings: Vec<String>,
    /// Rendered errors.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Assemble a report from a city's metadata, counts and diagnostics.
    #[must_use]
    pub fn new(meta: &CityMeta, found: &FoundCounts, diagnostics: &Diagnostics) -> Self {
        let lines = match meta.expected {
            ExpectedCounts::Rapid {
                stations,
                lines,
                light_lines,
                interchanges,
            } => LineReport::Rapid {
                subwayl_expected: lines,
                lightrl_expected: light_lines,
                subwayl_found: found.subway_lines,
                lightrl_found: found.light_rail_lines,
                stations_expected: stations,
                transfers_expected: interchanges,
            },
            ExpectedCounts::Overground {
                tram_lines,
                trolleybus_lines,
                bus_lines,
                other_lines,
            } => LineReport::Overground {
                stations_expected: 0,
                transfers_expected: 0,
                busl_expected: bus_lines,
                trolleybusl_expected: trolleybus_lines,
                traml_expected: tram_lines,
                otherl_expected: other_lines,
                busl_found: found.bus_lines,
                trolleybusl_found: found.trolleybus_lines,
                traml_found: found.tram_lines,
                otherl_found: found.other_lines,
            },
        };
        Self {
            name: meta.name.clone(),
            country: meta.country.clone(),
            continent: meta.continent.clone(),
            stations_found: found.stations,
            transfers_found: found.interchanges,
            unused_entrances: found.unused_entrances,
            networks: found.networks,
            lines,
            warnings: diagnostics.warnings().map(ToString::to_string).collect(),
            errors: diagnostics.errors().map(ToString::to_string).collect(),
        }
    }

    /// True when the city passed: warnings never count.
    #[must_use]
    pub const fn is_good(&self) -> bool {
        self.errors.is_empty()
    }
}
