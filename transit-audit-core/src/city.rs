//! City reference records and the per-city validation pipeline.
//!
//! A [`City`] owns every structure derived for one metropolitan area. It is
//! built from a [`CityRecord`], fed raw elements, and then validated in a
//! single pass:
//!
//! 1. [`City::add`] ingests elements into the store.
//! 2. [`City::extract_routes`] indexes the store, then resolves stations,
//!    routes and interchanges.
//! 3. [`City::validate`] reconciles the result with the expected counts.
//! 4. [`City::report`] renders the outcome.

use std::collections::BTreeSet;

use geo::{Rect, coord};
use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::element::Element;
use crate::modes::{DEFAULT_MODES_OVERGROUND, DEFAULT_MODES_RAPID, Modes};
use crate::report::ValidationReport;
use crate::route::{RouteFilter, RouteNetwork, build_routes};
use crate::station::StationIndex;
use crate::store::ElementStore;
use crate::validate::{EntranceUsage, FoundCounts, Validator};

/// Minimum number of positional fields in a reference record.
pub const MIN_RECORD_FIELDS: usize = 9;

/// Which family of transport a city is audited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCategory {
    /// Subway, light rail, monorail and train.
    Rapid,
    /// Tram, bus, trolleybus, aerialway and ferry.
    Overground,
}

/// Reference counts a city is reconciled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedCounts {
    /// Counts for rapid transit.
    Rapid {
        /// Stations served by some line.
        stations: u32,
        /// Subway lines.
        lines: u32,
        /// Lines of any other rapid mode.
        light_lines: u32,
        /// Interchanges.
        interchanges: u32,
    },
    /// Counts for overground transit.
    Overground {
        /// Tram lines.
        tram_lines: u32,
        /// Trolleybus lines.
        trolleybus_lines: u32,
        /// Bus lines.
        bus_lines: u32,
        /// Lines of any other mode.
        other_lines: u32,
    },
}

impl ExpectedCounts {
    /// Category these counts belong to.
    #[must_use]
    pub const fn category(&self) -> TransportCategory {
        match self {
            Self::Rapid { .. } => TransportCategory::Rapid,
            Self::Overground { .. } => TransportCategory::Overground,
        }
    }
}

/// Reference metadata for one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityMeta {
    /// Identifier; `0` when the record carried none.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Country name.
    pub country: String,
    /// Continent name.
    pub continent: String,
    /// Expected counts.
    pub expected: ExpectedCounts,
    /// Allowed network names; empty means any network.
    pub networks: BTreeSet<String>,
    /// Allowed transport modes.
    pub modes: Modes,
    /// Bounding box, x being longitude.
    pub bbox: Option<Rect<f64>>,
}

/// Errors returned by [`CityMeta::from_record`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CityRecordError {
    /// The record is shorter than the positional layout requires.
    #[error("city record has {found} fields, expected at least {expected}")]
    TooFewFields {
        /// Fields present.
        found: usize,
        /// Fields required.
        expected: usize,
    },
    /// A numeric field did not parse.
    #[error("city record field {field} is not a valid number: '{value}'")]
    InvalidNumber {
        /// Field name.
        field: &'static str,
        /// Raw field text.
        value: String,
    },
}

/// A parsed reference record plus the problems found while parsing it.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRecord {
    /// Parsed metadata.
    pub meta: CityMeta,
    /// Non-fatal problems, such as a missing id.
    pub diagnostics: Diagnostics,
}

fn field<'a>(fields: &[&'a str], index: usize) -> &'a str {
    fields.get(index).copied().unwrap_or_default().trim()
}

fn parse_count(
    fields: &[&str],
    index: usize,
    name: &'static str,
    required: bool,
) -> Result<u32, CityRecordError> {
    let raw = field(fields, index);
    if raw.is_empty() && !required {
        return Ok(0);
    }
    raw.parse().map_err(|_| CityRecordError::InvalidNumber {
        field: name,
        value: raw.to_owned(),
    })
}

/// Parse `minlat,minlon,maxlat,maxlon` into a longitude-first rectangle.
fn parse_bbox(raw: &str) -> Result<Option<Rect<f64>>, CityRecordError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [min_lat, min_lon, max_lat, max_lon] = parts.as_slice() else {
        return Ok(None);
    };
    let parse = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|_| CityRecordError::InvalidNumber {
                field: "bbox",
                value: raw.to_owned(),
            })
    };
    Ok(Some(Rect::new(
        coord! { x: parse(min_lon)?, y: parse(min_lat)? },
        coord! { x: parse(max_lon)?, y: parse(max_lat)? },
    )))
}

/// Split `modes:networks` into its two sets.
///
/// A field without a colon lists networks only. Missing modes fall back to
/// the category defaults.
fn parse_modes_networks(raw: &str, category: TransportCategory) -> (Modes, BTreeSet<String>) {
    let parts: Vec<&str> = raw.split(':').collect();
    let networks = parts
        .last()
        .map(|list| {
            list.split(';')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();
    let modes = match parts.as_slice() {
        [listed, _, ..] if !listed.trim().is_empty() => {
            listed.split(',').map(str::trim).collect::<Modes>()
        }
        _ => match category {
            TransportCategory::Rapid => DEFAULT_MODES_RAPID.into_iter().collect(),
            TransportCategory::Overground => DEFAULT_MODES_OVERGROUND.into_iter().collect(),
        },
    };
    (modes, networks)
}

impl CityMeta {
    /// Build city metadata from a positional reference record.
    ///
    /// Fields are: id, name, country, continent, four counts, bounding box
    /// and an optional `modes:networks` field. Rapid-transit counts are
    /// stations, lines, light lines and interchanges, with only the station
    /// count required. Overground counts are tram, trolleybus, bus and other
    /// lines.
    ///
    /// # Errors
    /// Returns [`CityRecordError`] when the record is too short or a number
    /// does not parse. A missing id is not fatal; it is recorded in the
    /// returned diagnostics and the id defaults to `0`.
    ///
    /// # Examples
    /// ```
    /// use transit_audit_core::{CityMeta, TransportCategory};
    ///
    /// let fields = [
    ///     "1", "Metroville", "Nowhere", "Europe", "10", "2", "0", "1",
    ///     "50.0,4.0,51.0,5.0", "subway:Metro",
    /// ];
    /// let record = CityMeta::from_record(&fields, TransportCategory::Rapid)?;
    /// assert_eq!(record.meta.name, "Metroville");
    /// assert!(record.meta.networks.contains("Metro"));
    /// assert!(record.diagnostics.is_good());
    /// # Ok::<(), transit_audit_core::CityRecordError>(())
    /// ```
    pub fn from_record(
        fields: &[&str],
        category: TransportCategory,
    ) -> Result<CityRecord, CityRecordError> {
        if fields.len() < MIN_RECORD_FIELDS {
            return Err(CityRecordError::TooFewFields {
                found: fields.len(),
                expected: MIN_RECORD_FIELDS,
            });
        }
        let mut diagnostics = Diagnostics::new();
        let name = field(fields, 1).to_owned();
        let raw_id = field(fields, 0);
        let id = if raw_id.is_empty() {
            diagnostics.error(format!("City {name} does not have an id"), None);
            0
        } else {
            raw_id.parse().map_err(|_| CityRecordError::InvalidNumber {
                field: "id",
                value: raw_id.to_owned(),
            })?
        };
        let expected = match category {
            TransportCategory::Rapid => ExpectedCounts::Rapid {
                stations: parse_count(fields, 4, "stations", true)?,
                lines: parse_count(fields, 5, "lines", false)?,
                light_lines: parse_count(fields, 6, "light_lines", false)?,
                interchanges: parse_count(fields, 7, "interchanges", false)?,
            },
            TransportCategory::Overground => ExpectedCounts::Overground {
                tram_lines: parse_count(fields, 4, "tram_lines", false)?,
                trolleybus_lines: parse_count(fields, 5, "trolleybus_lines", false)?,
                bus_lines: parse_count(fields, 6, "bus_lines", false)?,
                other_lines: parse_count(fields, 7, "other_lines", false)?,
            },
        };
        let (modes, networks) = parse_modes_networks(field(fields, 9), category);
        let meta = Self {
            id,
            name,
            country: field(fields, 2).to_owned(),
            continent: field(fields, 3).to_owned(),
            expected,
            networks,
            modes,
            bbox: parse_bbox(field(fields, 8))?,
        };
        Ok(CityRecord { meta, diagnostics })
    }

    /// Category of the expected counts.
    #[must_use]
    pub const fn category(&self) -> TransportCategory {
        self.expected.category()
    }
}

/// One city being validated.
#[derive(Debug, Clone)]
pub struct City {
    meta: CityMeta,
    diagnostics: Diagnostics,
    store: ElementStore,
    stations: StationIndex,
    network: RouteNetwork,
    found: FoundCounts,
}

impl City {
    /// A city with no elements yet.
    #[must_use]
    pub fn new(record: CityRecord) -> Self {
        Self {
            meta: record.meta,
            diagnostics: record.diagnostics,
            store: ElementStore::new(),
            stations: StationIndex::default(),
            network: RouteNetwork::default(),
            found: FoundCounts::default(),
        }
    }

    /// Ingest one raw element.
    pub fn add(&mut self, element: Element) {
        self.store.add(element);
    }

    /// Index the ingested elements, resolve stations, then build routes and
    /// interchanges.
    pub fn extract_routes(&mut self) {
        self.store.index_members(&mut self.diagnostics);
        self.stations = StationIndex::resolve(&self.store, &self.meta.modes, &mut self.diagnostics);
        let filter = RouteFilter {
            modes: &self.meta.modes,
            networks: &self.meta.networks,
        };
        self.network = build_routes(
            &self.store,
            &mut self.stations,
            filter,
            &mut self.diagnostics,
        );
    }

    /// Reconcile the built network with the expected counts.
    ///
    /// Returns the entrances used by known stations so the caller can merge
    /// them across cities.
    pub fn validate(&mut self) -> EntranceUsage {
        let validator = Validator {
            meta: &self.meta,
            store: &self.store,
            stations: &self.stations,
            network: &self.network,
        };
        let outcome = validator.run(&mut self.diagnostics);
        self.found = outcome.found;
        outcome.entrances
    }

    /// Report for the current state.
    #[must_use]
    pub fn report(&self) -> ValidationReport {
        ValidationReport::new(&self.meta, &self.found, &self.diagnostics)
    }

    /// True when no error was recorded.
    #[must_use]
    pub fn is_good(&self) -> bool {
        self.diagnostics.is_good()
    }

    /// Reference metadata.
    #[must_use]
    pub const fn meta(&self) -> &CityMeta {
        &self.meta
    }

    /// Diagnostics recorded so far.
    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Counts found by the last validation.
    #[must_use]
    pub const fn found(&self) -> &FoundCounts {
        &self.found
    }

    /// Lines and interchanges built by [`City::extract_routes`].
    #[must_use]
    pub const fn network(&self) -> &RouteNetwork {
        &self.network
    }

    /// Stations and stop areas built by [`City::extract_routes`].
    #[must_use]
    pub const fn stations(&self) -> &StationIndex {
        &self.stations
    }
}

/// Run the whole pipeline for one city.
///
/// # Examples
/// ```
/// use transit_audit_core::{CityMeta, TransportCategory, audit};
///
/// let fields = ["7", "Empty", "", "", "0", "", "", "", ""];
/// let record = CityMeta::from_record(&fields, TransportCategory::Rapid)?;
/// let (report, entrances) = audit(record, Vec::new());
/// assert_eq!(report.stations_found, 0);
/// assert!(entrances.is_empty());
/// # Ok::<(), transit_audit_core::CityRecordError>(())
/// ```
#[must_use]
pub fn audit<I>(record: CityRecord, elements: I) -> (ValidationReport, EntranceUsage)
where
    I: IntoIterator<Item = Element>,
{
    let mut city = City::new(record);
    for element in elements {
        city.add(element);
    }
    city.extract_routes();
    let entrances = city.validate();
    (city.report(), entrances)
}
