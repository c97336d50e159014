//! Data access for the transit audit.
//!
//! Responsibilities:
//! - Load element snapshots from Overpass JSON and OSM PBF files.
//! - Read the CSV city reference table.
//!
//! Boundaries:
//! - Do not encode validation rules (live in `transit-audit-core`).
//! - Return I/O and format failures as errors; data-quality findings are the
//!   core's diagnostics.
//!
//! Invariants:
//! - Files are opened through `cap-std` on UTF-8 paths.
//! - No global mutable state.

mod cities;
mod elements;
pub mod fs;

pub use cities::{CityRowError, CityTableError, parse_city_table, read_city_table};
pub use elements::{ElementLoadError, load_elements_json, load_elements_pbf, parse_elements_json};
