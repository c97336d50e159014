//! Network construction and validation for public-transport data.
//!
//! Responsibilities:
//! - Index raw map elements and classify them by tag vocabulary.
//! - Build stations, stop areas, routes, route masters and interchanges.
//! - Reconcile the result with a city's reference counts and report it.
//!
//! Boundaries:
//! - No I/O: element snapshots and reference tables are read by
//!   `transit-audit-data`.
//! - Data-quality problems are [`Diagnostics`], never `Err`.
//!
//! Invariants:
//! - One [`City`] owns all of its state; cities share nothing.
//! - Derived counts do not depend on element order.

pub mod city;
pub mod diagnostics;
pub mod element;
pub mod modes;
pub mod report;
pub mod route;
pub mod station;
pub mod store;
pub mod tags;
pub mod transfer;
pub mod validate;

pub use city::{
    City, CityMeta, CityRecord, CityRecordError, ExpectedCounts, MIN_RECORD_FIELDS,
    TransportCategory, audit,
};
pub use diagnostics::{Diagnostic, Diagnostics, ElementRef, Severity};
pub use element::{Element, ElementId, ElementKind, Member};
pub use modes::Modes;
pub use report::{LineReport, ValidationReport};
pub use route::{MasterKey, Route, RouteMaster, RouteNetwork, RouteStop};
pub use station::{Station, StationIndex, StopArea};
pub use store::ElementStore;
pub use tags::Tags;
pub use transfer::Transfer;
pub use validate::{
    ALLOWED_STATIONS_MISMATCH, ALLOWED_TRANSFERS_MISMATCH, EntranceUsage, FoundCounts,
};
