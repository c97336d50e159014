//! Facade crate for the transit network audit.
//!
//! This crate re-exports the core validation types and, behind the `data`
//! feature, the snapshot and reference-table loaders.

#![forbid(unsafe_code)]

pub use transit_audit_core::{
    City, CityMeta, CityRecord, CityRecordError, Diagnostic, Diagnostics, Element, ElementId,
    ElementKind, EntranceUsage, ExpectedCounts, Member, Modes, Route, RouteMaster, RouteNetwork,
    Severity, StationIndex, Tags, Transfer, TransportCategory, ValidationReport, audit,
};

#[cfg(feature = "data")]
pub use transit_audit_data::{
    CityTableError, ElementLoadError, load_elements_json, load_elements_pbf, read_city_table,
};
