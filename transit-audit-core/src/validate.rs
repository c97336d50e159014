//! Consistency checks run once every structure of a city is built.
//!
//! Each check is independent: it records errors and warnings and never stops
//! the others from running. Counts are derived from id-ordered maps, so they
//! do not depend on the order elements were ingested in.

use std::collections::{BTreeMap, BTreeSet};

use crate::city::{CityMeta, ExpectedCounts};
use crate::diagnostics::{Diagnostics, format_id_list};
use crate::element::{ElementId, ElementKind};
use crate::route::{Route, RouteMaster, RouteNetwork};
use crate::station::StationIndex;
use crate::store::ElementStore;
use crate::tags::is_entrance;

/// Tolerated station shortfall, as a fraction of the expected count.
pub const ALLOWED_STATIONS_MISMATCH: f64 = 0.02;
/// Tolerated interchange shortfall, as a fraction of the expected count.
pub const ALLOWED_TRANSFERS_MISMATCH: f64 = 0.07;

/// Label used for lines that name no network.
const UNNAMED_NETWORK: &str = "(none)";

/// Entrances used by known stations.
///
/// Returned by every city validation and merged by the caller, so several
/// cities can be validated independently.
///
/// # Examples
/// ```
/// use transit_audit_core::{ElementId, EntranceUsage};
///
/// let mut all = EntranceUsage::default();
/// all.merge(EntranceUsage::from_iter([ElementId::node(1)]));
/// all.merge(EntranceUsage::from_iter([ElementId::node(1), ElementId::node(2)]));
/// assert_eq!(all.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntranceUsage(BTreeSet<ElementId>);

impl EntranceUsage {
    /// Fold another city's usage into this one.
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    /// Record an entrance as used.
    pub fn insert(&mut self, entrance: ElementId) {
        self.0.insert(entrance);
    }

    /// True when the entrance was used.
    #[must_use]
    pub fn contains(&self, entrance: &ElementId) -> bool {
        self.0.contains(entrance)
    }

    /// Number of used entrances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no entrance was used.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Used entrances in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ElementId> {
        self.0.iter()
    }
}

impl FromIterator<ElementId> for EntranceUsage {
    fn from_iter<I: IntoIterator<Item = ElementId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Everything a validation pass counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoundCounts {
    /// Distinct stations per line, summed over lines.
    pub stations: usize,
    /// Interchanges left after filtering.
    pub interchanges: usize,
    /// Stations no line stops at.
    pub unused_stations: usize,
    /// Entrances neither in a stop area nor used by a station.
    pub unused_entrances: usize,
    /// Entrances outside every stop area.
    pub entrances_not_in_stop_areas: usize,
    /// Distinct networks.
    pub networks: usize,
    /// Subway lines.
    pub subway_lines: usize,
    /// Rapid lines of any other mode.
    pub light_rail_lines: usize,
    /// Tram lines.
    pub tram_lines: usize,
    /// Bus lines.
    pub bus_lines: usize,
    /// Trolleybus lines.
    pub trolleybus_lines: usize,
    /// Overground lines that are not tram, bus or trolleybus.
    pub other_lines: usize,
}

/// Result of [`Validator::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    /// Counts to report.
    pub found: FoundCounts,
    /// Entrances to merge across cities.
    pub entrances: EntranceUsage,
}

/// Read-only view of a built city.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    /// Reference metadata.
    pub meta: &'a CityMeta,
    /// Ingested elements.
    pub store: &'a ElementStore,
    /// Stations and stop areas.
    pub stations: &'a StationIndex,
    /// Lines and interchanges.
    pub network: &'a RouteNetwork,
}

impl Validator<'_> {
    /// Run every check, recording problems in `diagnostics`.
    pub fn run(&self, diagnostics: &mut Diagnostics) -> Validation {
        let rapid = matches!(self.meta.expected, ExpectedCounts::Rapid { .. });
        let mut found = FoundCounts::default();
        let mut networks: BTreeMap<&str, usize> = BTreeMap::new();
        let mut unused: BTreeSet<ElementId> =
            self.stations.stations().map(|station| station.id).collect();
        for master in self.network.masters.values() {
            let label = master.network.as_deref().unwrap_or(UNNAMED_NETWORK);
            *networks.entry(label).or_default() += 1;
            if rapid {
                self.check_return_routes(master, diagnostics);
            }
            let mut line_stations = BTreeSet::new();
            for id in master.stop_areas() {
                if let Some(stop_area) = self.stations.stop_area(&id) {
                    line_stations.insert(stop_area.transfer_or_id());
                    unused.remove(&stop_area.station);
                }
            }
            found.stations += line_stations.len();
        }
        if !unused.is_empty() {
            found.unused_stations = unused.len();
            diagnostics.warn(
                format!("{} unused stations: {}", unused.len(), format_id_list(&unused)),
                None,
            );
        }

        let entrances = self.count_entrances(&mut found, diagnostics);
        found.interchanges = self.network.transfers.len();

        match self.meta.expected {
            ExpectedCounts::Rapid {
                stations,
                lines,
                light_lines,
                interchanges,
            } => {
                self.validate_lines(&mut found, lines, light_lines, diagnostics);
                reconcile_stations(found.stations, stations, diagnostics);
                reconcile_interchanges(found.interchanges, interchanges, diagnostics);
            }
            ExpectedCounts::Overground { tram_lines, .. } => {
                self.validate_overground_lines(&mut found, tram_lines, diagnostics);
            }
        }

        found.networks = networks.len();
        if networks.len() > self.meta.networks.len().max(1) {
            let listed = networks
                .iter()
                .map(|(name, count)| format!("{name} ({count})"))
                .collect::<Vec<_>>()
                .join("; ");
            diagnostics.warn(format!("More than one network: {listed}"), None);
        }
        Validation { found, entrances }
    }

    /// Key identifying a variant by its ends.
    ///
    /// Ends are compared by interchange so a train may terminate at any
    /// station of one. When both ends share an interchange the raw stop
    /// areas are used instead, otherwise a line between two stations of the
    /// same interchange would look circular.
    fn end_key(&self, route: &Route) -> Option<(ElementId, ElementId)> {
        if route.len() < 2 {
            return None;
        }
        let first = route.first()?.stop_area;
        let last = route.last()?.stop_area;
        let transfer_of = |id: ElementId| self.stations.stop_area(&id).and_then(|sa| sa.transfer());
        let (first_transfer, last_transfer) = (transfer_of(first), transfer_of(last));
        if first_transfer == last_transfer {
            Some((first, last))
        } else {
            Some((first_transfer.unwrap_or(first), last_transfer.unwrap_or(last)))
        }
    }

    fn check_return_routes(&self, master: &RouteMaster, diagnostics: &mut Diagnostics) {
        let mut variants: Vec<((ElementId, ElementId), &Route)> = Vec::new();
        for route in master.routes() {
            let Some(key) = self.end_key(route) else {
                continue;
            };
            if variants.iter().all(|(seen, _)| *seen != key) {
                variants.push((key, route));
            }
        }
        match variants.as_slice() {
            [] => diagnostics.error(
                format!(
                    "An empty route master {}. Please set construction:route if it is under construction",
                    master.key
                ),
                None,
            ),
            [_] => {
                if let Some(best) = master.best() {
                    diagnostics.error_if(
                        !best.is_circular,
                        "Only one route in route_master. Please check if it needs a return route",
                        Some(best.element_ref()),
                    );
                }
            }
            _ => {
                for ((start, end), route) in &variants {
                    let has_return = variants.iter().any(|(key, _)| *key == (*end, *start));
                    if !has_return {
                        diagnostics.warn(
                            "Route does not have a return direction",
                            Some(route.element_ref()),
                        );
                    }
                }
            }
        }
    }

    fn count_entrances(
        &self,
        found: &mut FoundCounts,
        diagnostics: &mut Diagnostics,
    ) -> EntranceUsage {
        let in_stop_areas = self.store.stop_area_members();
        let mut usage = EntranceUsage::default();
        let mut unused = Vec::new();
        let mut not_in_stop_areas = Vec::new();
        let entrances = self
            .store
            .iter()
            .filter(|element| element.kind() == ElementKind::Node && is_entrance(element));
        for entrance in entrances {
            let used = self.stations.resolves(&entrance.id);
            if used {
                usage.insert(entrance.id);
            }
            if !in_stop_areas.contains(&entrance.id) {
                not_in_stop_areas.push(entrance.id);
                if !used {
                    unused.push(entrance.id);
                }
            }
        }
        found.unused_entrances = unused.len();
        found.entrances_not_in_stop_areas = not_in_stop_areas.len();
        if !unused.is_empty() {
            diagnostics.warn(
                format!(
                    "Found {} entrances not used in routes or stop_areas: {}",
                    unused.len(),
                    format_id_list(&unused)
                ),
                None,
            );
        }
        if !not_in_stop_areas.is_empty() {
            diagnostics.warn(
                format!(
                    "{} subway entrances are not in stop_area relations: {}",
                    not_in_stop_areas.len(),
                    format_id_list(&not_in_stop_areas)
                ),
                None,
            );
        }
        usage
    }

    fn count_modes(&self) -> impl Iterator<Item = &str> {
        self.network
            .masters
            .values()
            .map(|master| master.mode.as_deref().unwrap_or_default())
    }

    fn validate_lines(
        &self,
        found: &mut FoundCounts,
        lines: u32,
        light_lines: u32,
        diagnostics: &mut Diagnostics,
    ) {
        found.light_rail_lines = self.count_modes().filter(|mode| *mode != "subway").count();
        found.subway_lines = self.network.masters.len() - found.light_rail_lines;
        if !count_matches(found.subway_lines, lines) {
            diagnostics.error(
                format!("Found {} subway lines, expected {lines}", found.subway_lines),
                None,
            );
        }
        if !count_matches(found.light_rail_lines, light_lines) {
            diagnostics.error(
                format!(
                    "Found {} light rail lines, expected {light_lines}",
                    found.light_rail_lines
                ),
                None,
            );
        }
    }

    fn validate_overground_lines(
        &self,
        found: &mut FoundCounts,
        tram_lines: u32,
        diagnostics: &mut Diagnostics,
    ) {
        let count = |wanted: &str| self.count_modes().filter(|mode| *mode == wanted).count();
        found.tram_lines = count("tram");
        found.bus_lines = count("bus");
        found.trolleybus_lines = count("trolleybus");
        found.other_lines = self
            .count_modes()
            .filter(|mode| !matches!(*mode, "tram" | "bus" | "trolleybus"))
            .count();
        if !count_matches(found.tram_lines, tram_lines) {
            diagnostics.error_if(
                found.tram_lines == 0,
                format!("Found {} tram lines, expected {tram_lines}", found.tram_lines),
                None,
            );
        }
    }
}

fn count_matches(found: usize, expected: u32) -> bool {
    u32::try_from(found).is_ok_and(|count| count == expected)
}

/// Shortfall of `found` against `expected` as a fraction of `expected`.
///
/// Negative when more were found than expected. `expected` must be non-zero.
#[expect(
    clippy::float_arithmetic,
    reason = "mismatch tolerances are fractions of the expected count"
)]
fn shortfall(found: usize, expected: u32) -> f64 {
    let found_count = u32::try_from(found).map_or(f64::from(u32::MAX), f64::from);
    (f64::from(expected) - found_count) / f64::from(expected)
}

/// Stations may fall short of the reference by a small fraction. Finding
/// more than expected, or any when none are expected, is always an error.
fn reconcile_stations(found: usize, expected: u32, diagnostics: &mut Diagnostics) {
    if count_matches(found, expected) {
        return;
    }
    let tolerated = expected != 0
        && (0.0..=ALLOWED_STATIONS_MISMATCH).contains(&shortfall(found, expected));
    diagnostics.error_if(
        !tolerated,
        format!("Found {found} stations in routes, expected {expected}"),
        None,
    );
}

/// Interchanges may fall short by a larger fraction; an excess is only a
/// warning, and nothing is gated when none are expected.
fn reconcile_interchanges(found: usize, expected: u32, diagnostics: &mut Diagnostics) {
    if count_matches(found, expected) {
        return;
    }
    let is_error = expected != 0 && shortfall(found, expected) > ALLOWED_TRANSFERS_MISMATCH;
    diagnostics.error_if(
        is_error,
        format!("Found {found} interchanges, expected {expected}"),
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use rstest::rstest;

    #[rstest]
    #[case::exact(100, 100, None)]
    #[case::within_tolerance(99, 100, Some(false))]
    #[case::at_tolerance(98, 100, Some(false))]
    #[case::outside_tolerance(97, 100, Some(true))]
    #[case::excess(101, 100, Some(true))]
    #[case::none_expected(3, 0, Some(true))]
    fn station_reconciliation(
        #[case] found: usize,
        #[case] expected: u32,
        #[case] is_error: Option<bool>,
    ) {
        let mut log = Diagnostics::new();
        reconcile_stations(found, expected, &mut log);
        let recorded = log.entries().first().map(|d| d.severity == Severity::Error);
        assert_eq!(recorded, is_error);
    }

    #[rstest]
    #[case::exact(10, 10, None)]
    #[case::small_shortfall(14, 15, Some(false))]
    #[case::large_shortfall(9, 10, Some(true))]
    #[case::excess(12, 10, Some(false))]
    #[case::none_expected(4, 0, Some(false))]
    fn interchange_reconciliation(
        #[case] found: usize,
        #[case] expected: u32,
        #[case] is_error: Option<bool>,
    ) {
        let mut log = Diagnostics::new();
        reconcile_interchanges(found, expected, &mut log);
        let recorded = log.entries().first().map(|d| d.severity == Severity::Error);
        assert_eq!(recorded, is_error);
    }

    #[rstest]
    fn merging_usage_is_a_union() {
        let mut usage = EntranceUsage::from_iter([ElementId::node(1), ElementId::node(2)]);
        usage.merge(EntranceUsage::from_iter([ElementId::node(2), ElementId::node(3)]));
        let ids: Vec<String> = usage.iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3"]);
        assert!(usage.contains(&ElementId::node(3)));
    }
}
