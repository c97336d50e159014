//! Route variants, route masters and the route builder.
//!
//! A [`Route`] is one ordered direction of service built from a route
//! relation. Variants of the same line are grouped into a [`RouteMaster`],
//! keyed by their route-master relation or, failing that, by their `ref`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::diagnostics::{Diagnostics, ElementRef};
use crate::element::{Element, ElementId, ElementKind, Member};
use crate::modes::Modes;
use crate::station::StationIndex;
use crate::store::ElementStore;
use crate::tags::{
    is_access_restricted, is_platform, is_route, is_station, is_stop, is_stop_area_group,
    is_track, is_under_construction, network_of,
};
use crate::transfer::{Transfer, make_transfer};

/// Which part of a stop a route member represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopRole {
    Stop,
    Platform,
}

impl StopRole {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Platform => "platform",
        }
    }

    /// Role a member actually plays, judged by its tags first and its
    /// declared role second.
    fn of(element: &Element, role: &str, modes: &Modes) -> Option<Self> {
        if is_stop(element) {
            Some(Self::Stop)
        } else if is_platform(element) {
            Some(Self::Platform)
        } else if is_station(element, modes) {
            if role.contains("platform") {
                Some(Self::Platform)
            } else {
                Some(Self::Stop)
            }
        } else {
            None
        }
    }
}

/// Read-only context shared by every member of one route relation.
#[derive(Clone, Copy)]
struct RouteScan<'a> {
    relation: &'a Element,
    store: &'a ElementStore,
    stations: &'a StationIndex,
    modes: &'a Modes,
}

impl RouteScan<'_> {
    fn context(&self) -> Option<ElementRef> {
        Some(ElementRef::from(self.relation))
    }
}

/// A route member that resolved to a stop area.
#[derive(Clone, Copy)]
struct Visit<'a> {
    element: &'a Element,
    member: &'a Member,
    stop_area: ElementId,
    actual: StopRole,
}

/// One stop of a route, resolved to a stop area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteStop {
    /// Stop area the route calls at.
    pub stop_area: ElementId,
    /// A stop position was listed.
    pub seen_stop: bool,
    /// A platform was listed.
    pub seen_platform: bool,
    /// The station itself was listed.
    pub seen_station: bool,
    /// Passengers may board.
    pub can_enter: bool,
    /// Passengers may alight.
    pub can_exit: bool,
}

impl RouteStop {
    const fn new(stop_area: ElementId) -> Self {
        Self {
            stop_area,
            seen_stop: false,
            seen_platform: false,
            seen_station: false,
            can_enter: false,
            can_exit: false,
        }
    }

    fn add(&mut self, scan: RouteScan<'_>, visit: Visit<'_>, diagnostics: &mut Diagnostics) {
        let element = visit.element;
        let role = visit.member.role.as_str();
        let is_station_member = is_station(element, scan.modes);
        if is_stop(element) {
            if role.contains("platform") {
                diagnostics.warn(
                    "Stop position in a platform role in a route",
                    Some(element.into()),
                );
            }
            if element.kind() != ElementKind::Node {
                diagnostics.error("Stop position is not a node", Some(element.into()));
            }
            self.can_exit |= !role.contains("entry_only");
            self.can_enter |= !role.contains("exit_only");
        } else if is_station_member {
            if !self.seen_stop && !self.seen_platform {
                self.can_enter = true;
                self.can_exit = true;
            }
        } else if is_platform(element) {
            if role.contains("stop") {
                diagnostics.warn("Platform in a stop role in a route", Some(element.into()));
            }
            self.can_exit |= !role.contains("entry_only");
            self.can_enter |= !role.contains("exit_only");
        } else {
            diagnostics.error(
                "Not a stop or platform in a route relation",
                Some(element.into()),
            );
        }

        let repeated = match visit.actual {
            StopRole::Platform => std::mem::replace(&mut self.seen_platform, true),
            StopRole::Stop if is_station_member => {
                self.seen_station = true;
                false
            }
            StopRole::Stop => std::mem::replace(&mut self.seen_stop, true),
        };
        if repeated {
            diagnostics.error_if(
                visit.actual == StopRole::Stop,
                format!(
                    "Multiple {}s for a station \"{}\" ({}) in a route relation",
                    visit.actual.as_str(),
                    element.tags.get("name").unwrap_or_default(),
                    element.id
                ),
                scan.context(),
            );
        }
    }
}

/// One direction of service of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Route relation id.
    pub id: ElementId,
    /// Transport mode (`route=*`).
    pub mode: String,
    /// Line reference, falling back to the master's.
    pub r#ref: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Network, see [`network_of`].
    pub network: Option<String>,
    /// Operator.
    pub operator: Option<String>,
    /// First stop name as tagged.
    pub from: Option<String>,
    /// Last stop name as tagged.
    pub to: Option<String>,
    /// Ordered stops.
    pub stops: Vec<RouteStop>,
    /// First and last stop share a stop area.
    pub is_circular: bool,
}

fn owned(value: Option<&str>) -> Option<String> {
    value.map(str::to_owned)
}

impl Route {
    /// Build a route from its relation, resolving members to stop areas.
    ///
    /// Data problems never abort the build; they are recorded and the
    /// offending member is skipped.
    pub fn build(
        relation: &Element,
        master: Option<&Element>,
        store: &ElementStore,
        stations: &StationIndex,
        modes: &Modes,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let scan = RouteScan {
            relation,
            store,
            stations,
            modes,
        };
        let tags = &relation.tags;
        let r#ref = tags
            .get("ref")
            .or_else(|| master.and_then(|m| m.tags.get("ref")));
        if r#ref.is_none() {
            diagnostics.warn("Missing ref on a route", scan.context());
        }
        for key in ["from", "to"] {
            if !tags.contains(key) {
                diagnostics.warn(format!("Missing {key} on a route"), scan.context());
            }
        }
        if tags.is("public_transport:version", "1") {
            diagnostics.warn(
                "Public transport version is 1, which means the route is an unsorted pile of objects",
                scan.context(),
            );
        }

        let mut route = Self {
            id: relation.id,
            mode: tags.get("route").unwrap_or_default().to_owned(),
            r#ref: owned(r#ref),
            name: owned(tags.get("name")),
            network: owned(network_of(tags)),
            operator: owned(tags.get("operator")),
            from: owned(tags.get("from")),
            to: owned(tags.get("to")),
            stops: Vec::new(),
            is_circular: false,
        };
        let mut walker = StopWalker::default();
        for member in relation.members() {
            if member.role.contains("inactive") {
                continue;
            }
            match stations.stop_areas_for(&member.target) {
                [] => route.check_loose_member(scan, member, diagnostics),
                [stop_area, rest @ ..] => {
                    if !rest.is_empty() {
                        let name = stations
                            .stop_area(stop_area)
                            .map_or("", |sa| sa.name.as_str());
                        diagnostics.error(
                            format!(
                                "Ambiguous station {name} in route. Please use stop_position or split interchange stations"
                            ),
                            scan.context(),
                        );
                    }
                    let Some(element) = store.get(&member.target) else {
                        continue;
                    };
                    let Some(actual) = StopRole::of(element, &member.role, modes) else {
                        continue;
                    };
                    let visit = Visit {
                        element,
                        member,
                        stop_area: *stop_area,
                        actual,
                    };
                    walker.visit(scan, &mut route, visit, diagnostics);
                }
            }
        }

        match route.stops.as_slice() {
            [] => diagnostics.error("Route has no stops", scan.context()),
            [_] => diagnostics.error("Route has only one stop", scan.context()),
            [first, .., last] => route.is_circular = first.stop_area == last.stop_area,
        }
        route
    }

    /// Report a member that resolves to no stop area.
    fn check_loose_member(
        &self,
        scan: RouteScan<'_>,
        member: &Member,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(element) = scan.store.get(&member.target) else {
            if member.role.contains("stop") || member.role.contains("platform") {
                diagnostics.error(
                    format!(
                        "{} {} {} for route relation is not in the dataset",
                        member.role, member.target.kind, member.target.id
                    ),
                    scan.context(),
                );
            }
            return;
        };
        if element.is_untagged() {
            diagnostics.error(
                format!("Untagged object {} in a route", member.target),
                scan.context(),
            );
        } else if is_under_construction(&element.tags) {
            let role = if member.role.is_empty() {
                "feature"
            } else {
                member.role.as_str()
            };
            diagnostics.warn(
                format!(
                    "Under construction {role} {} in route. Consider setting 'inactive' role or removing construction attributes",
                    member.target
                ),
                scan.context(),
            );
        } else if is_station(element, scan.modes) {
            // Already reported as a stop area with multiple stations.
        } else if matches!(element.tags.get("railway"), Some("station" | "halt")) {
            diagnostics.error(
                format!("Missing station={} on a {}", self.mode, member.role),
                Some(element.into()),
            );
        } else if let Some(actual) = StopRole::of(element, &member.role, scan.modes) {
            diagnostics.error(
                format!(
                    "{} {} {} is not connected to a station in route",
                    actual.as_str(),
                    member.target.kind,
                    member.target.id
                ),
                scan.context(),
            );
        } else if !is_track(element) {
            diagnostics.warn(
                format!(
                    "Unknown member type for {} {} in route",
                    member.target.kind, member.target.id
                ),
                scan.context(),
            );
        }
    }

    /// Number of stops.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stops.len()
    }

    /// True when no stop was resolved.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Diagnostic context naming this route.
    #[must_use]
    pub fn element_ref(&self) -> ElementRef {
        ElementRef {
            id: self.id,
            label: self
                .name
                .as_deref()
                .or(self.r#ref.as_deref())
                .unwrap_or_default()
                .to_owned(),
        }
    }

    /// First stop, if any.
    #[must_use]
    pub const fn first(&self) -> Option<&RouteStop> {
        self.stops.as_slice().first()
    }

    /// Last stop, if any.
    #[must_use]
    pub const fn last(&self) -> Option<&RouteStop> {
        self.stops.as_slice().last()
    }
}

/// Tracks the two-pass layout of route members.
///
/// Routes often list every stop position and then every platform, or the
/// reverse. When a stop area seen earlier comes back, it either continues a
/// circular route or starts the second pass, which must repeat the order of
/// the first.
#[derive(Debug, Default)]
struct StopWalker {
    seen_stops: bool,
    seen_platforms: bool,
    repeat_pos: Option<usize>,
    visited: BTreeSet<ElementId>,
}

impl StopWalker {
    fn visit(
        &mut self,
        scan: RouteScan<'_>,
        route: &mut Route,
        visit: Visit<'_>,
        diagnostics: &mut Diagnostics,
    ) {
        let member = visit.member;
        if !member.role.is_empty() && !member.role.contains(visit.actual.as_str()) {
            diagnostics.warn(
                format!(
                    "Wrong role '{}' for {} {}",
                    member.role,
                    visit.actual.as_str(),
                    member.target
                ),
                scan.context(),
            );
        }

        let first_pass = if self.repeat_pos.is_none() {
            self.first_pass_index(route, visit)
        } else {
            None
        };
        let target = match (first_pass, self.repeat_pos) {
            (Some(index), _) => Some(index),
            (None, Some(position)) => {
                self.second_pass_index(scan, route, visit, position, diagnostics)
            }
            (None, None) => None,
        };
        let Some(stop) = target.and_then(|index| route.stops.get_mut(index)) else {
            return;
        };
        stop.add(scan, visit, diagnostics);
        if self.repeat_pos.is_none() {
            self.seen_stops |= stop.seen_stop || stop.seen_station;
            self.seen_platforms |= stop.seen_platform;
        }
    }

    /// Index of the stop to update during the first pass, or `None` when the
    /// member starts the second pass.
    fn first_pass_index(&mut self, route: &mut Route, visit: Visit<'_>) -> Option<usize> {
        let stop_area = visit.stop_area;
        if route.is_empty() || !self.visited.contains(&stop_area) {
            return Some(self.push(route, stop_area));
        }
        if route.last().is_some_and(|stop| stop.stop_area == stop_area) {
            return Some(route.len().saturating_sub(1));
        }
        let circular = (self.seen_stops && self.seen_platforms)
            || (visit.actual == StopRole::Stop && !self.seen_platforms)
            || (visit.actual == StopRole::Platform && !self.seen_stops);
        if circular {
            Some(self.push(route, stop_area))
        } else {
            self.repeat_pos = Some(0);
            None
        }
    }

    /// Index of the stop a second-pass member repeats, searching forward
    /// from the last match.
    fn second_pass_index(
        &mut self,
        scan: RouteScan<'_>,
        route: &Route,
        visit: Visit<'_>,
        position: usize,
        diagnostics: &mut Diagnostics,
    ) -> Option<usize> {
        if position >= route.len() {
            return None;
        }
        let out_of_place = match visit.actual {
            StopRole::Stop => self.seen_stops,
            StopRole::Platform => self.seen_platforms,
        };
        if out_of_place {
            diagnostics.error(
                format!(
                    "Found an out-of-place {}: \"{}\" ({})",
                    visit.actual.as_str(),
                    visit.element.tags.get("name").unwrap_or_default(),
                    visit.element.id
                ),
                scan.context(),
            );
            return None;
        }
        let found = route
            .stops
            .iter()
            .skip(position)
            .position(|stop| stop.stop_area == visit.stop_area)
            .map(|offset| position + offset);
        self.repeat_pos = Some(found.unwrap_or(route.len()));
        if found.is_none() {
            diagnostics.error(
                format!(
                    "Incorrect order of {}s at {}",
                    visit.actual.as_str(),
                    visit.element.id
                ),
                scan.context(),
            );
        }
        found
    }

    fn push(&mut self, route: &mut Route, stop_area: ElementId) -> usize {
        route.stops.push(RouteStop::new(stop_area));
        self.visited.insert(stop_area);
        route.len().saturating_sub(1)
    }
}

/// Key grouping route variants into one line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MasterKey {
    /// Variants listed by a route-master relation.
    Relation(ElementId),
    /// Variants without a master sharing a `ref`.
    Ref(String),
    /// A route with neither master nor `ref` forms its own line.
    Lone(ElementId),
}

impl fmt::Display for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relation(id) | Self::Lone(id) => write!(f, "{id}"),
            Self::Ref(r#ref) => f.write_str(r#ref),
        }
    }
}

/// All variants of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMaster {
    /// Grouping key.
    pub key: MasterKey,
    /// Route-master relation, when there is one.
    pub relation: Option<ElementRef>,
    /// Common mode.
    pub mode: Option<String>,
    /// Common `ref`.
    pub r#ref: Option<String>,
    /// Line name.
    pub name: Option<String>,
    /// Network name.
    pub network: Option<String>,
    routes: Vec<Route>,
    best: Option<usize>,
}

impl RouteMaster {
    /// An empty master, seeded from its relation when present.
    #[must_use]
    pub fn new(key: MasterKey, relation: Option<&Element>) -> Self {
        let tags = relation.map(|element| &element.tags);
        Self {
            key,
            relation: relation.map(ElementRef::from),
            mode: owned(tags.and_then(|t| t.get("route_master"))),
            r#ref: owned(tags.and_then(|t| t.get("ref"))),
            name: owned(tags.and_then(|t| t.get("name"))),
            network: owned(tags.and_then(network_of)),
            routes: Vec::new(),
            best: None,
        }
    }

    /// Add a variant. Returns `false` when the route was rejected.
    pub fn add(&mut self, route: Route, diagnostics: &mut Diagnostics) -> bool {
        if route.is_empty() {
            return false;
        }
        let context = Some(route.element_ref());
        match &self.mode {
            None => self.mode = Some(route.mode.clone()),
            Some(mode) if *mode != route.mode => {
                diagnostics.error(
                    format!(
                        "Incompatible PT mode: master has {mode} and route has {}",
                        route.mode
                    ),
                    context.clone(),
                );
                return false;
            }
            Some(_) => {}
        }
        match (&self.network, &route.network) {
            (None, _) => self.network.clone_from(&route.network),
            (Some(master), Some(own)) if master != own => diagnostics.error(
                format!("Route has different network (\"{own}\") from master \"{master}\""),
                context.clone(),
            ),
            _ => {}
        }
        match &self.r#ref {
            None => self.r#ref.clone_from(&route.r#ref),
            Some(master) if route.r#ref.as_ref() != Some(master) => diagnostics.warn(
                format!(
                    "Route \"{}\" has different ref from master \"{master}\"",
                    route.r#ref.as_deref().unwrap_or_default()
                ),
                context,
            ),
            Some(_) => {}
        }
        if self.name.is_none() {
            self.name.clone_from(&route.name);
        }
        let is_best = self.best().is_none_or(|best| route.len() > best.len());
        self.routes.push(route);
        if is_best {
            self.best = Some(self.routes.len().saturating_sub(1));
        }
        true
    }

    /// Variants in the order they were added.
    #[must_use]
    pub const fn routes(&self) -> &[Route] {
        self.routes.as_slice()
    }

    /// The variant with the most stops; the earliest wins a tie.
    #[must_use]
    pub fn best(&self) -> Option<&Route> {
        self.best.and_then(|index| self.routes.get(index))
    }

    /// Number of variants.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no variant was accepted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Distinct stop areas over all variants, first visit first.
    #[must_use]
    pub fn stop_areas(&self) -> Vec<ElementId> {
        let mut seen = BTreeSet::new();
        self.routes
            .iter()
            .flat_map(|route| &route.stops)
            .map(|stop| stop.stop_area)
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// Output of the route scan.
#[derive(Debug, Clone, Default)]
pub struct RouteNetwork {
    /// Lines keyed by their grouping key.
    pub masters: BTreeMap<MasterKey, RouteMaster>,
    /// Interchanges whose members are served by some route.
    pub transfers: Vec<Transfer>,
}

/// Restricts which routes belong to the audited city.
#[derive(Debug, Clone, Copy)]
pub struct RouteFilter<'a> {
    /// Allowed modes.
    pub modes: &'a Modes,
    /// Allowed network names; empty means unrestricted.
    pub networks: &'a BTreeSet<String>,
}

impl RouteFilter<'_> {
    fn accepts(&self, route: &Element, master: Option<&Element>) -> bool {
        if !is_route(route, self.modes) || is_access_restricted(route) {
            return false;
        }
        if self.networks.is_empty() {
            return true;
        }
        let allowed = |element: &Element| {
            network_of(&element.tags).is_some_and(|network| self.networks.contains(network))
        };
        allowed(route) || master.is_some_and(allowed)
    }
}

/// Scan the store once: build lines from route relations and interchanges
/// from stop-area groups, then drop interchanges no route serves.
pub fn build_routes(
    store: &ElementStore,
    stations: &mut StationIndex,
    filter: RouteFilter<'_>,
    diagnostics: &mut Diagnostics,
) -> RouteNetwork {
    let mut network = RouteNetwork::default();
    for element in store.iter() {
        if is_stop_area_group(element) {
            if let Some(transfer) = make_transfer(element, store, stations, diagnostics) {
                network.transfers.push(transfer);
            }
            continue;
        }
        let master = store.master_of(&element.id);
        if !filter.accepts(element, master) {
            continue;
        }
        let route = Route::build(element, master, store, stations, filter.modes, diagnostics);
        let key = match (master, &route.r#ref) {
            (Some(relation), _) => MasterKey::Relation(relation.id),
            (None, Some(r#ref)) => MasterKey::Ref(r#ref.clone()),
            (None, None) => MasterKey::Lone(route.id),
        };
        let line = network
            .masters
            .entry(key.clone())
            .or_insert_with(|| RouteMaster::new(key.clone(), master));
        line.add(route, diagnostics);
        if line.is_empty() {
            network.masters.remove(&key);
        }
    }

    let used: BTreeSet<ElementId> = network
        .masters
        .values()
        .flat_map(RouteMaster::stop_areas)
        .collect();
    network.transfers = network
        .transfers
        .into_iter()
        .filter_map(|transfer| transfer.retain_used(&used))
        .collect();
    network
}
