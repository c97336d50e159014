//! Stations and the stop areas routes attach to.
//!
//! A station element stands alone or is grouped with platforms, stop
//! positions and entrances by one or more `public_transport=stop_area`
//! relations. Each such relation yields its own [`StopArea`]; a station
//! without one gets a single stop area wrapping just the station.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::diagnostics::{Diagnostics, ElementRef};
use crate::element::{Element, ElementId, ElementKind, Member};
use crate::modes::Modes;
use crate::store::ElementStore;
use crate::tags::{is_entrance, is_platform, is_station, is_stop, is_track, station_modes};

/// A physical stopping point recognised by its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Station {
    /// Owning element.
    pub id: ElementId,
    /// `name` tag, possibly empty.
    pub name: String,
    /// Modes the station declares.
    pub modes: Modes,
}

impl Station {
    fn from_element(element: &Element) -> Self {
        Self {
            id: element.id,
            name: element.tags.get("name").unwrap_or_default().to_owned(),
            modes: station_modes(&element.tags),
        }
    }
}

/// The operational station a route stops at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopArea {
    /// Stop-area relation id, or the station id for a stand-alone station.
    pub id: ElementId,
    /// The station this stop area belongs to.
    pub station: ElementId,
    /// Display name.
    pub name: String,
    /// Stop positions.
    pub stops: BTreeSet<ElementId>,
    /// Platforms.
    pub platforms: BTreeSet<ElementId>,
    /// Entrances usable to enter.
    pub entrances: BTreeSet<ElementId>,
    /// Entrances usable to leave.
    pub exits: BTreeSet<ElementId>,
    transfer: Option<ElementId>,
}

impl StopArea {
    fn standalone(station: &Station) -> Self {
        Self {
            id: station.id,
            station: station.id,
            name: station.name.clone(),
            stops: BTreeSet::new(),
            platforms: BTreeSet::new(),
            entrances: BTreeSet::new(),
            exits: BTreeSet::new(),
            transfer: None,
        }
    }

    fn from_relation(
        station: &Station,
        relation: &Element,
        store: &ElementStore,
        modes: &Modes,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let mut stop_area = Self::standalone(station);
        stop_area.id = relation.id;
        if let Some(name) = relation.tags.get("name") {
            name.clone_into(&mut stop_area.name);
        }
        let mut warned_about_tracks = false;
        for member in relation.members() {
            // Members outside the area of interest are legitimately missing.
            let Some(element) = store.get(&member.target) else {
                continue;
            };
            if element.is_untagged() {
                diagnostics.error(
                    format!("An untagged object {} in a stop_area", member.target),
                    Some(ElementRef::from(relation)),
                );
                continue;
            }
            if is_station(element, modes) {
                if element.id != station.id {
                    diagnostics.error(
                        "Stop area has multiple stations",
                        Some(ElementRef::from(relation)),
                    );
                }
            } else if is_stop(element) {
                stop_area.stops.insert(element.id);
            } else if is_platform(element) {
                stop_area.platforms.insert(element.id);
            } else if is_entrance(element) {
                stop_area.add_entrance(element, member, diagnostics);
            } else if is_track(element) && !warned_about_tracks {
                diagnostics.error(
                    "Tracks in a stop_area relation",
                    Some(ElementRef::from(relation)),
                );
                warned_about_tracks = true;
            }
        }
        stop_area
    }

    fn add_entrance(&mut self, element: &Element, member: &Member, diagnostics: &mut Diagnostics) {
        if element.kind() != ElementKind::Node {
            diagnostics.warn("Subway entrance is not a node", Some(element.into()));
        }
        if !element.tags.is("entrance", "exit") && member.role != "exit_only" {
            self.entrances.insert(element.id);
        }
        if !element.tags.is("entrance", "entrance") && member.role != "entry_only" {
            self.exits.insert(element.id);
        }
    }

    /// The interchange group this stop area belongs to, if any.
    #[must_use]
    pub const fn transfer(&self) -> Option<ElementId> {
        self.transfer
    }

    /// Join an interchange group.
    ///
    /// The first assignment sticks. Assigning a different group afterwards
    /// returns the group already held and leaves it in place.
    pub fn assign_transfer(&mut self, group: ElementId) -> Result<(), ElementId> {
        match self.transfer {
            None => {
                self.transfer = Some(group);
                Ok(())
            }
            Some(existing) if existing == group => Ok(()),
            Some(existing) => Err(existing),
        }
    }

    /// Transfer id when set, else the stop area's own id.
    #[must_use]
    pub fn transfer_or_id(&self) -> ElementId {
        self.transfer.unwrap_or(self.id)
    }

    /// Every element that resolves to this stop area.
    #[must_use]
    pub fn elements(&self) -> BTreeSet<ElementId> {
        let mut elements = BTreeSet::from([self.id, self.station]);
        elements.extend(&self.entrances);
        elements.extend(&self.exits);
        elements.extend(&self.stops);
        elements.extend(&self.platforms);
        elements
    }
}

/// Stations and stop areas of a city, indexed by every constituent element.
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    stations: BTreeMap<ElementId, Station>,
    stop_areas: BTreeMap<ElementId, StopArea>,
    by_element: HashMap<ElementId, Vec<ElementId>>,
}

impl StationIndex {
    /// Scan the store for stations and build their stop areas.
    pub fn resolve(store: &ElementStore, modes: &Modes, diagnostics: &mut Diagnostics) -> Self {
        let mut index = Self::default();
        let mut stops_and_platforms = HashSet::new();
        for element in store.iter() {
            if !is_station(element, modes) {
                continue;
            }
            if element.kind() == ElementKind::Relation
                && !element.tags.is("type", "multipolygon")
            {
                diagnostics.error(
                    format!(
                        "A railway station cannot be a relation of type '{}'",
                        element.tags.get("type").unwrap_or_default()
                    ),
                    Some(element.into()),
                );
                continue;
            }
            let station = Station::from_element(element);
            let relations = store.stop_areas_of(&station.id);
            let mut candidates = Vec::new();
            if relations.is_empty() {
                if !index.stop_areas.contains_key(&station.id) {
                    candidates.push(StopArea::standalone(&station));
                }
            } else {
                for relation in relations.iter().filter_map(|id| store.get(id)) {
                    if index.stop_areas.contains_key(&relation.id) {
                        continue;
                    }
                    candidates.push(StopArea::from_relation(
                        &station,
                        relation,
                        store,
                        modes,
                        diagnostics,
                    ));
                }
            }
            for stop_area in candidates {
                index.register(stop_area, &mut stops_and_platforms, diagnostics);
            }
            index.stations.insert(station.id, station);
        }
        index
    }

    fn register(
        &mut self,
        stop_area: StopArea,
        stops_and_platforms: &mut HashSet<ElementId>,
        diagnostics: &mut Diagnostics,
    ) {
        for element in stop_area.elements() {
            self.bucket(element).push(stop_area.id);
        }
        for shared in stop_area.stops.iter().chain(&stop_area.platforms) {
            if !stops_and_platforms.insert(*shared) {
                diagnostics.warn(
                    format!(
                        "A stop or a platform {shared} belongs to multiple stations, might be correct"
                    ),
                    None,
                );
            }
        }
        self.stop_areas.insert(stop_area.id, stop_area);
    }

    /// Stop areas resolved from an element, created empty on first access.
    fn bucket(&mut self, element: ElementId) -> &mut Vec<ElementId> {
        self.by_element.entry(element).or_default()
    }

    /// Stop areas an element resolves to, first registered first.
    #[must_use]
    pub fn stop_areas_for(&self, element: &ElementId) -> &[ElementId] {
        self.by_element
            .get(element)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// True when the element is part of some stop area.
    #[must_use]
    pub fn resolves(&self, element: &ElementId) -> bool {
        self.by_element.contains_key(element)
    }

    /// Look up a stop area.
    #[must_use]
    pub fn stop_area(&self, id: &ElementId) -> Option<&StopArea> {
        self.stop_areas.get(id)
    }

    /// Mutable access for transfer assignment.
    pub(crate) fn stop_area_mut(&mut self, id: &ElementId) -> Option<&mut StopArea> {
        self.stop_areas.get_mut(id)
    }

    /// All stop areas in id order.
    pub fn stop_areas(&self) -> impl Iterator<Item = &StopArea> {
        self.stop_areas.values()
    }

    /// All stations in id order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }
}
