//! Identity-keyed element store with stop-area and route-master indices.
//!
//! The store is filled during ingestion and indexed once afterwards by
//! [`ElementStore::index_members`]. Indexing walks elements in identity
//! order, so the indices and their diagnostics are independent of the order
//! elements arrived in.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Diagnostics, ElementRef};
use crate::element::{Element, ElementId, ElementKind};
use crate::tags::{is_route_master, is_stop_area};

/// Raw elements of one city plus the indices built from them.
#[derive(Debug, Clone, Default)]
pub struct ElementStore {
    elements: BTreeMap<ElementId, Element>,
    masters: BTreeMap<ElementId, ElementId>,
    stop_areas: BTreeMap<ElementId, Vec<ElementId>>,
}

impl ElementStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one element.
    ///
    /// Relations without a member list are dropped. A later element with the
    /// same identity replaces the earlier one.
    pub fn add(&mut self, element: Element) {
        if element.kind() == ElementKind::Relation && element.members.is_none() {
            return;
        }
        self.elements.insert(element.id, element);
    }

    /// Rebuild the route-master and stop-area indices.
    ///
    /// A route claimed twice keeps the route master with the lowest id, and
    /// every further claim is an error.
    pub fn index_members(&mut self, diagnostics: &mut Diagnostics) {
        let mut masters = BTreeMap::new();
        let mut stop_areas = BTreeMap::new();
        for element in self.elements.values() {
            if is_route_master(element) {
                index_route_master(&mut masters, element, diagnostics);
            } else if is_stop_area(element) {
                index_stop_area(&mut stop_areas, element, diagnostics);
            }
        }
        self.masters = masters;
        self.stop_areas = stop_areas;
    }

    /// Look up an element.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// True when the element was ingested.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// All elements in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// Number of stored elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True when nothing was stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The route-master relation listing this route, if any.
    #[must_use]
    pub fn master_of(&self, route: &ElementId) -> Option<&Element> {
        self.masters
            .get(route)
            .and_then(|master| self.elements.get(master))
    }

    /// Stop-area relations listing this element, lowest id first.
    #[must_use]
    pub fn stop_areas_of(&self, member: &ElementId) -> &[ElementId] {
        self.stop_areas
            .get(member)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every element listed by some stop-area relation.
    #[must_use]
    pub fn stop_area_members(&self) -> BTreeSet<ElementId> {
        self.iter()
            .filter(|element| is_stop_area(element))
            .flat_map(|element| element.members().iter().map(|member| member.target))
            .collect()
    }
}

fn index_route_master(
    masters: &mut BTreeMap<ElementId, ElementId>,
    master: &Element,
    diagnostics: &mut Diagnostics,
) {
    for member in master.members() {
        if member.target.kind != ElementKind::Relation {
            continue;
        }
        match masters.entry(member.target) {
            Entry::Vacant(slot) => {
                slot.insert(master.id);
            }
            Entry::Occupied(_) => {
                diagnostics.error("Route in two route_masters", Some(member.into()));
            }
        }
    }
}

fn index_stop_area(
    stop_areas: &mut BTreeMap<ElementId, Vec<ElementId>>,
    stop_area: &Element,
    diagnostics: &mut Diagnostics,
) {
    let mut warned_about_duplicates = false;
    for member in stop_area.members() {
        let bucket = stop_areas.entry(member.target).or_default();
        if bucket.contains(&stop_area.id) {
            if !warned_about_duplicates {
                diagnostics.warn(
                    "Duplicate element in a stop area",
                    Some(ElementRef::from(stop_area)),
                );
                warned_about_duplicates = true;
            }
        } else {
            bucket.push(stop_area.id);
        }
    }
}
