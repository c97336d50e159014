//! Interchanges built from `public_transport=stop_area_group` relations.

use std::collections::BTreeSet;

use crate::diagnostics::{Diagnostics, ElementRef};
use crate::element::{Element, ElementId};
use crate::station::StationIndex;
use crate::store::ElementStore;
use crate::tags::is_transfer_candidate;

/// A set of stop areas passengers can change between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// The stop-area-group relation.
    pub id: ElementId,
    /// At least two stop areas.
    pub stop_areas: BTreeSet<ElementId>,
}

impl Transfer {
    /// Keep only the stop areas some route stops at.
    ///
    /// Returns `None` when fewer than two remain, which is no longer an
    /// interchange.
    #[must_use]
    pub fn retain_used(mut self, used: &BTreeSet<ElementId>) -> Option<Self> {
        self.stop_areas.retain(|id| used.contains(id));
        (self.stop_areas.len() > 1).then_some(self)
    }
}

/// Build an interchange from a stop-area group.
///
/// Members outside the dataset are skipped, since a group near the city
/// boundary may list stop areas that were not fetched. Each stop area keeps
/// the first group it was assigned to; a second assignment, or the same
/// stop area listed twice, is an error.
pub fn make_transfer(
    group: &Element,
    store: &ElementStore,
    stations: &mut StationIndex,
    diagnostics: &mut Diagnostics,
) -> Option<Transfer> {
    let mut stop_areas = BTreeSet::new();
    let mut listed = BTreeSet::new();
    for member in group.members() {
        let Some(element) = store.get(&member.target) else {
            continue;
        };
        if element.is_untagged() {
            diagnostics.error(
                format!("An untagged object {} in a stop_area_group", member.target),
                Some(ElementRef::from(group)),
            );
            continue;
        }
        if !is_transfer_candidate(element) {
            continue;
        }
        let Some(&first) = stations.stop_areas_for(&member.target).first() else {
            continue;
        };
        let Some(stop_area) = stations.stop_area_mut(&first) else {
            continue;
        };
        if !listed.insert(member.target) || stop_area.assign_transfer(group.id).is_err() {
            diagnostics.error(
                format!("Stop area {} belongs to multiple interchanges", member.target),
                None,
            );
        }
        stop_areas.insert(first);
    }
    (stop_areas.len() > 1).then(|| Transfer {
        id: group.id,
        stop_areas,
    })
}
