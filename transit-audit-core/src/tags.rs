//! Tag maps and the transit tag vocabulary.
//!
//! Provides helpers to:
//! - read key/value tags through a small accessor type; and
//! - classify elements as stations, stops, platforms, tracks and routes.
//!
//! Every classifier is a pure predicate over an [`Element`] and the allowed
//! mode set, so the rules can be tested without building a city.

use std::collections::BTreeMap;

use crate::element::{Element, ElementKind};
use crate::modes::{ALL_MODES, Modes};

/// Keys marking an element as not yet in service.
pub const CONSTRUCTION_KEYS: [&str; 4] = [
    "construction",
    "proposed",
    "construction:railway",
    "proposed:railway",
];

/// `railway=*` values that describe running track.
pub const RAILWAY_TYPES: [&str; 7] = [
    "rail",
    "light_rail",
    "subway",
    "narrow_gauge",
    "funicular",
    "monorail",
    "tram",
];

/// Keys consulted, in order, to find an element's network.
const NETWORK_KEYS: [&str; 3] = ["network:metro", "network", "operator"];

/// Free-form key/value tags of one element.
///
/// Keys iterate in sorted order so derived output stays deterministic.
///
/// # Examples
/// ```
/// use transit_audit_core::Tags;
///
/// let tags = Tags::from_pairs([("railway", "station"), ("name", "Central")]);
/// assert_eq!(tags.get("railway"), Some("station"));
/// assert_eq!(tags.label(), "Central");
/// assert!(!tags.contains("ref"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// An empty tag map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Collect borrowed key/value pairs into owned tags.
    pub fn from_pairs<'a, T>(pairs: T) -> Self
    where
        T: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect()
    }

    /// Insert or replace a tag.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a tag value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// True when the key is present, whatever its value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// True when the tag equals the given value.
    #[must_use]
    pub fn is(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    /// True when no tags are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Human label: `name`, else `ref`, else an empty string.
    #[must_use]
    pub fn label(&self) -> &str {
        self.get("name").or_else(|| self.get("ref")).unwrap_or("")
    }

    /// Iterate over key/value pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Tags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// True when any construction key is present.
#[must_use]
pub fn is_under_construction(tags: &Tags) -> bool {
    CONSTRUCTION_KEYS.iter().any(|key| tags.contains(key))
}

/// Network of a route or route master: the first of `network:metro`,
/// `network` and `operator`.
#[must_use]
pub fn network_of(tags: &Tags) -> Option<&str> {
    NETWORK_KEYS.iter().find_map(|key| tags.get(key))
}

/// Modes a station declares through `station=<mode>` and `<mode>=yes`.
#[must_use]
pub fn station_modes(tags: &Tags) -> Modes {
    let mut modes = Modes::default();
    if let Some(mode) = tags.get("station") {
        modes.insert(mode);
    }
    for mode in ALL_MODES {
        if tags.is(mode, "yes") {
            modes.insert(mode);
        }
    }
    modes
}

/// Recognise a station for the given set of allowed modes.
///
/// Tram stops and bus stops count as stations when their mode is allowed.
/// Otherwise `public_transport=station` alone is too ambiguous, so a
/// `railway=station|halt` tag is required.
#[must_use]
pub fn is_station(element: &Element, modes: &Modes) -> bool {
    let tags = &element.tags;
    if modes.contains("tram") && tags.is("railway", "tram_stop") {
        return true;
    }
    if (modes.contains("bus") || modes.contains("trolleybus")) && tags.is("highway", "bus_stop")
    {
        return true;
    }
    if !matches!(tags.get("railway"), Some("station" | "halt")) {
        return false;
    }
    if is_under_construction(tags) {
        return false;
    }
    // station=train is never tagged, so trains accept any railway station.
    modes.contains("train") || !station_modes(tags).is_disjoint(modes)
}

/// A stop position on the track.
#[must_use]
pub fn is_stop(element: &Element) -> bool {
    let tags = &element.tags;
    tags.is("railway", "stop") || tags.is("public_transport", "stop_position")
}

/// A platform where passengers board.
#[must_use]
pub fn is_platform(element: &Element) -> bool {
    let tags = &element.tags;
    matches!(tags.get("railway"), Some("platform" | "platform_edge"))
        || tags.is("public_transport", "platform")
}

/// A way carrying running track.
#[must_use]
pub fn is_track(element: &Element) -> bool {
    element.kind() == ElementKind::Way
        && element
            .tags
            .get("railway")
            .is_some_and(|kind| RAILWAY_TYPES.contains(&kind))
}

/// A station entrance node.
#[must_use]
pub fn is_entrance(element: &Element) -> bool {
    element.tags.is("railway", "subway_entrance")
}

/// A `type=route_master` relation.
#[must_use]
pub fn is_route_master(element: &Element) -> bool {
    element.kind() == ElementKind::Relation && element.tags.is("type", "route_master")
}

/// A `public_transport=stop_area` relation, as indexed by the element store.
#[must_use]
pub fn is_stop_area(element: &Element) -> bool {
    element.kind() == ElementKind::Relation && element.tags.is("public_transport", "stop_area")
}

/// A stop area eligible to join an interchange: it must also carry
/// `type=public_transport`.
#[must_use]
pub fn is_transfer_candidate(element: &Element) -> bool {
    is_stop_area(element) && element.tags.is("type", "public_transport")
}

/// A `public_transport=stop_area_group` relation describing an interchange.
#[must_use]
pub fn is_stop_area_group(element: &Element) -> bool {
    element.kind() == ElementKind::Relation
        && element.tags.is("public_transport", "stop_area_group")
}

/// Recognise a route relation that can be built for the allowed modes.
///
/// It needs members, an allowed `route` mode, no construction keys and
/// either a `ref` or a `name`.
#[must_use]
pub fn is_route(element: &Element, modes: &Modes) -> bool {
    let tags = &element.tags;
    if element.kind() != ElementKind::Relation || !tags.is("type", "route") {
        return false;
    }
    if element.members.is_none() {
        return false;
    }
    if !tags.get("route").is_some_and(|mode| modes.contains(mode)) {
        return false;
    }
    if is_under_construction(tags) {
        return false;
    }
    tags.contains("ref") || tags.contains("name")
}

/// True for routes closed to the public.
#[must_use]
pub fn is_access_restricted(element: &Element) -> bool {
    matches!(element.tags.get("access"), Some("no" | "private"))
}
