//! Transport modes a city is audited for.

use std::collections::BTreeSet;

/// Modes validated with strict count matching.
pub const MODES_RAPID: [&str; 4] = ["subway", "light_rail", "monorail", "train"];
/// Modes validated loosely.
pub const MODES_OVERGROUND: [&str; 5] = ["tram", "bus", "trolleybus", "aerialway", "ferry"];
/// Every mode a station can declare through `<mode>=yes`.
pub const ALL_MODES: [&str; 9] = [
    "subway",
    "light_rail",
    "monorail",
    "train",
    "tram",
    "bus",
    "trolleybus",
    "aerialway",
    "ferry",
];
/// Modes used for rapid-transit cities that do not list their own.
pub const DEFAULT_MODES_RAPID: [&str; 2] = ["subway", "light_rail"];
/// Modes used for overground cities that do not list their own.
pub const DEFAULT_MODES_OVERGROUND: [&str; 1] = ["tram"];

/// A set of transport mode names such as `subway` or `tram`.
///
/// Mode names are kept as free strings because reference tables may name
/// modes this crate has no special handling for.
///
/// # Examples
/// ```
/// use transit_audit_core::Modes;
///
/// let modes = Modes::from_iter(["subway", "light_rail"]);
/// assert!(modes.contains("subway"));
/// assert!(!modes.contains("tram"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modes(BTreeSet<String>);

impl Modes {
    /// Add a mode.
    pub fn insert(&mut self, mode: &str) {
        self.0.insert(mode.to_owned());
    }

    /// True when the mode is allowed.
    #[must_use]
    pub fn contains(&self, mode: &str) -> bool {
        self.0.contains(mode)
    }

    /// True when the two sets share no mode.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.0.is_disjoint(&other.0)
    }

    /// True when no mode is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the modes in name order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for Modes {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(str::to_owned).collect())
    }
}
