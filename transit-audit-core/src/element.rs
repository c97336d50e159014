//! Raw map elements and their composite identities.
//!
//! Elements mirror the OpenStreetMap data model: nodes, ways and relations,
//! each carrying free-form tags. Relations also carry an ordered member list.
//! Identity is the pair of kind and numeric id; two elements only refer to
//! the same object when both parts match.

use std::fmt;

use crate::tags::Tags;

/// The three kinds of map element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// A single point.
    Node,
    /// An ordered list of nodes.
    Way,
    /// A grouping of other elements with roles.
    Relation,
}

impl ElementKind {
    /// Return the kind as the lowercase name used in map data.
    ///
    /// # Examples
    /// ```
    /// use transit_audit_core::ElementKind;
    ///
    /// assert_eq!(ElementKind::Relation.as_str(), "relation");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    const fn prefix(self) -> char {
        match self {
            Self::Node => 'n',
            Self::Way => 'w',
            Self::Relation => 'r',
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Self::Node),
            "way" => Ok(Self::Way),
            "relation" => Ok(Self::Relation),
            _ => Err(format!("unknown element kind '{s}'")),
        }
    }
}

/// Composite identity of an element.
///
/// Displays in the short form used throughout diagnostics: `n1`, `w2`, `r3`.
///
/// # Examples
/// ```
/// use transit_audit_core::ElementId;
///
/// let id = ElementId::relation(42);
/// assert_eq!(id.to_string(), "r42");
/// assert_ne!(id, ElementId::node(42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    /// Element kind.
    pub kind: ElementKind,
    /// Numeric identifier, unique within the kind.
    pub id: i64,
}

impl ElementId {
    /// Build an identity from its parts.
    #[must_use]
    pub const fn new(kind: ElementKind, id: i64) -> Self {
        Self { kind, id }
    }

    /// Identity of a node.
    #[must_use]
    pub const fn node(id: i64) -> Self {
        Self::new(ElementKind::Node, id)
    }

    /// Identity of a way.
    #[must_use]
    pub const fn way(id: i64) -> Self {
        Self::new(ElementKind::Way, id)
    }

    /// Identity of a relation.
    #[must_use]
    pub const fn relation(id: i64) -> Self {
        Self::new(ElementKind::Relation, id)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.id)
    }
}

/// A reference from a relation to another element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// The referenced element.
    pub target: ElementId,
    /// Free-form role, often empty.
    pub role: String,
}

impl Member {
    /// Build a member reference.
    pub fn new(target: ElementId, role: impl Into<String>) -> Self {
        Self {
            target,
            role: role.into(),
        }
    }
}

/// A tagged map element.
///
/// `members` is `None` when the source omitted the member list, which is
/// different from an empty list: relations without one are not ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Composite identity.
    pub id: ElementId,
    /// Tags; empty when the source carried none.
    pub tags: Tags,
    /// Ordered relation members.
    pub members: Option<Vec<Member>>,
}

impl Element {
    /// Build a node with the given tags.
    #[must_use]
    pub const fn node(id: i64, tags: Tags) -> Self {
        Self {
            id: ElementId::node(id),
            tags,
            members: None,
        }
    }

    /// Build a way with the given tags.
    #[must_use]
    pub const fn way(id: i64, tags: Tags) -> Self {
        Self {
            id: ElementId::way(id),
            tags,
            members: None,
        }
    }

    /// Build a relation with the given tags and members.
    #[must_use]
    pub const fn relation(id: i64, tags: Tags, members: Vec<Member>) -> Self {
        Self {
            id: ElementId::relation(id),
            tags,
            members: Some(members),
        }
    }

    /// Element kind shortcut.
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.id.kind
    }

    /// Members, or an empty slice when the list was absent.
    #[must_use]
    pub fn members(&self) -> &[Member] {
        self.members.as_deref().unwrap_or_default()
    }

    /// True when the element carries no tags at all.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}
