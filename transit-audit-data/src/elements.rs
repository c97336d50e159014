//! Element snapshot loaders.
//!
//! Two formats are understood: Overpass JSON (`{"elements": [...]}`) and OSM
//! PBF. Both produce core [`Element`]s with tags and, for relations, ordered
//! members with their roles. Way node lists and coordinates are dropped since
//! the audit never needs geometry.

use std::collections::BTreeMap;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use osmpbf::{ElementReader, RelMemberType};
use serde::Deserialize;
use thiserror::Error;
use transit_audit_core::{Element, ElementId, ElementKind, Member, Tags};

use crate::fs::open_file;

/// Errors returned when loading an element snapshot.
#[derive(Debug, Error)]
pub enum ElementLoadError {
    /// The snapshot could not be opened.
    #[error("failed to open element snapshot {path}: {source}")]
    Open {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The JSON snapshot is malformed.
    #[error("failed to parse element snapshot {path}: {source}")]
    Json {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The PBF snapshot could not be decoded.
    #[error("failed to decode OSM PBF data in {path}: {source}")]
    Pbf {
        /// Snapshot path.
        path: Utf8PathBuf,
        /// Underlying decode error.
        #[source]
        source: osmpbf::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    elements: Vec<RawElement>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    members: Option<Vec<RawMember>>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "ref")]
    target: i64,
    #[serde(default)]
    role: String,
}

impl RawElement {
    fn into_element(self) -> Option<Element> {
        let Ok(kind) = self.kind.parse::<ElementKind>() else {
            debug!("skipping {} {}: unsupported element type", self.kind, self.id);
            return None;
        };
        let tags: Tags = self.tags.into_iter().collect();
        let element = match kind {
            ElementKind::Node => Element::node(self.id, tags),
            ElementKind::Way => Element::way(self.id, tags),
            ElementKind::Relation => Element {
                id: ElementId::relation(self.id),
                tags,
                members: self.members.map(|members| {
                    members
                        .into_iter()
                        .filter_map(RawMember::into_member)
                        .collect()
                }),
            },
        };
        Some(element)
    }
}

impl RawMember {
    fn into_member(self) -> Option<Member> {
        let Ok(kind) = self.kind.parse::<ElementKind>() else {
            debug!("skipping member {} {}: unsupported element type", self.kind, self.target);
            return None;
        };
        Some(Member::new(ElementId::new(kind, self.target), self.role))
    }
}

/// Parse an Overpass JSON document already held in memory.
///
/// Elements of unsupported types, such as `area`, are skipped.
///
/// # Errors
/// Returns the parse error when the document is not an element snapshot.
///
/// # Examples
/// ```
/// use transit_audit_data::parse_elements_json;
///
/// let json = r#"{"elements": [
///     {"type": "node", "id": 1, "tags": {"railway": "station"}},
///     {"type": "area", "id": 2}
/// ]}"#;
/// let elements = parse_elements_json(json.as_bytes())?;
/// assert_eq!(elements.len(), 1);
/// # Ok::<(), serde_json::Error>(())
/// ```
pub fn parse_elements_json<R: std::io::Read>(reader: R) -> Result<Vec<Element>, serde_json::Error> {
    let snapshot: Snapshot = serde_json::from_reader(reader)?;
    Ok(snapshot
        .elements
        .into_iter()
        .filter_map(RawElement::into_element)
        .collect())
}

/// Load an Overpass JSON snapshot from disk.
///
/// # Errors
/// Returns [`ElementLoadError::Open`] when the file cannot be opened and
/// [`ElementLoadError::Json`] when it does not parse.
pub fn load_elements_json(path: &Utf8Path) -> Result<Vec<Element>, ElementLoadError> {
    let file = open_file(path).map_err(|source| ElementLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let elements =
        parse_elements_json(BufReader::new(file)).map_err(|source| ElementLoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("loaded {} elements from {path}", elements.len());
    Ok(elements)
}

fn from_pbf(element: osmpbf::Element<'_>) -> Vec<Element> {
    let converted = match element {
        osmpbf::Element::Node(node) => Element::node(node.id(), Tags::from_pairs(node.tags())),
        osmpbf::Element::DenseNode(node) => {
            Element::node(node.id(), Tags::from_pairs(node.tags()))
        }
        osmpbf::Element::Way(way) => Element::way(way.id(), Tags::from_pairs(way.tags())),
        osmpbf::Element::Relation(relation) => {
            let members = relation
                .members()
                .map(|member| {
                    let kind = match member.member_type {
                        RelMemberType::Node => ElementKind::Node,
                        RelMemberType::Way => ElementKind::Way,
                        RelMemberType::Relation => ElementKind::Relation,
                    };
                    let role = member.role().unwrap_or_default();
                    Member::new(ElementId::new(kind, member.member_id), role)
                })
                .collect();
            Element::relation(relation.id(), Tags::from_pairs(relation.tags()), members)
        }
    };
    vec![converted]
}

fn concat(mut left: Vec<Element>, mut right: Vec<Element>) -> Vec<Element> {
    left.append(&mut right);
    left
}

/// Load an OSM PBF snapshot from disk, decoding blobs in parallel.
///
/// Element order in the result is unspecified.
///
/// # Errors
/// Returns [`ElementLoadError::Open`] when the file cannot be opened and
/// [`ElementLoadError::Pbf`] when a blob fails to decode.
pub fn load_elements_pbf(path: &Utf8Path) -> Result<Vec<Element>, ElementLoadError> {
    let file = open_file(path).map_err(|source| ElementLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let elements = ElementReader::new(BufReader::new(file))
        .par_map_reduce(from_pbf, Vec::new, concat)
        .map_err(|source| ElementLoadError::Pbf {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("decoded {} elements from {path}", elements.len());
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::io::Write;
    use tempfile::NamedTempFile;
    use transit_audit_core::{CityMeta, TransportCategory, audit};

    const SNAPSHOT: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 55.7, "lon": 37.6,
             "tags": {"railway": "station", "station": "subway", "name": "Alpha"}},
            {"type": "node", "id": 2},
            {"type": "way", "id": 3, "nodes": [1, 2], "tags": {"railway": "subway"}},
            {"type": "relation", "id": 4,
             "tags": {"type": "route", "route": "subway", "ref": "1"},
             "members": [
                {"type": "node", "ref": 1, "role": "stop"},
                {"type": "way", "ref": 3, "role": ""},
                {"type": "area", "ref": 9, "role": ""},
                {"type": "relation", "ref": 5}
             ]},
            {"type": "area", "id": 3600000001, "tags": {"name": "Town"}}
        ]
    }"#;

    fn write_temp(contents: &[u8], suffix: &str) -> (NamedTempFile, Utf8PathBuf) {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .expect("temp file");
        file.write_all(contents).expect("write fixture");
        file.flush().expect("flush fixture");
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).expect("utf-8 path");
        (file, path)
    }

    #[fixture]
    fn snapshot() -> Vec<Element> {
        parse_elements_json(SNAPSHOT.as_bytes()).expect("valid snapshot")
    }

    #[rstest]
    fn parses_all_supported_kinds(snapshot: Vec<Element>) {
        let ids: Vec<String> = snapshot.iter().map(|el| el.id.to_string()).collect();
        assert_eq!(ids, ["n1", "n2", "w3", "r4"]);
    }

    #[rstest]
    fn untagged_elements_stay_untagged(snapshot: Vec<Element>) {
        let node = snapshot.get(1).expect("second node");
        assert!(node.is_untagged());
        assert!(node.members.is_none());
    }

    #[rstest]
    fn relation_members_keep_order_and_roles(snapshot: Vec<Element>) {
        let relation = snapshot.get(3).expect("relation");
        let members: Vec<(String, &str)> = relation
            .members()
            .iter()
            .map(|member| (member.target.to_string(), member.role.as_str()))
            .collect();
        assert_eq!(
            members,
            [
                ("n1".to_owned(), "stop"),
                ("w3".to_owned(), ""),
                ("r5".to_owned(), ""),
            ]
        );
    }

    #[rstest]
    #[case(r#"{"type": "relation", "id": 5, "tags": {"type": "route", "ref": "9"}}"#, None)]
    #[case(r#"{"type": "relation", "id": 5, "members": []}"#, Some(0))]
    fn relation_member_list_presence_is_kept(
        #[case] relation: &str,
        #[case] expected: Option<usize>,
    ) {
        let json = format!("{{\"elements\": [{relation}]}}");
        let elements = parse_elements_json(json.as_bytes()).expect("valid snapshot");
        let parsed = elements.first().expect("relation");
        assert_eq!(parsed.members.as_ref().map(Vec::len), expected);
    }

    #[rstest]
    fn relations_without_members_are_not_audited() {
        let json = r#"{"elements": [{"type": "relation", "id": 5,
            "tags": {"type": "route", "route": "subway", "ref": "9"}}]}"#;
        let elements = parse_elements_json(json.as_bytes()).expect("valid snapshot");
        let fields = ["7", "Empty", "", "", "0", "", "", "", ""];
        let record =
            CityMeta::from_record(&fields, TransportCategory::Rapid).expect("valid record");
        let (report, _entrances) = audit(record, elements);
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[rstest]
    #[case("{}")]
    #[case("[]")]
    #[case("{\"elements\": [{\"type\": \"node\"}]}")]
    fn rejects_malformed_documents(#[case] json: &str) {
        assert!(parse_elements_json(json.as_bytes()).is_err());
    }

    #[rstest]
    fn loads_json_from_disk() {
        let (_file, path) = write_temp(SNAPSHOT.as_bytes(), ".json");
        let elements = load_elements_json(&path).expect("load");
        assert_eq!(elements.len(), 4);
    }

    #[rstest]
    fn reports_json_errors_with_path() {
        let (_file, path) = write_temp(b"{\"elements\": 3}", ".json");
        match load_elements_json(&path) {
            Err(ElementLoadError::Json { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[rstest]
    fn reports_missing_pbf_files() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let missing =
            Utf8PathBuf::from_path_buf(dir.path().join("missing.osm.pbf")).expect("utf-8 path");
        match load_elements_pbf(&missing) {
            Err(ElementLoadError::Open { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected an open error, got {other:?}"),
        }
    }

    #[rstest]
    fn rejects_corrupted_pbf_data() {
        let (_file, path) = write_temp(&[0, 0, 0, 8, 1, 2, 3, 4, 5, 6, 7, 8], ".osm.pbf");
        assert!(matches!(
            load_elements_pbf(&path),
            Err(ElementLoadError::Pbf { .. })
        ));
    }
}
