//! Test helpers that lay out a reference table and element snapshots.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

const TABLE: &str = "\
id,name,country,continent,stations,lines,light,interchanges,bbox,networks
1,Metroville,Utopia,Europe,2,1,0,0,\"55.5,37.3,56.0,37.9\",
2,Nowhere,Utopia,Europe,5,1,0,0,\"1,2,3,4\",
3,Someday,Utopia,Europe,,,,,,
";

const SNAPSHOT: &str = r#"{"elements": [
    {"type": "node", "id": 1, "tags": {"railway": "station", "station": "subway", "name": "Alpha"}},
    {"type": "node", "id": 2, "tags": {"railway": "station", "station": "subway", "name": "Beta"}},
    {"type": "node", "id": 3, "tags": {"railway": "subway_entrance"}},
    {"type": "relation", "id": 20,
     "tags": {"type": "public_transport", "public_transport": "stop_area"},
     "members": [{"type": "node", "ref": 1, "role": ""}, {"type": "node", "ref": 3, "role": "entrance"}]},
    {"type": "relation", "id": 11,
     "tags": {"type": "route", "route": "subway", "ref": "1", "from": "Alpha", "to": "Beta"},
     "members": [{"type": "node", "ref": 1, "role": "stop"}, {"type": "node", "ref": 2, "role": "stop"}]},
    {"type": "relation", "id": 12,
     "tags": {"type": "route", "route": "subway", "ref": "1", "from": "Beta", "to": "Alpha"},
     "members": [{"type": "node", "ref": 2, "role": "stop"}, {"type": "node", "ref": 1, "role": "stop"}]},
    {"type": "relation", "id": 10,
     "tags": {"type": "route_master", "route_master": "subway", "ref": "1"},
     "members": [{"type": "relation", "ref": 11, "role": ""}, {"type": "relation", "ref": 12, "role": ""}]}
]}"#;

/// A temporary directory with `cities.csv` and an `elements/` directory
/// holding a snapshot for city 1 only.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        fs::write(root.join("cities.csv"), TABLE).expect("write table");
        fs::create_dir(root.join("elements")).expect("create elements dir");
        fs::write(root.join("elements/1.json"), SNAPSHOT).expect("write snapshot");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn cities(&self) -> Utf8PathBuf {
        self.root.join("cities.csv")
    }

    pub(super) fn elements(&self) -> Utf8PathBuf {
        self.root.join("elements")
    }
}
