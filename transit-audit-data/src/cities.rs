//! The CSV city reference table.
//!
//! One header row, then one city per row in the positional layout
//! [`CityMeta::from_record`] expects. Rows that are too short or lack a
//! bounding box are placeholders and are skipped.

use std::io::{BufReader, Read};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use thiserror::Error;
use transit_audit_core::{
    CityMeta, CityRecord, CityRecordError, MIN_RECORD_FIELDS, TransportCategory,
};

use crate::fs::open_file;

const BBOX_FIELD: usize = 8;

/// Errors raised while parsing table rows.
#[derive(Debug, Error)]
pub enum CityRowError {
    /// The CSV layer failed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A row has a malformed field.
    #[error("line {line}: {source}")]
    Record {
        /// One-based line number within the table.
        line: u64,
        /// The field error.
        #[source]
        source: CityRecordError,
    },
}

/// Errors returned when reading the reference table from disk.
#[derive(Debug, Error)]
pub enum CityTableError {
    /// The table could not be opened.
    #[error("failed to open city table {path}: {source}")]
    Open {
        /// Table path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A row could not be parsed.
    #[error("failed to parse city table {path}: {source}")]
    Parse {
        /// Table path.
        path: Utf8PathBuf,
        /// The row error.
        #[source]
        source: CityRowError,
    },
}

/// Parse a reference table from any reader.
///
/// # Errors
/// Returns [`CityRowError`] on malformed CSV or an unparsable field.
///
/// # Examples
/// ```
/// use transit_audit_core::TransportCategory;
/// use transit_audit_data::parse_city_table;
///
/// let table = "\
/// id,name,country,continent,stations,lines,light,interchanges,bbox,networks
/// 1,Metroville,Utopia,Europe,10,1,0,0,\"1,2,3,4\",
/// 2,Placeholder,Utopia,Europe,,,,,,
/// ";
/// let cities = parse_city_table(table.as_bytes(), TransportCategory::Rapid)?;
/// assert_eq!(cities.len(), 1);
/// # Ok::<(), transit_audit_data::CityRowError>(())
/// ```
pub fn parse_city_table<R: Read>(
    reader: R,
    category: TransportCategory,
) -> Result<Vec<CityRecord>, CityRowError> {
    let mut table = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let mut cities = Vec::new();
    for row in table.records() {
        let row = row?;
        let line = row.position().map_or(0, csv::Position::line);
        let fields: Vec<&str> = row.iter().collect();
        let has_bbox = fields.get(BBOX_FIELD).is_some_and(|bbox| !bbox.trim().is_empty());
        if fields.len() < MIN_RECORD_FIELDS || !has_bbox {
            debug!("skipping city table line {line}: no bounding box");
            continue;
        }
        let record = CityMeta::from_record(&fields, category)
            .map_err(|source| CityRowError::Record { line, source })?;
        cities.push(record);
    }
    Ok(cities)
}

/// Read the reference table at `path`.
///
/// # Errors
/// Returns [`CityTableError`] when the file cannot be opened or parsed.
pub fn read_city_table(
    path: &Utf8Path,
    category: TransportCategory,
) -> Result<Vec<CityRecord>, CityTableError> {
    let file = open_file(path).map_err(|source| CityTableError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let cities = parse_city_table(BufReader::new(file), category).map_err(|source| {
        CityTableError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!("read {} cities from {path}", cities.len());
    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use transit_audit_core::ExpectedCounts;

    const HEADER: &str =
        "id,name,country,continent,stations,lines,light,interchanges,bbox,networks\n";

    fn table(rows: &str) -> String {
        format!("{HEADER}{rows}")
    }

    #[rstest]
    fn parses_rows_with_a_bounding_box() {
        let csv = table(
            "7,Metroville,Utopia,Europe,120,4,1,9,\"55.5,37.3,56.0,37.9\",subway:Metro\n",
        );
        let cities = parse_city_table(csv.as_bytes(), TransportCategory::Rapid).expect("table");
        let [city] = cities.as_slice() else {
            panic!("expected one city, got {}", cities.len());
        };
        assert_eq!(city.meta.id, 7);
        assert_eq!(city.meta.name, "Metroville");
        assert_eq!(
            city.meta.expected,
            ExpectedCounts::Rapid {
                stations: 120,
                lines: 4,
                light_lines: 1,
                interchanges: 9,
            }
        );
        assert!(city.meta.networks.contains("Metro"));
        assert!(city.meta.bbox.is_some());
    }

    #[rstest]
    #[case("1,Short,Utopia,Europe\n")]
    #[case("2,NoBox,Utopia,Europe,10,1,0,0,,\n")]
    #[case("3,Blank,Utopia,Europe,10,1,0,0,  \n")]
    fn skips_placeholder_rows(#[case] row: &str) {
        let cities =
            parse_city_table(table(row).as_bytes(), TransportCategory::Rapid).expect("table");
        assert!(cities.is_empty());
    }

    #[rstest]
    fn missing_id_becomes_a_record_diagnostic() {
        let csv = table(",Anon,Utopia,Europe,10,1,0,0,\"1,2,3,4\"\n");
        let cities = parse_city_table(csv.as_bytes(), TransportCategory::Rapid).expect("table");
        let city = cities.first().expect("city");
        assert_eq!(city.meta.id, 0);
        assert!(!city.diagnostics.is_good());
    }

    #[rstest]
    fn reports_the_line_of_a_bad_count() {
        let csv = table(
            "1,Good,Utopia,Europe,10,1,0,0,\"1,2,3,4\"\n2,Bad,Utopia,Europe,ten,1,0,0,\"1,2,3,4\"\n",
        );
        match parse_city_table(csv.as_bytes(), TransportCategory::Rapid) {
            Err(CityRowError::Record { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected a record error, got {other:?}"),
        }
    }

    #[rstest]
    fn overground_tables_read_line_counts() {
        let csv = table("5,Tramtown,Utopia,Europe,3,1,20,2,\"1,2,3,4\"\n");
        let cities =
            parse_city_table(csv.as_bytes(), TransportCategory::Overground).expect("table");
        let expected = cities.first().map(|city| city.meta.expected);
        assert_eq!(
            expected,
            Some(ExpectedCounts::Overground {
                tram_lines: 3,
                trolleybus_lines: 1,
                bus_lines: 20,
                other_lines: 2,
            })
        );
    }

    #[rstest]
    fn reads_tables_from_disk() {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("temp file");
        file.write_all(table("1,Town,Utopia,Europe,1,1,0,0,\"1,2,3,4\"\n").as_bytes())
            .expect("write fixture");
        let path = Utf8PathBuf::from_path_buf(file.path().to_path_buf()).expect("utf-8 path");
        let cities = read_city_table(&path, TransportCategory::Rapid).expect("table");
        assert_eq!(cities.len(), 1);
    }

    #[rstest]
    fn reports_missing_tables_with_path() {
        let path = Utf8PathBuf::from("/nonexistent/cities.csv");
        match read_city_table(&path, TransportCategory::Rapid) {
            Err(CityTableError::Open { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected an open error, got {other:?}"),
        }
    }
}
