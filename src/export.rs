//! Tabular export of aggregated rider series.
//!
//! Each (classification, metric) pair of the export catalog becomes one
//! table: a row per rider, sorted by id, with the rider's profile followed
//! by one column per stage. Unset slots render as empty cells.

use crate::constants::{EXPORT_CATALOG, TABLE_RIDER_COLUMNS, table_file_name};
use crate::error::{RaceError, Result};
use crate::models::{ClassificationKind, Metric, MetricValue, RiderMap, Series};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type Row = Vec<String>;

/// Header row for a table covering `num_stages` stages
pub fn header(num_stages: usize) -> Row {
    TABLE_RIDER_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain((1..=num_stages).map(|n| format!("stage_{}", n)))
        .collect()
}

pub fn render_cell(value: Option<MetricValue>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn parse_cell(cell: &str) -> Result<Option<MetricValue>> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Ok(None);
    }
    cell.parse::<MetricValue>()
        .map(Some)
        .map_err(|e| RaceError::schema("stage cell", format!("'{}' is not a number: {}", cell, e)))
}

/// One row per rider for a single (classification, metric) pair
pub fn to_rows(
    riders: &RiderMap,
    kind: ClassificationKind,
    metric: Metric,
    num_stages: usize,
) -> Result<Vec<Row>> {
    if !kind.has_metric(metric) {
        return Err(RaceError::schema(
            kind.as_str(),
            format!("{} is not tracked for the {} classification", metric, kind),
        ));
    }

    riders
        .iter()
        .map(|(id, rider)| -> Result<Row> {
            let series = rider.classification.series(kind, metric).ok_or_else(|| {
                RaceError::data_integrity(format!("rider {} has no {}.{} series", id, kind, metric))
            })?;
            if series.len() != num_stages {
                return Err(RaceError::data_integrity(format!(
                    "rider {} has {} {}.{} values, expected {}",
                    id,
                    series.len(),
                    kind,
                    metric,
                    num_stages
                )));
            }

            let profile = &rider.profile;
            let mut row = Vec::with_capacity(TABLE_RIDER_COLUMNS.len() + num_stages);
            row.push(id.clone());
            row.push(profile.first_name.clone());
            row.push(profile.last_name.clone());
            row.push(profile.country.clone());
            row.push(profile.birth_date.clone());
            row.push(profile.team.clone());
            row.extend(series.iter().map(|value| render_cell(*value)));
            Ok(row)
        })
        .collect()
}

/// Write one table, header first, with minimal quoting
pub fn write_table<W: Write>(
    writer: W,
    riders: &RiderMap,
    kind: ClassificationKind,
    metric: Metric,
    num_stages: usize,
) -> Result<()> {
    let rows = to_rows(riders, kind, metric, num_stages)?;

    let mut csv_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);
    csv_writer.write_record(header(num_stages))?;
    for row in &rows {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;

    debug!("Wrote {} rows for {}.{}", rows.len(), kind, metric);
    Ok(())
}

/// Write every catalog table into `output_dir`
pub fn write_tables(output_dir: &Path, riders: &RiderMap, num_stages: usize) -> Result<Vec<PathBuf>> {
    EXPORT_CATALOG
        .iter()
        .map(|&(kind, metric)| -> Result<PathBuf> {
            let path = output_dir.join(table_file_name(kind, metric));
            let file = BufWriter::new(File::create(&path)?);
            write_table(file, riders, kind, metric, num_stages)?;
            Ok(path)
        })
        .collect()
}

/// Read a table back into per-rider series keyed by id
pub fn read_table<R: Read>(reader: R) -> Result<BTreeMap<String, Series>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let skip = TABLE_RIDER_COLUMNS.len();

    let mut table = BTreeMap::new();
    for record in csv_reader.records() {
        let record = record?;
        let id = record
            .get(0)
            .ok_or_else(|| RaceError::schema("id", "row without an id column"))?
            .to_string();
        let series = record
            .iter()
            .skip(skip)
            .map(parse_cell)
            .collect::<Result<Series>>()?;
        table.insert(id, series);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rider, RiderProfile};

    fn rider(first_name: &str, num_stages: usize) -> Rider {
        Rider::new(
            RiderProfile {
                first_name: first_name.to_string(),
                last_name: "Rider".to_string(),
                country: "BEL".to_string(),
                birth_date: "1992-03-04".to_string(),
                team: "LTS".to_string(),
            },
            num_stages,
        )
    }

    #[test]
    fn test_header() {
        assert_eq!(
            header(2),
            vec!["id", "first_name", "last_name", "country", "birth_date", "team", "stage_1", "stage_2"]
        );
        assert_eq!(header(0).len(), 6);
    }

    #[test]
    fn test_unset_slot_renders_empty() {
        let mut riders = RiderMap::new();
        let mut r = rider("Greg", 2);
        r.classification.general.rank = vec![Some(5), None];
        riders.insert("17".to_string(), r);

        let rows = to_rows(&riders, ClassificationKind::General, Metric::Rank, 2).unwrap();
        assert_eq!(
            rows,
            vec![vec!["17", "Greg", "Rider", "BEL", "1992-03-04", "LTS", "5", ""]]
        );
    }

    #[test]
    fn test_rows_sorted_by_string_id() {
        let mut riders = RiderMap::new();
        for id in ["21", "3", "100"] {
            riders.insert(id.to_string(), rider("X", 1));
        }
        let rows = to_rows(&riders, ClassificationKind::Youth, Metric::Rank, 1).unwrap();
        let ids: Vec<&str> = rows.iter().map(|row| row[0].as_str()).collect();
        assert_eq!(ids, vec!["100", "21", "3"]);
    }

    #[test]
    fn test_length_mismatch_is_integrity_error() {
        let mut riders = RiderMap::new();
        riders.insert("1".to_string(), rider("Short", 2));
        let err = to_rows(&riders, ClassificationKind::Sprint, Metric::Points, 3).unwrap_err();
        assert!(matches!(err, RaceError::DataIntegrity { .. }));
    }

    #[test]
    fn test_untracked_metric_is_rejected() {
        let riders = RiderMap::new();
        let err = to_rows(&riders, ClassificationKind::Youth, Metric::Points, 1).unwrap_err();
        assert!(matches!(err, RaceError::Schema { .. }));
    }

    #[test]
    fn test_table_round_trip_preserves_unset_slots() {
        let mut riders = RiderMap::new();
        let mut r = rider("Romain, Jr.", 4);
        r.classification.mountain.points = vec![None, Some(12), Some(0), None];
        riders.insert("9".to_string(), r);

        let mut buffer = Vec::new();
        write_table(&mut buffer, &riders, ClassificationKind::Mountain, Metric::Points, 4).unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("id,first_name,last_name,country,birth_date,team,stage_1"));
        assert!(text.contains("\"Romain, Jr.\""));

        let table = read_table(buffer.as_slice()).unwrap();
        assert_eq!(table["9"], riders["9"].classification.mountain.points);
    }

    #[test]
    fn test_write_tables_creates_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut riders = RiderMap::new();
        riders.insert("1".to_string(), rider("A", 1));

        let paths = write_tables(dir.path(), &riders, 1).unwrap();
        assert_eq!(paths.len(), EXPORT_CATALOG.len());
        assert!(dir.path().join("general_time_absolute.csv").exists());
        assert!(dir.path().join("youth_rank.csv").exists());
    }
}
