//! Export of chart records and region deltas
//!
//! The `write_*` functions take any writer so they can be tested in memory;
//! the `export_*` functions wrap them with file creation.

use crate::analytics::{MergedRecord, RegionDelta, RegionDeltas};
use crate::error::CoreError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{}", v),
        _ => String::new(),
    }
}

/// Write merged records as CSV, one row per record.
///
/// CSV columns: time, then one column per entry of `columns`. Absent
/// fields are left empty.
pub fn write_records_csv<W: Write>(
    records: &[MergedRecord],
    columns: &[&str],
    mut writer: W,
) -> io::Result<()> {
    let mut header = vec!["time".to_string()];
    header.extend(columns.iter().map(|c| csv_escape(c)));
    writeln!(writer, "{}", header.join(","))?;

    for record in records {
        let mut row = vec![record.formatted_time.to_string()];
        row.extend(columns.iter().map(|c| csv_number(record.get(c))));
        writeln!(writer, "{}", row.join(","))?;
    }

    writer.flush()
}

/// Write region deltas as CSV in iteration order
pub fn write_deltas_csv<W: Write>(deltas: &RegionDeltas, mut writer: W) -> io::Result<()> {
    writeln!(
        writer,
        "region_id,region_name,capacity_mw,actual_mw,forecast_mw,delta_mw,delta_pct,delta_normalized"
    )?;

    for d in deltas.iter() {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{}",
            d.region_id,
            csv_escape(&d.region_name),
            d.region_capacity_mw,
            d.actual_value_mw,
            d.forecast_value_mw,
            d.delta,
            csv_number(d.finite_percentage()),
            d.delta_normalized
        )?;
    }

    writer.flush()
}

fn create(path: &Path) -> Result<BufWriter<File>, CoreError> {
    let io_error = |source| CoreError::ExportIo {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    File::create(path).map(BufWriter::new).map_err(io_error)
}

/// Export merged chart records to a CSV file
///
/// # Examples
///
/// ```no_run
/// use nowcast_core::analytics::fields;
/// use nowcast_core::export::export_records_to_csv;
/// use std::path::Path;
///
/// export_records_to_csv(&[], &fields::NATIONAL_LINES, Path::new("national.csv")).unwrap();
/// ```
pub fn export_records_to_csv(
    records: &[MergedRecord],
    columns: &[&str],
    path: &Path,
) -> Result<(), CoreError> {
    let writer = create(path)?;
    write_records_csv(records, columns, writer).map_err(|source| CoreError::ExportIo {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = records.len(), "Exported chart records");
    Ok(())
}

/// Export region deltas to a CSV file
pub fn export_deltas_to_csv(deltas: &RegionDeltas, path: &Path) -> Result<(), CoreError> {
    let writer = create(path)?;
    write_deltas_csv(deltas, writer).map_err(|source| CoreError::ExportIo {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), rows = deltas.len(), "Exported region deltas");
    Ok(())
}

/// Export region deltas as a pretty JSON array (non-finite numbers become null)
pub fn export_deltas_to_json(deltas: &RegionDeltas, path: &Path) -> Result<(), CoreError> {
    let mut writer = create(path)?;
    let rows: Vec<&RegionDelta> = deltas.iter().collect();
    serde_json::to_writer_pretty(&mut writer, &rows)
        .map_err(io::Error::from)
        .and_then(|_| writer.flush())
        .map_err(|source| CoreError::ExportIo {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{compute_deltas, fields, merge, national_chart_inputs, sort_records};
    use crate::models::{RegionActual, RegionMeta, SeriesSample, TimePoint};
    use tempfile::tempdir;

    fn tp(s: &str) -> TimePoint {
        s.parse().unwrap()
    }

    #[test]
    fn test_records_csv_one_row_per_sorted_record() {
        let pv = vec![
            SeriesSample::new(tp("2024-06-01T10:30"), 2000.0),
            SeriesSample::new(tp("2024-06-01T10:00"), 1000.0),
        ];
        let forecast = vec![SeriesSample::new(tp("2024-06-01T11:00"), 5.0)];
        let mut records = merge(
            &national_chart_inputs(&forecast, None, &pv, &[]),
            tp("2024-06-01T10:30"),
        );
        sort_records(&mut records);

        let mut out = Vec::new();
        write_records_csv(&records, &[fields::GENERATION, fields::FORECAST], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "time,GENERATION,FORECAST");
        assert_eq!(lines[1], "2024-06-01T10:00,1,");
        assert_eq!(lines[2], "2024-06-01T10:30,2,");
        assert_eq!(lines[3], "2024-06-01T11:00,,5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_deltas_csv_escapes_names_and_blanks_nan() {
        let t = tp("2024-06-01T12:00");
        let actuals = vec![RegionActual {
            meta: RegionMeta {
                region_id: 4,
                region_name: "Bolney, West".to_string(),
                installed_capacity_mw: 10.0,
            },
            samples: vec![SeriesSample::new(t, 0.0)],
        }];
        let deltas = compute_deltas(&actuals, &[], t);

        let mut out = Vec::new();
        write_deltas_csv(&deltas, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().nth(1), Some("4,\"Bolney, West\",10,0,0,0,,0"));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("deltas.json");

        export_deltas_to_json(&RegionDeltas::new(), &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }
}
