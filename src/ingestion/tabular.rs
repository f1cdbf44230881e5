use crate::error::{MergeError, Result};
use crate::table::{Table, Value};
use metrics::counter;
use std::fs::File;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Reads a delimited file with a header row into a [`Table`].
///
/// Column and row order follow the file. Each cell goes through
/// [`Value::infer`]; rows shorter than the header are padded with `Null`
/// and rows longer than the header are dropped.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_delimited(path: &Path, delimiter: u8) -> Result<Table> {
    let file = File::open(path).map_err(|e| MergeError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header = reader
        .headers()
        .map_err(|e| MergeError::from_csv(path, e))?
        .clone();
    if header.is_empty() || header.iter().all(|h| h.trim().is_empty()) {
        return Err(MergeError::format(path, "missing header row"));
    }

    let columns: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    let width = columns.len();
    let mut table = Table::new(columns);
    let mut dropped = 0usize;

    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| MergeError::from_csv(path, e))?;
        if record.len() > width {
            // +2: one for the header, one for 1-based numbering
            warn!(
                "Dropping line {} with {} fields (header has {})",
                i + 2,
                record.len(),
                width
            );
            dropped += 1;
            continue;
        }
        table.push_row(record.iter().map(Value::infer).collect());
    }

    debug!(
        "Loaded {} rows x {} columns ({} dropped)",
        table.row_count(),
        table.column_count(),
        dropped
    );
    counter!("delivery_merge_rows_loaded_total", "source" => "tabular")
        .increment(table.row_count() as u64);
    if dropped > 0 {
        counter!("delivery_merge_rows_dropped_total", "source" => "tabular")
            .increment(dropped as u64);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_rows_in_file_order() {
        let file = write_temp(
            "order_id,user_id,restaurant_id,order_date,total_amount\n\
             1,10,7,2023-01-05,250.5\n\
             2,11,8,2023-01-06,100\n\
             3,12,9,2023-01-07,\n",
        );
        let table = load_delimited(file.path(), b',').unwrap();

        assert_eq!(
            table.columns(),
            ["order_id", "user_id", "restaurant_id", "order_date", "total_amount"]
        );
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.get(0, "total_amount"), Some(&Value::Float(250.5)));
        assert_eq!(table.get(1, "total_amount"), Some(&Value::Int(100)));
        assert_eq!(table.get(2, "total_amount"), Some(&Value::Null));
        assert_eq!(
            table.get(0, "order_date"),
            Some(&Value::Text("2023-01-05".into()))
        );
    }

    #[test]
    fn test_quoted_cells_keep_delimiters() {
        let file = write_temp("id,note\n1,\"spicy, extra cheese\"\n");
        let table = load_delimited(file.path(), b',').unwrap();
        assert_eq!(
            table.get(0, "note"),
            Some(&Value::Text("spicy, extra cheese".into()))
        );
    }

    #[test]
    fn test_short_rows_padded_long_rows_dropped() {
        let file = write_temp("a,b,c\n1,2\n1,2,3,4\n5,6,7\n");
        let table = load_delimited(file.path(), b',').unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(0, "c"), Some(&Value::Null));
        assert_eq!(table.get(1, "a"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_na_markers_become_null() {
        let file = write_temp("a,b\nNA,null\n");
        let table = load_delimited(file.path(), b',').unwrap();
        assert!(table.rows()[0].iter().all(Value::is_null));
    }

    #[test]
    fn test_empty_file_is_format_error() {
        let file = write_temp("");
        let err = load_delimited(file.path(), b',').unwrap_err();
        assert!(matches!(err, MergeError::Format { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_delimited(&dir.path().join("nope.csv"), b',').unwrap_err();
        assert!(matches!(err, MergeError::Io { .. }));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let file = write_temp("order_id,user_id\n");
        let table = load_delimited(file.path(), b',').unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 2);
    }
}
