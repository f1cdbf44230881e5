use crate::error::{MergeError, Result};
use crate::table::Table;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// What was written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
    pub sha256: String,
}

/// Writes `table` as delimited text with a header row, replacing any
/// existing file at `path`. `Null` cells are written empty.
#[instrument(skip(table), fields(rows = table.row_count()))]
pub fn write_delimited(table: &Table, path: &Path, delimiter: u8) -> Result<WriteSummary> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| MergeError::io(dir, e))?;
    }

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)
            .map_err(|e| MergeError::from_csv(path, e))?;
        writer
            .write_record(table.columns())
            .map_err(|e| MergeError::from_csv(path, e))?;
        for row in table.rows() {
            writer
                .write_record(row.iter().map(|v| v.to_cell()))
                .map_err(|e| MergeError::from_csv(path, e))?;
        }
        writer.flush().map_err(|e| MergeError::io(path, e))?;
    }

    let bytes = fs::read(path).map_err(|e| MergeError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = hex::encode(hasher.finalize());

    info!("Wrote {} rows ({} bytes) to {}", table.row_count(), bytes.len(), path.display());
    counter!("delivery_merge_rows_written_total").increment(table.row_count() as u64);

    Ok(WriteSummary {
        path: path.to_path_buf(),
        rows: table.row_count(),
        bytes: bytes.len() as u64,
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_writes_header_and_null_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("merged.csv");
        let table = Table::from((
            ["order_id", "name", "rating"],
            vec![
                [Value::Int(1), "Asha".into(), Value::Float(4.0)],
                [Value::Int(2), Value::Null, Value::Null],
            ],
        ));

        let summary = write_delimited(&table, &path, b',').unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "order_id,name,rating\n1,Asha,4.0\n2,,\n");
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.bytes, written.len() as u64);
        assert_eq!(summary.sha256.len(), 64);
    }

    #[test]
    fn test_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        std::fs::write(&path, "stale contents that are longer than the new file\n").unwrap();

        let table = Table::from((["a"], vec![[Value::Int(1)]]));
        write_delimited(&table, &path, b',').unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n");
    }

    #[test]
    fn test_quotes_cells_containing_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged.csv");
        let table = Table::from((["name"], vec![["Pizza, Pasta & Co".into()]]));
        write_delimited(&table, &path, b',').unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "name\n\"Pizza, Pasta & Co\"\n"
        );
    }
}
