use crate::error::{MergeError, Result};
use crate::table::{Table, Value};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// What a left join does when several right rows share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// One output row per matching right row, in right-table order.
    #[default]
    FanOut,
    /// Only the first matching right row in load order is used.
    FirstMatch,
}

/// Counters describing a completed join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub left_rows: usize,
    pub output_rows: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Rows added beyond the left row count by duplicate right keys.
    pub fan_out: usize,
}

/// Left outer join of `left` with the selected `columns` of `right` on `key`.
///
/// Every left row is kept. Rows without a match get `Null` in each appended
/// column. If an appended column already exists on the left, the left one is
/// renamed with a `_x` suffix and the appended one with `_y`.
#[instrument(skip(left, right), fields(left_rows = left.row_count(), right_rows = right.row_count()))]
pub fn left_join(
    left: &Table,
    right: &Table,
    key: &str,
    columns: &[&str],
    policy: DuplicateKeyPolicy,
) -> Result<(Table, JoinOutcome)> {
    let left_key = left
        .column_index(key)
        .ok_or_else(|| MergeError::missing_column("left", key))?;
    let index = right
        .index_by(key)
        .ok_or_else(|| MergeError::missing_column("right", key))?;
    let right_positions = columns
        .iter()
        .map(|c| right.column_index(c).ok_or_else(|| MergeError::missing_column("right", c)))
        .collect::<Result<Vec<_>>>()?;

    let mut header: Vec<String> = left.columns().to_vec();
    for (i, name) in columns.iter().enumerate() {
        // The key column itself is shared, not appended.
        if *name == key {
            continue;
        }
        match header.iter().position(|c| c == name) {
            Some(existing) => {
                warn!("Column '{}' exists on both sides; suffixing _x/_y", name);
                header[existing] = format!("{}_x", name);
                header.push(format!("{}_y", name));
            }
            None => header.push(name.to_string()),
        }
        debug!("Appending column {} from right position {}", name, right_positions[i]);
    }
    let appended: Vec<usize> = columns
        .iter()
        .zip(&right_positions)
        .filter(|(name, _)| **name != key)
        .map(|(_, pos)| *pos)
        .collect();

    let mut out = Table::new(header);
    let mut outcome = JoinOutcome {
        left_rows: left.row_count(),
        ..JoinOutcome::default()
    };

    for row in left.rows() {
        let matches = row[left_key]
            .key()
            .and_then(|k| index.get(&k))
            .map(|rows| match policy {
                DuplicateKeyPolicy::FanOut => rows.as_slice(),
                DuplicateKeyPolicy::FirstMatch => &rows[..1],
            })
            .unwrap_or(&[]);

        if matches.is_empty() {
            outcome.unmatched += 1;
            let mut joined = row.clone();
            joined.extend(std::iter::repeat(Value::Null).take(appended.len()));
            out.push_row(joined);
            continue;
        }

        outcome.matched += 1;
        outcome.fan_out += matches.len() - 1;
        for &r in matches {
            let right_row = &right.rows()[r];
            let mut joined = row.clone();
            joined.extend(appended.iter().map(|&p| right_row[p].clone()));
            out.push_row(joined);
        }
    }
    outcome.output_rows = out.row_count();

    if outcome.fan_out > 0 {
        warn!(
            "Duplicate '{}' keys on the right added {} rows",
            key, outcome.fan_out
        );
    }
    counter!("delivery_merge_join_matched_total", "key" => key.to_string())
        .increment(outcome.matched as u64);
    counter!("delivery_merge_join_unmatched_total", "key" => key.to_string())
        .increment(outcome.unmatched as u64);
    Ok((out, outcome))
}
