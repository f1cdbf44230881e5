use crate::constants::{
    CITY, CUISINE, MEMBERSHIP, ORDER_DATE, RATING, RESTAURANT_ID, TOTAL_AMOUNT, USER_ID,
};
use crate::table::{CellKey, Table, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Summary of the merged table. Nulls never contribute to an aggregate and
/// absent columns produce empty statistics.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStatistics {
    pub rows: usize,
    pub columns: usize,
    pub missing: Vec<MissingValues>,
    pub order_dates: Option<Range>,
    pub total_amount_sum: f64,
    pub total_amount_mean: Option<f64>,
    pub unique_users: usize,
    pub unique_restaurants: usize,
    pub membership_distribution: Vec<ValueCount>,
    pub city_distribution: Vec<ValueCount>,
    pub cuisine_distribution: Vec<ValueCount>,
    pub rating: Option<Description>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingValues {
    pub column: String,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Range {
    pub min: Value,
    pub max: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Count, mean, sample standard deviation, min, quartiles and max.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Description {
    pub count: usize,
    pub mean: f64,
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl DatasetStatistics {
    pub fn compute(table: &Table) -> Self {
        let amounts = numeric(table, TOTAL_AMOUNT);
        let total_amount_sum: f64 = amounts.iter().sum();
        let total_amount_mean = mean(&amounts);

        Self {
            rows: table.row_count(),
            columns: table.column_count(),
            missing: missing_values(table),
            order_dates: value_range(table, ORDER_DATE),
            total_amount_sum,
            total_amount_mean,
            unique_users: distinct_count(table, USER_ID),
            unique_restaurants: distinct_count(table, RESTAURANT_ID),
            membership_distribution: value_counts(table, MEMBERSHIP),
            city_distribution: value_counts(table, CITY),
            cuisine_distribution: value_counts(table, CUISINE),
            rating: describe(&numeric(table, RATING)),
        }
    }
}

/// Columns with at least one null, in column order.
pub fn missing_values(table: &Table) -> Vec<MissingValues> {
    let rows = table.row_count();
    table
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let count = table.rows().iter().filter(|r| r[i].is_null()).count();
            (count > 0).then(|| MissingValues {
                column: name.clone(),
                count,
                percent: count as f64 * 100.0 / rows as f64,
            })
        })
        .collect()
}

fn numeric(table: &Table, column: &str) -> Vec<f64> {
    table
        .column(column)
        .map(|values| values.filter_map(Value::as_f64).filter(|f| !f.is_nan()).collect())
        .unwrap_or_default()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn distinct_count(table: &Table, column: &str) -> usize {
    table
        .column(column)
        .map(|values| values.filter_map(Value::key).collect::<HashSet<_>>().len())
        .unwrap_or(0)
}

/// Frequency of each non-null value, most frequent first. Ties keep the
/// order in which values first appear.
pub fn value_counts(table: &Table, column: &str) -> Vec<ValueCount> {
    let Some(values) = table.column(column) else {
        return Vec::new();
    };
    let mut positions: HashMap<CellKey, usize> = HashMap::new();
    let mut counts: Vec<ValueCount> = Vec::new();
    for value in values {
        let Some(key) = value.key() else { continue };
        match positions.get(&key) {
            Some(&i) => counts[i].count += 1,
            None => {
                positions.insert(key, counts.len());
                counts.push(ValueCount {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }
    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// Minimum and maximum raw values of a column. Numbers compare numerically,
/// date strings chronologically, anything else lexically.
pub fn value_range(table: &Table, column: &str) -> Option<Range> {
    let values: Vec<&Value> = table.column(column)?.filter(|v| !v.is_null()).collect();
    if values.is_empty() {
        return None;
    }

    let ordering: Box<dyn Fn(&&Value, &&Value) -> Ordering> =
        if values.iter().all(|v| v.as_f64().is_some()) {
            Box::new(|a: &&Value, b: &&Value| {
                let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
                x.total_cmp(&y)
            })
        } else if values.iter().all(|v| parse_datetime(v).is_some()) {
            Box::new(|a: &&Value, b: &&Value| parse_datetime(a).cmp(&parse_datetime(b)))
        } else {
            Box::new(|a: &&Value, b: &&Value| a.to_string().cmp(&b.to_string()))
        };

    let min = values.iter().min_by(|a, b| ordering(*a, *b))?;
    let max = values.iter().max_by(|a, b| ordering(*a, *b))?;
    Some(Range {
        min: (*min).clone(),
        max: (*max).clone(),
    })
}

fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    let Value::Text(s) = value else { return None };
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Descriptive statistics of a numeric sample; `None` when it is empty.
pub fn describe(values: &[f64]) -> Option<Description> {
    let mean = mean(values)?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    let std = (n > 1).then(|| {
        let var = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        var.sqrt()
    });

    Some(Description {
        count: n,
        mean,
        std,
        min: sorted[0],
        q25: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q75: quantile(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Linear interpolation between closest ranks of a sorted, non-empty sample.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_total_amount_sum_and_mean() {
        let table = Table::from((
            [TOTAL_AMOUNT],
            vec![[Value::Int(100)], [Value::Int(200)], [Value::Int(300)]],
        ));
        let stats = DatasetStatistics::compute(&table);
        assert!(approx(stats.total_amount_sum, 600.0));
        assert_eq!(stats.total_amount_mean, Some(200.0));
    }

    #[test]
    fn test_nulls_are_excluded() {
        let table = Table::from((
            [TOTAL_AMOUNT, USER_ID],
            vec![
                [Value::Float(50.0), Value::Int(1)],
                [Value::Null, Value::Null],
                [Value::Float(150.0), Value::Int(1)],
            ],
        ));
        let stats = DatasetStatistics::compute(&table);
        assert_eq!(stats.total_amount_mean, Some(100.0));
        assert_eq!(stats.unique_users, 1);
        assert_eq!(stats.missing.len(), 2);
        assert_eq!(stats.missing[0].count, 1);
        assert!(approx(stats.missing[0].percent, 100.0 / 3.0));
    }

    #[test]
    fn test_value_counts_descending_with_stable_ties() {
        let table = Table::from((
            [CITY],
            vec![
                ["Pune".into()],
                ["Delhi".into()],
                ["Delhi".into()],
                ["Goa".into()],
                [Value::Null],
                ["Pune".into()],
                ["Mumbai".into()],
            ],
        ));
        let counts = value_counts(&table, CITY);
        let flat: Vec<(&str, usize)> = counts.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(flat, vec![("Pune", 2), ("Delhi", 2), ("Goa", 1), ("Mumbai", 1)]);
    }

    #[test]
    fn test_describe_matches_linear_quartiles() {
        let d = describe(&[4.0, 4.5, 3.5, 5.0]).unwrap();
        assert_eq!(d.count, 4);
        assert!(approx(d.mean, 4.25));
        assert!(approx(d.std.unwrap(), (1.25f64 / 3.0).sqrt()));
        assert!(approx(d.min, 3.5));
        assert!(approx(d.q25, 3.875));
        assert!(approx(d.median, 4.25));
        assert!(approx(d.q75, 4.625));
        assert!(approx(d.max, 5.0));
    }

    #[test]
    fn test_describe_single_value_has_no_std() {
        let d = describe(&[4.2]).unwrap();
        assert_eq!(d.std, None);
        assert!(approx(d.q75, 4.2));
        assert!(describe(&[]).is_none());
    }

    #[test]
    fn test_date_range_is_chronological_for_dates() {
        let table = Table::from((
            [ORDER_DATE],
            vec![
                ["2023-01-05 09:00:00".into()],
                ["2023-01-05T08:00:00".into()],
                ["2023-02-01".into()],
            ],
        ));
        let range = value_range(&table, ORDER_DATE).unwrap();
        assert_eq!(range.min, Value::Text("2023-01-05T08:00:00".into()));
        assert_eq!(range.max, Value::Text("2023-02-01".into()));
    }

    #[test]
    fn test_date_range_falls_back_to_lexical() {
        let table = Table::from((
            [ORDER_DATE],
            vec![["b-date".into()], ["a-date".into()], [Value::Null]],
        ));
        let range = value_range(&table, ORDER_DATE).unwrap();
        assert_eq!(range.min, Value::Text("a-date".into()));
        assert_eq!(range.max, Value::Text("b-date".into()));
    }

    #[test]
    fn test_absent_columns_yield_empty_statistics() {
        let table = Table::from((["order_id"], vec![[Value::Int(1)]]));
        let stats = DatasetStatistics::compute(&table);
        assert!(stats.order_dates.is_none());
        assert_eq!(stats.total_amount_sum, 0.0);
        assert!(stats.total_amount_mean.is_none());
        assert!(stats.cuisine_distribution.is_empty());
        assert!(stats.rating.is_none());
    }
}
