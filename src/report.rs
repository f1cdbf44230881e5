use crate::stats::{DatasetStatistics, Description, ValueCount};
use crate::table::Table;
use std::fmt::Write;

const RULE_WIDTH: usize = 80;

fn rule(out: &mut String, title: &str) {
    let bar = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{}\n{}\n{}", bar, title, bar);
}

/// Column list, first `limit` rows and missing-value counts of a table.
pub fn render_overview(table: &Table, stats: &DatasetStatistics, limit: usize) -> String {
    let mut out = String::new();
    rule(&mut out, "FINAL DATASET OVERVIEW");
    let _ = writeln!(
        out,
        "\nFinal Dataset Dimensions: {} rows × {} columns",
        table.row_count(),
        table.column_count()
    );
    let _ = writeln!(out, "\nFinal Columns:");
    for (i, column) in table.columns().iter().enumerate() {
        let _ = writeln!(out, "  {:2}. {}", i + 1, column);
    }

    let _ = writeln!(out, "\nSample of Final Dataset (first {} rows):", limit);
    let _ = writeln!(out, "{}", table.columns().join(" | "));
    for row in table.rows().iter().take(limit) {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        let _ = writeln!(out, "{}", cells.join(" | "));
    }

    let _ = writeln!(out, "\nData Quality Check:");
    let _ = writeln!(out, "  - Total rows: {}", stats.rows);
    let _ = writeln!(out, "  - Missing values by column:");
    if stats.missing.is_empty() {
        let _ = writeln!(out, "    (none)");
    }
    for missing in &stats.missing {
        let _ = writeln!(
            out,
            "    • {}: {} ({:.2}%)",
            missing.column, missing.count, missing.percent
        );
    }
    out
}

/// Human-readable dataset statistics.
pub fn render_statistics(stats: &DatasetStatistics) -> String {
    let mut out = String::new();
    rule(&mut out, "DATASET STATISTICS");

    let _ = writeln!(out, "\nOrder Information:");
    match &stats.order_dates {
        Some(range) => {
            let _ = writeln!(out, "  - Date range: {} to {}", range.min, range.max);
        }
        None => {
            let _ = writeln!(out, "  - Date range: n/a");
        }
    }
    let _ = writeln!(
        out,
        "  - Total order value: ₹{}",
        with_thousands(stats.total_amount_sum)
    );
    let _ = writeln!(
        out,
        "  - Average order value: {}",
        stats
            .total_amount_mean
            .map(|m| format!("₹{}", with_thousands(m)))
            .unwrap_or_else(|| "n/a".to_string())
    );
    let _ = writeln!(out, "  - Unique users: {}", stats.unique_users);
    let _ = writeln!(out, "  - Unique restaurants: {}", stats.unique_restaurants);

    distribution(&mut out, "User Membership Distribution", &stats.membership_distribution);
    distribution(&mut out, "City Distribution", &stats.city_distribution);
    distribution(&mut out, "Cuisine Distribution", &stats.cuisine_distribution);

    let _ = writeln!(out, "\nRestaurant Rating Statistics:");
    match &stats.rating {
        Some(d) => describe(&mut out, d),
        None => {
            let _ = writeln!(out, "  (no ratings)");
        }
    }
    out
}

fn distribution(out: &mut String, title: &str, counts: &[ValueCount]) {
    let _ = writeln!(out, "\n{}:", title);
    if counts.is_empty() {
        let _ = writeln!(out, "  (no values)");
        return;
    }
    let width = counts.iter().map(|c| c.value.chars().count()).max().unwrap_or(0);
    for c in counts {
        let _ = writeln!(out, "  {:<width$}  {}", c.value, c.count, width = width);
    }
}

fn describe(out: &mut String, d: &Description) {
    let std = d
        .std
        .map(|s| format!("{:.6}", s))
        .unwrap_or_else(|| "NaN".to_string());
    let _ = writeln!(out, "  count  {}", d.count);
    let _ = writeln!(out, "  mean   {:.6}", d.mean);
    let _ = writeln!(out, "  std    {}", std);
    let _ = writeln!(out, "  min    {:.6}", d.min);
    let _ = writeln!(out, "  25%    {:.6}", d.q25);
    let _ = writeln!(out, "  50%    {:.6}", d.median);
    let _ = writeln!(out, "  75%    {:.6}", d.q75);
    let _ = writeln!(out, "  max    {:.6}", d.max);
}

/// `1234567.891` -> `1,234,567.89`
fn with_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}
