//! Compact text digests of result sets for the explanation prompt.

use crate::db::ResultSet;

/// Rows shown in the sample section.
const SAMPLE_ROWS: usize = 3;

/// Summarizes a result set: counts, columns and up to three sample rows.
///
/// Deterministic for a given input.
pub fn summarize(result: &ResultSet) -> String {
    if result.row_count == 0 {
        return "No results found.".to_string();
    }

    let sample = result.rows.len().min(SAMPLE_ROWS);
    let mut lines = Vec::with_capacity(3 + sample);
    lines.push(format!(
        "Found {} {}.",
        result.row_count,
        plural(result.row_count, "result")
    ));
    lines.push(format!("Columns: {}", result.columns.join(", ")));
    lines.push(format!(
        "Sample data (first {} {}):",
        sample,
        plural(sample, "row")
    ));
    for (idx, row) in result.rows.iter().take(sample).enumerate() {
        lines.push(format!("Row {}: {}", idx + 1, row.to_literal()));
    }

    lines.join("\n")
}

/// Explanation used when the model cannot provide one.
pub fn fallback_explanation(row_count: usize) -> String {
    format!(
        "Query executed successfully. Found {} {}.",
        row_count,
        plural(row_count, "result")
    )
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{noun}s")
    }
}
