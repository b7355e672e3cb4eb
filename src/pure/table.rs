// Report Rendering Pure Functions
// Plain-text table of a build report, grouped by status.

use std::fmt::Write;

use crate::types::{BuildReport, ReportRow, Status};

const HEADERS: [&str; 6] = ["COMPONENT", "TEST CASE", "METRIC", "VALUE", "DELTA", "STATUS"];

/// Order in which status groups appear in the rendered report
pub const STATUS_ORDER: [Status; 5] = [
    Status::Missing,
    Status::Failed,
    Status::Passed,
    Status::Incomplete,
    Status::NewFeature,
];

/// Format a float with thousands separators on the integer part: `1234567.5` -> `1,234,567.5`
pub fn format_with_commas(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = value.to_string();
    let (sign, unsigned) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// One decimal place, with an explicit `+` for increases
pub fn format_delta(delta: f64) -> String {
    let formatted = format!("{delta:.1}");
    if delta > 0.0 {
        format!("+{formatted}")
    } else {
        formatted
    }
}

fn row_cells(row: &ReportRow) -> [String; 6] {
    [
        row.component.clone(),
        row.test_case.clone(),
        row.metric.clone(),
        row.value
            .map(format_with_commas)
            .unwrap_or_else(|| "N/A".to_string()),
        row.delta.map(format_delta).unwrap_or_else(|| "N/A".to_string()),
        row.status.to_string(),
    ]
}

/// Rows in rendering order: status groups in `STATUS_ORDER`, each followed by an
/// empty separator row when non-empty.
pub fn grouped_rows(report: &BuildReport) -> Vec<[String; 6]> {
    let mut out = Vec::new();
    for status in STATUS_ORDER {
        let group: Vec<&ReportRow> = report.rows.iter().filter(|r| r.status == status).collect();
        if group.is_empty() {
            continue;
        }
        out.extend(group.into_iter().map(row_cells));
        out.push(Default::default());
    }
    out
}

fn border(widths: &[usize; 6]) -> String {
    let mut line = String::from("+");
    for w in widths {
        line.push_str(&"-".repeat(w + 2));
        line.push('+');
    }
    line
}

fn line(cells: &[String; 6], widths: &[usize; 6]) -> String {
    let mut line = String::from("|");
    for (cell, &w) in cells.iter().zip(widths) {
        let _ = write!(line, " {cell:<w$} |");
    }
    line
}

/// Render the report as a bordered text table
pub fn render_report(report: &BuildReport) -> String {
    let rows = grouped_rows(report);
    let headers: [String; 6] = HEADERS.map(str::to_string);

    let mut widths = [0usize; 6];
    for cells in std::iter::once(&headers).chain(rows.iter()) {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let border = border(&widths);
    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    out.push_str(&line(&headers, &widths));
    out.push('\n');
    out.push_str(&border);
    out.push('\n');
    for cells in &rows {
        out.push_str(&line(cells, &widths));
        out.push('\n');
    }
    out.push_str(&border);
    out.push('\n');
    out
}
