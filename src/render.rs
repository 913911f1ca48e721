//! Aligned plain-text tables for console reports.

use std::borrow::Cow;
use std::fmt::Write as _;

use rust_decimal::Decimal;

use crate::{
    pipeline::{RoleCoercions, SourceReport},
    quality::QualityReport,
    summary::SalesSummary,
    validate::ValidationReport,
};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(1);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator_widths = widths.iter().map(|w| (*w).max(3)).collect::<Vec<usize>>();
    let separator_cells = separator_widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator_cells, &separator_widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let headers = headers.iter().map(|h| h.to_string()).collect::<Vec<_>>();
    print!("{}", render_table(&headers, rows));
}

pub fn source_rows(sources: &[SourceReport]) -> Vec<Vec<String>> {
    sources
        .iter()
        .map(|source| {
            vec![
                source.role.label().to_string(),
                source.path.display().to_string(),
                source.encoding.clone().unwrap_or_else(|| "-".to_string()),
                source.rows.to_string(),
                source.error.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

pub fn coercion_rows(coercions: &[RoleCoercions]) -> Vec<Vec<String>> {
    coercions
        .iter()
        .flat_map(|entry| {
            entry.report.issues().iter().map(move |issue| {
                vec![
                    entry.role.label().to_string(),
                    issue.column.clone(),
                    issue.failures.to_string(),
                    issue.first_value.clone(),
                ]
            })
        })
        .collect()
}

pub fn validation_rows(report: &ValidationReport) -> Vec<Vec<String>> {
    report
        .outcomes()
        .iter()
        .map(|outcome| {
            vec![
                outcome.rule.clone(),
                if outcome.passed { "PASS" } else { "FAIL" }.to_string(),
                outcome.detail.clone(),
            ]
        })
        .collect()
}

pub fn quality_rows(reports: &[QualityReport]) -> Vec<Vec<String>> {
    reports
        .iter()
        .map(|report| {
            vec![
                report.dataset.clone(),
                report.rows.to_string(),
                report.columns.to_string(),
                report.missing_values.to_string(),
                report.duplicate_rows.to_string(),
                report.numeric_columns.to_string(),
                report.categorical_columns.to_string(),
                report.datetime_columns.to_string(),
                format!("{:.2}", report.memory_mb()),
            ]
        })
        .collect()
}

pub fn summary_rows(summary: &SalesSummary) -> Vec<Vec<String>> {
    let optional = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    vec![
        vec![
            "Total revenue".into(),
            optional(summary.total_revenue.map(money)),
        ],
        vec!["Total profit".into(), optional(summary.total_profit.map(money))],
        vec![
            "Profit margin".into(),
            optional(summary.profit_margin.map(|m| format!("{}%", m.round_dp(2)))),
        ],
        vec!["Orders".into(), summary.orders.to_string()],
        vec!["Customers".into(), summary.customers.to_string()],
        vec![
            "Average order value".into(),
            optional(summary.average_order_value.map(money)),
        ],
        vec!["Top category".into(), optional(summary.top_category.clone())],
        vec!["Top product".into(), optional(summary.top_product.clone())],
    ]
}

pub fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate().take(widths.len()) {
        let sanitized = sanitize_cell(value);
        let padding = widths[idx].saturating_sub(display_width(sanitized.as_ref()));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    let mut width = 0usize;
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // ANSI escape, e.g. \x1b[31m
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            width += 1;
        }
    }
    width
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
