//! Console and JSON reporting.
//!
//! The text report prints every section under its title in display order,
//! with the summary table (or the section's message) underneath. The JSON
//! export carries the same sections for downstream tooling.

use crate::summary::{ChartPayload, Section, SummaryTable};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

pub const DASHBOARD_TITLE: &str = "Product Listing Dashboard";

/// Everything the dashboard shows, in serializable form
#[derive(Debug, Serialize)]
pub struct DashboardReport<'a> {
    pub title: &'a str,
    pub source: String,
    pub rows: usize,
    pub sections: &'a [Section],
}

impl<'a> DashboardReport<'a> {
    pub fn new(source: impl Into<String>, rows: usize, sections: &'a [Section]) -> Self {
        Self {
            title: DASHBOARD_TITLE,
            source: source.into(),
            rows,
            sections,
        }
    }
}

/// Generate the plain-text report.
pub fn generate_text_report(report: &DashboardReport<'_>) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", report.title));
    output.push_str(&format!("{}\n", "=".repeat(report.title.len())));
    output.push_str(&format!("Source: {} ({} rows)\n", report.source, report.rows));

    for (idx, section) in report.sections.iter().enumerate() {
        output.push('\n');
        output.push_str(&generate_section(idx + 1, section));
    }

    output
}

/// Write the JSON export to `path`.
pub fn write_json(report: &DashboardReport<'_>, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write JSON report '{}'", path.display()))
}

fn generate_section(position: usize, section: &Section) -> String {
    let heading = format!("{}. {}", position, section.title);
    let mut out = format!("{}\n{}\n", heading, "-".repeat(heading.chars().count()));

    match &section.payload {
        ChartPayload::Message(message) => {
            out.push_str(&format!("! {}\n", message));
        }
        ChartPayload::Table(table) if table.is_empty() => {
            out.push_str("(no data)\n");
        }
        ChartPayload::Table(table) => {
            out.push_str(&format_table(table));
        }
    }
    out
}

fn format_table(table: &SummaryTable) -> String {
    let (header, rows): (Vec<String>, Vec<Vec<String>>) = match table {
        SummaryTable::RatingDistribution(rows) => (
            vec!["rating".into(), "count".into()],
            rows.iter()
                .map(|r| vec![r.rating.to_string(), r.count.to_string()])
                .collect(),
        ),
        SummaryTable::PriceByRating(rows) => (
            vec![
                "rating".into(),
                "mean_actual_price".into(),
                "mean_discounted_price".into(),
            ],
            rows.iter()
                .map(|r| {
                    vec![
                        r.rating.to_string(),
                        format_value(r.mean_actual_price, 2),
                        format_value(r.mean_discounted_price, 2),
                    ]
                })
                .collect(),
        ),
        SummaryTable::Correlation(matrix) => {
            let mut header = vec![String::new()];
            header.extend(matrix.columns.iter().cloned());
            let rows = matrix
                .columns
                .iter()
                .zip(&matrix.values)
                .map(|(name, values)| {
                    let mut row = vec![name.clone()];
                    row.extend(values.iter().map(|v| format_value(*v, 2)));
                    row
                })
                .collect();
            (header, rows)
        }
        SummaryTable::TopRatedCategories(rows) => (
            vec!["category".into(), "rating".into()],
            rows.iter()
                .map(|r| vec![r.category.clone(), format_value(r.value, 2)])
                .collect(),
        ),
        SummaryTable::CategoryCounts(rows) => (
            vec!["category".into(), "count".into()],
            rows.iter()
                .map(|r| vec![r.category.clone(), r.count.to_string()])
                .collect(),
        ),
        SummaryTable::CheapestCategories(rows) => (
            vec!["category".into(), "discounted_price".into()],
            rows.iter()
                .map(|r| vec![r.category.clone(), format_value(r.value, 0)])
                .collect(),
        ),
    };

    align(&header, &rows)
}

/// Left-align the first column, right-align the rest
fn align(header: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let parts: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| {
                if idx == 0 {
                    format!("{:<width$}", cell, width = widths[idx])
                } else {
                    format!("{:>width$}", cell, width = widths[idx])
                }
            })
            .collect();
        format!("{}\n", parts.join("  ").trim_end())
    };

    let mut out = line(header);
    for row in rows {
        out.push_str(&line(row.as_slice()));
    }
    out
}

fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{CategoryValue, CorrelationMatrix, SectionKind};

    #[test]
    fn test_text_report_lists_sections_in_order() {
        let sections = vec![
            Section::table(
                SectionKind::TopRatedCategories,
                SummaryTable::TopRatedCategories(vec![CategoryValue {
                    category: "Audio".to_string(),
                    value: Some(4.1),
                }]),
            ),
            Section::message(SectionKind::CorrelationMatrix, "No numeric columns found in the dataset."),
        ];
        let report = DashboardReport::new("products.csv", 3, &sections);
        let text = generate_text_report(&report);

        assert!(text.starts_with("Product Listing Dashboard\n"));
        assert!(text.contains("Source: products.csv (3 rows)"));
        let first = text.find("1. Top 5 Categories by Product Rating").unwrap();
        let second = text.find("2. Correlation Matrix for All Numeric Columns").unwrap();
        assert!(first < second);
        assert!(text.contains("Audio       4.10"));
        assert!(text.contains("! No numeric columns found in the dataset."));
    }

    #[test]
    fn test_empty_table_placeholder() {
        let section = Section::table(
            SectionKind::CategoryCounts,
            SummaryTable::CategoryCounts(vec![]),
        );
        assert!(generate_section(1, &section).ends_with("(no data)\n"));
    }

    #[test]
    fn test_correlation_table_layout() {
        let table = SummaryTable::Correlation(CorrelationMatrix {
            columns: vec!["a".into(), "b".into()],
            values: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        });
        let text = format_table(&table);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "      a     b");
        assert_eq!(lines[1], "a  1.00   n/a");
        assert_eq!(lines[2], "b   n/a  1.00");
    }

    #[test]
    fn test_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let sections = vec![Section::message(SectionKind::CorrelationMatrix, "none")];
        write_json(&DashboardReport::new("x.csv", 0, &sections), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["title"], DASHBOARD_TITLE);
        assert_eq!(value["sections"][0]["kind"], "correlation_matrix");
        assert_eq!(value["sections"][0]["payload"]["message"], "none");
    }
}
