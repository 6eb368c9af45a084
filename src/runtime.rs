// Runtime: turns pipeline sections into chart files

use crate::graph::{BarSeries, BarStyle, Canvas, Chart, LineStyle};
use crate::palette::{COOLWARM, LINE_BLUE, ORANGE, ROYAL_BLUE, SKY_BLUE, VIRIDIS, YL_GN_BU};
use crate::summary::{ChartPayload, Section, SectionKind, SummaryTable};
use crate::{OutputFormat, RenderOptions};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A chart written to disk
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub kind: SectionKind,
    pub path: PathBuf,
}

/// Render every section that carries a table into `out_dir`.
///
/// Message sections produce no file. Returns the written charts in section
/// order.
pub fn write_dashboard(
    sections: &[Section],
    out_dir: &Path,
    options: &RenderOptions,
) -> Result<Vec<RenderedChart>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory '{}'", out_dir.display()))?;

    let mut written = Vec::new();
    for (idx, section) in sections.iter().enumerate() {
        let Some(bytes) = render_section(section, options)? else {
            debug!("{}: no chart (message payload)", section.kind.slug());
            continue;
        };

        let path = out_dir.join(chart_file_name(idx + 1, section.kind, options.format));
        fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write chart '{}'", path.display()))?;
        info!("Wrote {} ({} bytes)", path.display(), bytes.len());

        written.push(RenderedChart {
            kind: section.kind,
            path,
        });
    }
    Ok(written)
}

/// Render one section to image bytes; `None` for message payloads
pub fn render_section(section: &Section, options: &RenderOptions) -> Result<Option<Vec<u8>>> {
    let table = match &section.payload {
        ChartPayload::Table(table) => table,
        ChartPayload::Message(_) => return Ok(None),
    };

    let (chart, x_desc, y_desc) = chart_for_table(table);
    let canvas = Canvas::new(options, section.title.as_str())?.with_axis_labels(x_desc, y_desc);
    let bytes = canvas
        .render(&chart)
        .with_context(|| format!("Failed to render '{}'", section.title))?;
    Ok(Some(bytes))
}

/// `NN_<slug>.<ext>` with a 1-based position
pub fn chart_file_name(position: usize, kind: SectionKind, format: OutputFormat) -> String {
    format!("{:02}_{}.{}", position, kind.slug(), format.extension())
}

/// Map a summary table onto a chart and its axis titles
fn chart_for_table(table: &SummaryTable) -> (Chart, &'static str, &'static str) {
    match table {
        SummaryTable::RatingDistribution(rows) => (
            Chart::BarLine {
                labels: rows.iter().map(|r| format_key(r.rating)).collect(),
                values: rows.iter().map(|r| r.count as f64).collect(),
                bar: BarStyle::new(SKY_BLUE).alpha(0.6),
                bar_name: "Bar Chart".to_string(),
                line: LineStyle {
                    color: LINE_BLUE,
                    width: 2,
                    marker_size: 4,
                },
                line_name: "Line Chart".to_string(),
            },
            "Rating",
            "Products",
        ),
        SummaryTable::PriceByRating(rows) => (
            Chart::GroupedBars {
                labels: rows.iter().map(|r| format_key(r.rating)).collect(),
                series: vec![
                    BarSeries {
                        name: "Original Price".to_string(),
                        values: rows.iter().map(|r| r.mean_actual_price).collect(),
                        style: BarStyle::new(ROYAL_BLUE).alpha(0.6),
                    },
                    BarSeries {
                        name: "Discounted Price".to_string(),
                        values: rows.iter().map(|r| r.mean_discounted_price).collect(),
                        style: BarStyle::new(ORANGE).alpha(0.6),
                    },
                ],
            },
            "Product Rating",
            "Average Price",
        ),
        SummaryTable::Correlation(matrix) => (
            Chart::Heatmap {
                labels: matrix.columns.clone(),
                values: matrix.values.clone(),
                scale: COOLWARM,
                domain: (-1.0, 1.0),
            },
            "",
            "",
        ),
        SummaryTable::TopRatedCategories(rows) => (
            Chart::ScaledBars {
                labels: rows.iter().map(|r| r.category.clone()).collect(),
                values: rows.iter().map(|r| r.value).collect(),
                scale: VIRIDIS,
                annotate: None,
            },
            "Product Category",
            "Average Rating",
        ),
        SummaryTable::CategoryCounts(rows) => (
            Chart::ScaledBars {
                labels: rows.iter().map(|r| r.category.clone()).collect(),
                values: rows.iter().map(|r| Some(r.count as f64)).collect(),
                scale: VIRIDIS,
                annotate: None,
            },
            "Product Category",
            "Product Count",
        ),
        SummaryTable::CheapestCategories(rows) => (
            Chart::ScaledBars {
                labels: rows.iter().map(|r| r.category.clone()).collect(),
                values: rows.iter().map(|r| r.value).collect(),
                scale: YL_GN_BU,
                annotate: Some(0),
            },
            "Product Category",
            "Discounted Price",
        ),
    }
}

/// Numeric group key as an axis label (`4` rather than `4.0`)
pub fn format_key(value: f64) -> String {
    format!("{}", value)
}
