use crate::palette::{contrast_text, ColorScale};
use crate::{OutputFormat, RenderOptions};
use anyhow::{anyhow, Context, Result};
use image::ImageEncoder;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;

type Plane<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Style configuration for bar series
#[derive(Debug, Clone)]
pub struct BarStyle {
    pub color: RGBColor,
    pub alpha: f64,
    pub width: f64,
}

impl BarStyle {
    pub fn new(color: RGBColor) -> Self {
        Self {
            color,
            alpha: 1.0,
            width: 0.8,
        }
    }

    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Style configuration for line series
#[derive(Debug, Clone)]
pub struct LineStyle {
    pub color: RGBColor,
    pub width: u32,
    pub marker_size: i32,
}

/// A named series of bar heights, one per category
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub style: BarStyle,
}

/// What to draw on the canvas. Every variant uses a categorical x-axis.
#[derive(Debug, Clone)]
pub enum Chart {
    /// Bars with the same values traced again as a line with markers
    BarLine {
        labels: Vec<String>,
        values: Vec<f64>,
        bar: BarStyle,
        bar_name: String,
        line: LineStyle,
        line_name: String,
    },
    /// Side-by-side bars, one slot per series within each category
    GroupedBars {
        labels: Vec<String>,
        series: Vec<BarSeries>,
    },
    /// Single series, each bar colored by its value; optional value labels
    /// with the given number of decimals
    ScaledBars {
        labels: Vec<String>,
        values: Vec<Option<f64>>,
        scale: ColorScale,
        annotate: Option<usize>,
    },
    /// Square matrix of cells colored on `scale` over `domain`
    Heatmap {
        labels: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
        scale: ColorScale,
        domain: (f64, f64),
    },
}

/// Canvas for a single dashboard chart
pub struct Canvas {
    width: u32,
    height: u32,
    format: OutputFormat,
    title: String,
    x_desc: String,
    y_desc: String,
}

impl Canvas {
    pub fn new(options: &RenderOptions, title: impl Into<String>) -> Result<Self> {
        if options.width == 0 || options.height == 0 {
            anyhow::bail!(
                "Canvas size must be non-zero (got {}x{})",
                options.width,
                options.height
            );
        }

        Ok(Canvas {
            width: options.width,
            height: options.height,
            format: options.format,
            title: title.into(),
            x_desc: String::new(),
            y_desc: String::new(),
        })
    }

    /// Set the axis titles
    pub fn with_axis_labels(mut self, x_desc: impl Into<String>, y_desc: impl Into<String>) -> Self {
        self.x_desc = x_desc.into();
        self.y_desc = y_desc.into();
        self
    }

    /// Draw the chart and encode it in the configured output format
    pub fn render(&self, chart: &Chart) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Png => {
                let mut buffer = vec![0u8; rgb_buffer_len(self.width, self.height)?];
                {
                    let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                        .into_drawing_area();
                    self.draw(&root, chart)?;
                    root.present().map_err(plot_err("Failed to present drawing"))?;
                }
                encode_png(&buffer, self.width, self.height)
            }
            OutputFormat::Svg => {
                let mut svg = String::new();
                {
                    let root = SVGBackend::with_string(&mut svg, (self.width, self.height))
                        .into_drawing_area();
                    self.draw(&root, chart)?;
                    root.present().map_err(plot_err("Failed to present drawing"))?;
                }
                Ok(svg.into_bytes())
            }
        }
    }

    fn draw<DB: DrawingBackend>(&self, root: &DrawingArea<DB, Shift>, chart: &Chart) -> Result<()> {
        root.fill(&WHITE).map_err(plot_err("Failed to fill background"))?;

        match chart {
            Chart::BarLine {
                labels,
                values,
                bar,
                bar_name,
                line,
                line_name,
            } => self.draw_bar_line(root, labels, values, bar, bar_name, line, line_name),
            Chart::GroupedBars { labels, series } => self.draw_grouped_bars(root, labels, series),
            Chart::ScaledBars {
                labels,
                values,
                scale,
                annotate,
            } => self.draw_scaled_bars(root, labels, values, scale, *annotate),
            Chart::Heatmap {
                labels,
                values,
                scale,
                domain,
            } => self.draw_heatmap(root, labels, values, scale, *domain),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_bar_line<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        labels: &[String],
        values: &[f64],
        bar: &BarStyle,
        bar_name: &str,
        line: &LineStyle,
        line_name: &str,
    ) -> Result<()> {
        if labels.len() != values.len() {
            anyhow::bail!(
                "Labels and values must have the same length (labels: {}, values: {})",
                labels.len(),
                values.len()
            );
        }

        let y_range = value_range(values.iter().copied());
        let mut chart = self.build(root, category_range(labels.len()), y_range)?;
        self.draw_category_mesh(&mut chart, labels)?;

        let fill = bar.color.mix(bar.alpha).filled();
        let half = bar.width / 2.0;
        chart
            .draw_series(values.iter().enumerate().map(|(idx, &v)| {
                let x = idx as f64;
                Rectangle::new([(x - half, 0.0), (x + half, v)], fill)
            }))
            .map_err(plot_err("Failed to draw bars"))?
            .label(bar_name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], fill));

        let stroke = line.color.stroke_width(line.width);
        let points: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(idx, &v)| (idx as f64, v))
            .collect();
        chart
            .draw_series(LineSeries::new(points.clone(), stroke))
            .map_err(plot_err("Failed to draw line series"))?
            .label(line_name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], stroke));

        let marker = line.color.filled();
        let size = line.marker_size;
        chart
            .draw_series(points.into_iter().map(|p| Circle::new(p, size, marker)))
            .map_err(plot_err("Failed to draw markers"))?;

        draw_legend(&mut chart)
    }

    fn draw_grouped_bars<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        labels: &[String],
        series: &[BarSeries],
    ) -> Result<()> {
        if let Some(bad) = series.iter().find(|s| s.values.len() != labels.len()) {
            anyhow::bail!(
                "Series '{}' has {} values for {} categories",
                bad.name,
                bad.values.len(),
                labels.len()
            );
        }

        let y_range = value_range(series.iter().flat_map(|s| s.values.iter().flatten().copied()));
        let mut chart = self.build(root, category_range(labels.len()), y_range)?;
        self.draw_category_mesh(&mut chart, labels)?;

        let num_series = series.len().max(1) as f64;
        for (series_idx, s) in series.iter().enumerate() {
            // Side-by-side slots centred on the category tick
            let slot = s.style.width / num_series;
            let offset = (series_idx as f64 - (num_series - 1.0) / 2.0) * slot;
            let fill = s.style.color.mix(s.style.alpha).filled();

            chart
                .draw_series(s.values.iter().enumerate().filter_map(|(idx, v)| {
                    v.map(|v| {
                        let x = idx as f64 + offset;
                        Rectangle::new([(x - slot / 2.0, 0.0), (x + slot / 2.0, v)], fill)
                    })
                }))
                .map_err(plot_err("Failed to draw bars"))?
                .label(s.name.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], fill));
        }

        draw_legend(&mut chart)
    }

    fn draw_scaled_bars<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        labels: &[String],
        values: &[Option<f64>],
        scale: &ColorScale,
        annotate: Option<usize>,
    ) -> Result<()> {
        if labels.len() != values.len() {
            anyhow::bail!(
                "Labels and values must have the same length (labels: {}, values: {})",
                labels.len(),
                values.len()
            );
        }

        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let min = present.iter().copied().fold(f64::INFINITY, f64::min);
        let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut chart = self.build(
            root,
            category_range(labels.len()),
            value_range(present.iter().copied()),
        )?;
        self.draw_category_mesh(&mut chart, labels)?;

        chart
            .draw_series(values.iter().enumerate().filter_map(|(idx, v)| {
                v.map(|v| {
                    let x = idx as f64;
                    Rectangle::new([(x - 0.4, 0.0), (x + 0.4, v)], scale.map(v, min, max).filled())
                })
            }))
            .map_err(plot_err("Failed to draw bars"))?;

        if let Some(decimals) = annotate {
            let style = TextStyle::from(("sans-serif", 14).into_font())
                .pos(Pos::new(HPos::Center, VPos::Bottom));
            chart
                .draw_series(values.iter().enumerate().filter_map(|(idx, v)| {
                    v.map(|v| Text::new(format!("{:.*}", decimals, v), (idx as f64, v), style.clone()))
                }))
                .map_err(plot_err("Failed to draw value labels"))?;
        }

        Ok(())
    }

    fn draw_heatmap<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        labels: &[String],
        values: &[Vec<Option<f64>>],
        scale: &ColorScale,
        domain: (f64, f64),
    ) -> Result<()> {
        let n = labels.len();
        if values.len() != n || values.iter().any(|row| row.len() != n) {
            anyhow::bail!("Heatmap values must form a {}x{} matrix", n, n);
        }

        let mut chart = self.build(root, category_range(n), category_range(n))?;

        // Row 0 is drawn at the top
        let row_label = |y: &f64| category_label(labels, (n as f64 - 1.0) - *y);
        let col_label = |x: &f64| category_label(labels, *x);
        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(n.max(1))
            .y_labels(n.max(1))
            .x_label_formatter(&col_label)
            .y_label_formatter(&row_label)
            .draw()
            .map_err(plot_err("Failed to draw mesh"))?;

        let missing = RGBColor(235, 235, 235);
        let mut cells = Vec::with_capacity(n * n);
        let mut texts = Vec::with_capacity(n * n);
        for (row_idx, row) in values.iter().enumerate() {
            let y = (n - 1 - row_idx) as f64;
            for (col_idx, cell) in row.iter().enumerate() {
                let x = col_idx as f64;
                let color = match cell {
                    Some(v) => scale.map(*v, domain.0, domain.1),
                    None => missing,
                };
                cells.push(Rectangle::new(
                    [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                    color.filled(),
                ));
                let text = match cell {
                    Some(v) => format!("{:.2}", v),
                    None => "n/a".to_string(),
                };
                let style = ("sans-serif", 14)
                    .into_font()
                    .color(&contrast_text(color))
                    .pos(Pos::new(HPos::Center, VPos::Center));
                texts.push(Text::new(text, (x, y), style));
            }
        }

        chart
            .draw_series(cells)
            .map_err(plot_err("Failed to draw heatmap cells"))?;
        chart
            .draw_series(texts)
            .map_err(plot_err("Failed to draw heatmap labels"))?;

        Ok(())
    }

    fn build<'a, DB: DrawingBackend + 'a>(
        &self,
        root: &'a DrawingArea<DB, Shift>,
        x_range: Range<f64>,
        y_range: Range<f64>,
    ) -> Result<Plane<'a, DB>> {
        ChartBuilder::on(root)
            .margin(10)
            .caption(self.title.as_str(), ("sans-serif", 20))
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(plot_err("Failed to build chart"))
    }

    fn draw_category_mesh<'a, DB: DrawingBackend + 'a>(
        &self,
        chart: &mut Plane<'a, DB>,
        labels: &[String],
    ) -> Result<()> {
        let formatter = |x: &f64| category_label(labels, *x);
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(labels.len().max(1))
            .x_label_formatter(&formatter)
            .x_desc(self.x_desc.as_str())
            .y_desc(self.y_desc.as_str())
            .draw()
            .map_err(plot_err("Failed to draw mesh"))
    }
}

fn draw_legend<'a, DB: DrawingBackend + 'a>(chart: &mut Plane<'a, DB>) -> Result<()> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err("Failed to draw legend"))
}

/// Encode an RGB buffer as PNG
/// Byte length of an RGB frame, computed without wrapping
fn rgb_buffer_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .ok_or_else(|| anyhow!("Canvas size {}x{} is too large to rasterize", width, height))
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

fn plot_err<E: std::fmt::Debug>(what: &'static str) -> impl FnOnce(E) -> anyhow::Error {
    move |e| anyhow!("{}: {:?}", what, e)
}

/// X range with one unit slot per category, ticks at the slot centres
fn category_range(count: usize) -> Range<f64> {
    -0.5..(count.max(1) as f64 - 0.5)
}

/// Value axis anchored at zero with 10% headroom
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo == hi {
        return 0.0..1.0;
    }
    let padding = (hi - lo) * 0.1;
    let lo = if lo < 0.0 { lo - padding } else { 0.0 };
    lo..(hi + padding)
}

/// Label for a tick on a categorical axis; blank between categories
fn category_label(labels: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    labels.get(rounded as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{COOLWARM, SKY_BLUE, VIRIDIS};

    fn is_png(bytes: &[u8]) -> bool {
        bytes.len() > 8 && &bytes[0..8] == &[137, 80, 78, 71, 13, 10, 26, 10]
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // helper tests

    #[test]
    fn test_category_label_on_ticks() {
        let l = labels(&["a", "b"]);
        assert_eq!(category_label(&l, 0.0), "a");
        assert_eq!(category_label(&l, 1.0000000001), "b");
        assert_eq!(category_label(&l, 0.5), "");
        assert_eq!(category_label(&l, -1.0), "");
        assert_eq!(category_label(&l, 2.0), "");
    }

    #[test]
    fn test_value_range_anchored_at_zero() {
        let r = value_range(vec![10.0, 20.0].into_iter());
        assert_eq!(r.start, 0.0);
        assert!((r.end - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_empty() {
        assert_eq!(value_range(std::iter::empty()), 0.0..1.0);
    }

    #[test]
    fn test_category_range_empty() {
        assert_eq!(category_range(0), -0.5..0.5);
        assert_eq!(category_range(3), -0.5..2.5);
    }

    #[test]
    fn test_rgb_buffer_len() {
        assert_eq!(rgb_buffer_len(800, 600).unwrap(), 800 * 600 * 3);
        // Past u32 but still addressable
        #[cfg(target_pointer_width = "64")]
        assert_eq!(rgb_buffer_len(70_000, 70_000).unwrap(), 14_700_000_000);
    }

    #[test]
    fn test_rgb_buffer_len_overflow() {
        let err = rgb_buffer_len(u32::MAX, u32::MAX).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    // Canvas tests

    #[test]
    fn test_canvas_rejects_zero_size() {
        let options = RenderOptions {
            width: 0,
            ..RenderOptions::default()
        };
        assert!(Canvas::new(&options, "t").is_err());
    }

    #[test]
    fn test_render_scaled_bars_png() {
        let canvas = Canvas::new(&RenderOptions::default(), "Counts")
            .unwrap()
            .with_axis_labels("Category", "Count");
        let chart = Chart::ScaledBars {
            labels: labels(&["A", "B"]),
            values: vec![Some(3.0), Some(1.0)],
            scale: VIRIDIS,
            annotate: Some(0),
        };
        let bytes = canvas.render(&chart).unwrap();
        assert!(is_png(&bytes));
    }

    #[test]
    fn test_render_empty_bars() {
        let canvas = Canvas::new(&RenderOptions::default(), "Empty").unwrap();
        let chart = Chart::ScaledBars {
            labels: vec![],
            values: vec![],
            scale: VIRIDIS,
            annotate: None,
        };
        assert!(is_png(&canvas.render(&chart).unwrap()));
    }

    #[test]
    fn test_render_bar_line_length_mismatch() {
        let canvas = Canvas::new(&RenderOptions::default(), "Bad").unwrap();
        let chart = Chart::BarLine {
            labels: labels(&["4"]),
            values: vec![1.0, 2.0],
            bar: BarStyle::new(SKY_BLUE),
            bar_name: "Bar Chart".to_string(),
            line: LineStyle {
                color: BLUE,
                width: 2,
                marker_size: 4,
            },
            line_name: "Line Chart".to_string(),
        };
        let result = canvas.render(&chart);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("same length"));
    }

    #[test]
    fn test_render_heatmap_svg() {
        let options = RenderOptions {
            format: OutputFormat::Svg,
            ..RenderOptions::default()
        };
        let canvas = Canvas::new(&options, "Correlation").unwrap();
        let chart = Chart::Heatmap {
            labels: labels(&["x", "y"]),
            values: vec![vec![Some(1.0), Some(-0.5)], vec![Some(-0.5), Some(1.0)]],
            scale: COOLWARM,
            domain: (-1.0, 1.0),
        };
        let bytes = canvas.render(&chart).unwrap();
        let svg = String::from_utf8(bytes).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("-0.50"));
    }

    #[test]
    fn test_render_heatmap_not_square() {
        let canvas = Canvas::new(&RenderOptions::default(), "Bad").unwrap();
        let chart = Chart::Heatmap {
            labels: labels(&["x", "y"]),
            values: vec![vec![Some(1.0)]],
            scale: COOLWARM,
            domain: (-1.0, 1.0),
        };
        assert!(canvas.render(&chart).is_err());
    }
}
