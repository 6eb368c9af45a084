use anyhow::{Context, Result};
use clap::Parser;
use listing_dashboard::report::{self, DashboardReport};
use listing_dashboard::{pipeline, runtime, Dataset, OutputFormat, RenderOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "listing_dashboard")]
#[command(about = "Render the product listing dashboard from a cleaned CSV export", long_about = None)]
struct Args {
    /// Product listings CSV (rating, actual_price, discounted_price, category)
    #[arg(value_name = "CSV", default_value = "New-amazon-cleaning.csv")]
    csv: PathBuf,

    /// Directory the chart images are written to
    #[arg(short, long, value_name = "DIR", default_value = "charts")]
    out_dir: PathBuf,

    /// Chart width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Chart height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Chart image format
    #[arg(long, value_enum, default_value_t = OutputFormat::Png)]
    format: OutputFormat,

    /// Also write every section as JSON to this file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    fn render_options(&self) -> RenderOptions {
        RenderOptions {
            width: self.width,
            height: self.height,
            format: self.format,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level());
    debug!("Arguments: {:?}", args);

    // Load the dataset once; every stage borrows it
    let data = Dataset::from_path(&args.csv)?;
    info!(
        "Loaded {} rows, columns: {}",
        data.row_count(),
        data.column_names().join(", ")
    );

    let sections = pipeline::run_pipeline(&data).context("Failed to aggregate dataset")?;

    let dashboard = DashboardReport::new(args.csv.display().to_string(), data.row_count(), &sections);

    // Console report on stdout, logs stay on stderr
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(report::generate_text_report(&dashboard).as_bytes())
        .context("Failed to write report to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    let charts = runtime::write_dashboard(&sections, &args.out_dir, &args.render_options())?;
    info!(
        "Rendered {} charts into {}",
        charts.len(),
        args.out_dir.display()
    );

    if let Some(path) = &args.json {
        report::write_json(&dashboard, path)?;
        info!("Wrote JSON summary to {}", path.display());
    }

    Ok(())
}

fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();

    // Only fails if a subscriber is already installed
    let _ = tracing::subscriber::set_global_default(subscriber);
}
