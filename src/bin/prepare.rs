//! Turn the raw 30 s monthly files into the prepared 5 min files.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use bhe_field_viewer::config::{DEFAULT_DATA_ROOT, DataLayout, PrepareConfig};
use bhe_field_viewer::data::loader::parse_timestamp;
use bhe_field_viewer::data::prepare::{OutputFormat, prepare_all};
use chrono::NaiveDateTime;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "prepare", version, about = "Mask and resample raw monitoring data")]
struct Args {
    /// Folder holding raw_30s/; prepared_5min/ is created next to it.
    #[arg(long, default_value = DEFAULT_DATA_ROOT)]
    data_root: PathBuf,

    /// JSON file overriding the preparation settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output file format (csv or parquet).
    #[arg(long, default_value = "csv")]
    format: OutputFormat,

    /// First month to process (any timestamp within it).
    #[arg(long, value_parser = parse_time)]
    start: Option<NaiveDateTime>,

    /// Last month to process.
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveDateTime>,

    /// Keep samples recorded without flow.
    #[arg(long)]
    no_flow_mask: bool,
}

fn parse_time(s: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_timestamp(s)
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| format!("invalid timestamp '{s}'"))
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PrepareConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => PrepareConfig::default(),
    };
    if let Some(start) = args.start {
        config.start = start;
    }
    if let Some(end) = args.end {
        config.end = end;
    }
    if args.no_flow_mask {
        config.mask_flow = false;
    }

    let layout = DataLayout::new(&args.data_root);
    let written = prepare_all(&layout, &config, args.format)
        .with_context(|| format!("preparing data under {}", args.data_root.display()))?;
    log::info!("Prepared {} month(s)", written.len());
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}
